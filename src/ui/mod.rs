pub mod components;
pub mod renderfns;
pub mod theme;
pub mod view;
pub mod views;

use crate::app::App;
use ratatui::prelude::*;
use ratatui::widgets::{Block, ListState, TableState};
use renderfns::{draw_footer, draw_header, draw_toasts};

/// Main draw function
pub fn draw(frame: &mut Frame, app: &mut App) {
  let chunks = Layout::default()
    .direction(Direction::Vertical)
    .constraints([
      Constraint::Length(1), // Header
      Constraint::Min(1),    // Main content
      Constraint::Length(1), // Breadcrumb
    ])
    .split(frame.area());

  let screen = app.screen();
  let palette = screen.state.palette();

  frame.render_widget(
    Block::default().style(Style::default().bg(palette.bg).fg(palette.fg)),
    frame.area(),
  );

  let shortcuts = screen
    .view
    .as_ref()
    .map(|v| v.shortcuts())
    .unwrap_or_default();
  draw_header(
    frame,
    chunks[0],
    screen.title,
    &screen.state.session,
    &screen.state.language,
    &shortcuts,
    &palette,
  );

  if let Some(view) = screen.view {
    view.render(frame, chunks[1], screen.state);
  }

  let status = match screen.state.errors.len() {
    0 => None,
    1 => Some("1 error (:errors)".to_string()),
    n => Some(format!("{} errors (:errors)", n)),
  };
  draw_footer(
    frame,
    chunks[2],
    &screen.breadcrumb,
    status.as_deref(),
    &palette,
  );

  // Overlays last so they sit on top
  screen.command.render_overlay(frame, chunks[1], &palette);
  draw_toasts(frame, chunks[1], &screen.state.toasts, &palette);
}

/// Keep a list cursor on an existing row, or clear it for an empty list
pub fn ensure_valid_selection(state: &mut ListState, len: usize) {
  match (state.selected(), len) {
    (_, 0) => state.select(None),
    (None, _) => state.select(Some(0)),
    (Some(i), len) if i >= len => state.select(Some(len - 1)),
    _ => {}
  }
}

/// Table counterpart of [`ensure_valid_selection`]
pub fn ensure_valid_row(state: &mut TableState, len: usize) {
  match (state.selected(), len) {
    (_, 0) => state.select(None),
    (None, _) => state.select(Some(0)),
    (Some(i), len) if i >= len => state.select(Some(len - 1)),
    _ => {}
  }
}
