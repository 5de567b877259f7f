use crate::routes::Route;
use crate::state::AppState;
use crate::ui::ensure_valid_selection;
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap};

/// Recent failures, newest first
pub struct ErrorLogView {
  list_state: ListState,
}

impl ErrorLogView {
  pub fn new() -> Self {
    Self {
      list_state: ListState::default().with_selected(Some(0)),
    }
  }
}

impl Default for ErrorLogView {
  fn default() -> Self {
    Self::new()
  }
}

impl View for ErrorLogView {
  fn handle_key(&mut self, key: KeyEvent, state: &mut AppState) -> ViewAction {
    match key.code {
      KeyCode::Char('j') | KeyCode::Down => self.list_state.select_next(),
      KeyCode::Char('k') | KeyCode::Up => self.list_state.select_previous(),
      KeyCode::Char('x') => {
        state.errors.clear();
        self.list_state.select(Some(0));
      }
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Navigate(Route::Home),
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect, state: &AppState) {
    let palette = state.palette();
    let block = Block::default()
      .title(format!(" Errors ({}) ", state.errors.len()))
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(palette.border));

    if state.errors.is_empty() {
      let paragraph = Paragraph::new("Nothing has failed yet.")
        .block(block)
        .style(Style::default().fg(palette.dim));
      frame.render_widget(paragraph, area);
      return;
    }

    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([Constraint::Min(3), Constraint::Length(4)])
      .split(area);

    let items: Vec<ListItem> = state
      .errors
      .entries()
      .map(|entry| {
        ListItem::new(Line::from(vec![
          Span::styled(
            entry.at.format("%H:%M:%S ").to_string(),
            Style::default().fg(palette.dim),
          ),
          Span::styled(format!("{}: ", entry.context), Style::default().fg(palette.accent)),
          Span::styled(entry.message.clone(), Style::default().fg(palette.error)),
        ]))
      })
      .collect();
    ensure_valid_selection(&mut self.list_state, items.len());

    let list = List::new(items)
      .block(block)
      .highlight_style(Style::default().bg(palette.highlight_bg))
      .highlight_symbol("> ");
    frame.render_stateful_widget(list, chunks[0], &mut self.list_state);

    // Long messages get cut off in the list
    let detail = self
      .list_state
      .selected()
      .and_then(|i| state.errors.entries().nth(i))
      .map(|entry| entry.message.clone())
      .unwrap_or_default();
    let detail = Paragraph::new(detail)
      .wrap(Wrap { trim: true })
      .block(
        Block::default()
          .borders(Borders::ALL)
          .border_style(Style::default().fg(palette.border)),
      );
    frame.render_widget(detail, chunks[1]);
  }

  fn route(&self) -> Route {
    Route::ErrorLog
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new(":", "command").with_priority(10),
      ShortcutInfo::new("x", "clear").with_priority(20),
      ShortcutInfo::new("q", "back").with_priority(30),
    ]
  }
}
