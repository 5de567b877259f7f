use super::KeyResult;
use crate::ui::renderfns::overlay::{centered_rect, draw_overlay_frame};
use crate::ui::theme::Palette;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{List, ListItem, ListState};

/// Events emitted by the picker that parent needs to handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickerEvent<T> {
  Selected(T),
  Cancelled,
}

/// Single-choice list overlay, e.g. the role picker in the users view
#[derive(Debug, Clone)]
pub struct Picker<T> {
  active: bool,
  title: String,
  options: Vec<(String, T)>,
  selected: usize,
}

impl<T> Default for Picker<T> {
  fn default() -> Self {
    Self {
      active: false,
      title: String::new(),
      options: Vec::new(),
      selected: 0,
    }
  }
}

impl<T: Clone> Picker<T> {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn is_active(&self) -> bool {
    self.active
  }

  /// Show the picker with `initial` preselected when it is among the options
  pub fn show(&mut self, title: impl Into<String>, options: Vec<(String, T)>, initial: usize) {
    self.active = true;
    self.title = title.into();
    self.selected = initial.min(options.len().saturating_sub(1));
    self.options = options;
  }

  pub fn hide(&mut self) {
    self.active = false;
    self.options.clear();
    self.selected = 0;
  }

  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<PickerEvent<T>> {
    if !self.active {
      return KeyResult::NotHandled;
    }

    match key.code {
      KeyCode::Esc | KeyCode::Char('q') => {
        self.hide();
        KeyResult::Event(PickerEvent::Cancelled)
      }
      KeyCode::Enter => {
        let choice = self.options.get(self.selected).map(|(_, v)| v.clone());
        self.hide();
        match choice {
          Some(value) => KeyResult::Event(PickerEvent::Selected(value)),
          None => KeyResult::Event(PickerEvent::Cancelled),
        }
      }
      KeyCode::Char('j') | KeyCode::Down => {
        if !self.options.is_empty() {
          self.selected = (self.selected + 1) % self.options.len();
        }
        KeyResult::Handled
      }
      KeyCode::Char('k') | KeyCode::Up => {
        if !self.options.is_empty() {
          self.selected = (self.selected + self.options.len() - 1) % self.options.len();
        }
        KeyResult::Handled
      }
      _ => KeyResult::Handled,
    }
  }

  pub fn render_overlay(&self, frame: &mut Frame, area: Rect, palette: &Palette) {
    if !self.active || self.options.is_empty() {
      return;
    }

    let longest = self
      .options
      .iter()
      .map(|(label, _)| label.chars().count())
      .max()
      .unwrap_or(10)
      .max(self.title.chars().count());
    let width = (longest as u16 + 8).max(20);
    let height = self.options.len() as u16 + 2;
    let rect = centered_rect(area, width, height);
    let inner = draw_overlay_frame(frame, rect, &self.title, palette);
    if inner.height == 0 {
      return;
    }

    let items: Vec<ListItem> = self
      .options
      .iter()
      .map(|(label, _)| {
        ListItem::new(Line::from(Span::styled(
          label.clone(),
          Style::default().fg(palette.accent),
        )))
      })
      .collect();

    let list = List::new(items)
      .highlight_style(Style::default().bg(palette.highlight_bg).fg(palette.fg))
      .highlight_symbol("> ");

    let mut state = ListState::default();
    state.select(Some(self.selected));
    frame.render_stateful_widget(list, inner, &mut state);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::types::Role;
  use crossterm::event::KeyModifiers;

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  fn roles() -> Vec<(String, Role)> {
    [Role::User, Role::Support, Role::Admin]
      .into_iter()
      .map(|r| (r.label().to_string(), r))
      .collect()
  }

  #[test]
  fn test_select_after_moving() {
    let mut picker = Picker::new();
    picker.show("Role", roles(), 0);
    picker.handle_key(key(KeyCode::Char('j')));
    assert_eq!(
      picker.handle_key(key(KeyCode::Enter)),
      KeyResult::Event(PickerEvent::Selected(Role::Support))
    );
    assert!(!picker.is_active());
  }

  #[test]
  fn test_initial_selection_and_wrap() {
    let mut picker = Picker::new();
    picker.show("Role", roles(), 2);
    picker.handle_key(key(KeyCode::Down));
    assert_eq!(
      picker.handle_key(key(KeyCode::Enter)),
      KeyResult::Event(PickerEvent::Selected(Role::User))
    );
  }

  #[test]
  fn test_cancel() {
    let mut picker = Picker::new();
    picker.show("Role", roles(), 0);
    assert_eq!(
      picker.handle_key(key(KeyCode::Esc)),
      KeyResult::Event(PickerEvent::Cancelled)
    );
  }
}
