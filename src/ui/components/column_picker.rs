use super::KeyResult;
use crate::ui::renderfns::overlay::{centered_rect, draw_overlay_frame};
use crate::ui::theme::Palette;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{List, ListItem, ListState};

/// A table column that can be hidden
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
  pub id: &'static str,
  pub title: &'static str,
  pub width: u16,
}

impl Column {
  pub const fn new(id: &'static str, title: &'static str, width: u16) -> Self {
    Self { id, title, width }
  }
}

/// The columns of `all` not named in `hidden`, in table order
pub fn visible_columns(all: &[Column], hidden: &[String]) -> Vec<Column> {
  all
    .iter()
    .filter(|c| !hidden.iter().any(|h| h == c.id))
    .copied()
    .collect()
}

/// Events emitted by the column picker
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnEvent {
  /// Picker closed, here are the ids now hidden
  Changed(Vec<String>),
}

/// Checkbox overlay for showing and hiding table columns.
///
/// At least one column always stays visible.
#[derive(Debug, Clone, Default)]
pub struct ColumnPicker {
  active: bool,
  columns: Vec<(Column, bool)>,
  selected: usize,
}

impl ColumnPicker {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn is_active(&self) -> bool {
    self.active
  }

  pub fn show(&mut self, all: &[Column], hidden: &[String]) {
    self.active = true;
    self.selected = 0;
    self.columns = all
      .iter()
      .map(|c| (*c, !hidden.iter().any(|h| h == c.id)))
      .collect();
  }

  fn hidden(&self) -> Vec<String> {
    self
      .columns
      .iter()
      .filter(|(_, visible)| !visible)
      .map(|(c, _)| c.id.to_string())
      .collect()
  }

  fn toggle(&mut self) {
    let visible_count = self.columns.iter().filter(|(_, v)| *v).count();
    if let Some((_, visible)) = self.columns.get_mut(self.selected) {
      if *visible && visible_count == 1 {
        return;
      }
      *visible = !*visible;
    }
  }

  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<ColumnEvent> {
    if !self.active {
      return KeyResult::NotHandled;
    }

    match key.code {
      KeyCode::Esc | KeyCode::Enter | KeyCode::Char('q') => {
        self.active = false;
        KeyResult::Event(ColumnEvent::Changed(self.hidden()))
      }
      KeyCode::Char(' ') | KeyCode::Char('x') => {
        self.toggle();
        KeyResult::Handled
      }
      KeyCode::Char('j') | KeyCode::Down => {
        if !self.columns.is_empty() {
          self.selected = (self.selected + 1) % self.columns.len();
        }
        KeyResult::Handled
      }
      KeyCode::Char('k') | KeyCode::Up => {
        if !self.columns.is_empty() {
          self.selected = (self.selected + self.columns.len() - 1) % self.columns.len();
        }
        KeyResult::Handled
      }
      _ => KeyResult::Handled,
    }
  }

  pub fn render_overlay(&self, frame: &mut Frame, area: Rect, palette: &Palette) {
    if !self.active {
      return;
    }

    let rect = centered_rect(area, 32, self.columns.len() as u16 + 2);
    let inner = draw_overlay_frame(frame, rect, "Columns", palette);
    if inner.height == 0 {
      return;
    }

    let items: Vec<ListItem> = self
      .columns
      .iter()
      .map(|(column, visible)| {
        let mark = if *visible { "[x] " } else { "[ ] " };
        ListItem::new(Line::from(vec![
          Span::styled(mark, Style::default().fg(palette.accent)),
          Span::raw(column.title),
        ]))
      })
      .collect();

    let list =
      List::new(items).highlight_style(Style::default().bg(palette.highlight_bg).fg(palette.fg));
    let mut state = ListState::default();
    state.select(Some(self.selected));
    frame.render_stateful_widget(list, inner, &mut state);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crossterm::event::KeyModifiers;

  const COLUMNS: &[Column] = &[
    Column::new("name", "Name", 10),
    Column::new("email", "Email", 20),
  ];

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  #[test]
  fn test_toggle_reports_hidden_ids() {
    let mut picker = ColumnPicker::new();
    picker.show(COLUMNS, &[]);
    picker.handle_key(key(KeyCode::Down));
    picker.handle_key(key(KeyCode::Char(' ')));
    assert_eq!(
      picker.handle_key(key(KeyCode::Enter)),
      KeyResult::Event(ColumnEvent::Changed(vec!["email".into()]))
    );
  }

  #[test]
  fn test_last_visible_column_stays() {
    let mut picker = ColumnPicker::new();
    picker.show(COLUMNS, &["email".to_string()]);
    picker.handle_key(key(KeyCode::Char(' ')));
    assert_eq!(
      picker.handle_key(key(KeyCode::Esc)),
      KeyResult::Event(ColumnEvent::Changed(vec!["email".into()]))
    );
  }

  #[test]
  fn test_visible_columns_keeps_order() {
    let shown = visible_columns(COLUMNS, &["name".to_string(), "bogus".to_string()]);
    assert_eq!(shown, vec![COLUMNS[1]]);
  }
}
