use super::KeyResult;
use crate::ui::renderfns::overlay::{centered_rect, draw_overlay_frame};
use crate::ui::theme::Palette;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Paragraph, Wrap};

/// Events emitted by the confirmation overlay
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmEvent<T> {
  /// Accepted, here's the action that was pending
  Confirmed(T),
  Cancelled,
}

/// Yes/no overlay guarding a destructive action.
///
/// The pending action rides along as `T` so the parent does not have to
/// remember what it asked about.
#[derive(Debug, Clone)]
pub struct Confirm<T> {
  pending: Option<(String, T)>,
}

impl<T> Default for Confirm<T> {
  fn default() -> Self {
    Self { pending: None }
  }
}

impl<T> Confirm<T> {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn is_active(&self) -> bool {
    self.pending.is_some()
  }

  pub fn ask(&mut self, prompt: impl Into<String>, action: T) {
    self.pending = Some((prompt.into(), action));
  }

  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<ConfirmEvent<T>> {
    if self.pending.is_none() {
      return KeyResult::NotHandled;
    }

    match key.code {
      KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => match self.pending.take() {
        Some((_, action)) => KeyResult::Event(ConfirmEvent::Confirmed(action)),
        None => KeyResult::Handled,
      },
      KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc | KeyCode::Char('q') => {
        self.pending = None;
        KeyResult::Event(ConfirmEvent::Cancelled)
      }
      _ => KeyResult::Handled,
    }
  }

  pub fn render_overlay(&self, frame: &mut Frame, area: Rect, palette: &Palette) {
    let Some((prompt, _)) = &self.pending else {
      return;
    };

    let rect = centered_rect(area, 50, 6);
    let inner = draw_overlay_frame(frame, rect, "Confirm", palette);
    if inner.height == 0 {
      return;
    }

    let text = vec![
      Line::raw(prompt.clone()),
      Line::default(),
      Line::from(vec![
        Span::styled("y", Style::default().fg(palette.accent).bold()),
        Span::styled(" yes   ", Style::default().fg(palette.dim)),
        Span::styled("n", Style::default().fg(palette.accent).bold()),
        Span::styled(" no", Style::default().fg(palette.dim)),
      ]),
    ];
    frame.render_widget(Paragraph::new(text).wrap(Wrap { trim: true }), inner);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crossterm::event::KeyModifiers;

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  #[test]
  fn test_yes_returns_pending_action() {
    let mut confirm = Confirm::new();
    confirm.ask("Ban dana?", 7u64);
    assert!(confirm.is_active());
    assert_eq!(
      confirm.handle_key(key(KeyCode::Char('y'))),
      KeyResult::Event(ConfirmEvent::Confirmed(7))
    );
    assert!(!confirm.is_active());
  }

  #[test]
  fn test_no_and_other_keys() {
    let mut confirm = Confirm::new();
    confirm.ask("Delete 3 invites?", ());
    assert_eq!(confirm.handle_key(key(KeyCode::Char('x'))), KeyResult::Handled);
    assert!(confirm.is_active());
    assert_eq!(
      confirm.handle_key(key(KeyCode::Esc)),
      KeyResult::Event(ConfirmEvent::Cancelled)
    );
    assert_eq!(confirm.handle_key(key(KeyCode::Char('y'))), KeyResult::NotHandled);
  }
}
