use super::input::{InputResult, TextInput};
use super::KeyResult;
use crate::ui::renderfns::overlay::{centered_rect, draw_overlay_frame};
use crate::ui::theme::Palette;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

/// Events emitted by a form that parent needs to handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormEvent {
  /// Enter on the last field. Values in field order, untrimmed.
  Submitted(Vec<String>),
  Cancelled,
}

#[derive(Debug, Clone)]
struct Field {
  label: &'static str,
  input: TextInput,
}

/// A stack of labeled text fields with focus cycling.
///
/// Enter moves to the next field and submits from the last one. Validation
/// is up to the parent, which reports problems back through `set_error`.
#[derive(Debug, Clone)]
pub struct Form {
  title: String,
  fields: Vec<Field>,
  focus: usize,
  error: Option<String>,
  busy: bool,
}

impl Form {
  pub fn new(title: impl Into<String>) -> Self {
    Self {
      title: title.into(),
      fields: Vec::new(),
      focus: 0,
      error: None,
      busy: false,
    }
  }

  pub fn field(mut self, label: &'static str) -> Self {
    self.fields.push(Field {
      label,
      input: TextInput::new(),
    });
    self
  }

  pub fn masked_field(mut self, label: &'static str) -> Self {
    self.fields.push(Field {
      label,
      input: TextInput::masked(),
    });
    self
  }

  pub fn field_with_value(mut self, label: &'static str, value: &str) -> Self {
    self.fields.push(Field {
      label,
      input: TextInput::new().with_value(value),
    });
    self
  }

  pub fn values(&self) -> Vec<String> {
    self
      .fields
      .iter()
      .map(|f| f.input.value().to_string())
      .collect()
  }

  pub fn focus(&self) -> usize {
    self.focus
  }

  pub fn error(&self) -> Option<&str> {
    self.error.as_deref()
  }

  pub fn set_error(&mut self, error: Option<String>) {
    self.error = error;
  }

  /// Shown while the submitted request is in flight
  pub fn set_busy(&mut self, busy: bool) {
    self.busy = busy;
  }

  /// Empty every field, for forms that stay on screen after submitting
  pub fn clear(&mut self) {
    for field in &mut self.fields {
      field.input.clear();
    }
    self.focus = 0;
  }

  fn focus_next(&mut self) {
    if !self.fields.is_empty() {
      self.focus = (self.focus + 1) % self.fields.len();
    }
  }

  fn focus_prev(&mut self) {
    if !self.fields.is_empty() {
      self.focus = (self.focus + self.fields.len() - 1) % self.fields.len();
    }
  }

  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<FormEvent> {
    match key.code {
      KeyCode::Esc => return KeyResult::Event(FormEvent::Cancelled),
      KeyCode::Tab | KeyCode::Down => {
        self.focus_next();
        return KeyResult::Handled;
      }
      KeyCode::BackTab | KeyCode::Up => {
        self.focus_prev();
        return KeyResult::Handled;
      }
      KeyCode::Enter => {
        if self.focus + 1 < self.fields.len() {
          self.focus += 1;
          return KeyResult::Handled;
        }
        self.error = None;
        return KeyResult::Event(FormEvent::Submitted(self.values()));
      }
      _ => {}
    }

    let Some(field) = self.fields.get_mut(self.focus) else {
      return KeyResult::NotHandled;
    };
    match field.input.handle_key(key) {
      InputResult::Consumed => KeyResult::Handled,
      _ => KeyResult::NotHandled,
    }
  }

  fn lines(&self, palette: &Palette) -> Vec<Line<'static>> {
    let label_width = self
      .fields
      .iter()
      .map(|f| f.label.chars().count())
      .max()
      .unwrap_or(0);

    let mut lines: Vec<Line> = self
      .fields
      .iter()
      .enumerate()
      .map(|(i, field)| {
        let focused = i == self.focus;
        let label_style = if focused {
          Style::default().fg(palette.accent).bold()
        } else {
          Style::default().fg(palette.dim)
        };
        let mut spans = vec![
          Span::styled(
            format!("{:>width$}: ", field.label, width = label_width),
            label_style,
          ),
          Span::styled(field.input.display(), Style::default().fg(palette.fg)),
        ];
        if focused {
          spans.push(Span::styled("_", Style::default().fg(palette.overlay)));
        }
        Line::from(spans)
      })
      .collect();

    lines.push(Line::default());
    if self.busy {
      lines.push(Line::styled("Working...", Style::default().fg(palette.dim)));
    } else if let Some(error) = &self.error {
      lines.push(Line::styled(error.clone(), Style::default().fg(palette.error)));
    } else {
      lines.push(Line::styled(
        "Tab: next field  Enter: submit  Esc: cancel",
        Style::default().fg(palette.dim),
      ));
    }
    lines
  }

  /// Draw the form as a centered box inside `area`
  pub fn render(&self, frame: &mut Frame, area: Rect, palette: &Palette) {
    let height = self.fields.len() as u16 + 4;
    let rect = centered_rect(area, 64, height);
    let inner = draw_overlay_frame(frame, rect, &self.title, palette);
    if inner.height == 0 {
      return;
    }
    frame.render_widget(Paragraph::new(self.lines(palette)), inner);
  }
}
