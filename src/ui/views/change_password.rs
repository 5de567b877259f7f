use crate::notify::Toast;
use crate::query::Mutation;
use crate::routes::Route;
use crate::state::AppState;
use crate::ui::components::{Form, FormEvent, KeyResult};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crate::validation::{self, ValidationError};
use crossterm::event::KeyEvent;
use ratatui::prelude::*;

pub struct ChangePasswordView {
  form: Form,
  action: Mutation<String>,
}

fn check(values: &[String]) -> Result<(), ValidationError> {
  validation::required("Current password", &values[0])?;
  validation::new_password(&values[1], &values[2])
}

impl ChangePasswordView {
  pub fn new(state: &AppState) -> Self {
    Self {
      form: Form::new("Change password")
        .masked_field("Current password")
        .masked_field("New password")
        .masked_field("Confirm"),
      action: Mutation::new().reporting(state.reporter("change password")),
    }
  }

  fn submit(&mut self, values: Vec<String>, state: &AppState) {
    if let Err(e) = check(&values) {
      self.form.set_error(Some(e.to_string()));
      return;
    }

    let client = state.client.clone();
    let (current, new) = (values[0].clone(), values[1].clone());
    let started = self.action.start(async move {
      client
        .change_password(&current, &new)
        .await
        .map(|outcome| {
          outcome
            .message
            .unwrap_or_else(|| "Password changed".to_string())
        })
        .map_err(|e| e.to_string())
    });
    if started {
      self.form.set_busy(true);
    }
  }
}

impl View for ChangePasswordView {
  fn handle_key(&mut self, key: KeyEvent, state: &mut AppState) -> ViewAction {
    if self.action.is_pending() {
      return ViewAction::None;
    }
    match self.form.handle_key(key) {
      KeyResult::Event(FormEvent::Submitted(values)) => {
        self.submit(values, state);
        ViewAction::None
      }
      KeyResult::Event(FormEvent::Cancelled) => ViewAction::Navigate(Route::Home),
      _ => ViewAction::None,
    }
  }

  fn tick(&mut self, state: &mut AppState) -> ViewAction {
    match self.action.poll() {
      Some(Ok(message)) => {
        state.notify(Toast::success(message));
        ViewAction::Navigate(Route::Home)
      }
      Some(Err(e)) => {
        self.form.set_busy(false);
        self.form.set_error(Some(e));
        ViewAction::None
      }
      None => ViewAction::None,
    }
  }

  fn render(&mut self, frame: &mut Frame, area: Rect, state: &AppState) {
    self.form.render(frame, area, &state.palette());
  }

  fn route(&self) -> Route {
    Route::ChangePassword
  }

  fn captures_input(&self) -> bool {
    true
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new("tab", "next field").with_priority(10),
      ShortcutInfo::new("esc", "home").with_priority(30),
    ]
  }
}
