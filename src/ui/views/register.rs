use crate::query::Mutation;
use crate::routes::Route;
use crate::session::{self, SignedIn};
use crate::state::AppState;
use crate::ui::components::{Form, FormEvent, KeyResult};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crate::validation::{self, ValidationError};
use crossterm::event::KeyEvent;
use ratatui::prelude::*;

/// Registration with an invite code. Success signs straight in.
pub struct RegisterView {
  form: Form,
  action: Mutation<SignedIn>,
}

struct Registration {
  username: String,
  email: String,
  password: String,
  invite_code: String,
}

fn check(values: &[String]) -> Result<Registration, ValidationError> {
  let username = validation::required("Username", &values[0])?.to_string();
  let email = validation::required("Email", &values[1])?.to_string();
  validation::new_password(&values[2], &values[3])?;
  let invite_code = validation::required("Invite code", &values[4])?.to_string();
  Ok(Registration {
    username,
    email,
    password: values[2].clone(),
    invite_code,
  })
}

impl RegisterView {
  pub fn new(state: &AppState) -> Self {
    Self {
      form: Form::new("Create account")
        .field("Username")
        .field("Email")
        .masked_field("Password")
        .masked_field("Confirm")
        .field("Invite code"),
      action: Mutation::new().reporting(state.reporter("register")),
    }
  }

  fn submit(&mut self, values: Vec<String>, state: &AppState) {
    let registration = match check(&values) {
      Ok(r) => r,
      Err(e) => {
        self.form.set_error(Some(e.to_string()));
        return;
      }
    };

    let client = state.client.clone();
    let started = self.action.start(async move {
      session::sign_up(
        &client,
        &registration.username,
        &registration.email,
        &registration.password,
        &registration.invite_code,
      )
      .await
      .map_err(|e| e.to_string())
    });
    if started {
      self.form.set_busy(true);
    }
  }
}

impl View for RegisterView {
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
      Some(Ok(signed_in)) => {
        state.sign_in(signed_in);
        ViewAction::Navigate(Route::Keys)
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
    Route::Register
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

#[cfg(test)]
mod tests {
  use super::*;

  fn values(pw: &str, confirm: &str, invite: &str) -> Vec<String> {
    ["dana", "d@example.com", pw, confirm, invite]
      .iter()
      .map(|s| s.to_string())
      .collect()
  }

  #[test]
  fn test_mismatch_reported_before_strength() {
    let err = check(&values("short", "other", "INV")).err();
    assert_eq!(err, Some(ValidationError::PasswordMismatch));
  }

  #[test]
  fn test_invite_code_required() {
    let err = check(&values("s3cretpass", "s3cretpass", "  ")).err();
    assert_eq!(err, Some(ValidationError::Empty("Invite code")));
  }

  #[test]
  fn test_valid_registration() {
    let reg = check(&values("s3cretpass", "s3cretpass", " INV-1 ")).unwrap();
    assert_eq!(reg.invite_code, "INV-1");
    assert_eq!(reg.password, "s3cretpass");
  }
}
