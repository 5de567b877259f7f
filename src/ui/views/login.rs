use crate::query::Mutation;
use crate::routes::Route;
use crate::session::{self, SignedIn};
use crate::state::AppState;
use crate::ui::components::{Form, FormEvent, KeyResult};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crate::validation;
use crossterm::event::KeyEvent;
use ratatui::prelude::*;

pub struct LoginView {
  form: Form,
  action: Mutation<SignedIn>,
}

impl LoginView {
  pub fn new(state: &AppState) -> Self {
    Self {
      form: Form::new("Sign in").field("Username").masked_field("Password"),
      action: Mutation::new().reporting(state.reporter("sign in")),
    }
  }

  fn submit(&mut self, values: Vec<String>, state: &AppState) {
    let checked = validation::required("Username", &values[0])
      .and_then(|u| validation::required("Password", &values[1]).map(|_| u.to_string()));
    let username = match checked {
      Ok(username) => username,
      Err(e) => {
        self.form.set_error(Some(e.to_string()));
        return;
      }
    };

    let client = state.client.clone();
    let password = values[1].clone();
    let started = self.action.start(async move {
      session::sign_in(&client, &username, &password)
        .await
        .map_err(|e| e.to_string())
    });
    if started {
      self.form.set_busy(true);
    }
  }
}

impl View for LoginView {
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
    Route::Login
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
