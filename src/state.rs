//! Application state handed to views by reference.

use crate::api::CachedApiClient;
use crate::db::{keys, Preferences};
use crate::event::Event;
use crate::notify::{ErrorLog, Toast, Toasts};
use crate::pagination::Paginator;
use crate::query::Reporter;
use crate::session::{Session, SignedIn};
use crate::ui::theme::{Palette, Theme};
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Interface languages the language preference cycles through
pub const LANGUAGES: &[&str] = &["en", "ru"];

/// Everything views share. The app owns one and lends it to the active view
/// for each key press, tick and render.
pub struct AppState {
  pub client: CachedApiClient,
  events: mpsc::UnboundedSender<Event>,
  prefs: Preferences,
  pub session: Session,
  pub paginator: Paginator,
  pub theme: Theme,
  pub language: String,
  pub toasts: Toasts,
  pub errors: ErrorLog,
}

impl AppState {
  pub fn new(
    client: CachedApiClient,
    events: mpsc::UnboundedSender<Event>,
    prefs: Preferences,
    page_size: usize,
  ) -> Self {
    let theme = read_pref(&prefs, keys::THEME)
      .and_then(|t| Theme::parse(&t))
      .unwrap_or_default();
    let language = read_pref(&prefs, keys::LANGUAGE)
      .filter(|l| LANGUAGES.contains(&l.as_str()))
      .unwrap_or_else(|| LANGUAGES[0].to_string());

    Self {
      client,
      events,
      prefs,
      session: Session::Anonymous,
      paginator: Paginator::new(page_size),
      theme,
      language,
      toasts: Toasts::default(),
      errors: ErrorLog::default(),
    }
  }

  pub fn events(&self) -> mpsc::UnboundedSender<Event> {
    self.events.clone()
  }

  /// Reporter tagged with what the caller is doing
  pub fn reporter(&self, context: &str) -> Reporter {
    Reporter::new(self.events.clone(), context)
  }

  pub fn palette(&self) -> Palette {
    self.theme.palette()
  }

  pub fn notify(&mut self, toast: Toast) {
    self.toasts.push(toast);
  }

  pub fn stored_token(&self) -> Option<String> {
    read_pref(&self.prefs, keys::TOKEN)
  }

  /// Record a failure in the error log and show it as a toast
  pub fn fail(&mut self, context: &str, message: &str) {
    self.errors.record(context, message);
    self.toasts.push(Toast::error(message.to_string()));
  }

  pub fn sign_in(&mut self, signed_in: SignedIn) {
    let trial_key = signed_in.trial_key.clone();
    let username = signed_in.profile.username.clone();
    if let Err(e) = self.session.establish(signed_in, &self.prefs) {
      warn!(error = %e, "could not persist token");
      self.errors.record("save token", e.to_string());
    }
    self.toasts.push(Toast::success(format!("Signed in as {}", username)));
    if let Some(key) = trial_key {
      self
        .toasts
        .push(Toast::info(format!("Your trial key: {}", key)));
    }
  }

  pub fn sign_out(&mut self) {
    if let Err(e) = self.session.end(&self.client, &self.prefs) {
      warn!(error = %e, "could not clear stored token");
      self.errors.record("clear token", e.to_string());
    }
  }

  pub fn toggle_theme(&mut self) {
    self.theme = self.theme.toggled();
    info!(theme = self.theme.as_str(), "theme changed");
    self.write_pref(keys::THEME, self.theme.as_str());
  }

  pub fn cycle_language(&mut self) {
    let idx = LANGUAGES
      .iter()
      .position(|l| *l == self.language)
      .unwrap_or(0);
    self.language = LANGUAGES[(idx + 1) % LANGUAGES.len()].to_string();
    info!(language = %self.language, "language changed");
    let language = self.language.clone();
    self.write_pref(keys::LANGUAGE, &language);
  }

  /// Column ids hidden in `table` (one of the `keys::COLUMNS_*` names)
  pub fn hidden_columns(&self, table: &str) -> Vec<String> {
    match self.prefs.hidden_columns(table) {
      Ok(cols) => cols,
      Err(e) => {
        warn!(table, error = %e, "could not read column preferences");
        Vec::new()
      }
    }
  }

  pub fn set_hidden_columns(&mut self, table: &str, columns: &[String]) {
    if let Err(e) = self.prefs.set_hidden_columns(table, columns) {
      warn!(table, error = %e, "could not save column preferences");
      self.errors.record("save columns", e.to_string());
    }
  }

  fn write_pref(&mut self, name: &str, value: &str) {
    if let Err(e) = self.prefs.set(name, value) {
      warn!(name, error = %e, "could not save preference");
      self.errors.record("save preference", e.to_string());
    }
  }
}

fn read_pref(prefs: &Preferences, name: &str) -> Option<String> {
  prefs.get(name).unwrap_or_else(|e| {
    warn!(name, error = %e, "could not read preference");
    None
  })
}


#[cfg(test)]
mod tests {
  use super::testing::state_for;
  use super::*;
  use crate::api::types::{Profile, Role};

  fn signed_in() -> SignedIn {
    SignedIn {
      token: "tok".into(),
      profile: Profile {
        id: 1,
        username: "dana".into(),
        email: "d@example.com".into(),
        created_at: None,
        role: Role::User,
        is_banned: false,
        discord_linked: false,
        discord_username: None,
      },
      trial_key: Some("TRIAL".into()),
    }
  }

  #[test]
  fn test_sign_in_persists_and_announces_trial_key() {
    let (mut state, _rx) = state_for("http://localhost:5000");
    state.sign_in(signed_in());
    assert!(state.session.is_authenticated());
    assert_eq!(state.stored_token().as_deref(), Some("tok"));
    assert!(state.toasts.iter().any(|t| t.message.contains("TRIAL")));

    state.sign_out();
    assert!(!state.session.is_authenticated());
    assert_eq!(state.stored_token(), None);
  }

  #[test]
  fn test_theme_and_language_persist() {
    let (mut state, _rx) = state_for("http://localhost:5000");
    assert_eq!(state.theme, Theme::Dark);
    assert_eq!(state.language, "en");

    state.toggle_theme();
    state.cycle_language();
    assert_eq!(state.theme, Theme::Light);
    assert_eq!(state.language, "ru");
    assert_eq!(read_pref(&state.prefs, keys::THEME).as_deref(), Some("light"));
    assert_eq!(read_pref(&state.prefs, keys::LANGUAGE).as_deref(), Some("ru"));

    state.cycle_language();
    assert_eq!(state.language, "en");
  }

  #[test]
  fn test_fail_logs_and_toasts() {
    let (mut state, _rx) = state_for("http://localhost:5000");
    state.fail("load users", "Network error: refused");
    assert_eq!(state.errors.len(), 1);
    assert!(!state.toasts.is_empty());
  }
}
