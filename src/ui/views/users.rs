use super::table::{empty_text, loaded, status_title, TablePage, TablePane};
use crate::api::types::{KeyRequest, Role, UserAccount};
use crate::api::UserOrder;
use crate::cache::ResourceKind;
use crate::db::keys::COLUMNS_USERS;
use crate::notify::Toast;
use crate::query::{Mutation, Query};
use crate::routes::Route;
use crate::state::AppState;
use crate::ui::components::{
  visible_columns, Column, ColumnEvent, ColumnPicker, Confirm, ConfirmEvent, Form, FormEvent,
  KeyResult, Picker, PickerEvent,
};
use crate::ui::renderfns::utils::{format_ip, format_optional_date};
use crate::ui::theme::Palette;
use crate::ui::view::{table_shortcuts, ShortcutInfo, View, ViewAction};
use crate::validation::{self, ValidationError};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Cell, Row};

pub const COLUMNS: &[Column] = &[
  Column::new("id", "ID", 5),
  Column::new("username", "Username", 14),
  Column::new("email", "Email", 22),
  Column::new("role", "Role", 8),
  Column::new("status", "Status", 7),
  Column::new("discord", "Discord", 14),
  Column::new("last_login", "Last login", 17),
  Column::new("last_ip", "Last IP", 22),
];

/// Longest key the generate form accepts, ten years in hours
pub const MAX_KEY_HOURS: u64 = 87_600;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Pending {
  Ban(u64, String),
  Unban(u64, String),
  Unlink(u64, String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FormKind {
  ResetPassword,
  GenerateKey,
}

/// A form opened for one user
struct UserForm {
  kind: FormKind,
  user_id: u64,
  form: Form,
}

/// Why the signed-in user may not ban `target`, if they may not
fn ban_refusal(state: &AppState, target: &UserAccount) -> Option<&'static str> {
  let me = state.session.profile()?;
  if me.id == target.id {
    return Some("You cannot ban yourself");
  }
  if me.role != Role::Admin && target.role.is_staff() {
    return Some("Only admins can ban staff");
  }
  None
}

fn parse_key_request(user_id: u64, values: &[String]) -> Result<KeyRequest, ValidationError> {
  let hours = validation::number("Duration (hours)", &values[0], 1, MAX_KEY_HOURS)?;
  let custom = values[1].trim();
  Ok(KeyRequest {
    duration_hours: hours as u32,
    user_id: Some(user_id),
    custom_key: (!custom.is_empty()).then(|| custom.to_string()),
  })
}

fn cell(user: &UserAccount, column: &str, palette: &Palette) -> Cell<'static> {
  match column {
    "id" => Cell::from(user.id.to_string()),
    "username" => Cell::from(user.username.clone()).style(Style::default().fg(palette.accent)),
    "email" => Cell::from(user.email.clone()),
    "role" => {
      let color = if user.role.is_staff() { palette.overlay } else { palette.fg };
      Cell::from(user.role.label()).style(Style::default().fg(color))
    }
    "status" => {
      if user.is_banned {
        Cell::from("Banned").style(Style::default().fg(palette.error))
      } else {
        Cell::from("Active").style(Style::default().fg(palette.success))
      }
    }
    "discord" => match (&user.discord_linked, &user.discord_username) {
      (true, Some(name)) => Cell::from(name.clone()),
      (true, None) => Cell::from("linked"),
      (false, _) => Cell::from("-").style(Style::default().fg(palette.dim)),
    },
    "last_login" => Cell::from(format_optional_date(user.last_login.as_ref())),
    "last_ip" => Cell::from(format_ip(user.last_ip.as_deref())),
    _ => Cell::from(""),
  }
}

/// Staff view of every account
pub struct UsersView {
  order: UserOrder,
  query: Query<Vec<UserAccount>>,
  pane: TablePane,
  hidden: Vec<String>,
  columns: ColumnPicker,
  confirm: Confirm<Pending>,
  roles: Picker<Role>,
  role_target: Option<u64>,
  form: Option<UserForm>,
  action: Mutation<String>,
}

impl UsersView {
  pub fn new(state: &AppState) -> Self {
    let order = UserOrder::default();
    Self {
      order,
      query: Self::listing(state, order),
      pane: TablePane::new(ResourceKind::Users),
      hidden: state.hidden_columns(COLUMNS_USERS),
      columns: ColumnPicker::new(),
      confirm: Confirm::new(),
      roles: Picker::new(),
      role_target: None,
      form: None,
      action: Mutation::new().reporting(state.reporter("user action")),
    }
  }

  fn listing(state: &AppState, order: UserOrder) -> Query<Vec<UserAccount>> {
    let client = state.client.clone();
    let mut query = Query::new(move || {
      let client = client.clone();
      async move { client.users(order).await.map_err(|e| e.to_string()) }
    })
    .reporting(state.reporter("load users"));
    query.fetch();
    query
  }

  fn selected(&self, state: &AppState) -> Option<UserAccount> {
    self
      .pane
      .selected(loaded(&self.query), &state.paginator)
      .cloned()
  }

  fn run(&mut self, pending: Pending, state: &AppState) {
    let client = state.client.clone();
    self.action.start(async move {
      let (result, done) = match &pending {
        Pending::Ban(id, name) => (client.ban_user(*id).await, format!("{} banned", name)),
        Pending::Unban(id, name) => (client.unban_user(*id).await, format!("{} unbanned", name)),
        Pending::Unlink(id, name) => (
          client.unlink_discord(*id).await,
          format!("Discord unlinked from {}", name),
        ),
      };
      result
        .map(|outcome| outcome.message.unwrap_or(done))
        .map_err(|e| e.to_string())
    });
  }

  fn set_role(&mut self, user_id: u64, role: Role, state: &AppState) {
    let client = state.client.clone();
    self.action.start(async move {
      client
        .set_user_role(user_id, role)
        .await
        .map(|outcome| {
          outcome
            .message
            .unwrap_or_else(|| format!("Role set to {}", role.label()))
        })
        .map_err(|e| e.to_string())
    });
  }

  fn submit_form(&mut self, values: Vec<String>, state: &AppState) {
    let Some(open) = &mut self.form else {
      return;
    };
    let client = state.client.clone();
    let user_id = open.user_id;
    let started = match open.kind {
      FormKind::ResetPassword => {
        if let Err(e) = validation::new_password(&values[0], &values[1]) {
          open.form.set_error(Some(e.to_string()));
          return;
        }
        let password = values[0].clone();
        self.action.start(async move {
          client
            .admin_change_password(user_id, &password)
            .await
            .map(|o| o.message.unwrap_or_else(|| "Password reset".to_string()))
            .map_err(|e| e.to_string())
        })
      }
      FormKind::GenerateKey => {
        let request = match parse_key_request(user_id, &values) {
          Ok(request) => request,
          Err(e) => {
            open.form.set_error(Some(e.to_string()));
            return;
          }
        };
        self.action.start(async move {
          client
            .generate_key(&request)
            .await
            .map(|issued| format!("Key {} generated", issued.code))
            .map_err(|e| e.to_string())
        })
      }
    };
    if started {
      open.form.set_busy(true);
    }
  }

  fn open_form(&mut self, kind: FormKind, user: &UserAccount) {
    let form = match kind {
      FormKind::ResetPassword => Form::new(format!("New password for {}", user.username))
        .masked_field("Password")
        .masked_field("Confirm"),
      FormKind::GenerateKey => Form::new(format!("Key for {}", user.username))
        .field_with_value("Duration (hours)", "720")
        .field("Custom key"),
    };
    self.form = Some(UserForm {
      kind,
      user_id: user.id,
      form,
    });
  }

  fn handle_overlays(&mut self, key: KeyEvent, state: &mut AppState) -> Option<ViewAction> {
    match self.confirm.handle_key(key) {
      KeyResult::Event(ConfirmEvent::Confirmed(pending)) => {
        self.run(pending, state);
        return Some(ViewAction::None);
      }
      KeyResult::NotHandled => {}
      _ => return Some(ViewAction::None),
    }

    match self.roles.handle_key(key) {
      KeyResult::Event(PickerEvent::Selected(role)) => {
        if let Some(user_id) = self.role_target.take() {
          self.set_role(user_id, role, state);
        }
        return Some(ViewAction::None);
      }
      KeyResult::Event(PickerEvent::Cancelled) => {
        self.role_target = None;
        return Some(ViewAction::None);
      }
      KeyResult::Handled => return Some(ViewAction::None),
      KeyResult::NotHandled => {}
    }

    if let KeyResult::Event(ColumnEvent::Changed(hidden)) = self.columns.handle_key(key) {
      state.set_hidden_columns(COLUMNS_USERS, &hidden);
      self.hidden = hidden;
      return Some(ViewAction::None);
    } else if self.columns.is_active() {
      return Some(ViewAction::None);
    }

    if let Some(open) = &mut self.form {
      if self.action.is_pending() {
        return Some(ViewAction::None);
      }
      match open.form.handle_key(key) {
        KeyResult::Event(FormEvent::Submitted(values)) => self.submit_form(values, state),
        KeyResult::Event(FormEvent::Cancelled) => self.form = None,
        _ => {}
      }
      return Some(ViewAction::None);
    }

    self
      .pane
      .handle_search(key, &mut state.paginator)
      .map(|_| ViewAction::None)
  }

  fn handle_navigation(&mut self, key: KeyEvent, state: &mut AppState) -> Option<ViewAction> {
    let total = self.pane.filter(loaded(&self.query)).len();
    self
      .pane
      .handle_navigation(key, total, &mut state.paginator)
      .map(|_| ViewAction::None)
  }

  fn handle_actions(&mut self, key: KeyEvent, state: &mut AppState) -> Option<ViewAction> {
    let admin = state.session.is_admin();
    match key.code {
      KeyCode::Char('r') => {
        state.client.cache().invalidate(&[ResourceKind::Users]);
        self.query.refetch();
      }
      KeyCode::Char('o') => {
        self.order = self.order.toggled();
        self.query = Self::listing(state, self.order);
      }
      KeyCode::Char('c') => self.columns.show(COLUMNS, &self.hidden),
      KeyCode::Char('b') => {
        let user = self.selected(state)?;
        if let Some(reason) = ban_refusal(state, &user) {
          state.notify(Toast::error(reason));
        } else if user.is_banned {
          let prompt = format!("Unban {}?", user.username);
          self.confirm.ask(prompt, Pending::Unban(user.id, user.username));
        } else {
          let prompt = format!("Ban {}?", user.username);
          self.confirm.ask(prompt, Pending::Ban(user.id, user.username));
        }
      }
      KeyCode::Char('K') => {
        let user = self.selected(state)?;
        self.open_form(FormKind::GenerateKey, &user);
      }
      KeyCode::Char('R') if admin => {
        let user = self.selected(state)?;
        let options: Vec<(String, Role)> = [Role::User, Role::Support, Role::Admin]
          .into_iter()
          .map(|r| (r.label().to_string(), r))
          .collect();
        let initial = options.iter().position(|(_, r)| *r == user.role).unwrap_or(0);
        self.roles.show(format!("Role for {}", user.username), options, initial);
        self.role_target = Some(user.id);
      }
      KeyCode::Char('U') if admin => {
        let user = self.selected(state)?;
        if user.discord_linked {
          let prompt = format!("Unlink Discord from {}?", user.username);
          self.confirm.ask(prompt, Pending::Unlink(user.id, user.username));
        } else {
          state.notify(Toast::info(format!("{} has no Discord link", user.username)));
        }
      }
      KeyCode::Char('P') if admin => {
        let user = self.selected(state)?;
        self.open_form(FormKind::ResetPassword, &user);
      }
      KeyCode::Char('q') | KeyCode::Esc => return Some(ViewAction::Navigate(Route::Home)),
      _ => return None,
    }
    Some(ViewAction::None)
  }
}

impl View for UsersView {
  fn handle_key(&mut self, key: KeyEvent, state: &mut AppState) -> ViewAction {
    self
      .handle_overlays(key, state)
      .or_else(|| self.handle_navigation(key, state))
      .or_else(|| self.handle_actions(key, state))
      .unwrap_or(ViewAction::None)
  }

  fn tick(&mut self, state: &mut AppState) -> ViewAction {
    if self.query.poll() {
      self.pane.settle(loaded(&self.query), &mut state.paginator);
    }
    match self.action.poll() {
      Some(Ok(message)) => {
        self.form = None;
        state.notify(Toast::success(message));
        self.query.refetch();
      }
      Some(Err(e)) => {
        if let Some(open) = &mut self.form {
          open.form.set_busy(false);
          open.form.set_error(Some(e));
        }
      }
      None => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect, state: &AppState) {
    let palette = state.palette();
    let columns = visible_columns(COLUMNS, &self.hidden);
    let items = loaded(&self.query);
    let total = self.pane.filter(items).len();
    let rows: Vec<Row> = self
      .pane
      .page(items, &state.paginator)
      .into_iter()
      .map(|user| Row::new(columns.iter().map(|c| cell(user, c.id, &palette))))
      .collect();

    let label = format!("Users, {}", self.order.label());
    let table = TablePage {
      title: status_title(&label, &self.query, total),
      columns: &columns,
      rows,
      total,
      empty: empty_text(&self.query, "No users match."),
    };
    self.pane.render(frame, area, table, state);

    if let Some(open) = &self.form {
      open.form.render(frame, area, &palette);
    }
    self.roles.render_overlay(frame, area, &palette);
    self.columns.render_overlay(frame, area, &palette);
    self.confirm.render_overlay(frame, area, &palette);
  }

  fn route(&self) -> Route {
    Route::Users
  }

  fn captures_input(&self) -> bool {
    self.form.is_some()
      || self.confirm.is_active()
      || self.roles.is_active()
      || self.columns.is_active()
      || self.pane.is_searching()
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    let mut shortcuts = table_shortcuts();
    shortcuts.extend([
      ShortcutInfo::new("b", "ban").with_priority(40),
      ShortcutInfo::new("K", "key").with_priority(41),
      ShortcutInfo::new("R", "role").with_priority(42),
      ShortcutInfo::new("U", "unlink").with_priority(43),
      ShortcutInfo::new("P", "password").with_priority(44),
      ShortcutInfo::new("o", "order").with_priority(45),
      ShortcutInfo::new("c", "columns").with_priority(46),
    ]);
    shortcuts
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::types::Profile;
  use crate::session::SignedIn;
  use crate::state::testing::state_for;
  use crossterm::event::KeyModifiers;
  use serde_json::json;
  use std::time::Duration;
  use wiremock::matchers::{body_json, method, path};
  use wiremock::{Mock, MockServer, ResponseTemplate};

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  fn signed_in(id: u64, role: Role) -> SignedIn {
    SignedIn {
      token: "tok".into(),
      profile: Profile {
        id,
        username: "me".into(),
        email: "me@example.com".into(),
        created_at: None,
        role,
        is_banned: false,
        discord_linked: false,
        discord_username: None,
      },
      trial_key: None,
    }
  }

  fn user_json(id: u64, name: &str, is_support: bool, is_banned: bool) -> serde_json::Value {
    json!({
      "id": id, "username": name, "email": format!("{}@example.com", name),
      "is_admin": false, "is_support": is_support, "is_banned": is_banned,
      "discord_linked": false, "last_ip": "10.0.0.5"
    })
  }

  async fn mount_users(server: &MockServer) {
    Mock::given(method("GET"))
      .and(path("/api/admin/users/activity"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({"users": [
        user_json(2, "alice", false, false),
        user_json(3, "sam", true, false),
      ]})))
      .mount(server)
      .await;
  }

  async fn wait_idle(view: &mut UsersView, state: &mut AppState) {
    for _ in 0..100 {
      view.tick(state);
      if !view.query.is_loading() && !view.action.is_pending() {
        return;
      }
      tokio::time::sleep(Duration::from_millis(10)).await;
    }
  }

  #[test]
  fn test_key_request_parsing() {
    let req = parse_key_request(4, &["48".to_string(), " ".to_string()]).unwrap();
    assert_eq!(req.duration_hours, 48);
    assert_eq!(req.user_id, Some(4));
    assert_eq!(req.custom_key, None);
    assert!(parse_key_request(4, &["0".to_string(), String::new()]).is_err());
  }

  #[tokio::test]
  async fn test_support_cannot_ban_staff() {
    let server = MockServer::start().await;
    mount_users(&server).await;

    let (mut state, _rx) = state_for(&server.uri());
    state.sign_in(signed_in(1, Role::Support));
    let mut view = UsersView::new(&state);
    wait_idle(&mut view, &mut state).await;

    // Second row is sam, a support account
    view.handle_key(key(KeyCode::Down), &mut state);
    view.handle_key(key(KeyCode::Char('b')), &mut state);
    assert!(!view.confirm.is_active());
    assert!(state.toasts.iter().any(|t| t.message == "Only admins can ban staff"));
  }

  #[tokio::test]
  async fn test_ban_after_confirm() {
    let server = MockServer::start().await;
    mount_users(&server).await;
    Mock::given(method("POST"))
      .and(path("/api/admin/users/2/ban"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
      .expect(1)
      .mount(&server)
      .await;

    let (mut state, _rx) = state_for(&server.uri());
    state.sign_in(signed_in(1, Role::Admin));
    let mut view = UsersView::new(&state);
    wait_idle(&mut view, &mut state).await;

    view.handle_key(key(KeyCode::Char('b')), &mut state);
    assert!(view.confirm.is_active());
    view.handle_key(key(KeyCode::Char('y')), &mut state);
    wait_idle(&mut view, &mut state).await;
    wait_idle(&mut view, &mut state).await;
    assert!(state.toasts.iter().any(|t| t.message == "alice banned"));
  }

  #[tokio::test]
  async fn test_role_change_through_picker() {
    let server = MockServer::start().await;
    mount_users(&server).await;
    Mock::given(method("POST"))
      .and(path("/api/admin/users/2/role"))
      .and(body_json(json!({"role": "support"})))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "Role updated"})))
      .expect(1)
      .mount(&server)
      .await;

    let (mut state, _rx) = state_for(&server.uri());
    state.sign_in(signed_in(1, Role::Admin));
    let mut view = UsersView::new(&state);
    wait_idle(&mut view, &mut state).await;

    view.handle_key(key(KeyCode::Char('R')), &mut state);
    assert!(view.roles.is_active());
    view.handle_key(key(KeyCode::Down), &mut state);
    view.handle_key(key(KeyCode::Enter), &mut state);
    wait_idle(&mut view, &mut state).await;
    wait_idle(&mut view, &mut state).await;
    assert!(state.toasts.iter().any(|t| t.message == "Role updated"));
  }

  #[tokio::test]
  async fn test_hidden_columns_persist() {
    let server = MockServer::start().await;
    mount_users(&server).await;

    let (mut state, _rx) = state_for(&server.uri());
    state.sign_in(signed_in(1, Role::Admin));
    let mut view = UsersView::new(&state);
    view.handle_key(key(KeyCode::Char('c')), &mut state);
    view.handle_key(key(KeyCode::Char(' ')), &mut state);
    view.handle_key(key(KeyCode::Enter), &mut state);

    assert_eq!(view.hidden, vec!["id".to_string()]);
    assert_eq!(state.hidden_columns(COLUMNS_USERS), vec!["id".to_string()]);
    assert_eq!(UsersView::new(&state).hidden, vec!["id".to_string()]);
  }
}
