use super::table::{empty_text, status_title, TablePage, TablePane};
use crate::api::types::{Invite, InviteLimits, RoleLimits};
use crate::cache::ResourceKind;
use crate::notify::Toast;
use crate::query::{Mutation, Query};
use crate::routes::Route;
use crate::state::AppState;
use crate::ui::components::{Column, Confirm, ConfirmEvent, Form, FormEvent, KeyResult};
use crate::ui::renderfns::utils::format_date;
use crate::ui::view::{table_shortcuts, ShortcutInfo, View, ViewAction};
use crate::validation::{self, ValidationError};
use chrono::Utc;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Cell, Paragraph, Row};
use std::collections::BTreeSet;

const COLUMNS: &[Column] = &[
  Column::new("mark", " ", 3),
  Column::new("code", "Code", 16),
  Column::new("status", "Status", 8),
  Column::new("created", "Created", 17),
  Column::new("expires", "Expires", 17),
  Column::new("created_by", "Created by", 12),
  Column::new("used_by", "Used by", 12),
];

/// Largest monthly limit the limits form accepts
const MAX_LIMIT: u64 = 1000;

/// Invites and the caller's quota, fetched together
#[derive(Debug, Clone)]
struct InviteData {
  invites: Vec<Invite>,
  limits: InviteLimits,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Pending {
  Delete(u64),
  DeleteMany(Vec<u64>),
}

fn invites_of(query: &Query<InviteData>) -> &[Invite] {
  query.data().map(|d| d.invites.as_slice()).unwrap_or(&[])
}

fn invite_status(invite: &Invite) -> (&'static str, Color) {
  if invite.used {
    ("Used", Color::DarkGray)
  } else if invite.expires_at <= Utc::now() {
    ("Expired", Color::Red)
  } else {
    ("Unused", Color::Green)
  }
}

fn parse_limits(values: &[String]) -> Result<RoleLimits, ValidationError> {
  Ok(RoleLimits {
    admin: validation::number("Admin limit", &values[0], 0, MAX_LIMIT)? as u32,
    support: validation::number("Support limit", &values[1], 0, MAX_LIMIT)? as u32,
    user: validation::number("User limit", &values[2], 0, MAX_LIMIT)? as u32,
  })
}

/// Invite codes with the monthly quota. Admins can also delete invites and
/// edit the global limits.
pub struct InvitesView {
  query: Query<InviteData>,
  pane: TablePane,
  marked: BTreeSet<u64>,
  confirm: Confirm<Pending>,
  limits_form: Option<Form>,
  action: Mutation<String>,
}

impl InvitesView {
  pub fn new(state: &AppState) -> Self {
    let client = state.client.clone();
    let mut query = Query::new(move || {
      let client = client.clone();
      async move {
        let (invites, limits) = futures::join!(client.invites(), client.invite_limits());
        Ok::<_, String>(InviteData {
          invites: invites.map_err(|e| e.to_string())?,
          limits: limits.map_err(|e| e.to_string())?,
        })
      }
    })
    .reporting(state.reporter("load invites"));

    query.fetch();

    Self {
      query,
      pane: TablePane::new(ResourceKind::Invites),
      marked: BTreeSet::new(),
      confirm: Confirm::new(),
      limits_form: None,
      action: Mutation::new().reporting(state.reporter("invite action")),
    }
  }

  fn start<F>(&mut self, future: F)
  where
    F: std::future::Future<Output = Result<String, String>> + Send + 'static,
  {
    if !self.action.start(future) {
      return;
    }
    if let Some(form) = &mut self.limits_form {
      form.set_busy(true);
    }
  }

  fn generate(&mut self, state: &AppState) {
    let client = state.client.clone();
    self.start(async move {
      client
        .generate_invite()
        .await
        .map(|issued| format!("Invite {} generated", issued.code))
        .map_err(|e| e.to_string())
    });
  }

  fn run(&mut self, pending: Pending, state: &AppState) {
    let client = state.client.clone();
    match pending {
      Pending::Delete(id) => self.start(async move {
        client
          .delete_invite(id)
          .await
          .map(|outcome| outcome.message.unwrap_or_else(|| "Invite deleted".to_string()))
          .map_err(|e| e.to_string())
      }),
      Pending::DeleteMany(ids) => self.start(async move {
        client
          .delete_invites(&ids)
          .await
          .map(|outcome| {
            let count = outcome.count.unwrap_or(ids.len() as u64);
            format!("{} invites deleted", count)
          })
          .map_err(|e| e.to_string())
      }),
    }
  }

  fn submit_limits(&mut self, values: Vec<String>, state: &AppState) {
    let limits = match parse_limits(&values) {
      Ok(limits) => limits,
      Err(e) => {
        if let Some(form) = &mut self.limits_form {
          form.set_error(Some(e.to_string()));
        }
        return;
      }
    };
    let client = state.client.clone();
    self.start(async move {
      client
        .set_invite_limits(limits)
        .await
        .map(|outcome| outcome.message.unwrap_or_else(|| "Invite limits updated".to_string()))
        .map_err(|e| e.to_string())
    });
  }

  fn open_limits_form(&mut self) {
    let global = self
      .query
      .data()
      .map(|d| d.limits.global)
      .unwrap_or_default();
    self.limits_form = Some(
      Form::new("Monthly invite limits")
        .field_with_value("Admin", &global.admin.to_string())
        .field_with_value("Support", &global.support.to_string())
        .field_with_value("User", &global.user.to_string()),
    );
  }

  /// Unused invites matching the search, for select-all
  fn selectable_ids(&self) -> Vec<u64> {
    self
      .pane
      .filter(invites_of(&self.query))
      .into_iter()
      .filter(|i| !i.used)
      .map(|i| i.id)
      .collect()
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

    if let Some(form) = &mut self.limits_form {
      if self.action.is_pending() {
        return Some(ViewAction::None);
      }
      match form.handle_key(key) {
        KeyResult::Event(FormEvent::Submitted(values)) => self.submit_limits(values, state),
        KeyResult::Event(FormEvent::Cancelled) => self.limits_form = None,
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
    let total = self.pane.filter(invites_of(&self.query)).len();
    self
      .pane
      .handle_navigation(key, total, &mut state.paginator)
      .map(|_| ViewAction::None)
  }

  fn handle_actions(&mut self, key: KeyEvent, state: &mut AppState) -> Option<ViewAction> {
    let admin = state.session.is_admin();
    match key.code {
      KeyCode::Char('r') => {
        state.client.cache().invalidate(&[ResourceKind::Invites, ResourceKind::InviteLimits]);
        self.query.refetch();
      }
      KeyCode::Char('g') => self.generate(state),
      KeyCode::Char(' ') if admin => {
        if let Some(invite) = self.pane.selected(invites_of(&self.query), &state.paginator) {
          if !invite.used && !self.marked.remove(&invite.id) {
            self.marked.insert(invite.id);
          }
        }
      }
      KeyCode::Char('A') if admin => {
        let ids = self.selectable_ids();
        if ids.iter().all(|id| self.marked.contains(id)) {
          self.marked.clear();
        } else {
          self.marked.extend(ids);
        }
      }
      KeyCode::Char('d') if admin => {
        if let Some(invite) = self.pane.selected(invites_of(&self.query), &state.paginator) {
          let prompt = format!("Delete invite {}?", invite.code);
          self.confirm.ask(prompt, Pending::Delete(invite.id));
        }
      }
      KeyCode::Char('D') if admin && !self.marked.is_empty() => {
        let ids: Vec<u64> = self.marked.iter().copied().collect();
        self
          .confirm
          .ask(format!("Delete {} selected invites?", ids.len()), Pending::DeleteMany(ids));
      }
      KeyCode::Char('L') if admin => self.open_limits_form(),
      KeyCode::Char('q') | KeyCode::Esc => return Some(ViewAction::Navigate(Route::Home)),
      _ => return None,
    }
    Some(ViewAction::None)
  }

  fn render_quota(&self, frame: &mut Frame, area: Rect, state: &AppState) {
    let palette = state.palette();
    let Some(data) = self.query.data() else {
      return;
    };
    let limits = &data.limits;
    let mut spans = vec![
      Span::styled(" Monthly limit ", Style::default().fg(palette.dim)),
      Span::styled(limits.monthly_limit.to_string(), Style::default().fg(palette.fg)),
      Span::styled("   Used ", Style::default().fg(palette.dim)),
      Span::styled(limits.used_invites.to_string(), Style::default().fg(palette.fg)),
      Span::styled("   Remaining ", Style::default().fg(palette.dim)),
      Span::styled(
        limits.remaining_invites.to_string(),
        Style::default().fg(if limits.remaining_invites > 0 {
          palette.success
        } else {
          palette.error
        }),
      ),
    ];
    if state.session.is_admin() {
      spans.push(Span::styled(
        format!(
          "   Global: admin {} / support {} / user {}",
          limits.global.admin, limits.global.support, limits.global.user
        ),
        Style::default().fg(palette.dim),
      ));
    }
    if !self.marked.is_empty() {
      spans.push(Span::styled(
        format!("   {} selected", self.marked.len()),
        Style::default().fg(palette.overlay),
      ));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
  }
}

impl View for InvitesView {
  fn handle_key(&mut self, key: KeyEvent, state: &mut AppState) -> ViewAction {
    self
      .handle_overlays(key, state)
      .or_else(|| self.handle_navigation(key, state))
      .or_else(|| self.handle_actions(key, state))
      .unwrap_or(ViewAction::None)
  }

  fn tick(&mut self, state: &mut AppState) -> ViewAction {
    if self.query.poll() {
      let invites = invites_of(&self.query);
      self.marked.retain(|id| invites.iter().any(|i| i.id == *id && !i.used));
      self.pane.settle(invites, &mut state.paginator);
    }
    match self.action.poll() {
      Some(Ok(message)) => {
        self.limits_form = None;
        self.marked.clear();
        state.notify(Toast::success(message));
        self.query.refetch();
      }
      Some(Err(e)) => {
        if let Some(form) = &mut self.limits_form {
          form.set_busy(false);
          form.set_error(Some(e));
        }
      }
      None => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect, state: &AppState) {
    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([Constraint::Length(1), Constraint::Min(3)])
      .split(area);
    self.render_quota(frame, chunks[0], state);

    let palette = state.palette();
    let items = invites_of(&self.query);
    let total = self.pane.filter(items).len();
    let rows: Vec<Row> = self
      .pane
      .page(items, &state.paginator)
      .into_iter()
      .map(|invite| {
        let (status, color) = invite_status(invite);
        let mark = if self.marked.contains(&invite.id) { "[x]" } else { "" };
        Row::new(vec![
          Cell::from(mark).style(Style::default().fg(palette.overlay)),
          Cell::from(invite.code.clone()),
          Cell::from(status).style(Style::default().fg(color)),
          Cell::from(format_date(&invite.created_at)),
          Cell::from(format_date(&invite.expires_at)),
          Cell::from(invite.created_by.clone()),
          Cell::from(invite.used_by.clone().unwrap_or_default()),
        ])
      })
      .collect();

    let table = TablePage {
      title: status_title("Invites", &self.query, total),
      columns: COLUMNS,
      rows,
      total,
      empty: empty_text(&self.query, "No invites yet. Press 'g' to generate one."),
    };
    self.pane.render(frame, chunks[1], table, state);

    if let Some(form) = &self.limits_form {
      form.render(frame, area, &palette);
    }
    self.confirm.render_overlay(frame, area, &palette);
  }

  fn route(&self) -> Route {
    Route::Invites
  }

  fn captures_input(&self) -> bool {
    self.limits_form.is_some() || self.confirm.is_active() || self.pane.is_searching()
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    let mut shortcuts = table_shortcuts();
    shortcuts.push(ShortcutInfo::new("g", "generate").with_priority(40));
    shortcuts.push(ShortcutInfo::new("space/A", "select").with_priority(50));
    shortcuts.push(ShortcutInfo::new("d/D", "delete").with_priority(51));
    shortcuts.push(ShortcutInfo::new("L", "limits").with_priority(52));
    shortcuts
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::types::{Profile, Role};
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

  fn admin() -> SignedIn {
    SignedIn {
      token: "tok".into(),
      profile: Profile {
        id: 1,
        username: "root".into(),
        email: "root@example.com".into(),
        created_at: None,
        role: Role::Admin,
        is_banned: false,
        discord_linked: false,
        discord_username: None,
      },
      trial_key: None,
    }
  }

  fn invite_json(id: u64, used: bool) -> serde_json::Value {
    json!({
      "id": id, "code": format!("INV-{}", id),
      "created_at": "2025-01-01T00:00:00", "expires_at": "2099-01-01T00:00:00",
      "used": used, "used_by": if used { json!("bob") } else { json!(null) },
      "created_by": "root"
    })
  }

  async fn mount_listing(server: &MockServer) {
    Mock::given(method("GET"))
      .and(path("/api/invites"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({"invites": [
        invite_json(1, false),
        invite_json(2, true),
        invite_json(3, false),
      ]})))
      .mount(server)
      .await;
    Mock::given(method("GET"))
      .and(path("/api/invites/limits"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({
        "monthly_limit": 5, "used_invites": 1, "remaining_invites": 4,
        "global_limits": {"admin": 100, "support": 20, "user": 5}
      })))
      .mount(server)
      .await;
  }

  async fn wait_idle(view: &mut InvitesView, state: &mut AppState) {
    for _ in 0..100 {
      view.tick(state);
      if !view.query.is_loading() && !view.action.is_pending() {
        return;
      }
      tokio::time::sleep(Duration::from_millis(10)).await;
    }
  }

  fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
  }

  #[test]
  fn test_parse_limits_bounds() {
    let ok = parse_limits(&strings(&["10", "5", "1"])).unwrap();
    assert_eq!(ok, RoleLimits { admin: 10, support: 5, user: 1 });
    assert!(parse_limits(&strings(&["10", "-1", "1"])).is_err());
    assert!(parse_limits(&strings(&["10", "5", "5000"])).is_err());
  }

  #[tokio::test]
  async fn test_select_all_skips_used_and_bulk_deletes() {
    let server = MockServer::start().await;
    mount_listing(&server).await;
    Mock::given(method("POST"))
      .and(path("/api/admin/invites/delete"))
      .and(body_json(json!({"invite_ids": [1, 3]})))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({"deleted_count": 2})))
      .expect(1)
      .mount(&server)
      .await;

    let (mut state, _rx) = state_for(&server.uri());
    state.sign_in(admin());
    let mut view = InvitesView::new(&state);
    wait_idle(&mut view, &mut state).await;
    assert_eq!(view.query.data().map(|d| d.limits.remaining_invites), Some(4));

    view.handle_key(key(KeyCode::Char('A')), &mut state);
    assert_eq!(view.marked.iter().copied().collect::<Vec<_>>(), vec![1, 3]);

    view.handle_key(key(KeyCode::Char('D')), &mut state);
    assert!(view.confirm.is_active());
    view.handle_key(key(KeyCode::Char('y')), &mut state);
    wait_idle(&mut view, &mut state).await;
    wait_idle(&mut view, &mut state).await;

    assert!(view.marked.is_empty());
    assert!(state.toasts.iter().any(|t| t.message == "2 invites deleted"));
  }

  #[tokio::test]
  async fn test_plain_user_cannot_delete() {
    let server = MockServer::start().await;
    mount_listing(&server).await;

    let (mut state, _rx) = state_for(&server.uri());
    let mut user = admin();
    user.profile.role = Role::User;
    state.sign_in(user);
    let mut view = InvitesView::new(&state);
    wait_idle(&mut view, &mut state).await;

    view.handle_key(key(KeyCode::Char('d')), &mut state);
    assert!(!view.confirm.is_active());
  }
}
