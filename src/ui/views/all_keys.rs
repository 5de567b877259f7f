use super::table::{empty_text, loaded, status_title, TablePage, TablePane};
use super::users::MAX_KEY_HOURS;
use crate::api::types::{BulkAction, CleanupOptions, KeyRequest, KeyStats, KeyStatus, LicenseKey};
use crate::cache::ResourceKind;
use crate::db::keys::COLUMNS_ALL_KEYS;
use crate::notify::Toast;
use crate::query::{Mutation, Query, QueryState};
use crate::routes::Route;
use crate::state::AppState;
use crate::ui::components::{
  visible_columns, Column, ColumnEvent, ColumnPicker, Confirm, ConfirmEvent, Form, FormEvent,
  KeyResult, Picker, PickerEvent,
};
use crate::ui::renderfns::utils::{format_date, format_time_left, key_status_color};
use crate::ui::theme::Palette;
use crate::ui::view::{table_shortcuts, ShortcutInfo, View, ViewAction};
use crate::validation::{self, ValidationError};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Cell, Paragraph, Row};
use std::collections::BTreeSet;

const MARK: Column = Column::new("mark", " ", 3);

pub const COLUMNS: &[Column] = &[
  Column::new("key", "Key", 24),
  Column::new("owner", "Owner", 12),
  Column::new("status", "Status", 8),
  Column::new("created", "Created", 17),
  Column::new("expires", "Expires", 17),
  Column::new("left", "Time left", 12),
];

/// Oldest age the cleanup form accepts, in days
const MAX_CLEANUP_DAYS: u64 = 3650;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Pending {
  Revoke(u64, String),
  Restore(u64, String),
  Bulk(Vec<u64>, BulkAction),
  Cleanup(CleanupOptions),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FormKind {
  Generate,
  Cleanup,
}

fn bulk_label(action: BulkAction) -> &'static str {
  match action {
    BulkAction::Revoke => "Revoke",
    BulkAction::Restore => "Restore",
    BulkAction::Delete => "Delete",
  }
}

fn parse_generate(values: &[String]) -> Result<KeyRequest, ValidationError> {
  let hours = validation::number("Duration (hours)", &values[0], 1, MAX_KEY_HOURS)?;
  let user_id = validation::optional_number("User ID", &values[1], 1, u64::MAX)?;
  let custom = values[2].trim();
  Ok(KeyRequest {
    duration_hours: hours as u32,
    user_id,
    custom_key: (!custom.is_empty()).then(|| custom.to_string()),
  })
}

fn parse_cleanup(values: &[String]) -> Result<CleanupOptions, ValidationError> {
  Ok(CleanupOptions {
    cleanup_expired: validation::yes_no("Expired", &values[0])?,
    cleanup_revoked: validation::yes_no("Revoked", &values[1])?,
    older_than_days: validation::number("Older than (days)", &values[2], 0, MAX_CLEANUP_DAYS)?
      as u32,
  })
}

fn stats_line(stats: &KeyStats) -> String {
  format!(
    "{} total  {} expired  {} revoked  older than 30d {}  90d {}  180d {}",
    stats.total_keys,
    stats.expired_keys,
    stats.revoked_keys,
    stats.older_than_30_days,
    stats.older_than_90_days,
    stats.older_than_180_days,
  )
}

fn cell(key: &LicenseKey, column: &str, palette: &Palette) -> Cell<'static> {
  match column {
    "key" => Cell::from(key.key.clone()),
    "owner" => match &key.owner {
      Some(owner) => Cell::from(owner.username.clone()).style(Style::default().fg(palette.accent)),
      None => Cell::from("-").style(Style::default().fg(palette.dim)),
    },
    "status" => {
      let status = key.status();
      Cell::from(status.label()).style(Style::default().fg(key_status_color(status)))
    }
    "created" => Cell::from(format_date(&key.created_at)),
    "expires" => Cell::from(format_date(&key.expires_at)),
    "left" => Cell::from(format_time_left(key.time_left)),
    _ => Cell::from(""),
  }
}

/// Every key in the system, for admins
pub struct AllKeysView {
  query: Query<Vec<LicenseKey>>,
  stats: Query<KeyStats>,
  pane: TablePane,
  marked: BTreeSet<u64>,
  hidden: Vec<String>,
  columns: ColumnPicker,
  confirm: Confirm<Pending>,
  bulk: Picker<BulkAction>,
  form: Option<(FormKind, Form)>,
  action: Mutation<String>,
}

impl AllKeysView {
  pub fn new(state: &AppState) -> Self {
    let client = state.client.clone();
    let mut query = Query::new(move || {
      let client = client.clone();
      async move { client.all_keys().await.map_err(|e| e.to_string()) }
    })
    .reporting(state.reporter("load all keys"));

    let client = state.client.clone();
    let mut stats = Query::new(move || {
      let client = client.clone();
      async move { client.key_stats().await.map_err(|e| e.to_string()) }
    })
    .reporting(state.reporter("load key stats"));

    query.fetch();
    stats.fetch();

    Self {
      query,
      stats,
      pane: TablePane::new(ResourceKind::AllKeys),
      marked: BTreeSet::new(),
      hidden: state.hidden_columns(COLUMNS_ALL_KEYS),
      columns: ColumnPicker::new(),
      confirm: Confirm::new(),
      bulk: Picker::new(),
      form: None,
      action: Mutation::new().reporting(state.reporter("key action")),
    }
  }

  fn selected(&self, state: &AppState) -> Option<&LicenseKey> {
    self.pane.selected(loaded(&self.query), &state.paginator)
  }

  fn start<F>(&mut self, future: F)
  where
    F: std::future::Future<Output = Result<String, String>> + Send + 'static,
  {
    if !self.action.start(future) {
      return;
    }
    if let Some((_, form)) = &mut self.form {
      form.set_busy(true);
    }
  }

  fn run(&mut self, pending: Pending, state: &AppState) {
    let client = state.client.clone();
    match pending {
      Pending::Revoke(id, key) => self.start(async move {
        client
          .revoke_key(id)
          .await
          .map(|o| o.message.unwrap_or_else(|| format!("Key {} revoked", key)))
          .map_err(|e| e.to_string())
      }),
      Pending::Restore(id, key) => self.start(async move {
        client
          .restore_key(id)
          .await
          .map(|o| o.message.unwrap_or_else(|| format!("Key {} restored", key)))
          .map_err(|e| e.to_string())
      }),
      Pending::Bulk(ids, action) => self.start(async move {
        client
          .bulk_key_action(&ids, action)
          .await
          .map(|o| {
            let count = o.count.unwrap_or(ids.len() as u64);
            format!("{}: {} keys", bulk_label(action), count)
          })
          .map_err(|e| e.to_string())
      }),
      Pending::Cleanup(options) => self.start(async move {
        client
          .cleanup_keys(options)
          .await
          .map(|o| match o.count {
            Some(count) => format!("Cleanup removed {} keys", count),
            None => o.message.unwrap_or_else(|| "Cleanup finished".to_string()),
          })
          .map_err(|e| e.to_string())
      }),
    }
  }

  fn set_form_error(&mut self, error: ValidationError) {
    if let Some((_, form)) = &mut self.form {
      form.set_error(Some(error.to_string()));
    }
  }

  fn submit_form(&mut self, values: Vec<String>, state: &AppState) {
    let Some((kind, _)) = &self.form else {
      return;
    };
    match *kind {
      FormKind::Generate => match parse_generate(&values) {
        Ok(request) => {
          let client = state.client.clone();
          self.start(async move {
            client
              .generate_key(&request)
              .await
              .map(|issued| format!("Key {} generated", issued.code))
              .map_err(|e| e.to_string())
          });
        }
        Err(e) => self.set_form_error(e),
      },
      // Cleanup deletes rows, so it goes through a confirmation first
      FormKind::Cleanup => match parse_cleanup(&values) {
        Ok(options) => {
          self.form = None;
          let prompt = format!(
            "Delete{}{} keys older than {} days?",
            if options.cleanup_expired { " expired" } else { "" },
            if options.cleanup_revoked { " revoked" } else { "" },
            options.older_than_days
          );
          self.confirm.ask(prompt, Pending::Cleanup(options));
        }
        Err(e) => self.set_form_error(e),
      },
    }
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

    match self.bulk.handle_key(key) {
      KeyResult::Event(PickerEvent::Selected(action)) => {
        let ids: Vec<u64> = self.marked.iter().copied().collect();
        let prompt = format!("{} {} keys?", bulk_label(action), ids.len());
        self.confirm.ask(prompt, Pending::Bulk(ids, action));
        return Some(ViewAction::None);
      }
      KeyResult::NotHandled => {}
      _ => return Some(ViewAction::None),
    }

    if let KeyResult::Event(ColumnEvent::Changed(hidden)) = self.columns.handle_key(key) {
      state.set_hidden_columns(COLUMNS_ALL_KEYS, &hidden);
      self.hidden = hidden;
      return Some(ViewAction::None);
    } else if self.columns.is_active() {
      return Some(ViewAction::None);
    }

    if let Some((_, form)) = &mut self.form {
      if self.action.is_pending() {
        return Some(ViewAction::None);
      }
      match form.handle_key(key) {
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
    match key.code {
      KeyCode::Char('r') => {
        state.client.cache().invalidate(&[ResourceKind::AllKeys]);
        self.query.refetch();
        self.stats.refetch();
      }
      KeyCode::Char(' ') => {
        let id = self.selected(state)?.id;
        if !self.marked.remove(&id) {
          self.marked.insert(id);
        }
      }
      KeyCode::Char('A') => {
        let ids: Vec<u64> = self
          .pane
          .filter(loaded(&self.query))
          .into_iter()
          .map(|k| k.id)
          .collect();
        if ids.iter().all(|id| self.marked.contains(id)) {
          self.marked.clear();
        } else {
          self.marked.extend(ids);
        }
      }
      KeyCode::Char('v') => {
        let key = self.selected(state)?;
        if key.status() == KeyStatus::Revoked {
          state.notify(Toast::info(format!("Key {} is already revoked", key.key)));
        } else {
          let prompt = format!("Revoke key {}?", key.key);
          let pending = Pending::Revoke(key.id, key.key.clone());
          self.confirm.ask(prompt, pending);
        }
      }
      KeyCode::Char('e') => {
        let key = self.selected(state)?;
        let pending = Pending::Restore(key.id, key.key.clone());
        self.run(pending, state);
      }
      KeyCode::Char('b') => {
        if self.marked.is_empty() {
          state.notify(Toast::info("Mark keys with space first"));
        } else {
          let options = [BulkAction::Revoke, BulkAction::Restore, BulkAction::Delete]
            .into_iter()
            .map(|a| (bulk_label(a).to_string(), a))
            .collect();
          let title = format!("{} marked keys", self.marked.len());
          self.bulk.show(title, options, 0);
        }
      }
      KeyCode::Char('n') => {
        let form = Form::new("Generate key")
          .field_with_value("Duration (hours)", "720")
          .field("User ID (blank for none)")
          .field("Custom key");
        self.form = Some((FormKind::Generate, form));
      }
      KeyCode::Char('C') => {
        let defaults = CleanupOptions::default();
        let flag = |on: bool| if on { "y" } else { "n" };
        let form = Form::new("Clean up keys")
          .field_with_value("Expired (y/n)", flag(defaults.cleanup_expired))
          .field_with_value("Revoked (y/n)", flag(defaults.cleanup_revoked))
          .field_with_value("Older than (days)", &defaults.older_than_days.to_string());
        self.form = Some((FormKind::Cleanup, form));
      }
      KeyCode::Char('c') => self.columns.show(COLUMNS, &self.hidden),
      KeyCode::Char('q') | KeyCode::Esc => return Some(ViewAction::Navigate(Route::Home)),
      _ => return None,
    }
    Some(ViewAction::None)
  }
}

impl View for AllKeysView {
  fn handle_key(&mut self, key: KeyEvent, state: &mut AppState) -> ViewAction {
    self
      .handle_overlays(key, state)
      .or_else(|| self.handle_navigation(key, state))
      .or_else(|| self.handle_actions(key, state))
      .unwrap_or(ViewAction::None)
  }

  fn tick(&mut self, state: &mut AppState) -> ViewAction {
    if self.query.poll() {
      let present: BTreeSet<u64> = loaded(&self.query).iter().map(|k| k.id).collect();
      self.marked.retain(|id| present.contains(id));
      self.pane.settle(loaded(&self.query), &mut state.paginator);
    }
    self.stats.poll();
    match self.action.poll() {
      Some(Ok(message)) => {
        self.form = None;
        self.marked.clear();
        state.notify(Toast::success(message));
        self.query.refetch();
        self.stats.refetch();
      }
      Some(Err(e)) => {
        if let Some((_, form)) = &mut self.form {
          form.set_busy(false);
          form.set_error(Some(e));
        }
      }
      None => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect, state: &AppState) {
    let palette = state.palette();
    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([Constraint::Length(1), Constraint::Min(3)])
      .split(area);

    let stats = match self.stats.state() {
      QueryState::Success(stats) => Line::styled(stats_line(stats), Style::default().fg(palette.fg)),
      QueryState::Error(e) => {
        Line::styled(format!("stats unavailable: {}", e), Style::default().fg(palette.error))
      }
      _ => Line::styled("loading stats...", Style::default().fg(palette.dim)),
    };
    frame.render_widget(Paragraph::new(stats), chunks[0]);

    let mut columns = vec![MARK];
    columns.extend(visible_columns(COLUMNS, &self.hidden));
    let items = loaded(&self.query);
    let total = self.pane.filter(items).len();
    let marked = &self.marked;
    let rows: Vec<Row> = self
      .pane
      .page(items, &state.paginator)
      .into_iter()
      .map(|key| {
        let mark = if marked.contains(&key.id) { "[x]" } else { "[ ]" };
        Row::new(columns.iter().map(|c| match c.id {
          "mark" => Cell::from(mark),
          id => cell(key, id, &palette),
        }))
      })
      .collect();

    let mut label = "All keys".to_string();
    if !self.marked.is_empty() {
      label = format!("{}, {} marked", label, self.marked.len());
    }
    let table = TablePage {
      title: status_title(&label, &self.query, total),
      columns: &columns,
      rows,
      total,
      empty: empty_text(&self.query, "No keys match."),
    };
    self.pane.render(frame, chunks[1], table, state);

    if let Some((_, form)) = &self.form {
      form.render(frame, area, &palette);
    }
    self.bulk.render_overlay(frame, area, &palette);
    self.columns.render_overlay(frame, area, &palette);
    self.confirm.render_overlay(frame, area, &palette);
  }

  fn route(&self) -> Route {
    Route::AllKeys
  }

  fn captures_input(&self) -> bool {
    self.form.is_some()
      || self.confirm.is_active()
      || self.bulk.is_active()
      || self.columns.is_active()
      || self.pane.is_searching()
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    let mut shortcuts = table_shortcuts();
    shortcuts.extend([
      ShortcutInfo::new("space", "mark").with_priority(40),
      ShortcutInfo::new("b", "bulk").with_priority(41),
      ShortcutInfo::new("v", "revoke").with_priority(42),
      ShortcutInfo::new("e", "restore").with_priority(43),
      ShortcutInfo::new("n", "new").with_priority(44),
      ShortcutInfo::new("C", "cleanup").with_priority(45),
      ShortcutInfo::new("c", "columns").with_priority(46),
    ]);
    shortcuts
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::state::testing::state_for;
  use crossterm::event::KeyModifiers;
  use serde_json::json;
  use std::time::Duration;
  use wiremock::matchers::{body_json, method, path};
  use wiremock::{Mock, MockServer, ResponseTemplate};

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
  }

  fn key_json(id: u64, is_active: bool) -> serde_json::Value {
    json!({
      "id": id, "key": format!("KEY-{}", id),
      "created_at": "2025-01-01T00:00:00Z", "expires_at": "2025-02-01T00:00:00Z",
      "is_active": is_active, "time_left": 3600,
      "user": {"id": 5, "username": "owner"}
    })
  }

  async fn mount_listing(server: &MockServer) {
    Mock::given(method("GET"))
      .and(path("/api/admin/keys"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({"keys": [
        key_json(7, true),
        key_json(8, true),
        key_json(9, false),
      ]})))
      .mount(server)
      .await;
    Mock::given(method("GET"))
      .and(path("/api/admin/keys/stats"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({
        "total_keys": 3, "expired_keys": 0, "revoked_keys": 1
      })))
      .mount(server)
      .await;
  }

  async fn wait_idle(view: &mut AllKeysView, state: &mut AppState) {
    for _ in 0..100 {
      view.tick(state);
      if !view.query.is_loading() && !view.stats.is_loading() && !view.action.is_pending() {
        return;
      }
      tokio::time::sleep(Duration::from_millis(10)).await;
    }
  }

  #[test]
  fn test_generate_form_parsing() {
    let request = parse_generate(&strings(&["24", "", "VIP-1"])).unwrap();
    assert_eq!(request.duration_hours, 24);
    assert_eq!(request.user_id, None);
    assert_eq!(request.custom_key.as_deref(), Some("VIP-1"));

    let request = parse_generate(&strings(&["24", "12", ""])).unwrap();
    assert_eq!(request.user_id, Some(12));
    assert!(parse_generate(&strings(&["100000", "", ""])).is_err());
  }

  #[test]
  fn test_cleanup_form_parsing() {
    let options = parse_cleanup(&strings(&["y", "n", "90"])).unwrap();
    assert!(options.cleanup_expired);
    assert!(!options.cleanup_revoked);
    assert_eq!(options.older_than_days, 90);
    assert!(parse_cleanup(&strings(&["sure", "n", "90"])).is_err());
  }

  #[test]
  fn test_stats_line() {
    let stats = KeyStats {
      total_keys: 10,
      expired_keys: 2,
      revoked_keys: 1,
      ..KeyStats::default()
    };
    assert!(stats_line(&stats).starts_with("10 total  2 expired  1 revoked"));
  }

  #[tokio::test]
  async fn test_revoke_refetches_listing() {
    let server = MockServer::start().await;
    mount_listing(&server).await;
    Mock::given(method("POST"))
      .and(path("/api/admin/keys/7/revoke"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
      .expect(1)
      .mount(&server)
      .await;

    let (mut state, _rx) = state_for(&server.uri());
    let mut view = AllKeysView::new(&state);
    wait_idle(&mut view, &mut state).await;

    view.handle_key(key(KeyCode::Char('v')), &mut state);
    assert!(view.confirm.is_active());
    view.handle_key(key(KeyCode::Char('y')), &mut state);
    wait_idle(&mut view, &mut state).await;
    wait_idle(&mut view, &mut state).await;

    assert!(state.toasts.iter().any(|t| t.message == "Key KEY-7 revoked"));
    let listings = server
      .received_requests()
      .await
      .unwrap_or_default()
      .iter()
      .filter(|r| r.method.as_str() == "GET" && r.url.path() == "/api/admin/keys")
      .count();
    assert_eq!(listings, 2);
  }

  #[tokio::test]
  async fn test_bulk_delete_marked() {
    let server = MockServer::start().await;
    mount_listing(&server).await;
    Mock::given(method("POST"))
      .and(path("/api/admin/keys/bulk-action"))
      .and(body_json(json!({"key_ids": [7, 9], "action": "delete"})))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({"affected_count": 2})))
      .expect(1)
      .mount(&server)
      .await;

    let (mut state, _rx) = state_for(&server.uri());
    let mut view = AllKeysView::new(&state);
    wait_idle(&mut view, &mut state).await;

    view.handle_key(key(KeyCode::Char(' ')), &mut state);
    view.handle_key(key(KeyCode::Down), &mut state);
    view.handle_key(key(KeyCode::Down), &mut state);
    view.handle_key(key(KeyCode::Char(' ')), &mut state);
    assert_eq!(view.marked.iter().copied().collect::<Vec<_>>(), vec![7, 9]);

    view.handle_key(key(KeyCode::Char('b')), &mut state);
    view.handle_key(key(KeyCode::Up), &mut state);
    view.handle_key(key(KeyCode::Enter), &mut state);
    assert!(view.confirm.is_active());
    view.handle_key(key(KeyCode::Enter), &mut state);
    wait_idle(&mut view, &mut state).await;
    wait_idle(&mut view, &mut state).await;

    assert!(view.marked.is_empty());
    assert!(state.toasts.iter().any(|t| t.message == "Delete: 2 keys"));
  }
}
