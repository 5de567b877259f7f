use super::table::{empty_text, loaded, status_title, TablePage, TablePane};
use crate::api::types::{KeyStatus, LicenseKey};
use crate::cache::ResourceKind;
use crate::notify::Toast;
use crate::query::{Mutation, Query};
use crate::routes::Route;
use crate::state::AppState;
use crate::ui::components::{Column, Form, FormEvent, KeyResult};
use crate::ui::renderfns::utils::{format_date, format_time_left, key_status_color};
use crate::ui::view::{table_shortcuts, ShortcutInfo, View, ViewAction};
use crate::validation;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Cell, Row};

const COLUMNS: &[Column] = &[
  Column::new("key", "Key", 24),
  Column::new("status", "Status", 8),
  Column::new("expires", "Expires", 17),
  Column::new("left", "Time left", 12),
];

/// The signed-in user's active keys, with a redeem form
pub struct KeysView {
  query: Query<Vec<LicenseKey>>,
  pane: TablePane,
  redeem: Option<Form>,
  action: Mutation<String>,
}

impl KeysView {
  pub fn new(state: &AppState) -> Self {
    let client = state.client.clone();
    let mut query = Query::new(move || {
      let client = client.clone();
      async move {
        client
          .keys()
          .await
          .map(|keys| {
            keys
              .into_iter()
              .filter(|k| k.status() == KeyStatus::Active)
              .collect()
          })
          .map_err(|e| e.to_string())
      }
    })
    .reporting(state.reporter("load keys"));

    // Start fetching immediately
    query.fetch();

    Self {
      query,
      pane: TablePane::new(ResourceKind::Keys),
      redeem: None,
      action: Mutation::new().reporting(state.reporter("redeem key")),
    }
  }

  fn submit_redeem(&mut self, values: Vec<String>, state: &AppState) {
    let key = match validation::required("Key", &values[0]) {
      Ok(key) => key.to_string(),
      Err(e) => {
        if let Some(form) = &mut self.redeem {
          form.set_error(Some(e.to_string()));
        }
        return;
      }
    };

    let client = state.client.clone();
    let started = self.action.start(async move {
      client
        .redeem_key(&key)
        .await
        .map(|redeemed| format!("Key {} redeemed", redeemed.key))
        .map_err(|e| e.to_string())
    });
    if let (true, Some(form)) = (started, &mut self.redeem) {
      form.set_busy(true);
    }
  }

  fn handle_overlays(&mut self, key: KeyEvent, state: &mut AppState) -> Option<ViewAction> {
    if let Some(form) = &mut self.redeem {
      if self.action.is_pending() {
        return Some(ViewAction::None);
      }
      match form.handle_key(key) {
        KeyResult::Event(FormEvent::Submitted(values)) => self.submit_redeem(values, state),
        KeyResult::Event(FormEvent::Cancelled) => self.redeem = None,
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
        state.client.cache().invalidate(&[ResourceKind::Keys]);
        self.query.refetch();
        Some(ViewAction::None)
      }
      KeyCode::Char('a') => {
        self.redeem = Some(Form::new("Redeem key").field("Key"));
        Some(ViewAction::None)
      }
      KeyCode::Char('q') | KeyCode::Esc => Some(ViewAction::Navigate(Route::Home)),
      _ => None,
    }
  }
}

impl View for KeysView {
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
        self.redeem = None;
        state.notify(Toast::success(message));
        self.query.refetch();
      }
      Some(Err(e)) => {
        if let Some(form) = &mut self.redeem {
          form.set_busy(false);
          form.set_error(Some(e));
        }
      }
      None => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect, state: &AppState) {
    let items = loaded(&self.query);
    let total = self.pane.filter(items).len();
    let rows: Vec<Row> = self
      .pane
      .page(items, &state.paginator)
      .into_iter()
      .map(|k| {
        let status = k.status();
        Row::new(vec![
          Cell::from(k.key.clone()),
          Cell::from(status.label()).style(Style::default().fg(key_status_color(status))),
          Cell::from(format_date(&k.expires_at)),
          Cell::from(format_time_left(k.time_left)),
        ])
      })
      .collect();

    let table = TablePage {
      title: status_title("Active keys", &self.query, total),
      columns: COLUMNS,
      rows,
      total,
      empty: empty_text(&self.query, "No active keys. Press 'a' to redeem one."),
    };
    self.pane.render(frame, area, table, state);

    if let Some(form) = &self.redeem {
      form.render(frame, area, &state.palette());
    }
  }

  fn route(&self) -> Route {
    Route::Keys
  }

  fn captures_input(&self) -> bool {
    self.redeem.is_some() || self.pane.is_searching()
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    let mut shortcuts = table_shortcuts();
    shortcuts.push(ShortcutInfo::new("a", "redeem").with_priority(40));
    shortcuts
  }
}
