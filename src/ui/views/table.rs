//! Search, paging and selection shared by the table views.

use crate::cache::ResourceKind;
use crate::pagination::Paginator;
use crate::query::{Query, QueryState};
use crate::search::{filter_items, Searchable};
use crate::state::AppState;
use crate::ui::components::{Column, KeyResult, SearchEvent, SearchInput};
use crate::ui::ensure_valid_row;
use crate::ui::renderfns::pager_line;
use crate::ui::theme::Palette;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState};

/// What a view hands over to draw one page of its table
pub struct TablePage<'a> {
  pub title: String,
  pub columns: &'a [Column],
  pub rows: Vec<Row<'a>>,
  /// Rows after filtering, across all pages
  pub total: usize,
  /// Shown instead of the table when `total` is zero
  pub empty: &'a str,
}

/// Search box, page position and row cursor for one resource table
pub struct TablePane {
  kind: ResourceKind,
  search: SearchInput,
  table_state: TableState,
}

impl TablePane {
  pub fn new(kind: ResourceKind) -> Self {
    Self {
      kind,
      search: SearchInput::new(),
      table_state: TableState::default().with_selected(Some(0)),
    }
  }

  pub fn is_searching(&self) -> bool {
    self.search.is_active()
  }

  pub fn filter<'a, T: Searchable>(&self, items: &'a [T]) -> Vec<&'a T> {
    filter_items(items, self.search.query())
  }

  /// The filtered rows on the current page
  pub fn page<'a, T: Searchable>(&self, items: &'a [T], paginator: &Paginator) -> Vec<&'a T> {
    let filtered = self.filter(items);
    paginator.page_slice(self.kind, &filtered).to_vec()
  }

  /// Row under the cursor, if the page has one
  pub fn selected<'a, T: Searchable>(&self, items: &'a [T], paginator: &Paginator) -> Option<&'a T> {
    let idx = self.table_state.selected()?;
    self.page(items, paginator).get(idx).copied()
  }

  /// After a refetch: pull the page back inside the list
  pub fn settle<T: Searchable>(&mut self, items: &[T], paginator: &mut Paginator) {
    let total = self.filter(items).len();
    if paginator.clamp(self.kind, total) {
      self.table_state.select(Some(0));
    }
  }

  /// Search prompt keys. A new query goes back to page 1.
  pub fn handle_search(&mut self, key: KeyEvent, paginator: &mut Paginator) -> Option<()> {
    match self.search.handle_key(key) {
      KeyResult::Event(SearchEvent::Changed(_)) => {
        paginator.reset_page(self.kind);
        self.table_state.select(Some(0));
        Some(())
      }
      KeyResult::Event(SearchEvent::Submitted) | KeyResult::Handled => Some(()),
      KeyResult::NotHandled => None,
    }
  }

  /// Row cursor and page keys
  pub fn handle_navigation(
    &mut self,
    key: KeyEvent,
    total: usize,
    paginator: &mut Paginator,
  ) -> Option<()> {
    match key.code {
      KeyCode::Char('j') | KeyCode::Down => {
        self.table_state.select_next();
        Some(())
      }
      KeyCode::Char('k') | KeyCode::Up => {
        self.table_state.select_previous();
        Some(())
      }
      KeyCode::Char(']') | KeyCode::Right => {
        if paginator.controls(self.kind, total).next_enabled {
          paginator.next_page(self.kind);
          self.table_state.select(Some(0));
        }
        Some(())
      }
      KeyCode::Char('[') | KeyCode::Left => {
        paginator.prev_page(self.kind);
        self.table_state.select(Some(0));
        Some(())
      }
      KeyCode::Home => {
        paginator.go_to_page(self.kind, 1);
        self.table_state.select(Some(0));
        Some(())
      }
      KeyCode::End => {
        let last = paginator.total_pages(total).max(1);
        paginator.go_to_page(self.kind, last);
        self.table_state.select(Some(0));
        Some(())
      }
      _ => None,
    }
  }

  /// Bordered table with a pager line underneath
  pub fn render(&mut self, frame: &mut Frame, area: Rect, table: TablePage, state: &AppState) {
    let palette = state.palette();
    let mut title = table.title;
    if !self.search.query().is_empty() {
      title = format!("{} [/{}]", title, self.search.query());
    }

    let block = Block::default()
      .title(format!(" {} ", title))
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(palette.border));

    if table.total == 0 {
      let paragraph = Paragraph::new(table.empty)
        .block(block)
        .style(Style::default().fg(palette.dim));
      frame.render_widget(paragraph, area);
      self.search.render_overlay(frame, area, &palette);
      return;
    }

    let inner = block.inner(area);
    frame.render_widget(block, area);
    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([Constraint::Min(1), Constraint::Length(1)])
      .split(inner);

    let row_count = table.rows.len();
    ensure_valid_row(&mut self.table_state, row_count);

    let header = Row::new(
      table
        .columns
        .iter()
        .map(|c| Cell::from(c.title))
        .collect::<Vec<_>>(),
    )
    .style(Style::default().fg(palette.accent).bold());
    let widths: Vec<Constraint> = table
      .columns
      .iter()
      .map(|c| Constraint::Min(c.width))
      .collect();

    let widget = Table::new(table.rows, widths)
      .header(header)
      .row_highlight_style(highlight(&palette))
      .highlight_symbol("> ");
    frame.render_stateful_widget(widget, chunks[0], &mut self.table_state);

    let controls = state.paginator.controls(self.kind, table.total);
    frame.render_widget(
      Paragraph::new(pager_line(&controls, table.total, &palette)),
      chunks[1],
    );

    self.search.render_overlay(frame, area, &palette);
  }
}

/// Rows a list query has delivered so far
pub fn loaded<T: Send + 'static>(query: &Query<Vec<T>>) -> &[T] {
  query.data().map(Vec::as_slice).unwrap_or(&[])
}

/// Table title carrying the query state, e.g. "Users (42)"
pub fn status_title<T: Send + 'static>(label: &str, query: &Query<T>, total: usize) -> String {
  match query.state() {
    QueryState::Loading => format!("{} (loading...)", label),
    QueryState::Error(e) => format!("{} (error: {})", label, e),
    _ => format!("{} ({})", label, total),
  }
}

/// What an empty table says, depending on why it is empty
pub fn empty_text<'a, T: Send + 'static>(query: &Query<T>, none: &'a str) -> &'a str {
  match query.state() {
    QueryState::Loading | QueryState::Idle => "Loading...",
    QueryState::Error(_) => "Failed to load. Press 'r' to retry.",
    QueryState::Success(_) => none,
  }
}

fn highlight(palette: &Palette) -> Style {
  Style::default()
    .bg(palette.highlight_bg)
    .add_modifier(Modifier::BOLD)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::types::Invite;
  use chrono::{TimeZone, Utc};
  use crossterm::event::KeyModifiers;

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  fn invites(n: u64) -> Vec<Invite> {
    let t = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
    (1..=n)
      .map(|id| Invite {
        id,
        code: format!("INV-{:03}", id),
        created_at: t,
        expires_at: t,
        used: false,
        used_by: None,
        created_by: "admin".into(),
      })
      .collect()
  }

  #[test]
  fn test_next_page_stops_at_last() {
    let items = invites(15);
    let mut paginator = Paginator::new(10);
    let mut pane = TablePane::new(ResourceKind::Invites);
    pane.handle_navigation(key(KeyCode::Char(']')), items.len(), &mut paginator);
    pane.handle_navigation(key(KeyCode::Char(']')), items.len(), &mut paginator);
    assert_eq!(paginator.page(ResourceKind::Invites), 2);
    assert_eq!(pane.page(&items, &paginator).len(), 5);
  }

  #[test]
  fn test_home_and_end_jump() {
    let items = invites(35);
    let mut paginator = Paginator::new(10);
    let mut pane = TablePane::new(ResourceKind::Invites);
    pane.handle_navigation(key(KeyCode::End), items.len(), &mut paginator);
    assert_eq!(paginator.page(ResourceKind::Invites), 4);
    pane.handle_navigation(key(KeyCode::Home), items.len(), &mut paginator);
    assert_eq!(paginator.page(ResourceKind::Invites), 1);
  }

  #[test]
  fn test_search_resets_page() {
    let items = invites(25);
    let mut paginator = Paginator::new(10);
    paginator.go_to_page(ResourceKind::Invites, 3);
    let mut pane = TablePane::new(ResourceKind::Invites);
    pane.handle_search(key(KeyCode::Char('/')), &mut paginator);
    pane.handle_search(key(KeyCode::Char('2')), &mut paginator);
    assert_eq!(paginator.page(ResourceKind::Invites), 1);
    assert!(pane.filter(&items).iter().all(|i| i.code.contains('2')));
  }

  #[test]
  fn test_settle_after_shrink() {
    let mut paginator = Paginator::new(10);
    paginator.go_to_page(ResourceKind::Invites, 3);
    let mut pane = TablePane::new(ResourceKind::Invites);
    pane.settle(&invites(12), &mut paginator);
    assert_eq!(paginator.page(ResourceKind::Invites), 2);
    let selected = pane.selected(&invites(12), &paginator).map(|i| i.id);
    assert_eq!(selected, Some(11));
  }
}
