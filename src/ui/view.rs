use crate::routes::Route;
use crate::state::AppState;
use crossterm::event::KeyEvent;
use ratatui::prelude::*;

/// A keyboard shortcut hint for display in the header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShortcutInfo {
  pub key: &'static str,
  pub label: &'static str,
  pub priority: u8, // Lower = shown first
}

impl ShortcutInfo {
  pub const fn new(key: &'static str, label: &'static str) -> Self {
    Self {
      key,
      label,
      priority: 100,
    }
  }

  pub const fn with_priority(mut self, priority: u8) -> Self {
    self.priority = priority;
    self
  }
}

/// Actions that a view can request in response to user input
pub enum ViewAction {
  /// No action needed
  None,
  /// Pop current view from stack (go back)
  Pop,
  /// Replace the stack with the view for a route, subject to access checks
  Navigate(Route),
}

/// Trait for view behavior
///
/// Views handle their own input modes (search, forms, overlays) and return
/// actions for the App to execute: App → View → Components. Shared state
/// arrives as `&mut AppState`; views never hold on to it.
///
/// Views that load data asynchronously use Query<T> internally and poll it
/// in `tick()`.
pub trait View {
  /// Handle a key event, returning an action for App to execute
  fn handle_key(&mut self, key: KeyEvent, state: &mut AppState) -> ViewAction;

  /// Render the view to the frame
  fn render(&mut self, frame: &mut Frame, area: Rect, state: &AppState);

  /// Get the breadcrumb label for this view
  fn breadcrumb_label(&self) -> String {
    self.route().title().to_string()
  }

  /// Route this view answers to
  fn route(&self) -> Route;

  /// Whether a text field has focus, so single-letter app keys must not fire
  fn captures_input(&self) -> bool {
    false
  }

  /// Called on each tick to poll async queries and actions
  fn tick(&mut self, _state: &mut AppState) -> ViewAction {
    ViewAction::None
  }

  /// Keyboard shortcuts to display in the header
  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new(":", "command").with_priority(10),
      ShortcutInfo::new("q", "back").with_priority(30),
    ]
  }
}

/// Shortcuts shared by the table views
pub fn table_shortcuts() -> Vec<ShortcutInfo> {
  vec![
    ShortcutInfo::new(":", "command").with_priority(10),
    ShortcutInfo::new("/", "search").with_priority(20),
    ShortcutInfo::new("[ ]", "page").with_priority(25),
    ShortcutInfo::new("r", "refresh").with_priority(28),
    ShortcutInfo::new("q", "back").with_priority(30),
  ]
}
