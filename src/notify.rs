//! Transient toasts and the in-memory error log.

use chrono::{DateTime, Local};
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// How long a toast stays on screen
pub const TOAST_TTL: Duration = Duration::from_secs(4);

/// Entries kept by [`ErrorLog`] before the oldest is dropped
pub const ERROR_LOG_CAPACITY: usize = 100;

/// Most toasts shown at once
const MAX_TOASTS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
  Info,
  Success,
  Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
  pub level: Level,
  pub message: String,
  shown_at: Instant,
}

impl Toast {
  pub fn new(level: Level, message: impl Into<String>) -> Self {
    Self {
      level,
      message: message.into(),
      shown_at: Instant::now(),
    }
  }

  pub fn info(message: impl Into<String>) -> Self {
    Self::new(Level::Info, message)
  }

  pub fn success(message: impl Into<String>) -> Self {
    Self::new(Level::Success, message)
  }

  pub fn error(message: impl Into<String>) -> Self {
    Self::new(Level::Error, message)
  }

  fn expired_at(&self, now: Instant) -> bool {
    now.saturating_duration_since(self.shown_at) >= TOAST_TTL
  }
}

/// Toasts currently on screen, newest last
#[derive(Debug, Default)]
pub struct Toasts {
  items: VecDeque<Toast>,
}

impl Toasts {
  pub fn push(&mut self, toast: Toast) {
    if self.items.len() == MAX_TOASTS {
      self.items.pop_front();
    }
    self.items.push_back(toast);
  }

  /// Drop expired toasts. Returns true if anything was removed.
  pub fn prune(&mut self) -> bool {
    self.prune_at(Instant::now())
  }

  pub fn prune_at(&mut self, now: Instant) -> bool {
    let before = self.items.len();
    self.items.retain(|t| !t.expired_at(now));
    before != self.items.len()
  }

  pub fn iter(&self) -> impl Iterator<Item = &Toast> {
    self.items.iter()
  }

  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorEntry {
  pub at: DateTime<Local>,
  /// What was being done when the error happened
  pub context: String,
  pub message: String,
}

/// Ring buffer of recent failures for operator inspection (`:errors`)
#[derive(Debug)]
pub struct ErrorLog {
  capacity: usize,
  entries: VecDeque<ErrorEntry>,
}

impl ErrorLog {
  pub fn new(capacity: usize) -> Self {
    Self {
      capacity: capacity.max(1),
      entries: VecDeque::with_capacity(capacity.max(1)),
    }
  }

  pub fn record(&mut self, context: impl Into<String>, message: impl Into<String>) {
    if self.entries.len() == self.capacity {
      self.entries.pop_front();
    }
    self.entries.push_back(ErrorEntry {
      at: Local::now(),
      context: context.into(),
      message: message.into(),
    });
  }

  /// Newest first
  pub fn entries(&self) -> impl Iterator<Item = &ErrorEntry> {
    self.entries.iter().rev()
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn clear(&mut self) {
    self.entries.clear();
  }
}

impl Default for ErrorLog {
  fn default() -> Self {
    Self::new(ERROR_LOG_CAPACITY)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_error_log_drops_oldest() {
    let mut log = ErrorLog::new(3);
    for i in 0..5 {
      log.record("load", format!("failure {i}"));
    }
    assert_eq!(log.len(), 3);
    let messages: Vec<_> = log.entries().map(|e| e.message.as_str()).collect();
    assert_eq!(messages, vec!["failure 4", "failure 3", "failure 2"]);

    log.clear();
    assert!(log.is_empty());
  }

  #[test]
  fn test_default_capacity() {
    let mut log = ErrorLog::default();
    for i in 0..(ERROR_LOG_CAPACITY + 20) {
      log.record("x", i.to_string());
    }
    assert_eq!(log.len(), ERROR_LOG_CAPACITY);
  }

  #[test]
  fn test_toasts_expire_and_are_bounded() {
    let mut toasts = Toasts::default();
    for i in 0..5 {
      toasts.push(Toast::info(format!("t{i}")));
    }
    let shown: Vec<_> = toasts.iter().map(|t| t.message.as_str()).collect();
    assert_eq!(shown, vec!["t2", "t3", "t4"]);

    assert!(!toasts.prune_at(Instant::now()));
    assert!(toasts.prune_at(Instant::now() + TOAST_TTL));
    assert!(toasts.is_empty());
  }
}
