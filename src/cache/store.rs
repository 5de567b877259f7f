use super::ResourceKind;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A cached payload and the instant it was fetched.
#[derive(Clone)]
struct CacheEntry {
  payload: Arc<dyn Any + Send + Sync>,
  fetched_at: Instant,
}

/// Mapping from resource kind to the last fetched payload.
///
/// Payloads are stored type-erased; a read with the wrong type behaves like a
/// miss. The `*_at` variants take the current instant explicitly so TTL
/// boundaries can be tested without sleeping.
pub struct DataCache {
  ttl: Duration,
  entries: HashMap<ResourceKind, CacheEntry>,
}

impl DataCache {
  pub fn new(ttl: Duration) -> Self {
    Self {
      ttl,
      entries: HashMap::new(),
    }
  }

  pub fn ttl(&self) -> Duration {
    self.ttl
  }

  /// Whether `kind` holds a payload younger than the TTL.
  pub fn is_valid(&self, kind: ResourceKind) -> bool {
    self.is_valid_at(kind, Instant::now())
  }

  pub fn is_valid_at(&self, kind: ResourceKind, now: Instant) -> bool {
    self
      .entries
      .get(&kind)
      .map(|e| now.saturating_duration_since(e.fetched_at) < self.ttl)
      .unwrap_or(false)
  }

  /// Store a payload for `kind`, stamped with the current instant.
  pub fn update<T: Send + Sync + 'static>(&mut self, kind: ResourceKind, payload: T) {
    self.update_at(kind, payload, Instant::now());
  }

  pub fn update_at<T: Send + Sync + 'static>(
    &mut self,
    kind: ResourceKind,
    payload: T,
    now: Instant,
  ) {
    self.entries.insert(
      kind,
      CacheEntry {
        payload: Arc::new(payload),
        fetched_at: now,
      },
    );
  }

  /// Read a valid payload for `kind`.
  pub fn get<T: Clone + 'static>(&self, kind: ResourceKind) -> Option<T> {
    self.get_at(kind, Instant::now())
  }

  pub fn get_at<T: Clone + 'static>(&self, kind: ResourceKind, now: Instant) -> Option<T> {
    if !self.is_valid_at(kind, now) {
      return None;
    }
    self
      .entries
      .get(&kind)
      .and_then(|e| e.payload.downcast_ref::<T>())
      .cloned()
  }

  /// When `kind` was last stored, valid or not
  pub fn fetched_at(&self, kind: ResourceKind) -> Option<Instant> {
    self.entries.get(&kind).map(|e| e.fetched_at)
  }

  /// Clear one entry, or every entry when `kind` is `None`.
  pub fn clear(&mut self, kind: Option<ResourceKind>) {
    match kind {
      Some(kind) => {
        self.entries.remove(&kind);
      }
      None => self.entries.clear(),
    }
  }
}

impl Default for DataCache {
  fn default() -> Self {
    Self::new(super::DEFAULT_TTL)
  }
}
