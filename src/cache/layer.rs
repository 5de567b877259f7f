//! Cache layer that orchestrates the TTL cache with network fetching.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tracing::debug;

use super::result::CacheResult;
use super::store::DataCache;
use super::ResourceKind;

/// Shared handle to the process-wide [`DataCache`].
///
/// The lock is only held for map access, never across a fetch, so concurrent
/// fetches of the same kind both hit the network and the last one to finish
/// wins.
#[derive(Clone)]
pub struct CacheLayer {
  cache: Arc<Mutex<DataCache>>,
}

impl CacheLayer {
  pub fn new(ttl: Duration) -> Self {
    Self {
      cache: Arc::new(Mutex::new(DataCache::new(ttl))),
    }
  }

  fn lock(&self) -> MutexGuard<'_, DataCache> {
    // Entries are plain values, a panic mid-update cannot leave them torn
    self.cache.lock().unwrap_or_else(PoisonError::into_inner)
  }

  /// Cache-first fetch.
  ///
  /// 1. If `kind` holds a valid payload of type `T`, return it
  /// 2. Otherwise run `fetcher`
  /// 3. Store a successful result; errors are returned untouched
  pub async fn fetch<T, E, F, Fut>(
    &self,
    kind: ResourceKind,
    fetcher: F,
  ) -> Result<CacheResult<T>, E>
  where
    T: Clone + Send + Sync + 'static,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
  {
    {
      let cache = self.lock();
      if let Some(hit) = cache.get::<T>(kind) {
        let fetched_at = cache.fetched_at(kind).unwrap_or_else(Instant::now);
        debug!(%kind, "cache hit");
        return Ok(CacheResult::from_cache(hit, fetched_at));
      }
    }

    debug!(%kind, "cache miss");
    let data = fetcher().await?;
    self.lock().update(kind, data.clone());
    Ok(CacheResult::from_network(data))
  }

  /// Overwrite the entry for `kind` with freshly fetched data.
  pub fn store<T: Send + Sync + 'static>(&self, kind: ResourceKind, data: T) {
    self.lock().update(kind, data);
  }

  pub fn is_valid(&self, kind: ResourceKind) -> bool {
    self.lock().is_valid(kind)
  }

  /// Clear the entries a mutating action made stale.
  pub fn invalidate(&self, kinds: &[ResourceKind]) {
    let mut cache = self.lock();
    for kind in kinds {
      debug!(%kind, "cache invalidated");
      cache.clear(Some(*kind));
    }
  }

  /// Drop everything, used at session boundaries.
  pub fn clear_all(&self) {
    debug!("cache cleared");
    self.lock().clear(None);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::atomic::{AtomicU32, Ordering};

  #[tokio::test]
  async fn test_second_fetch_is_served_from_cache() {
    let layer = CacheLayer::new(Duration::from_secs(60));
    let calls = AtomicU32::new(0);

    for _ in 0..2 {
      let result = layer
        .fetch(ResourceKind::Invites, || async {
          calls.fetch_add(1, Ordering::SeqCst);
          Ok::<_, String>(vec![1, 2, 3])
        })
        .await
        .unwrap();
      assert_eq!(result.data, vec![1, 2, 3]);
    }

    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_invalidate_forces_refetch() {
    let layer = CacheLayer::new(Duration::from_secs(60));
    layer
      .fetch(ResourceKind::AllKeys, || async { Ok::<_, String>(1u32) })
      .await
      .unwrap();
    assert!(layer.is_valid(ResourceKind::AllKeys));

    layer.invalidate(&[ResourceKind::AllKeys]);
    assert!(!layer.is_valid(ResourceKind::AllKeys));

    let result = layer
      .fetch(ResourceKind::AllKeys, || async { Ok::<_, String>(2u32) })
      .await
      .unwrap();
    assert_eq!(result.data, 2);
    assert_eq!(result.source, super::super::CacheSource::Network);
  }

  #[tokio::test]
  async fn test_errors_are_not_cached() {
    let layer = CacheLayer::new(Duration::from_secs(60));
    let err = layer
      .fetch(ResourceKind::Users, || async { Err::<u32, _>("boom") })
      .await
      .unwrap_err();
    assert_eq!(err, "boom");
    assert!(!layer.is_valid(ResourceKind::Users));
  }

  #[tokio::test]
  async fn test_zero_ttl_never_hits() {
    let layer = CacheLayer::new(Duration::ZERO);
    let calls = AtomicU32::new(0);
    for _ in 0..3 {
      layer
        .fetch(ResourceKind::Keys, || async {
          calls.fetch_add(1, Ordering::SeqCst);
          Ok::<_, String>(0u8)
        })
        .await
        .unwrap();
    }
    assert_eq!(calls.load(Ordering::SeqCst), 3);
  }
}
