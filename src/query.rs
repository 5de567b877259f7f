//! Background fetches and actions that views poll on tick.
//!
//! A `Query<T>` owns a fetcher closure and runs it on a spawned task; the
//! result comes back over a channel and is picked up by `poll()`. A
//! `Mutation<T>` does the same for one-off actions and doubles as the
//! in-flight guard that keeps a second key press from re-sending a request.
//!
//! # Example
//!
//! ```ignore
//! let client = ctx.client.clone();
//! let mut query = Query::new(move || {
//!     let client = client.clone();
//!     async move { client.invites().await.map_err(|e| e.to_string()) }
//! })
//! .reporting(ctx.reporter("load invites"));
//!
//! query.fetch();
//!
//! // In tick
//! query.poll();
//!
//! // In render
//! match query.state() {
//!     QueryState::Loading => render_spinner(),
//!     QueryState::Success(invites) => render_table(invites),
//!     QueryState::Error(e) => render_error(e),
//!     QueryState::Idle => {}
//! }
//! ```

use crate::event::Event;
use std::future::Future;
use std::pin::Pin;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

/// The state of a query
#[derive(Debug, Clone)]
pub enum QueryState<T> {
  /// Query has not been started
  Idle,
  /// Query is currently fetching data
  Loading,
  /// Query completed successfully
  Success(T),
  /// Query failed with an error
  Error(String),
}

impl<T> QueryState<T> {
  pub fn is_loading(&self) -> bool {
    matches!(self, QueryState::Loading)
  }

  pub fn is_success(&self) -> bool {
    matches!(self, QueryState::Success(_))
  }

  pub fn is_error(&self) -> bool {
    matches!(self, QueryState::Error(_))
  }

  pub fn data(&self) -> Option<&T> {
    match self {
      QueryState::Success(data) => Some(data),
      _ => None,
    }
  }

  pub fn error(&self) -> Option<&str> {
    match self {
      QueryState::Error(e) => Some(e),
      _ => None,
    }
  }
}

/// Forwards failures to the app so they land in the error log.
#[derive(Debug, Clone)]
pub struct Reporter {
  events: mpsc::UnboundedSender<Event>,
  context: String,
}

impl Reporter {
  pub fn new(events: mpsc::UnboundedSender<Event>, context: impl Into<String>) -> Self {
    Self {
      events,
      context: context.into(),
    }
  }

  pub fn report(&self, message: &str) {
    let _ = self.events.send(Event::Failed {
      context: self.context.clone(),
      message: message.to_string(),
    });
  }
}

/// A boxed future that returns a Result<T, String>
type BoxFuture<T> = Pin<Box<dyn Future<Output = Result<T, String>> + Send>>;

/// A factory function that creates futures for fetching data
type FetcherFn<T> = Box<dyn Fn() -> BoxFuture<T> + Send + Sync>;

/// Async query for data fetching with state management.
pub struct Query<T> {
  state: QueryState<T>,
  fetcher: FetcherFn<T>,
  receiver: Option<mpsc::UnboundedReceiver<Result<T, String>>>,
  fetched_at: Option<Instant>,
  stale_time: Duration,
  reporter: Option<Reporter>,
}

impl<T: Send + 'static> Query<T> {
  /// Create a new query with the given fetcher function.
  ///
  /// The fetcher is called each time `fetch()` or `refetch()` is invoked.
  pub fn new<F, Fut>(fetcher: F) -> Self
  where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, String>> + Send + 'static,
  {
    Self {
      state: QueryState::Idle,
      fetcher: Box::new(move || Box::pin(fetcher())),
      receiver: None,
      fetched_at: None,
      stale_time: Duration::from_secs(60),
      reporter: None,
    }
  }

  /// After this duration the data is considered stale and `is_stale()` returns true.
  pub fn with_stale_time(mut self, duration: Duration) -> Self {
    self.stale_time = duration;
    self
  }

  /// Send failures to the error log
  pub fn reporting(mut self, reporter: Reporter) -> Self {
    self.reporter = Some(reporter);
    self
  }

  pub fn state(&self) -> &QueryState<T> {
    &self.state
  }

  pub fn data(&self) -> Option<&T> {
    self.state.data()
  }

  pub fn is_loading(&self) -> bool {
    self.state.is_loading()
  }

  pub fn is_success(&self) -> bool {
    self.state.is_success()
  }

  pub fn is_error(&self) -> bool {
    self.state.is_error()
  }

  pub fn error(&self) -> Option<&str> {
    self.state.error()
  }

  /// Check if the data is older than stale_time.
  pub fn is_stale(&self) -> bool {
    match &self.state {
      QueryState::Success(_) => self
        .fetched_at
        .map(|t| t.elapsed() > self.stale_time)
        .unwrap_or(true),
      _ => false,
    }
  }

  /// Start fetching data if not already loading.
  pub fn fetch(&mut self) {
    if self.state.is_loading() {
      return;
    }
    self.start_fetch();
  }

  /// Force a refetch, even if already loading or data exists.
  pub fn refetch(&mut self) {
    // Dropping the receiver discards the superseded result
    self.receiver = None;
    self.start_fetch();
  }

  /// Poll for results from a pending fetch.
  ///
  /// Returns `true` if the state changed (data arrived or error occurred).
  pub fn poll(&mut self) -> bool {
    let receiver = match &mut self.receiver {
      Some(rx) => rx,
      None => return false,
    };

    match receiver.try_recv() {
      Ok(Ok(data)) => {
        self.state = QueryState::Success(data);
        self.fetched_at = Some(Instant::now());
        self.receiver = None;
        true
      }
      Ok(Err(error)) => {
        if let Some(reporter) = &self.reporter {
          reporter.report(&error);
        }
        self.state = QueryState::Error(error);
        self.receiver = None;
        true
      }
      Err(mpsc::error::TryRecvError::Empty) => false,
      Err(mpsc::error::TryRecvError::Disconnected) => {
        // Sender dropped without sending, the fetch task panicked
        let error = "Query was cancelled".to_string();
        if let Some(reporter) = &self.reporter {
          reporter.report(&error);
        }
        self.state = QueryState::Error(error);
        self.receiver = None;
        true
      }
    }
  }

  fn start_fetch(&mut self) {
    let (tx, rx) = mpsc::unbounded_channel();
    self.receiver = Some(rx);
    self.state = QueryState::Loading;

    let future = (self.fetcher)();
    tokio::spawn(async move {
      let result = future.await;
      // Receiver may have been dropped by a refetch
      let _ = tx.send(result);
    });
  }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Query<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Query")
      .field("state", &self.state)
      .field("fetched_at", &self.fetched_at)
      .field("stale_time", &self.stale_time)
      .finish_non_exhaustive()
  }
}

/// A one-off action running in the background.
///
/// Unlike [`Query`] the future is supplied per call, since each action carries
/// its own arguments. While one is pending `start` refuses new work.
pub struct Mutation<T> {
  receiver: Option<mpsc::UnboundedReceiver<Result<T, String>>>,
  reporter: Option<Reporter>,
}

impl<T: Send + 'static> Mutation<T> {
  pub fn new() -> Self {
    Self {
      receiver: None,
      reporter: None,
    }
  }

  pub fn reporting(mut self, reporter: Reporter) -> Self {
    self.reporter = Some(reporter);
    self
  }

  pub fn is_pending(&self) -> bool {
    self.receiver.is_some()
  }

  /// Spawn `future` unless another action is still in flight.
  /// Returns false when the call was ignored.
  pub fn start<Fut>(&mut self, future: Fut) -> bool
  where
    Fut: Future<Output = Result<T, String>> + Send + 'static,
  {
    if self.is_pending() {
      return false;
    }
    let (tx, rx) = mpsc::unbounded_channel();
    self.receiver = Some(rx);
    tokio::spawn(async move {
      let _ = tx.send(future.await);
    });
    true
  }

  /// The settled result, once. `None` while pending or idle.
  pub fn poll(&mut self) -> Option<Result<T, String>> {
    let receiver = self.receiver.as_mut()?;
    let result = match receiver.try_recv() {
      Ok(result) => result,
      Err(mpsc::error::TryRecvError::Empty) => return None,
      Err(mpsc::error::TryRecvError::Disconnected) => Err("Action was cancelled".to_string()),
    };
    self.receiver = None;
    if let (Err(e), Some(reporter)) = (&result, &self.reporter) {
      reporter.report(e);
    }
    Some(result)
  }
}

impl<T: Send + 'static> Default for Mutation<T> {
  fn default() -> Self {
    Self::new()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn test_query_success() {
    let mut query = Query::new(|| async { Ok::<_, String>(vec![1, 2, 3]) });

    assert!(matches!(query.state(), QueryState::Idle));

    query.fetch();
    assert!(query.is_loading());

    tokio::time::sleep(Duration::from_millis(10)).await;

    assert!(query.poll());
    assert!(query.is_success());
    assert_eq!(query.data(), Some(&vec![1, 2, 3]));
  }

  #[tokio::test]
  async fn test_query_error_is_reported() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut query: Query<i32> = Query::new(|| async { Err("Network error: refused".to_string()) })
      .reporting(Reporter::new(tx, "load keys"));

    query.fetch();
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert!(query.poll());
    assert!(query.is_error());
    assert_eq!(query.error(), Some("Network error: refused"));
    match rx.try_recv() {
      Ok(Event::Failed { context, message }) => {
        assert_eq!(context, "load keys");
        assert_eq!(message, "Network error: refused");
      }
      other => panic!("unexpected event: {:?}", other),
    }
  }

  #[tokio::test]
  async fn test_panicked_fetch_is_reported() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut query: Query<i32> =
      Query::new(|| async { panic!("fetch blew up") }).reporting(Reporter::new(tx, "load keys"));

    query.fetch();
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert!(query.poll());
    assert_eq!(query.error(), Some("Query was cancelled"));
    match rx.try_recv() {
      Ok(Event::Failed { context, message }) => {
        assert_eq!(context, "load keys");
        assert_eq!(message, "Query was cancelled");
      }
      other => panic!("unexpected event: {:?}", other),
    }
  }

  #[tokio::test]
  async fn test_query_stale() {
    let mut query = Query::new(|| async { Ok::<_, String>(42) }).with_stale_time(Duration::ZERO);

    query.fetch();
    tokio::time::sleep(Duration::from_millis(10)).await;
    query.poll();

    assert!(query.is_stale());
  }

  #[tokio::test]
  async fn test_fetch_while_loading_is_noop() {
    let mut query = Query::new(|| async {
      tokio::time::sleep(Duration::from_millis(100)).await;
      Ok::<_, String>(42)
    });

    query.fetch();
    assert!(query.is_loading());

    query.fetch();
    assert!(query.is_loading());
  }

  #[tokio::test]
  async fn test_refetch_discards_pending() {
    let counter = std::sync::Arc::new(std::sync::atomic::AtomicU32::new(0));
    let counter_clone = counter.clone();

    let mut query = Query::new(move || {
      let counter = counter_clone.clone();
      async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        Ok::<_, String>(counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst))
      }
    });

    query.fetch();
    tokio::time::sleep(Duration::from_millis(10)).await;

    query.refetch();
    tokio::time::sleep(Duration::from_millis(100)).await;

    query.poll();
    assert_eq!(query.data(), Some(&1));
  }

  #[tokio::test]
  async fn test_mutation_guards_reentry() {
    let mut action: Mutation<u32> = Mutation::new();
    assert!(!action.is_pending());
    assert!(action.poll().is_none());

    assert!(action.start(async {
      tokio::time::sleep(Duration::from_millis(20)).await;
      Ok(1)
    }));
    assert!(action.is_pending());
    assert!(!action.start(async { Ok(2) }));

    tokio::time::sleep(Duration::from_millis(60)).await;
    assert_eq!(action.poll(), Some(Ok(1)));
    assert!(!action.is_pending());
    assert!(action.poll().is_none());

    assert!(action.start(async { Ok(3) }));
  }

  #[tokio::test]
  async fn test_mutation_failure_is_reported() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut action: Mutation<()> = Mutation::new().reporting(Reporter::new(tx, "revoke key"));
    action.start(async { Err("Key not found".to_string()) });
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert_eq!(action.poll(), Some(Err("Key not found".to_string())));
    assert!(matches!(rx.try_recv(), Ok(Event::Failed { .. })));
  }
}
