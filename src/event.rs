use crossterm::event::{self, Event as CrosstermEvent, KeyEvent, KeyEventKind};
use std::time::Duration;
use tokio::sync::mpsc;

/// Application events
#[derive(Debug)]
pub enum Event {
  /// Terminal key press
  Key(KeyEvent),
  /// Periodic tick for UI refresh and query polling
  Tick,
  /// The server rejected a token; the session must end if it is still the
  /// one in use. Carries the fingerprint of the token that was sent.
  SessionExpired { token: Option<String> },
  /// The server refused an action for the current account
  AccessDenied(String),
  /// A background query or action failed
  Failed { context: String, message: String },
}

/// Event handler that produces events from terminal input and a tick timer.
///
/// API clients get a sender via [`EventHandler::sender`] so session signals
/// arrive on the same queue as key presses.
pub struct EventHandler {
  tx: mpsc::UnboundedSender<Event>,
  rx: mpsc::UnboundedReceiver<Event>,
}

impl EventHandler {
  /// Create an event handler without a terminal reader
  pub fn new() -> Self {
    let (tx, rx) = mpsc::unbounded_channel();
    Self { tx, rx }
  }

  /// Spawn the terminal reader with the given tick rate
  pub fn start_terminal(&self, tick_rate: Duration) {
    let tx = self.tx.clone();

    // crossterm polling blocks, keep it off the async workers
    tokio::task::spawn_blocking(move || loop {
      if event::poll(tick_rate).unwrap_or(false) {
        if let Ok(CrosstermEvent::Key(key)) = event::read() {
          // Windows reports releases too
          if key.kind == KeyEventKind::Press && tx.send(Event::Key(key)).is_err() {
            break;
          }
        }
      } else if tx.send(Event::Tick).is_err() {
        break;
      }
    });
  }

  pub fn sender(&self) -> mpsc::UnboundedSender<Event> {
    self.tx.clone()
  }

  /// Receive the next event
  pub async fn next(&mut self) -> Option<Event> {
    self.rx.recv().await
  }

  /// Receive without waiting, for tests and draining
  #[cfg(test)]
  pub fn try_next(&mut self) -> Option<Event> {
    self.rx.try_recv().ok()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn test_sender_feeds_queue() {
    let mut events = EventHandler::new();
    events
      .sender()
      .send(Event::SessionExpired { token: None })
      .unwrap();
    assert!(matches!(
      events.next().await,
      Some(Event::SessionExpired { token: None })
    ));
    assert!(events.try_next().is_none());
  }
}
