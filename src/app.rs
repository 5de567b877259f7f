use crate::api::client::token_fingerprint;
use crate::api::{ApiClient, CachedApiClient};
use crate::config::Config;
use crate::db::Preferences;
use crate::event::{Event, EventHandler};
use crate::notify::Toast;
use crate::routes::{self, Route};
use crate::session;
use crate::state::AppState;
use crate::ui;
use crate::ui::components::{CommandEvent, CommandInput, KeyResult};
use crate::ui::view::{View, ViewAction};
use crate::ui::views;
use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{
  disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;
use std::io::stdout;
use std::time::Duration;
use tracing::{info, warn};

const TICK_RATE: Duration = Duration::from_millis(250);

/// What one frame draws, borrowed from the app
pub struct Screen<'a> {
  pub view: Option<&'a mut Box<dyn View>>,
  pub state: &'a AppState,
  pub command: &'a CommandInput,
  pub breadcrumb: Vec<String>,
  pub title: &'a str,
}

/// Main application state
pub struct App {
  state: AppState,

  /// Navigation stack, home at the bottom when there is more than one view
  views: Vec<Box<dyn View>>,

  /// The `:` palette, drawn over any view
  command: CommandInput,

  events: EventHandler,

  should_quit: bool,

  /// Header title
  title: String,
}

impl App {
  pub fn new(config: &Config, prefs: Preferences, events: EventHandler) -> Result<Self> {
    let client = ApiClient::new(&config.api.url)?.with_events(events.sender());
    let client = CachedApiClient::new(client, config.cache_ttl());
    let state = AppState::new(client, events.sender(), prefs, config.page_size);

    Ok(Self {
      state,
      views: Vec::new(),
      command: CommandInput::new(),
      events,
      should_quit: false,
      title: config.display_title(),
    })
  }

  pub async fn run(&mut self) -> Result<()> {
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    self.events.start_terminal(TICK_RATE);
    self.start().await;

    let result = self.event_loop(&mut terminal).await;
    restore_terminal()?;
    result
  }

  async fn event_loop<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<()> {
    while !self.should_quit {
      terminal.draw(|frame| ui::draw(frame, self))?;

      match self.events.next().await {
        Some(event) => self.handle_event(event),
        None => break,
      }
    }
    Ok(())
  }

  /// Resume a stored or injected session, then open the first view
  async fn start(&mut self) {
    let token = Config::env_token().or_else(|| self.state.stored_token());
    let Some(token) = token else {
      self.navigate(Route::Home);
      return;
    };

    match session::restore(&self.state.client, token).await {
      Ok(signed_in) => {
        self.state.sign_in(signed_in);
        self.navigate(Route::Keys);
      }
      Err(e) => {
        warn!(error = %e, "stored session could not be restored");
        self.state.sign_out();
        if e.is_unauthorized() {
          self.state.notify(Toast::info("Your session has expired, please sign in"));
          self.navigate(Route::Login);
        } else {
          self.state.fail("restore session", &e.to_string());
          self.navigate(Route::Home);
        }
      }
    }
  }

  fn handle_event(&mut self, event: Event) {
    match event {
      Event::Key(key) => self.handle_key(key),
      Event::Tick => self.tick(),
      Event::SessionExpired { token } => {
        // Late rejections of an earlier token, or of the failed restore at
        // startup, leave the current session alone
        let current = self.state.session.token().map(token_fingerprint);
        if current.is_some() && current == token {
          warn!("session rejected by server");
          self.state.sign_out();
          self.state.notify(Toast::error("Session expired, please sign in again"));
          self.navigate(Route::Login);
        }
      }
      Event::AccessDenied(message) => {
        self.state.errors.record("access denied", message.clone());
        self.state.notify(Toast::error(message));
      }
      Event::Failed { context, message } => self.state.fail(&context, &message),
    }
  }

  fn handle_key(&mut self, key: KeyEvent) {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
      self.should_quit = true;
      return;
    }

    let captures = self.views.last().is_some_and(|v| v.captures_input());
    if !captures || self.command.is_active() {
      match self.command.handle_key(key) {
        KeyResult::Event(CommandEvent::Submitted(name)) => {
          self.execute_command(&name);
          return;
        }
        KeyResult::NotHandled => {}
        _ => return,
      }
    }

    if let Some(view) = self.views.last_mut() {
      let action = view.handle_key(key, &mut self.state);
      self.apply(action);
    }
  }

  fn tick(&mut self) {
    if let Some(view) = self.views.last_mut() {
      let action = view.tick(&mut self.state);
      self.apply(action);
    }
    self.state.toasts.prune();
  }

  fn execute_command(&mut self, name: &str) {
    info!(command = name, "command");
    match name {
      "quit" => self.should_quit = true,
      "theme" => self.state.toggle_theme(),
      "lang" => {
        self.state.cycle_language();
        let message = format!("Language: {}", self.state.language);
        self.state.notify(Toast::info(message));
      }
      "logout" => {
        if self.state.session.is_authenticated() {
          self.state.sign_out();
          self.state.notify(Toast::info("Signed out"));
        }
        self.navigate(Route::Home);
      }
      other => match Route::from_command(other) {
        Some(route) => self.navigate(route),
        None => self
          .state
          .notify(Toast::error(format!("Unknown command: {}", other))),
      },
    }
  }

  fn apply(&mut self, action: ViewAction) {
    match action {
      ViewAction::None => {}
      ViewAction::Pop => {
        self.views.pop();
        if self.views.is_empty() {
          self.should_quit = true;
        }
      }
      ViewAction::Navigate(route) => self.navigate(route),
    }
  }

  /// Replace the stack with `requested`, or wherever the session is sent
  /// instead. Anything but home sits on top of a home view.
  fn navigate(&mut self, requested: Route) {
    let route = routes::resolve(requested, &self.state.session);
    if route != requested {
      info!(requested = ?requested, shown = ?route, "route redirected");
    }

    self.views.clear();
    if route != Route::Home {
      self.views.push(views::build(Route::Home, &self.state));
    }
    self.views.push(views::build(route, &self.state));
  }

  pub fn screen(&mut self) -> Screen<'_> {
    let breadcrumb = self.views.iter().map(|v| v.breadcrumb_label()).collect();
    Screen {
      view: self.views.last_mut(),
      state: &self.state,
      command: &self.command,
      breadcrumb,
      title: &self.title,
    }
  }
}

/// Leave raw mode and the alternate screen. Safe to call more than once.
pub fn restore_terminal() -> Result<()> {
  disable_raw_mode()?;
  stdout().execute(LeaveAlternateScreen)?;
  Ok(())
}
