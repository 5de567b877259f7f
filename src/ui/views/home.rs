use crate::routes::{self, Route};
use crate::state::AppState;
use crate::ui::ensure_valid_selection;
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};

/// Menu entries in display order; only the ones the session may open show up
const MENU: &[(Route, &str)] = &[
  (Route::Keys, "Your license keys"),
  (Route::Invites, "Invite codes and monthly quota"),
  (Route::Discord, "Link your Discord account"),
  (Route::ChangePassword, "Change your password"),
  (Route::Users, "Manage users"),
  (Route::AllKeys, "Manage every key"),
  (Route::Login, "Sign in"),
  (Route::Register, "Create an account with an invite code"),
  (Route::ErrorLog, "Recent errors"),
];

/// Start page: who is signed in and where they can go
pub struct HomeView {
  list_state: ListState,
}

impl HomeView {
  pub fn new() -> Self {
    Self {
      list_state: ListState::default().with_selected(Some(0)),
    }
  }

  fn entries(state: &AppState) -> Vec<(Route, &'static str)> {
    MENU
      .iter()
      .copied()
      .filter(|(route, _)| routes::allowed(*route, &state.session))
      .collect()
  }

  fn render_profile(&self, frame: &mut Frame, area: Rect, state: &AppState) {
    let palette = state.palette();
    let lines = match state.session.profile() {
      Some(profile) => {
        let discord = match (profile.discord_linked, profile.discord_username.as_deref()) {
          (true, Some(name)) => format!("linked ({})", name),
          (true, None) => "linked".to_string(),
          (false, _) => "not linked".to_string(),
        };
        vec![
          Line::from(vec![
            Span::styled("Signed in as ", Style::default().fg(palette.dim)),
            Span::styled(profile.username.clone(), Style::default().fg(palette.accent).bold()),
            Span::styled(format!(" ({})", profile.role.label()), Style::default().fg(palette.dim)),
          ]),
          Line::from(vec![
            Span::styled("Email    ", Style::default().fg(palette.dim)),
            Span::raw(profile.email.clone()),
          ]),
          Line::from(vec![
            Span::styled("Discord  ", Style::default().fg(palette.dim)),
            Span::raw(discord),
          ]),
        ]
      }
      None => vec![Line::styled(
        "Not signed in. Sign in or register with an invite code.",
        Style::default().fg(palette.dim),
      )],
    };

    let block = Block::default()
      .title(" keydeck ")
      .borders(Borders::ALL)
      .border_style(Style::default().fg(palette.border));
    frame.render_widget(Paragraph::new(lines).block(block), area);
  }

  fn render_menu(&mut self, frame: &mut Frame, area: Rect, state: &AppState) {
    let palette = state.palette();
    let entries = Self::entries(state);
    ensure_valid_selection(&mut self.list_state, entries.len());

    let items: Vec<ListItem> = entries
      .iter()
      .map(|(route, description)| {
        ListItem::new(Line::from(vec![
          Span::styled(format!("{:<12}", route.title()), Style::default().fg(palette.accent)),
          Span::styled(*description, Style::default().fg(palette.dim)),
        ]))
      })
      .collect();

    let list = List::new(items)
      .block(
        Block::default()
          .title(" Go to ")
          .borders(Borders::ALL)
          .border_style(Style::default().fg(palette.border)),
      )
      .highlight_style(
        Style::default()
          .bg(palette.highlight_bg)
          .add_modifier(Modifier::BOLD),
      )
      .highlight_symbol("> ");
    frame.render_stateful_widget(list, area, &mut self.list_state);
  }
}

impl Default for HomeView {
  fn default() -> Self {
    Self::new()
  }
}

impl View for HomeView {
  fn handle_key(&mut self, key: KeyEvent, state: &mut AppState) -> ViewAction {
    match key.code {
      KeyCode::Char('j') | KeyCode::Down => {
        self.list_state.select_next();
        ViewAction::None
      }
      KeyCode::Char('k') | KeyCode::Up => {
        self.list_state.select_previous();
        ViewAction::None
      }
      KeyCode::Enter => {
        let entries = Self::entries(state);
        self
          .list_state
          .selected()
          .and_then(|idx| entries.get(idx))
          .map(|(route, _)| ViewAction::Navigate(*route))
          .unwrap_or(ViewAction::None)
      }
      KeyCode::Char('q') => ViewAction::Pop,
      _ => ViewAction::None,
    }
  }

  fn render(&mut self, frame: &mut Frame, area: Rect, state: &AppState) {
    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([Constraint::Length(5), Constraint::Min(3)])
      .split(area);
    self.render_profile(frame, chunks[0], state);
    self.render_menu(frame, chunks[1], state);
  }

  fn route(&self) -> Route {
    Route::Home
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new(":", "command").with_priority(10),
      ShortcutInfo::new("enter", "open").with_priority(20),
      ShortcutInfo::new("q", "quit").with_priority(30),
    ]
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::state::testing::state_for;
  use crossterm::event::KeyModifiers;

  #[test]
  fn test_anonymous_menu_offers_sign_in() {
    let (mut state, _rx) = state_for("http://localhost:5000");
    let routes: Vec<Route> = HomeView::entries(&state).iter().map(|(r, _)| *r).collect();
    assert_eq!(routes, vec![Route::Login, Route::Register, Route::ErrorLog]);

    let mut view = HomeView::new();
    let action = view.handle_key(KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE), &mut state);
    assert!(matches!(action, ViewAction::Navigate(Route::Login)));
  }
}
