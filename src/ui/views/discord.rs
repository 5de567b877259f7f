use crate::api::types::{IssuedCode, Profile};
use crate::query::{Mutation, Query, QueryState};
use crate::routes::Route;
use crate::state::AppState;
use crate::ui::renderfns::utils::format_date;
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use std::time::Duration;

/// The bot links accounts out of band, so the status is re-read this often
const PROFILE_REFRESH: Duration = Duration::from_secs(15);

/// Discord link status, one-time link codes and the server invite link
pub struct DiscordView {
  profile: Query<Profile>,
  invite_link: Query<String>,
  code: Option<IssuedCode>,
  action: Mutation<IssuedCode>,
}

impl DiscordView {
  pub fn new(state: &AppState) -> Self {
    let client = state.client.clone();
    let mut profile = Query::new(move || {
      let client = client.clone();
      async move { client.me().await.map_err(|e| e.to_string()) }
    })
    .with_stale_time(PROFILE_REFRESH)
    .reporting(state.reporter("load profile"));

    let client = state.client.clone();
    let mut invite_link = Query::new(move || {
      let client = client.clone();
      async move { client.discord_invite_link().await.map_err(|e| e.to_string()) }
    })
    .reporting(state.reporter("load discord invite"));

    profile.fetch();
    invite_link.fetch();

    Self {
      profile,
      invite_link,
      code: None,
      action: Mutation::new().reporting(state.reporter("discord code")),
    }
  }

  fn status_lines(&self, state: &AppState) -> Vec<Line<'static>> {
    let palette = state.palette();
    let label = |text: &'static str| Span::styled(text, Style::default().fg(palette.dim));

    let status = match self.profile.state() {
      QueryState::Idle | QueryState::Loading => {
        Span::styled("checking...", Style::default().fg(palette.dim))
      }
      QueryState::Error(e) => Span::styled(format!("unknown ({})", e), Style::default().fg(palette.error)),
      QueryState::Success(profile) => match (profile.discord_linked, &profile.discord_username) {
        (true, Some(name)) => Span::styled(
          format!("linked to {}", name),
          Style::default().fg(palette.success),
        ),
        (true, None) => Span::styled("linked", Style::default().fg(palette.success)),
        (false, _) => Span::styled("not linked", Style::default().fg(palette.overlay)),
      },
    };

    let invite = match self.invite_link.state() {
      QueryState::Success(link) => Span::styled(link.clone(), Style::default().fg(palette.accent)),
      QueryState::Error(_) => Span::styled("unavailable", Style::default().fg(palette.dim)),
      _ => Span::styled("loading...", Style::default().fg(palette.dim)),
    };

    let mut lines = vec![
      Line::from(vec![label("Status       "), status]),
      Line::from(vec![label("Server       "), invite]),
      Line::default(),
    ];

    match &self.code {
      Some(code) => {
        lines.push(Line::from(vec![
          label("Link code    "),
          Span::styled(code.code.clone(), Style::default().fg(palette.overlay).bold()),
        ]));
        if let Some(expires) = &code.expires_at {
          lines.push(Line::from(vec![
            label("Valid until  "),
            Span::raw(format_date(expires)),
          ]));
        }
        lines.push(Line::default());
        lines.push(Line::styled(
          format!("Send the bot: /link {}", code.code),
          Style::default().fg(palette.fg),
        ));
      }
      None if self.action.is_pending() => {
        lines.push(Line::styled("Generating code...", Style::default().fg(palette.dim)));
      }
      None => {
        lines.push(Line::styled(
          "Press 'g' for a one-time code, then send it to the bot to link your account.",
          Style::default().fg(palette.dim),
        ));
      }
    }
    lines
  }
}

impl View for DiscordView {
  fn handle_key(&mut self, key: KeyEvent, state: &mut AppState) -> ViewAction {
    match key.code {
      KeyCode::Char('g') => {
        let client = state.client.clone();
        self
          .action
          .start(async move { client.discord_code().await.map_err(|e| e.to_string()) });
        ViewAction::None
      }
      KeyCode::Char('r') => {
        self.profile.refetch();
        self.invite_link.refetch();
        ViewAction::None
      }
      KeyCode::Char('q') | KeyCode::Esc => ViewAction::Navigate(Route::Home),
      _ => ViewAction::None,
    }
  }

  fn tick(&mut self, state: &mut AppState) -> ViewAction {
    if self.profile.poll() {
      if let Some(profile) = self.profile.data() {
        state.session.refresh_profile(profile.clone());
      }
    } else if self.profile.is_stale() {
      self.profile.refetch();
    }
    self.invite_link.poll();
    if let Some(Ok(code)) = self.action.poll() {
      self.code = Some(code);
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect, state: &AppState) {
    let palette = state.palette();
    let block = Block::default()
      .title(" Discord ")
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(palette.border));
    let paragraph = Paragraph::new(self.status_lines(state))
      .block(block)
      .wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
  }

  fn route(&self) -> Route {
    Route::Discord
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new(":", "command").with_priority(10),
      ShortcutInfo::new("g", "link code").with_priority(20),
      ShortcutInfo::new("r", "refresh").with_priority(28),
      ShortcutInfo::new("q", "back").with_priority(30),
    ]
  }
}
