use crate::session::Session;
use crate::ui::theme::Palette;
use crate::ui::view::ShortcutInfo;
use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

/// Draw the header bar with title, who is signed in, and shortcuts
pub fn draw_header(
  frame: &mut Frame,
  area: Rect,
  title: &str,
  session: &Session,
  language: &str,
  shortcuts: &[ShortcutInfo],
  palette: &Palette,
) {
  let separator = || Span::styled("│", Style::default().fg(palette.dim));

  let mut spans = vec![
    Span::styled(" keydeck ", Style::default().fg(palette.accent).bold()),
    separator(),
    Span::styled(format!(" {} ", title), Style::default().fg(palette.fg)),
    separator(),
  ];

  match session.profile() {
    Some(profile) => {
      spans.push(Span::styled(
        format!(" {} ", profile.username),
        Style::default().fg(palette.overlay).bold(),
      ));
      spans.push(Span::styled(
        format!("({}) ", profile.role.label()),
        Style::default().fg(palette.dim),
      ));
    }
    None => spans.push(Span::styled(" guest ", Style::default().fg(palette.dim))),
  }
  spans.push(separator());
  spans.push(Span::styled(
    format!(" {} ", language),
    Style::default().fg(palette.dim),
  ));
  spans.push(Span::raw("  "));

  let mut sorted = shortcuts.to_vec();
  sorted.sort_by_key(|s| s.priority);
  for (i, shortcut) in sorted.iter().enumerate() {
    if i > 0 {
      spans.push(Span::raw("   "));
    }
    spans.push(Span::styled(
      format!("<{}>", shortcut.key),
      Style::default().fg(palette.accent),
    ));
    spans.push(Span::styled(
      format!(" {}", shortcut.label),
      Style::default().fg(palette.dim),
    ));
  }

  let paragraph = Paragraph::new(Line::from(spans)).style(Style::default().bg(palette.bg));
  frame.render_widget(paragraph, area);
}
