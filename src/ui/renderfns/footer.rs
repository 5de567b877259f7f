use crate::ui::theme::Palette;
use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

/// Draw the footer bar with view breadcrumb and an optional status on the right
pub fn draw_footer(
  frame: &mut Frame,
  area: Rect,
  breadcrumb: &[String],
  status: Option<&str>,
  palette: &Palette,
) {
  let mut spans = vec![Span::raw(" ")];

  for (i, part) in breadcrumb.iter().enumerate() {
    if i > 0 {
      spans.push(Span::styled(" > ", Style::default().fg(palette.dim)));
    }

    let style = if i == breadcrumb.len() - 1 {
      Style::default().fg(palette.accent).bold()
    } else {
      Style::default().fg(palette.fg)
    };

    spans.push(Span::styled(part.clone(), style));
  }

  let paragraph = Paragraph::new(Line::from(spans)).style(Style::default().bg(palette.bg));
  frame.render_widget(paragraph, area);

  if let Some(status) = status {
    let right = Paragraph::new(Line::styled(
      format!("{} ", status),
      Style::default().fg(palette.dim),
    ))
    .alignment(Alignment::Right);
    frame.render_widget(right, area);
  }
}
