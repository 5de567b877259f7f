use crate::notify::{Level, Toasts};
use crate::ui::theme::Palette;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

const TOAST_WIDTH: u16 = 48;

/// Stack toasts in the bottom-right corner of `area`, newest at the bottom
pub fn draw_toasts(frame: &mut Frame, area: Rect, toasts: &Toasts, palette: &Palette) {
  let width = TOAST_WIDTH.min(area.width);
  let mut bottom = area.bottom();

  for toast in toasts.iter().collect::<Vec<_>>().into_iter().rev() {
    if bottom < area.y + 3 {
      break;
    }
    let rect = Rect::new(area.right() - width, bottom - 3, width, 3);
    bottom -= 3;

    let (color, title) = match toast.level {
      Level::Info => (palette.accent, " info "),
      Level::Success => (palette.success, " ok "),
      Level::Error => (palette.error, " error "),
    };

    frame.render_widget(Clear, rect);
    let block = Block::default()
      .borders(Borders::ALL)
      .border_style(Style::default().fg(color))
      .style(Style::default().bg(palette.bg))
      .title(title);
    let text = super::utils::truncate(&toast.message, width.saturating_sub(2) as usize);
    frame.render_widget(
      Paragraph::new(text)
        .style(Style::default().fg(palette.fg))
        .block(block),
      rect,
    );
  }
}
