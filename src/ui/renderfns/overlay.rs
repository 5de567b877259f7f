use crate::ui::theme::Palette;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear};

/// Rect anchored one cell in from the top-left of `area`, used by the
/// command and search prompts
pub fn prompt_rect(area: Rect, height: u16) -> Rect {
  let width = (area.width * 60 / 100).clamp(30.min(area.width), 60.min(area.width));
  let x = area.x + 1.min(area.width);
  let y = area.y + 1.min(area.height);
  Rect::new(
    x,
    y,
    width.min(area.width.saturating_sub(1)),
    height.min(area.height.saturating_sub(1)),
  )
}

/// Rect of the given size centered in `area`, shrunk to fit
pub fn centered_rect(area: Rect, width: u16, height: u16) -> Rect {
  let width = width.min(area.width);
  let height = height.min(area.height);
  let x = area.x + (area.width - width) / 2;
  let y = area.y + (area.height - height) / 2;
  Rect::new(x, y, width, height)
}

/// Clear `rect` and draw a bordered overlay frame. Returns the inner area.
pub fn draw_overlay_frame(frame: &mut Frame, rect: Rect, title: &str, palette: &Palette) -> Rect {
  frame.render_widget(Clear, rect);
  let block = Block::default()
    .borders(Borders::ALL)
    .border_style(Style::default().fg(palette.overlay))
    .style(Style::default().bg(palette.bg).fg(palette.fg))
    .title(format!(" {} ", title));
  let inner = block.inner(rect);
  frame.render_widget(block, rect);
  inner
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_centered_rect_fits() {
    let area = Rect::new(0, 0, 100, 40);
    let r = centered_rect(area, 20, 10);
    assert_eq!(r, Rect::new(40, 15, 20, 10));

    let small = Rect::new(0, 0, 10, 5);
    let r = centered_rect(small, 20, 10);
    assert_eq!(r, small);
  }

  #[test]
  fn test_prompt_rect_stays_inside() {
    let area = Rect::new(0, 1, 120, 30);
    let r = prompt_rect(area, 3);
    assert_eq!(r.x, 1);
    assert_eq!(r.y, 2);
    assert_eq!(r.width, 60);
    assert_eq!(r.height, 3);

    let tiny = Rect::new(0, 0, 20, 2);
    let r = prompt_rect(tiny, 3);
    assert!(r.right() <= tiny.right());
    assert!(r.bottom() <= tiny.bottom());
  }
}
