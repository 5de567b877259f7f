use crate::pagination::PageControls;
use crate::ui::theme::Palette;
use ratatui::prelude::*;

/// One-line pager: `< 1 2 [3] 4 5 >  page 3/9 (87 items)`, or just the item
/// count when everything fits on one page
pub fn pager_line(controls: &PageControls, total_items: usize, palette: &Palette) -> Line<'static> {
  let enabled = Style::default().fg(palette.accent);
  let disabled = Style::default().fg(palette.dim);

  if controls.is_single_page() {
    return Line::styled(format!("({} items)", total_items), disabled);
  }

  let mut spans = vec![Span::styled(
    "< ",
    if controls.prev_enabled { enabled } else { disabled },
  )];

  for link in &controls.pages {
    if link.current {
      spans.push(Span::styled(
        format!("[{}]", link.number),
        Style::default().fg(palette.overlay).bold(),
      ));
    } else {
      spans.push(Span::styled(
        link.number.to_string(),
        Style::default().fg(palette.fg),
      ));
    }
    spans.push(Span::raw(" "));
  }

  spans.push(Span::styled(
    ">",
    if controls.next_enabled { enabled } else { disabled },
  ));
  spans.push(Span::styled(
    format!(
      "  page {}/{} ({} items)",
      controls.current,
      controls.total_pages,
      total_items
    ),
    disabled,
  ));

  Line::from(spans)
}
