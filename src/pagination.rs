//! Per-resource page bookkeeping for the table views.

use crate::cache::ResourceKind;
use std::collections::HashMap;

pub const DEFAULT_PAGE_SIZE: usize = 10;

/// How many page links to show on each side of the current page
const WINDOW: usize = 2;

/// A single numbered link in the pager
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLink {
  pub number: usize,
  pub current: bool,
}

/// Everything needed to draw a pager for one table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageControls {
  pub current: usize,
  pub total_pages: usize,
  pub prev_enabled: bool,
  pub next_enabled: bool,
  pub pages: Vec<PageLink>,
}

impl PageControls {
  /// A table that fits on one page needs no pager
  pub fn is_single_page(&self) -> bool {
    self.total_pages <= 1
  }
}

/// Current 1-based page per resource kind.
///
/// Kinds that were never touched are on page 1. `next_page` does not know the
/// list length; callers bound it with [`Paginator::clamp`] or by checking
/// [`PageControls::next_enabled`] first.
#[derive(Debug, Clone)]
pub struct Paginator {
  page_size: usize,
  pages: HashMap<ResourceKind, usize>,
}

impl Paginator {
  pub fn new(page_size: usize) -> Self {
    Self {
      page_size: page_size.max(1),
      pages: HashMap::new(),
    }
  }

  pub fn page_size(&self) -> usize {
    self.page_size
  }

  pub fn page(&self, kind: ResourceKind) -> usize {
    self.pages.get(&kind).copied().unwrap_or(1)
  }

  pub fn reset_page(&mut self, kind: ResourceKind) {
    self.pages.insert(kind, 1);
  }

  pub fn next_page(&mut self, kind: ResourceKind) {
    let page = self.page(kind);
    self.pages.insert(kind, page + 1);
  }

  pub fn prev_page(&mut self, kind: ResourceKind) {
    let page = self.page(kind);
    self.pages.insert(kind, page.saturating_sub(1).max(1));
  }

  pub fn go_to_page(&mut self, kind: ResourceKind, page: usize) {
    self.pages.insert(kind, page.max(1));
  }

  pub fn total_pages(&self, total: usize) -> usize {
    total.div_ceil(self.page_size)
  }

  /// Items `[(page-1)*size, page*size)` of `items`, empty when the page is
  /// past the end.
  pub fn page_slice<'a, T>(&self, kind: ResourceKind, items: &'a [T]) -> &'a [T] {
    let start = (self.page(kind) - 1).saturating_mul(self.page_size);
    if start >= items.len() {
      return &[];
    }
    let end = (start + self.page_size).min(items.len());
    &items[start..end]
  }

  /// Pull a page that ran past the end of a shrunken list back to the last
  /// page. Returns true if the page moved.
  pub fn clamp(&mut self, kind: ResourceKind, total: usize) -> bool {
    let last = self.total_pages(total).max(1);
    if self.page(kind) > last {
      self.pages.insert(kind, last);
      return true;
    }
    false
  }

  pub fn controls(&self, kind: ResourceKind, total: usize) -> PageControls {
    let total_pages = self.total_pages(total);
    let current = self.page(kind);

    let pages = if total_pages == 0 {
      Vec::new()
    } else {
      let first = current.saturating_sub(WINDOW).max(1);
      let last = (current + WINDOW).min(total_pages);
      (first..=last)
        .map(|number| PageLink {
          number,
          current: number == current,
        })
        .collect()
    };

    PageControls {
      current,
      total_pages,
      prev_enabled: current > 1,
      next_enabled: current < total_pages,
      pages,
    }
  }
}

impl Default for Paginator {
  fn default() -> Self {
    Self::new(DEFAULT_PAGE_SIZE)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const KIND: ResourceKind = ResourceKind::Users;

  fn items(n: usize) -> Vec<usize> {
    (0..n).collect()
  }

  #[test]
  fn test_twenty_five_items_in_pages_of_ten() {
    let list = items(25);
    let mut pager = Paginator::new(10);

    assert_eq!(pager.page_slice(KIND, &list), &list[0..10]);
    pager.next_page(KIND);
    assert_eq!(pager.page_slice(KIND, &list), &list[10..20]);
    pager.next_page(KIND);
    assert_eq!(pager.page_slice(KIND, &list), &list[20..25]);
  }

  #[test]
  fn test_pages_concatenate_to_list() {
    for len in [0usize, 1, 9, 10, 11, 25, 100, 101] {
      for size in [1usize, 3, 10, 50] {
        let list = items(len);
        let mut pager = Paginator::new(size);
        let mut joined = Vec::new();
        for page in 1..=pager.total_pages(len) {
          pager.go_to_page(KIND, page);
          let slice = pager.page_slice(KIND, &list);
          assert!(slice.len() <= size);
          joined.extend_from_slice(slice);
        }
        assert_eq!(joined, list, "len={len} size={size}");
      }
    }
  }

  #[test]
  fn test_go_to_page_then_slice_is_idempotent() {
    let list = items(42);
    let mut pager = Paginator::new(10);
    pager.go_to_page(KIND, 3);
    let first = pager.page_slice(KIND, &list).to_vec();
    let second = pager.page_slice(KIND, &list).to_vec();
    pager.go_to_page(KIND, 3);
    let third = pager.page_slice(KIND, &list).to_vec();
    assert_eq!(first, second);
    assert_eq!(first, third);
  }

  #[test]
  fn test_out_of_range_page_is_empty() {
    let list = items(25);
    let mut pager = Paginator::new(10);
    pager.go_to_page(KIND, 4);
    assert!(pager.page_slice(KIND, &list).is_empty());
  }

  #[test]
  fn test_clamp_moves_to_last_page() {
    let mut pager = Paginator::new(10);
    pager.go_to_page(KIND, 5);
    assert!(pager.clamp(KIND, 25));
    assert_eq!(pager.page(KIND), 3);
    assert!(!pager.clamp(KIND, 25));

    pager.go_to_page(KIND, 2);
    assert!(pager.clamp(KIND, 0));
    assert_eq!(pager.page(KIND), 1);
  }

  #[test]
  fn test_page_never_below_one() {
    let mut pager = Paginator::new(10);
    pager.prev_page(KIND);
    assert_eq!(pager.page(KIND), 1);
    pager.go_to_page(KIND, 0);
    assert_eq!(pager.page(KIND), 1);
  }

  #[test]
  fn test_kinds_are_independent() {
    let mut pager = Paginator::new(10);
    pager.go_to_page(ResourceKind::AllKeys, 4);
    assert_eq!(pager.page(ResourceKind::Users), 1);
    pager.reset_page(ResourceKind::AllKeys);
    assert_eq!(pager.page(ResourceKind::AllKeys), 1);
  }

  #[test]
  fn test_controls_window_and_boundaries() {
    let mut pager = Paginator::new(10);
    let controls = pager.controls(KIND, 95);
    assert_eq!(controls.total_pages, 10);
    assert!(!controls.prev_enabled);
    assert!(controls.next_enabled);
    let numbers: Vec<_> = controls.pages.iter().map(|p| p.number).collect();
    assert_eq!(numbers, vec![1, 2, 3]);

    pager.go_to_page(KIND, 5);
    let controls = pager.controls(KIND, 95);
    let numbers: Vec<_> = controls.pages.iter().map(|p| p.number).collect();
    assert_eq!(numbers, vec![3, 4, 5, 6, 7]);
    assert!(controls.pages.iter().filter(|p| p.current).all(|p| p.number == 5));

    pager.go_to_page(KIND, 10);
    let controls = pager.controls(KIND, 95);
    let numbers: Vec<_> = controls.pages.iter().map(|p| p.number).collect();
    assert_eq!(numbers, vec![8, 9, 10]);
    assert!(controls.prev_enabled);
    assert!(!controls.next_enabled);
  }

  #[test]
  fn test_controls_for_empty_list() {
    let pager = Paginator::new(10);
    let controls = pager.controls(KIND, 0);
    assert_eq!(controls.total_pages, 0);
    assert!(controls.pages.is_empty());
    assert!(!controls.prev_enabled);
    assert!(!controls.next_enabled);
    assert!(controls.is_single_page());
  }
}
