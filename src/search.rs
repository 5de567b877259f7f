//! Free-text filtering for table views.

use crate::api::types::{Invite, LicenseKey, UserAccount};

/// Rows that can be matched against a search query
pub trait Searchable {
  /// Text fields the query is matched against
  fn search_fields(&self) -> Vec<&str>;

  /// Case-insensitive substring match on any field. `needle` must already be
  /// lowercase.
  fn matches(&self, needle: &str) -> bool {
    self
      .search_fields()
      .into_iter()
      .any(|field| field.to_lowercase().contains(needle))
  }
}

impl Searchable for UserAccount {
  fn search_fields(&self) -> Vec<&str> {
    let mut fields = vec![self.username.as_str(), self.email.as_str(), self.role.label()];
    if let Some(discord) = &self.discord_username {
      fields.push(discord);
    }
    if let Some(ip) = &self.last_ip {
      fields.push(ip);
    }
    fields
  }
}

impl Searchable for LicenseKey {
  fn search_fields(&self) -> Vec<&str> {
    let mut fields = vec![self.key.as_str(), self.status().label()];
    if let Some(owner) = &self.owner {
      fields.push(&owner.username);
    }
    fields
  }
}

impl Searchable for Invite {
  fn search_fields(&self) -> Vec<&str> {
    let mut fields = vec![self.code.as_str(), self.created_by.as_str()];
    if let Some(used_by) = &self.used_by {
      fields.push(used_by);
    }
    fields
  }
}

/// Rows whose searchable fields contain `query`, in their original order.
/// A blank query keeps everything.
pub fn filter_items<'a, T: Searchable>(items: &'a [T], query: &str) -> Vec<&'a T> {
  let needle = query.trim().to_lowercase();
  if needle.is_empty() {
    return items.iter().collect();
  }
  items.iter().filter(|item| item.matches(&needle)).collect()
}
