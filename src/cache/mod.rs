//! Time-boxed in-memory cache for API list payloads.
//!
//! One entry per [`ResourceKind`], each holding the last payload fetched for
//! that kind and when it was fetched. An entry is valid while it is younger
//! than the TTL; mutating actions clear the entries they affect so the next
//! read goes back to the network.

mod layer;
mod result;
mod store;

pub use layer::CacheLayer;
pub use result::{CacheResult, CacheSource};
pub use store::DataCache;

use std::time::Duration;

/// Default freshness window for cached payloads
pub const DEFAULT_TTL: Duration = Duration::from_secs(60);

/// The fixed set of cacheable resources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
  /// Admin user listing
  Users,
  /// The signed-in user's own keys
  Keys,
  /// Admin listing of every key
  AllKeys,
  Invites,
  InviteLimits,
}

impl ResourceKind {
  pub const ALL: [ResourceKind; 5] = [
    ResourceKind::Users,
    ResourceKind::Keys,
    ResourceKind::AllKeys,
    ResourceKind::Invites,
    ResourceKind::InviteLimits,
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      ResourceKind::Users => "users",
      ResourceKind::Keys => "keys",
      ResourceKind::AllKeys => "all_keys",
      ResourceKind::Invites => "invites",
      ResourceKind::InviteLimits => "invite_limits",
    }
  }
}

impl std::fmt::Display for ResourceKind {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}
