//! API client behind the TTL cache.

use crate::api::client::ApiClient;
use crate::api::error::ApiError;
use crate::api::types::{
  ActionOutcome, BulkAction, CleanupOptions, Invite, InviteLimits, IssuedCode, KeyRequest,
  KeyStats, LicenseKey, LoginToken, Profile, Registered, Role, RoleLimits, UserAccount,
};
use crate::cache::{CacheLayer, ResourceKind};
use std::time::Duration;
use tracing::info;

/// Ordering of the admin user listing; each maps to its own endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UserOrder {
  /// Most recent login first (`/admin/users/activity`)
  #[default]
  Activity,
  /// Server order (`/admin/users`)
  Id,
}

impl UserOrder {
  pub fn toggled(self) -> Self {
    match self {
      UserOrder::Activity => UserOrder::Id,
      UserOrder::Id => UserOrder::Activity,
    }
  }

  pub fn label(&self) -> &'static str {
    match self {
      UserOrder::Activity => "by activity",
      UserOrder::Id => "by id",
    }
  }
}

/// Cached user listing tagged with the order it was fetched in
#[derive(Debug, Clone)]
struct UserListing {
  order: UserOrder,
  users: Vec<UserAccount>,
}

const KEY_KINDS: &[ResourceKind] = &[ResourceKind::AllKeys, ResourceKind::Keys];
const INVITE_KINDS: &[ResourceKind] = &[ResourceKind::Invites, ResourceKind::InviteLimits];

/// API client with transparent caching of list reads.
///
/// Reads of the five cacheable resources go through the cache; every
/// mutating call clears the entries it makes stale before returning, whether
/// or not the server accepted it.
#[derive(Clone)]
pub struct CachedApiClient {
  inner: ApiClient,
  cache: CacheLayer,
}

impl CachedApiClient {
  pub fn new(inner: ApiClient, ttl: Duration) -> Self {
    Self {
      inner,
      cache: CacheLayer::new(ttl),
    }
  }

  /// The uncached client, for session plumbing
  pub fn inner(&self) -> &ApiClient {
    &self.inner
  }

  pub fn cache(&self) -> &CacheLayer {
    &self.cache
  }

  fn after<T>(&self, kinds: &[ResourceKind], result: Result<T, ApiError>) -> Result<T, ApiError> {
    self.cache.invalidate(kinds);
    result
  }

  // ==========================================================================
  // Session (uncached)
  // ==========================================================================

  pub async fn login(&self, username: &str, password: &str) -> Result<LoginToken, ApiError> {
    let result = self.inner.login(username, password).await;
    self.cache.clear_all();
    result
  }

  pub async fn register(
    &self,
    username: &str,
    email: &str,
    password: &str,
    invite_code: &str,
  ) -> Result<Registered, ApiError> {
    self
      .inner
      .register(username, email, password, invite_code)
      .await
  }

  pub async fn me(&self) -> Result<Profile, ApiError> {
    self.inner.me().await
  }

  pub async fn change_password(
    &self,
    current_password: &str,
    new_password: &str,
  ) -> Result<ActionOutcome, ApiError> {
    self
      .inner
      .change_password(current_password, new_password)
      .await
  }

  // ==========================================================================
  // Cached reads
  // ==========================================================================

  pub async fn keys(&self) -> Result<Vec<LicenseKey>, ApiError> {
    let result = self
      .cache
      .fetch(ResourceKind::Keys, || self.inner.keys())
      .await?;
    Ok(result.data)
  }

  pub async fn all_keys(&self) -> Result<Vec<LicenseKey>, ApiError> {
    let result = self
      .cache
      .fetch(ResourceKind::AllKeys, || self.inner.all_keys())
      .await?;
    Ok(result.data)
  }

  pub async fn invites(&self) -> Result<Vec<Invite>, ApiError> {
    let result = self
      .cache
      .fetch(ResourceKind::Invites, || self.inner.invites())
      .await?;
    Ok(result.data)
  }

  pub async fn invite_limits(&self) -> Result<InviteLimits, ApiError> {
    let result = self
      .cache
      .fetch(ResourceKind::InviteLimits, || self.inner.invite_limits())
      .await?;
    Ok(result.data)
  }

  async fn fetch_users(&self, order: UserOrder) -> Result<UserListing, ApiError> {
    let users = match order {
      UserOrder::Activity => self.inner.users_activity().await?,
      UserOrder::Id => self.inner.users().await?,
    };
    Ok(UserListing { order, users })
  }

  /// User listing in the requested order.
  ///
  /// Both orders share the `Users` entry; asking for the other order is a miss.
  pub async fn users(&self, order: UserOrder) -> Result<Vec<UserAccount>, ApiError> {
    let cached = self
      .cache
      .fetch(ResourceKind::Users, || self.fetch_users(order))
      .await?;

    if cached.data.order == order {
      return Ok(cached.data.users);
    }

    let listing = self.fetch_users(order).await?;
    self.cache.store(ResourceKind::Users, listing.clone());
    Ok(listing.users)
  }

  /// Stats change with every key action, so they are never cached
  pub async fn key_stats(&self) -> Result<KeyStats, ApiError> {
    self.inner.key_stats().await
  }

  pub async fn discord_invite_link(&self) -> Result<String, ApiError> {
    self.inner.discord_invite_link().await
  }

  // ==========================================================================
  // Key mutations
  // ==========================================================================

  pub async fn redeem_key(&self, key: &str) -> Result<LicenseKey, ApiError> {
    let result = self.inner.redeem_key(key).await;
    self.after(KEY_KINDS, result)
  }

  pub async fn generate_key(&self, request: &KeyRequest) -> Result<IssuedCode, ApiError> {
    let result = self.inner.generate_key(request).await;
    if result.is_ok() {
      info!(hours = request.duration_hours, user = ?request.user_id, "key generated");
    }
    self.after(KEY_KINDS, result)
  }

  pub async fn revoke_key(&self, key_id: u64) -> Result<ActionOutcome, ApiError> {
    let result = self.inner.revoke_key(key_id).await;
    if result.is_ok() {
      info!(key_id, "key revoked");
    }
    self.after(KEY_KINDS, result)
  }

  pub async fn restore_key(&self, key_id: u64) -> Result<ActionOutcome, ApiError> {
    let result = self.inner.restore_key(key_id).await;
    if result.is_ok() {
      info!(key_id, "key restored");
    }
    self.after(KEY_KINDS, result)
  }

  pub async fn bulk_key_action(
    &self,
    key_ids: &[u64],
    action: BulkAction,
  ) -> Result<ActionOutcome, ApiError> {
    let result = self.inner.bulk_key_action(key_ids, action).await;
    if result.is_ok() {
      info!(action = action.as_str(), count = key_ids.len(), "bulk key action");
    }
    self.after(KEY_KINDS, result)
  }

  pub async fn cleanup_keys(&self, options: CleanupOptions) -> Result<ActionOutcome, ApiError> {
    let result = self.inner.cleanup_keys(options).await;
    self.after(KEY_KINDS, result)
  }

  // ==========================================================================
  // Invite mutations
  // ==========================================================================

  pub async fn generate_invite(&self) -> Result<IssuedCode, ApiError> {
    let result = self.inner.generate_invite().await;
    self.after(INVITE_KINDS, result)
  }

  pub async fn delete_invite(&self, invite_id: u64) -> Result<ActionOutcome, ApiError> {
    let result = self.inner.delete_invite(invite_id).await;
    self.after(INVITE_KINDS, result)
  }

  pub async fn delete_invites(&self, invite_ids: &[u64]) -> Result<ActionOutcome, ApiError> {
    let result = self.inner.delete_invites(invite_ids).await;
    self.after(INVITE_KINDS, result)
  }

  pub async fn set_invite_limits(&self, limits: RoleLimits) -> Result<ActionOutcome, ApiError> {
    let result = self.inner.set_invite_limits(limits).await;
    self.after(&[ResourceKind::InviteLimits], result)
  }

  pub async fn discord_code(&self) -> Result<IssuedCode, ApiError> {
    self.inner.discord_code().await
  }

  // ==========================================================================
  // User mutations
  // ==========================================================================

  pub async fn ban_user(&self, user_id: u64) -> Result<ActionOutcome, ApiError> {
    let result = self.inner.ban_user(user_id).await;
    if result.is_ok() {
      info!(user_id, "user banned");
    }
    self.after(&[ResourceKind::Users], result)
  }

  pub async fn unban_user(&self, user_id: u64) -> Result<ActionOutcome, ApiError> {
    let result = self.inner.unban_user(user_id).await;
    if result.is_ok() {
      info!(user_id, "user unbanned");
    }
    self.after(&[ResourceKind::Users], result)
  }

  pub async fn set_user_role(&self, user_id: u64, role: Role) -> Result<ActionOutcome, ApiError> {
    let result = self.inner.set_user_role(user_id, role).await;
    if result.is_ok() {
      info!(user_id, role = role.as_str(), "user role changed");
    }
    self.after(&[ResourceKind::Users], result)
  }

  pub async fn unlink_discord(&self, user_id: u64) -> Result<ActionOutcome, ApiError> {
    let result = self.inner.unlink_discord(user_id).await;
    self.after(&[ResourceKind::Users], result)
  }

  pub async fn admin_change_password(
    &self,
    user_id: u64,
    new_password: &str,
  ) -> Result<ActionOutcome, ApiError> {
    self.inner.admin_change_password(user_id, new_password).await
  }
}
