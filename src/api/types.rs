use chrono::{DateTime, Utc};

/// Account role, derived from the profile's admin/support flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
  Admin,
  Support,
  User,
}

impl Role {
  pub fn from_flags(is_admin: bool, is_support: bool) -> Self {
    if is_admin {
      Role::Admin
    } else if is_support {
      Role::Support
    } else {
      Role::User
    }
  }

  /// Wire value for `POST /admin/users/{id}/role`
  pub fn as_str(&self) -> &'static str {
    match self {
      Role::Admin => "admin",
      Role::Support => "support",
      Role::User => "user",
    }
  }

  pub fn label(&self) -> &'static str {
    match self {
      Role::Admin => "Admin",
      Role::Support => "Support",
      Role::User => "User",
    }
  }

  pub fn is_staff(&self) -> bool {
    matches!(self, Role::Admin | Role::Support)
  }
}

/// The signed-in user's own profile (`GET /users/me`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
  pub id: u64,
  pub username: String,
  pub email: String,
  pub created_at: Option<DateTime<Utc>>,
  pub role: Role,
  pub is_banned: bool,
  pub discord_linked: bool,
  pub discord_username: Option<String>,
}

/// Owner reference attached to keys in the admin listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyOwner {
  pub id: u64,
  pub username: String,
}

/// A license key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LicenseKey {
  pub id: u64,
  pub key: String,
  pub created_at: DateTime<Utc>,
  pub expires_at: DateTime<Utc>,
  pub is_active: bool,
  /// Seconds until expiry as computed by the server
  pub time_left: i64,
  pub owner: Option<KeyOwner>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyStatus {
  Active,
  Expired,
  Revoked,
}

impl KeyStatus {
  pub fn label(&self) -> &'static str {
    match self {
      KeyStatus::Active => "Active",
      KeyStatus::Expired => "Expired",
      KeyStatus::Revoked => "Revoked",
    }
  }
}

impl LicenseKey {
  /// The server reports expired keys as inactive, so a positive `time_left`
  /// is what separates a revoked key from an expired one.
  pub fn status(&self) -> KeyStatus {
    if self.is_active {
      if self.time_left > 0 {
        KeyStatus::Active
      } else {
        KeyStatus::Expired
      }
    } else if self.time_left > 0 {
      KeyStatus::Revoked
    } else {
      KeyStatus::Expired
    }
  }
}

/// An invite code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invite {
  pub id: u64,
  pub code: String,
  pub created_at: DateTime<Utc>,
  pub expires_at: DateTime<Utc>,
  pub used: bool,
  pub used_by: Option<String>,
  pub created_by: String,
}

/// Monthly invite limits per role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RoleLimits {
  pub admin: u32,
  pub support: u32,
  pub user: u32,
}

/// The caller's invite quota for the current month
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InviteLimits {
  pub monthly_limit: u32,
  pub used_invites: u32,
  pub remaining_invites: u32,
  pub global: RoleLimits,
}

/// A user row in the admin listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserAccount {
  pub id: u64,
  pub username: String,
  pub email: String,
  pub created_at: Option<DateTime<Utc>>,
  pub last_login: Option<DateTime<Utc>>,
  pub last_ip: Option<String>,
  pub role: Role,
  pub is_banned: bool,
  pub discord_linked: bool,
  pub discord_username: Option<String>,
}

/// Housekeeping counters for the key table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KeyStats {
  pub total_keys: u64,
  pub expired_keys: u64,
  pub revoked_keys: u64,
  pub older_than_30_days: u64,
  pub older_than_90_days: u64,
  pub older_than_180_days: u64,
}

/// Credentials issued by `POST /auth/login`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginToken {
  pub token: String,
  pub expires_at: Option<DateTime<Utc>>,
}

/// Result of a successful registration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registered {
  pub id: u64,
  pub username: String,
  /// Trial key issued with every new account
  pub test_key: Option<String>,
}

/// A freshly generated key or invite code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedCode {
  pub code: String,
  pub expires_at: Option<DateTime<Utc>>,
}

/// Acknowledgement returned by mutating endpoints
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ActionOutcome {
  pub message: Option<String>,
  /// Rows affected, for bulk endpoints
  pub count: Option<u64>,
}

/// Operations accepted by `POST /admin/keys/bulk-action`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkAction {
  Revoke,
  Restore,
  Delete,
}

impl BulkAction {
  pub fn as_str(&self) -> &'static str {
    match self {
      BulkAction::Revoke => "revoke",
      BulkAction::Restore => "restore",
      BulkAction::Delete => "delete",
    }
  }
}

/// Parameters for `POST /admin/keys/cleanup`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CleanupOptions {
  pub cleanup_expired: bool,
  pub cleanup_revoked: bool,
  pub older_than_days: u32,
}

impl Default for CleanupOptions {
  fn default() -> Self {
    Self {
      cleanup_expired: true,
      cleanup_revoked: true,
      older_than_days: 30,
    }
  }
}

/// Parameters for `POST /keys/generate`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyRequest {
  pub duration_hours: u32,
  pub user_id: Option<u64>,
  pub custom_key: Option<String>,
}
