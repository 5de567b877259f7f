//! Serde types matching the service's JSON payloads.
//!
//! Responses are decoded here and converted into the domain types in
//! [`super::types`], so a missing or mistyped field fails at the client
//! boundary instead of surfacing later in a view.

use super::types::{
  ActionOutcome, Invite, InviteLimits, IssuedCode, KeyOwner, KeyStats, LicenseKey, LoginToken,
  Profile, Registered, Role, RoleLimits, UserAccount,
};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Parse a server timestamp.
///
/// The backend emits naive ISO-8601 (`2025-01-01T12:00:00.123456`, UTC by
/// convention); RFC 3339 with an offset is accepted too.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
  if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
    return Some(dt.with_timezone(&Utc));
  }
  NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
    .ok()
    .map(|dt| dt.and_utc())
}

fn timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
  D: Deserializer<'de>,
{
  let s = String::deserialize(deserializer)?;
  parse_timestamp(&s).ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp '{}'", s)))
}

fn optional_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
  D: Deserializer<'de>,
{
  match Option::<String>::deserialize(deserializer)? {
    Some(s) => parse_timestamp(&s)
      .map(Some)
      .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp '{}'", s))),
    None => Ok(None),
  }
}

// ============================================================================
// Error envelope
// ============================================================================

/// Any JSON body may carry a `message`, which is what error responses use.
#[derive(Debug, Deserialize, Default)]
pub struct ApiMessage {
  pub message: Option<String>,
}

// ============================================================================
// Auth
// ============================================================================

#[derive(Debug, Serialize)]
pub struct LoginBody<'a> {
  pub username: &'a str,
  pub password: &'a str,
}

#[derive(Debug, Serialize)]
pub struct RegisterBody<'a> {
  pub username: &'a str,
  pub email: &'a str,
  pub password: &'a str,
  pub invite_code: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct ApiLogin {
  pub token: String,
  #[serde(default, deserialize_with = "optional_timestamp")]
  pub expires_at: Option<DateTime<Utc>>,
}

impl From<ApiLogin> for LoginToken {
  fn from(a: ApiLogin) -> Self {
    LoginToken {
      token: a.token,
      expires_at: a.expires_at,
    }
  }
}

#[derive(Debug, Deserialize)]
pub struct ApiRegistered {
  pub id: u64,
  pub username: String,
  pub test_key: Option<String>,
}

impl From<ApiRegistered> for Registered {
  fn from(a: ApiRegistered) -> Self {
    Registered {
      id: a.id,
      username: a.username,
      test_key: a.test_key,
    }
  }
}

#[derive(Debug, Serialize)]
pub struct ChangePasswordBody<'a> {
  pub current_password: &'a str,
  pub new_password: &'a str,
}

#[derive(Debug, Serialize)]
pub struct AdminPasswordBody<'a> {
  pub new_password: &'a str,
}

// ============================================================================
// Users
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ApiProfile {
  pub id: u64,
  pub username: String,
  #[serde(default)]
  pub email: String,
  #[serde(default, deserialize_with = "optional_timestamp")]
  pub created_at: Option<DateTime<Utc>>,
  #[serde(default)]
  pub is_admin: bool,
  #[serde(default)]
  pub is_support: bool,
  #[serde(default)]
  pub is_banned: bool,
  #[serde(default)]
  pub discord_linked: bool,
  pub discord_username: Option<String>,
}

impl From<ApiProfile> for Profile {
  fn from(a: ApiProfile) -> Self {
    Profile {
      id: a.id,
      username: a.username,
      email: a.email,
      created_at: a.created_at,
      role: Role::from_flags(a.is_admin, a.is_support),
      is_banned: a.is_banned,
      discord_linked: a.discord_linked,
      discord_username: a.discord_username,
    }
  }
}

#[derive(Debug, Deserialize)]
pub struct ApiUser {
  pub id: u64,
  pub username: String,
  #[serde(default)]
  pub email: String,
  #[serde(default, deserialize_with = "optional_timestamp")]
  pub created_at: Option<DateTime<Utc>>,
  #[serde(default, deserialize_with = "optional_timestamp")]
  pub last_login: Option<DateTime<Utc>>,
  pub last_ip: Option<String>,
  #[serde(default)]
  pub is_admin: bool,
  #[serde(default)]
  pub is_support: bool,
  #[serde(default)]
  pub is_banned: bool,
  #[serde(default)]
  pub discord_linked: bool,
  pub discord_username: Option<String>,
}

impl From<ApiUser> for UserAccount {
  fn from(a: ApiUser) -> Self {
    UserAccount {
      id: a.id,
      username: a.username,
      email: a.email,
      created_at: a.created_at,
      last_login: a.last_login,
      last_ip: a.last_ip,
      role: Role::from_flags(a.is_admin, a.is_support),
      is_banned: a.is_banned,
      discord_linked: a.discord_linked,
      discord_username: a.discord_username,
    }
  }
}

#[derive(Debug, Deserialize)]
pub struct ApiUsersResponse {
  pub users: Vec<ApiUser>,
}

#[derive(Debug, Serialize)]
pub struct RoleBody<'a> {
  pub role: &'a str,
}

// ============================================================================
// Keys
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ApiKeyOwner {
  pub id: u64,
  pub username: String,
}

#[derive(Debug, Deserialize)]
pub struct ApiKey {
  pub id: u64,
  pub key: String,
  #[serde(deserialize_with = "timestamp")]
  pub created_at: DateTime<Utc>,
  #[serde(deserialize_with = "timestamp")]
  pub expires_at: DateTime<Utc>,
  pub is_active: bool,
  #[serde(default)]
  pub time_left: f64,
  pub user: Option<ApiKeyOwner>,
}

impl From<ApiKey> for LicenseKey {
  fn from(a: ApiKey) -> Self {
    LicenseKey {
      id: a.id,
      key: a.key,
      created_at: a.created_at,
      expires_at: a.expires_at,
      is_active: a.is_active,
      time_left: a.time_left.floor() as i64,
      owner: a.user.map(|u| KeyOwner {
        id: u.id,
        username: u.username,
      }),
    }
  }
}

#[derive(Debug, Deserialize)]
pub struct ApiKeysResponse {
  pub keys: Vec<ApiKey>,
}

#[derive(Debug, Serialize)]
pub struct RedeemBody<'a> {
  pub key: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct ApiRedeemResponse {
  pub key: ApiKey,
}

#[derive(Debug, Serialize)]
pub struct GenerateKeyBody<'a> {
  pub duration_hours: u32,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub user_id: Option<u64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub custom_key: Option<&'a str>,
}

/// `POST /keys/generate` returns `key`, `POST /invites/generate` and
/// `POST /users/discord-code` return `code`.
#[derive(Debug, Deserialize)]
pub struct ApiIssued {
  #[serde(alias = "key")]
  pub code: String,
  #[serde(default, deserialize_with = "optional_timestamp")]
  pub expires_at: Option<DateTime<Utc>>,
}

impl From<ApiIssued> for IssuedCode {
  fn from(a: ApiIssued) -> Self {
    IssuedCode {
      code: a.code,
      expires_at: a.expires_at,
    }
  }
}

#[derive(Debug, Serialize)]
pub struct BulkKeyBody<'a> {
  pub key_ids: &'a [u64],
  pub action: &'a str,
}

#[derive(Debug, Serialize)]
pub struct CleanupBody {
  pub cleanup_expired: bool,
  pub cleanup_revoked: bool,
  pub older_than_days: u32,
}

#[derive(Debug, Deserialize)]
pub struct ApiKeyStats {
  pub total_keys: u64,
  pub expired_keys: u64,
  pub revoked_keys: u64,
  #[serde(default)]
  pub older_than_30_days: u64,
  #[serde(default)]
  pub older_than_90_days: u64,
  #[serde(default)]
  pub older_than_180_days: u64,
}

impl From<ApiKeyStats> for KeyStats {
  fn from(a: ApiKeyStats) -> Self {
    KeyStats {
      total_keys: a.total_keys,
      expired_keys: a.expired_keys,
      revoked_keys: a.revoked_keys,
      older_than_30_days: a.older_than_30_days,
      older_than_90_days: a.older_than_90_days,
      older_than_180_days: a.older_than_180_days,
    }
  }
}

// ============================================================================
// Invites
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ApiInvite {
  pub id: u64,
  pub code: String,
  #[serde(deserialize_with = "timestamp")]
  pub created_at: DateTime<Utc>,
  #[serde(deserialize_with = "timestamp")]
  pub expires_at: DateTime<Utc>,
  #[serde(default)]
  pub used: bool,
  pub used_by: Option<String>,
  #[serde(default)]
  pub created_by: String,
}

impl From<ApiInvite> for Invite {
  fn from(a: ApiInvite) -> Self {
    Invite {
      id: a.id,
      code: a.code,
      created_at: a.created_at,
      expires_at: a.expires_at,
      used: a.used,
      used_by: a.used_by,
      created_by: a.created_by,
    }
  }
}

#[derive(Debug, Deserialize)]
pub struct ApiInvitesResponse {
  pub invites: Vec<ApiInvite>,
}

#[derive(Debug, Deserialize)]
pub struct ApiRoleLimits {
  pub admin: u32,
  pub support: u32,
  pub user: u32,
}

#[derive(Debug, Deserialize)]
pub struct ApiInviteLimits {
  pub monthly_limit: u32,
  pub used_invites: u32,
  pub remaining_invites: u32,
  pub global_limits: Option<ApiRoleLimits>,
}

impl From<ApiInviteLimits> for InviteLimits {
  fn from(a: ApiInviteLimits) -> Self {
    InviteLimits {
      monthly_limit: a.monthly_limit,
      used_invites: a.used_invites,
      remaining_invites: a.remaining_invites,
      global: a
        .global_limits
        .map(|g| RoleLimits {
          admin: g.admin,
          support: g.support,
          user: g.user,
        })
        .unwrap_or_default(),
    }
  }
}

#[derive(Debug, Serialize)]
pub struct InviteLimitsBody {
  pub admin_limit: u32,
  pub support_limit: u32,
  pub user_limit: u32,
}

#[derive(Debug, Serialize)]
pub struct DeleteInvitesBody<'a> {
  pub invite_ids: &'a [u64],
}

// ============================================================================
// Discord
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ApiInviteLink {
  #[serde(alias = "url", alias = "link")]
  pub invite_link: String,
}

// ============================================================================
// Generic acknowledgement
// ============================================================================

#[derive(Debug, Deserialize, Default)]
pub struct ApiAck {
  pub message: Option<String>,
  #[serde(alias = "deleted_count")]
  pub affected_count: Option<u64>,
}

impl From<ApiAck> for ActionOutcome {
  fn from(a: ApiAck) -> Self {
    ActionOutcome {
      message: a.message,
      count: a.affected_count,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::{Datelike, Timelike};

  #[test]
  fn test_parse_naive_timestamp() {
    let dt = parse_timestamp("2025-03-04T05:06:07.123456").unwrap();
    assert_eq!((dt.year(), dt.month(), dt.day()), (2025, 3, 4));
    assert_eq!((dt.hour(), dt.minute(), dt.second()), (5, 6, 7));
  }

  #[test]
  fn test_parse_rfc3339_timestamp() {
    let dt = parse_timestamp("2025-03-04T05:06:07+02:00").unwrap();
    assert_eq!(dt.hour(), 3);
  }

  #[test]
  fn test_parse_garbage_timestamp() {
    assert!(parse_timestamp("yesterday").is_none());
  }

  #[test]
  fn test_admin_key_with_owner() {
    let json = r#"{
      "id": 7, "key": "K-7", "created_at": "2025-01-01T00:00:00",
      "expires_at": "2025-01-02T00:00:00", "is_active": true, "time_left": 3599.6,
      "user": {"id": 3, "username": "alice"}
    }"#;
    let key: LicenseKey = serde_json::from_str::<ApiKey>(json).unwrap().into();
    assert_eq!(key.time_left, 3599);
    assert_eq!(key.owner.unwrap().username, "alice");
  }

  #[test]
  fn test_key_with_bad_timestamp_fails() {
    let json = r#"{
      "id": 7, "key": "K-7", "created_at": "never",
      "expires_at": "2025-01-02T00:00:00", "is_active": true
    }"#;
    assert!(serde_json::from_str::<ApiKey>(json).is_err());
  }

  #[test]
  fn test_issued_accepts_key_or_code() {
    let k: ApiIssued = serde_json::from_str(r#"{"key": "ABC"}"#).unwrap();
    let c: ApiIssued = serde_json::from_str(r#"{"code": "XYZ"}"#).unwrap();
    assert_eq!(k.code, "ABC");
    assert_eq!(c.code, "XYZ");
  }

  #[test]
  fn test_generate_key_body_skips_empty_options() {
    let body = GenerateKeyBody {
      duration_hours: 24,
      user_id: None,
      custom_key: None,
    };
    assert_eq!(
      serde_json::to_value(&body).unwrap(),
      serde_json::json!({"duration_hours": 24})
    );
  }

  #[test]
  fn test_ack_reads_either_count_name() {
    let a: ApiAck = serde_json::from_str(r#"{"message": "ok", "deleted_count": 3}"#).unwrap();
    assert_eq!(a.affected_count, Some(3));
  }
}
