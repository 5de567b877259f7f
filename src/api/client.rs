use crate::api::api_types::{
  AdminPasswordBody, ApiAck, ApiInviteLimits, ApiInviteLink, ApiInvitesResponse, ApiIssued,
  ApiKeyStats, ApiKeysResponse, ApiLogin, ApiMessage, ApiProfile, ApiRedeemResponse,
  ApiRegistered, ApiUsersResponse, BulkKeyBody, ChangePasswordBody, CleanupBody,
  DeleteInvitesBody, GenerateKeyBody, InviteLimitsBody, LoginBody, RedeemBody, RegisterBody,
  RoleBody,
};
use crate::api::error::ApiError;
use crate::api::types::{
  ActionOutcome, BulkAction, CleanupOptions, Invite, InviteLimits, IssuedCode, KeyRequest,
  KeyStats, LicenseKey, LoginToken, Profile, Registered, Role, RoleLimits, UserAccount,
};
use crate::event::Event;
use color_eyre::{eyre::eyre, Result};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::sync::{Arc, RwLock};
use tokio::sync::mpsc;
use tracing::{debug, warn};
use url::Url;

/// Every endpoint lives under this prefix
const API_PREFIX: &str = "api";

/// How much of a non-JSON body to keep in a `Format` error
const FORMAT_SNIPPET_LEN: usize = 100;

/// Short, stable identifier for a bearer token, safe to put in logs.
pub fn token_fingerprint(token: &str) -> String {
  let digest = Sha256::digest(token.as_bytes());
  hex::encode(&digest[..6])
}

/// HTTP client for the key service.
///
/// Cloning is cheap and all clones share the bearer token, so a login in one
/// place is seen by every view holding a client.
#[derive(Clone)]
pub struct ApiClient {
  http: reqwest::Client,
  base: Url,
  token: Arc<RwLock<Option<String>>>,
  events: Option<mpsc::UnboundedSender<Event>>,
}

impl ApiClient {
  pub fn new(base_url: &str) -> Result<Self> {
    // A trailing slash makes Url::join append instead of replacing the last segment
    let normalized = if base_url.ends_with('/') {
      base_url.to_string()
    } else {
      format!("{}/", base_url)
    };
    let base =
      Url::parse(&normalized).map_err(|e| eyre!("Invalid API url '{}': {}", base_url, e))?;

    let http = reqwest::Client::builder()
      .user_agent(concat!("keydeck/", env!("CARGO_PKG_VERSION")))
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self {
      http,
      base,
      token: Arc::new(RwLock::new(None)),
      events: None,
    })
  }

  /// Route 401/403 signals to the application event loop.
  pub fn with_events(mut self, events: mpsc::UnboundedSender<Event>) -> Self {
    self.events = Some(events);
    self
  }

  pub fn base_url(&self) -> &str {
    self.base.as_str()
  }

  pub fn set_token(&self, token: Option<String>) {
    if let Ok(mut guard) = self.token.write() {
      *guard = token;
    }
  }

  pub fn token(&self) -> Option<String> {
    self.token.read().ok().and_then(|t| t.clone())
  }

  fn endpoint_url(&self, endpoint: &str) -> Result<Url, ApiError> {
    let relative = format!("{}{}", API_PREFIX, endpoint);
    self
      .base
      .join(&relative)
      .map_err(|e| ApiError::Transport(format!("Invalid endpoint {}: {}", endpoint, e)))
  }

  fn signal(&self, event: Event) {
    if let Some(tx) = &self.events {
      let _ = tx.send(event);
    }
  }

  /// Perform a request and decode the JSON response.
  ///
  /// On authenticated requests 401 and 403 are classified by status before the
  /// body is inspected, so a proxy's HTML error page still ends the session.
  /// Anonymous requests (login, register) report them as plain status errors
  /// carrying the server message.
  pub async fn request<T: DeserializeOwned>(
    &self,
    endpoint: &str,
    method: Method,
    body: Option<Value>,
    with_token: bool,
  ) -> Result<T, ApiError> {
    let url = self.endpoint_url(endpoint)?;
    let mut request = self
      .http
      .request(method.clone(), url)
      .header(CONTENT_TYPE, "application/json");

    let sent_token = if with_token { self.token() } else { None };
    if with_token {
      if let Some(token) = &sent_token {
        debug!(%method, endpoint, token = %token_fingerprint(token), "api request");
        request = request.header(AUTHORIZATION, format!("Bearer {}", token));
      } else {
        debug!(%method, endpoint, "api request without token");
      }
    } else {
      debug!(%method, endpoint, "anonymous api request");
    }

    if let Some(body) = body {
      request = request.json(&body);
    }

    let response = request.send().await.map_err(|e| {
      warn!(%method, endpoint, error = %e, "api transport failure");
      ApiError::from(e)
    })?;

    let status = response.status();
    let is_json = response
      .headers()
      .get(CONTENT_TYPE)
      .and_then(|v| v.to_str().ok())
      .map(|v| v.contains("application/json"))
      .unwrap_or(false);
    let text = response.text().await?;

    if with_token && status == StatusCode::UNAUTHORIZED {
      warn!(%method, endpoint, "api rejected credentials");
      self.signal(Event::SessionExpired {
        token: sent_token.as_deref().map(token_fingerprint),
      });
      return Err(ApiError::Unauthorized);
    }

    if with_token && status == StatusCode::FORBIDDEN {
      let message = serde_json::from_str::<ApiMessage>(&text)
        .ok()
        .and_then(|m| m.message);
      let err = ApiError::from_status(status, message);
      warn!(%method, endpoint, error = %err, "api access denied");
      self.signal(Event::AccessDenied(err.to_string()));
      return Err(err);
    }

    if !is_json {
      let snippet: String = text.chars().take(FORMAT_SNIPPET_LEN).collect();
      warn!(%method, endpoint, %status, "api returned non-JSON body");
      return Err(ApiError::Format(snippet));
    }

    let value: Value = serde_json::from_str(&text)?;

    if !status.is_success() {
      let message = value
        .get("message")
        .and_then(|m| m.as_str())
        .map(String::from);
      let err = if with_token {
        ApiError::from_status(status, message)
      } else {
        ApiError::rejected(status, message)
      };
      warn!(%method, endpoint, %status, error = %err, "api request failed");
      return Err(err);
    }

    serde_json::from_value(value).map_err(|e| {
      warn!(%method, endpoint, error = %e, "api response did not match schema");
      ApiError::from(e)
    })
  }

  async fn get<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, ApiError> {
    self.request(endpoint, Method::GET, None, true).await
  }

  async fn post<T: DeserializeOwned>(
    &self,
    endpoint: &str,
    body: Option<impl Serialize>,
  ) -> Result<T, ApiError> {
    let body = body.map(|b| serde_json::to_value(b)).transpose()?;
    self.request(endpoint, Method::POST, body, true).await
  }

  // ==========================================================================
  // Auth
  // ==========================================================================

  pub async fn login(&self, username: &str, password: &str) -> Result<LoginToken, ApiError> {
    let body = serde_json::to_value(LoginBody { username, password })?;
    let login: ApiLogin = self
      .request("/auth/login", Method::POST, Some(body), false)
      .await?;
    Ok(login.into())
  }

  pub async fn register(
    &self,
    username: &str,
    email: &str,
    password: &str,
    invite_code: &str,
  ) -> Result<Registered, ApiError> {
    let body = serde_json::to_value(RegisterBody {
      username,
      email,
      password,
      invite_code,
    })?;
    let registered: ApiRegistered = self
      .request("/users/register", Method::POST, Some(body), false)
      .await?;
    Ok(registered.into())
  }

  pub async fn me(&self) -> Result<Profile, ApiError> {
    let profile: ApiProfile = self.get("/users/me").await?;
    Ok(profile.into())
  }

  pub async fn change_password(
    &self,
    current_password: &str,
    new_password: &str,
  ) -> Result<ActionOutcome, ApiError> {
    let ack: ApiAck = self
      .post(
        "/change-password",
        Some(ChangePasswordBody {
          current_password,
          new_password,
        }),
      )
      .await?;
    Ok(ack.into())
  }

  // ==========================================================================
  // Keys
  // ==========================================================================

  pub async fn keys(&self) -> Result<Vec<LicenseKey>, ApiError> {
    let response: ApiKeysResponse = self.get("/keys").await?;
    Ok(response.keys.into_iter().map(LicenseKey::from).collect())
  }

  pub async fn redeem_key(&self, key: &str) -> Result<LicenseKey, ApiError> {
    let response: ApiRedeemResponse = self.post("/keys/redeem", Some(RedeemBody { key })).await?;
    Ok(response.key.into())
  }

  pub async fn generate_key(&self, request: &KeyRequest) -> Result<IssuedCode, ApiError> {
    let issued: ApiIssued = self
      .post(
        "/keys/generate",
        Some(GenerateKeyBody {
          duration_hours: request.duration_hours,
          user_id: request.user_id,
          custom_key: request.custom_key.as_deref(),
        }),
      )
      .await?;
    Ok(issued.into())
  }

  pub async fn all_keys(&self) -> Result<Vec<LicenseKey>, ApiError> {
    let response: ApiKeysResponse = self.get("/admin/keys").await?;
    Ok(response.keys.into_iter().map(LicenseKey::from).collect())
  }

  pub async fn revoke_key(&self, key_id: u64) -> Result<ActionOutcome, ApiError> {
    let ack: ApiAck = self
      .post(&format!("/admin/keys/{}/revoke", key_id), None::<()>)
      .await?;
    Ok(ack.into())
  }

  pub async fn restore_key(&self, key_id: u64) -> Result<ActionOutcome, ApiError> {
    let ack: ApiAck = self
      .post(&format!("/admin/keys/{}/restore", key_id), None::<()>)
      .await?;
    Ok(ack.into())
  }

  pub async fn bulk_key_action(
    &self,
    key_ids: &[u64],
    action: BulkAction,
  ) -> Result<ActionOutcome, ApiError> {
    let ack: ApiAck = self
      .post(
        "/admin/keys/bulk-action",
        Some(BulkKeyBody {
          key_ids,
          action: action.as_str(),
        }),
      )
      .await?;
    Ok(ack.into())
  }

  pub async fn key_stats(&self) -> Result<KeyStats, ApiError> {
    let stats: ApiKeyStats = self.get("/admin/keys/stats").await?;
    Ok(stats.into())
  }

  pub async fn cleanup_keys(&self, options: CleanupOptions) -> Result<ActionOutcome, ApiError> {
    let ack: ApiAck = self
      .post(
        "/admin/keys/cleanup",
        Some(CleanupBody {
          cleanup_expired: options.cleanup_expired,
          cleanup_revoked: options.cleanup_revoked,
          older_than_days: options.older_than_days,
        }),
      )
      .await?;
    Ok(ack.into())
  }

  // ==========================================================================
  // Invites
  // ==========================================================================

  pub async fn invites(&self) -> Result<Vec<Invite>, ApiError> {
    let response: ApiInvitesResponse = self.get("/invites").await?;
    Ok(response.invites.into_iter().map(Invite::from).collect())
  }

  pub async fn generate_invite(&self) -> Result<IssuedCode, ApiError> {
    let issued: ApiIssued = self.post("/invites/generate", None::<()>).await?;
    Ok(issued.into())
  }

  pub async fn invite_limits(&self) -> Result<InviteLimits, ApiError> {
    let limits: ApiInviteLimits = self.get("/invites/limits").await?;
    Ok(limits.into())
  }

  pub async fn set_invite_limits(&self, limits: RoleLimits) -> Result<ActionOutcome, ApiError> {
    let ack: ApiAck = self
      .post(
        "/admin/invites/limits",
        Some(InviteLimitsBody {
          admin_limit: limits.admin,
          support_limit: limits.support,
          user_limit: limits.user,
        }),
      )
      .await?;
    Ok(ack.into())
  }

  pub async fn delete_invite(&self, invite_id: u64) -> Result<ActionOutcome, ApiError> {
    let ack: ApiAck = self
      .post(&format!("/admin/invites/{}/delete", invite_id), None::<()>)
      .await?;
    Ok(ack.into())
  }

  pub async fn delete_invites(&self, invite_ids: &[u64]) -> Result<ActionOutcome, ApiError> {
    let ack: ApiAck = self
      .post(
        "/admin/invites/delete",
        Some(DeleteInvitesBody { invite_ids }),
      )
      .await?;
    Ok(ack.into())
  }

  // ==========================================================================
  // Discord
  // ==========================================================================

  pub async fn discord_code(&self) -> Result<IssuedCode, ApiError> {
    let issued: ApiIssued = self.post("/users/discord-code", None::<()>).await?;
    Ok(issued.into())
  }

  pub async fn discord_invite_link(&self) -> Result<String, ApiError> {
    let link: ApiInviteLink = self.get("/discord/invite-link").await?;
    Ok(link.invite_link)
  }

  // ==========================================================================
  // User administration
  // ==========================================================================

  pub async fn users(&self) -> Result<Vec<UserAccount>, ApiError> {
    let response: ApiUsersResponse = self.get("/admin/users").await?;
    Ok(response.users.into_iter().map(UserAccount::from).collect())
  }

  /// Same rows as [`Self::users`], ordered by most recent login
  pub async fn users_activity(&self) -> Result<Vec<UserAccount>, ApiError> {
    let response: ApiUsersResponse = self.get("/admin/users/activity").await?;
    Ok(response.users.into_iter().map(UserAccount::from).collect())
  }

  pub async fn ban_user(&self, user_id: u64) -> Result<ActionOutcome, ApiError> {
    let ack: ApiAck = self
      .post(&format!("/admin/users/{}/ban", user_id), None::<()>)
      .await?;
    Ok(ack.into())
  }

  pub async fn unban_user(&self, user_id: u64) -> Result<ActionOutcome, ApiError> {
    let ack: ApiAck = self
      .post(&format!("/admin/users/{}/unban", user_id), None::<()>)
      .await?;
    Ok(ack.into())
  }

  pub async fn set_user_role(&self, user_id: u64, role: Role) -> Result<ActionOutcome, ApiError> {
    let ack: ApiAck = self
      .post(
        &format!("/admin/users/{}/role", user_id),
        Some(RoleBody {
          role: role.as_str(),
        }),
      )
      .await?;
    Ok(ack.into())
  }

  pub async fn unlink_discord(&self, user_id: u64) -> Result<ActionOutcome, ApiError> {
    let ack: ApiAck = self
      .post(
        &format!("/admin/users/{}/unlink-discord", user_id),
        None::<()>,
      )
      .await?;
    Ok(ack.into())
  }

  pub async fn admin_change_password(
    &self,
    user_id: u64,
    new_password: &str,
  ) -> Result<ActionOutcome, ApiError> {
    let ack: ApiAck = self
      .post(
        &format!("/admin/users/{}/change-password", user_id),
        Some(AdminPasswordBody { new_password }),
      )
      .await?;
    Ok(ack.into())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;
  use wiremock::matchers::{body_json, header, method, path};
  use wiremock::{Match, Mock, MockServer, Request, ResponseTemplate};

  /// Matches requests that carry no Authorization header
  struct NoAuthHeader;

  impl Match for NoAuthHeader {
    fn matches(&self, request: &Request) -> bool {
      !request.headers.contains_key("authorization")
    }
  }

  async fn client_for(server: &MockServer) -> ApiClient {
    ApiClient::new(&server.uri()).unwrap()
  }

  #[test]
  fn test_fingerprint_is_short_and_stable() {
    let a = token_fingerprint("secret-token");
    assert_eq!(a.len(), 12);
    assert_eq!(a, token_fingerprint("secret-token"));
    assert_ne!(a, token_fingerprint("other-token"));
  }

  #[tokio::test]
  async fn test_attaches_bearer_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/api/users/me"))
      .and(header("authorization", "Bearer abc"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({
        "id": 1, "username": "alice", "email": "a@example.com",
        "is_admin": false, "is_support": true, "discord_linked": false
      })))
      .mount(&server)
      .await;

    let client = client_for(&server).await;
    client.set_token(Some("abc".into()));
    let profile = client.me().await.unwrap();
    assert_eq!(profile.username, "alice");
    assert_eq!(profile.role, Role::Support);
  }

  #[tokio::test]
  async fn test_login_is_sent_without_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(path("/api/auth/login"))
      .and(NoAuthHeader)
      .and(body_json(json!({"username": "bob", "password": "pw"})))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({
        "token": "jwt", "expires_at": "2030-01-01T00:00:00"
      })))
      .mount(&server)
      .await;

    let client = client_for(&server).await;
    client.set_token(Some("stale".into()));
    let login = client.login("bob", "pw").await.unwrap();
    assert_eq!(login.token, "jwt");
    assert!(login.expires_at.is_some());
  }

  #[tokio::test]
  async fn test_failed_login_is_not_a_session_expiry() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(path("/api/auth/login"))
      .respond_with(
        ResponseTemplate::new(401).set_body_json(json!({"message": "Wrong username or password"})),
      )
      .mount(&server)
      .await;

    let (tx, mut rx) = mpsc::unbounded_channel();
    let client = client_for(&server).await.with_events(tx);

    let err = client.login("bob", "nope").await.unwrap_err();
    assert_eq!(
      err,
      ApiError::Status {
        status: 401,
        message: "Wrong username or password".into()
      }
    );
    assert!(rx.try_recv().is_err());
  }

  #[tokio::test]
  async fn test_unauthorized_signals_session_expiry() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/api/keys"))
      .respond_with(ResponseTemplate::new(401).set_body_json(json!({"msg": "expired"})))
      .mount(&server)
      .await;

    let (tx, mut rx) = mpsc::unbounded_channel();
    let client = client_for(&server).await.with_events(tx);
    client.set_token(Some("old".into()));

    let err = client.keys().await.unwrap_err();
    assert_eq!(err, ApiError::Unauthorized);
    match rx.try_recv() {
      Ok(Event::SessionExpired { token }) => assert_eq!(token, Some(token_fingerprint("old"))),
      other => panic!("unexpected event: {:?}", other),
    }
  }

  #[tokio::test]
  async fn test_forbidden_signals_access_denied() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/api/admin/keys"))
      .respond_with(ResponseTemplate::new(403).set_body_json(json!({"message": "Not allowed"})))
      .mount(&server)
      .await;

    let (tx, mut rx) = mpsc::unbounded_channel();
    let client = client_for(&server).await.with_events(tx);

    let err = client.all_keys().await.unwrap_err();
    assert_eq!(err, ApiError::Forbidden("Not allowed".into()));
    match rx.try_recv() {
      Ok(Event::AccessDenied(msg)) => assert!(msg.contains("Not allowed")),
      other => panic!("unexpected event: {:?}", other),
    }
  }

  #[tokio::test]
  async fn test_error_status_carries_server_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(path("/api/keys/redeem"))
      .respond_with(ResponseTemplate::new(400).set_body_json(json!({"message": "Key expired"})))
      .mount(&server)
      .await;

    let client = client_for(&server).await;
    let err = client.redeem_key("K").await.unwrap_err();
    assert_eq!(
      err,
      ApiError::Status {
        status: 400,
        message: "Key expired".into()
      }
    );
  }

  #[tokio::test]
  async fn test_non_json_response_is_format_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/api/invites"))
      .respond_with(ResponseTemplate::new(200).set_body_string("<html>".repeat(40)))
      .mount(&server)
      .await;

    let client = client_for(&server).await;
    match client.invites().await.unwrap_err() {
      ApiError::Format(snippet) => assert_eq!(snippet.chars().count(), 100),
      other => panic!("unexpected error: {:?}", other),
    }
  }

  #[tokio::test]
  async fn test_schema_mismatch_is_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/api/invites/limits"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({"monthly_limit": "lots"})))
      .mount(&server)
      .await;

    let client = client_for(&server).await;
    assert!(matches!(
      client.invite_limits().await.unwrap_err(),
      ApiError::Decode(_)
    ));
  }

  #[tokio::test]
  async fn test_bulk_action_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(path("/api/admin/keys/bulk-action"))
      .and(body_json(json!({"key_ids": [1, 2, 3], "action": "revoke"})))
      .respond_with(
        ResponseTemplate::new(200).set_body_json(json!({"message": "ok", "affected_count": 3})),
      )
      .mount(&server)
      .await;

    let client = client_for(&server).await;
    let outcome = client
      .bulk_key_action(&[1, 2, 3], BulkAction::Revoke)
      .await
      .unwrap();
    assert_eq!(outcome.count, Some(3));
  }

  #[tokio::test]
  async fn test_base_url_with_path_prefix() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/service/api/discord/invite-link"))
      .respond_with(
        ResponseTemplate::new(200).set_body_json(json!({"invite_link": "https://discord.gg/x"})),
      )
      .mount(&server)
      .await;

    let client = ApiClient::new(&format!("{}/service", server.uri())).unwrap();
    assert_eq!(
      client.discord_invite_link().await.unwrap(),
      "https://discord.gg/x"
    );
  }
}
