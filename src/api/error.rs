use reqwest::StatusCode;
use thiserror::Error;

/// Fallback when the server gives no `message` field
pub const GENERIC_FAILURE: &str = "Request failed";

/// Errors returned by the API client.
///
/// Views match on these: `Unauthorized` ends the session, `Forbidden` shows an
/// access-denied notice, everything else is displayed as-is.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
  /// Network or connection failure before a response arrived
  #[error("Network error: {0}")]
  Transport(String),

  /// Bearer token missing, expired or rejected
  #[error("Session expired, please sign in again")]
  Unauthorized,

  /// Authenticated but not allowed (also returned for banned accounts)
  #[error("Access denied: {0}")]
  Forbidden(String),

  /// Any other non-2xx response
  #[error("{message}")]
  Status { status: u16, message: String },

  /// Server answered with something other than JSON
  #[error("Server returned an invalid format: {0}...")]
  Format(String),

  /// JSON did not match the expected schema
  #[error("Unexpected response: {0}")]
  Decode(String),
}

impl ApiError {
  /// Classify a non-success status, using the server message when present.
  pub fn from_status(status: StatusCode, message: Option<String>) -> Self {
    match status {
      StatusCode::UNAUTHORIZED => ApiError::Unauthorized,
      StatusCode::FORBIDDEN => ApiError::Forbidden(server_message(message)),
      _ => ApiError::rejected(status, message),
    }
  }

  /// A `Status` error for any code, 401 and 403 included. Used for anonymous
  /// requests where those codes mean bad credentials, not a dead session.
  pub fn rejected(status: StatusCode, message: Option<String>) -> Self {
    ApiError::Status {
      status: status.as_u16(),
      message: server_message(message),
    }
  }

  pub fn is_unauthorized(&self) -> bool {
    matches!(self, ApiError::Unauthorized)
  }
}

fn server_message(message: Option<String>) -> String {
  message
    .filter(|m| !m.trim().is_empty())
    .unwrap_or_else(|| GENERIC_FAILURE.to_string())
}

impl From<reqwest::Error> for ApiError {
  fn from(e: reqwest::Error) -> Self {
    ApiError::Transport(e.to_string())
  }
}

impl From<serde_json::Error> for ApiError {
  fn from(e: serde_json::Error) -> Self {
    ApiError::Decode(e.to_string())
  }
}
