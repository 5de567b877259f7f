//! Signed-in state and the transitions between anonymous and authenticated.

use crate::api::client::token_fingerprint;
use crate::api::types::{Profile, Role};
use crate::api::{ApiError, CachedApiClient};
use crate::db::Preferences;
use color_eyre::Result;
use tracing::{info, warn};

/// Outcome of a successful sign-in, handed from the view that performed it to
/// the app, which owns the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedIn {
  pub token: String,
  pub profile: Profile,
  /// Trial key issued by registration
  pub trial_key: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Session {
  #[default]
  Anonymous,
  Authenticated {
    token: String,
    profile: Profile,
  },
}

impl Session {
  pub fn is_authenticated(&self) -> bool {
    matches!(self, Session::Authenticated { .. })
  }

  pub fn profile(&self) -> Option<&Profile> {
    match self {
      Session::Authenticated { profile, .. } => Some(profile),
      Session::Anonymous => None,
    }
  }

  pub fn token(&self) -> Option<&str> {
    match self {
      Session::Authenticated { token, .. } => Some(token),
      Session::Anonymous => None,
    }
  }

  pub fn role(&self) -> Option<Role> {
    self.profile().map(|p| p.role)
  }

  /// Admin or support
  pub fn is_staff(&self) -> bool {
    self.role().map(|r| r.is_staff()).unwrap_or(false)
  }

  pub fn is_admin(&self) -> bool {
    self.role() == Some(Role::Admin)
  }

  /// Anonymous → authenticated. Persists the token so the next start can
  /// restore the session.
  pub fn establish(&mut self, signed_in: SignedIn, prefs: &Preferences) -> Result<()> {
    prefs.set_token(Some(&signed_in.token))?;
    info!(
      user = %signed_in.profile.username,
      role = signed_in.profile.role.as_str(),
      token = %token_fingerprint(&signed_in.token),
      "session established"
    );
    *self = Session::Authenticated {
      token: signed_in.token,
      profile: signed_in.profile,
    };
    Ok(())
  }

  /// Replace the profile after a refetch of `/users/me`
  pub fn refresh_profile(&mut self, fresh: Profile) {
    if let Session::Authenticated { profile, .. } = self {
      *profile = fresh;
    }
  }

  /// Authenticated → anonymous. Forgets the token everywhere and drops cached
  /// payloads that belonged to the old session.
  pub fn end(&mut self, client: &CachedApiClient, prefs: &Preferences) -> Result<()> {
    if let Session::Authenticated { profile, .. } = self {
      info!(user = %profile.username, "session ended");
    }
    *self = Session::Anonymous;
    client.inner().set_token(None);
    client.cache().clear_all();
    prefs.set_token(None)
  }
}

/// Exchange credentials for a token, then load the profile it belongs to.
///
/// The token is only kept on the client if the profile fetch succeeds.
pub async fn sign_in(
  client: &CachedApiClient,
  username: &str,
  password: &str,
) -> Result<SignedIn, ApiError> {
  let login = client.login(username, password).await?;
  let profile = load_profile(client, &login.token).await?;
  Ok(SignedIn {
    token: login.token,
    profile,
    trial_key: None,
  })
}

/// Register with an invite code and sign straight in.
pub async fn sign_up(
  client: &CachedApiClient,
  username: &str,
  email: &str,
  password: &str,
  invite_code: &str,
) -> Result<SignedIn, ApiError> {
  let registered = client
    .register(username, email, password, invite_code)
    .await?;
  info!(user = %registered.username, "account registered");
  let mut signed_in = sign_in(client, username, password).await?;
  signed_in.trial_key = registered.test_key;
  Ok(signed_in)
}

/// Check a token from persistent storage against `/users/me`.
pub async fn restore(client: &CachedApiClient, token: String) -> Result<SignedIn, ApiError> {
  let profile = load_profile(client, &token).await?;
  Ok(SignedIn {
    token,
    profile,
    trial_key: None,
  })
}

async fn load_profile(client: &CachedApiClient, token: &str) -> Result<Profile, ApiError> {
  client.inner().set_token(Some(token.to_string()));
  match client.me().await {
    Ok(profile) => Ok(profile),
    Err(e) => {
      warn!(token = %token_fingerprint(token), error = %e, "profile fetch failed");
      client.inner().set_token(None);
      Err(e)
    }
  }
}
