//! Pages the navigator can show and who may see them.

use crate::session::Session;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
  Home,
  Login,
  Register,
  Keys,
  Invites,
  Discord,
  ChangePassword,
  Users,
  AllKeys,
  ErrorLog,
}

/// Who may open a route
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
  Anyone,
  /// Only while signed out
  Guest,
  SignedIn,
  /// Admin or support
  Staff,
  Admin,
}

impl Route {
  pub fn access(&self) -> Access {
    match self {
      Route::Home | Route::ErrorLog => Access::Anyone,
      Route::Login | Route::Register => Access::Guest,
      Route::Keys | Route::Invites | Route::Discord | Route::ChangePassword => Access::SignedIn,
      Route::Users => Access::Staff,
      Route::AllKeys => Access::Admin,
    }
  }

  pub fn title(&self) -> &'static str {
    match self {
      Route::Home => "Home",
      Route::Login => "Login",
      Route::Register => "Register",
      Route::Keys => "Keys",
      Route::Invites => "Invites",
      Route::Discord => "Discord",
      Route::ChangePassword => "Password",
      Route::Users => "Users",
      Route::AllKeys => "All keys",
      Route::ErrorLog => "Errors",
    }
  }

  /// Route for a palette command name
  pub fn from_command(name: &str) -> Option<Route> {
    let route = match name {
      "home" => Route::Home,
      "login" => Route::Login,
      "register" => Route::Register,
      "keys" => Route::Keys,
      "invites" => Route::Invites,
      "discord" => Route::Discord,
      "password" => Route::ChangePassword,
      "users" => Route::Users,
      "allkeys" => Route::AllKeys,
      "errors" => Route::ErrorLog,
      _ => return None,
    };
    Some(route)
  }
}

/// Whether `session` may open `route` as requested
pub fn allowed(route: Route, session: &Session) -> bool {
  match route.access() {
    Access::Anyone => true,
    Access::Guest => !session.is_authenticated(),
    Access::SignedIn => session.is_authenticated(),
    Access::Staff => session.is_staff(),
    Access::Admin => session.is_admin(),
  }
}

/// The route actually shown when `requested` is asked for.
///
/// Forbidden routes redirect silently: to login when signed out, home when
/// signed in.
pub fn resolve(requested: Route, session: &Session) -> Route {
  if allowed(requested, session) {
    return requested;
  }
  if session.is_authenticated() {
    Route::Home
  } else {
    Route::Login
  }
}
