mod all_keys;
mod change_password;
mod discord;
mod error_log;
mod home;
mod invites;
mod keys;
mod login;
mod register;
mod table;
mod users;

pub use all_keys::AllKeysView;
pub use change_password::ChangePasswordView;
pub use discord::DiscordView;
pub use error_log::ErrorLogView;
pub use home::HomeView;
pub use invites::InvitesView;
pub use keys::KeysView;
pub use login::LoginView;
pub use register::RegisterView;
pub use users::UsersView;

use crate::routes::Route;
use crate::state::AppState;
use crate::ui::view::View;

/// Fresh view for `route`. Access checks happen before this is called.
pub fn build(route: Route, state: &AppState) -> Box<dyn View> {
  match route {
    Route::Home => Box::new(HomeView::new()),
    Route::Login => Box::new(LoginView::new(state)),
    Route::Register => Box::new(RegisterView::new(state)),
    Route::Keys => Box::new(KeysView::new(state)),
    Route::Invites => Box::new(InvitesView::new(state)),
    Route::Discord => Box::new(DiscordView::new(state)),
    Route::ChangePassword => Box::new(ChangePasswordView::new(state)),
    Route::Users => Box::new(UsersView::new(state)),
    Route::AllKeys => Box::new(AllKeysView::new(state)),
    Route::ErrorLog => Box::new(ErrorLogView::new()),
  }
}
