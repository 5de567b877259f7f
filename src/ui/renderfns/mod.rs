pub mod footer;
pub mod header;
pub mod overlay;
pub mod pager;
pub mod toasts;
pub mod utils;

pub use footer::draw_footer;
pub use header::draw_header;
pub use pager::pager_line;
pub use toasts::draw_toasts;
