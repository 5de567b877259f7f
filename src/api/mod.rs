//! REST client for the key service.

pub mod api_types;
pub mod cached_client;
pub mod client;
pub mod error;
pub mod types;

pub use cached_client::{CachedApiClient, UserOrder};
pub use client::ApiClient;
pub use error::ApiError;
