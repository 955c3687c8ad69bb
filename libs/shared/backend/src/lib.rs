pub mod client;
pub mod error;

pub use client::PortalApiClient;
pub use error::ApiError;
