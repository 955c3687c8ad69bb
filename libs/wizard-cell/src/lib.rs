pub mod models;
pub mod error;
pub mod validation;
pub mod services;

pub use models::*;
pub use error::*;
pub use services::*;
