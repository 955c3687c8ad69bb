use thiserror::Error;

use shared_utils::jwt::TokenError;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SessionError {
    #[error("Session token rejected: {0}")]
    InvalidToken(#[from] TokenError),

    #[error("Session store is unavailable")]
    Unavailable,
}
