use thiserror::Error;

/// Failures of registration, login and token checks.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("email already registered")]
    Conflict,
    #[error("account not found")]
    NotFound,
    #[error("invalid email or password")]
    Unauthorized,
    #[error("account disabled")]
    Inactive,
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("password hashing failed: {0}")]
    HashError(String),
    #[error("invalid token: {0}")]
    TokenError(String),
    #[error("repository error: {0}")]
    Repository(String),
}

impl AuthError {
    /// Stable code written to logs next to the message.
    pub fn code(&self) -> u16 {
        match self {
            AuthError::Validation(_) => 1001,
            AuthError::Conflict => 1002,
            AuthError::NotFound => 1003,
            AuthError::Unauthorized => 1004,
            AuthError::Inactive => 1005,
            AuthError::Forbidden(_) => 1006,
            AuthError::HashError(_) => 1101,
            AuthError::TokenError(_) => 1102,
            AuthError::Repository(_) => 1200,
        }
    }
}
