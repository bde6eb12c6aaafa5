use sea_orm::{DbErr, SqlErr};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("database error: {0}")]
    Db(String),
}

impl ModelError {
    pub fn validation(msg: impl Into<String>) -> Self { Self::Validation(msg.into()) }
}

/// Save hooks reject rows with `DbErr::Custom`; those surface as validation errors.
/// Unique-index violations surface as conflicts.
impl From<DbErr> for ModelError {
    fn from(e: DbErr) -> Self {
        if let DbErr::Custom(msg) = &e {
            return ModelError::Validation(msg.clone());
        }
        match e.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(msg)) => ModelError::Conflict(msg),
            _ => ModelError::Db(e.to_string()),
        }
    }
}

impl From<ModelError> for DbErr {
    fn from(e: ModelError) -> Self {
        match e {
            ModelError::Validation(msg) => DbErr::Custom(msg),
            other => DbErr::Custom(other.to_string()),
        }
    }
}
