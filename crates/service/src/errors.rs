use sea_orm::DbErr;
use thiserror::Error;

use models::errors::ModelError;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("integration error: {0}")]
    Integration(String),
    #[error("database error: {0}")]
    Db(String),
    #[error("model error: {0}")]
    Model(#[from] ModelError),
}

impl ServiceError {
    pub fn not_found(entity: &str) -> Self { Self::NotFound(format!("{} not found", entity)) }

    pub fn forbidden(msg: impl Into<String>) -> Self { Self::Forbidden(msg.into()) }

    pub fn validation(msg: impl Into<String>) -> Self { Self::Validation(msg.into()) }
}

/// Hook rejections and unique violations keep their meaning through `ModelError`.
impl From<DbErr> for ServiceError {
    fn from(e: DbErr) -> Self { ServiceError::Model(ModelError::from(e)) }
}

impl From<crate::auth::errors::AuthError> for ServiceError {
    fn from(e: crate::auth::errors::AuthError) -> Self {
        use crate::auth::errors::AuthError;
        match e {
            AuthError::Validation(m) => ServiceError::Validation(m),
            AuthError::Conflict => ServiceError::Conflict("user already exists".into()),
            AuthError::NotFound => ServiceError::not_found("user"),
            AuthError::Forbidden(m) => ServiceError::Forbidden(m),
            other => ServiceError::Db(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hook_rejection_surfaces_as_validation() {
        let e: ServiceError = DbErr::Custom("pending below zero".into()).into();
        assert!(matches!(e, ServiceError::Model(ModelError::Validation(_))));
    }
}
