use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, warn};

use models::errors::ModelError;
use service::auth::errors::AuthError;
use service::ServiceError;

/// Marker left on 403 responses produced by a permission check.
#[derive(Debug, Clone, Copy)]
pub struct PermissionDenied;

/// JSON error body: `{"error": ..., "detail": ...}`.
#[derive(Debug)]
pub struct JsonApiError {
    pub status: StatusCode,
    pub error: String,
    pub detail: Option<String>,
    denied: bool,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<&'a str>,
}

impl JsonApiError {
    pub fn new(status: StatusCode, error: impl Into<String>, detail: Option<String>) -> Self {
        Self { status, error: error.into(), detail, denied: false }
    }

    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "Validation Error", Some(detail.into()))
    }

    pub fn unauthorized(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "Unauthorized", Some(detail.into()))
    }

    pub fn forbidden(detail: impl Into<String>) -> Self {
        Self { denied: true, ..Self::new(StatusCode::FORBIDDEN, "Forbidden", Some(detail.into())) }
    }
}

impl IntoResponse for JsonApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(status = %self.status, error = %self.error, detail = ?self.detail, "request failed");
        } else if self.denied {
            warn!(detail = ?self.detail, "permission denied");
        }
        let body = ErrorBody { error: &self.error, detail: self.detail.as_deref() };
        let mut resp = (self.status, Json(body)).into_response();
        if self.denied {
            resp.extensions_mut().insert(PermissionDenied);
        }
        resp
    }
}

impl From<ServiceError> for JsonApiError {
    fn from(e: ServiceError) -> Self {
        let detail = Some(e.to_string());
        match e {
            ServiceError::Validation(_) => Self::new(StatusCode::BAD_REQUEST, "Validation Error", detail),
            ServiceError::Model(ModelError::Conflict(_)) | ServiceError::Conflict(_) => {
                Self::new(StatusCode::CONFLICT, "Conflict", detail)
            }
            ServiceError::Model(ModelError::Db(_)) | ServiceError::Db(_) => {
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal Error", detail)
            }
            ServiceError::Model(_) => Self::new(StatusCode::BAD_REQUEST, "Validation Error", detail),
            ServiceError::Forbidden(msg) => Self::forbidden(msg),
            ServiceError::NotFound(_) => Self::new(StatusCode::NOT_FOUND, "Not Found", detail),
            ServiceError::Integration(_) => Self::new(StatusCode::BAD_GATEWAY, "Upstream Error", detail),
        }
    }
}

impl From<AuthError> for JsonApiError {
    fn from(e: AuthError) -> Self {
        let detail = Some(e.to_string());
        debug!(code = e.code(), error = %e, "auth error");
        match e {
            AuthError::Validation(_) => Self::new(StatusCode::BAD_REQUEST, "Validation Error", detail),
            AuthError::Conflict => Self::new(StatusCode::CONFLICT, "Conflict", detail),
            AuthError::NotFound => Self::new(StatusCode::NOT_FOUND, "Not Found", detail),
            AuthError::Unauthorized | AuthError::TokenError(_) => Self::new(StatusCode::UNAUTHORIZED, "Unauthorized", detail),
            AuthError::Inactive => Self::new(StatusCode::FORBIDDEN, "Forbidden", detail),
            AuthError::Forbidden(msg) => Self::forbidden(msg),
            AuthError::HashError(_) | AuthError::Repository(_) => {
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal Error", detail)
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("metrics registry: {0}")]
    Metrics(#[from] prometheus::Error),
    #[error(transparent)]
    Any(#[from] anyhow::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_errors_map_to_statuses() {
        let cases = [
            (ServiceError::validation("bad"), StatusCode::BAD_REQUEST),
            (ServiceError::Model(ModelError::Validation("neg".into())), StatusCode::BAD_REQUEST),
            (ServiceError::Model(ModelError::Conflict("dup".into())), StatusCode::CONFLICT),
            (ServiceError::Conflict("dup".into()), StatusCode::CONFLICT),
            (ServiceError::forbidden("no"), StatusCode::FORBIDDEN),
            (ServiceError::not_found("clinic"), StatusCode::NOT_FOUND),
            (ServiceError::Integration("down".into()), StatusCode::BAD_GATEWAY),
            (ServiceError::Db("boom".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(JsonApiError::from(err).status, status);
        }
    }

    #[test]
    fn forbidden_responses_carry_the_marker() {
        let resp = JsonApiError::from(ServiceError::forbidden("no")).into_response();
        assert!(resp.extensions().get::<PermissionDenied>().is_some());
        let resp = JsonApiError::from(AuthError::Inactive).into_response();
        assert!(resp.extensions().get::<PermissionDenied>().is_none());
    }
}
