use axum::extract::multipart::MultipartError;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use tracing::{info, warn};

use service::integrations::media::{check_upload, StoredMedia, UploadRejection};

use super::auth::{AuthContext, ServerState};
use super::ApiResult;
use crate::errors::JsonApiError;

const FILE_FIELD: &str = "file";

/// Keeps the status multipart reports, so body-limit overruns answer 413.
fn multipart_error(e: MultipartError) -> JsonApiError {
    let status = e.status();
    let title = status.canonical_reason().unwrap_or("Bad Request");
    JsonApiError::new(status, title, Some(e.body_text()))
}

fn rejection(r: UploadRejection) -> JsonApiError {
    match r {
        UploadRejection::Empty => JsonApiError::bad_request("file is empty"),
        UploadRejection::TooLarge { limit } => {
            JsonApiError::new(StatusCode::PAYLOAD_TOO_LARGE, "Payload Too Large", Some(format!("file exceeds {limit} bytes")))
        }
        UploadRejection::UnsupportedType(t) => {
            JsonApiError::new(StatusCode::UNSUPPORTED_MEDIA_TYPE, "Unsupported Media Type", Some(format!("type {t} is not allowed")))
        }
    }
}

/// Stores the multipart `file` field and returns where it can be fetched.
pub async fn upload(
    State(state): State<ServerState>,
    Extension(ctx): Extension<AuthContext>,
    mut multipart: Multipart,
) -> ApiResult<StoredMedia> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let file_name = field.file_name().unwrap_or("upload").to_string();
        let content_type = field.content_type().unwrap_or("application/octet-stream").to_string();
        let data = field.bytes().await.map_err(|e| {
            warn!(error = %e, "upload_read_failed");
            multipart_error(e)
        })?;
        check_upload(&content_type, data.len(), state.uploads.max_bytes).map_err(rejection)?;
        let stored = state.integrations.media.upload(&file_name, &content_type, data.to_vec()).await?;
        info!(user_id = %ctx.actor.user_id, public_id = %stored.public_id, "upload_stored");
        return Ok(Json(stored));
    }
    Err(JsonApiError::bad_request("multipart field `file` is required"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejections_map_to_status_codes() {
        assert_eq!(rejection(UploadRejection::Empty).status, StatusCode::BAD_REQUEST);
        assert_eq!(rejection(UploadRejection::TooLarge { limit: 10 }).status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(rejection(UploadRejection::UnsupportedType("text/html".into())).status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    }
}
