//! Admin inbox for get-in-touch messages.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use uuid::Uuid;

use common::pagination::Pagination;
use common::types::Paged;
use models::get_in_touch as contact;
use service::contact_service::{self, ContactFilter};

use super::auth::{AuthContext, ServerState};
use super::ApiResult;
use crate::errors::JsonApiError;

pub async fn list(
    State(state): State<ServerState>,
    Extension(ctx): Extension<AuthContext>,
    Query(filter): Query<ContactFilter>,
    Query(page): Query<Pagination>,
) -> ApiResult<Paged<contact::Model>> {
    Ok(Json(contact_service::list_contacts(&state.db, &ctx.actor, filter, page).await?))
}

pub async fn mark_responded(State(state): State<ServerState>, Extension(ctx): Extension<AuthContext>, Path(id): Path<Uuid>) -> ApiResult<contact::Model> {
    Ok(Json(contact_service::mark_responded(&state.db, &ctx.actor, id).await?))
}

pub async fn delete(State(state): State<ServerState>, Extension(ctx): Extension<AuthContext>, Path(id): Path<Uuid>) -> Result<StatusCode, JsonApiError> {
    contact_service::delete_contact(&state.db, &ctx.actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
