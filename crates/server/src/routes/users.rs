use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::Deserialize;
use uuid::Uuid;

use common::pagination::Pagination;
use common::types::Paged;
use models::user;
use service::auth::domain::AuthUser;
use service::user_service::{self, CreateMemberInput, UpdateUserInput, UserFilter};

use super::auth::{AuthContext, ServerState};
use super::ApiResult;
use crate::errors::JsonApiError;

#[derive(Debug, Default, Deserialize)]
pub struct DeleteQuery {
    #[serde(default)]
    pub hard: bool,
}

pub async fn list(
    State(state): State<ServerState>,
    Extension(ctx): Extension<AuthContext>,
    Query(filter): Query<UserFilter>,
    Query(page): Query<Pagination>,
) -> ApiResult<Paged<user::Model>> {
    Ok(Json(user_service::list_users(&state.db, &ctx.actor, filter, page).await?))
}

pub async fn create(
    State(state): State<ServerState>,
    Extension(ctx): Extension<AuthContext>,
    Json(input): Json<CreateMemberInput>,
) -> ApiResult<AuthUser> {
    Ok(Json(user_service::create_member(&state.db, state.auth.as_ref(), &ctx.actor, input).await?))
}

pub async fn get(State(state): State<ServerState>, Extension(ctx): Extension<AuthContext>, Path(id): Path<Uuid>) -> ApiResult<user::Model> {
    Ok(Json(user_service::get_user(&state.db, &ctx.actor, id).await?))
}

pub async fn update(
    State(state): State<ServerState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateUserInput>,
) -> ApiResult<user::Model> {
    Ok(Json(user_service::update_user(&state.db, &ctx.actor, id, input).await?))
}

/// Soft delete by default; `?hard=true` removes the row (admin only).
pub async fn delete(
    State(state): State<ServerState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Query(q): Query<DeleteQuery>,
) -> Result<StatusCode, JsonApiError> {
    if q.hard {
        user_service::hard_delete_user(&state.db, &ctx.actor, id).await?;
    } else {
        user_service::soft_delete_user(&state.db, &ctx.actor, id).await?;
    }
    Ok(StatusCode::NO_CONTENT)
}
