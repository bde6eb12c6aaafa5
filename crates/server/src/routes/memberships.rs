use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use uuid::Uuid;

use common::pagination::Pagination;
use common::types::Paged;
use models::membership;
use service::membership_service::{self, ConsumeInput, MembershipFilter, MembershipInput, UpdateMembershipInput};

use super::auth::{AuthContext, ServerState};
use super::ApiResult;
use crate::errors::JsonApiError;

pub async fn list(
    State(state): State<ServerState>,
    Extension(ctx): Extension<AuthContext>,
    Query(filter): Query<MembershipFilter>,
    Query(page): Query<Pagination>,
) -> ApiResult<Paged<membership::Model>> {
    Ok(Json(membership_service::list_memberships(&state.db, &ctx.actor, filter, page).await?))
}

pub async fn create(
    State(state): State<ServerState>,
    Extension(ctx): Extension<AuthContext>,
    Json(input): Json<MembershipInput>,
) -> ApiResult<membership::Model> {
    Ok(Json(membership_service::create_membership(&state.db, &ctx.actor, input).await?))
}

pub async fn get(State(state): State<ServerState>, Extension(ctx): Extension<AuthContext>, Path(id): Path<Uuid>) -> ApiResult<membership::Model> {
    Ok(Json(membership_service::get_membership(&state.db, &ctx.actor, id).await?))
}

pub async fn update(
    State(state): State<ServerState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateMembershipInput>,
) -> ApiResult<membership::Model> {
    Ok(Json(membership_service::update_membership(&state.db, &ctx.actor, id, input).await?))
}

/// Records a treatment against the package balance.
pub async fn consume(
    State(state): State<ServerState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(input): Json<ConsumeInput>,
) -> ApiResult<membership::Model> {
    Ok(Json(membership_service::consume_treatment(&state.db, &ctx.actor, id, input).await?))
}

pub async fn delete(State(state): State<ServerState>, Extension(ctx): Extension<AuthContext>, Path(id): Path<Uuid>) -> Result<StatusCode, JsonApiError> {
    membership_service::delete_membership(&state.db, &ctx.actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
