use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::Deserialize;
use uuid::Uuid;

use common::pagination::Pagination;
use common::types::Paged;
use models::lead;
use service::lead_service::{self, FollowUpInput, LeadFilter, LeadInput, UpdateLeadInput};

use super::auth::{AuthContext, ServerState};
use super::jobs::StatusInput;
use super::ApiResult;
use crate::errors::JsonApiError;

#[derive(Debug, Deserialize)]
pub struct AssignInput {
    pub assignee_id: Uuid,
}

pub async fn list(
    State(state): State<ServerState>,
    Extension(ctx): Extension<AuthContext>,
    Query(filter): Query<LeadFilter>,
    Query(page): Query<Pagination>,
) -> ApiResult<Paged<lead::Model>> {
    Ok(Json(lead_service::list_leads(&state.db, &ctx.actor, filter, page).await?))
}

pub async fn create(State(state): State<ServerState>, Extension(ctx): Extension<AuthContext>, Json(input): Json<LeadInput>) -> ApiResult<lead::Model> {
    let created = lead_service::create_lead(&state.db, state.integrations.notifier.as_ref(), &ctx.actor, input).await?;
    Ok(Json(created))
}

pub async fn get(State(state): State<ServerState>, Extension(ctx): Extension<AuthContext>, Path(id): Path<Uuid>) -> ApiResult<lead::Model> {
    Ok(Json(lead_service::get_lead(&state.db, &ctx.actor, id).await?))
}

pub async fn update(
    State(state): State<ServerState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateLeadInput>,
) -> ApiResult<lead::Model> {
    Ok(Json(lead_service::update_lead(&state.db, &ctx.actor, id, input).await?))
}

pub async fn set_status(
    State(state): State<ServerState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(input): Json<StatusInput>,
) -> ApiResult<lead::Model> {
    Ok(Json(lead_service::update_status(&state.db, &ctx.actor, id, &input.status).await?))
}

#[utoipa::path(
    put, path = "/api/leads/{id}/assign", tag = "leads",
    params(("id" = Uuid, Path, description = "Lead ID")),
    request_body = crate::openapi::AssignLeadRequest,
    responses((status = 200, description = "Assigned"), (status = 400, description = "Assignee not in clinic"), (status = 403, description = "Forbidden"))
)]
pub async fn assign(
    State(state): State<ServerState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(input): Json<AssignInput>,
) -> ApiResult<lead::Model> {
    let notifier = state.integrations.notifier.as_ref();
    Ok(Json(lead_service::assign_lead(&state.db, notifier, &ctx.actor, id, input.assignee_id).await?))
}

pub async fn add_follow_up(
    State(state): State<ServerState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(input): Json<FollowUpInput>,
) -> ApiResult<lead::Model> {
    Ok(Json(lead_service::add_follow_up(&state.db, &ctx.actor, id, input).await?))
}

pub async fn delete(State(state): State<ServerState>, Extension(ctx): Extension<AuthContext>, Path(id): Path<Uuid>) -> Result<StatusCode, JsonApiError> {
    lead_service::delete_lead(&state.db, &ctx.actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
