use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::Deserialize;
use uuid::Uuid;

use common::pagination::Pagination;
use common::types::Paged;
use models::job_posting;
use service::job_service::{self, JobFilter, JobInput, UpdateJobInput};

use super::auth::{AuthContext, ServerState};
use super::ApiResult;
use crate::errors::JsonApiError;

#[derive(Debug, Deserialize)]
pub struct StatusInput {
    pub status: String,
}

pub async fn list(
    State(state): State<ServerState>,
    Extension(ctx): Extension<AuthContext>,
    Query(filter): Query<JobFilter>,
    Query(page): Query<Pagination>,
) -> ApiResult<Paged<job_posting::Model>> {
    Ok(Json(job_service::list_jobs(&state.db, &ctx.actor, filter, page).await?))
}

pub async fn create(State(state): State<ServerState>, Extension(ctx): Extension<AuthContext>, Json(input): Json<JobInput>) -> ApiResult<job_posting::Model> {
    Ok(Json(job_service::create_job(&state.db, &ctx.actor, input).await?))
}

pub async fn get(State(state): State<ServerState>, Extension(ctx): Extension<AuthContext>, Path(id): Path<Uuid>) -> ApiResult<job_posting::Model> {
    Ok(Json(job_service::get_job(&state.db, &ctx.actor, id).await?))
}

pub async fn update(
    State(state): State<ServerState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateJobInput>,
) -> ApiResult<job_posting::Model> {
    Ok(Json(job_service::update_job(&state.db, &ctx.actor, id, input).await?))
}

pub async fn set_status(
    State(state): State<ServerState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(input): Json<StatusInput>,
) -> ApiResult<job_posting::Model> {
    Ok(Json(job_service::set_status(&state.db, &ctx.actor, id, &input.status).await?))
}

pub async fn delete(State(state): State<ServerState>, Extension(ctx): Extension<AuthContext>, Path(id): Path<Uuid>) -> Result<StatusCode, JsonApiError> {
    job_service::delete_job(&state.db, &ctx.actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
