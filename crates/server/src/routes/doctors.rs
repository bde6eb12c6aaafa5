use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use uuid::Uuid;

use common::pagination::Pagination;
use common::types::Paged;
use models::doctor_profile;
use service::doctor_service::{self, DoctorFilter, DoctorInput, UpdateDoctorInput};

use super::auth::{AuthContext, ServerState};
use super::clinics::ApprovalInput;
use super::ApiResult;
use crate::errors::JsonApiError;

pub async fn list(
    State(state): State<ServerState>,
    Query(filter): Query<DoctorFilter>,
    Query(page): Query<Pagination>,
) -> ApiResult<Paged<doctor_profile::Model>> {
    Ok(Json(doctor_service::list_doctors(&state.db, filter, page).await?))
}

pub async fn create(
    State(state): State<ServerState>,
    Extension(ctx): Extension<AuthContext>,
    Json(input): Json<DoctorInput>,
) -> ApiResult<doctor_profile::Model> {
    Ok(Json(doctor_service::create_doctor(&state.db, &ctx.actor, input).await?))
}

pub async fn get(State(state): State<ServerState>, Path(id): Path<Uuid>) -> ApiResult<doctor_profile::Model> {
    Ok(Json(doctor_service::get_doctor(&state.db, id).await?))
}

pub async fn update(
    State(state): State<ServerState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateDoctorInput>,
) -> ApiResult<doctor_profile::Model> {
    Ok(Json(doctor_service::update_doctor(&state.db, &ctx.actor, id, input).await?))
}

pub async fn approve(
    State(state): State<ServerState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(input): Json<ApprovalInput>,
) -> ApiResult<doctor_profile::Model> {
    Ok(Json(doctor_service::approve_doctor(&state.db, &ctx.actor, id, input.approved).await?))
}

pub async fn delete(State(state): State<ServerState>, Extension(ctx): Extension<AuthContext>, Path(id): Path<Uuid>) -> Result<StatusCode, JsonApiError> {
    doctor_service::delete_doctor(&state.db, &ctx.actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
