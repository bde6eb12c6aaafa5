use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use uuid::Uuid;

use common::pagination::Pagination;
use common::types::Paged;
use models::patient_registration as patient;
use service::patient_service::{self, PatientFilter, PatientInput, PaymentInput, UpdatePatientInput};

use super::auth::{AuthContext, ServerState};
use super::ApiResult;
use crate::errors::JsonApiError;

pub async fn list(
    State(state): State<ServerState>,
    Extension(ctx): Extension<AuthContext>,
    Query(filter): Query<PatientFilter>,
    Query(page): Query<Pagination>,
) -> ApiResult<Paged<patient::Model>> {
    Ok(Json(patient_service::list_patients(&state.db, &ctx.actor, filter, page).await?))
}

pub async fn create(State(state): State<ServerState>, Extension(ctx): Extension<AuthContext>, Json(input): Json<PatientInput>) -> ApiResult<patient::Model> {
    Ok(Json(patient_service::register_patient(&state.db, &ctx.actor, input).await?))
}

pub async fn get(State(state): State<ServerState>, Extension(ctx): Extension<AuthContext>, Path(id): Path<Uuid>) -> ApiResult<patient::Model> {
    Ok(Json(patient_service::get_patient(&state.db, &ctx.actor, id).await?))
}

pub async fn update(
    State(state): State<ServerState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdatePatientInput>,
) -> ApiResult<patient::Model> {
    Ok(Json(patient_service::update_patient(&state.db, &ctx.actor, id, input).await?))
}

pub async fn record_payment(
    State(state): State<ServerState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(input): Json<PaymentInput>,
) -> ApiResult<patient::Model> {
    let notifier = state.integrations.notifier.as_ref();
    Ok(Json(patient_service::record_payment(&state.db, notifier, &ctx.actor, id, input).await?))
}

pub async fn delete(State(state): State<ServerState>, Extension(ctx): Extension<AuthContext>, Path(id): Path<Uuid>) -> Result<StatusCode, JsonApiError> {
    patient_service::delete_patient(&state.db, &ctx.actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
