use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::Deserialize;
use uuid::Uuid;

use common::pagination::Pagination;
use common::types::Paged;
use models::petty_cash;
use service::petty_cash_service::{self, AllocationInput, CashSummary, ExpenseInput, FloatFilter, FloatInput};

use super::auth::{AuthContext, ServerState};
use super::ApiResult;
use crate::errors::JsonApiError;

#[derive(Debug, Default, Deserialize)]
pub struct SummaryQuery {
    pub clinic_id: Option<Uuid>,
}

pub async fn list(
    State(state): State<ServerState>,
    Extension(ctx): Extension<AuthContext>,
    Query(filter): Query<FloatFilter>,
    Query(page): Query<Pagination>,
) -> ApiResult<Paged<petty_cash::Model>> {
    Ok(Json(petty_cash_service::list_floats(&state.db, &ctx.actor, filter, page).await?))
}

pub async fn create(State(state): State<ServerState>, Extension(ctx): Extension<AuthContext>, Json(input): Json<FloatInput>) -> ApiResult<petty_cash::Model> {
    Ok(Json(petty_cash_service::create_float(&state.db, &ctx.actor, input).await?))
}

pub async fn summary(
    State(state): State<ServerState>,
    Extension(ctx): Extension<AuthContext>,
    Query(q): Query<SummaryQuery>,
) -> ApiResult<CashSummary> {
    Ok(Json(petty_cash_service::clinic_summary(&state.db, &ctx.actor, q.clinic_id).await?))
}

pub async fn get(State(state): State<ServerState>, Extension(ctx): Extension<AuthContext>, Path(id): Path<Uuid>) -> ApiResult<petty_cash::Model> {
    Ok(Json(petty_cash_service::get_float(&state.db, &ctx.actor, id).await?))
}

pub async fn add_allocation(
    State(state): State<ServerState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(input): Json<AllocationInput>,
) -> ApiResult<petty_cash::Model> {
    Ok(Json(petty_cash_service::add_allocation(&state.db, &ctx.actor, id, input).await?))
}

pub async fn add_expense(
    State(state): State<ServerState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(input): Json<ExpenseInput>,
) -> ApiResult<petty_cash::Model> {
    Ok(Json(petty_cash_service::add_expense(&state.db, &ctx.actor, id, input).await?))
}

pub async fn remove_expense(
    State(state): State<ServerState>,
    Extension(ctx): Extension<AuthContext>,
    Path((id, index)): Path<(Uuid, usize)>,
) -> ApiResult<petty_cash::Model> {
    Ok(Json(petty_cash_service::remove_expense(&state.db, &ctx.actor, id, index).await?))
}

pub async fn delete(State(state): State<ServerState>, Extension(ctx): Extension<AuthContext>, Path(id): Path<Uuid>) -> Result<StatusCode, JsonApiError> {
    petty_cash_service::delete_float(&state.db, &ctx.actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
