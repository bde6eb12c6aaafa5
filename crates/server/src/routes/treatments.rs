use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use uuid::Uuid;

use common::pagination::Pagination;
use common::types::Paged;
use models::treatment::{self, SubCategory};
use service::treatment_service::{self, SubCategoryInput, TreatmentFilter, TreatmentInput, UpdateTreatmentInput};

use super::auth::{AuthContext, ServerState};
use super::ApiResult;
use crate::errors::JsonApiError;

pub async fn list(
    State(state): State<ServerState>,
    Extension(ctx): Extension<AuthContext>,
    Query(filter): Query<TreatmentFilter>,
    Query(page): Query<Pagination>,
) -> ApiResult<Paged<treatment::Model>> {
    Ok(Json(treatment_service::list_treatments(&state.db, &ctx.actor, filter, page).await?))
}

pub async fn create(State(state): State<ServerState>, Extension(ctx): Extension<AuthContext>, Json(input): Json<TreatmentInput>) -> ApiResult<treatment::Model> {
    Ok(Json(treatment_service::create_treatment(&state.db, &ctx.actor, input).await?))
}

pub async fn get(State(state): State<ServerState>, Extension(ctx): Extension<AuthContext>, Path(id): Path<Uuid>) -> ApiResult<treatment::Model> {
    Ok(Json(treatment_service::get_treatment(&state.db, &ctx.actor, id).await?))
}

pub async fn update(
    State(state): State<ServerState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateTreatmentInput>,
) -> ApiResult<treatment::Model> {
    Ok(Json(treatment_service::update_treatment(&state.db, &ctx.actor, id, input).await?))
}

pub async fn delete(State(state): State<ServerState>, Extension(ctx): Extension<AuthContext>, Path(id): Path<Uuid>) -> Result<StatusCode, JsonApiError> {
    treatment_service::delete_treatment(&state.db, &ctx.actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn add_sub_category(
    State(state): State<ServerState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(input): Json<SubCategoryInput>,
) -> ApiResult<SubCategory> {
    Ok(Json(treatment_service::add_sub_category(&state.db, &ctx.actor, id, input).await?))
}

pub async fn remove_sub_category(
    State(state): State<ServerState>,
    Extension(ctx): Extension<AuthContext>,
    Path((id, slug)): Path<(Uuid, String)>,
) -> ApiResult<treatment::Model> {
    Ok(Json(treatment_service::remove_sub_category(&state.db, &ctx.actor, id, &slug).await?))
}
