use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use uuid::Uuid;

use common::pagination::Pagination;
use common::types::Paged;
use models::vendor;
use service::vendor_service::{self, UpdateVendorInput, VendorFilter, VendorInput};

use super::auth::{AuthContext, ServerState};
use super::ApiResult;
use crate::errors::JsonApiError;

pub async fn list(
    State(state): State<ServerState>,
    Extension(ctx): Extension<AuthContext>,
    Query(filter): Query<VendorFilter>,
    Query(page): Query<Pagination>,
) -> ApiResult<Paged<vendor::Model>> {
    Ok(Json(vendor_service::list_vendors(&state.db, &ctx.actor, filter, page).await?))
}

pub async fn create(State(state): State<ServerState>, Extension(ctx): Extension<AuthContext>, Json(input): Json<VendorInput>) -> ApiResult<vendor::Model> {
    Ok(Json(vendor_service::create_vendor(&state.db, &ctx.actor, input).await?))
}

pub async fn get(State(state): State<ServerState>, Extension(ctx): Extension<AuthContext>, Path(id): Path<Uuid>) -> ApiResult<vendor::Model> {
    Ok(Json(vendor_service::get_vendor(&state.db, &ctx.actor, id).await?))
}

pub async fn update(
    State(state): State<ServerState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateVendorInput>,
) -> ApiResult<vendor::Model> {
    Ok(Json(vendor_service::update_vendor(&state.db, &ctx.actor, id, input).await?))
}

pub async fn delete(State(state): State<ServerState>, Extension(ctx): Extension<AuthContext>, Path(id): Path<Uuid>) -> Result<StatusCode, JsonApiError> {
    vendor_service::delete_vendor(&state.db, &ctx.actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
