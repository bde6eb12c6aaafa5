use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use uuid::Uuid;

use common::pagination::Pagination;
use common::types::Paged;
use models::offer;
use service::offer_service::{self, OfferFilter, OfferInput, UpdateOfferInput};

use super::auth::{AuthContext, ServerState};
use super::ApiResult;
use crate::errors::JsonApiError;

pub async fn list(
    State(state): State<ServerState>,
    Extension(ctx): Extension<AuthContext>,
    Query(filter): Query<OfferFilter>,
    Query(page): Query<Pagination>,
) -> ApiResult<Paged<offer::Model>> {
    Ok(Json(offer_service::list_offers(&state.db, &ctx.actor, filter, page).await?))
}

pub async fn create(State(state): State<ServerState>, Extension(ctx): Extension<AuthContext>, Json(input): Json<OfferInput>) -> ApiResult<offer::Model> {
    Ok(Json(offer_service::create_offer(&state.db, &ctx.actor, input).await?))
}

pub async fn get(State(state): State<ServerState>, Extension(ctx): Extension<AuthContext>, Path(id): Path<Uuid>) -> ApiResult<offer::Model> {
    Ok(Json(offer_service::get_offer(&state.db, &ctx.actor, id).await?))
}

pub async fn update(
    State(state): State<ServerState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateOfferInput>,
) -> ApiResult<offer::Model> {
    Ok(Json(offer_service::update_offer(&state.db, &ctx.actor, id, input).await?))
}

pub async fn delete(State(state): State<ServerState>, Extension(ctx): Extension<AuthContext>, Path(id): Path<Uuid>) -> Result<StatusCode, JsonApiError> {
    offer_service::delete_offer(&state.db, &ctx.actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
