use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use common::pagination::Pagination;
use common::types::Paged;
use models::clinic;
use models::user::Role;
use service::clinic_service::{self, ClinicFilter, CreateClinicInput, UpdateClinicInput};

use super::auth::{session_cookie, AuthContext, ServerState};
use super::ApiResult;
use crate::errors::JsonApiError;

#[derive(Debug, Deserialize)]
pub struct ApprovalInput {
    pub approved: bool,
}

/// New clinic plus a fresh token carrying the owner's clinic link.
#[derive(Serialize)]
pub struct ClinicCreated {
    pub clinic: clinic::Model,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

pub async fn list(
    State(state): State<ServerState>,
    Query(filter): Query<ClinicFilter>,
    Query(page): Query<Pagination>,
) -> ApiResult<Paged<clinic::Model>> {
    Ok(Json(clinic_service::list_clinics(&state.db, filter, page).await?))
}

#[utoipa::path(
    post, path = "/api/clinics", tag = "clinics",
    request_body = crate::openapi::CreateClinicRequest,
    responses(
        (status = 200, description = "Created"),
        (status = 400, description = "Validation Error"),
        (status = 403, description = "Forbidden"),
        (status = 409, description = "Owner already has a clinic")
    )
)]
pub async fn create(
    State(state): State<ServerState>,
    Extension(ctx): Extension<AuthContext>,
    jar: CookieJar,
    Json(input): Json<CreateClinicInput>,
) -> Result<(CookieJar, Json<ClinicCreated>), JsonApiError> {
    let created = clinic_service::create_clinic(&state.db, state.integrations.geocoder.as_ref(), &ctx.actor, input).await?;
    if ctx.actor.role != Role::Clinic {
        return Ok((jar, Json(ClinicCreated { clinic: created, token: None })));
    }
    match state.auth.refresh_token(ctx.actor.user_id).await {
        Ok(token) => {
            let jar = jar.add(session_cookie(token.clone()));
            Ok((jar, Json(ClinicCreated { clinic: created, token: Some(token) })))
        }
        Err(e) => {
            warn!(error = %e, "token refresh after clinic creation failed");
            Ok((jar, Json(ClinicCreated { clinic: created, token: None })))
        }
    }
}

pub async fn get(State(state): State<ServerState>, Path(id): Path<Uuid>) -> ApiResult<clinic::Model> {
    Ok(Json(clinic_service::get_clinic(&state.db, id).await?))
}

pub async fn update(
    State(state): State<ServerState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateClinicInput>,
) -> ApiResult<clinic::Model> {
    let updated = clinic_service::update_clinic(&state.db, state.integrations.geocoder.as_ref(), &ctx.actor, id, input).await?;
    Ok(Json(updated))
}

pub async fn approve(
    State(state): State<ServerState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(input): Json<ApprovalInput>,
) -> ApiResult<clinic::Model> {
    Ok(Json(clinic_service::approve_clinic(&state.db, &ctx.actor, id, input.approved).await?))
}

#[utoipa::path(
    delete, path = "/api/clinics/{id}", tag = "clinics",
    params(("id" = Uuid, Path, description = "Clinic ID")),
    responses((status = 204, description = "Deleted with dependents"), (status = 403, description = "Forbidden"), (status = 404, description = "Not Found"))
)]
pub async fn delete(State(state): State<ServerState>, Extension(ctx): Extension<AuthContext>, Path(id): Path<Uuid>) -> Result<StatusCode, JsonApiError> {
    clinic_service::delete_clinic(&state.db, &ctx.actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
