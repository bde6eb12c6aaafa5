//! Handlers reachable without a token.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use common::pagination::Pagination;
use common::types::{Nearby, Paged};
use models::{blog, clinic, doctor_profile, get_in_touch, job_posting, offer};
use service::blog_service::{self, BlogFilter};
use service::clinic_service::{self, AddressSearch, ClinicFilter, NearbyQuery};
use service::contact_service::{self, ContactInput};
use service::doctor_service::{self, DoctorFilter};
use service::job_service::{self, JobFilter};
use service::offer_service;
use service::ServiceError;

use super::auth::ServerState;
use super::ApiResult;

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct AddressQuery {
    pub address: String,
    #[serde(default)]
    pub radius_km: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct ClinicScopeQuery {
    #[serde(default)]
    pub clinic_id: Option<Uuid>,
}

pub async fn clinics(
    State(state): State<ServerState>,
    Query(filter): Query<ClinicFilter>,
    Query(page): Query<Pagination>,
) -> ApiResult<Paged<clinic::Model>> {
    let filter = ClinicFilter { approved: Some(true), ..filter };
    Ok(Json(clinic_service::list_clinics(&state.db, filter, page).await?))
}

pub async fn clinic(State(state): State<ServerState>, Path(id): Path<Uuid>) -> ApiResult<clinic::Model> {
    let found = clinic_service::get_clinic(&state.db, id).await?;
    if !found.approved {
        return Err(ServiceError::not_found("clinic").into());
    }
    Ok(Json(found))
}

#[utoipa::path(
    get, path = "/api/public/clinics/nearby", tag = "public",
    params(("lat" = f64, Query, description = "Latitude"), ("lng" = f64, Query, description = "Longitude"), ("radius_km" = Option<f64>, Query, description = "Radius, default 10, max 100")),
    responses((status = 200, description = "Clinics ordered by distance"), (status = 400, description = "Validation Error"))
)]
pub async fn nearby_clinics(State(state): State<ServerState>, Query(q): Query<NearbyQuery>) -> ApiResult<Vec<Nearby<clinic::Model>>> {
    Ok(Json(clinic_service::nearby_clinics(&state.db, q).await?))
}

#[utoipa::path(
    get, path = "/api/public/clinics/search", tag = "public",
    params(AddressQuery),
    responses((status = 200, description = "Geocoded search"), (status = 404, description = "Address not found"), (status = 502, description = "Geocoder unavailable"))
)]
pub async fn search_clinics(State(state): State<ServerState>, Query(q): Query<AddressQuery>) -> ApiResult<AddressSearch> {
    let found = clinic_service::search_by_address(&state.db, state.integrations.geocoder.as_ref(), &q.address, q.radius_km).await?;
    Ok(Json(found))
}

pub async fn doctors(
    State(state): State<ServerState>,
    Query(filter): Query<DoctorFilter>,
    Query(page): Query<Pagination>,
) -> ApiResult<Paged<doctor_profile::Model>> {
    let filter = DoctorFilter { approved: Some(true), ..filter };
    Ok(Json(doctor_service::list_doctors(&state.db, filter, page).await?))
}

pub async fn nearby_doctors(State(state): State<ServerState>, Query(q): Query<NearbyQuery>) -> ApiResult<Vec<Nearby<doctor_profile::Model>>> {
    Ok(Json(doctor_service::nearby_doctors(&state.db, q).await?))
}

pub async fn blogs(
    State(state): State<ServerState>,
    Query(filter): Query<BlogFilter>,
    Query(page): Query<Pagination>,
) -> ApiResult<Paged<blog::Model>> {
    let filter = BlogFilter { status: Some(blog::STATUS_PUBLISHED.into()), ..filter };
    Ok(Json(blog_service::list_blogs(&state.db, filter, page).await?))
}

pub async fn blog_by_slug(State(state): State<ServerState>, Path(slug): Path<String>) -> ApiResult<blog::Model> {
    let found = blog_service::get_blog_by_slug(&state.db, &slug).await?;
    if found.status != blog::STATUS_PUBLISHED {
        return Err(ServiceError::not_found("blog").into());
    }
    Ok(Json(found))
}

pub async fn jobs(
    State(state): State<ServerState>,
    Query(filter): Query<JobFilter>,
    Query(page): Query<Pagination>,
) -> ApiResult<Paged<job_posting::Model>> {
    Ok(Json(job_service::list_open_jobs(&state.db, filter, page).await?))
}

pub async fn offers(
    State(state): State<ServerState>,
    Query(q): Query<ClinicScopeQuery>,
    Query(page): Query<Pagination>,
) -> ApiResult<Paged<offer::Model>> {
    Ok(Json(offer_service::list_live_offers(&state.db, q.clinic_id, page).await?))
}

#[utoipa::path(
    post, path = "/api/public/get-in-touch", tag = "public",
    request_body = crate::openapi::ContactRequest,
    responses((status = 200, description = "Submitted"), (status = 400, description = "Validation Error"))
)]
pub async fn get_in_touch(State(state): State<ServerState>, Json(input): Json<ContactInput>) -> ApiResult<get_in_touch::Model> {
    Ok(Json(contact_service::submit(&state.db, input).await?))
}
