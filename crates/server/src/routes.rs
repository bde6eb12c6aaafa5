pub mod auth;
pub mod public;
pub mod users;
pub mod clinics;
pub mod doctors;
pub mod blogs;
pub mod jobs;
pub mod leads;
pub mod treatments;
pub mod patients;
pub mod memberships;
pub mod petty_cash;
pub mod offers;
pub mod vendors;
pub mod contacts;
pub mod permissions;
pub mod uploads;

use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::routing::{delete, get, post, put};
use axum::{middleware, Json, Router};
use tower_http::{
    cors::CorsLayer,
    services::ServeDir,
    trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use common::types::Health;
use service::integrations::media::LOCAL_PUBLIC_PREFIX;

use crate::errors::JsonApiError;
use crate::metrics;
use crate::openapi::ApiDoc;
use auth::ServerState;

pub type ApiResult<T> = Result<Json<T>, JsonApiError>;

#[utoipa::path(get, path = "/health", tag = "health", responses((status = 200, description = "OK", body = crate::openapi::HealthResponse)))]
pub async fn health() -> Json<Health> {
    Json(Health { status: "ok" })
}

async fn fallback() -> JsonApiError {
    JsonApiError::new(StatusCode::NOT_FOUND, "Not Found", None)
}

fn public_routes() -> Router<ServerState> {
    Router::new()
        .route("/api/public/clinics", get(public::clinics))
        .route("/api/public/clinics/nearby", get(public::nearby_clinics))
        .route("/api/public/clinics/search", get(public::search_clinics))
        .route("/api/public/clinics/:id", get(public::clinic))
        .route("/api/public/doctors", get(public::doctors))
        .route("/api/public/doctors/nearby", get(public::nearby_doctors))
        .route("/api/public/blogs", get(public::blogs))
        .route("/api/public/blogs/:slug", get(public::blog_by_slug))
        .route("/api/public/jobs", get(public::jobs))
        .route("/api/public/offers", get(public::offers))
        .route("/api/public/get-in-touch", post(public::get_in_touch))
}

fn api_routes(upload_limit: usize) -> Router<ServerState> {
    Router::new()
        .route("/api/users", get(users::list).post(users::create))
        .route("/api/users/:id", get(users::get).put(users::update).delete(users::delete))
        .route("/api/clinics", get(clinics::list).post(clinics::create))
        .route("/api/clinics/:id", get(clinics::get).put(clinics::update).delete(clinics::delete))
        .route("/api/clinics/:id/approval", put(clinics::approve))
        .route("/api/doctors", get(doctors::list).post(doctors::create))
        .route("/api/doctors/:id", get(doctors::get).put(doctors::update).delete(doctors::delete))
        .route("/api/doctors/:id/approval", put(doctors::approve))
        .route("/api/blogs", get(blogs::list).post(blogs::create))
        .route("/api/blogs/:id", get(blogs::get).put(blogs::update).delete(blogs::delete))
        .route("/api/blogs/:id/publish", put(blogs::publish))
        .route("/api/blogs/:id/comments", post(blogs::add_comment))
        .route("/api/blogs/:id/comments/:comment_id", delete(blogs::delete_comment))
        .route("/api/blogs/:id/comments/:comment_id/replies", post(blogs::add_reply))
        .route("/api/blogs/:id/like", post(blogs::toggle_like))
        .route("/api/jobs", get(jobs::list).post(jobs::create))
        .route("/api/jobs/:id", get(jobs::get).put(jobs::update).delete(jobs::delete))
        .route("/api/jobs/:id/status", put(jobs::set_status))
        .route("/api/leads", get(leads::list).post(leads::create))
        .route("/api/leads/:id", get(leads::get).put(leads::update).delete(leads::delete))
        .route("/api/leads/:id/status", put(leads::set_status))
        .route("/api/leads/:id/assign", put(leads::assign))
        .route("/api/leads/:id/follow-ups", post(leads::add_follow_up))
        .route("/api/treatments", get(treatments::list).post(treatments::create))
        .route("/api/treatments/:id", get(treatments::get).put(treatments::update).delete(treatments::delete))
        .route("/api/treatments/:id/sub-categories", post(treatments::add_sub_category))
        .route("/api/treatments/:id/sub-categories/:slug", delete(treatments::remove_sub_category))
        .route("/api/patients", get(patients::list).post(patients::create))
        .route("/api/patients/:id", get(patients::get).put(patients::update).delete(patients::delete))
        .route("/api/patients/:id/payments", post(patients::record_payment))
        .route("/api/memberships", get(memberships::list).post(memberships::create))
        .route("/api/memberships/:id", get(memberships::get).put(memberships::update).delete(memberships::delete))
        .route("/api/memberships/:id/treatments", post(memberships::consume))
        .route("/api/petty-cash", get(petty_cash::list).post(petty_cash::create))
        .route("/api/petty-cash/summary", get(petty_cash::summary))
        .route("/api/petty-cash/:id", get(petty_cash::get).delete(petty_cash::delete))
        .route("/api/petty-cash/:id/allocations", post(petty_cash::add_allocation))
        .route("/api/petty-cash/:id/expenses", post(petty_cash::add_expense))
        .route("/api/petty-cash/:id/expenses/:index", delete(petty_cash::remove_expense))
        .route("/api/offers", get(offers::list).post(offers::create))
        .route("/api/offers/:id", get(offers::get).put(offers::update).delete(offers::delete))
        .route("/api/vendors", get(vendors::list).post(vendors::create))
        .route("/api/vendors/:id", get(vendors::get).put(vendors::update).delete(vendors::delete))
        .route("/api/get-in-touch", get(contacts::list))
        .route("/api/get-in-touch/:id", delete(contacts::delete))
        .route("/api/get-in-touch/:id/responded", put(contacts::mark_responded))
        .route("/api/permissions/clinic/:role", get(permissions::get_role).put(permissions::put_role))
        .route("/api/permissions/agents/:agent_id", get(permissions::get_agent).put(permissions::put_agent))
        .route("/api/permissions/sidebar", get(permissions::sidebar))
        .route(
            "/api/uploads",
            post(uploads::upload).layer(DefaultBodyLimit::max(upload_limit.saturating_add(64 * 1024))),
        )
}

/// Full application router: public, authenticated and documentation routes.
pub fn build_router(state: ServerState, cors: CorsLayer) -> Router {
    let uploads = ServeDir::new(&state.uploads.dir);
    let upload_limit = state.uploads.max_bytes;

    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics::metrics_handler))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/me", get(auth::me))
        .merge(public_routes())
        .merge(api_routes(upload_limit))
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .nest_service(LOCAL_PUBLIC_PREFIX, uploads)
        .fallback(fallback)
        .layer(middleware::from_fn_with_state(state.clone(), auth::require_bearer_token_state))
        .layer(middleware::from_fn_with_state(state.clone(), metrics::track_metrics))
        .with_state(state)
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO).include_headers(false))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO).include_headers(false))
                .on_failure(DefaultOnFailure::new().level(Level::ERROR)),
        )
}
