use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{header, HeaderMap, Method, StatusCode};
use axum::middleware::Next;
use axum::response::Response;
use axum::{Extension, Json};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use sea_orm::DatabaseConnection;
use serde::Serialize;
use tracing::{info, warn};

use configs::UploadsConfig;
use service::auth::domain::{AuthUser, LoginInput, RegisterInput};
use service::auth::repository::AuthRepository;
use service::auth::AuthService;
use service::integrations::Integrations;
use service::Actor;

use crate::errors::JsonApiError;
use crate::metrics::Metrics;

pub const AUTH_COOKIE: &str = "auth_token";

#[derive(Clone)]
pub struct ServerState {
    pub db: DatabaseConnection,
    pub auth: Arc<AuthService<dyn AuthRepository>>,
    pub integrations: Integrations,
    pub uploads: UploadsConfig,
    pub metrics: Arc<Metrics>,
}

/// Authenticated caller, placed in request extensions by the bearer middleware.
#[derive(Clone, Debug)]
pub struct AuthContext {
    pub actor: Actor,
}

#[derive(Serialize)]
pub struct LoginOutput {
    pub user: AuthUser,
    pub token: String,
}

/// Routes reachable without a token.
pub fn is_public(method: &Method, path: &str) -> bool {
    if method == Method::OPTIONS {
        return true;
    }
    matches!(path, "/health" | "/metrics" | "/auth/login" | "/auth/register" | "/auth/logout")
        || path.starts_with("/docs")
        || path.starts_with("/api-docs")
        || path.starts_with("/api/public/")
        || path.starts_with("/uploads/")
}

pub(crate) fn session_cookie(token: String) -> Cookie<'static> {
    let mut cookie = Cookie::new(AUTH_COOKIE, token);
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookie.set_secure(false);
    cookie.set_same_site(SameSite::Lax);
    cookie
}

enum TokenSource {
    Missing,
    Malformed,
    Found(String),
}

/// `Authorization: Bearer <token>`, falling back to the `auth_token` cookie.
fn read_token(headers: &HeaderMap) -> TokenSource {
    if let Some(h) = headers.get(header::AUTHORIZATION) {
        return match h.to_str().ok().and_then(|v| v.strip_prefix("Bearer ")) {
            Some(t) if !t.trim().is_empty() => TokenSource::Found(t.trim().to_string()),
            _ => TokenSource::Malformed,
        };
    }
    match CookieJar::from_headers(headers).get(AUTH_COOKIE) {
        Some(c) if !c.value().is_empty() => TokenSource::Found(c.value().to_string()),
        _ => TokenSource::Missing,
    }
}

/// Bad or expired tokens answer 401, disabled accounts 403.
async fn actor_from(state: &ServerState, token: &str) -> Result<Actor, JsonApiError> {
    Ok(state.auth.authenticate(token).await?)
}

/// Missing token answers 400, an invalid or expired one 401, a disabled account 403.
pub async fn require_bearer_token_state(
    State(state): State<ServerState>,
    mut req: Request,
    next: Next,
) -> Result<Response, JsonApiError> {
    let path = req.uri().path().to_owned();
    if is_public(req.method(), &path) {
        return Ok(next.run(req).await);
    }
    let token = match read_token(req.headers()) {
        TokenSource::Found(t) => t,
        TokenSource::Malformed => {
            warn!(%path, "invalid Authorization format (expect Bearer)");
            return Err(JsonApiError::unauthorized("expected a Bearer token"));
        }
        TokenSource::Missing => {
            warn!(%path, "missing Authorization header and auth_token cookie");
            return Err(JsonApiError::bad_request("authentication token required"));
        }
    };
    let actor = actor_from(&state, &token).await.inspect_err(|_| warn!(%path, "token validation failed"))?;
    req.extensions_mut().insert(AuthContext { actor });
    Ok(next.run(req).await)
}

/// Open sign-up; a clinic owner's token on the request registers a member of that clinic.
#[utoipa::path(
    post, path = "/auth/register", tag = "auth",
    request_body = crate::openapi::RegisterRequest,
    responses(
        (status = 200, description = "Registered"),
        (status = 400, description = "Validation Error"),
        (status = 403, description = "Forbidden"),
        (status = 409, description = "Conflict")
    )
)]
pub async fn register(
    State(state): State<ServerState>,
    headers: HeaderMap,
    Json(input): Json<RegisterInput>,
) -> Result<Json<AuthUser>, JsonApiError> {
    let registrar = match read_token(&headers) {
        TokenSource::Found(t) => Some(actor_from(&state, &t).await?),
        _ => None,
    };
    let user = state.auth.register(input, registrar.as_ref()).await?;
    Ok(Json(user))
}

#[utoipa::path(
    post, path = "/auth/login", tag = "auth",
    request_body = crate::openapi::LoginRequest,
    responses((status = 200, description = "Logged In"), (status = 401, description = "Unauthorized"))
)]
pub async fn login(
    State(state): State<ServerState>,
    jar: CookieJar,
    Json(input): Json<LoginInput>,
) -> Result<(CookieJar, Json<LoginOutput>), JsonApiError> {
    let session = state.auth.login(input).await?;
    info!(user_id = %session.user.id, "login_succeeded");
    let jar = jar.add(session_cookie(session.token.clone()));
    Ok((jar, Json(LoginOutput { user: session.user, token: session.token })))
}

pub async fn logout(jar: CookieJar) -> (CookieJar, StatusCode) {
    let jar = jar.remove(Cookie::build(AUTH_COOKIE).path("/"));
    (jar, StatusCode::NO_CONTENT)
}

#[utoipa::path(get, path = "/auth/me", tag = "auth", responses((status = 200, description = "Profile"), (status = 401, description = "Unauthorized")))]
pub async fn me(State(state): State<ServerState>, Extension(ctx): Extension<AuthContext>) -> Result<Json<AuthUser>, JsonApiError> {
    Ok(Json(state.auth.me(ctx.actor.user_id).await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_paths_skip_auth() {
        assert!(is_public(&Method::GET, "/health"));
        assert!(is_public(&Method::GET, "/api/public/clinics/nearby"));
        assert!(is_public(&Method::POST, "/auth/login"));
        assert!(is_public(&Method::OPTIONS, "/api/leads"));
        assert!(!is_public(&Method::GET, "/api/leads"));
        assert!(!is_public(&Method::GET, "/auth/me"));
    }

    #[test]
    fn token_read_from_header_or_cookie() {
        let mut h = HeaderMap::new();
        assert!(matches!(read_token(&h), TokenSource::Missing));
        h.insert(header::COOKIE, "theme=dark; auth_token=abc".parse().unwrap());
        assert!(matches!(read_token(&h), TokenSource::Found(t) if t == "abc"));
        h.insert(header::AUTHORIZATION, "Token xyz".parse().unwrap());
        assert!(matches!(read_token(&h), TokenSource::Malformed));
        h.insert(header::AUTHORIZATION, "Bearer xyz".parse().unwrap());
        assert!(matches!(read_token(&h), TokenSource::Found(t) if t == "xyz"));
    }
}
