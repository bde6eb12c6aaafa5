use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use sea_orm::DatabaseConnection;
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use configs::UploadsConfig;
use models::user::Role;
use server::metrics::Metrics;
use server::routes::{self, auth::ServerState};
use service::auth::domain::AuthUser;
use service::auth::repository::mock::MockAuthRepository;
use service::auth::repository::AuthRepository;
use service::auth::service::{AuthConfig, AuthService};
use service::integrations::Integrations;

struct Fixture {
    state: ServerState,
    accounts: Arc<MockAuthRepository>,
}

fn fixture() -> Fixture {
    let db = DatabaseConnection::Disconnected;
    let cfg = AuthConfig { jwt_secret: "test-secret".into(), token_ttl_hours: 1, password_algorithm: "argon2".into() };
    let uploads = UploadsConfig { dir: "target/test-uploads".into(), max_bytes: 1024 };
    let accounts = Arc::new(MockAuthRepository::default());
    let repo: Arc<dyn AuthRepository> = accounts.clone();
    let state = ServerState {
        auth: Arc::new(AuthService::new(repo, cfg)),
        db,
        integrations: Integrations::offline(&uploads.dir),
        uploads,
        metrics: Arc::new(Metrics::new().unwrap()),
    };
    Fixture { state, accounts }
}

fn state() -> ServerState {
    fixture().state
}

fn app(state: ServerState) -> Router {
    routes::build_router(state, tower_http::cors::CorsLayer::very_permissive())
}

fn token_for(fx: &Fixture, role: Role) -> String {
    let user = AuthUser {
        id: Uuid::new_v4(),
        email: format!("{}@example.com", role.as_str()),
        name: "Caller".into(),
        role,
        clinic_id: None,
        phone: None,
        active: true,
    };
    fx.accounts.insert(user.clone());
    fx.state.auth.issue_token(&user).unwrap()
}

fn multipart_file(content_type: &str, data: &[u8]) -> (String, Vec<u8>) {
    let boundary = "clinic-upload-boundary";
    let mut body = format!(
        "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"scan.bin\"\r\nContent-Type: {content_type}\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    (format!("multipart/form-data; boundary={boundary}"), body)
}

async fn body_json(resp: axum::response::Response) -> Value {
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_is_public() {
    let resp = app(state()).oneshot(Request::get("/health").body(Body::empty()).unwrap()).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await["status"], "ok");
}

#[tokio::test]
async fn missing_token_is_bad_request() {
    let resp = app(state()).oneshot(Request::get("/api/leads").body(Body::empty()).unwrap()).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = body_json(resp).await;
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn invalid_token_is_unauthorized() {
    let req = Request::get("/auth/me").header(header::AUTHORIZATION, "Bearer not-a-jwt").body(Body::empty()).unwrap();
    let resp = app(state()).oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let req = Request::get("/auth/me").header(header::AUTHORIZATION, "Token abc").body(Body::empty()).unwrap();
    let resp = app(state()).oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn non_admin_cannot_read_contact_inbox() {
    let fx = fixture();
    let token = token_for(&fx, Role::User);
    let metrics = fx.state.metrics.clone();
    let req = Request::get("/api/get-in-touch").header(header::AUTHORIZATION, format!("Bearer {token}")).body(Body::empty()).unwrap();
    let resp = app(fx.state).oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert_eq!(metrics.permission_denied_total.get(), 1);
}

#[tokio::test]
async fn token_cookie_is_accepted() {
    let fx = fixture();
    let token = token_for(&fx, Role::User);
    let req = Request::get("/api/get-in-touch")
        .header(header::COOKIE, format!("auth_token={token}"))
        .body(Body::empty())
        .unwrap();
    let resp = app(fx.state).oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn disabled_account_token_is_refused() {
    let fx = fixture();
    let token = token_for(&fx, Role::Staff);
    fx.accounts.deactivate("staff@example.com");
    let req = Request::get("/api/leads").header(header::AUTHORIZATION, format!("Bearer {token}")).body(Body::empty()).unwrap();
    let resp = app(fx.state).oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn token_for_unknown_account_is_unauthorized() {
    let fx = fixture();
    let stranger = AuthUser {
        id: Uuid::new_v4(),
        email: "stranger@example.com".into(),
        name: "Stranger".into(),
        role: Role::Admin,
        clinic_id: None,
        phone: None,
        active: true,
    };
    let token = fx.state.auth.issue_token(&stranger).unwrap();
    let req = Request::get("/auth/me").header(header::AUTHORIZATION, format!("Bearer {token}")).body(Body::empty()).unwrap();
    let resp = app(fx.state).oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn metrics_count_requests() {
    let st = state();
    let router = app(st);
    let _ = router.clone().oneshot(Request::get("/health").body(Body::empty()).unwrap()).await.unwrap();
    let resp = router.oneshot(Request::get("/metrics").body(Body::empty()).unwrap()).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("http_requests_total"));
}

#[tokio::test]
async fn logout_clears_cookie() {
    let req = Request::post("/auth/logout").header(header::COOKIE, "auth_token=stale").body(Body::empty()).unwrap();
    let resp = app(state()).oneshot(req).await.unwrap();
    assert!(resp.status().is_success());
    let cookie = resp.headers().get(header::SET_COOKIE).and_then(|v| v.to_str().ok()).unwrap_or_default();
    assert!(cookie.starts_with("auth_token="));
}

#[tokio::test]
async fn openapi_document_is_served() {
    let resp = app(state()).oneshot(Request::get("/api-docs/openapi.json").body(Body::empty()).unwrap()).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let doc = body_json(resp).await;
    assert!(doc["paths"]["/health"].is_object());
}

#[tokio::test]
async fn oversized_upload_is_payload_too_large() {
    let fx = fixture();
    let token = token_for(&fx, Role::Staff);
    let (content_type, body) = multipart_file("image/png", &vec![0u8; fx.state.uploads.max_bytes + 128 * 1024]);
    let req = Request::post("/api/uploads")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(header::CONTENT_TYPE, content_type)
        .body(Body::from(body))
        .unwrap();
    let resp = app(fx.state).oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn svg_upload_is_unsupported() {
    let fx = fixture();
    let token = token_for(&fx, Role::Staff);
    let svg = br#"<svg xmlns="http://www.w3.org/2000/svg"><script>alert(1)</script></svg>"#;
    let (content_type, body) = multipart_file("image/svg+xml", svg);
    let req = Request::post("/api/uploads")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(header::CONTENT_TYPE, content_type)
        .body(Body::from(body))
        .unwrap();
    let resp = app(fx.state).oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
}
