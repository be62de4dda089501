use std::collections::HashMap;

use axum::Router;
use axum::body::Body;
use axum::http::header::{COOKIE, LOCATION, SET_COOKIE};
use axum::http::{Request, Response, StatusCode};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;
use url::Url;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use google_session_auth::{AppConfig, MemorySessionStore, SessionId, SessionStore, build_app};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A session store whose backend is down.
struct UnavailableStore;

impl SessionStore for UnavailableStore {
    async fn load(&self, _: &SessionId, _: &str) -> Result<Option<Value>, BoxError> {
        Err("session backend unavailable".into())
    }

    async fn store(&self, _: &SessionId, _: &str, _: Value) -> Result<(), BoxError> {
        Err("session backend unavailable".into())
    }

    async fn remove(&self, _: &SessionId, _: &str) -> Result<Option<Value>, BoxError> {
        Err("session backend unavailable".into())
    }
}

fn config(server: &MockServer, extra: &[(&'static str, &str)]) -> AppConfig {
    let mut vars: HashMap<&'static str, String> = HashMap::from([
        ("GOOGLE_CLIENT_ID", "test-client".to_string()),
        ("GOOGLE_CLIENT_SECRET", "test-secret".to_string()),
        ("SESSION_SECRET", "s".repeat(64)),
        ("OAUTH_TOKEN_URL", format!("{}/token", server.uri())),
        ("OAUTH_USERINFO_URL", format!("{}/userinfo", server.uri())),
        ("PROJECT_NAME", "Test App".to_string()),
        ("VERSION", "9.9.9".to_string()),
    ]);
    for (k, v) in extra {
        vars.insert(*k, v.to_string());
    }
    AppConfig::from_vars(|key| vars.get(key).cloned()).unwrap()
}

fn app(server: &MockServer, extra: &[(&'static str, &str)]) -> Router {
    let config = config(server, extra);
    let store = MemorySessionStore::new(config.auth.session_max_age());
    build_app(config, store)
}

async fn get(app: &Router, uri: &str, cookie: Option<&str>) -> Response<Body> {
    let mut request = Request::builder().uri(uri);
    if let Some(cookie) = cookie {
        request = request.header(COOKIE, cookie);
    }
    app.clone()
        .oneshot(request.body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn json_body(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// `name=value` of the session cookie, ready to send back.
fn session_cookie(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with("session="))
        .map(|v| v.split(';').next().unwrap_or_default().to_string())
}

fn set_cookie_header(response: &Response<Body>) -> String {
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with("session="))
        .unwrap()
        .to_string()
}

async fn login(app: &Router) -> (String, String) {
    let response = get(app, "/api/v1/auth/login", None).await;
    assert_eq!(response.status(), StatusCode::FOUND);

    let cookie = session_cookie(&response).expect("session cookie set at login");
    let location: Url = response.headers()[LOCATION].to_str().unwrap().parse().unwrap();
    let state = location
        .query_pairs()
        .find(|(k, _)| k == "state")
        .map(|(_, v)| v.into_owned())
        .unwrap();
    (cookie, state)
}

async fn mount_provider(server: &MockServer, expected_calls: u64) {
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("code=XYZ"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access_token": "T1"})))
        .expect(expected_calls)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/userinfo"))
        .and(header("authorization", "Bearer T1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "sub": "42",
            "email": "a@b.com",
            "name": "A"
        })))
        .expect(expected_calls)
        .mount(server)
        .await;
}

#[tokio::test]
async fn login_redirects_to_account_chooser() {
    let server = MockServer::start().await;
    let app = app(&server, &[]);

    let response = get(&app, "/api/v1/auth/login", None).await;

    assert_eq!(response.status(), StatusCode::FOUND);
    let location: Url = response.headers()[LOCATION].to_str().unwrap().parse().unwrap();
    let params: HashMap<String, String> = location.query_pairs().into_owned().collect();
    assert_eq!(location.host_str(), Some("accounts.google.com"));
    assert_eq!(params["prompt"], "select_account");
    assert_eq!(params["client_id"], "test-client");
    assert_eq!(
        params["redirect_uri"],
        "http://127.0.0.1:8000/api/v1/auth/callback"
    );

    let set_cookie = set_cookie_header(&response);
    assert!(set_cookie.contains("HttpOnly"));
    assert!(set_cookie.contains("SameSite=Lax"));
    assert!(set_cookie.contains("Max-Age=86400"));
    assert!(!set_cookie.contains("Secure"));
}

#[tokio::test]
async fn production_cookies_are_secure() {
    let server = MockServer::start().await;
    let app = app(&server, &[("ENVIRONMENT", "production")]);

    let response = get(&app, "/api/v1/auth/login", None).await;

    assert!(set_cookie_header(&response).contains("Secure"));
}

#[tokio::test]
async fn full_login_flow() {
    let server = MockServer::start().await;
    mount_provider(&server, 1).await;
    let app = app(&server, &[]);

    let (login_cookie, state) = login(&app).await;

    let response = get(
        &app,
        &format!("/api/v1/auth/callback?state={state}&code=XYZ"),
        Some(&login_cookie),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = session_cookie(&response).expect("session cookie renewed at callback");
    assert_ne!(cookie, login_cookie);
    let user = json!({"google_id": "42", "email": "a@b.com", "name": "A"});
    assert_eq!(
        json_body(response).await,
        json!({"message": "Authentication successful", "user": user})
    );

    let response = get(&app, "/api/v1/auth/me", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await, user);

    let response = get(&app, "/api/v1/auth/me", Some(&login_cookie)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = get(&app, "/api/v1/auth/logout", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        json_body(response).await,
        json!({"message": "Logged out successfully"})
    );

    let response = get(&app, "/api/v1/auth/me", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn replayed_callback_is_rejected() {
    let server = MockServer::start().await;
    mount_provider(&server, 1).await;
    let app = app(&server, &[]);
    let (cookie, state) = login(&app).await;
    let uri = format!("/api/v1/auth/callback?state={state}&code=XYZ");

    assert_eq!(get(&app, &uri, Some(&cookie)).await.status(), StatusCode::OK);

    let replay = get(&app, &uri, Some(&cookie)).await;
    assert_eq!(replay.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(replay).await,
        json!({"detail": "State verification failed"})
    );
}

#[tokio::test]
async fn malformed_callback_query_clears_pending_state() {
    let server = MockServer::start().await;
    mount_provider(&server, 0).await;
    let app = app(&server, &[]);
    let (cookie, state) = login(&app).await;

    let response = get(
        &app,
        &format!("/api/v1/auth/callback?state={state}&state=x&code=XYZ"),
        Some(&cookie),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(response).await,
        json!({"detail": "State verification failed"})
    );

    let retry = get(
        &app,
        &format!("/api/v1/auth/callback?state={state}&code=XYZ"),
        Some(&cookie),
    )
    .await;
    assert_eq!(retry.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(retry).await,
        json!({"detail": "State verification failed"})
    );
}

#[tokio::test]
async fn callback_from_another_browser_is_rejected() {
    let server = MockServer::start().await;
    mount_provider(&server, 0).await;
    let app = app(&server, &[]);
    let (_victim_cookie, state) = login(&app).await;
    let (attacker_cookie, _) = login(&app).await;

    let response = get(
        &app,
        &format!("/api/v1/auth/callback?state={state}&code=XYZ"),
        Some(&attacker_cookie),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn callback_without_cookie_is_rejected() {
    let server = MockServer::start().await;
    mount_provider(&server, 0).await;
    let app = app(&server, &[]);
    let (_, state) = login(&app).await;

    let response = get(
        &app,
        &format!("/api/v1/auth/callback?state={state}&code=XYZ"),
        None,
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn forged_cookie_is_ignored() {
    let server = MockServer::start().await;
    mount_provider(&server, 0).await;
    let app = app(&server, &[]);
    let (cookie, state) = login(&app).await;
    // keep the session id, drop the signature
    let (_, value) = cookie.split_once('=').unwrap();
    let forged = format!("session={}", &value[value.len().saturating_sub(26)..]);

    let response = get(
        &app,
        &format!("/api/v1/auth/callback?state={state}&code=XYZ"),
        Some(&forged),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn missing_code_is_rejected_without_exchange() {
    let server = MockServer::start().await;
    mount_provider(&server, 0).await;
    let app = app(&server, &[]);
    let (cookie, state) = login(&app).await;

    let response = get(
        &app,
        &format!("/api/v1/auth/callback?state={state}&error=access_denied"),
        Some(&cookie),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(response).await,
        json!({"detail": "No authorization code received"})
    );
}

#[tokio::test]
async fn token_exchange_error_is_not_echoed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "Malformed auth code."
        })))
        .expect(1)
        .mount(&server)
        .await;
    let app = app(&server, &[]);
    let (cookie, state) = login(&app).await;

    let response = get(
        &app,
        &format!("/api/v1/auth/callback?state={state}&code=XYZ"),
        Some(&cookie),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await.to_string();
    assert!(!body.contains("invalid_grant"));
    assert!(!body.contains("XYZ"));

    let me = get(&app, "/api/v1/auth/me", Some(&cookie)).await;
    assert_eq!(me.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn unreachable_provider_is_bad_gateway() {
    let server = MockServer::start().await;
    let app = app(
        &server,
        &[
            ("OAUTH_TOKEN_URL", "http://127.0.0.1:9/token"),
            ("OAUTH_USERINFO_URL", "http://127.0.0.1:9/userinfo"),
        ],
    );
    let (cookie, state) = login(&app).await;

    let response = get(
        &app,
        &format!("/api/v1/auth/callback?state={state}&code=XYZ"),
        Some(&cookie),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn me_without_session_is_unauthorized() {
    let server = MockServer::start().await;
    let app = app(&server, &[]);

    let response = get(&app, "/api/v1/auth/me", None).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(response).await, json!({"detail": "Not authenticated"}));
}

#[tokio::test]
async fn logout_without_session_succeeds() {
    let server = MockServer::start().await;
    let app = app(&server, &[]);

    let response = get(&app, "/api/v1/auth/logout", None).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(session_cookie(&response).is_none());
}

#[tokio::test]
async fn service_endpoints() {
    let server = MockServer::start().await;
    let app = app(&server, &[]);

    let root = json_body(get(&app, "/", None).await).await;
    assert_eq!(root, json!({"message": "Test App", "status": "healthy"}));

    let health = json_body(get(&app, "/health", None).await).await;
    assert_eq!(health, json!({"status": "healthy", "version": "9.9.9"}));
}

#[tokio::test]
async fn session_backend_failure_is_generic() {
    let server = MockServer::start().await;
    mount_provider(&server, 0).await;
    let app = build_app(config(&server, &[]), UnavailableStore);

    for uri in [
        "/api/v1/auth/login",
        "/api/v1/auth/callback?state=abc&code=XYZ",
        "/api/v1/auth/me",
        "/api/v1/auth/logout",
    ] {
        let response = get(&app, uri, None).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");
        assert!(session_cookie(&response).is_none(), "{uri}");
        let body = json_body(response).await;
        assert_eq!(
            body,
            json!({"detail": "Authentication failed. Please try again."}),
            "{uri}"
        );
    }
}
