//! The complete service: auth routes plus liveness endpoints, CORS and tracing.

use axum::body::Body;
use axum::http::{HeaderValue, Request};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use tower_http::cors::{AllowHeaders, AllowMethods, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::Span;

use crate::config::{AppConfig, ServerSettings};
use crate::middleware::auth_routes;
use crate::session::SessionStore;

/// Build the full application router.
pub fn build_app<S: SessionStore>(config: AppConfig, session_store: S) -> Router {
    let cors = cors_layer(&config.server);

    Router::new()
        .merge(service_routes(&config.server))
        .merge(auth_routes(config.auth, session_store))
        .layer(cors)
        .layer(TraceLayer::new_for_http().make_span_with(request_span))
}

/// Request span without the query string, which carries the authorization code.
fn request_span(request: &Request<Body>) -> Span {
    tracing::debug_span!(
        "request",
        method = %request.method(),
        path = %request.uri().path(),
        version = ?request.version(),
    )
}

fn service_routes(server: &ServerSettings) -> Router {
    let root = json!({ "message": server.project_name, "status": "healthy" });
    let health = json!({ "status": "healthy", "version": server.version });

    Router::new()
        .route("/", get(move || async move { Json(root) }))
        .route("/health", get(move || async move { Json(health) }))
}

/// Credentialed CORS for the configured browser origins.
fn cors_layer(server: &ServerSettings) -> CorsLayer {
    let origins: Vec<HeaderValue> = server
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_credentials(true)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
}
