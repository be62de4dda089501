use std::sync::Arc;

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::{StatusCode, header::LOCATION};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use axum_extra::extract::SignedCookieJar;
use serde_json::{Value, json};
use tower_http::catch_panic::CatchPanicLayer;

use super::config::AuthConfig;
use super::state::AuthState;
use crate::flow::{self, AuthError, AuthFlowController, CallbackParams};
use crate::session::SessionStore;
use crate::types::UserProfile;

/// Create the authentication router.
pub fn auth_routes<S>(config: AuthConfig, session_store: S) -> Router
where
    S: SessionStore,
{
    let auth_path = config.settings.auth_path.clone();

    let state = AuthState {
        controller: Arc::new(AuthFlowController::new(config.client)),
        session_store: Arc::new(session_store),
        settings: config.settings,
    };

    Router::new()
        .route(&format!("{auth_path}/login"), get(login::<S>))
        .route(&format!("{auth_path}/callback"), get(callback::<S>))
        .route(
            &format!("{auth_path}/logout"),
            get(logout::<S>).post(logout::<S>),
        )
        .route(&format!("{auth_path}/me"), get(me::<S>))
        .layer(CatchPanicLayer::custom(flow::panic_response))
        .with_state(state)
}

// ── Login ──────────────────────────────────────────────────────────

async fn login<S: SessionStore>(
    State(state): State<AuthState<S>>,
    jar: SignedCookieJar,
) -> Result<Response, AuthError> {
    let session = state.resume(&jar);
    let url = state.controller.initiate(&session).await?;
    let jar = state.bind(jar, &session);

    Ok((StatusCode::FOUND, jar, [(LOCATION, url.to_string())]).into_response())
}

// ── Callback ───────────────────────────────────────────────────────

async fn callback<S: SessionStore>(
    State(state): State<AuthState<S>>,
    jar: SignedCookieJar,
    query: Result<Query<CallbackParams>, QueryRejection>,
) -> Result<(SignedCookieJar, Json<Value>), AuthError> {
    // an unreadable query still goes through the gates, as a callback without state
    let params = query.map(|Query(params)| params).unwrap_or_else(|rejection| {
        tracing::warn!(error = %rejection.body_text(), "Malformed callback query");
        CallbackParams::default()
    });

    let session = state.resume(&jar);
    let (session, user) = state.controller.callback(&session, params).await?;
    let jar = state.bind(jar, &session);

    Ok((
        jar,
        Json(json!({
            "message": "Authentication successful",
            "user": user,
        })),
    ))
}

// ── Logout ─────────────────────────────────────────────────────────

async fn logout<S: SessionStore>(
    State(state): State<AuthState<S>>,
    jar: SignedCookieJar,
) -> Result<Json<Value>, AuthError> {
    let session = state.resume(&jar);
    state.controller.logout(&session).await?;

    Ok(Json(json!({ "message": "Logged out successfully" })))
}

// ── Me ─────────────────────────────────────────────────────────────

async fn me<S: SessionStore>(
    State(state): State<AuthState<S>>,
    jar: SignedCookieJar,
) -> Result<Json<UserProfile>, AuthError> {
    let session = state.resume(&jar);
    state.controller.current_user(&session).await.map(Json)
}
