//! Plug-and-play Google sign-in routes for Axum.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use google_session_auth::middleware::{AuthConfig, auth_routes};
//! use google_session_auth::{MemorySessionStore, OAuthConfig, ProviderClient};
//!
//! // 1. Point the client at your OAuth app
//! let client = ProviderClient::new(OAuthConfig::new(id, secret, redirect_uri))?;
//! let config = AuthConfig::new(client).with_cookie_key(key);
//!
//! // 2. Pick a session store (or implement SessionStore for your own backend)
//! let store = MemorySessionStore::new(config.session_max_age());
//!
//! // 3. Mount auth routes
//! let app = axum::Router::new().merge(auth_routes(config, store));
//! ```

mod config;
mod cookies;
mod routes;
mod state;

pub use config::AuthConfig;
pub use routes::auth_routes;

/// Re-export cookie key type for builder API.
pub use axum_extra::extract::cookie::Key as CookieKey;
