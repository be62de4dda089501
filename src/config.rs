use std::net::SocketAddr;

use axum_extra::extract::cookie::Key;
use time::Duration;
use url::Url;

use crate::middleware::AuthConfig;
use crate::oauth::{OAuthConfig, ProviderClient};

/// Missing or invalid configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} is required")]
    Missing(&'static str),
    #[error("{var}: {reason}")]
    Invalid { var: &'static str, reason: String },
    #[error(transparent)]
    Client(#[from] crate::Error),
}

/// Service-level settings that sit around the auth routes.
#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub project_name: String,
    pub version: String,
    pub environment: String,
    pub bind_addr: SocketAddr,
    pub cors_origins: Vec<String>,
}

impl ServerSettings {
    #[must_use]
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

/// Everything the service needs, built once at startup.
pub struct AppConfig {
    pub auth: AuthConfig,
    pub server: ServerSettings,
}

impl AppConfig {
    /// Create config from environment variables, after loading `.env` if present.
    ///
    /// # Required env vars
    /// - `GOOGLE_CLIENT_ID`: OAuth2 client ID
    /// - `GOOGLE_CLIENT_SECRET`: OAuth2 client secret
    /// - `SESSION_SECRET`: cookie signing key bytes (at least 64)
    ///
    /// # Optional env vars
    /// - `OAUTH_REDIRECT_URI`: callback URI (default `http://127.0.0.1:8000/api/v1/auth/callback`)
    /// - `SESSION_MAX_AGE`: session lifetime in seconds (default 86400)
    /// - `ENVIRONMENT`: `production` enables `Secure` cookies (default `development`)
    /// - `PROJECT_NAME`, `VERSION`: reported by `/` and `/health`
    /// - `BACKEND_CORS_ORIGINS`: comma-separated allowed origins
    /// - `BIND_ADDR`: listen address (default `127.0.0.1:8000`)
    /// - `OAUTH_AUTH_URL`, `OAUTH_TOKEN_URL`, `OAUTH_USERINFO_URL`: endpoint overrides
    /// - `OAUTH_SCOPES`: comma-separated scopes
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if required env vars are missing or values are invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Err(e) if !e.not_found() => {
                tracing::warn!(error = %e, "Ignoring unreadable .env file");
            }
            _ => {}
        }
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Create config from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if required variables are missing or values are invalid.
    pub fn from_vars<F>(var: F) -> Result<Self, ConfigError>
    where
        F: Fn(&'static str) -> Option<String>,
    {
        let required = |key: &'static str| var(key).ok_or(ConfigError::Missing(key));

        let client_id = required("GOOGLE_CLIENT_ID")?;
        let client_secret = required("GOOGLE_CLIENT_SECRET")?;
        let session_secret = required("SESSION_SECRET")?;
        let cookie_key = Key::try_from(session_secret.as_bytes()).map_err(|_| {
            ConfigError::Invalid {
                var: "SESSION_SECRET",
                reason: "must be at least 64 bytes".into(),
            }
        })?;

        let redirect_uri = parse_url(
            "OAUTH_REDIRECT_URI",
            &var("OAUTH_REDIRECT_URI")
                .unwrap_or_else(|| "http://127.0.0.1:8000/api/v1/auth/callback".into()),
        )?;

        let mut oauth = OAuthConfig::new(client_id, client_secret, redirect_uri);
        if let Some(url) = var("OAUTH_AUTH_URL") {
            oauth = oauth.with_auth_url(parse_url("OAUTH_AUTH_URL", &url)?);
        }
        if let Some(url) = var("OAUTH_TOKEN_URL") {
            oauth = oauth.with_token_url(parse_url("OAUTH_TOKEN_URL", &url)?);
        }
        if let Some(url) = var("OAUTH_USERINFO_URL") {
            oauth = oauth.with_userinfo_url(parse_url("OAUTH_USERINFO_URL", &url)?);
        }
        if let Some(scopes) = var("OAUTH_SCOPES") {
            oauth = oauth.with_scopes(split_list(&scopes));
        }

        let max_age = match var("SESSION_MAX_AGE") {
            Some(raw) => raw.trim().parse::<i64>().ok().filter(|s| *s > 0).ok_or_else(|| {
                ConfigError::Invalid {
                    var: "SESSION_MAX_AGE",
                    reason: format!("expected a positive number of seconds, got `{raw}`"),
                }
            })?,
            None => 86_400,
        };

        let bind_addr = var("BIND_ADDR")
            .unwrap_or_else(|| "127.0.0.1:8000".into())
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::Invalid {
                var: "BIND_ADDR",
                reason: e.to_string(),
            })?;

        let server = ServerSettings {
            project_name: var("PROJECT_NAME").unwrap_or_else(|| "Google Session Auth".into()),
            version: var("VERSION").unwrap_or_else(|| env!("CARGO_PKG_VERSION").into()),
            environment: var("ENVIRONMENT").unwrap_or_else(|| "development".into()),
            bind_addr,
            cors_origins: split_list(
                &var("BACKEND_CORS_ORIGINS")
                    .unwrap_or_else(|| "http://localhost:3000,http://127.0.0.1:3000".into()),
            ),
        };

        let auth = AuthConfig::new(ProviderClient::new(oauth)?)
            .with_cookie_key(cookie_key)
            .with_session_max_age(Duration::seconds(max_age))
            .with_secure_cookies(server.is_production());

        Ok(Self { auth, server })
    }
}

fn parse_url(var: &'static str, raw: &str) -> Result<Url, ConfigError> {
    raw.parse().map_err(|e: url::ParseError| ConfigError::Invalid {
        var,
        reason: e.to_string(),
    })
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
