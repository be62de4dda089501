use axum_extra::extract::cookie::Key;
use time::Duration;

use crate::oauth::ProviderClient;

/// Shared auth settings used by both config and runtime state.
#[derive(Clone)]
pub(crate) struct AuthSettings {
    pub(crate) cookie_key: Key,
    pub(crate) session_cookie_name: String,
    pub(crate) session_max_age: Duration,
    pub(crate) secure_cookies: bool,
    pub(crate) auth_path: String,
}

impl AuthSettings {
    fn defaults() -> Self {
        Self {
            cookie_key: Key::generate(),
            session_cookie_name: "session".into(),
            session_max_age: Duration::seconds(86_400),
            secure_cookies: false,
            auth_path: "/api/v1/auth".into(),
        }
    }
}

/// Authentication configuration.
///
/// Required field (`client`) is a constructor parameter; no runtime "missing field" errors.
///
/// Use [`AppConfig::from_env()`](crate::AppConfig::from_env) for convention-based setup,
/// or [`new()`](AuthConfig::new) with `with_*` methods for full control.
pub struct AuthConfig {
    pub(super) client: ProviderClient,
    pub(super) settings: AuthSettings,
}

impl AuthConfig {
    /// Create config with the required `ProviderClient`.
    ///
    /// All optional fields use sensible defaults. Override with `with_*` methods.
    /// The default cookie key is ephemeral: sessions do not survive a restart.
    #[must_use]
    pub fn new(client: ProviderClient) -> Self {
        Self {
            client,
            settings: AuthSettings::defaults(),
        }
    }

    /// Key that signs the session cookie.
    #[must_use]
    pub fn with_cookie_key(mut self, key: Key) -> Self {
        self.settings.cookie_key = key;
        self
    }

    #[must_use]
    pub fn with_session_cookie_name(mut self, name: impl Into<String>) -> Self {
        self.settings.session_cookie_name = name.into();
        self
    }

    /// Cookie `Max-Age`; pair it with the session store's own expiry.
    #[must_use]
    pub fn with_session_max_age(mut self, max_age: Duration) -> Self {
        self.settings.session_max_age = max_age;
        self
    }

    #[must_use]
    pub fn with_secure_cookies(mut self, secure: bool) -> Self {
        self.settings.secure_cookies = secure;
        self
    }

    /// Prefix for `/login`, `/callback`, `/logout` and `/me`.
    #[must_use]
    pub fn with_auth_path(mut self, path: impl Into<String>) -> Self {
        self.settings.auth_path = path.into();
        self
    }

    #[must_use]
    pub fn session_max_age(&self) -> Duration {
        self.settings.session_max_age
    }

    #[must_use]
    pub fn auth_path(&self) -> &str {
        &self.settings.auth_path
    }

    #[cfg(test)]
    pub(crate) fn client(&self) -> &ProviderClient {
        &self.client
    }
}
