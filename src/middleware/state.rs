use std::sync::Arc;

use axum::extract::FromRef;
use axum_extra::extract::SignedCookieJar;
use axum_extra::extract::cookie::Key;

use super::config::AuthSettings;
use super::cookies;
use crate::flow::AuthFlowController;
use crate::session::{Session, SessionStore};
use crate::types::SessionId;

/// Shared state for auth route handlers.
pub(super) struct AuthState<S> {
    pub(super) controller: Arc<AuthFlowController>,
    pub(super) session_store: Arc<S>,
    pub(super) settings: AuthSettings,
}

// Manual Clone: avoid derive adding an `S: Clone` bound.
impl<S> Clone for AuthState<S> {
    fn clone(&self) -> Self {
        Self {
            controller: self.controller.clone(),
            session_store: self.session_store.clone(),
            settings: self.settings.clone(),
        }
    }
}

// SignedCookieJar requires Key to be extractable from state
impl<S: SessionStore> FromRef<AuthState<S>> for Key {
    fn from_ref(state: &AuthState<S>) -> Self {
        state.settings.cookie_key.clone()
    }
}

impl<S: SessionStore> AuthState<S> {
    /// The session named by the request cookie.
    ///
    /// Without a valid cookie this is a fresh, empty session that is never
    /// announced to the browser: reads see nothing, deletes are no-ops.
    pub(super) fn resume(&self, jar: &SignedCookieJar) -> Session<S> {
        let id = cookies::get_session_id(jar, &self.settings.session_cookie_name)
            .unwrap_or_else(SessionId::generate);
        Session::new(id, self.session_store.clone())
    }

    /// Attach (or refresh) the session cookie for `session`.
    pub(super) fn bind(&self, jar: SignedCookieJar, session: &Session<S>) -> SignedCookieJar {
        jar.add(cookies::session_cookie(
            &self.settings.session_cookie_name,
            session.id(),
            self.settings.session_max_age,
            self.settings.secure_cookies,
        ))
    }
}
