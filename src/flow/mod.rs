//! The authorization code exchange, as a sequence of gates over one session.

mod error;

use std::fmt;

use serde::Deserialize;
use url::Url;

pub use error::{AuthError, ProtocolError};
pub(crate) use error::panic_response;

use crate::oauth::ProviderClient;
use crate::session::{CURRENT_USER_KEY, PENDING_LOGIN_KEY, Session, SessionStore};
use crate::state;
use crate::types::UserProfile;

/// Query parameters of the provider's redirect back to us.
#[derive(Default, Deserialize)]
pub struct CallbackParams {
    pub state: Option<String>,
    pub code: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

impl fmt::Debug for CallbackParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackParams")
            .field("state", &self.state)
            .field("code", &self.code.as_ref().map(|_| "[REDACTED]"))
            .field("error", &self.error)
            .field("error_description", &self.error_description)
            .finish()
    }
}

/// Drives login, callback, and logout against the current request's session.
///
/// Holds no per-request state; one controller serves every request.
pub struct AuthFlowController {
    client: ProviderClient,
}

impl AuthFlowController {
    #[must_use]
    pub fn new(client: ProviderClient) -> Self {
        Self { client }
    }

    /// Start a login attempt and return the provider URL to redirect to.
    ///
    /// Replaces any login attempt already pending in this session.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Session`] if the state cannot be stored.
    pub async fn initiate<S: SessionStore>(
        &self,
        session: &Session<S>,
    ) -> Result<Url, AuthError> {
        let state = state::generate_state();
        let url = self.client.authorization_url(&state);

        session.insert(PENDING_LOGIN_KEY, &state).await?;

        tracing::info!(session_id = %session.id(), "OAuth2 login initiated");
        Ok(url)
    }

    /// Complete a login attempt from the provider redirect.
    ///
    /// The pending state is consumed before anything is checked, so every
    /// outcome, success or not, leaves no pending state behind and a replayed
    /// callback fails the state gate.
    ///
    /// On success the user is committed to a renewed session, which is
    /// returned with the profile. The old session id is left signed out.
    ///
    /// # Errors
    ///
    /// - [`AuthError::Protocol`] for a missing or mismatched state, or a missing code.
    /// - [`AuthError::Upstream`] if token exchange or userinfo fails.
    /// - [`AuthError::Session`] if the session store fails.
    pub async fn callback<S: SessionStore>(
        &self,
        session: &Session<S>,
        params: CallbackParams,
    ) -> Result<(Session<S>, UserProfile), AuthError> {
        let pending = session.take::<String>(PENDING_LOGIN_KEY).await?;

        let (Some(received), Some(expected)) = (params.state.as_deref(), pending.as_deref())
        else {
            tracing::warn!(
                session_id = %session.id(),
                has_query_state = params.state.is_some(),
                has_pending_state = pending.is_some(),
                "OAuth callback rejected: missing state"
            );
            return Err(ProtocolError::MissingState.into());
        };

        if received != expected {
            tracing::warn!(session_id = %session.id(), "OAuth callback rejected: state mismatch");
            return Err(ProtocolError::StateMismatch.into());
        }

        let Some(code) = params.code.as_deref() else {
            match &params.error {
                Some(error) => {
                    let desc = params.error_description.as_deref().unwrap_or("none");
                    tracing::warn!(error = %error, description = %desc, "OAuth2 error from provider");
                }
                None => tracing::warn!("OAuth callback rejected: missing code"),
            }
            return Err(ProtocolError::MissingCode.into());
        };

        let token = self.client.exchange_code(code).await.map_err(|e| {
            tracing::error!(
                error = %e,
                detail = e.detail().unwrap_or_default(),
                "Token exchange failed"
            );
            AuthError::Upstream(e)
        })?;

        let user_info = self
            .client
            .get_user_info(&token.access_token)
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    detail = e.detail().unwrap_or_default(),
                    "Userinfo request failed"
                );
                AuthError::Upstream(e)
            })?;

        let profile = UserProfile::from(user_info);
        let renewed = session.renewed();
        renewed.insert(CURRENT_USER_KEY, &profile).await?;
        session.remove(CURRENT_USER_KEY).await?;

        tracing::info!(
            session_id = %renewed.id(),
            previous_session_id = %session.id(),
            subject = %profile.google_id,
            "OAuth2 login successful"
        );
        Ok((renewed, profile))
    }

    /// The signed-in user.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::NotAuthenticated`] if nobody is signed in.
    pub async fn current_user<S: SessionStore>(
        &self,
        session: &Session<S>,
    ) -> Result<UserProfile, AuthError> {
        session
            .get::<UserProfile>(CURRENT_USER_KEY)
            .await?
            .ok_or(AuthError::NotAuthenticated)
    }

    /// Forget the signed-in user, if any.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Session`] if the session store fails.
    pub async fn logout<S: SessionStore>(&self, session: &Session<S>) -> Result<(), AuthError> {
        session.remove(CURRENT_USER_KEY).await?;
        tracing::info!(session_id = %session.id(), "Logged out");
        Ok(())
    }
}
