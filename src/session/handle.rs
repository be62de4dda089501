use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;

use super::store::{BoxError, SessionStore};
use crate::types::SessionId;

/// Session store operation failed, or a stored value had an unexpected shape.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("session store error: {0}")]
    Store(#[source] BoxError),
    #[error("session value for `{key}` is malformed: {source}")]
    Malformed {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// The current request's session: a store plus the id from the session cookie.
///
/// All reads and writes go to the one session this handle was opened for.
pub struct Session<S> {
    id: SessionId,
    store: Arc<S>,
}

// Manual Clone: avoid derive adding an `S: Clone` bound.
impl<S> Clone for Session<S> {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            store: self.store.clone(),
        }
    }
}

impl<S> fmt::Debug for Session<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session").field("id", &self.id).finish_non_exhaustive()
    }
}

impl<S: SessionStore> Session<S> {
    #[must_use]
    pub fn new(id: SessionId, store: Arc<S>) -> Self {
        Self { id, store }
    }

    #[must_use]
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// A handle on a fresh, empty session in the same store.
    #[must_use]
    pub fn renewed(&self) -> Self {
        Self::new(SessionId::generate(), self.store.clone())
    }

    /// Read and decode the value under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] if the store fails or the value does not decode as `T`.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, SessionError> {
        let value = self
            .store
            .load(&self.id, key)
            .await
            .map_err(SessionError::Store)?;
        decode(key, value)
    }

    /// Encode and write `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] if encoding or the store fails.
    pub async fn insert<T: Serialize>(&self, key: &str, value: &T) -> Result<(), SessionError> {
        let value = serde_json::to_value(value).map_err(|source| SessionError::Malformed {
            key: key.to_owned(),
            source,
        })?;
        self.store
            .store(&self.id, key, value)
            .await
            .map_err(SessionError::Store)
    }

    /// Delete the value under `key` and return it decoded (read + delete).
    ///
    /// The value is gone from the session even if it fails to decode.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] if the store fails or the value does not decode as `T`.
    pub async fn take<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, SessionError> {
        let value = self
            .store
            .remove(&self.id, key)
            .await
            .map_err(SessionError::Store)?;
        decode(key, value)
    }

    /// Delete the value under `key`. Absent keys are fine.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Store`] if the store fails.
    pub async fn remove(&self, key: &str) -> Result<(), SessionError> {
        self.store
            .remove(&self.id, key)
            .await
            .map(|_| ())
            .map_err(SessionError::Store)
    }
}

fn decode<T: DeserializeOwned>(
    key: &str,
    value: Option<serde_json::Value>,
) -> Result<Option<T>, SessionError> {
    value
        .map(serde_json::from_value)
        .transpose()
        .map_err(|source| SessionError::Malformed {
            key: key.to_owned(),
            source,
        })
}
