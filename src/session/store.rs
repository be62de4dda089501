use std::future::Future;

use serde_json::Value;

use crate::types::SessionId;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Consumer-provided session persistence.
///
/// Every operation is scoped to one session and one key. Implementations must
/// make each single-key write atomic; nothing more is required of them.
///
/// # Example
///
/// ```rust,ignore
/// impl SessionStore for RedisSessions {
///     async fn load(&self, id: &SessionId, key: &str) -> Result<Option<Value>, BoxError> {
///         let raw: Option<String> = self.conn().hget(id.as_str(), key).await?;
///         Ok(raw.map(|s| serde_json::from_str(&s)).transpose()?)
///     }
///     // ...
/// }
/// ```
pub trait SessionStore: Send + Sync + 'static {
    /// Read one value from a session.
    fn load(
        &self,
        id: &SessionId,
        key: &str,
    ) -> impl Future<Output = Result<Option<Value>, BoxError>> + Send;

    /// Write one value, replacing whatever was stored under `key`.
    fn store(
        &self,
        id: &SessionId,
        key: &str,
        value: Value,
    ) -> impl Future<Output = Result<(), BoxError>> + Send;

    /// Delete one value and return what was there.
    ///
    /// Deleting an absent key is not an error.
    fn remove(
        &self,
        id: &SessionId,
        key: &str,
    ) -> impl Future<Output = Result<Option<Value>, BoxError>> + Send;
}
