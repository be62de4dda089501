use std::collections::HashMap;

use serde_json::Value;
use time::{Duration, OffsetDateTime};
use tokio::sync::RwLock;

use super::store::{BoxError, SessionStore};
use crate::types::SessionId;

struct Entry {
    values: HashMap<String, Value>,
    expires_at: OffsetDateTime,
}

impl Entry {
    fn is_expired(&self, now: OffsetDateTime) -> bool {
        self.expires_at <= now
    }
}

/// Upper bound on the time between two sweeps of expired sessions.
const SWEEP_INTERVAL: Duration = Duration::minutes(1);

struct Sessions {
    entries: HashMap<SessionId, Entry>,
    next_sweep: OffsetDateTime,
}

impl Sessions {
    fn sweep(&mut self, now: OffsetDateTime) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        before - self.entries.len()
    }
}

/// In-process [`SessionStore`] with sliding expiry.
///
/// Every write pushes the session's expiry out to `now + max_age`. Expired
/// sessions read as empty. They are dropped on their next access, by the
/// sweep that runs on writes at most once per `min(max_age, 1 minute)`, or
/// by [`purge_expired`].
///
/// [`purge_expired`]: MemorySessionStore::purge_expired
pub struct MemorySessionStore {
    sessions: RwLock<Sessions>,
    max_age: Duration,
    sweep_every: Duration,
}

impl MemorySessionStore {
    #[must_use]
    pub fn new(max_age: Duration) -> Self {
        let sweep_every = max_age.min(SWEEP_INTERVAL);
        Self {
            sessions: RwLock::new(Sessions {
                entries: HashMap::new(),
                next_sweep: OffsetDateTime::now_utc() + sweep_every,
            }),
            max_age,
            sweep_every,
        }
    }

    /// Drop every expired session. Returns how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let now = OffsetDateTime::now_utc();
        let mut sessions = self.sessions.write().await;
        sessions.next_sweep = now + self.sweep_every;
        sessions.sweep(now)
    }

    /// Number of live sessions.
    pub async fn len(&self) -> usize {
        let now = OffsetDateTime::now_utc();
        self.sessions
            .read()
            .await
            .entries
            .values()
            .filter(|entry| !entry.is_expired(now))
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl SessionStore for MemorySessionStore {
    async fn load(&self, id: &SessionId, key: &str) -> Result<Option<Value>, BoxError> {
        let now = OffsetDateTime::now_utc();
        {
            let sessions = self.sessions.read().await;
            match sessions.entries.get(id) {
                None => return Ok(None),
                Some(entry) if !entry.is_expired(now) => {
                    return Ok(entry.values.get(key).cloned());
                }
                Some(_) => {}
            }
        }

        // expired: evict under the write lock, re-checking in case it was refreshed
        let mut sessions = self.sessions.write().await;
        if sessions.entries.get(id).is_some_and(|entry| entry.is_expired(now)) {
            sessions.entries.remove(id);
            tracing::debug!(session_id = %id, "Expired session evicted");
        }
        Ok(None)
    }

    async fn store(&self, id: &SessionId, key: &str, value: Value) -> Result<(), BoxError> {
        let now = OffsetDateTime::now_utc();
        let expires_at = now + self.max_age;
        let mut sessions = self.sessions.write().await;

        if sessions.next_sweep <= now {
            sessions.next_sweep = now + self.sweep_every;
            let purged = sessions.sweep(now);
            if purged > 0 {
                tracing::debug!(purged, "Expired sessions swept");
            }
        }

        let entry = sessions.entries.entry(id.clone()).or_insert_with(|| Entry {
            values: HashMap::new(),
            expires_at,
        });
        if entry.is_expired(now) {
            entry.values.clear();
        }
        entry.expires_at = expires_at;
        entry.values.insert(key.to_owned(), value);
        Ok(())
    }

    async fn remove(&self, id: &SessionId, key: &str) -> Result<Option<Value>, BoxError> {
        let now = OffsetDateTime::now_utc();
        let mut sessions = self.sessions.write().await;

        let Some(entry) = sessions.entries.get_mut(id) else {
            return Ok(None);
        };
        if entry.is_expired(now) {
            sessions.entries.remove(id);
            return Ok(None);
        }
        let previous = entry.values.remove(key);
        if entry.values.is_empty() {
            sessions.entries.remove(id);
        }
        Ok(previous)
    }
}
