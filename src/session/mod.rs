//! Server-side sessions keyed by the id carried in the signed session cookie.
//!
//! The store is a plain key-value mapping per session. Login state uses two
//! well-known keys: [`PENDING_LOGIN_KEY`] and [`CURRENT_USER_KEY`].

mod handle;
mod memory;
mod store;

pub use handle::{Session, SessionError};
pub use memory::MemorySessionStore;
pub use store::{BoxError, SessionStore};

/// Key holding the `state` token of the login attempt in flight.
pub const PENDING_LOGIN_KEY: &str = "oauth_state";

/// Key holding the authenticated [`UserProfile`](crate::types::UserProfile).
pub const CURRENT_USER_KEY: &str = "user";
