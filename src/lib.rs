#![doc = include_str!("../README.md")]

pub mod app;
pub mod config;
pub mod error;
pub mod flow;
pub mod middleware;
pub mod oauth;
pub mod session;
pub mod state;
pub mod types;

// Re-exports for convenient access
pub use app::build_app;
pub use config::{AppConfig, ConfigError, ServerSettings};
pub use error::Error;
pub use flow::{AuthError, AuthFlowController, CallbackParams, ProtocolError};
pub use oauth::{OAuthConfig, ProviderClient, ProviderUserInfo, TokenResponse};
pub use session::{MemorySessionStore, Session, SessionError, SessionStore};
pub use state::generate_state;
pub use types::{SessionId, UserProfile};
