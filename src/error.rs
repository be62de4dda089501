/// Errors raised while talking to the identity provider.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The provider answered, but not with a success status.
    ///
    /// `detail` holds the raw response body for server-side diagnostics only.
    #[error("{operation} failed with status {status}")]
    Upstream {
        operation: &'static str,
        status: u16,
        detail: String,
    },
    /// Transport failure, timeout, or an undecodable response body.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl Error {
    /// Whether the provider could not be reached at all (as opposed to
    /// answering with an error).
    #[must_use]
    pub fn is_transport(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            _ => false,
        }
    }

    /// Raw provider response body, for server-side logs only.
    #[must_use]
    pub fn detail(&self) -> Option<&str> {
        match self {
            Self::Upstream { detail, .. } => Some(detail),
            _ => None,
        }
    }
}
