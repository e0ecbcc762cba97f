use thiserror::Error;

/// Top-level error type for the `ebloc-api` crate.
///
/// Covers every failure mode of the portal client: login, transport,
/// unexpected HTTP status, and payload decoding. `ebloc-core` maps these
/// into its own error taxonomy.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Login failed (bad credentials, unexpected status, missing dashboard marker,
    /// or the login request never completed).
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// A data request was answered with the login page instead of data.
    #[error("Session expired -- re-authentication required")]
    SessionExpired,

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, timeout, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS setup or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Portal responses ────────────────────────────────────────────
    /// The portal answered with a status other than 200.
    #[error("Unexpected HTTP status {status}: {body}")]
    Http { status: u16, body: String },

    /// JSON decoding failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if this error indicates the session is gone
    /// and logging in again might resolve it.
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, Self::SessionExpired)
    }

    /// Returns `true` if this is a transient error worth retrying on the next tick.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Http { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// Truncate a response body for inclusion in error messages.
pub(crate) fn body_preview(body: &str) -> String {
    body.chars().take(200).collect()
}
