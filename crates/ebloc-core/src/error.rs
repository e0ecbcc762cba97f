// ── Core error types ──
//
// User-facing errors from the refresh engine. Clone because the outcome
// of a refresh cycle is shared with every trigger merged into it.

use thiserror::Error;

/// Unified error type for the `ebloc-core` crate.
///
/// Wraps transport-level errors from `ebloc-api` into categories that
/// consumers can match on without depending on HTTP details.
#[derive(Debug, Clone, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot connect to portal at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Session expired -- re-authentication required")]
    SessionExpired,

    #[error("Portal request timed out")]
    Timeout,

    // ── Data errors ──────────────────────────────────────────────────
    #[error("Failed to fetch {endpoint}: {message}")]
    FetchFailed { endpoint: String, message: String },

    #[error("Portal error: {message}")]
    Api {
        message: String,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    // ── Refresh errors ───────────────────────────────────────────────
    /// A refresh cycle aborted; the previous snapshot stays published.
    #[error("Refresh failed: {source}")]
    RefreshFailed {
        #[source]
        source: Box<CoreError>,
    },

    /// The coordinator was shut down and refuses further cycles.
    #[error("Refresh coordinator is shut down")]
    ShutDown,

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Wrap an error as the cause of an aborted refresh cycle.
    pub fn refresh_failed(source: Self) -> Self {
        match source {
            already @ Self::RefreshFailed { .. } => already,
            other => Self::RefreshFailed {
                source: Box::new(other),
            },
        }
    }

    /// The innermost error, looking through `RefreshFailed` wrappers.
    pub fn root_cause(&self) -> &Self {
        match self {
            Self::RefreshFailed { source } => source.root_cause(),
            other => other,
        }
    }

    /// Whether the account credentials were rejected.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self.root_cause(), Self::AuthenticationFailed { .. })
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<ebloc_api::Error> for CoreError {
    fn from(err: ebloc_api::Error) -> Self {
        match err {
            ebloc_api::Error::Authentication { message } => {
                CoreError::AuthenticationFailed { message }
            }
            ebloc_api::Error::SessionExpired => CoreError::SessionExpired,
            ebloc_api::Error::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout
                } else if e.is_connect() {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map(ToString::to_string)
                            .unwrap_or_else(|| "<unknown>".into()),
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Api {
                        message: e.to_string(),
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            ebloc_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            ebloc_api::Error::Tls(msg) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("TLS error: {msg}"),
            },
            ebloc_api::Error::Http { status, body } => CoreError::Api {
                message: format!("HTTP {status}: {body}"),
                status: Some(status),
            },
            ebloc_api::Error::Deserialization { message, body: _ } => {
                CoreError::Internal(format!("Deserialization error: {message}"))
            }
        }
    }
}
