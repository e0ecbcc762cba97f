//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` variants into user-facing errors
//! with actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use ebloc_config::ConfigError;
use ebloc_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not connect to the portal at {url}")]
    #[diagnostic(
        code(ebloc::connection_failed),
        help(
            "Check your network connection and the portal URL.\n\
             URL: {url}"
        )
    )]
    ConnectionFailed {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Request timed out")]
    #[diagnostic(
        code(ebloc::timeout),
        help("Increase timeout with --timeout or try again later.")
    )]
    Timeout,

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(ebloc::auth_failed),
        help(
            "Verify the username, password, association and apartment ids.\n\
             Run: ebloc config set-password --profile {profile}"
        )
    )]
    AuthFailed { profile: String, message: String },

    #[error("No password configured for profile '{profile}'")]
    #[diagnostic(
        code(ebloc::no_credentials),
        help(
            "Configure credentials with: ebloc config init\n\
             Or set the EBLOC_PASSWORD environment variable."
        )
    )]
    NoCredentials { profile: String },

    // ── Portal ───────────────────────────────────────────────────────
    #[error("Portal error: {message}")]
    #[diagnostic(code(ebloc::portal_error))]
    PortalError { message: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(ebloc::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(ebloc::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: ebloc config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("Configuration file not found")]
    #[diagnostic(
        code(ebloc::no_config),
        help(
            "Create one with: ebloc config init\n\
             Expected at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error("Configuration error: {0}")]
    #[diagnostic(code(ebloc::config))]
    Config(String),

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to render output: {0}")]
    #[diagnostic(code(ebloc::render))]
    Render(String),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::Timeout => exit_code::TIMEOUT,
            Self::Validation { .. } | Self::ProfileNotFound { .. } | Self::NoConfig { .. } => {
                exit_code::USAGE
            }
            _ => exit_code::GENERAL,
        }
    }

    /// Translate a core error, naming the profile in auth help text.
    pub fn from_core(err: CoreError, profile: &str) -> Self {
        match err {
            CoreError::RefreshFailed { source } => Self::from_core(*source, profile),

            CoreError::ConnectionFailed { url, reason } => CliError::ConnectionFailed {
                url,
                source: reason.into(),
            },

            CoreError::AuthenticationFailed { message } => CliError::AuthFailed {
                profile: profile.into(),
                message,
            },

            CoreError::SessionExpired => CliError::AuthFailed {
                profile: profile.into(),
                message: "portal session expired and could not be renewed".into(),
            },

            CoreError::Timeout => CliError::Timeout,

            CoreError::FetchFailed { endpoint, message } => CliError::PortalError {
                message: format!("{endpoint}: {message}"),
            },

            CoreError::Api { message, .. } | CoreError::Internal(message) => {
                CliError::PortalError { message }
            }

            CoreError::Config { message } => CliError::Config(message),

            CoreError::ShutDown => CliError::PortalError {
                message: "refresh stopped".into(),
            },
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        Self::from_core(err, "current")
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::NoCredentials { profile } => CliError::NoCredentials { profile },
            ConfigError::ProfileNotFound { name } => CliError::ProfileNotFound {
                name,
                available: String::new(),
            },
            ConfigError::Io(e) => CliError::Io(e),
            other => CliError::Config(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refresh_failures_unwrap_to_their_cause() {
        let err = CliError::from_core(
            CoreError::refresh_failed(CoreError::AuthenticationFailed {
                message: "bad password".into(),
            }),
            "flat",
        );
        assert_eq!(err.exit_code(), exit_code::AUTH);
        assert!(matches!(err, CliError::AuthFailed { ref profile, .. } if profile == "flat"));
    }

    #[test]
    fn exit_codes() {
        assert_eq!(CliError::Timeout.exit_code(), exit_code::TIMEOUT);
        assert_eq!(
            CliError::from(CoreError::ConnectionFailed {
                url: "https://www.e-bloc.ro/".into(),
                reason: "refused".into()
            })
            .exit_code(),
            exit_code::CONNECTION
        );
        assert_eq!(
            CliError::NoConfig {
                path: String::new()
            }
            .exit_code(),
            exit_code::USAGE
        );
        assert_eq!(
            CliError::PortalError {
                message: String::new()
            }
            .exit_code(),
            exit_code::GENERAL
        );
    }
}
