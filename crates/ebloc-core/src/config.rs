// ── Runtime portal configuration ──
//
// Describes *which* account to poll and how to reach the portal.
// Carries credential data and connection tuning, but never touches disk.
// The CLI constructs a `PortalConfig` and hands it in.

use std::path::PathBuf;
use std::time::Duration;

use ebloc_api::Credentials;
use url::Url;

/// Period between scheduled refreshes.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(PathBuf),
    /// Skip verification (mirrors behind intercepting proxies).
    DangerAcceptInvalid,
}

/// Configuration for polling a single apartment account.
#[derive(Debug, Clone)]
pub struct PortalConfig {
    /// Portal root, normalised with a trailing slash.
    pub base_url: Url,
    /// Account credentials and apartment selection.
    pub credentials: Credentials,
    /// TLS verification strategy.
    pub tls: TlsVerification,
    /// Request timeout.
    pub timeout: Duration,
    /// How often the background task refreshes. Zero = never.
    pub refresh_interval: Duration,
    /// `YYYY-MM` month for meter readings; the current local month when unset.
    pub meter_month: Option<String>,
}

impl PortalConfig {
    pub fn new(base_url: Url, credentials: Credentials) -> Self {
        Self {
            base_url,
            credentials,
            tls: TlsVerification::default(),
            timeout: DEFAULT_TIMEOUT,
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            meter_month: None,
        }
    }

    /// Month sent as `pLuna` with the meter index request.
    pub fn reading_month(&self) -> String {
        self.meter_month
            .clone()
            .unwrap_or_else(|| chrono::Local::now().format("%Y-%m").to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::SecretString;

    fn config() -> PortalConfig {
        let creds = Credentials::new("user", SecretString::from("pw".to_string()), "1", "2");
        PortalConfig::new(
            Url::parse("https://www.e-bloc.ro/").expect("valid URL"),
            creds,
        )
    }

    #[test]
    fn defaults() {
        let cfg = config();
        assert_eq!(cfg.refresh_interval, Duration::from_secs(300));
        assert_eq!(cfg.timeout, Duration::from_secs(30));
        assert_eq!(cfg.tls, TlsVerification::SystemDefaults);
    }

    #[test]
    fn reading_month_prefers_override() {
        let mut cfg = config();
        cfg.meter_month = Some("2024-12".into());
        assert_eq!(cfg.reading_month(), "2024-12");
    }

    #[test]
    fn reading_month_defaults_to_current_month() {
        let month = config().reading_month();
        assert_eq!(month.len(), 7);
        assert_eq!(month.as_bytes()[4], b'-');
    }
}
