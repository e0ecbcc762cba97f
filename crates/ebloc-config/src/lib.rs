//! Configuration for the ebloc CLI.
//!
//! TOML profiles, credential resolution (env + keyring + plaintext),
//! and translation to `ebloc_core::PortalConfig`. The CLI layers its
//! `GlobalOpts` overrides on top.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use ebloc_core::{Credentials, DEFAULT_BASE_URL, PortalConfig, TlsVerification};

/// Keyring service name for stored passwords.
pub const KEYRING_SERVICE: &str = "ebloc";

/// Environment variable consulted for the password when the profile
/// names none of its own.
pub const PASSWORD_ENV: &str = "EBLOC_PASSWORD";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no password configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("profile '{name}' not found")]
    ProfileNotFound { name: String },

    #[error("keyring error: {0}")]
    Keyring(String),

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named apartment profiles.
    #[serde(default)]
    pub profiles: BTreeMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Name of the profile to use when none is requested explicitly.
    pub fn default_profile_name(&self) -> &str {
        self.default_profile.as_deref().unwrap_or("default")
    }

    pub fn profile(&self, name: &str) -> Result<&Profile, ConfigError> {
        self.profiles
            .get(name)
            .ok_or_else(|| ConfigError::ProfileNotFound { name: name.into() })
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    #[serde(default)]
    pub insecure: bool,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Seconds between scheduled refreshes.
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            insecure: false,
            timeout: default_timeout(),
            refresh_interval: default_refresh_interval(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout() -> u64 {
    30
}
fn default_refresh_interval() -> u64 {
    300
}

/// One apartment account on the portal.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Profile {
    /// Portal login.
    pub username: String,

    /// Owners' association id (`pIdAsoc`).
    pub association_id: String,

    /// Apartment id (`pIdAp`).
    pub apartment_id: String,

    /// Password (plaintext, prefer keyring or env var).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Environment variable name containing the password.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password_env: Option<String>,

    /// Portal root; the public portal when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Fixed `YYYY-MM` month for meter readings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meter_month: Option<String>,

    /// Path to custom CA certificate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ca_cert: Option<PathBuf>,

    /// Override insecure TLS setting.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub insecure: Option<bool>,

    /// Override timeout.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,

    /// Override refresh interval.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_interval: Option<u64>,
}

impl Profile {
    /// Check the fields the portal needs, naming the first bad one.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("username", &self.username),
            ("association_id", &self.association_id),
            ("apartment_id", &self.apartment_id),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::Validation {
                    field: field.into(),
                    reason: "must not be empty".into(),
                });
            }
        }
        if let Some(ref month) = self.meter_month {
            validate_meter_month(month)?;
        }
        if let Some(ref base_url) = self.base_url {
            parse_base_url(base_url)?;
        }
        Ok(())
    }
}

/// Accept only `YYYY-MM` with a real month.
pub fn validate_meter_month(month: &str) -> Result<(), ConfigError> {
    let well_formed = month.len() == 7
        && chrono::NaiveDate::parse_from_str(&format!("{month}-01"), "%Y-%m-%d").is_ok();
    if well_formed {
        Ok(())
    } else {
        Err(ConfigError::Validation {
            field: "meter_month".into(),
            reason: format!("expected YYYY-MM, got '{month}'"),
        })
    }
}

/// Parse and normalise a portal root URL.
pub fn parse_base_url(raw: &str) -> Result<url::Url, ConfigError> {
    ebloc_core::normalize_base_url(raw).map_err(|_| ConfigError::Validation {
        field: "base_url".into(),
        reason: format!("invalid URL: {raw}"),
    })
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("ro", "ebloc", "ebloc").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("ebloc");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the Config from `path`, layered under `EBLOC_`-prefixed env vars
/// (`EBLOC_DEFAULTS__TIMEOUT=60`). A missing file yields the defaults.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    debug!(path = %path.display(), "loading config");
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("EBLOC_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write it to `path`, creating parent
/// directories.
pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Credential resolution ───────────────────────────────────────────

fn keyring_entry(profile_name: &str) -> Result<keyring::Entry, ConfigError> {
    keyring::Entry::new(KEYRING_SERVICE, &format!("{profile_name}/password"))
        .map_err(|e| ConfigError::Keyring(e.to_string()))
}

/// Resolve the profile password.
///
/// Order: the profile's `password_env` variable, `EBLOC_PASSWORD`, the
/// system keyring, then the plaintext `password` field.
pub fn resolve_password(profile: &Profile, profile_name: &str) -> Result<SecretString, ConfigError> {
    // 1. Profile's password_env → env var lookup
    if let Some(ref env_name) = profile.password_env {
        if let Ok(val) = std::env::var(env_name) {
            return Ok(SecretString::from(val));
        }
    }

    // 2. Global env var
    if let Ok(val) = std::env::var(PASSWORD_ENV) {
        return Ok(SecretString::from(val));
    }

    // 3. System keyring
    if let Ok(entry) = keyring_entry(profile_name) {
        if let Ok(secret) = entry.get_password() {
            return Ok(SecretString::from(secret));
        }
    }

    // 4. Plaintext in config
    if let Some(ref pw) = profile.password {
        return Ok(SecretString::from(pw.clone()));
    }

    Err(ConfigError::NoCredentials {
        profile: profile_name.into(),
    })
}

/// Store a password in the system keyring for `profile_name`.
pub fn store_password(profile_name: &str, password: &str) -> Result<(), ConfigError> {
    keyring_entry(profile_name)?
        .set_password(password)
        .map_err(|e| ConfigError::Keyring(e.to_string()))
}

/// Build the account credentials from a profile.
pub fn resolve_credentials(
    profile: &Profile,
    profile_name: &str,
) -> Result<Credentials, ConfigError> {
    profile.validate()?;
    let password = resolve_password(profile, profile_name)?;
    Ok(Credentials::new(
        profile.username.trim(),
        password,
        profile.association_id.trim(),
        profile.apartment_id.trim(),
    ))
}

/// Build a `PortalConfig` from a profile and the global defaults.
pub fn profile_to_portal_config(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
) -> Result<PortalConfig, ConfigError> {
    let credentials = resolve_credentials(profile, profile_name)?;
    let base_url = parse_base_url(profile.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL))?;

    let mut config = PortalConfig::new(base_url, credentials);
    config.tls = if profile.insecure.unwrap_or(defaults.insecure) {
        TlsVerification::DangerAcceptInvalid
    } else if let Some(ref ca_path) = profile.ca_cert {
        TlsVerification::CustomCa(ca_path.clone())
    } else {
        TlsVerification::SystemDefaults
    };
    config.timeout = Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout));
    config.refresh_interval =
        Duration::from_secs(profile.refresh_interval.unwrap_or(defaults.refresh_interval));
    config.meter_month.clone_from(&profile.meter_month);
    Ok(config)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use secrecy::ExposeSecret;

    fn profile() -> Profile {
        Profile {
            username: "ion.popescu".into(),
            association_id: "4242".into(),
            apartment_id: "17".into(),
            password: Some("plain".into()),
            ..Profile::default()
        }
    }

    #[test]
    fn save_then_load_round_trips_profiles() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut cfg = Config::default();
        cfg.profiles.insert("home".into(), profile());
        cfg.default_profile = Some("home".into());
        save_config_to(&cfg, &path).unwrap();

        let loaded = load_config_from(&path).unwrap();
        assert_eq!(loaded.default_profile_name(), "home");
        let home = loaded.profile("home").unwrap();
        assert_eq!(home.username, "ion.popescu");
        assert_eq!(home.apartment_id, "17");
        assert_eq!(loaded.defaults.refresh_interval, 300);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_config_from(&dir.path().join("absent.toml")).unwrap();
        assert!(cfg.profiles.is_empty());
        assert_eq!(cfg.defaults.timeout, 30);
        assert_eq!(cfg.default_profile_name(), "default");
    }

    #[test]
    fn file_values_override_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
default_profile = "flat"

[defaults]
timeout = 10

[profiles.flat]
username = "maria"
association_id = "1"
apartment_id = "2"
meter_month = "2024-12"
refresh_interval = 60
"#,
        )
        .unwrap();

        let cfg = load_config_from(&path).unwrap();
        assert_eq!(cfg.defaults.timeout, 10);
        assert_eq!(cfg.defaults.output, "table");
        let flat = cfg.profile("flat").unwrap();
        assert_eq!(flat.meter_month.as_deref(), Some("2024-12"));
        assert_eq!(flat.refresh_interval, Some(60));
    }

    #[test]
    fn unknown_profile_is_reported() {
        let err = Config::default().profile("nope").unwrap_err();
        assert!(matches!(err, ConfigError::ProfileNotFound { ref name } if name == "nope"));
    }

    #[test]
    fn validation_names_the_field() {
        let mut p = profile();
        p.apartment_id = "  ".into();
        match p.validate() {
            Err(ConfigError::Validation { field, .. }) => assert_eq!(field, "apartment_id"),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn meter_month_must_be_year_dash_month() {
        assert!(validate_meter_month("2024-12").is_ok());
        assert!(validate_meter_month("2024-13").is_err());
        assert!(validate_meter_month("2024-1").is_err());
        assert!(validate_meter_month("december").is_err());
    }

    #[test]
    fn portal_config_from_profile() {
        let mut p = profile();
        p.base_url = Some("http://127.0.0.1:8080/portal".into());
        p.timeout = Some(5);
        p.meter_month = Some("2024-11".into());

        let cfg = profile_to_portal_config(&p, "test-profile-without-keyring", &Defaults::default())
            .unwrap();
        assert_eq!(cfg.base_url.as_str(), "http://127.0.0.1:8080/portal/");
        assert_eq!(cfg.timeout, Duration::from_secs(5));
        assert_eq!(cfg.refresh_interval, Duration::from_secs(300));
        assert_eq!(cfg.meter_month.as_deref(), Some("2024-11"));
        assert_eq!(cfg.tls, TlsVerification::SystemDefaults);
        assert_eq!(cfg.credentials.association_id, "4242");
    }

    #[test]
    fn insecure_default_applies_without_profile_override() {
        let defaults = Defaults {
            insecure: true,
            ..Defaults::default()
        };
        let cfg = profile_to_portal_config(&profile(), "test-profile-without-keyring", &defaults)
            .unwrap();
        assert_eq!(cfg.tls, TlsVerification::DangerAcceptInvalid);
    }

    #[test]
    fn plaintext_password_is_the_last_resort() {
        if std::env::var(PASSWORD_ENV).is_ok() {
            return;
        }
        let pw = resolve_password(&profile(), "test-profile-without-keyring").unwrap();
        assert_eq!(pw.expose_secret(), "plain");
    }

    #[test]
    fn missing_password_is_reported() {
        if std::env::var(PASSWORD_ENV).is_ok() {
            return;
        }
        let mut p = profile();
        p.password = None;
        let err = resolve_password(&p, "test-profile-without-keyring").unwrap_err();
        assert!(matches!(err, ConfigError::NoCredentials { .. }));
    }

    #[test]
    fn invalid_base_url_is_a_validation_error() {
        let mut p = profile();
        p.base_url = Some("not a url".into());
        match p.validate() {
            Err(ConfigError::Validation { field, .. }) => assert_eq!(field, "base_url"),
            other => panic!("expected validation error, got {other:?}"),
        }
    }
}
