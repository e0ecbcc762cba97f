//! CLI configuration: thin wrapper around `ebloc_config`.
//!
//! Re-exports the shared types and adds resolution that respects
//! `GlobalOpts` flag overrides (--config, --profile, --base-url, ...).

use std::path::PathBuf;
use std::time::Duration;

use ebloc_core::{PortalConfig, TlsVerification, mask_value};
use tracing::info;

use crate::cli::GlobalOpts;
use crate::error::CliError;

// ── Re-exports from shared crate ────────────────────────────────────

pub use ebloc_config::{Config, Profile};

// ── CLI-specific helpers ────────────────────────────────────────────

/// Config file path: `--config` flag or the platform default.
pub fn config_file(global: &GlobalOpts) -> PathBuf {
    global
        .config
        .clone()
        .unwrap_or_else(ebloc_config::config_path)
}

/// Load the config file selected by the global flags.
pub fn load(global: &GlobalOpts) -> Result<Config, CliError> {
    Ok(ebloc_config::load_config_from(&config_file(global))?)
}

/// Write the config back to the file selected by the global flags.
pub fn save(global: &GlobalOpts, cfg: &Config) -> Result<(), CliError> {
    Ok(ebloc_config::save_config_to(cfg, &config_file(global))?)
}

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .unwrap_or_else(|| config.default_profile_name().to_owned())
}

pub fn profile_not_found(name: &str, config: &Config) -> CliError {
    let available: Vec<_> = config.profiles.keys().cloned().collect();
    CliError::ProfileNotFound {
        name: name.into(),
        available: if available.is_empty() {
            "(none)".into()
        } else {
            available.join(", ")
        },
    }
}

/// Translate the active profile + global flags into a `PortalConfig`.
///
/// CLI flag overrides take priority over profile values.
pub fn resolve_portal_config(global: &GlobalOpts) -> Result<(String, PortalConfig), CliError> {
    let path = config_file(global);
    let cfg = load(global)?;
    let profile_name = active_profile_name(global, &cfg);

    let Some(profile) = cfg.profiles.get(&profile_name) else {
        if cfg.profiles.is_empty() && !path.exists() {
            return Err(CliError::NoConfig {
                path: path.display().to_string(),
            });
        }
        return Err(profile_not_found(&profile_name, &cfg));
    };

    let mut portal = ebloc_config::profile_to_portal_config(profile, &profile_name, &cfg.defaults)?;

    // 1. Portal URL (flag > env > profile)
    if let Some(ref base_url) = global.base_url {
        portal.base_url = ebloc_config::parse_base_url(base_url)?;
    }

    // 2. TLS verification
    if global.insecure {
        portal.tls = TlsVerification::DangerAcceptInvalid;
    }

    // 3. Timeout
    if let Some(secs) = global.timeout {
        portal.timeout = Duration::from_secs(secs);
    }

    info!(
        profile = %profile_name,
        base_url = %portal.base_url,
        user = %mask_value(&portal.credentials.username),
        association = %mask_value(&portal.credentials.association_id),
        apartment = %mask_value(&portal.credentials.apartment_id),
        "using profile"
    );

    Ok((profile_name, portal))
}
