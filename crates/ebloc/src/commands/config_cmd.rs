//! Config subcommand handlers.

use dialoguer::{Confirm, Input, Select};
use secrecy::SecretString;

use ebloc_core::{Credentials, DEFAULT_BASE_URL, PortalConfig, SessionManager, mask_value};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::{self, Config, Profile};
use crate::error::CliError;
use crate::output;

// ── Helpers ─────────────────────────────────────────────────────────

/// Copy of the config with credentials masked.
fn redacted(cfg: &Config) -> Config {
    let mut out = cfg.clone();
    for profile in out.profiles.values_mut() {
        profile.username = mask_value(&profile.username);
        profile.association_id = mask_value(&profile.association_id);
        profile.apartment_id = mask_value(&profile.apartment_id);
        if profile.password.is_some() {
            profile.password = Some("****".into());
        }
    }
    out
}

/// Format an already-redacted config for display.
fn format_config(cfg: &Config) -> String {
    use std::fmt::Write;
    let mut out = String::new();

    if let Some(ref default) = cfg.default_profile {
        let _ = writeln!(out, "default_profile = \"{default}\"");
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "[defaults]");
    let _ = writeln!(out, "output = \"{}\"", cfg.defaults.output);
    let _ = writeln!(out, "color = \"{}\"", cfg.defaults.color);
    let _ = writeln!(out, "insecure = {}", cfg.defaults.insecure);
    let _ = writeln!(out, "timeout = {}", cfg.defaults.timeout);
    let _ = writeln!(out, "refresh_interval = {}", cfg.defaults.refresh_interval);

    for (name, p) in &cfg.profiles {
        let _ = writeln!(out);
        let _ = writeln!(out, "[profiles.{name}]");
        let _ = writeln!(out, "username = \"{}\"", p.username);
        let _ = writeln!(out, "association_id = \"{}\"", p.association_id);
        let _ = writeln!(out, "apartment_id = \"{}\"", p.apartment_id);
        if let Some(ref pw) = p.password {
            let _ = writeln!(out, "password = \"{pw}\"");
        }
        if let Some(ref env) = p.password_env {
            let _ = writeln!(out, "password_env = \"{env}\"");
        }
        if let Some(ref url) = p.base_url {
            let _ = writeln!(out, "base_url = \"{url}\"");
        }
        if let Some(ref month) = p.meter_month {
            let _ = writeln!(out, "meter_month = \"{month}\"");
        }
        if let Some(ref ca) = p.ca_cert {
            let _ = writeln!(out, "ca_cert = \"{}\"", ca.display());
        }
        if let Some(insecure) = p.insecure {
            let _ = writeln!(out, "insecure = {insecure}");
        }
        if let Some(timeout) = p.timeout {
            let _ = writeln!(out, "timeout = {timeout}");
        }
        if let Some(interval) = p.refresh_interval {
            let _ = writeln!(out, "refresh_interval = {interval}");
        }
    }

    out
}

/// Map a dialoguer / interactive I/O failure into CliError.
fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

/// Prompt for a required text value, offering `current` as the default.
fn prompt_required(prompt: &str, current: &str) -> Result<String, CliError> {
    let mut input = Input::<String>::new().with_prompt(prompt).validate_with(
        |value: &String| -> Result<(), &str> {
            if value.trim().is_empty() {
                Err("value cannot be empty")
            } else {
                Ok(())
            }
        },
    );
    if !current.is_empty() {
        input = input.default(current.to_owned());
    }
    let value = input.interact_text().map_err(prompt_err)?;
    Ok(value.trim().to_owned())
}

/// Offer to store the password in the system keyring or return it for plaintext config.
///
/// Returns `Some(secret)` if the user chose plaintext, `None` if stored in keyring.
fn prompt_keyring_storage(secret: &str, profile_name: &str) -> Result<Option<String>, CliError> {
    let choices = &[
        "Store in system keyring (recommended)",
        "Save to config file (plaintext)",
    ];
    let selection = Select::new()
        .with_prompt("Where to store the password?")
        .items(choices)
        .default(0)
        .interact()
        .map_err(prompt_err)?;

    if selection == 0 {
        ebloc_config::store_password(profile_name, secret)?;
        eprintln!("   ✓ Password stored in system keyring");
        Ok(None)
    } else {
        Ok(Some(secret.to_owned()))
    }
}

/// Log in once with the entered values, as the portal's own setup does.
async fn verify_credentials(
    profile: &Profile,
    password: &str,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let raw_url = global
        .base_url
        .as_deref()
        .or(profile.base_url.as_deref())
        .unwrap_or(DEFAULT_BASE_URL);
    let base_url = ebloc_config::parse_base_url(raw_url)?;
    let credentials = Credentials::new(
        profile.username.clone(),
        SecretString::from(password.to_owned()),
        profile.association_id.clone(),
        profile.apartment_id.clone(),
    );
    let portal = PortalConfig::new(base_url, credentials);

    let mut session = SessionManager::new(&portal);
    let bar = output::spinner(global, "Checking credentials...");
    let result = session.authenticate(&portal.credentials).await;
    bar.finish_and_clear();
    session.close();
    result.map_err(CliError::from)
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Init => init(global).await,
        ConfigCommand::Show => show(global),
        ConfigCommand::SetPassword { profile } => set_password(profile, global),
    }
}

// ── Init: interactive wizard ────────────────────────────────────────

async fn init(global: &GlobalOpts) -> Result<(), CliError> {
    let config_path = config::config_file(global);
    let mut cfg = config::load(global)?;
    eprintln!("✨ ebloc: configuration wizard");
    eprintln!("   Config path: {}\n", config_path.display());

    // 1. Profile name
    let profile_name: String = Input::new()
        .with_prompt("Profile name")
        .default(config::active_profile_name(global, &cfg))
        .interact_text()
        .map_err(prompt_err)?;

    let existing = cfg.profiles.get(&profile_name).cloned();
    if existing.is_some() {
        eprintln!("   Editing existing profile '{profile_name}'\n");
    }
    let mut profile = existing.clone().unwrap_or_default();

    // 2. Credentials (current values offered as defaults)
    profile.username = prompt_required("Username (e-mail)", &profile.username)?;

    let keep_hint = if existing.is_some() {
        " (leave empty to keep current)"
    } else {
        ""
    };
    let password = rpassword::prompt_password(format!("Password{keep_hint}: ")).map_err(prompt_err)?;
    let new_password = if password.is_empty() {
        if existing.is_none() {
            return Err(CliError::Validation {
                field: "password".into(),
                reason: "password cannot be empty".into(),
            });
        }
        None
    } else {
        Some(password)
    };

    profile.association_id = prompt_required("Association ID", &profile.association_id)?;
    profile.apartment_id = prompt_required("Apartment ID", &profile.apartment_id)?;
    profile.validate()?;

    // 3. Optional verification against the portal
    if let Some(ref password) = new_password {
        let verify = Confirm::new()
            .with_prompt("Verify the credentials with e-bloc.ro now?")
            .default(true)
            .interact()
            .map_err(prompt_err)?;
        if verify {
            match verify_credentials(&profile, password, global).await {
                Ok(()) => eprintln!("   ✓ Credentials accepted"),
                Err(e) => {
                    eprintln!("   ✗ {e}");
                    let save_anyway = Confirm::new()
                        .with_prompt("Save the profile anyway?")
                        .default(false)
                        .interact()
                        .map_err(prompt_err)?;
                    if !save_anyway {
                        return Err(e);
                    }
                }
            }
        }

        // 4. Password storage
        profile.password = prompt_keyring_storage(password, &profile_name)?;
    }

    // 5. Write config
    let has_default = cfg
        .default_profile
        .as_ref()
        .is_some_and(|name| cfg.profiles.contains_key(name));
    cfg.profiles.insert(profile_name.clone(), profile);
    if !has_default {
        cfg.default_profile = Some(profile_name.clone());
    }
    config::save(global, &cfg)?;

    eprintln!("\n✓ Configuration written to {}", config_path.display());
    eprintln!("  Profile: {profile_name}");
    eprintln!("\n  Test it: ebloc status");
    Ok(())
}

// ── Show ────────────────────────────────────────────────────────────

fn show(global: &GlobalOpts) -> Result<(), CliError> {
    let cfg = redacted(&config::load(global)?);
    let path = config::config_file(global);
    let out = output::render_single(&global.output, &cfg, format_config, |_| {
        path.display().to_string()
    })?;
    output::print_output(&out, global.quiet);
    Ok(())
}

// ── SetPassword ─────────────────────────────────────────────────────

fn set_password(profile: Option<String>, global: &GlobalOpts) -> Result<(), CliError> {
    let cfg = config::load(global)?;
    let profile_name = profile
        .or_else(|| global.profile.clone())
        .unwrap_or_else(|| cfg.default_profile_name().to_owned());

    if !cfg.profiles.contains_key(&profile_name) {
        return Err(config::profile_not_found(&profile_name, &cfg));
    }

    let secret = rpassword::prompt_password("Password: ").map_err(prompt_err)?;
    if secret.is_empty() {
        return Err(CliError::Validation {
            field: "password".into(),
            reason: "value cannot be empty".into(),
        });
    }
    ebloc_config::store_password(&profile_name, &secret)?;

    eprintln!("✓ Password stored in system keyring for profile '{profile_name}'");
    if cfg
        .profiles
        .get(&profile_name)
        .is_some_and(|p| p.password.is_some())
    {
        eprintln!("  Note: the keyring takes precedence over the plaintext password in the config file");
    }
    Ok(())
}
