//! `login`: check the profile's credentials against the portal.

use ebloc_core::{PortalConfig, SessionManager, mask_value};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

pub async fn handle(config: &PortalConfig, profile: &str, global: &GlobalOpts) -> Result<(), CliError> {
    let mut session = SessionManager::new(config);

    let bar = output::spinner(global, "Logging in...");
    let result = session.authenticate(&config.credentials).await;
    bar.finish_and_clear();
    session.close();

    result.map_err(|e| CliError::from_core(e, profile))?;

    if !global.quiet {
        let creds = &config.credentials;
        eprintln!(
            "✓ Logged in as {} (association {}, apartment {})",
            mask_value(&creds.username),
            mask_value(&creds.association_id),
            mask_value(&creds.apartment_id),
        );
    }
    Ok(())
}
