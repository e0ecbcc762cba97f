//! Command dispatch: bridges CLI args -> core coordinator -> output formatting.

pub mod config_cmd;
pub mod login;
pub mod status;
pub mod watch;

use ebloc_core::PortalConfig;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a portal-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    config: PortalConfig,
    profile: &str,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Status => status::handle(config, profile, global).await,
        Command::Watch(args) => watch::handle(config, args, profile, global).await,
        Command::Login => login::handle(&config, profile, global).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => unreachable!(),
    }
}
