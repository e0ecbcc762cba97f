//! Clap derive structures for the `ebloc` CLI.
//!
//! Defines the command tree, global flags, and shared types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// ebloc -- your e-bloc.ro apartment account from the terminal
#[derive(Debug, Parser)]
#[command(
    name = "ebloc",
    version,
    about = "Check an e-bloc.ro apartment account from the command line",
    long_about = "Logs in to the e-bloc.ro owners portal and shows the account summary,\n\
        the utility meter reading and the payment receipts for one apartment.\n\n\
        `watch` keeps polling on a schedule and prints every new snapshot.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Account profile to use
    #[arg(long, short = 'p', env = "EBLOC_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Config file (defaults to the platform config directory)
    #[arg(long, env = "EBLOC_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Portal root URL (overrides profile)
    #[arg(long, env = "EBLOC_BASE_URL", global = true)]
    pub base_url: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "EBLOC_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Accept invalid TLS certificates
    #[arg(long, short = 'k', env = "EBLOC_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "EBLOC_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Refresh once and show account, meter and receipts
    #[command(alias = "st")]
    Status,

    /// Keep refreshing and print every new snapshot (Ctrl-C to stop)
    #[command(alias = "w")]
    Watch(WatchArgs),

    /// Check that the profile's credentials are accepted by the portal
    Login,

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  WATCH
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Seconds between refreshes (overrides profile)
    #[arg(long, short = 'i', value_parser = clap::value_parser!(u64).range(1..))]
    pub interval: Option<u64>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CONFIG
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create or edit a profile with guided setup
    Init,

    /// Display current configuration (credentials masked)
    Show,

    /// Store a password in the system keyring
    SetPassword {
        /// Profile name
        #[arg(long)]
        profile: Option<String>,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  COMPLETIONS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_tree_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn watch_interval_must_be_positive() {
        let err = Cli::try_parse_from(["ebloc", "watch", "--interval", "0"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["ebloc", "status", "-o", "json", "--profile", "flat"])
            .expect("valid args");
        assert!(matches!(cli.global.output, OutputFormat::Json));
        assert_eq!(cli.global.profile.as_deref(), Some("flat"));
    }
}
