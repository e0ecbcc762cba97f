//! `watch`: run the coordinator and print every new snapshot.

use std::time::Duration;

use ebloc_core::{PortalConfig, RefreshCoordinator, Snapshot};
use tracing::debug;

use crate::cli::{GlobalOpts, OutputFormat, WatchArgs};
use crate::error::CliError;
use crate::output;

use super::status::{StatusReport, render, warn_unavailable};

fn print_snapshot(snapshot: &Snapshot, profile: &str, global: &GlobalOpts) -> Result<(), CliError> {
    warn_unavailable(snapshot, global);
    let report = StatusReport::from_snapshot(profile, snapshot);
    let out = render(&report, global)?;
    if matches!(global.output, OutputFormat::Table) && !global.quiet {
        println!();
    }
    output::print_output(&out, global.quiet);
    Ok(())
}

pub async fn handle(
    mut config: PortalConfig,
    args: WatchArgs,
    profile: &str,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    if let Some(secs) = args.interval {
        config.refresh_interval = Duration::from_secs(secs);
    }
    if config.refresh_interval.is_zero() {
        return Err(CliError::Validation {
            field: "refresh_interval".into(),
            reason: "must be greater than zero to watch (use --interval)".into(),
        });
    }

    let coordinator = RefreshCoordinator::new(config);
    let mut updates = coordinator.subscribe();

    let bar = output::spinner(global, "Refreshing from e-bloc.ro...");
    let first = coordinator.start().await;
    bar.finish_and_clear();
    let first = first.map_err(|e| CliError::from_core(e, profile))?;
    let _ = updates.borrow_and_update();
    print_snapshot(&first, profile, global)?;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                debug!("interrupt received");
                break;
            }
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let latest = updates.borrow_and_update().clone();
                if let Some(snapshot) = latest {
                    print_snapshot(&snapshot, profile, global)?;
                }
            }
        }
    }

    coordinator.shutdown().await;
    if !global.quiet {
        eprintln!("stopped");
    }
    Ok(())
}
