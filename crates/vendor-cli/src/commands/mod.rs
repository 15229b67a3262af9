//! Command implementations for vendor-cli

pub mod install;
pub mod sync;
pub mod uninstall;

pub use install::{InstallArgs, run_install};
pub use sync::{run_outdated, run_sync, run_update};
pub use uninstall::run_uninstall;

use colored::Colorize;
use vendor_core::{Outcome, SyncReport};

use crate::error::{CliError, Result};

/// Print one outcome line.
pub(crate) fn print_outcome(outcome: &Outcome) {
    match outcome {
        Outcome::Installed { .. } | Outcome::Updated { .. } | Outcome::Refreshed { .. } => {
            println!("{} {}", "OK".green().bold(), outcome);
        }
        Outcome::UpToDate { .. } => println!("{} {}", "OK".green(), outcome.to_string().dimmed()),
        Outcome::Outdated { .. } => println!("{} {}", "OUTDATED".yellow().bold(), outcome),
        Outcome::Skipped { .. } => println!("{} {}", "SKIPPED".yellow(), outcome),
    }
}

/// Print every failure of a batch and turn them into the exit status.
pub(crate) fn finish_report(report: &SyncReport) -> Result<()> {
    if report.success() {
        return Ok(());
    }
    for failure in &report.failures {
        eprintln!(
            "{} {}: {}",
            "FAILED".red().bold(),
            failure.name.cyan(),
            failure.error
        );
    }
    let total = report.outcomes.len() + report.failures.len();
    Err(CliError::user(format!(
        "{} of {} dependencies failed",
        report.failures.len(),
        total
    )))
}
