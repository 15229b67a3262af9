//! Manifest discovery
//!
//! Commands work from any directory below the manifest, the way git finds
//! its repository: the search starts at `--folder` (or the working
//! directory) and walks up.

use std::path::{Path, PathBuf};

use vendor_core::Manifest;
use vendor_core::manifest::MANIFEST_NAMES;

use crate::error::{CliError, Result};

/// Directory where manifest discovery starts.
pub fn start_dir(folder: Option<&Path>) -> Result<PathBuf> {
    let cwd = std::env::current_dir()?;
    Ok(match folder {
        Some(folder) => cwd.join(folder),
        None => cwd,
    })
}

/// Load the nearest manifest at or above `start`.
pub fn load_manifest(start: &Path) -> Result<Manifest> {
    let path = Manifest::discover(start).ok_or_else(|| {
        CliError::user(format!(
            "No config file found in {} or any parent directory (looked for {})",
            start.display(),
            MANIFEST_NAMES.join(", ")
        ))
    })?;
    tracing::debug!(manifest = %path.display(), "Using config file");
    Ok(Manifest::load(&path)?)
}

/// Load the nearest manifest, or start a new `vendor.toml` in `start`.
///
/// A new manifest is only written once something is saved into it.
pub fn load_or_create_manifest(start: &Path) -> Result<Manifest> {
    match Manifest::discover(start) {
        Some(path) => Ok(Manifest::load(&path)?),
        None => {
            let path = start.join(MANIFEST_NAMES[0]);
            tracing::debug!(manifest = %path.display(), "Starting a new config file");
            Ok(Manifest::create(&path)?)
        }
    }
}
