//! Per-folder reconciliation ledger (`vendor-lock.json`)

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use vendor_fs::io;

use crate::files::{LockShape, flatten};
use crate::{Error, Result};

/// What was last materialized for one dependency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockEntry {
    pub version: String,
    pub repository: String,
    pub files: LockShape,
}

/// Lockfile contents keyed by dependency name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Lockfile {
    entries: BTreeMap<String, LockEntry>,
}

/// Result of [`remove_entry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    /// No lockfile, or no entry for the name
    Absent,
    /// Entry stripped, other entries remain
    Removed,
    /// Entry was the last one; the file is gone
    LockfileDeleted,
}

impl Lockfile {
    /// Read a lockfile. A missing file yields `None`.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Error::io(path, e)),
        };
        let lockfile = serde_json::from_str(&content).map_err(|source| Error::Lockfile {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Some(lockfile))
    }

    /// Write pretty JSON (2-space indent) atomically.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        io::write_atomic(path, content.as_bytes())?;
        Ok(())
    }

    pub fn entry(&self, name: &str) -> Option<&LockEntry> {
        self.entries.get(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, entry: LockEntry) {
        self.entries.insert(name.into(), entry);
    }

    pub fn remove(&mut self, name: &str) -> Option<LockEntry> {
        self.entries.remove(name)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Local destinations recorded for `name`, empty when unknown.
    pub fn files_for(&self, name: &str) -> Vec<String> {
        self.entry(name)
            .map(|entry| flatten(&entry.files))
            .unwrap_or_default()
    }
}

/// Read one entry, treating an unreadable lockfile as absent.
pub fn read_entry(path: &Path, name: &str) -> Option<LockEntry> {
    match Lockfile::load(path) {
        Ok(lockfile) => lockfile.and_then(|l| l.entry(name).cloned()),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Ignoring unreadable lockfile");
            None
        }
    }
}

/// Create or merge `name` into the lockfile at `path`.
pub fn write_entry(path: &Path, name: &str, entry: LockEntry) -> Result<()> {
    let mut lockfile = Lockfile::load(path)?.unwrap_or_default();
    lockfile.insert(name, entry);
    lockfile.save(path)
}

/// Strip `name` from the lockfile, deleting the file when nothing remains.
pub fn remove_entry(path: &Path, name: &str) -> Result<Removal> {
    let Some(mut lockfile) = Lockfile::load(path)? else {
        return Ok(Removal::Absent);
    };
    if lockfile.remove(name).is_none() {
        return Ok(Removal::Absent);
    }
    if lockfile.is_empty() {
        match std::fs::remove_file(path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(Error::io(path, e)),
        }
        Ok(Removal::LockfileDeleted)
    } else {
        lockfile.save(path)?;
        Ok(Removal::Removed)
    }
}
