//! Dependency declarations and the manifest that holds them
//!
//! The manifest is a [`Document`] with three well-known top-level keys:
//! `vendorConfig`, `vendorDependencies` and `default`. Everything else in the
//! file is left untouched on save.

use std::path::{Path, PathBuf};

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use vendor_fs::Document;

use crate::files::{self, FileSpec, file_list};
use crate::repository::RepoId;
use crate::{Error, Result};

pub const CONFIG_KEY: &str = "vendorConfig";
pub const DEPENDENCIES_KEY: &str = "vendorDependencies";
pub const DEFAULTS_KEY: &str = "default";

/// Manifest file names probed by [`Manifest::discover`], in priority order.
pub const MANIFEST_NAMES: &[&str] = &[
    "vendor.toml",
    "vendor.yml",
    "vendor.yaml",
    "vendor.json",
    "package.json",
];

pub const DEFAULT_VENDOR_FOLDER: &str = "./vendor";

/// Global settings under `vendorConfig`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VendorConfig {
    #[serde(default = "default_vendor_folder")]
    pub vendor_folder: String,
}

fn default_vendor_folder() -> String {
    DEFAULT_VENDOR_FOLDER.to_string()
}

impl Default for VendorConfig {
    fn default() -> Self {
        Self {
            vendor_folder: default_vendor_folder(),
        }
    }
}

/// `hashVersionFile`: `false`, `true` (first declared file) or a path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HashVersionFile {
    Enabled(bool),
    Path(String),
}

impl Default for HashVersionFile {
    fn default() -> Self {
        Self::Enabled(false)
    }
}

impl HashVersionFile {
    pub fn is_disabled(&self) -> bool {
        matches!(self, Self::Enabled(false))
    }
}

/// One declared dependency.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dependency {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default)]
    pub repository: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(default, with = "file_list", skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<FileSpec>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor_folder: Option<String>,

    #[serde(default, skip_serializing_if = "HashVersionFile::is_disabled")]
    pub hash_version_file: HashVersionFile,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_regex: Option<String>,
}

impl Dependency {
    pub fn new(repository: impl Into<String>, files: Vec<FileSpec>) -> Self {
        Self {
            repository: repository.into(),
            files,
            ..Default::default()
        }
    }

    /// Name used for folders and lockfile keys: the declared name, else the
    /// repository name.
    pub fn effective_name(&self) -> String {
        if let Some(name) = self.name.as_deref().filter(|n| !n.is_empty()) {
            return name.to_string();
        }
        RepoId::parse(&self.repository)
            .map(|repo| repo.name)
            .unwrap_or_else(|| self.repository.clone())
    }

    /// Parsed repository identifier.
    pub fn repo(&self) -> Result<RepoId> {
        RepoId::parse(&self.repository).ok_or_else(|| {
            Error::validation(
                self.effective_name(),
                format!(
                    "repository \"{}\" is not a GitHub URL or owner/name",
                    self.repository
                ),
            )
        })
    }

    /// Compiled `releaseRegex`, if declared.
    pub fn release_pattern(&self) -> Result<Option<Regex>> {
        self.release_regex
            .as_deref()
            .map(|pattern| {
                Regex::new(pattern).map_err(|e| {
                    Error::validation(
                        self.effective_name(),
                        format!("releaseRegex does not compile: {e}"),
                    )
                })
            })
            .transpose()
    }

    /// Check the declaration without touching disk or network.
    pub fn validate(&self) -> Result<()> {
        let name = self.effective_name();
        if self.repository.trim().is_empty() {
            return Err(Error::validation(name, "repository is required"));
        }
        self.repo()?;
        if self.files.is_empty() {
            return Err(Error::validation(name, "files must not be empty"));
        }
        self.release_pattern()?;
        if let Some(conflict) = files::remote_conflict(&self.files) {
            return Err(Error::validation(name, conflict));
        }
        let shape = files::normalize(&self.files, self.version.as_deref().unwrap_or(""));
        if let Some(path) = files::unsafe_path(&shape.lock_shape) {
            return Err(Error::validation(
                name,
                format!("\"{path}\" must be a relative path inside the dependency folder"),
            ));
        }
        Ok(())
    }
}

/// A loaded manifest file.
#[derive(Debug, Clone)]
pub struct Manifest {
    document: Document,
    config: VendorConfig,
}

impl Manifest {
    /// Load a manifest from disk.
    pub fn load(path: &Path) -> Result<Self> {
        Self::from_document(Document::load(path)?)
    }

    /// Start a fresh manifest at `path` with default settings.
    pub fn create(path: &Path) -> Result<Self> {
        let mut document = Document::new(path)?;
        let config = VendorConfig::default();
        document.root_mut().insert(
            CONFIG_KEY.to_string(),
            serde_json::to_value(&config)?,
        );
        document.table_mut(DEPENDENCIES_KEY);
        Ok(Self { document, config })
    }

    pub fn from_document(document: Document) -> Result<Self> {
        let config = match document.get(CONFIG_KEY) {
            Some(value) if !value.is_null() => {
                serde_json::from_value(value.clone()).map_err(|e| {
                    Error::validation(CONFIG_KEY, e.to_string())
                })?
            }
            _ => VendorConfig::default(),
        };
        Ok(Self { document, config })
    }

    /// Walk upward from `start` looking for a manifest file.
    pub fn discover(start: &Path) -> Option<PathBuf> {
        start.ancestors().find_map(|dir| {
            MANIFEST_NAMES
                .iter()
                .map(|name| dir.join(name))
                .find(|candidate| candidate.is_file())
        })
    }

    pub fn path(&self) -> &Path {
        self.document.path()
    }

    pub fn config(&self) -> &VendorConfig {
        &self.config
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    fn entries(&self) -> Option<&Map<String, Value>> {
        self.document.get(DEPENDENCIES_KEY).and_then(Value::as_object)
    }

    fn defaults(&self) -> Option<&Map<String, Value>> {
        self.document.get(DEFAULTS_KEY).and_then(Value::as_object)
    }

    /// Declared dependency names in manifest order.
    pub fn names(&self) -> Vec<String> {
        self.entries()
            .map(|entries| entries.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries().is_some_and(|entries| entries.contains_key(name))
    }

    /// All declared dependencies in manifest order, defaults applied and
    /// names taken from their keys.
    pub fn dependencies(&self) -> Result<Vec<Dependency>> {
        self.names()
            .iter()
            .filter_map(|name| self.dependency(name).transpose())
            .collect()
    }

    /// One declared dependency by key.
    pub fn dependency(&self, name: &str) -> Result<Option<Dependency>> {
        let Some(raw) = self.entries().and_then(|entries| entries.get(name)) else {
            return Ok(None);
        };
        let Value::Object(raw) = raw else {
            return Err(Error::validation(name, "declaration must be a table"));
        };

        let mut merged = raw.clone();
        if let Some(defaults) = self.defaults() {
            for (key, value) in defaults {
                if !merged.contains_key(key) {
                    merged.insert(key.clone(), value.clone());
                }
            }
        }

        let mut dependency: Dependency = serde_json::from_value(Value::Object(merged))
            .map_err(|e| Error::validation(name, e.to_string()))?;
        dependency.name = Some(name.to_string());
        Ok(Some(dependency))
    }

    /// Version currently written in the manifest for `name`.
    pub fn recorded_version(&self, name: &str) -> Option<String> {
        self.entries()
            .and_then(|entries| entries.get(name))
            .and_then(|entry| entry.get("version"))
            .and_then(Value::as_str)
            .map(str::to_string)
    }

    /// Set the version of an existing entry, leaving its other keys as written.
    ///
    /// Returns `false` when the manifest has no entry for `name`.
    pub fn record_version(&mut self, name: &str, version: &str) -> bool {
        let entries = self.document.table_mut(DEPENDENCIES_KEY);
        match entries.get_mut(name).and_then(Value::as_object_mut) {
            Some(entry) => {
                entry.insert("version".to_string(), Value::String(version.to_string()));
                true
            }
            None => false,
        }
    }

    /// Add or replace a whole entry, keyed by the dependency's effective name.
    pub fn insert_dependency(&mut self, dependency: &Dependency) -> Result<()> {
        let name = dependency.effective_name();
        let value = serde_json::to_value(Dependency {
            name: None,
            ..dependency.clone()
        })?;
        self.document
            .table_mut(DEPENDENCIES_KEY)
            .insert(name, value);
        Ok(())
    }

    /// Drop an entry. Returns whether it existed.
    pub fn remove_dependency(&mut self, name: &str) -> bool {
        if !self.contains(name) {
            return false;
        }
        self.document
            .table_mut(DEPENDENCIES_KEY)
            .shift_remove(name)
            .is_some()
    }

    /// Persist the manifest in its original format and style.
    pub fn save(&self) -> Result<()> {
        self.document.save()?;
        Ok(())
    }
}
