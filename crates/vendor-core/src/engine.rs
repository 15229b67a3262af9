//! Reconciliation engine
//!
//! The [`Engine`] owns a loaded [`Manifest`] and drives dependencies through
//! resolve → evaluate → materialize → commit, one dependency at a time. The
//! manifest and lockfiles are whole-file rewrites, so nothing here runs two
//! dependencies concurrently.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use vendor_fs::io::{remove_dir_if_empty, remove_file_and_empty_parents};

use crate::files::{flatten, normalize};
use crate::lockfile::{self, LockEntry, Removal};
use crate::manifest::{Dependency, Manifest};
use crate::materialize::Materializer;
use crate::oracle::{self, Candidate};
use crate::paths::{default_folder, dependency_folder, lockfile_path};
use crate::provider::SourceProvider;
use crate::resolve::{Resolver, VersionRequest};
use crate::{Error, Result};

/// Options for a single install
#[derive(Debug, Clone, Default)]
pub struct InstallOptions {
    /// Look for the newest version instead of the pinned one
    pub update: bool,
    /// Skip the staleness check and always re-materialize
    pub force: bool,
    /// Only compare against the newest version; never write
    pub report_only: bool,
    /// Explicit version to install
    pub version: Option<String>,
}

/// Options for a sync over the whole manifest
#[derive(Debug, Clone, Copy, Default)]
pub struct SyncOptions {
    pub update: bool,
    pub force: bool,
    pub report_only: bool,
}

impl From<SyncOptions> for InstallOptions {
    fn from(options: SyncOptions) -> Self {
        Self {
            update: options.update,
            force: options.force,
            report_only: options.report_only,
            version: None,
        }
    }
}

/// How one install ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// First materialization into this folder
    Installed { name: String, version: String },
    /// Materialized a different version than the lockfile recorded
    Updated {
        name: String,
        from: String,
        to: String,
    },
    /// Re-materialized the same version (files or declaration drifted, or forced)
    Refreshed { name: String, version: String },
    UpToDate { name: String, version: String },
    /// Report-only: a newer version exists
    Outdated {
        name: String,
        current: Option<String>,
        latest: String,
    },
    /// Report-only: no version could be resolved
    Skipped { name: String, reason: String },
}

impl Outcome {
    pub fn name(&self) -> &str {
        match self {
            Self::Installed { name, .. }
            | Self::Updated { name, .. }
            | Self::Refreshed { name, .. }
            | Self::UpToDate { name, .. }
            | Self::Outdated { name, .. }
            | Self::Skipped { name, .. } => name,
        }
    }

    /// Whether files were written
    pub fn changed(&self) -> bool {
        matches!(
            self,
            Self::Installed { .. } | Self::Updated { .. } | Self::Refreshed { .. }
        )
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Installed { name, version } => write!(f, "Installed {name} {version}"),
            Self::Updated { name, from, to } => write!(f, "Updated {name} from {from} to {to}"),
            Self::Refreshed { name, version } => write!(f, "Refreshed {name} {version}"),
            Self::UpToDate { name, .. } => write!(f, "{name} is up to date"),
            Self::Outdated {
                name,
                current,
                latest,
            } => write!(
                f,
                "{name} {} -> {latest}",
                current.as_deref().unwrap_or("(not installed)")
            ),
            Self::Skipped { name, reason } => write!(f, "Skipped {name}: {reason}"),
        }
    }
}

/// A version change recorded by an update run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionChange {
    pub name: String,
    pub from: Option<String>,
    pub to: String,
}

/// A dependency that failed inside a batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncFailure {
    pub name: String,
    pub error: String,
}

/// Report from a sync over the whole manifest
#[derive(Debug, Clone, Default)]
pub struct SyncReport {
    /// One outcome per dependency that did not fail, in manifest order
    pub outcomes: Vec<Outcome>,
    /// Version changes (update mode only)
    pub changes: Vec<VersionChange>,
    /// Dependencies whose reconciliation failed
    pub failures: Vec<SyncFailure>,
}

impl SyncReport {
    pub fn success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Report-only findings
    pub fn outdated(&self) -> impl Iterator<Item = &Outcome> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, Outcome::Outdated { .. }))
    }
}

/// Report from an uninstall
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UninstallReport {
    pub name: String,
    pub folder: PathBuf,
    /// Paths (relative to `folder`) that were deleted if present
    pub files: Vec<String>,
    /// The subset of `files` that actually existed and was deleted
    pub removed: Vec<String>,
    pub lockfile_deleted: bool,
    pub folder_removed: bool,
    pub removed_from_manifest: bool,
}

pub struct Engine {
    manifest: Manifest,
    resolver: Arc<Resolver>,
    temp_root: Option<PathBuf>,
}

impl Engine {
    pub fn new(manifest: Manifest, provider: Arc<dyn SourceProvider>) -> Self {
        Self {
            manifest,
            resolver: Arc::new(Resolver::new(provider)),
            temp_root: None,
        }
    }

    /// Put archive scratch directories under `root`.
    pub fn with_temp_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.temp_root = Some(root.into());
        self
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn resolver(&self) -> &Arc<Resolver> {
        &self.resolver
    }

    /// Reconcile one dependency.
    ///
    /// The dependency does not have to be declared in the manifest yet; when
    /// it is not, a successful install adds it.
    pub async fn install(
        &mut self,
        dependency: &Dependency,
        options: &InstallOptions,
    ) -> Result<Outcome> {
        dependency.validate()?;
        let name = dependency.effective_name();
        let repo = dependency.repo()?;
        let folder = dependency_folder(
            dependency,
            self.manifest.config(),
            self.manifest.path(),
            &name,
        );
        let lock_path = lockfile_path(&folder);
        let previous = lockfile::read_entry(&lock_path, &name);

        let request = VersionRequest {
            forced: options.version.as_deref(),
            update: options.update || options.report_only,
        };
        let version = match self.resolver.resolve(&name, dependency, &repo, request).await {
            Ok(version) => version,
            Err(e) if options.report_only => {
                tracing::debug!(dependency = %name, error = %e, "Skipping unresolvable dependency");
                return Ok(Outcome::Skipped {
                    name,
                    reason: e.to_string(),
                });
            }
            Err(e) => return Err(e),
        };

        if options.report_only {
            let current = previous
                .map(|entry| entry.version)
                .or_else(|| dependency.version.clone());
            return Ok(if current.as_deref() == Some(version.as_str()) {
                Outcome::UpToDate { name, version }
            } else {
                Outcome::Outdated {
                    name,
                    current,
                    latest: version,
                }
            });
        }

        if !options.force {
            let candidate = Candidate {
                name: &name,
                folder: &folder,
                files: &dependency.files,
                declared_version: dependency.version.as_deref(),
                target_version: &version,
            };
            if !oracle::needs_update(&self.manifest, &candidate) {
                return Ok(Outcome::UpToDate { name, version });
            }
        }

        tokio::fs::create_dir_all(&folder)
            .await
            .map_err(|e| Error::io(&folder, e))?;
        if let Some(previous) = &previous {
            for file in flatten(&previous.files) {
                if let Err(e) = remove_file_and_empty_parents(&folder, &file) {
                    tracing::warn!(dependency = %name, file = %file, error = %e, "Could not delete stale file");
                }
            }
        }

        let shape = normalize(&dependency.files, &version);
        Materializer::new(Arc::clone(&self.resolver))
            .with_temp_root(self.temp_root.clone())
            .run(&repo, &version, &folder, &shape.lock_shape)
            .await?;

        lockfile::write_entry(
            &lock_path,
            &name,
            LockEntry {
                version: version.clone(),
                repository: dependency.repository.clone(),
                files: shape.lock_shape,
            },
        )?;

        // An entry whose source or files differ from what was installed is
        // replaced wholesale; otherwise only its version is touched.
        let declared_as_installed = self
            .manifest
            .dependency(&name)
            .ok()
            .flatten()
            .is_some_and(|declared| {
                declared.repository == dependency.repository && declared.files == dependency.files
            });
        if !declared_as_installed {
            self.manifest.insert_dependency(&Dependency {
                name: Some(name.clone()),
                version: Some(version.clone()),
                ..dependency.clone()
            })?;
            self.manifest.save()?;
        } else if self.manifest.recorded_version(&name).as_deref() != Some(version.as_str()) {
            self.manifest.record_version(&name, &version);
            self.manifest.save()?;
        }

        let outcome = match previous {
            None => Outcome::Installed { name, version },
            Some(previous) if previous.version != version => Outcome::Updated {
                name,
                from: previous.version,
                to: version,
            },
            Some(_) => Outcome::Refreshed { name, version },
        };
        tracing::info!(dependency = outcome.name(), "{outcome}");
        Ok(outcome)
    }

    /// Reconcile every declared dependency in manifest order.
    ///
    /// Invalid declarations fail the whole call before any I/O. After that a
    /// failing dependency is recorded in the report and the batch continues.
    pub async fn sync(&mut self, options: SyncOptions) -> Result<SyncReport> {
        let dependencies = self.manifest.dependencies()?;
        self.sync_dependencies(dependencies, options).await
    }

    /// Like [`Engine::sync`], restricted to `names` in the order given.
    ///
    /// A name that is not declared fails the call before any I/O.
    pub async fn sync_named(&mut self, names: &[String], options: SyncOptions) -> Result<SyncReport> {
        let mut dependencies = Vec::with_capacity(names.len());
        for name in names {
            let dependency =
                self.manifest
                    .dependency(name)?
                    .ok_or_else(|| Error::UnknownDependency {
                        name: name.clone(),
                        manifest: self.manifest.path().to_path_buf(),
                    })?;
            dependencies.push(dependency);
        }
        self.sync_dependencies(dependencies, options).await
    }

    async fn sync_dependencies(
        &mut self,
        dependencies: Vec<Dependency>,
        options: SyncOptions,
    ) -> Result<SyncReport> {
        for dependency in &dependencies {
            dependency.validate()?;
        }

        let install_options = InstallOptions::from(options);
        let mut report = SyncReport::default();

        for dependency in &dependencies {
            let name = dependency.effective_name();
            let before = self.manifest.recorded_version(&name);

            match self.install(dependency, &install_options).await {
                Ok(outcome) => {
                    let after = self.manifest.recorded_version(&name);
                    if options.update
                        && let Some(to) = after
                        && before.as_deref() != Some(to.as_str())
                    {
                        report.changes.push(VersionChange {
                            name: name.clone(),
                            from: before,
                            to,
                        });
                    }
                    report.outcomes.push(outcome);
                }
                Err(e) => {
                    tracing::warn!(dependency = %name, error = %e, "Dependency failed");
                    report.failures.push(SyncFailure {
                        name,
                        error: e.to_string(),
                    });
                }
            }
        }

        Ok(report)
    }

    /// See [`uninstall`].
    pub fn uninstall(&mut self, name: &str) -> Result<UninstallReport> {
        uninstall(&mut self.manifest, name)
    }
}

/// Remove a dependency's files, lockfile entry and manifest declaration.
///
/// Works for dependencies that are only left in a lockfile, as long as
/// they live in the conventional folder. Needs no source provider.
pub fn uninstall(manifest: &mut Manifest, name: &str) -> Result<UninstallReport> {
    let declared = match manifest.dependency(name) {
        Ok(declared) => declared,
        Err(e) => {
            tracing::warn!(dependency = name, error = %e, "Ignoring invalid declaration");
            None
        }
    };
    let folder = match &declared {
        Some(dependency) => dependency_folder(
            dependency,
            manifest.config(),
            manifest.path(),
            name,
        ),
        None => default_folder(manifest.config(), manifest.path(), name),
    };
    let lock_path = lockfile_path(&folder);
    let locked = lockfile::read_entry(&lock_path, name);
    let in_manifest = manifest.contains(name);

    if !in_manifest && locked.is_none() {
        return Err(Error::UnknownDependency {
            name: name.to_string(),
            manifest: manifest.path().to_path_buf(),
        });
    }

    let mut files = locked
        .as_ref()
        .map(|entry| flatten(&entry.files))
        .unwrap_or_default();
    if let Some(dependency) = &declared {
        let version = dependency
            .version
            .clone()
            .or_else(|| locked.as_ref().map(|entry| entry.version.clone()))
            .unwrap_or_default();
        for file in normalize(&dependency.files, &version).flat_names {
            if !files.contains(&file) {
                files.push(file);
            }
        }
    }

    let mut removed = Vec::new();
    for file in &files {
        match remove_file_and_empty_parents(&folder, file) {
            Ok(true) => removed.push(file.clone()),
            Ok(false) => {}
            Err(e) => {
                tracing::warn!(dependency = name, file = %file, error = %e, "Could not delete file");
            }
        }
    }

    let removal = match lockfile::remove_entry(&lock_path, name) {
        Ok(removal) => removal,
        Err(e) => {
            tracing::warn!(path = %lock_path.display(), error = %e, "Could not update lockfile");
            Removal::Absent
        }
    };
    let folder_removed = match removal {
        Removal::Removed => false,
        Removal::Absent | Removal::LockfileDeleted => match remove_dir_if_empty(&folder) {
            Ok(gone) => gone,
            Err(e) => {
                tracing::warn!(folder = %folder.display(), error = %e, "Could not remove folder");
                false
            }
        },
    };

    let removed_from_manifest = manifest.remove_dependency(name);
    if removed_from_manifest {
        manifest.save()?;
    }

    tracing::info!(dependency = name, files = removed.len(), "Uninstalled");
    Ok(UninstallReport {
        name: name.to_string(),
        folder,
        files,
        removed,
        lockfile_deleted: removal == Removal::LockfileDeleted,
        folder_removed,
        removed_from_manifest,
    })
}
