//! Update oracle: is the materialized state of a dependency stale?

use std::fmt;
use std::path::{Path, PathBuf};

use crate::files::{FileSpec, normalize};
use crate::lockfile::{self, LockEntry};
use crate::manifest::Manifest;
use crate::paths::{dependency_folder, lockfile_path};

/// The dependency being evaluated.
#[derive(Debug, Clone)]
pub struct Candidate<'a> {
    pub name: &'a str,
    pub folder: &'a Path,
    pub files: &'a [FileSpec],
    pub declared_version: Option<&'a str>,
    pub target_version: &'a str,
}

/// Why a dependency does or does not need materializing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Staleness {
    Fresh,
    NotInstalled,
    VersionChanged { recorded: String, target: String },
    MissingFile(PathBuf),
    ShapeChanged,
}

impl Staleness {
    pub fn is_stale(&self) -> bool {
        !matches!(self, Self::Fresh)
    }
}

impl fmt::Display for Staleness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fresh => write!(f, "up to date"),
            Self::NotInstalled => write!(f, "no lockfile entry"),
            Self::VersionChanged { recorded, target } => {
                write!(f, "locked at {recorded}, target is {target}")
            }
            Self::MissingFile(path) => write!(f, "{} is missing", path.display()),
            Self::ShapeChanged => write!(f, "declared files differ from the lockfile"),
        }
    }
}

/// Evaluate the staleness rules in order, stopping at the first hit.
///
/// The file-presence check sweeps every dependency in the manifest, not just
/// `candidate`, so files deleted out of band anywhere trigger a refresh.
pub fn evaluate(manifest: &Manifest, candidate: &Candidate<'_>) -> Staleness {
    let lock_path = lockfile_path(candidate.folder);
    let Some(entry) = lockfile::read_entry(&lock_path, candidate.name) else {
        return Staleness::NotInstalled;
    };

    if entry.version != candidate.target_version {
        return Staleness::VersionChanged {
            recorded: entry.version,
            target: candidate.target_version.to_string(),
        };
    }

    if let Some(missing) = first_missing_file(manifest, candidate, &entry) {
        return Staleness::MissingFile(missing);
    }

    if normalize(candidate.files, candidate.target_version).lock_shape != entry.files {
        return Staleness::ShapeChanged;
    }

    Staleness::Fresh
}

pub fn needs_update(manifest: &Manifest, candidate: &Candidate<'_>) -> bool {
    let staleness = evaluate(manifest, candidate);
    tracing::debug!(dependency = candidate.name, reason = %staleness, "Evaluated staleness");
    staleness.is_stale()
}

fn first_missing_file(
    manifest: &Manifest,
    candidate: &Candidate<'_>,
    entry: &LockEntry,
) -> Option<PathBuf> {
    let own_version = candidate.declared_version.unwrap_or(&entry.version);
    let own = missing_in(candidate.folder, candidate.files, own_version);
    if own.is_some() {
        return own;
    }

    for name in manifest.names() {
        if name == candidate.name {
            continue;
        }
        let dependency = match manifest.dependency(&name) {
            Ok(Some(dependency)) => dependency,
            Ok(None) => continue,
            Err(e) => {
                tracing::debug!(dependency = %name, error = %e, "Skipping invalid declaration in sweep");
                continue;
            }
        };
        let folder = dependency_folder(&dependency, manifest.config(), manifest.path(), &name);
        let version = match dependency.version.clone() {
            Some(version) => version,
            None => lockfile::read_entry(&lockfile_path(&folder), &name)
                .map(|e| e.version)
                .unwrap_or_default(),
        };
        if let Some(missing) = missing_in(&folder, &dependency.files, &version) {
            return Some(missing);
        }
    }
    None
}

fn missing_in(folder: &Path, files: &[FileSpec], version: &str) -> Option<PathBuf> {
    normalize(files, version)
        .flat_names
        .into_iter()
        .map(|name| folder.join(name))
        .find(|path| !path.exists())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lockfile::write_entry;
    use serde_json::json;
    use tempfile::TempDir;
    use vendor_fs::Document;

    struct Fixture {
        _temp: TempDir,
        manifest: Manifest,
        folder: PathBuf,
    }

    fn fixture(files: serde_json::Value) -> Fixture {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("vendor.json");
        let content = json!({"vendorDependencies": {"w": {"repository": "acme/widget", "files": files}}});
        std::fs::write(&path, content.to_string()).unwrap();
        let manifest = Manifest::load(&path).unwrap();
        let folder = temp.path().join("vendor/w");
        Fixture {
            _temp: temp,
            manifest,
            folder,
        }
    }

    fn install(fx: &Fixture, specs: &[FileSpec], version: &str) {
        let shape = normalize(specs, version);
        for name in &shape.flat_names {
            let path = fx.folder.join(name);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, "x").unwrap();
        }
        write_entry(
            &lockfile_path(&fx.folder),
            "w",
            LockEntry {
                version: version.into(),
                repository: "acme/widget".into(),
                files: shape.lock_shape,
            },
        )
        .unwrap();
    }

    fn candidate<'a>(fx: &'a Fixture, files: &'a [FileSpec], target: &'a str) -> Candidate<'a> {
        Candidate {
            name: "w",
            folder: &fx.folder,
            files,
            declared_version: None,
            target_version: target,
        }
    }

    #[test]
    fn not_installed_without_entry() {
        let fx = fixture(json!(["README.md"]));
        let files = vec![FileSpec::Path("README.md".into())];
        assert_eq!(evaluate(&fx.manifest, &candidate(&fx, &files, "1.0.0")), Staleness::NotInstalled);
    }

    #[test]
    fn fresh_after_install_and_stale_on_new_version() {
        let fx = fixture(json!(["README.md"]));
        let files = vec![FileSpec::Path("README.md".into())];
        install(&fx, &files, "1.0.0");

        assert_eq!(evaluate(&fx.manifest, &candidate(&fx, &files, "1.0.0")), Staleness::Fresh);
        assert!(matches!(
            evaluate(&fx.manifest, &candidate(&fx, &files, "1.1.0")),
            Staleness::VersionChanged { .. }
        ));
    }

    #[test]
    fn stale_when_rename_changes() {
        let fx = fixture(json!([{"README.md": "docs.md"}]));
        let before = vec![FileSpec::Rename {
            remote: "README.md".into(),
            local: "docs.md".into(),
        }];
        install(&fx, &before, "1.0.0");
        // keep the file the new declaration expects on disk so only the shape differs
        std::fs::write(fx.folder.join("guide.md"), "x").unwrap();

        let after = vec![FileSpec::Rename {
            remote: "README.md".into(),
            local: "guide.md".into(),
        }];
        assert!(needs_update(&fx.manifest, &candidate(&fx, &after, "1.0.0")));
        assert_eq!(
            evaluate(&fx.manifest, &candidate(&fx, &after, "1.0.0")),
            Staleness::ShapeChanged
        );
    }

    #[test]
    fn stale_when_file_deleted() {
        let fx = fixture(json!(["README.md"]));
        let files = vec![FileSpec::Path("README.md".into())];
        install(&fx, &files, "1.0.0");
        std::fs::remove_file(fx.folder.join("README.md")).unwrap();

        assert_eq!(
            evaluate(&fx.manifest, &candidate(&fx, &files, "1.0.0")),
            Staleness::MissingFile(fx.folder.join("README.md"))
        );
    }

    #[test]
    fn sweep_covers_other_dependencies() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("vendor.json");
        let content = json!({"vendorDependencies": {
            "w": {"repository": "acme/widget", "files": ["README.md"]},
            "g": {"repository": "acme/gadget", "files": ["g.txt"], "version": "2.0.0"}
        }});
        std::fs::write(&path, content.to_string()).unwrap();
        let manifest = Manifest::from_document(Document::load(&path).unwrap()).unwrap();

        let folder = temp.path().join("vendor/w");
        std::fs::create_dir_all(&folder).unwrap();
        std::fs::write(folder.join("README.md"), "x").unwrap();
        let files = vec![FileSpec::Path("README.md".into())];
        write_entry(
            &lockfile_path(&folder),
            "w",
            LockEntry {
                version: "1.0.0".into(),
                repository: "acme/widget".into(),
                files: normalize(&files, "1.0.0").lock_shape,
            },
        )
        .unwrap();

        let c = Candidate {
            name: "w",
            folder: &folder,
            files: &files,
            declared_version: None,
            target_version: "1.0.0",
        };
        assert_eq!(
            evaluate(&manifest, &c),
            Staleness::MissingFile(temp.path().join("vendor/g/g.txt"))
        );

        std::fs::create_dir_all(temp.path().join("vendor/g")).unwrap();
        std::fs::write(temp.path().join("vendor/g/g.txt"), "x").unwrap();
        assert_eq!(evaluate(&manifest, &c), Staleness::Fresh);
    }
}
