//! Dependency folder resolution

use std::path::{Component, Path, PathBuf};

use crate::manifest::{Dependency, VendorConfig};

/// Lockfile name inside every dependency folder.
pub const LOCKFILE_NAME: &str = "vendor-lock.json";

/// Placeholder in a `vendorFolder` override replaced by the global folder.
pub const VENDOR_FOLDER_PLACEHOLDER: &str = "{vendorFolder}";

/// Folder a dependency is materialized into.
///
/// With an override, `{vendorFolder}` is substituted and the result is used
/// as is, relative to the manifest's directory. Without one the folder is
/// `<manifest dir>/<vendorFolder>/<name>`, where `backup_name` stands in for
/// a dependency that has no name yet.
pub fn dependency_folder(
    dependency: &Dependency,
    config: &VendorConfig,
    manifest_path: &Path,
    backup_name: &str,
) -> PathBuf {
    let base = manifest_dir(manifest_path);
    match dependency.vendor_folder.as_deref() {
        Some(folder) => clean(&base.join(
            folder.replace(VENDOR_FOLDER_PLACEHOLDER, &config.vendor_folder),
        )),
        None => {
            let name = dependency
                .name
                .as_deref()
                .filter(|n| !n.is_empty())
                .unwrap_or(backup_name);
            default_folder(config, manifest_path, name)
        }
    }
}

/// Conventional folder for `name`, ignoring any override.
pub fn default_folder(config: &VendorConfig, manifest_path: &Path, name: &str) -> PathBuf {
    clean(&manifest_dir(manifest_path).join(&config.vendor_folder).join(name))
}

pub fn lockfile_path(folder: &Path) -> PathBuf {
    folder.join(LOCKFILE_NAME)
}

fn manifest_dir(manifest_path: &Path) -> &Path {
    manifest_path.parent().unwrap_or_else(|| Path::new(""))
}

/// Drop `.` components so `./vendor` and `vendor` resolve to the same path.
fn clean(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn dep(name: Option<&str>, folder: Option<&str>) -> Dependency {
        Dependency {
            name: name.map(str::to_string),
            vendor_folder: folder.map(str::to_string),
            ..Default::default()
        }
    }

    #[rstest]
    #[case(Some("widget"), None, "/proj/vendor/widget")]
    #[case(None, None, "/proj/vendor/backup")]
    #[case(Some("widget"), Some("{vendorFolder}/shared"), "/proj/vendor/shared")]
    #[case(Some("widget"), Some("./third_party"), "/proj/third_party")]
    fn resolves_folders(
        #[case] name: Option<&str>,
        #[case] folder: Option<&str>,
        #[case] expected: &str,
    ) {
        let config = VendorConfig::default();
        let resolved =
            dependency_folder(&dep(name, folder), &config, Path::new("/proj/vendor.toml"), "backup");
        assert_eq!(resolved, PathBuf::from(expected));
    }

    #[test]
    fn custom_vendor_folder() {
        let config = VendorConfig {
            vendor_folder: "libs".into(),
        };
        assert_eq!(
            default_folder(&config, Path::new("/proj/package.json"), "a"),
            PathBuf::from("/proj/libs/a")
        );
    }

    #[test]
    fn lockfile_lives_in_folder() {
        assert_eq!(
            lockfile_path(Path::new("/proj/vendor/a")),
            PathBuf::from("/proj/vendor/a/vendor-lock.json")
        );
    }
}
