//! [`TestProject`]: a temporary project directory with a manifest.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// Scratch directory name handed to the engine for archive extraction.
const SCRATCH_DIR: &str = ".scratch";

/// A temporary project root with helpers for writing manifests and
/// inspecting vendored output.
///
/// # Example
///
/// ```rust,no_run
/// use vendor_test_utils::TestProject;
///
/// let project = TestProject::new();
/// let manifest = project.write_manifest(
///     "vendor.json",
///     r#"{"vendorDependencies": {"widget": {"repository": "acme/widget", "files": ["README.md"]}}}"#,
/// );
/// assert!(manifest.exists());
/// ```
pub struct TestProject {
    temp_dir: TempDir,
}

impl Default for TestProject {
    fn default() -> Self {
        Self::new()
    }
}

impl TestProject {
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().unwrap(),
        }
    }

    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.root().join(relative)
    }

    /// Write a manifest file and return its path.
    pub fn write_manifest(&self, file_name: &str, content: &str) -> PathBuf {
        let path = self.path(file_name);
        fs::write(&path, content).unwrap();
        path
    }

    pub fn write(&self, relative: &str, content: &str) {
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    pub fn read(&self, relative: &str) -> String {
        fs::read_to_string(self.path(relative))
            .unwrap_or_else(|e| panic!("TestProject::read {relative}: {e}"))
    }

    pub fn read_json(&self, relative: &str) -> serde_json::Value {
        serde_json::from_str(&self.read(relative)).unwrap()
    }

    pub fn exists(&self, relative: &str) -> bool {
        self.path(relative).exists()
    }

    pub fn remove(&self, relative: &str) {
        fs::remove_file(self.path(relative)).unwrap();
    }

    /// Directory to pass to `Engine::with_temp_root`.
    pub fn scratch(&self) -> PathBuf {
        self.path(SCRATCH_DIR)
    }

    /// Entries left behind in [`Self::scratch`].
    pub fn scratch_leftovers(&self) -> Vec<PathBuf> {
        match fs::read_dir(self.scratch()) {
            Ok(entries) => entries.filter_map(|e| e.ok()).map(|e| e.path()).collect(),
            Err(_) => Vec::new(),
        }
    }
}
