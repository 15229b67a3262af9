//! Error types for vendor-core

use std::path::PathBuf;

/// Result type for vendor-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while reconciling vendored dependencies
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed declaration, reported before any I/O
    #[error("Invalid dependency '{name}': {message}")]
    Validation { name: String, message: String },

    /// No version could be determined for a dependency
    #[error("Could not find a version for {name}: {message}")]
    Resolution { name: String, message: String },

    /// A remote file, release or asset does not exist
    #[error("{artifact} was not found in {repository}")]
    NotFound { artifact: String, repository: String },

    /// An archive could not be unpacked or lacks a declared member
    #[error("Could not extract \"{archive}\": {message}")]
    Extraction { archive: String, message: String },

    /// The source provider failed for a reason other than a missing artifact
    #[error("Request to {repository} failed: {message}")]
    Provider { repository: String, message: String },

    /// Operation targeted a dependency that is neither declared nor locked
    #[error("Dependency {name} not found in {manifest}")]
    UnknownDependency { name: String, manifest: PathBuf },

    /// Lockfile exists but is not valid JSON of the expected shape
    #[error("Invalid lockfile at {path}: {source}")]
    Lockfile {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A background task panicked or was cancelled
    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    // Transparent wrappers for underlying crate errors
    /// Filesystem error from vendor-fs
    #[error(transparent)]
    Fs(#[from] vendor_fs::Error),

    /// JSON serialization/deserialization error
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn validation(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            name: name.into(),
            message: message.into(),
        }
    }

    pub fn not_found(artifact: impl Into<String>, repository: impl Into<String>) -> Self {
        Self::NotFound {
            artifact: artifact.into(),
            repository: repository.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
