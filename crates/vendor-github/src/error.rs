//! Error types for vendor-github

/// Result type for client construction
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while building a [`crate::GitHubClient`]
///
/// Request failures are reported as `vendor_core::Error` through the
/// `SourceProvider` implementation.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid GitHub API URL '{url}': {source}")]
    InvalidBaseUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("GitHub API URL '{0}' cannot have path segments appended")]
    UnsupportedBaseUrl(String),

    #[error("Failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}
