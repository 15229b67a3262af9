//! Remote source seam
//!
//! The engine never talks to the network directly. Everything it needs from
//! a hosting service goes through [`SourceProvider`]; the GitHub client lives
//! in its own crate and tests use an in-memory fake.

use async_trait::async_trait;
use regex::Regex;
use tokio::io::AsyncWrite;

use crate::Result;
use crate::repository::RepoId;

/// Byte sink file content is streamed into.
pub type Sink<'a> = dyn AsyncWrite + Send + Unpin + 'a;

/// A published release and its downloadable assets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Release {
    pub tag: String,
    pub assets: Vec<Asset>,
}

impl Release {
    pub fn asset(&self, name: &str) -> Option<&Asset> {
        self.assets.iter().find(|asset| asset.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    pub name: String,
    pub id: u64,
}

/// Repository found by name search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub owner: String,
    pub name: String,
    pub url: String,
}

/// Operations the engine consumes from a hosting service.
///
/// Missing artifacts must be reported as [`crate::Error::NotFound`] so the
/// engine can tell them apart from transport failures.
#[async_trait]
pub trait SourceProvider: Send + Sync {
    /// Stream the file at `path` as of `git_ref` into `sink`.
    async fn get_file_content(
        &self,
        repo: &RepoId,
        path: &str,
        git_ref: &str,
        sink: &mut Sink<'_>,
    ) -> Result<()>;

    /// Newest release, or the newest whose tag matches `tag_pattern`.
    async fn get_latest_release(
        &self,
        repo: &RepoId,
        tag_pattern: Option<&Regex>,
    ) -> Result<Release>;

    async fn get_release_by_tag(&self, repo: &RepoId, tag: &str) -> Result<Release>;

    /// Hash of the latest commit touching `path`.
    async fn get_file_commit_hash(&self, repo: &RepoId, path: &str) -> Result<String>;

    async fn download_release_asset(
        &self,
        repo: &RepoId,
        asset_id: u64,
        sink: &mut Sink<'_>,
    ) -> Result<()>;

    /// Find a repository whose name matches `name` exactly (case-insensitive).
    async fn search_repository(&self, name: &str) -> Result<SearchHit>;
}
