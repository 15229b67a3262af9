//! Version resolution with a per-run release cache

use std::collections::HashMap;
use std::sync::Arc;

use regex::Regex;
use tokio::sync::Mutex;

use crate::manifest::{Dependency, HashVersionFile};
use crate::provider::{Release, SourceProvider};
use crate::repository::RepoId;
use crate::{Error, Result};

/// How the caller wants the version picked.
#[derive(Debug, Clone, Copy, Default)]
pub struct VersionRequest<'a> {
    /// Explicit version that wins over everything else
    pub forced: Option<&'a str>,
    /// Ignore the pinned version and look for the newest one
    pub update: bool,
}

/// Picks versions for dependencies, memoising provider lookups.
///
/// Release lookups are cached under `owner/name/latest`,
/// `owner/name/re:<pattern>` and `owner/name/tag:<tag>`, so dependencies that
/// share a repository cost one request per run.
pub struct Resolver {
    provider: Arc<dyn SourceProvider>,
    releases: Mutex<HashMap<String, Release>>,
    hashes: Mutex<HashMap<String, String>>,
}

impl Resolver {
    pub fn new(provider: Arc<dyn SourceProvider>) -> Self {
        Self {
            provider,
            releases: Mutex::new(HashMap::new()),
            hashes: Mutex::new(HashMap::new()),
        }
    }

    pub fn provider(&self) -> &Arc<dyn SourceProvider> {
        &self.provider
    }

    /// Pick the version to materialize.
    ///
    /// Order: forced version, pinned version (unless updating), commit hash
    /// of the `hashVersionFile`, newest release matching `releaseRegex`,
    /// newest release.
    pub async fn resolve(
        &self,
        name: &str,
        dependency: &Dependency,
        repo: &RepoId,
        request: VersionRequest<'_>,
    ) -> Result<String> {
        if let Some(forced) = request.forced {
            return Ok(forced.to_string());
        }
        if !request.update
            && let Some(pinned) = dependency.version.as_deref().filter(|v| !v.is_empty())
        {
            return Ok(pinned.to_string());
        }

        let resolution_error = |e: Error| Error::Resolution {
            name: name.to_string(),
            message: e.to_string(),
        };

        if let Some(path) = hash_version_path(dependency) {
            let path = path.ok_or_else(|| Error::Resolution {
                name: name.to_string(),
                message: "hashVersionFile is set but no repository file is declared".into(),
            })?;
            let hash = self.commit_hash(repo, &path).await.map_err(resolution_error)?;
            tracing::debug!(dependency = name, file = %path, %hash, "Resolved version from commit hash");
            return Ok(hash);
        }

        let pattern = dependency.release_pattern()?;
        let release = self
            .latest_release(repo, pattern.as_ref())
            .await
            .map_err(resolution_error)?;
        tracing::debug!(dependency = name, tag = %release.tag, "Resolved version from release");
        Ok(release.tag)
    }

    /// Newest release (optionally filtered by tag pattern), cached.
    pub async fn latest_release(&self, repo: &RepoId, pattern: Option<&Regex>) -> Result<Release> {
        let key = match pattern {
            Some(pattern) => format!("{repo}/re:{}", pattern.as_str()),
            None => format!("{repo}/latest"),
        };
        if let Some(release) = self.releases.lock().await.get(&key) {
            return Ok(release.clone());
        }

        let release = self.provider.get_latest_release(repo, pattern).await?;
        let mut cache = self.releases.lock().await;
        cache.insert(format!("{repo}/tag:{}", release.tag), release.clone());
        cache.insert(key, release.clone());
        Ok(release)
    }

    /// Release with the given tag, cached.
    pub async fn release_for_tag(&self, repo: &RepoId, tag: &str) -> Result<Release> {
        let key = format!("{repo}/tag:{tag}");
        if let Some(release) = self.releases.lock().await.get(&key) {
            return Ok(release.clone());
        }

        let release = self.provider.get_release_by_tag(repo, tag).await?;
        self.releases.lock().await.insert(key, release.clone());
        Ok(release)
    }

    async fn commit_hash(&self, repo: &RepoId, path: &str) -> Result<String> {
        let key = format!("{repo}/hash:{path}");
        if let Some(hash) = self.hashes.lock().await.get(&key) {
            return Ok(hash.clone());
        }

        let hash = self.provider.get_file_commit_hash(repo, path).await?;
        self.hashes.lock().await.insert(key, hash.clone());
        Ok(hash)
    }
}

/// `None` when hashing is off; `Some(None)` when it is on but no file qualifies.
fn hash_version_path(dependency: &Dependency) -> Option<Option<String>> {
    match &dependency.hash_version_file {
        HashVersionFile::Enabled(false) => None,
        HashVersionFile::Path(path) => Some(Some(path.clone())),
        HashVersionFile::Enabled(true) => Some(
            dependency
                .files
                .iter()
                .find(|spec| !spec.is_release())
                .map(|spec| spec.remote().to_string()),
        ),
    }
}
