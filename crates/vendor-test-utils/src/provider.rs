//! In-memory [`SourceProvider`] for engine tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use regex::Regex;
use tokio::io::AsyncWriteExt;
use vendor_core::{Asset, Error, Release, RepoId, Result, SearchHit, Sink, SourceProvider};

#[derive(Default)]
struct State {
    /// (repo, ref, path) -> content
    files: HashMap<(String, String, String), Vec<u8>>,
    /// repo -> releases, newest first
    releases: HashMap<String, Vec<Release>>,
    assets: HashMap<u64, Vec<u8>>,
    /// (repo, path) -> commit hash
    hashes: HashMap<(String, String), String>,
    repositories: Vec<SearchHit>,
    next_asset_id: u64,
    failure: Option<String>,
}

/// A fake hosting service.
///
/// Repositories are addressed as `"owner/name"`. Every trait call is
/// counted so tests can assert that a no-op install made no requests.
#[derive(Default)]
pub struct FakeProvider {
    state: Mutex<State>,
    requests: AtomicUsize,
    downloads: AtomicUsize,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `content` for `path` at `git_ref`.
    pub fn add_file(&self, repo: &str, git_ref: &str, path: &str, content: impl Into<Vec<u8>>) {
        self.state.lock().unwrap().files.insert(
            (repo.to_string(), git_ref.to_string(), path.to_string()),
            content.into(),
        );
    }

    /// Publish a release; the most recently added one is the latest.
    pub fn add_release(&self, repo: &str, tag: &str, assets: &[(&str, Vec<u8>)]) {
        let mut state = self.state.lock().unwrap();
        let mut release = Release {
            tag: tag.to_string(),
            assets: Vec::new(),
        };
        for (name, content) in assets {
            state.next_asset_id += 1;
            let id = state.next_asset_id;
            state.assets.insert(id, content.clone());
            release.assets.push(Asset {
                name: name.to_string(),
                id,
            });
        }
        state
            .releases
            .entry(repo.to_string())
            .or_default()
            .insert(0, release);
    }

    pub fn set_commit_hash(&self, repo: &str, path: &str, hash: &str) {
        self.state
            .lock()
            .unwrap()
            .hashes
            .insert((repo.to_string(), path.to_string()), hash.to_string());
    }

    pub fn add_repository(&self, owner: &str, name: &str) {
        self.state.lock().unwrap().repositories.push(SearchHit {
            owner: owner.to_string(),
            name: name.to_string(),
            url: format!("https://github.com/{owner}/{name}"),
        });
    }

    /// Make every subsequent call fail with a transport error.
    pub fn fail_with(&self, message: &str) {
        self.state.lock().unwrap().failure = Some(message.to_string());
    }

    /// Total trait calls made so far.
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    /// File and asset downloads made so far.
    pub fn download_count(&self) -> usize {
        self.downloads.load(Ordering::SeqCst)
    }

    fn begin(&self, repo: &str) -> Result<()> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        match &self.state.lock().unwrap().failure {
            Some(message) => Err(Error::Provider {
                repository: repo.to_string(),
                message: message.clone(),
            }),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl SourceProvider for FakeProvider {
    async fn get_file_content(
        &self,
        repo: &RepoId,
        path: &str,
        git_ref: &str,
        sink: &mut Sink<'_>,
    ) -> Result<()> {
        let key = repo.to_string();
        self.begin(&key)?;
        self.downloads.fetch_add(1, Ordering::SeqCst);
        let content = self
            .state
            .lock()
            .unwrap()
            .files
            .get(&(key.clone(), git_ref.to_string(), path.to_string()))
            .cloned()
            .ok_or_else(|| Error::not_found(format!("File \"{path}\""), key.clone()))?;
        sink.write_all(&content)
            .await
            .map_err(|e| Error::io(path, e))
    }

    async fn get_latest_release(
        &self,
        repo: &RepoId,
        tag_pattern: Option<&Regex>,
    ) -> Result<Release> {
        let key = repo.to_string();
        self.begin(&key)?;
        let state = self.state.lock().unwrap();
        state
            .releases
            .get(&key)
            .and_then(|releases| {
                releases
                    .iter()
                    .find(|r| tag_pattern.is_none_or(|p| p.is_match(&r.tag)))
            })
            .cloned()
            .ok_or_else(|| Error::not_found("Latest release", key.clone()))
    }

    async fn get_release_by_tag(&self, repo: &RepoId, tag: &str) -> Result<Release> {
        let key = repo.to_string();
        self.begin(&key)?;
        let state = self.state.lock().unwrap();
        state
            .releases
            .get(&key)
            .and_then(|releases| releases.iter().find(|r| r.tag == tag))
            .cloned()
            .ok_or_else(|| Error::not_found(format!("Release \"{tag}\""), key.clone()))
    }

    async fn get_file_commit_hash(&self, repo: &RepoId, path: &str) -> Result<String> {
        let key = repo.to_string();
        self.begin(&key)?;
        self.state
            .lock()
            .unwrap()
            .hashes
            .get(&(key.clone(), path.to_string()))
            .cloned()
            .ok_or_else(|| Error::not_found(format!("Commit for \"{path}\""), key.clone()))
    }

    async fn download_release_asset(
        &self,
        repo: &RepoId,
        asset_id: u64,
        sink: &mut Sink<'_>,
    ) -> Result<()> {
        let key = repo.to_string();
        self.begin(&key)?;
        self.downloads.fetch_add(1, Ordering::SeqCst);
        let content = self
            .state
            .lock()
            .unwrap()
            .assets
            .get(&asset_id)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("Asset {asset_id}"), key.clone()))?;
        sink.write_all(&content)
            .await
            .map_err(|e| Error::io(format!("asset-{asset_id}"), e))
    }

    async fn search_repository(&self, name: &str) -> Result<SearchHit> {
        self.begin(name)?;
        self.state
            .lock()
            .unwrap()
            .repositories
            .iter()
            .find(|hit| hit.name.eq_ignore_ascii_case(name))
            .cloned()
            .ok_or_else(|| Error::not_found(format!("Repository \"{name}\""), "search results"))
    }
}
