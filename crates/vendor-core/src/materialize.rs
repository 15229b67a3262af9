//! Fetch-and-place of a dependency's files
//!
//! Every lock shape entry becomes one task in a [`JoinSet`]. Repository files
//! are streamed straight to their first destination and copied to any
//! others. Release assets are either handled the same way or, for
//! extraction maps, downloaded into a scratch directory, unpacked on a
//! blocking thread and moved member by member. Every local path is joined
//! with [`vendor_fs::io::contained_path`], so nothing lands outside the
//! folder. The first failing task aborts the rest; files already written stay.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio::task::JoinSet;

use crate::archive;
use crate::files::{LockShape, LockTarget, release_asset_name};
use crate::provider::{Asset, Release, SourceProvider};
use crate::repository::RepoId;
use crate::resolve::Resolver;
use crate::{Error, Result};

/// Prefix of scratch directories used for archive extraction.
pub const TEMP_PREFIX: &str = "vendorfiles-";

pub struct Materializer {
    resolver: Arc<Resolver>,
    temp_root: Option<PathBuf>,
}

impl Materializer {
    pub fn new(resolver: Arc<Resolver>) -> Self {
        Self {
            resolver,
            temp_root: None,
        }
    }

    /// Create scratch directories under `root` instead of the system temp dir.
    pub fn with_temp_root(mut self, root: Option<PathBuf>) -> Self {
        self.temp_root = root;
        self
    }

    /// Materialize `shape` for `version` of `repo` into `folder`.
    pub async fn run(
        &self,
        repo: &RepoId,
        version: &str,
        folder: &Path,
        shape: &LockShape,
    ) -> Result<()> {
        let release = if shape.keys().any(|remote| release_asset_name(remote).is_some()) {
            Some(self.release(repo, version).await?)
        } else {
            None
        };

        let provider = self.resolver.provider();
        let mut tasks = JoinSet::new();

        for (remote, target) in shape {
            let job = Job {
                provider: Arc::clone(provider),
                repo: repo.clone(),
                folder: folder.to_path_buf(),
            };

            match (release_asset_name(remote), target) {
                (None, LockTarget::Archive(_)) => {
                    return Err(Error::Extraction {
                        archive: remote.clone(),
                        message: "only {release}/ assets can be extracted".into(),
                    });
                }
                (None, target) => {
                    let remote = remote.clone();
                    let git_ref = version.to_string();
                    let dests = destinations(folder, target)?;
                    tasks.spawn(async move { job.fetch_file(remote, git_ref, dests).await });
                }
                (Some(name), target) => {
                    let asset = find_asset(release.as_ref(), name, version, repo)?;
                    match target {
                        LockTarget::File(_) | LockTarget::Files(_) => {
                            let dests = destinations(folder, target)?;
                            tasks.spawn(async move { job.fetch_asset(asset, dests).await });
                        }
                        LockTarget::Archive(members) => {
                            let members = members.clone();
                            let temp_root = self.temp_root.clone();
                            tasks.spawn(async move { job.extract(asset, members, temp_root).await });
                        }
                    }
                }
            }
        }

        while let Some(joined) = tasks.join_next().await {
            joined??;
        }
        Ok(())
    }

    async fn release(&self, repo: &RepoId, version: &str) -> Result<Release> {
        self.resolver
            .release_for_tag(repo, version)
            .await
            .map_err(|e| {
                if e.is_not_found() {
                    Error::not_found(format!("Release \"{version}\""), repo.url())
                } else {
                    e
                }
            })
    }
}

/// Absolute destinations of a file target, first one fetched into.
fn destinations(folder: &Path, target: &LockTarget) -> Result<Vec<PathBuf>> {
    target
        .destinations()
        .into_iter()
        .map(|local| vendor_fs::io::contained_path(folder, local).map_err(Error::from))
        .collect()
}

fn find_asset(release: Option<&Release>, name: &str, version: &str, repo: &RepoId) -> Result<Asset> {
    release
        .and_then(|release| release.asset(name))
        .cloned()
        .ok_or_else(|| {
            Error::not_found(
                format!("Release asset \"{name}\" for {version}"),
                repo.url(),
            )
        })
}

/// State shared by one spawned fetch.
struct Job {
    provider: Arc<dyn SourceProvider>,
    repo: RepoId,
    folder: PathBuf,
}

impl Job {
    async fn fetch_file(self, remote: String, git_ref: String, dests: Vec<PathBuf>) -> Result<()> {
        let Some((dest, copies)) = dests.split_first() else {
            return Ok(());
        };
        let mut file = create_file(dest).await?;
        let fetched = self
            .provider
            .get_file_content(&self.repo, &remote, &git_ref, &mut file)
            .await
            .map_err(|e| {
                if e.is_not_found() {
                    Error::not_found(format!("File \"{remote}\" at {git_ref}"), self.repo.url())
                } else {
                    e
                }
            });
        finish(file, dest, fetched).await?;
        tracing::info!(repository = %self.repo, file = %remote, dest = %dest.display(), "Fetched file");
        copy_to(dest, copies).await
    }

    async fn fetch_asset(self, asset: Asset, dests: Vec<PathBuf>) -> Result<()> {
        let Some((dest, copies)) = dests.split_first() else {
            return Ok(());
        };
        let mut file = create_file(dest).await?;
        let fetched = self
            .provider
            .download_release_asset(&self.repo, asset.id, &mut file)
            .await;
        finish(file, dest, fetched).await?;
        tracing::info!(repository = %self.repo, asset = %asset.name, dest = %dest.display(), "Fetched release asset");
        copy_to(dest, copies).await
    }

    async fn extract(
        self,
        asset: Asset,
        members: BTreeMap<String, String>,
        temp_root: Option<PathBuf>,
    ) -> Result<()> {
        let scratch = scratch_dir(temp_root.as_deref())?;
        let archive_path = scratch.path().join(&asset.name);

        let mut file = create_file(&archive_path).await?;
        let downloaded = self
            .provider
            .download_release_asset(&self.repo, asset.id, &mut file)
            .await;
        finish(file, &archive_path, downloaded).await?;

        // The scratch dir moves into the blocking task so it outlives the
        // unpack even if this future is aborted, and is removed when it ends.
        let folder = self.folder;
        let asset_name = asset.name;
        tokio::task::spawn_blocking(move || {
            let unpacked = scratch.path().join("unpacked");
            let placed = archive::unpack(&archive_path, &unpacked)
                .and_then(|()| place_members(&asset_name, &unpacked, &members, &folder));
            if let Err(e) = scratch.close() {
                tracing::warn!(error = %e, "Failed to remove scratch directory");
            }
            placed
        })
        .await?
    }
}

fn place_members(
    archive: &str,
    unpacked: &Path,
    members: &BTreeMap<String, String>,
    folder: &Path,
) -> Result<()> {
    for (member, dest) in members {
        let source = vendor_fs::io::contained_path(unpacked, member)?;
        if !source.is_file() {
            return Err(Error::Extraction {
                archive: archive.to_string(),
                message: format!("member \"{member}\" is not in the archive"),
            });
        }
        let dest = vendor_fs::io::contained_path(folder, dest)?;
        vendor_fs::io::move_file(&source, &dest)?;
        tracing::info!(archive, member = %member, dest = %dest.display(), "Extracted archive member");
    }
    Ok(())
}

fn scratch_dir(root: Option<&Path>) -> Result<tempfile::TempDir> {
    let mut builder = tempfile::Builder::new();
    builder.prefix(TEMP_PREFIX);
    match root {
        Some(root) => {
            std::fs::create_dir_all(root).map_err(|e| Error::io(root, e))?;
            builder.tempdir_in(root).map_err(|e| Error::io(root, e))
        }
        None => builder
            .tempdir()
            .map_err(|e| Error::io(std::env::temp_dir(), e)),
    }
}

/// Duplicate an already fetched file to the remaining destinations.
async fn copy_to(source: &Path, copies: &[PathBuf]) -> Result<()> {
    for copy in copies {
        if let Some(parent) = copy.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::io(parent, e))?;
        }
        tokio::fs::copy(source, copy)
            .await
            .map_err(|e| Error::io(copy, e))?;
        tracing::debug!(from = %source.display(), dest = %copy.display(), "Copied file");
    }
    Ok(())
}

async fn create_file(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| Error::io(parent, e))?;
    }
    File::create(path).await.map_err(|e| Error::io(path, e))
}

/// Flush on success; drop the partial file on failure.
async fn finish(mut file: File, path: &Path, fetched: Result<()>) -> Result<()> {
    match fetched {
        Ok(()) => {
            file.flush().await.map_err(|e| Error::io(path, e))?;
            file.sync_all().await.map_err(|e| Error::io(path, e))
        }
        Err(e) => {
            drop(file);
            if let Err(remove) = tokio::fs::remove_file(path).await {
                tracing::debug!(path = %path.display(), error = %remove, "Could not remove partial file");
            }
            Err(e)
        }
    }
}
