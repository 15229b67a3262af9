//! Archive unpacking (zip, tar, tar.gz)
//!
//! Blocking code; callers run it on a blocking thread.

use std::fs::File;
use std::io::Read;
use std::path::{Component, Path, PathBuf};

use flate2::read::GzDecoder;

use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    Zip,
    Tar,
    TarGz,
}

impl ArchiveKind {
    /// Detect from a file or asset name.
    pub fn from_name(name: &str) -> Option<Self> {
        let lower = name.to_ascii_lowercase();
        if lower.ends_with(".zip") {
            Some(Self::Zip)
        } else if lower.ends_with(".tar.gz") || lower.ends_with(".tgz") {
            Some(Self::TarGz)
        } else if lower.ends_with(".tar") {
            Some(Self::Tar)
        } else {
            None
        }
    }
}

/// Unpack `archive` into `out_dir`. The kind is detected from `archive`'s name.
pub fn unpack(archive: &Path, out_dir: &Path) -> Result<()> {
    let label = archive
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| archive.display().to_string());
    let kind = ArchiveKind::from_name(&label).ok_or_else(|| Error::Extraction {
        archive: label.clone(),
        message: "unsupported archive type (expected zip, tar or tar.gz)".into(),
    })?;

    let file = File::open(archive).map_err(|e| Error::io(archive, e))?;
    let extraction = |message: String| Error::Extraction {
        archive: label.clone(),
        message,
    };

    match kind {
        ArchiveKind::Zip => extract_zip(file, out_dir).map_err(extraction),
        ArchiveKind::Tar => extract_tar(file, out_dir).map_err(extraction),
        ArchiveKind::TarGz => extract_tar(GzDecoder::new(file), out_dir).map_err(extraction),
    }?;

    tracing::debug!(archive = %label, out = %out_dir.display(), "Unpacked archive");
    Ok(())
}

fn extract_zip(file: File, out_dir: &Path) -> std::result::Result<(), String> {
    let mut zip = zip::ZipArchive::new(file).map_err(|e| format!("open zip: {e}"))?;
    for i in 0..zip.len() {
        let mut entry = zip.by_index(i).map_err(|e| format!("zip entry {i}: {e}"))?;
        let rel = sanitize_rel_path(Path::new(entry.name()))?;
        let out_path = out_dir.join(rel);
        if entry.is_dir() {
            std::fs::create_dir_all(&out_path)
                .map_err(|e| format!("create {}: {e}", out_path.display()))?;
            continue;
        }
        if let Some(parent) = out_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| format!("create {}: {e}", parent.display()))?;
        }
        let mut out = File::create(&out_path)
            .map_err(|e| format!("create {}: {e}", out_path.display()))?;
        std::io::copy(&mut entry, &mut out)
            .map_err(|e| format!("write {}: {e}", out_path.display()))?;
    }
    Ok(())
}

fn extract_tar<R: Read>(reader: R, out_dir: &Path) -> std::result::Result<(), String> {
    let mut archive = tar::Archive::new(reader);
    let entries = archive
        .entries()
        .map_err(|e| format!("read tar entries: {e}"))?;
    for entry in entries {
        let mut entry = entry.map_err(|e| format!("tar entry: {e}"))?;
        let entry_path = entry
            .path()
            .map_err(|e| format!("tar entry path: {e}"))?
            .to_path_buf();
        let rel = sanitize_rel_path(&entry_path)?;
        if rel.as_os_str().is_empty() {
            continue;
        }
        let out_path = out_dir.join(rel);
        if let Some(parent) = out_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| format!("create {}: {e}", parent.display()))?;
        }
        entry
            .unpack(&out_path)
            .map_err(|e| format!("unpack {}: {e}", out_path.display()))?;
    }
    Ok(())
}

/// Reject absolute and parent-relative member paths.
fn sanitize_rel_path(path: &Path) -> std::result::Result<PathBuf, String> {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => {
                return Err(format!("invalid member path (absolute): {}", path.display()));
            }
            Component::ParentDir => {
                return Err(format!("invalid member path (..): {}", path.display()));
            }
            Component::CurDir => {}
            Component::Normal(part) => out.push(part),
        }
    }
    Ok(out)
}
