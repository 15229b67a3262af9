//! Atomic writes and best-effort removal helpers

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Component, Path, PathBuf};

use fs2::FileExt;

use crate::{Error, Result};

/// Write content atomically to a file with locking.
///
/// Uses write-to-temp-then-rename so readers never observe a partial
/// lockfile or manifest. Parent directories are created as needed.
pub fn write_atomic(path: &Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }

    let temp_name = format!(
        ".{}.{}.tmp",
        path.file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default(),
        std::process::id()
    );
    let temp_path = path.with_file_name(&temp_name);

    let mut temp_file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&temp_path)
        .map_err(|e| Error::io(&temp_path, e))?;

    temp_file.lock_exclusive().map_err(|_| Error::LockFailed {
        path: path.to_path_buf(),
    })?;

    temp_file
        .write_all(content)
        .map_err(|e| Error::io(&temp_path, e))?;
    temp_file.sync_all().map_err(|e| Error::io(&temp_path, e))?;

    temp_file.unlock().map_err(|_| Error::LockFailed {
        path: path.to_path_buf(),
    })?;

    fs::rename(&temp_path, path).map_err(|e| Error::io(path, e))?;

    Ok(())
}

/// Read text content from a file.
pub fn read_text(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| Error::io(path, e))
}

/// Whether `relative` stays inside whatever directory it is joined to.
///
/// Absolute paths, drive prefixes and `..` are refused, and so is a path
/// with no normal component at all.
pub fn is_contained(relative: &str) -> bool {
    let mut normal = false;
    for component in Path::new(relative).components() {
        match component {
            Component::Normal(_) => normal = true,
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return false,
        }
    }
    normal
}

/// Join `relative` onto `root`, refusing paths that would leave it.
pub fn contained_path(root: &Path, relative: &str) -> Result<PathBuf> {
    if !is_contained(relative) {
        return Err(Error::UnsafePath {
            root: root.to_path_buf(),
            path: relative.to_string(),
        });
    }
    Ok(root.join(relative))
}

/// Delete `relative` under `root`, then prune every parent directory that
/// became empty, stopping at `root` itself.
///
/// Returns `true` when a file was actually deleted; a file that is already
/// gone is not an error.
pub fn remove_file_and_empty_parents(root: &Path, relative: &str) -> Result<bool> {
    let file = contained_path(root, relative)?;
    let removed = match fs::remove_file(&file) {
        Ok(()) => {
            tracing::debug!(path = %file.display(), "Removed file");
            true
        }
        Err(e) if e.kind() == ErrorKind::NotFound => false,
        Err(e) => return Err(Error::io(&file, e)),
    };

    let mut dir = file.parent();
    while let Some(current) = dir {
        if current == root || !current.starts_with(root) {
            break;
        }
        if !remove_dir_if_empty(current)? {
            break;
        }
        dir = current.parent();
    }

    Ok(removed)
}

/// Remove `dir` if it exists and has no entries.
///
/// Returns `true` when the directory was removed.
pub fn remove_dir_if_empty(dir: &Path) -> Result<bool> {
    let mut entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(Error::io(dir, e)),
    };
    if entries.next().is_some() {
        return Ok(false);
    }
    fs::remove_dir(dir).map_err(|e| Error::io(dir, e))?;
    Ok(true)
}

/// Move a file into place, creating the destination's parents.
///
/// Falls back to copy + remove when a plain rename is refused, which is
/// what happens when the temp directory lives on another filesystem.
pub fn move_file(from: &Path, to: &Path) -> Result<()> {
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }

    if fs::rename(from, to).is_ok() {
        return Ok(());
    }

    fs::copy(from, to).map_err(|source| Error::Move {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source,
    })?;
    fs::remove_file(from).map_err(|e| Error::io(from, e))?;
    Ok(())
}
