//! Filesystem operations
//!
//! Handles directory creation, removal and the metadata renames used to
//! hide a library's `.git` from the enclosing repository.

use std::io::ErrorKind;
use std::path::Path;
use std::time::Duration;

use crate::error::FilesystemError;

/// Delay before the single rename retry
pub const RENAME_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Create a directory and all parent directories
pub fn create_dir_all(path: &Path) -> Result<(), FilesystemError> {
    std::fs::create_dir_all(path).map_err(|e| FilesystemError::CreateDir {
        path: path.to_path_buf(),
        error: e.to_string(),
    })
}

/// Remove a file or a directory tree; missing paths are fine
pub fn remove_path(path: &Path) -> Result<(), FilesystemError> {
    let result = match std::fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => remove_dir_tree(path),
        Ok(_) => std::fs::remove_file(path),
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
        Err(e) => Err(e),
    };
    result.map_err(|e| FilesystemError::Remove {
        path: path.to_path_buf(),
        error: e.to_string(),
    })
}

/// Remove a directory tree, clearing read-only bits if the first pass fails
///
/// Git pack files are read-only on Windows.
fn remove_dir_tree(path: &Path) -> std::io::Result<()> {
    match std::fs::remove_dir_all(path) {
        Err(e) if e.kind() == ErrorKind::PermissionDenied => {
            make_writable(path)?;
            std::fs::remove_dir_all(path)
        }
        other => other,
    }
}

fn make_writable(path: &Path) -> std::io::Result<()> {
    let meta = std::fs::symlink_metadata(path)?;
    let mut perms = meta.permissions();
    if perms.readonly() {
        #[allow(clippy::permissions_set_readonly_false)]
        perms.set_readonly(false);
        std::fs::set_permissions(path, perms)?;
    }
    if meta.is_dir() {
        for entry in std::fs::read_dir(path)? {
            make_writable(&entry?.path())?;
        }
    }
    Ok(())
}

/// Rename `from` to `to`, retrying once after a short pause on permission
/// contention
///
/// Returns `Ok(false)` when `from` does not exist. With `replace_existing`,
/// whatever sits at `to` is removed first.
pub fn rename_with_retry(
    from: &Path,
    to: &Path,
    replace_existing: bool,
) -> Result<bool, FilesystemError> {
    if std::fs::symlink_metadata(from).is_err() {
        return Ok(false);
    }

    if replace_existing && std::fs::symlink_metadata(to).is_ok() {
        tracing::debug!("Backup already exists: {}", to.display());
        remove_path(to)?;
    }

    let rename_error = |e: std::io::Error| FilesystemError::Rename {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        error: e.to_string(),
    };

    match std::fs::rename(from, to) {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::PermissionDenied => {
            tracing::warn!("Access denied while renaming {}, retrying", from.display());
            std::thread::sleep(RENAME_RETRY_DELAY);
            std::fs::rename(from, to).map_err(rename_error)?;
        }
        Err(e) => return Err(rename_error(e)),
    }

    tracing::debug!("Renamed {} to {}", from.display(), to.display());
    Ok(true)
}
