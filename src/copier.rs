use std::fs;
use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::BuildError;
use crate::scanner::SourceFile;

/// ENOSPC on Unix
const NO_SPACE_LEFT: i32 = 28;

#[inline]
fn is_disk_full(e: &io::Error) -> bool {
    e.raw_os_error() == Some(NO_SPACE_LEFT)
}

/// Create the parent directory of `path` if needed
fn ensure_parent(path: &Path) -> Result<(), BuildError> {
    let Some(parent) = path.parent() else {
        return Ok(());
    };
    if parent.exists() {
        return Ok(());
    }

    fs::create_dir_all(parent).map_err(|e| {
        if is_disk_full(&e) {
            return BuildError::DiskFull {
                path: parent.to_path_buf(),
            };
        }
        BuildError::CreateDirFailed {
            path: parent.to_path_buf(),
            source: e,
        }
    })
}

/// Copy a single file from src to dst, returns bytes copied
pub fn copy_file(src: &Path, dst: &Path) -> Result<u64, BuildError> {
    ensure_parent(dst)?;

    fs::copy(src, dst).map_err(|e| {
        if is_disk_full(&e) {
            return BuildError::DiskFull {
                path: dst.to_path_buf(),
            };
        }
        BuildError::CopyFailed {
            src: src.to_path_buf(),
            dst: dst.to_path_buf(),
            source: e,
        }
    })
}

/// Write generated content to `path`, returns bytes written
pub fn write_file(path: &Path, contents: &str) -> Result<u64, BuildError> {
    ensure_parent(path)?;

    fs::write(path, contents).map_err(|e| {
        if is_disk_full(&e) {
            return BuildError::DiskFull {
                path: path.to_path_buf(),
            };
        }
        BuildError::WriteFailed {
            path: path.to_path_buf(),
            source: e,
        }
    })?;

    Ok(contents.len() as u64)
}

/// Copy scanned files under `dst`, keeping their relative paths.
/// Returns (files_copied, bytes_copied).
pub fn copy_files(
    files: &[SourceFile],
    dst: &Path,
    shutdown: &AtomicBool,
) -> Result<(u64, u64), BuildError> {
    let mut files_copied = 0u64;
    let mut bytes_copied = 0u64;

    for file in files {
        // Check for cancellation
        if shutdown.load(Ordering::Relaxed) {
            return Err(BuildError::Cancelled);
        }

        let bytes = copy_file(&file.path, &dst.join(&file.relative))?;
        files_copied += 1;
        bytes_copied += bytes;
    }

    Ok((files_copied, bytes_copied))
}
