//! Moving source files into the pending/failed holding areas.

use chrono::Local;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;

/// Errors that can occur while relocating a source file.
#[derive(Debug, Error)]
pub enum RelocationError {
    /// Source file not found.
    #[error("Source file not found: {path}")]
    SourceNotFound { path: PathBuf },

    /// Failed to create destination directory.
    #[error("Failed to create directory {path}: {source}")]
    DirectoryCreationFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to move/rename file.
    #[error("Failed to move file from {source_path} to {destination}: {error}")]
    MoveFailed {
        source_path: PathBuf,
        destination: PathBuf,
        #[source]
        error: std::io::Error,
    },
}

/// Moves `source` into `dest_dir` without overwriting anything there.
///
/// A name already taken in `dest_dir` gets a `_<YYYYmmdd_HHMMSS>` suffix before
/// the extension (and a counter if that is taken too). A source already
/// directly inside `dest_dir` stays where it is. Returns the new path.
pub async fn relocate(source: &Path, dest_dir: &Path) -> Result<PathBuf, RelocationError> {
    if !source.exists() {
        return Err(RelocationError::SourceNotFound {
            path: source.to_path_buf(),
        });
    }

    fs::create_dir_all(dest_dir)
        .await
        .map_err(|e| RelocationError::DirectoryCreationFailed {
            path: dest_dir.to_path_buf(),
            source: e,
        })?;

    if already_in(source, dest_dir) {
        return Ok(source.to_path_buf());
    }

    let destination = free_destination(source, dest_dir);
    let move_failed = |error| RelocationError::MoveFailed {
        source_path: source.to_path_buf(),
        destination: destination.clone(),
        error,
    };

    if !try_atomic_move(source, &destination)
        .await
        .map_err(move_failed)?
    {
        // Fall back to copy
        fs::copy(source, &destination).await.map_err(move_failed)?;
        fs::remove_file(source).await.map_err(move_failed)?;
    }

    Ok(destination)
}

/// Attempts to move a file atomically (rename).
async fn try_atomic_move(source: &Path, destination: &Path) -> Result<bool, std::io::Error> {
    match fs::rename(source, destination).await {
        Ok(()) => Ok(true),
        Err(e) => {
            // Cross-filesystem moves fail with EXDEV (18 on Linux)
            if e.kind() == std::io::ErrorKind::CrossesDevices || e.raw_os_error() == Some(18) {
                Ok(false)
            } else {
                Err(e)
            }
        }
    }
}

fn already_in(source: &Path, dest_dir: &Path) -> bool {
    match (source.parent(), std::fs::canonicalize(dest_dir)) {
        (Some(parent), Ok(dest)) => std::fs::canonicalize(parent).is_ok_and(|p| p == dest),
        _ => false,
    }
}

fn free_destination(source: &Path, dest_dir: &Path) -> PathBuf {
    let name = source.file_name().unwrap_or(source.as_os_str());
    let plain = dest_dir.join(name);
    if !plain.exists() {
        return plain;
    }

    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = source
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    let stamp = Local::now().format("%Y%m%d_%H%M%S");

    let stamped = dest_dir.join(format!("{}_{}{}", stem, stamp, ext));
    if !stamped.exists() {
        return stamped;
    }

    (1u32..)
        .map(|n| dest_dir.join(format!("{}_{}_{}{}", stem, stamp, n, ext)))
        .find(|candidate| !candidate.exists())
        .unwrap_or(stamped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_relocate_moves_file() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("clip.mp4");
        std::fs::write(&src, b"video").unwrap();

        let moved = relocate(&src, &dir.path().join("pending")).await.unwrap();
        assert_eq!(moved, dir.path().join("pending").join("clip.mp4"));
        assert!(!src.exists());
        assert_eq!(std::fs::read(&moved).unwrap(), b"video");
    }

    #[tokio::test]
    async fn test_relocate_never_overwrites() {
        let dir = TempDir::new().unwrap();
        let pending = dir.path().join("pending");
        std::fs::create_dir(&pending).unwrap();
        std::fs::write(pending.join("clip.mp4"), b"older").unwrap();

        let src = dir.path().join("clip.mp4");
        std::fs::write(&src, b"newer").unwrap();
        let moved = relocate(&src, &pending).await.unwrap();

        assert_ne!(moved, pending.join("clip.mp4"));
        let name = moved.file_name().unwrap().to_str().unwrap().to_string();
        assert!(name.starts_with("clip_"));
        assert!(name.ends_with(".mp4"));
        assert_eq!(std::fs::read(pending.join("clip.mp4")).unwrap(), b"older");
        assert_eq!(std::fs::read(&moved).unwrap(), b"newer");
    }

    #[tokio::test]
    async fn test_relocate_twice_same_second() {
        let dir = TempDir::new().unwrap();
        let pending = dir.path().join("pending");
        let mut destinations = Vec::new();
        for _ in 0..3 {
            let src = dir.path().join("clip.mp4");
            std::fs::write(&src, b"v").unwrap();
            destinations.push(relocate(&src, &pending).await.unwrap());
        }
        destinations.sort();
        destinations.dedup();
        assert_eq!(destinations.len(), 3);
    }

    #[tokio::test]
    async fn test_relocate_within_destination_is_noop() {
        let dir = TempDir::new().unwrap();
        let failed = dir.path().join("failed");
        std::fs::create_dir(&failed).unwrap();
        let src = failed.join("clip.mp4");
        std::fs::write(&src, b"v").unwrap();

        let moved = relocate(&src, &failed).await.unwrap();
        assert_eq!(moved, src);
        assert!(src.exists());
        assert_eq!(std::fs::read_dir(&failed).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn test_relocate_missing_source() {
        let dir = TempDir::new().unwrap();
        let err = relocate(&dir.path().join("gone.mp4"), dir.path())
            .await
            .unwrap_err();
        assert!(matches!(err, RelocationError::SourceNotFound { .. }));
    }
}
