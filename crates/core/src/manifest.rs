//! Append-only manifest of terminal outcomes.
//!
//! One JSON object per line, written with a single `write_all` on a file
//! opened in append mode. Earlier lines are never read back or rewritten by
//! the pipeline, so a crash can at worst leave a torn final line; every
//! previous line stays independently parseable for the upload job.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to append to manifest {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read manifest {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize manifest entry: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// One terminal outcome of an asset's attempt sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ManifestEntry {
    Done {
        created_at: DateTime<Utc>,
        run_id: Uuid,
        asset_id: String,
        original_filename: String,
        original_stem: String,
        output_dir: PathBuf,
        playlist: String,
        cover: String,
        duration_sec: u64,
        width: u32,
        height: u32,
    },
    Failed {
        created_at: DateTime<Utc>,
        run_id: Uuid,
        asset_id: String,
        original_filename: String,
        original_stem: String,
        error: String,
    },
}

impl ManifestEntry {
    pub fn asset_id(&self) -> &str {
        match self {
            Self::Done { asset_id, .. } | Self::Failed { asset_id, .. } => asset_id,
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done { .. })
    }
}

/// Appends entries to the manifest log.
#[derive(Debug, Clone)]
pub struct ManifestAppender {
    path: PathBuf,
}

impl ManifestAppender {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one entry as a single line.
    pub fn append(&self, entry: &ManifestEntry) -> Result<(), ManifestError> {
        let mut line = serde_json::to_vec(entry)?;
        line.push(b'\n');

        let write_err = |source| ManifestError::Write {
            path: self.path.clone(),
            source,
        };
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(write_err)?;
        file.write_all(&line).map_err(write_err)?;
        file.sync_data().map_err(write_err)?;
        Ok(())
    }
}

/// Reads every parseable entry of a manifest log.
///
/// Lines that fail to parse (a torn tail after a crash) are skipped with a
/// warning. A missing file reads as empty.
pub fn read_manifest(path: &Path) -> Result<Vec<ManifestEntry>, ManifestError> {
    let text = match std::fs::read(path) {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => {
            return Err(ManifestError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    let mut entries = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<ManifestEntry>(line) {
            Ok(entry) => entries.push(entry),
            Err(e) => tracing::warn!(
                "Skipping unreadable manifest line {} in {}: {}",
                idx + 1,
                path.display(),
                e
            ),
        }
    }
    Ok(entries)
}
