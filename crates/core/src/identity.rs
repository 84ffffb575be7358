//! Stable asset identifiers.
//!
//! An asset id is the SHA-256 of `name|size|mtime_secs`, rendered as 64
//! lowercase hex characters. It names the asset's output directory and is
//! recorded everywhere the asset is mentioned, so the same file keeps the
//! same id when it is moved between holding areas (moves keep size and mtime).

use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use std::time::UNIX_EPOCH;

use crate::config::IdentityConfig;

/// Length of an asset id in characters.
pub const ASSET_ID_LEN: usize = 64;

/// Derives asset ids from file metadata.
#[derive(Debug, Clone, Default)]
pub struct IdentityAssigner {
    content_sample_bytes: u64,
}

impl IdentityAssigner {
    pub fn new(config: &IdentityConfig) -> Self {
        Self {
            content_sample_bytes: config.content_sample_bytes,
        }
    }

    /// Computes the id of the file at `path`.
    pub fn identity(&self, path: &Path) -> io::Result<String> {
        let meta = std::fs::metadata(path)?;
        let mtime_secs = meta
            .modified()?
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut hasher = Sha256::new();
        hasher.update(format!("{}|{}|{}", name, meta.len(), mtime_secs).as_bytes());

        if self.content_sample_bytes > 0 {
            let mut sample = Vec::new();
            File::open(path)?
                .take(self.content_sample_bytes)
                .read_to_end(&mut sample)?;
            hasher.update(b"|");
            hasher.update(&sample);
        }

        Ok(format!("{:x}", hasher.finalize()))
    }
}
