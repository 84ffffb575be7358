//! Fixed on-disk layout of a packaging workspace.

use std::io;
use std::path::{Path, PathBuf};

/// All paths the pipeline reads or writes, derived from one root directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Unprocessed source videos.
    pub fn input_dir(&self) -> PathBuf {
        self.root.join("input")
    }

    /// One directory per asset id.
    pub fn output_dir(&self) -> PathBuf {
        self.root.join("output")
    }

    /// Sources whose package was produced.
    pub fn pending_dir(&self) -> PathBuf {
        self.root.join("pending")
    }

    /// Sources that permanently failed.
    pub fn failed_dir(&self) -> PathBuf {
        self.root.join("failed")
    }

    pub fn state_path(&self) -> PathBuf {
        self.root.join("state.json")
    }

    pub fn log_path(&self) -> PathBuf {
        self.root.join("run.log")
    }

    pub fn failed_list_path(&self) -> PathBuf {
        self.root.join("failed_list.txt")
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.root.join("manifest.jsonl")
    }

    /// Operator-provided key info; first line is the key URI.
    pub fn keyinfo_path(&self) -> PathBuf {
        self.root.join("enc.keyinfo")
    }

    /// Operator-provided AES-128 key.
    pub fn key_path(&self) -> PathBuf {
        self.root.join("enc.key")
    }

    /// Shared key-info file rewritten before every packaging call.
    pub fn temp_keyinfo_path(&self) -> PathBuf {
        self.root.join("_enc.keyinfo.tmp")
    }

    /// Output directory of one asset.
    pub fn asset_dir(&self, asset_id: &str) -> PathBuf {
        self.output_dir().join(asset_id)
    }

    /// Creates the four working directories.
    pub fn ensure_dirs(&self) -> io::Result<()> {
        for dir in [
            self.input_dir(),
            self.output_dir(),
            self.pending_dir(),
            self.failed_dir(),
        ] {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }
}
