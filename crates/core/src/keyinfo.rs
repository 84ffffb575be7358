//! Encryption key material handed to the packaging toolchain.
//!
//! `enc.keyinfo` is provided by the operator; its first non-empty line is the
//! URI players use to fetch the key. `enc.key` is the raw AES-128 key ffmpeg
//! reads while encrypting. Before each packaging call the pipeline rewrites a
//! single shared key-info file in the format ffmpeg expects:
//!
//! ```text
//! <key uri embedded in the playlist>
//! <local path of the key file>
//! ```

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors loading or staging key material. All of them are fatal for a run.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("key info file not found: {path}")]
    KeyInfoNotFound { path: PathBuf },

    #[error("key file not found: {path}")]
    KeyNotFound { path: PathBuf },

    #[error("key info file {path} has no key URI on its first line")]
    EmptyKeyUri { path: PathBuf },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// The key URI and the local key file it stands for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyMaterial {
    key_uri: String,
    key_path: PathBuf,
}

impl KeyMaterial {
    /// Reads the key URI from `keyinfo_path` and checks that `key_path` exists.
    pub fn load(keyinfo_path: &Path, key_path: &Path) -> Result<Self, KeyError> {
        if !keyinfo_path.exists() {
            return Err(KeyError::KeyInfoNotFound {
                path: keyinfo_path.to_path_buf(),
            });
        }
        if !key_path.exists() {
            return Err(KeyError::KeyNotFound {
                path: key_path.to_path_buf(),
            });
        }

        let bytes = std::fs::read(keyinfo_path).map_err(|source| KeyError::Io {
            path: keyinfo_path.to_path_buf(),
            source,
        })?;
        let text = String::from_utf8_lossy(&bytes);
        let key_uri = text
            .lines()
            .next()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .ok_or_else(|| KeyError::EmptyKeyUri {
                path: keyinfo_path.to_path_buf(),
            })?
            .to_string();

        let key_path = std::fs::canonicalize(key_path).map_err(|source| KeyError::Io {
            path: key_path.to_path_buf(),
            source,
        })?;

        Ok(Self { key_uri, key_path })
    }

    pub fn new(key_uri: impl Into<String>, key_path: impl Into<PathBuf>) -> Self {
        Self {
            key_uri: key_uri.into(),
            key_path: key_path.into(),
        }
    }

    pub fn key_uri(&self) -> &str {
        &self.key_uri
    }

    pub fn key_path(&self) -> &Path {
        &self.key_path
    }

    /// Rewrites the shared key-info file consumed by ffmpeg.
    pub fn write_key_info(&self, path: &Path) -> Result<(), KeyError> {
        let contents = format!("{}\n{}\n", self.key_uri, self.key_path.display());
        std::fs::write(path, contents).map_err(|source| KeyError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}
