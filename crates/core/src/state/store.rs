use chrono::{Local, Utc};
use std::path::{Path, PathBuf};

use super::error::StateError;
use super::types::{AssetRecord, AssetStatus, StateDocument, StateSummary};
use crate::fsutil::{resolve_path, write_atomic};

/// Owner of the state document and its backing file.
///
/// Callers never get a mutable reference to the document: every change goes
/// through [`StateStore::record`], which persists before returning.
#[derive(Debug)]
pub struct StateStore {
    path: PathBuf,
    doc: StateDocument,
    recovered_from: Option<PathBuf>,
}

impl StateStore {
    /// Opens the store at `path`, starting empty when the file does not exist.
    ///
    /// An unparsable file is moved aside to `<stem>.corrupt.bak` and the store
    /// starts empty; [`StateStore::recovered_from`] then names the backup.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StateError> {
        let path = path.into();
        let (doc, recovered_from) = Self::load(&path)?;
        Ok(Self {
            path,
            doc,
            recovered_from,
        })
    }

    /// Reads the document at `path`.
    ///
    /// Returns the quarantine path alongside an empty document when the file
    /// was corrupt.
    pub fn load(path: &Path) -> Result<(StateDocument, Option<PathBuf>), StateError> {
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok((StateDocument::default(), None));
            }
            Err(source) => {
                return Err(StateError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        match serde_json::from_slice::<StateDocument>(&bytes) {
            Ok(doc) => Ok((doc, None)),
            Err(e) => {
                let backup = Self::quarantine(path)?;
                crate::metrics::STATE_RECOVERIES.inc();
                tracing::warn!(
                    "State file {} is corrupt ({}); moved to {} and starting empty",
                    path.display(),
                    e,
                    backup.display()
                );
                Ok((StateDocument::default(), Some(backup)))
            }
        }
    }

    fn quarantine(path: &Path) -> Result<PathBuf, StateError> {
        let mut backup = path.with_extension("corrupt.bak");
        if backup.exists() {
            let stamp = Local::now().format("%Y%m%d_%H%M%S");
            backup = path.with_extension(format!("corrupt.{}.bak", stamp));
        }
        std::fs::rename(path, &backup).map_err(|source| StateError::Quarantine {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(backup)
    }

    /// Writes the whole document atomically.
    pub fn save(&mut self) -> Result<(), StateError> {
        self.doc.updated_at = Some(Utc::now());
        let json = serde_json::to_vec_pretty(&self.doc)?;
        write_atomic(&self.path, &json).map_err(|source| StateError::Write {
            path: self.path.clone(),
            source,
        })
    }

    /// Lookup key for a source file: its resolved absolute path.
    pub fn key_for(path: &Path) -> String {
        resolve_path(path).to_string_lossy().into_owned()
    }

    pub fn get(&self, key: &str) -> Option<&AssetRecord> {
        self.doc.files.get(key)
    }

    pub fn is_done(&self, key: &str) -> bool {
        self.get(key).is_some_and(AssetRecord::is_done)
    }

    /// Replaces the record for `key` and persists immediately.
    pub fn record(&mut self, key: &str, record: AssetRecord) -> Result<(), StateError> {
        tracing::debug!(key, status = %record.status, "state transition");
        self.doc.files.insert(key.to_string(), record);
        self.save()
    }

    /// Keys other than `key` recorded under the same asset id.
    pub fn other_keys_for_asset<'a>(
        &'a self,
        asset_id: &'a str,
        key: &'a str,
    ) -> impl Iterator<Item = &'a str> + 'a {
        self.doc
            .files
            .iter()
            .filter(move |(k, r)| r.asset_id == asset_id && k.as_str() != key)
            .map(|(k, _)| k.as_str())
    }

    pub fn summary(&self) -> StateSummary {
        self.doc
            .files
            .values()
            .fold(StateSummary::default(), |mut acc, r| {
                match r.status {
                    AssetStatus::Done => acc.done += 1,
                    AssetStatus::Failed => acc.failed += 1,
                    AssetStatus::Processing => acc.processing += 1,
                }
                acc
            })
    }

    pub fn len(&self) -> usize {
        self.doc.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.doc.files.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Where a corrupt document was moved on open, if it was.
    pub fn recovered_from(&self) -> Option<&Path> {
        self.recovered_from.as_deref()
    }
}
