use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// Current on-disk schema version.
pub const STATE_VERSION: u32 = 1;

/// Processing status of one asset. Absence from the store means pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetStatus {
    Processing,
    Done,
    Failed,
}

impl fmt::Display for AssetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AssetStatus::Processing => "processing",
            AssetStatus::Done => "done",
            AssetStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Latest known state of one source file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetRecord {
    pub status: AssetStatus,
    pub updated_at: DateTime<Utc>,
    pub asset_id: String,
    /// Resolved source path while processing or after failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub playlist: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_sec: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src_moved_to: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AssetRecord {
    /// Record written at the start of every attempt.
    pub fn processing(asset_id: impl Into<String>, src: PathBuf) -> Self {
        Self::bare(AssetStatus::Processing, asset_id.into(), Some(src))
    }

    /// Record written when an attempt fails.
    pub fn failed(asset_id: impl Into<String>, src: PathBuf, error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::bare(AssetStatus::Failed, asset_id.into(), Some(src))
        }
    }

    /// Record written once every step of an attempt completed.
    pub fn done(asset_id: impl Into<String>) -> Self {
        Self::bare(AssetStatus::Done, asset_id.into(), None)
    }

    fn bare(status: AssetStatus, asset_id: String, src: Option<PathBuf>) -> Self {
        Self {
            status,
            updated_at: Utc::now(),
            asset_id,
            src,
            output_dir: None,
            playlist: None,
            cover: None,
            duration_sec: None,
            width: None,
            height: None,
            src_moved_to: None,
            error: None,
        }
    }

    pub fn is_done(&self) -> bool {
        self.status == AssetStatus::Done
    }
}

/// The whole persisted document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateDocument {
    pub version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub files: BTreeMap<String, AssetRecord>,
}

impl Default for StateDocument {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            updated_at: None,
            files: BTreeMap::new(),
        }
    }
}

/// Record counts by status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StateSummary {
    pub done: usize,
    pub failed: usize,
    pub processing: usize,
}

impl fmt::Display for StateSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "done={}, failed={}, processing={}",
            self.done, self.failed, self.processing
        )
    }
}
