use std::path::PathBuf;
use thiserror::Error;

use crate::failed_list::FailedListError;
use crate::keyinfo::KeyError;
use crate::manifest::ManifestError;
use crate::relocate::RelocationError;
use crate::state::StateError;
use crate::tasks::TaskError;
use crate::toolchain::ToolchainError;

/// Why one attempt at an asset failed.
///
/// These never escape the processor: they become a `failed` record and,
/// once attempts run out, a failed-list line and a manifest entry.
#[derive(Debug, Error)]
pub enum AssetError {
    #[error("Failed to read source file {path}: {source}")]
    Source {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Probe failed: {0}")]
    Probe(String),

    #[error("Cover extraction failed: {0}")]
    Cover(String),

    #[error("Packaging failed: {0}")]
    Packaging(String),

    #[error("Failed to write metadata: {0}")]
    Metadata(String),

    #[error("Relocation failed: {0}")]
    Relocation(#[from] RelocationError),

    #[error("Giving up after {attempts} attempt(s): {last}")]
    ExhaustedRetries { attempts: u32, last: String },
}

impl AssetError {
    /// Short stage label used in metrics and logs.
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Source { .. } => "source",
            Self::Probe(_) => "probe",
            Self::Cover(_) => "cover",
            Self::Packaging(_) => "package",
            Self::Metadata(_) => "metadata",
            Self::Relocation(_) => "relocate",
            Self::ExhaustedRetries { .. } => "exhausted",
        }
    }
}

/// Failures that stop the whole run.
///
/// Once the state file, manifest or failed list cannot be written the
/// durability guarantees no longer hold, so the run aborts instead of
/// continuing with the next asset.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    State(#[from] StateError),

    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error(transparent)]
    FailedList(#[from] FailedListError),

    #[error(transparent)]
    Tasks(#[from] TaskError),

    #[error(transparent)]
    Key(#[from] KeyError),

    #[error("Toolchain unavailable: {0}")]
    Toolchain(#[from] ToolchainError),

    #[error("Workspace I/O failed at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
