//! Types for the processor module.

use std::path::PathBuf;

use super::error::AssetError;

/// Terminal result of processing one source file.
#[derive(Debug)]
pub enum AssetOutcome {
    /// Packaged in this call, or already done in an earlier run.
    Success {
        asset_id: String,
        /// True when the state store already held `done` and nothing ran.
        skipped: bool,
        /// Where the source ended up, when it was moved in this call.
        moved_to: Option<PathBuf>,
    },
    /// Every attempt failed.
    FinalFailure { asset_id: String, error: AssetError },
}

impl AssetOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Success { skipped: true, .. })
    }

    pub fn asset_id(&self) -> &str {
        match self {
            Self::Success { asset_id, .. } | Self::FinalFailure { asset_id, .. } => asset_id,
        }
    }
}
