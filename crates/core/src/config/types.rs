use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::processor::ProcessorConfig;
use crate::toolchain::ToolchainConfig;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub workspace: WorkspaceConfig,
    #[serde(default)]
    pub packaging: ProcessorConfig,
    #[serde(default)]
    pub toolchain: ToolchainConfig,
    #[serde(default)]
    pub identity: IdentityConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Location of the working directory holding `input/`, `output/` and friends.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorkspaceConfig {
    #[serde(default = "default_root")]
    pub root: PathBuf,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
        }
    }
}

fn default_root() -> PathBuf {
    PathBuf::from(".")
}

/// Asset identity derivation.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct IdentityConfig {
    /// Number of leading content bytes mixed into the asset id.
    /// Zero keeps the id purely metadata based (name, size, mtime).
    #[serde(default)]
    pub content_sample_bytes: u64,
}

/// Metrics export
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct MetricsConfig {
    /// When set, the run's counters are written here in Prometheus text format.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub textfile: Option<PathBuf>,
}
