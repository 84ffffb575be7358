//! Trait definitions for the toolchain module.

use async_trait::async_trait;
use std::path::Path;

use super::error::ToolchainError;
use super::types::{MediaInfo, PackageJob, PackageOutput};

/// The external media toolchain as seen by the pipeline.
///
/// Every call blocks the pipeline until the underlying process exits.
#[async_trait]
pub trait Packager: Send + Sync {
    /// Returns the name of this packager implementation.
    fn name(&self) -> &str;

    /// Probes duration and primary video dimensions.
    async fn probe(&self, path: &Path) -> Result<MediaInfo, ToolchainError>;

    /// Writes a single still frame taken at `seek_secs` to `output_path`.
    async fn extract_cover(
        &self,
        input_path: &Path,
        output_path: &Path,
        seek_secs: f64,
    ) -> Result<(), ToolchainError>;

    /// Produces the AES-128 encrypted, segmented package (stream copy, no re-encode).
    async fn package(&self, job: PackageJob) -> Result<PackageOutput, ToolchainError>;

    /// Validates that the packager is properly configured and ready.
    async fn validate(&self) -> Result<(), ToolchainError>;
}
