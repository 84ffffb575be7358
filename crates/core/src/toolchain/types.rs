//! Types for the toolchain module.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// What the prober learned about a source file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaInfo {
    /// Path that was probed.
    pub path: PathBuf,
    /// Container duration in seconds.
    pub duration_secs: f64,
    /// Width of the primary video stream.
    pub width: u32,
    /// Height of the primary video stream.
    pub height: u32,
}

impl MediaInfo {
    /// Duration rounded half-up to whole seconds.
    pub fn duration_whole_secs(&self) -> u64 {
        (self.duration_secs + 0.5).floor().max(0.0) as u64
    }
}

/// One encrypted segmentation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageJob {
    /// Source video.
    pub input_path: PathBuf,
    /// Directory receiving the playlist and segments.
    pub output_dir: PathBuf,
    /// File name of the playlist inside `output_dir`.
    pub playlist_name: String,
    /// printf-style segment file name pattern, e.g. `seg_%05d.ts`.
    pub segment_pattern: String,
    /// Target segment duration in seconds.
    pub segment_secs: u32,
    /// Key-info file handed to ffmpeg (`uri`, then local key path).
    pub key_info_path: PathBuf,
}

impl PackageJob {
    /// Full path of the playlist this job writes.
    pub fn playlist_path(&self) -> PathBuf {
        self.output_dir.join(&self.playlist_name)
    }
}

/// Result of a successful packaging run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageOutput {
    /// The playlist that was written.
    pub playlist_path: PathBuf,
    /// Number of segment files found next to it.
    pub segment_count: usize,
}

/// Timestamp of the cover frame: a tenth into the video but never before 1s,
/// since frame zero is frequently black or malformed.
pub fn cover_seek_secs(duration_secs: f64) -> f64 {
    (duration_secs * 0.10).max(1.0)
}
