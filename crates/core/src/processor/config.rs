//! Configuration for the processor module.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for per-asset packaging.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessorConfig {
    /// Target HLS segment duration in seconds.
    #[serde(default = "default_segment_secs")]
    pub segment_secs: u32,

    /// Extra attempts after the first one fails.
    #[serde(default)]
    pub retries: u32,

    /// Pause between attempts in milliseconds.
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Recognized source extensions, matched case-insensitively.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Playlist names are `<prefix>_<YYYYmmdd_HHMMSS>.m3u8`.
    #[serde(default = "default_playlist_prefix")]
    pub playlist_prefix: String,

    /// File name of the cover frame inside the asset directory.
    #[serde(default = "default_cover_name")]
    pub cover_name: String,

    /// printf-style segment file name pattern.
    #[serde(default = "default_segment_pattern")]
    pub segment_pattern: String,
}

fn default_segment_secs() -> u32 {
    6
}

fn default_retry_delay_ms() -> u64 {
    1000
}

fn default_extensions() -> Vec<String> {
    vec!["mp4".to_string()]
}

fn default_playlist_prefix() -> String {
    "playlist".to_string()
}

fn default_cover_name() -> String {
    "cover.jpg".to_string()
}

fn default_segment_pattern() -> String {
    "seg_%05d.ts".to_string()
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            segment_secs: default_segment_secs(),
            retries: 0,
            retry_delay_ms: default_retry_delay_ms(),
            extensions: default_extensions(),
            playlist_prefix: default_playlist_prefix(),
            cover_name: default_cover_name(),
            segment_pattern: default_segment_pattern(),
        }
    }
}

impl ProcessorConfig {
    /// Sets the segment duration.
    pub fn with_segment_secs(mut self, secs: u32) -> Self {
        self.segment_secs = secs;
        self
    }

    /// Sets the retry count.
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// Sets the pause between attempts.
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay_ms = delay.as_millis() as u64;
        self
    }

    /// Total attempts per asset.
    pub fn max_attempts(&self) -> u32 {
        self.retries.saturating_add(1)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    /// Whether `ext` (without the dot) is a recognized source extension.
    pub fn accepts_extension(&self, ext: &str) -> bool {
        self.extensions
            .iter()
            .any(|known| known.trim().trim_start_matches('.').eq_ignore_ascii_case(ext))
    }

    /// Playlist name for a packaging run started at `stamp`.
    pub fn playlist_name(&self, stamp: &str) -> String {
        format!("{}_{}.m3u8", self.playlist_prefix, stamp)
    }
}
