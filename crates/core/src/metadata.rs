//! Per-asset metadata written next to the package.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};

use crate::fsutil::write_atomic;

pub const META_FILE: &str = "meta.json";
pub const TITLE_FILE: &str = "source_title.txt";
pub const FILENAME_FILE: &str = "source_filename.txt";

/// Contents of `meta.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetMetadata {
    pub asset_id: String,
    pub original_filename: String,
    pub original_stem: String,
    pub source_abs: PathBuf,
    pub created_at: DateTime<Utc>,
    pub hls_time: u32,
    /// Probed duration rounded to milliseconds.
    pub duration: f64,
    pub duration_sec: u64,
    pub width: u32,
    pub height: u32,
    pub output: OutputInfo,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputInfo {
    pub dir: PathBuf,
    pub playlist: String,
    pub cover: String,
    pub segments_pattern: String,
    pub encryption: String,
    pub key_uri: String,
}

/// Rounds a duration to three decimals.
pub fn round_millis(secs: f64) -> f64 {
    (secs * 1000.0).round() / 1000.0
}

impl AssetMetadata {
    /// Writes the two plain-text name files, then `meta.json` atomically.
    ///
    /// `meta.json` goes last so its presence implies the name files exist.
    pub fn write_to(&self, dir: &Path) -> io::Result<()> {
        std::fs::write(dir.join(TITLE_FILE), self.original_stem.as_bytes())?;
        std::fs::write(dir.join(FILENAME_FILE), self.original_filename.as_bytes())?;

        let json = serde_json::to_vec_pretty(self).map_err(io::Error::other)?;
        write_atomic(&dir.join(META_FILE), &json)
    }

    /// Reads `meta.json` back from an asset directory.
    pub fn read_from(dir: &Path) -> io::Result<Self> {
        let bytes = std::fs::read(dir.join(META_FILE))?;
        serde_json::from_slice(&bytes).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample(dir: &Path) -> AssetMetadata {
        AssetMetadata {
            asset_id: "ab".repeat(32),
            original_filename: "第一集 intro.mp4".to_string(),
            original_stem: "第一集 intro".to_string(),
            source_abs: PathBuf::from("/w/input/第一集 intro.mp4"),
            created_at: Utc::now(),
            hls_time: 6,
            duration: round_millis(61.23456),
            duration_sec: 61,
            width: 1280,
            height: 720,
            output: OutputInfo {
                dir: dir.to_path_buf(),
                playlist: "playlist_20261018_091244.m3u8".to_string(),
                cover: "cover.jpg".to_string(),
                segments_pattern: "seg_%05d.ts".to_string(),
                encryption: "AES-128".to_string(),
                key_uri: "https://keys.example.com/enc.key".to_string(),
            },
        }
    }

    #[test]
    fn test_round_millis() {
        assert_eq!(round_millis(61.23456), 61.235);
        assert_eq!(round_millis(2.0), 2.0);
    }

    #[test]
    fn test_write_and_read_back() {
        let dir = TempDir::new().unwrap();
        let meta = sample(dir.path());

        meta.write_to(dir.path()).unwrap();

        assert_eq!(AssetMetadata::read_from(dir.path()).unwrap(), meta);
        assert_eq!(
            std::fs::read_to_string(dir.path().join(TITLE_FILE)).unwrap(),
            "第一集 intro"
        );
        assert_eq!(
            std::fs::read_to_string(dir.path().join(FILENAME_FILE)).unwrap(),
            "第一集 intro.mp4"
        );

        let raw: serde_json::Value =
            serde_json::from_slice(&std::fs::read(dir.path().join(META_FILE)).unwrap()).unwrap();
        assert_eq!(raw["output"]["encryption"], "AES-128");
        assert_eq!(raw["hls_time"], 6);
    }

    #[test]
    fn test_meta_json_not_written_when_name_files_fail() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join(TITLE_FILE)).unwrap();

        assert!(sample(dir.path()).write_to(dir.path()).is_err());
        assert!(!dir.path().join(META_FILE).exists());
    }
}
