//! Toolchain module wrapping the external media tools.
//!
//! The probing, cover extraction and encrypted segmentation of a source video
//! are delegated to ffprobe/ffmpeg. This module provides the `Packager` trait
//! the pipeline drives, and `FfmpegPackager`, the implementation that shells
//! out to the real binaries.
//!
//! # Example
//!
//! ```ignore
//! use hlspack_core::toolchain::{FfmpegPackager, PackageJob, Packager, ToolchainConfig};
//!
//! let packager = FfmpegPackager::new(ToolchainConfig::default());
//!
//! // Both binaries must be runnable before any asset is touched
//! packager.validate().await?;
//!
//! let info = packager.probe(Path::new("/videos/input/clip.mp4")).await?;
//! packager
//!     .extract_cover(&info.path, Path::new("/videos/output/abc/cover.jpg"), 1.0)
//!     .await?;
//!
//! let output = packager
//!     .package(PackageJob {
//!         input_path: info.path.clone(),
//!         output_dir: PathBuf::from("/videos/output/abc"),
//!         playlist_name: "playlist_20260101_120000.m3u8".to_string(),
//!         segment_pattern: "seg_%05d.ts".to_string(),
//!         segment_secs: 6,
//!         key_info_path: PathBuf::from("/videos/_enc.keyinfo.tmp"),
//!     })
//!     .await?;
//! println!("{} segments", output.segment_count);
//! ```

mod config;
mod error;
mod ffmpeg;
mod traits;
mod types;

pub use config::ToolchainConfig;
pub use error::ToolchainError;
pub use ffmpeg::FfmpegPackager;
pub use traits::Packager;
pub use types::{cover_seek_secs, MediaInfo, PackageJob, PackageOutput};
