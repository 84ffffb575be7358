//! Per-asset processing.
//!
//! [`AssetProcessor`] takes one source file from "not done" to a terminal
//! outcome:
//!
//! 1. A source already recorded `done` is skipped without touching the
//!    toolchain.
//! 2. Otherwise every attempt records `processing`, then probes, extracts a
//!    cover frame, packages, writes `meta.json`, appends a `done` manifest
//!    line, moves the source into `pending/` and finally records `done`.
//! 3. A failed attempt records `failed` and, while attempts remain, the whole
//!    sequence starts again after a short pause.
//! 4. When attempts run out the source moves into `failed/` and the failure is
//!    appended to the failed list and the manifest.
//!
//! Because each transition is persisted before the next step starts, a run
//! killed at any point leaves the asset `processing` or `failed`, and the
//! next run simply processes it again.
//!
//! # Example
//!
//! ```ignore
//! use hlspack_core::processor::{AssetProcessor, ProcessorConfig};
//! use hlspack_core::toolchain::FfmpegPackager;
//!
//! let mut processor = AssetProcessor::new(
//!     ProcessorConfig::default().with_retries(1),
//!     Arc::new(FfmpegPackager::with_defaults()),
//!     workspace,
//!     key_material,
//!     IdentityAssigner::default(),
//!     StateStore::open(workspace.state_path())?,
//! );
//!
//! match processor.process(Path::new("input/intro.mp4")).await? {
//!     AssetOutcome::Success { asset_id, .. } => println!("packaged {asset_id}"),
//!     AssetOutcome::FinalFailure { error, .. } => eprintln!("{error}"),
//! }
//! ```

mod asset;
mod config;
mod error;
mod types;

pub use asset::AssetProcessor;
pub use config::ProcessorConfig;
pub use error::{AssetError, PipelineError};
pub use types::AssetOutcome;
