pub mod config;
pub mod failed_list;
pub mod fsutil;
pub mod identity;
pub mod keyinfo;
pub mod manifest;
pub mod metadata;
pub mod metrics;
pub mod processor;
pub mod relocate;
pub mod runner;
pub mod state;
pub mod tasks;
pub mod testing;
pub mod toolchain;
pub mod workspace;

pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, IdentityConfig,
    MetricsConfig, WorkspaceConfig,
};
pub use failed_list::{FailedList, FailedListEntry, FailedListError};
pub use identity::IdentityAssigner;
pub use keyinfo::{KeyError, KeyMaterial};
pub use manifest::{read_manifest, ManifestAppender, ManifestEntry, ManifestError};
pub use metadata::AssetMetadata;
pub use processor::{AssetError, AssetOutcome, AssetProcessor, PipelineError, ProcessorConfig};
pub use relocate::{relocate, RelocationError};
pub use runner::{preflight, PipelineRunner, RunOptions, RunSummary};
pub use state::{AssetRecord, AssetStatus, StateError, StateStore, StateSummary};
pub use tasks::{enumerate_tasks, RunMode, TaskError};
pub use toolchain::{FfmpegPackager, Packager, ToolchainConfig, ToolchainError};
pub use workspace::Workspace;
