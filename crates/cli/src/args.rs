use clap::Parser;
use std::path::PathBuf;

use hlspack_core::{Config, RunMode, RunOptions};

/// Resumable batch packager: video files in, AES-128 encrypted HLS out.
#[derive(Debug, Parser)]
#[command(name = "hlspack", author, version, about, long_about = None)]
pub struct Cli {
    /// Workspace directory holding input/, output/, pending/ and failed/
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// TOML configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// HLS segment duration in seconds
    #[arg(short = 's', long = "hls-time")]
    pub hls_time: Option<u32>,

    /// Extra attempts per file after the first failure
    #[arg(long)]
    pub retries: Option<u32>,

    /// Only rerun sources listed in failed_list.txt
    #[arg(long)]
    pub rerun_failed: bool,

    /// With --rerun-failed, remove sources that succeeded from failed_list.txt
    #[arg(long)]
    pub clear_failed_on_success: bool,

    /// Write Prometheus metrics for the run to this file
    #[arg(long)]
    pub metrics_file: Option<PathBuf>,

    /// More console logs
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Applies command-line overrides on top of the loaded configuration.
    pub fn apply(&self, config: &mut Config) {
        if let Some(root) = &self.root {
            config.workspace.root = root.clone();
        }
        if let Some(secs) = self.hls_time {
            config.packaging.segment_secs = secs;
        }
        if let Some(retries) = self.retries {
            config.packaging.retries = retries;
        }
        if let Some(path) = &self.metrics_file {
            config.metrics.textfile = Some(path.clone());
        }
    }

    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            mode: if self.rerun_failed {
                RunMode::RerunFailed
            } else {
                RunMode::Normal
            },
            prune_failed_on_success: self.clear_failed_on_success,
        }
    }
}
