//! Run-level driver: preflight, task enumeration, the sequential pass and
//! the bookkeeping after it.

use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::keyinfo::KeyMaterial;
use crate::metrics;
use crate::processor::{AssetOutcome, AssetProcessor, PipelineError};
use crate::tasks::{enumerate_tasks, RunMode};
use crate::toolchain::Packager;
use crate::workspace::Workspace;

/// Checks everything a run needs before any asset is touched.
///
/// Verifies the toolchain, creates the workspace directories and loads the
/// key material. Any error here must abort the run.
pub async fn preflight<P: Packager + ?Sized>(
    packager: &P,
    workspace: &Workspace,
) -> Result<KeyMaterial, PipelineError> {
    packager.validate().await?;

    workspace.ensure_dirs().map_err(|source| PipelineError::Io {
        path: workspace.root().to_path_buf(),
        source,
    })?;

    let key = KeyMaterial::load(&workspace.keyinfo_path(), &workspace.key_path())?;
    debug!("Preflight passed using {}", packager.name());
    Ok(key)
}

/// Options for one run.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    pub mode: RunMode,
    /// After a rerun pass, drop the sources that succeeded from the failed list.
    pub prune_failed_on_success: bool,
}

/// What a run did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub total: usize,
    /// Successes, skips included.
    pub succeeded: usize,
    pub failed: usize,
    /// Sources already done before this run.
    pub skipped: usize,
    /// Task paths that ended in success, in processing order.
    pub success_paths: Vec<PathBuf>,
    /// Entries removed from the failed list.
    pub pruned: usize,
}

impl RunSummary {
    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }
}

/// Feeds the enumerated tasks through an [`AssetProcessor`] one at a time.
pub struct PipelineRunner<P: Packager> {
    processor: AssetProcessor<P>,
}

impl<P: Packager> PipelineRunner<P> {
    pub fn new(processor: AssetProcessor<P>) -> Self {
        Self { processor }
    }

    pub fn processor(&self) -> &AssetProcessor<P> {
        &self.processor
    }

    pub fn into_processor(self) -> AssetProcessor<P> {
        self.processor
    }

    /// Processes every task in order.
    ///
    /// Final failures of individual assets are counted, not returned; the
    /// caller decides the exit status from [`RunSummary::has_failures`].
    pub async fn run(&mut self, options: RunOptions) -> Result<RunSummary, PipelineError> {
        self.log_start(options);

        let result = self.run_tasks(options).await;
        self.remove_temp_keyinfo();

        let summary = result?;
        info!("========== RUN END ==========");
        info!(
            "Processed {}: succeeded={} (skipped={}), failed={}",
            summary.total, summary.succeeded, summary.skipped, summary.failed
        );
        if summary.has_failures() {
            warn!(
                "Completed with {} error(s). Check {} and {}",
                summary.failed,
                self.processor.workspace().log_path().display(),
                self.processor.failed_list().path().display()
            );
        } else {
            info!("All done.");
        }
        Ok(summary)
    }

    async fn run_tasks(&mut self, options: RunOptions) -> Result<RunSummary, PipelineError> {
        let tasks = enumerate_tasks(
            options.mode,
            &self.processor.workspace().input_dir(),
            self.processor.failed_list(),
            self.processor.config(),
        )?;

        let mut summary = RunSummary {
            total: tasks.len(),
            ..Default::default()
        };
        if tasks.is_empty() {
            match options.mode {
                RunMode::Normal => info!("No recognized video files found in input/."),
                RunMode::RerunFailed => info!("No existing video files in the failed list to rerun."),
            }
            return Ok(summary);
        }
        match options.mode {
            RunMode::Normal => info!("Found {} item(s) in input/.", tasks.len()),
            RunMode::RerunFailed => info!("Rerun failed only: {} item(s).", tasks.len()),
        }

        for (idx, src) in tasks.iter().enumerate() {
            debug!("[{}/{}] {}", idx + 1, tasks.len(), src.display());
            match self.processor.process(src).await? {
                AssetOutcome::Success { skipped, .. } => {
                    summary.succeeded += 1;
                    if skipped {
                        summary.skipped += 1;
                    }
                    summary.success_paths.push(src.clone());
                }
                AssetOutcome::FinalFailure { .. } => summary.failed += 1,
            }
        }

        if options.mode == RunMode::RerunFailed && options.prune_failed_on_success {
            let failed_list = self.processor.failed_list();
            summary.pruned = failed_list.prune(&summary.success_paths)?;
            metrics::FAILED_LIST_PRUNED.inc_by(summary.pruned as u64);
            info!(
                "{} updated. remaining={}",
                failed_list.path().display(),
                failed_list.load()?.len()
            );
        }

        Ok(summary)
    }

    fn log_start(&self, options: RunOptions) {
        let ws = self.processor.workspace();
        let config = self.processor.config();
        info!("========== RUN START ==========");
        info!("Run id: {}", self.processor.run_id());
        info!("Workspace: {}", ws.root().display());
        info!("Input: {}", ws.input_dir().display());
        info!("Output: {}", ws.output_dir().display());
        info!("State: {}", self.processor.state().path().display());
        info!("Manifest: {}", ws.manifest_path().display());
        info!("Prev summary: {}", self.processor.state().summary());
        info!(
            "Mode: {:?}, segment: {}s, retries: {}",
            options.mode, config.segment_secs, config.retries
        );
        if let Some(backup) = self.processor.state().recovered_from() {
            warn!("Started from an empty state; previous document kept at {}", backup.display());
        }
    }

    fn remove_temp_keyinfo(&self) {
        let path = self.processor.workspace().temp_keyinfo_path();
        match std::fs::remove_file(&path) {
            Ok(()) => debug!("Removed {}", path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Could not remove {}: {}", path.display(), e),
        }
    }
}
