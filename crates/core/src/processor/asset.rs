//! The per-file state machine.

use chrono::{Local, Utc};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use super::config::ProcessorConfig;
use super::error::{AssetError, PipelineError};
use super::types::AssetOutcome;
use crate::failed_list::FailedList;
use crate::fsutil::resolve_path;
use crate::identity::IdentityAssigner;
use crate::keyinfo::KeyMaterial;
use crate::manifest::{ManifestAppender, ManifestEntry};
use crate::metadata::{round_millis, AssetMetadata, OutputInfo};
use crate::metrics;
use crate::relocate::relocate;
use crate::state::{AssetRecord, StateStore};
use crate::toolchain::{cover_seek_secs, PackageJob, Packager};
use crate::workspace::Workspace;

/// Everything fixed for one asset across its attempts.
struct AssetContext {
    key: String,
    src: PathBuf,
    file_name: String,
    stem: String,
    asset_id: String,
    asset_dir: PathBuf,
    playlist_name: String,
}

/// Splits attempt failures that are retried from those that end the run.
enum AttemptError {
    Asset(AssetError),
    Fatal(PipelineError),
}

impl From<AssetError> for AttemptError {
    fn from(e: AssetError) -> Self {
        Self::Asset(e)
    }
}

/// Drives one source file through probe, cover, package, metadata and
/// relocation, recording every transition before moving on.
///
/// The processor owns the state store and the two append-only logs for the
/// duration of a run. Processing is strictly sequential: the shared key-info
/// file is rewritten before each packaging call.
pub struct AssetProcessor<P: Packager> {
    config: ProcessorConfig,
    packager: Arc<P>,
    workspace: Workspace,
    key: KeyMaterial,
    identity: IdentityAssigner,
    state: StateStore,
    manifest: ManifestAppender,
    failed_list: FailedList,
    run_id: Uuid,
}

impl<P: Packager> AssetProcessor<P> {
    pub fn new(
        config: ProcessorConfig,
        packager: Arc<P>,
        workspace: Workspace,
        key: KeyMaterial,
        identity: IdentityAssigner,
        state: StateStore,
    ) -> Self {
        let manifest = ManifestAppender::new(workspace.manifest_path());
        let failed_list = FailedList::new(workspace.failed_list_path());
        Self {
            config,
            packager,
            workspace,
            key,
            identity,
            state,
            manifest,
            failed_list,
            run_id: Uuid::new_v4(),
        }
    }

    /// Overrides the run id stamped on manifest entries.
    pub fn with_run_id(mut self, run_id: Uuid) -> Self {
        self.run_id = run_id;
        self
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn state(&self) -> &StateStore {
        &self.state
    }

    pub fn failed_list(&self) -> &FailedList {
        &self.failed_list
    }

    /// Processes one source file to a terminal outcome.
    ///
    /// Per-asset failures come back as `AssetOutcome::FinalFailure`; an `Err`
    /// means bookkeeping could not be persisted and the run must stop.
    pub async fn process(&mut self, src: &Path) -> Result<AssetOutcome, PipelineError> {
        let key = StateStore::key_for(src);
        let file_name = src
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        if let Some(record) = self.state.get(&key).filter(|r| r.is_done()) {
            info!("SKIP done: {}", file_name);
            metrics::ASSETS_TOTAL.with_label_values(&["skipped"]).inc();
            return Ok(AssetOutcome::Success {
                asset_id: record.asset_id.clone(),
                skipped: true,
                moved_to: None,
            });
        }

        let src_abs = resolve_path(src);
        let asset_id = match self.identity.identity(&src_abs) {
            Ok(id) => id,
            Err(source) => {
                let error = AssetError::Source {
                    path: src_abs.clone(),
                    source,
                };
                error!("FAIL {}: {}", file_name, error);
                self.failed_list.append(&src_abs, &error.to_string())?;
                metrics::ASSETS_TOTAL.with_label_values(&["failed"]).inc();
                return Ok(AssetOutcome::FinalFailure {
                    asset_id: String::new(),
                    error,
                });
            }
        };

        let asset_dir = self.workspace.asset_dir(&asset_id);
        std::fs::create_dir_all(&asset_dir).map_err(|source| PipelineError::Io {
            path: asset_dir.clone(),
            source,
        })?;

        let ctx = AssetContext {
            stem: src_abs
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default(),
            key,
            src: src_abs,
            file_name,
            asset_dir: resolve_path(&asset_dir),
            playlist_name: self
                .config
                .playlist_name(&Local::now().format("%Y%m%d_%H%M%S").to_string()),
            asset_id,
        };

        let span = info_span!("asset", asset_id = %ctx.asset_id, file = %ctx.file_name);
        self.run_attempts(ctx).instrument(span).await
    }

    async fn run_attempts(&mut self, ctx: AssetContext) -> Result<AssetOutcome, PipelineError> {
        self.warn_on_collision(&ctx);

        let attempts = self.config.max_attempts();
        let mut manifest_written = false;
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            self.state.record(
                &ctx.key,
                AssetRecord::processing(&ctx.asset_id, ctx.src.clone()),
            )?;

            match self.attempt(&ctx, &mut manifest_written).await {
                Ok(record) => {
                    let moved_to = record.src_moved_to.clone();
                    self.state.record(&ctx.key, record)?;
                    metrics::ATTEMPTS_TOTAL.with_label_values(&["success"]).inc();
                    metrics::ASSETS_TOTAL.with_label_values(&["done"]).inc();
                    info!("DONE: {} -> asset_id={}", ctx.file_name, ctx.asset_id);
                    return Ok(AssetOutcome::Success {
                        asset_id: ctx.asset_id,
                        skipped: false,
                        moved_to,
                    });
                }
                Err(AttemptError::Fatal(e)) => return Err(e),
                Err(AttemptError::Asset(e)) => {
                    metrics::ATTEMPTS_TOTAL.with_label_values(&["failure"]).inc();
                    metrics::ATTEMPT_FAILURES
                        .with_label_values(&[e.stage()])
                        .inc();
                    error!("FAIL attempt {}/{}: {} | {}", attempt, attempts, ctx.file_name, e);

                    last_error = e.to_string();
                    self.state.record(
                        &ctx.key,
                        AssetRecord::failed(&ctx.asset_id, ctx.src.clone(), last_error.clone()),
                    )?;

                    if attempt < attempts {
                        warn!("RETRY will run again: {}", ctx.file_name);
                        tokio::time::sleep(self.config.retry_delay()).await;
                    }
                }
            }
        }

        self.finalize_failure(ctx, attempts, last_error).await
    }

    /// One full pass over every step. Partial outputs of an earlier attempt
    /// are overwritten, never resumed.
    async fn attempt(
        &self,
        ctx: &AssetContext,
        manifest_written: &mut bool,
    ) -> Result<AssetRecord, AttemptError> {
        let info = timed("probe", self.packager.probe(&ctx.src))
            .await
            .map_err(|e| AssetError::Probe(e.detail()))?;
        let duration_sec = info.duration_whole_secs();

        let cover_path = ctx.asset_dir.join(&self.config.cover_name);
        timed(
            "cover",
            self.packager
                .extract_cover(&ctx.src, &cover_path, cover_seek_secs(info.duration_secs)),
        )
        .await
        .map_err(|e| AssetError::Cover(e.detail()))?;

        let key_info_path = self.workspace.temp_keyinfo_path();
        self.key
            .write_key_info(&key_info_path)
            .map_err(|e| AssetError::Packaging(e.to_string()))?;

        let job = PackageJob {
            input_path: ctx.src.clone(),
            output_dir: ctx.asset_dir.clone(),
            playlist_name: ctx.playlist_name.clone(),
            segment_pattern: self.config.segment_pattern.clone(),
            segment_secs: self.config.segment_secs,
            key_info_path,
        };
        let output = timed("package", self.packager.package(job))
            .await
            .map_err(|e| AssetError::Packaging(e.detail()))?;
        let playlist = output
            .playlist_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| ctx.playlist_name.clone());

        let created_at = Utc::now();
        let meta = AssetMetadata {
            asset_id: ctx.asset_id.clone(),
            original_filename: ctx.file_name.clone(),
            original_stem: ctx.stem.clone(),
            source_abs: ctx.src.clone(),
            created_at,
            hls_time: self.config.segment_secs,
            duration: round_millis(info.duration_secs),
            duration_sec,
            width: info.width,
            height: info.height,
            output: OutputInfo {
                dir: ctx.asset_dir.clone(),
                playlist: playlist.clone(),
                cover: self.config.cover_name.clone(),
                segments_pattern: self.config.segment_pattern.clone(),
                encryption: "AES-128".to_string(),
                key_uri: self.key.key_uri().to_string(),
            },
        };
        let started = Instant::now();
        meta.write_to(&ctx.asset_dir)
            .map_err(|e| AssetError::Metadata(e.to_string()))?;
        observe("metadata", started);

        // A retry after a failed move must not log the asset as done twice.
        if !*manifest_written {
            self.manifest
                .append(&ManifestEntry::Done {
                    created_at,
                    run_id: self.run_id,
                    asset_id: ctx.asset_id.clone(),
                    original_filename: ctx.file_name.clone(),
                    original_stem: ctx.stem.clone(),
                    output_dir: ctx.asset_dir.clone(),
                    playlist: playlist.clone(),
                    cover: self.config.cover_name.clone(),
                    duration_sec,
                    width: info.width,
                    height: info.height,
                })
                .map_err(|e| AttemptError::Fatal(e.into()))?;
            *manifest_written = true;
        }

        let moved = timed("relocate", relocate(&ctx.src, &self.workspace.pending_dir()))
            .await
            .map_err(AssetError::from)?;

        Ok(AssetRecord {
            output_dir: Some(ctx.asset_dir.clone()),
            playlist: Some(playlist),
            cover: Some(self.config.cover_name.clone()),
            duration_sec: Some(duration_sec),
            width: Some(info.width),
            height: Some(info.height),
            src_moved_to: Some(resolve_path(&moved)),
            ..AssetRecord::done(&ctx.asset_id)
        })
    }

    /// Moves the source aside and records the final failure in the failed
    /// list and the manifest.
    async fn finalize_failure(
        &mut self,
        ctx: AssetContext,
        attempts: u32,
        last_error: String,
    ) -> Result<AssetOutcome, PipelineError> {
        let moved = match relocate(&ctx.src, &self.workspace.failed_dir()).await {
            Ok(moved) => resolve_path(&moved),
            Err(e) => {
                error!("Also failed to move into failed/: {}", e);
                ctx.src.clone()
            }
        };

        self.failed_list.append(&moved, &last_error)?;
        self.manifest.append(&ManifestEntry::Failed {
            created_at: Utc::now(),
            run_id: self.run_id,
            asset_id: ctx.asset_id.clone(),
            original_filename: ctx.file_name.clone(),
            original_stem: ctx.stem.clone(),
            error: last_error.clone(),
        })?;
        metrics::ASSETS_TOTAL.with_label_values(&["failed"]).inc();

        Ok(AssetOutcome::FinalFailure {
            asset_id: ctx.asset_id,
            error: AssetError::ExhaustedRetries {
                attempts,
                last: last_error,
            },
        })
    }

    /// Logs other state keys that map to the same asset id.
    ///
    /// The same file showing up again from `input/`, `pending/` or `failed/`
    /// is expected; anything else is two different sources sharing one output
    /// directory.
    fn warn_on_collision(&self, ctx: &AssetContext) {
        let holding_dirs = [
            resolve_path(&self.workspace.input_dir()),
            resolve_path(&self.workspace.pending_dir()),
            resolve_path(&self.workspace.failed_dir()),
        ];

        for other in self.state.other_keys_for_asset(&ctx.asset_id, &ctx.key) {
            let other_path = Path::new(other);
            let same_name = other_path
                .file_name()
                .is_some_and(|n| n.to_string_lossy() == ctx.file_name);
            let known_dir = other_path
                .parent()
                .is_some_and(|p| holding_dirs.iter().any(|d| d == p));

            if !(same_name && known_dir) {
                warn!(
                    "Asset id {} is shared by {} and {}; outputs will overwrite each other",
                    ctx.asset_id,
                    ctx.key,
                    other
                );
            }
        }
    }
}

/// Awaits `fut`, recording how long it took under `stage`.
async fn timed<T>(stage: &str, fut: impl Future<Output = T>) -> T {
    let started = Instant::now();
    let out = fut.await;
    observe(stage, started);
    out
}

fn observe(stage: &str, started: Instant) {
    metrics::STAGE_DURATION
        .with_label_values(&[stage])
        .observe(started.elapsed().as_secs_f64());
}
