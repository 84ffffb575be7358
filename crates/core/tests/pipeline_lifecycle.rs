//! Asset processor lifecycle integration tests.
//!
//! These tests drive the processor against a temporary workspace with the
//! mock packager:
//! - Successful packaging and the resulting on-disk layout
//! - Retries, the attempt bound and final failure bookkeeping
//! - Skipping of sources already done, across processor instances
//! - Recovery from an interrupted attempt

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;

use hlspack_core::{
    fsutil::resolve_path,
    metadata::{AssetMetadata, FILENAME_FILE, TITLE_FILE},
    read_manifest,
    testing::{fixtures, MockCall, MockPackager},
    AssetError, AssetOutcome, AssetProcessor, AssetRecord, AssetStatus, FailedList,
    IdentityAssigner, ManifestEntry, ProcessorConfig, StateStore, Workspace,
};

/// Test helper owning a workspace and a shared mock packager.
struct TestHarness {
    workspace: Workspace,
    packager: Arc<MockPackager>,
    _temp_dir: TempDir,
}

impl TestHarness {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let workspace = fixtures::workspace(&resolve_path(temp_dir.path()));
        Self {
            workspace,
            packager: Arc::new(MockPackager::new()),
            _temp_dir: temp_dir,
        }
    }

    /// A processor with a fresh view of the state file on disk.
    fn processor(&self, retries: u32) -> AssetProcessor<MockPackager> {
        let config = ProcessorConfig::default()
            .with_retries(retries)
            .with_retry_delay(std::time::Duration::ZERO);
        AssetProcessor::new(
            config,
            Arc::clone(&self.packager),
            self.workspace.clone(),
            fixtures::key_material(&self.workspace),
            IdentityAssigner::default(),
            StateStore::open(self.workspace.state_path()).expect("Failed to open state"),
        )
    }

    fn source(&self, name: &str) -> PathBuf {
        fixtures::source_file(&self.workspace, name, b"not really a video")
    }

    fn manifest(&self) -> Vec<ManifestEntry> {
        read_manifest(&self.workspace.manifest_path()).expect("Failed to read manifest")
    }

    fn state_record(&self, src: &Path) -> AssetRecord {
        let store = StateStore::open(self.workspace.state_path()).unwrap();
        store
            .get(&StateStore::key_for(src))
            .cloned()
            .expect("source has a state record")
    }
}

fn count_done(entries: &[ManifestEntry]) -> usize {
    entries.iter().filter(|e| e.is_done()).count()
}

#[tokio::test]
async fn test_single_success_produces_package() {
    let harness = TestHarness::new();
    let src = harness.source("Intro Scene.mp4");
    let mut processor = harness.processor(0);

    let outcome = processor.process(&src).await.unwrap();

    let AssetOutcome::Success {
        asset_id,
        skipped,
        moved_to,
    } = outcome
    else {
        panic!("expected success");
    };
    assert!(!skipped);
    assert_eq!(asset_id.len(), 64);

    // Package contents
    let asset_dir = harness.workspace.asset_dir(&asset_id);
    let meta = AssetMetadata::read_from(&asset_dir).unwrap();
    assert_eq!(meta.asset_id, asset_id);
    assert_eq!(meta.original_filename, "Intro Scene.mp4");
    assert_eq!(meta.original_stem, "Intro Scene");
    assert_eq!(meta.hls_time, 6);
    assert_eq!(meta.duration_sec, 62);
    assert_eq!((meta.width, meta.height), (1280, 720));
    assert_eq!(meta.output.key_uri, fixtures::KEY_URI);
    assert!(meta.output.playlist.starts_with("playlist_"));
    assert!(asset_dir.join(&meta.output.playlist).exists());
    assert!(asset_dir.join("seg_00000.ts").exists());
    assert!(asset_dir.join("cover.jpg").exists());
    assert_eq!(
        std::fs::read_to_string(asset_dir.join(TITLE_FILE)).unwrap(),
        "Intro Scene"
    );
    assert_eq!(
        std::fs::read_to_string(asset_dir.join(FILENAME_FILE)).unwrap(),
        "Intro Scene.mp4"
    );

    // Source moved out of input/
    let pending = harness.workspace.pending_dir().join("Intro Scene.mp4");
    assert!(!src.exists());
    assert!(pending.exists());
    assert_eq!(moved_to, Some(pending.clone()));

    // Manifest and state
    let manifest = harness.manifest();
    assert_eq!(manifest.len(), 1);
    assert!(manifest[0].is_done());
    assert_eq!(manifest[0].asset_id(), asset_id);

    let record = harness.state_record(&src);
    assert_eq!(record.status, AssetStatus::Done);
    assert_eq!(record.src_moved_to, Some(pending));
    assert_eq!(record.playlist, Some(meta.output.playlist));

    // Key info was staged for the packager
    let jobs = harness.packager.recorded_jobs().await;
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].key_info_path, harness.workspace.temp_keyinfo_path());
    let staged = std::fs::read_to_string(harness.workspace.temp_keyinfo_path()).unwrap();
    assert_eq!(staged.lines().next(), Some(fixtures::KEY_URI));
}

#[tokio::test]
async fn test_retry_then_success_records_single_done() {
    let harness = TestHarness::new();
    let src = harness.source("clip.mp4");
    harness.packager.fail_package(1).await;
    let mut processor = harness.processor(1);

    let outcome = processor.process(&src).await.unwrap();

    assert!(outcome.is_success());
    assert_eq!(harness.packager.call_count(MockCall::Probe).await, 2);
    assert_eq!(harness.packager.call_count(MockCall::Package).await, 2);
    assert!(harness.workspace.pending_dir().join("clip.mp4").exists());

    let manifest = harness.manifest();
    assert_eq!(manifest.len(), 1);
    assert_eq!(count_done(&manifest), 1);

    let record = harness.state_record(&src);
    assert_eq!(record.status, AssetStatus::Done);
    assert!(record.error.is_none());
    assert!(FailedList::new(harness.workspace.failed_list_path())
        .load()
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_probe_failure_moves_source_to_failed() {
    let harness = TestHarness::new();
    let src = harness.source("broken.mp4");
    harness.packager.fail_probe(u32::MAX).await;
    let mut processor = harness.processor(0);

    let outcome = processor.process(&src).await.unwrap();

    let AssetOutcome::FinalFailure { asset_id, error } = outcome else {
        panic!("expected final failure");
    };
    assert!(matches!(
        error,
        AssetError::ExhaustedRetries { attempts: 1, .. }
    ));

    let moved = harness.workspace.failed_dir().join("broken.mp4");
    assert!(!src.exists());
    assert!(moved.exists());
    assert_eq!(harness.packager.call_count(MockCall::Package).await, 0);

    let failed = FailedList::new(harness.workspace.failed_list_path())
        .load()
        .unwrap();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].path, resolve_path(&moved));
    assert!(failed[0].reason.as_deref().unwrap().contains("mock probe failure"));

    let manifest = harness.manifest();
    assert_eq!(manifest.len(), 1);
    assert!(!manifest[0].is_done());
    assert_eq!(manifest[0].asset_id(), asset_id);

    let record = harness.state_record(&src);
    assert_eq!(record.status, AssetStatus::Failed);
    assert!(record.error.unwrap().contains("Probe failed"));
}

#[tokio::test]
async fn test_attempts_are_bounded_by_retries() {
    let harness = TestHarness::new();
    let src = harness.source("stubborn.mp4");
    harness.packager.fail_package(u32::MAX).await;
    let mut processor = harness.processor(3);

    let outcome = processor.process(&src).await.unwrap();

    assert!(!outcome.is_success());
    assert_eq!(harness.packager.call_count(MockCall::Package).await, 4);
    assert_eq!(harness.packager.call_count(MockCall::Probe).await, 4);

    let manifest = harness.manifest();
    assert_eq!(manifest.len(), 1);
    assert_eq!(count_done(&manifest), 0);
}

#[tokio::test]
async fn test_done_source_is_skipped_without_toolchain() {
    let harness = TestHarness::new();
    let src = harness.source("again.mp4");

    harness.processor(0).process(&src).await.unwrap();
    let calls_after_first = harness.packager.total_calls().await;

    // A new processor reads the state back from disk
    let mut processor = harness.processor(0);
    let outcome = processor.process(&src).await.unwrap();

    assert!(outcome.is_skipped());
    assert_eq!(harness.packager.total_calls().await, calls_after_first);
    assert_eq!(count_done(&harness.manifest()), 1);
}

#[tokio::test]
async fn test_interrupted_attempt_is_reprocessed() {
    let harness = TestHarness::new();
    let src = harness.source("interrupted.mp4");

    // A run killed mid-attempt leaves the record at `processing`
    let asset_id = IdentityAssigner::default().identity(&src).unwrap();
    let mut store = StateStore::open(harness.workspace.state_path()).unwrap();
    store
        .record(
            &StateStore::key_for(&src),
            AssetRecord::processing(asset_id.clone(), src.clone()),
        )
        .unwrap();
    drop(store);

    let outcome = harness.processor(0).process(&src).await.unwrap();

    assert!(outcome.is_success());
    assert_eq!(outcome.asset_id(), asset_id);
    assert_eq!(harness.packager.call_count(MockCall::Package).await, 1);
    assert_eq!(harness.state_record(&src).status, AssetStatus::Done);
}

#[tokio::test]
async fn test_failed_move_to_pending_logs_done_once() {
    let harness = TestHarness::new();
    let src = harness.source("stuck.mp4");

    // pending/ cannot be created while a plain file sits at its path
    std::fs::remove_dir(harness.workspace.pending_dir()).unwrap();
    std::fs::write(harness.workspace.pending_dir(), b"in the way").unwrap();

    let outcome = harness.processor(1).process(&src).await.unwrap();

    assert!(!outcome.is_success());
    assert_eq!(harness.packager.call_count(MockCall::Package).await, 2);
    let manifest = harness.manifest();
    assert_eq!(count_done(&manifest), 1);
    assert_eq!(manifest.len(), 2);
    assert!(harness.workspace.failed_dir().join("stuck.mp4").exists());
}

#[tokio::test]
async fn test_existing_name_in_pending_is_not_overwritten() {
    let harness = TestHarness::new();
    let taken = harness.workspace.pending_dir().join("dup.mp4");
    std::fs::write(&taken, b"earlier upload").unwrap();
    let src = harness.source("dup.mp4");

    let outcome = harness.processor(0).process(&src).await.unwrap();

    let AssetOutcome::Success { moved_to, .. } = outcome else {
        panic!("expected success");
    };
    let moved_to = moved_to.unwrap();
    assert_ne!(moved_to, taken);
    assert!(moved_to
        .file_name()
        .unwrap()
        .to_string_lossy()
        .starts_with("dup_"));
    assert_eq!(std::fs::read(&taken).unwrap(), b"earlier upload");
}

/// Collects formatted log output for assertions.
#[derive(Clone, Default)]
struct CapturedLogs(Arc<std::sync::Mutex<Vec<u8>>>);

impl std::io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl CapturedLogs {
    fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }

    /// Statuses of the `state transition` events, in order.
    fn state_transitions(&self) -> Vec<String> {
        self.text()
            .lines()
            .filter(|line| line.contains("state transition"))
            .filter_map(|line| line.split("status=").nth(1))
            .filter_map(|rest| rest.split_whitespace().next())
            .map(String::from)
            .collect()
    }
}

#[tokio::test]
async fn test_retry_records_each_transition_in_order() {
    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let harness = TestHarness::new();
    let src = harness.source("flaky.mp4");
    harness.packager.fail_package(1).await;

    let outcome = harness.processor(1).process(&src).await.unwrap();

    assert!(outcome.is_success());
    assert_eq!(
        logs.state_transitions(),
        vec!["processing", "failed", "processing", "done"]
    );
    assert_eq!(harness.state_record(&src).status, AssetStatus::Done);
}

#[tokio::test]
async fn test_identity_collision_is_logged() {
    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let harness = TestHarness::new();
    let elsewhere = harness.workspace.root().join("elsewhere");
    std::fs::create_dir(&elsewhere).unwrap();

    // same name, size and mtime in two unrelated places
    let first = elsewhere.join("same.mp4");
    std::fs::write(&first, b"AAAA").unwrap();
    let second = harness.source("same.mp4");
    std::fs::write(&second, b"BBBB").unwrap();
    let mtime = std::fs::metadata(&first).unwrap().modified().unwrap();
    std::fs::File::options()
        .write(true)
        .open(&second)
        .unwrap()
        .set_modified(mtime)
        .unwrap();

    let a = harness.processor(0).process(&first).await.unwrap();
    let b = harness.processor(0).process(&second).await.unwrap();

    assert_eq!(a.asset_id(), b.asset_id());
    assert!(logs.text().contains("is shared by"));
}

#[tokio::test]
async fn test_content_sample_separates_colliding_files() {
    let harness = TestHarness::new();
    let first = harness.workspace.root().join("x.mp4");
    std::fs::write(&first, b"AAAA").unwrap();
    let second = harness.source("x.mp4");
    std::fs::write(&second, b"BBBB").unwrap();
    let mtime = std::fs::metadata(&first).unwrap().modified().unwrap();
    std::fs::File::options()
        .write(true)
        .open(&second)
        .unwrap()
        .set_modified(mtime)
        .unwrap();

    let sampled = IdentityAssigner::new(&hlspack_core::IdentityConfig {
        content_sample_bytes: 4,
    });
    assert_eq!(
        IdentityAssigner::default().identity(&first).unwrap(),
        IdentityAssigner::default().identity(&second).unwrap()
    );
    assert_ne!(
        sampled.identity(&first).unwrap(),
        sampled.identity(&second).unwrap()
    );
}
