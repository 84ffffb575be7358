//! Mock packager for testing.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::toolchain::{MediaInfo, PackageJob, PackageOutput, Packager, ToolchainError};

/// Which toolchain call a recorded invocation was.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockCall {
    Probe,
    Cover,
    Package,
}

/// A recorded invocation for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub call: MockCall,
    pub input_path: PathBuf,
    pub success: bool,
}

/// Mock implementation of the Packager trait.
///
/// Writes small placeholder files where ffmpeg would write real ones, so the
/// pipeline's own checks and the on-disk layout can be asserted:
/// - `probe` fails for missing inputs and otherwise returns the configured
///   media info
/// - `extract_cover` writes a stub JPEG
/// - `package` writes a playlist and one segment named after the job's pattern
///
/// Each call can be scripted to fail a number of times before succeeding.
///
/// # Example
///
/// ```rust,ignore
/// use hlspack_core::testing::MockPackager;
///
/// let packager = Arc::new(MockPackager::new());
/// packager.fail_package(1).await; // first package call fails, second succeeds
///
/// // ... run the processor ...
///
/// assert_eq!(packager.call_count(MockCall::Package).await, 2);
/// ```
#[derive(Debug)]
pub struct MockPackager {
    calls: Arc<RwLock<Vec<RecordedCall>>>,
    jobs: Arc<RwLock<Vec<PackageJob>>>,
    media_info: Arc<RwLock<MediaInfo>>,
    probe_failures: Arc<RwLock<u32>>,
    cover_failures: Arc<RwLock<u32>>,
    package_failures: Arc<RwLock<u32>>,
    validate_fails: Arc<RwLock<bool>>,
}

impl Default for MockPackager {
    fn default() -> Self {
        Self::new()
    }
}

impl MockPackager {
    /// Create a new mock that succeeds at everything.
    pub fn new() -> Self {
        Self {
            calls: Arc::new(RwLock::new(Vec::new())),
            jobs: Arc::new(RwLock::new(Vec::new())),
            media_info: Arc::new(RwLock::new(MediaInfo {
                path: PathBuf::new(),
                duration_secs: 61.5,
                width: 1280,
                height: 720,
            })),
            probe_failures: Arc::new(RwLock::new(0)),
            cover_failures: Arc::new(RwLock::new(0)),
            package_failures: Arc::new(RwLock::new(0)),
            validate_fails: Arc::new(RwLock::new(false)),
        }
    }

    /// Make the next `n` probes fail. `u32::MAX` fails forever.
    pub async fn fail_probe(&self, n: u32) {
        *self.probe_failures.write().await = n;
    }

    /// Make the next `n` cover extractions fail.
    pub async fn fail_cover(&self, n: u32) {
        *self.cover_failures.write().await = n;
    }

    /// Make the next `n` packaging runs fail.
    pub async fn fail_package(&self, n: u32) {
        *self.package_failures.write().await = n;
    }

    /// Make `validate` report a missing ffmpeg.
    pub async fn fail_validate(&self, fails: bool) {
        *self.validate_fails.write().await = fails;
    }

    /// Set what `probe` reports.
    pub async fn set_media_info(&self, duration_secs: f64, width: u32, height: u32) {
        let mut info = self.media_info.write().await;
        info.duration_secs = duration_secs;
        info.width = width;
        info.height = height;
    }

    /// Get all recorded calls.
    pub async fn recorded_calls(&self) -> Vec<RecordedCall> {
        self.calls.read().await.clone()
    }

    /// Number of calls of one kind.
    pub async fn call_count(&self, call: MockCall) -> usize {
        self.calls
            .read()
            .await
            .iter()
            .filter(|c| c.call == call)
            .count()
    }

    /// Total toolchain invocations of any kind.
    pub async fn total_calls(&self) -> usize {
        self.calls.read().await.len()
    }

    /// Jobs handed to `package`, failed ones included.
    pub async fn recorded_jobs(&self) -> Vec<PackageJob> {
        self.jobs.read().await.clone()
    }

    /// Consumes one scripted failure, if any remain.
    async fn take_failure(counter: &RwLock<u32>) -> bool {
        let mut remaining = counter.write().await;
        match *remaining {
            0 => false,
            u32::MAX => true,
            _ => {
                *remaining -= 1;
                true
            }
        }
    }

    async fn record(&self, call: MockCall, input_path: &Path, success: bool) {
        self.calls.write().await.push(RecordedCall {
            call,
            input_path: input_path.to_path_buf(),
            success,
        });
    }
}

/// Expands the first printf integer directive of `pattern` with `index`.
fn segment_file_name(pattern: &str, index: usize) -> String {
    let Some(start) = pattern.find('%') else {
        return pattern.to_string();
    };
    let rest = &pattern[start + 1..];
    let Some(end) = rest.find('d') else {
        return pattern.to_string();
    };
    let width: usize = rest[..end].trim_start_matches('0').parse().unwrap_or(0);
    format!(
        "{}{:0width$}{}",
        &pattern[..start],
        index,
        &rest[end + 1..],
        width = width
    )
}

#[async_trait]
impl Packager for MockPackager {
    fn name(&self) -> &str {
        "mock"
    }

    async fn probe(&self, path: &Path) -> Result<MediaInfo, ToolchainError> {
        if !path.exists() {
            self.record(MockCall::Probe, path, false).await;
            return Err(ToolchainError::InputNotFound {
                path: path.to_path_buf(),
            });
        }
        if Self::take_failure(&self.probe_failures).await {
            self.record(MockCall::Probe, path, false).await;
            return Err(ToolchainError::probe_failed("mock probe failure"));
        }

        self.record(MockCall::Probe, path, true).await;
        let mut info = self.media_info.read().await.clone();
        info.path = path.to_path_buf();
        Ok(info)
    }

    async fn extract_cover(
        &self,
        input_path: &Path,
        output_path: &Path,
        _seek_secs: f64,
    ) -> Result<(), ToolchainError> {
        if Self::take_failure(&self.cover_failures).await {
            self.record(MockCall::Cover, input_path, false).await;
            return Err(ToolchainError::cover_failed(
                "mock cover failure",
                Some("Output file is empty, nothing was encoded".to_string()),
            ));
        }

        tokio::fs::write(output_path, b"\xFF\xD8\xFF\xD9").await?;
        self.record(MockCall::Cover, input_path, true).await;
        Ok(())
    }

    async fn package(&self, job: PackageJob) -> Result<PackageOutput, ToolchainError> {
        self.jobs.write().await.push(job.clone());

        if Self::take_failure(&self.package_failures).await {
            self.record(MockCall::Package, &job.input_path, false).await;
            return Err(ToolchainError::packaging_failed(
                "ffmpeg exited with status 1",
                Some("moov atom not found".to_string()),
            ));
        }

        let segment = segment_file_name(&job.segment_pattern, 0);
        tokio::fs::write(job.output_dir.join(&segment), b"segment").await?;

        let playlist_path = job.playlist_path();
        let playlist = format!(
            "#EXTM3U\n#EXT-X-VERSION:3\n#EXT-X-TARGETDURATION:{}\n#EXT-X-PLAYLIST-TYPE:VOD\n#EXTINF:{}.0,\n{}\n#EXT-X-ENDLIST\n",
            job.segment_secs, job.segment_secs, segment
        );
        tokio::fs::write(&playlist_path, playlist).await?;

        self.record(MockCall::Package, &job.input_path, true).await;
        Ok(PackageOutput {
            playlist_path,
            segment_count: 1,
        })
    }

    async fn validate(&self) -> Result<(), ToolchainError> {
        if *self.validate_fails.read().await {
            return Err(ToolchainError::FfmpegNotFound {
                path: PathBuf::from("ffmpeg"),
            });
        }
        Ok(())
    }
}
