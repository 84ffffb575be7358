//! FFmpeg-based packager implementation.

use async_trait::async_trait;
use regex_lite::Regex;
use serde::Deserialize;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use tokio::process::Command;

use super::config::ToolchainConfig;
use super::error::ToolchainError;
use super::traits::Packager;
use super::types::{MediaInfo, PackageJob, PackageOutput};

/// Lines of stderr kept in error records.
const STDERR_TAIL_LINES: usize = 20;

/// FFmpeg-based packager implementation.
pub struct FfmpegPackager {
    config: ToolchainConfig,
}

impl FfmpegPackager {
    /// Creates a new FFmpeg packager with the given configuration.
    pub fn new(config: ToolchainConfig) -> Self {
        Self { config }
    }

    /// Creates a packager with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(ToolchainConfig::default())
    }

    /// Builds ffprobe arguments.
    fn build_probe_args(path: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = [
            "-v",
            "error",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ]
        .iter()
        .map(OsString::from)
        .collect();
        args.push(path.as_os_str().to_owned());
        args
    }

    /// Builds ffmpeg arguments for grabbing the cover frame.
    fn build_cover_args(&self, input_path: &Path, output_path: &Path, seek_secs: f64) -> Vec<OsString> {
        vec![
            "-y".into(),
            "-ss".into(),
            format!("{:.3}", seek_secs).into(),
            "-i".into(),
            input_path.as_os_str().to_owned(),
            "-vframes".into(),
            "1".into(),
            "-q:v".into(),
            self.config.cover_quality.to_string().into(),
            "-loglevel".into(),
            self.config.log_level.clone().into(),
            output_path.as_os_str().to_owned(),
        ]
    }

    /// Builds ffmpeg arguments for the encrypted HLS package.
    ///
    /// Streams are copied as-is; only the container is segmented.
    fn build_package_args(&self, job: &PackageJob) -> Vec<OsString> {
        vec![
            "-y".into(),
            "-i".into(),
            job.input_path.as_os_str().to_owned(),
            "-c".into(),
            "copy".into(),
            "-hls_time".into(),
            job.segment_secs.to_string().into(),
            "-hls_list_size".into(),
            "0".into(),
            "-hls_playlist_type".into(),
            "vod".into(),
            "-hls_key_info_file".into(),
            job.key_info_path.as_os_str().to_owned(),
            "-hls_segment_filename".into(),
            job.output_dir.join(&job.segment_pattern).into_os_string(),
            "-loglevel".into(),
            self.config.log_level.clone().into(),
            job.playlist_path().into_os_string(),
        ]
    }

    /// Parses ffprobe JSON output into MediaInfo.
    fn parse_probe_output(path: &Path, output: &str) -> Result<MediaInfo, ToolchainError> {
        #[derive(Deserialize)]
        struct ProbeOutput {
            format: ProbeFormat,
            #[serde(default)]
            streams: Vec<ProbeStream>,
        }

        #[derive(Deserialize)]
        struct ProbeFormat {
            duration: Option<String>,
        }

        #[derive(Deserialize)]
        struct ProbeStream {
            codec_type: String,
            width: Option<u32>,
            height: Option<u32>,
        }

        let probe: ProbeOutput =
            serde_json::from_str(output).map_err(|e| ToolchainError::ParseError {
                reason: format!("Failed to parse ffprobe output: {}", e),
            })?;

        let duration_secs = probe
            .format
            .duration
            .as_deref()
            .and_then(|d| d.trim().parse::<f64>().ok())
            .filter(|d| d.is_finite() && *d >= 0.0)
            .ok_or_else(|| ToolchainError::ParseError {
                reason: "ffprobe reported no usable duration".to_string(),
            })?;

        // Primary video stream
        let video = probe
            .streams
            .iter()
            .find(|s| s.codec_type == "video")
            .ok_or_else(|| ToolchainError::ParseError {
                reason: "no video stream".to_string(),
            })?;

        match (video.width, video.height) {
            (Some(width), Some(height)) if width > 0 && height > 0 => Ok(MediaInfo {
                path: path.to_path_buf(),
                duration_secs,
                width,
                height,
            }),
            _ => Err(ToolchainError::ParseError {
                reason: "video stream has no dimensions".to_string(),
            }),
        }
    }

    /// Regex matching the file names produced by a printf-style segment pattern.
    fn segment_regex(pattern: &str) -> Regex {
        let placeholder = Regex::new(r"%0?(\d*)d").expect("static regex");
        let mut expr = String::from("^");
        let mut last = 0;
        for caps in placeholder.captures_iter(pattern) {
            let whole = caps.get(0).expect("group 0 always present");
            expr.push_str(&regex_lite::escape(&pattern[last..whole.start()]));
            match caps.get(1).map(|m| m.as_str()).filter(|w| !w.is_empty()) {
                Some(width) => expr.push_str(&format!(r"\d{{{},}}", width)),
                None => expr.push_str(r"\d+"),
            }
            last = whole.end();
        }
        expr.push_str(&regex_lite::escape(&pattern[last..]));
        expr.push('$');
        Regex::new(&expr).expect("escaped pattern is a valid regex")
    }

    /// Lists segment files in `dir` matching `pattern`.
    async fn list_segments(dir: &Path, pattern: &str) -> Result<Vec<PathBuf>, ToolchainError> {
        let re = Self::segment_regex(pattern);
        let mut segments = Vec::new();
        let mut entries = match tokio::fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(segments),
            Err(e) => return Err(e.into()),
        };
        while let Some(entry) = entries.next_entry().await? {
            if let Some(name) = entry.file_name().to_str() {
                if re.is_match(name) {
                    segments.push(entry.path());
                }
            }
        }
        segments.sort();
        Ok(segments)
    }

    /// Runs ffmpeg to completion, mapping a missing binary to `FfmpegNotFound`.
    async fn run_ffmpeg(&self, args: &[OsString]) -> Result<Output, ToolchainError> {
        Command::new(&self.config.ffmpeg_path)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    ToolchainError::FfmpegNotFound {
                        path: self.config.ffmpeg_path.clone(),
                    }
                } else {
                    ToolchainError::Io(e)
                }
            })
    }

    /// Last lines of a process' stderr, or None when it printed nothing.
    fn stderr_tail(output: &Output) -> Option<String> {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let lines: Vec<&str> = stderr.lines().filter(|l| !l.trim().is_empty()).collect();
        if lines.is_empty() {
            return None;
        }
        let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
        Some(lines[start..].join("\n"))
    }

    async fn check_binary(path: &Path) -> Result<(), std::io::Error> {
        let status = Command::new(path)
            .arg("-version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await?;
        if !status.success() {
            return Err(std::io::Error::other(format!(
                "{} -version exited with {}",
                path.display(),
                status
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl Packager for FfmpegPackager {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    async fn probe(&self, path: &Path) -> Result<MediaInfo, ToolchainError> {
        if !path.exists() {
            return Err(ToolchainError::InputNotFound {
                path: path.to_path_buf(),
            });
        }

        let output = Command::new(&self.config.ffprobe_path)
            .args(Self::build_probe_args(path))
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    ToolchainError::FfprobeNotFound {
                        path: self.config.ffprobe_path.clone(),
                    }
                } else {
                    ToolchainError::Io(e)
                }
            })?;

        if !output.status.success() {
            return Err(ToolchainError::probe_failed(format!(
                "ffprobe exited with code {:?}: {}",
                output.status.code(),
                Self::stderr_tail(&output).unwrap_or_default()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Self::parse_probe_output(path, &stdout)
    }

    async fn extract_cover(
        &self,
        input_path: &Path,
        output_path: &Path,
        seek_secs: f64,
    ) -> Result<(), ToolchainError> {
        if let Some(parent) = output_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let output = self
            .run_ffmpeg(&self.build_cover_args(input_path, output_path, seek_secs))
            .await?;

        if !output.status.success() {
            return Err(ToolchainError::cover_failed(
                format!("ffmpeg exited with code: {:?}", output.status.code()),
                Self::stderr_tail(&output),
            ));
        }

        if !output_path.exists() {
            return Err(ToolchainError::cover_failed("cover image not created", None));
        }

        Ok(())
    }

    async fn package(&self, job: PackageJob) -> Result<PackageOutput, ToolchainError> {
        tokio::fs::create_dir_all(&job.output_dir).await?;

        // Segments left behind by an earlier attempt are not resumed
        for stale in Self::list_segments(&job.output_dir, &job.segment_pattern).await? {
            tokio::fs::remove_file(&stale).await?;
        }

        let output = self.run_ffmpeg(&self.build_package_args(&job)).await?;

        if !output.status.success() {
            return Err(ToolchainError::packaging_failed(
                format!("ffmpeg exited with code: {:?}", output.status.code()),
                Self::stderr_tail(&output),
            ));
        }

        let playlist_path = job.playlist_path();
        if !playlist_path.exists() {
            return Err(ToolchainError::packaging_failed(
                "playlist not created",
                None,
            ));
        }

        let segment_count = Self::list_segments(&job.output_dir, &job.segment_pattern)
            .await?
            .len();
        if segment_count == 0 {
            return Err(ToolchainError::packaging_failed(
                "no segments written",
                None,
            ));
        }

        Ok(PackageOutput {
            playlist_path,
            segment_count,
        })
    }

    async fn validate(&self) -> Result<(), ToolchainError> {
        if let Err(e) = Self::check_binary(&self.config.ffmpeg_path).await {
            if e.kind() == std::io::ErrorKind::NotFound {
                return Err(ToolchainError::FfmpegNotFound {
                    path: self.config.ffmpeg_path.clone(),
                });
            }
            return Err(ToolchainError::Io(e));
        }

        if let Err(e) = Self::check_binary(&self.config.ffprobe_path).await {
            if e.kind() == std::io::ErrorKind::NotFound {
                return Err(ToolchainError::FfprobeNotFound {
                    path: self.config.ffprobe_path.clone(),
                });
            }
            return Err(ToolchainError::Io(e));
        }

        Ok(())
    }
}
