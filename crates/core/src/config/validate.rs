use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Segment duration is not 0
/// - At least one input extension is configured
/// - Output names are not empty
/// - The segment pattern numbers its files
/// - Toolchain binaries are named
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let packaging = &config.packaging;

    if packaging.segment_secs == 0 {
        return Err(ConfigError::ValidationError(
            "packaging.segment_secs cannot be 0".to_string(),
        ));
    }

    if packaging.extensions.iter().all(|ext| ext.trim().is_empty()) {
        return Err(ConfigError::ValidationError(
            "packaging.extensions must name at least one extension".to_string(),
        ));
    }

    if packaging.playlist_prefix.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "packaging.playlist_prefix cannot be empty".to_string(),
        ));
    }

    if packaging.cover_name.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "packaging.cover_name cannot be empty".to_string(),
        ));
    }

    if !has_integer_directive(&packaging.segment_pattern) {
        return Err(ConfigError::ValidationError(format!(
            "packaging.segment_pattern '{}' needs an integer directive such as %05d",
            packaging.segment_pattern
        )));
    }

    let toolchain = &config.toolchain;
    if toolchain.ffmpeg_path.as_os_str().is_empty() || toolchain.ffprobe_path.as_os_str().is_empty()
    {
        return Err(ConfigError::ValidationError(
            "toolchain.ffmpeg_path and toolchain.ffprobe_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn has_integer_directive(pattern: &str) -> bool {
    pattern.split('%').skip(1).any(|rest| {
        let digits = rest.trim_start_matches(|c: char| c.is_ascii_digit());
        digits.starts_with('d')
    })
}
