use chrono::{DateTime, SecondsFormat, Utc};
use std::path::PathBuf;
use thiserror::Error;

/// Separator between the fields of one line.
pub const FIELD_SEPARATOR: &str = " | ";

#[derive(Debug, Error)]
pub enum FailedListError {
    #[error("failed to read failed list {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write failed list {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// One line of the failed list.
#[derive(Debug, Clone, PartialEq)]
pub struct FailedListEntry {
    pub path: PathBuf,
    pub reason: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
}

impl FailedListEntry {
    pub fn new(path: PathBuf, reason: &str, timestamp: DateTime<Utc>) -> Self {
        Self {
            path,
            reason: Some(sanitize_reason(reason)),
            timestamp: Some(timestamp),
        }
    }

    /// Parses one line; blank lines and lines with an empty path yield None.
    ///
    /// Fields are split on the full `" | "` separator, so a bare `|` inside a
    /// file name stays part of the path.
    ///
    /// A timestamp that does not parse is dropped rather than rejecting the
    /// line, since the path is what a rerun needs.
    pub fn parse(line: &str) -> Option<Self> {
        if line.trim().is_empty() {
            return None;
        }

        let mut fields = line.splitn(3, FIELD_SEPARATOR);
        let path = fields.next().map(str::trim).filter(|p| !p.is_empty())?;
        let reason = fields
            .next()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(String::from);
        let timestamp = fields
            .next()
            .and_then(|t| DateTime::parse_from_rfc3339(t.trim()).ok())
            .map(|t| t.with_timezone(&Utc));

        Some(Self {
            path: PathBuf::from(path),
            reason,
            timestamp,
        })
    }

    /// Renders the entry as one line without the trailing newline.
    pub fn to_line(&self) -> String {
        let mut line = self.path.to_string_lossy().into_owned();
        if let Some(reason) = &self.reason {
            line.push_str(FIELD_SEPARATOR);
            line.push_str(&sanitize_reason(reason));
            if let Some(ts) = &self.timestamp {
                line.push_str(FIELD_SEPARATOR);
                line.push_str(&ts.to_rfc3339_opts(SecondsFormat::Secs, true));
            }
        }
        line
    }
}

/// Collapses a free-form error message into a single delimiter-free line.
pub fn sanitize_reason(reason: &str) -> String {
    let flattened: String = reason
        .chars()
        .map(|c| match c {
            '\n' | '\r' | '\t' => ' ',
            '|' => '/',
            other => other,
        })
        .collect();
    flattened.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_sanitize_reason() {
        assert_eq!(
            sanitize_reason("ffmpeg failed:\r\n  moov atom not found | exit 1\n"),
            "ffmpeg failed: moov atom not found / exit 1"
        );
    }

    #[test]
    fn test_parse_full_line() {
        let entry =
            FailedListEntry::parse("/w/failed/a.mp4 | probe failed | 2026-10-18T09:12:44Z")
                .unwrap();
        assert_eq!(entry.path, PathBuf::from("/w/failed/a.mp4"));
        assert_eq!(entry.reason.as_deref(), Some("probe failed"));
        assert_eq!(
            entry.timestamp,
            Some(Utc.with_ymd_and_hms(2026, 10, 18, 9, 12, 44).unwrap())
        );
    }

    #[test]
    fn test_parse_bare_path() {
        let entry = FailedListEntry::parse("  /w/failed/a.mp4  ").unwrap();
        assert_eq!(entry.path, PathBuf::from("/w/failed/a.mp4"));
        assert!(entry.reason.is_none());
        assert!(entry.timestamp.is_none());
    }

    #[test]
    fn test_parse_legacy_timestamp_is_dropped() {
        let entry = FailedListEntry::parse("/w/a.mp4 | boom | 2026-10-18 09:12:44").unwrap();
        assert_eq!(entry.reason.as_deref(), Some("boom"));
        assert!(entry.timestamp.is_none());
    }

    #[test]
    fn test_parse_rejects_blank_and_pathless() {
        assert!(FailedListEntry::parse("").is_none());
        assert!(FailedListEntry::parse("   ").is_none());
        assert!(FailedListEntry::parse(" | reason | 2026-10-18T09:12:44Z").is_none());
    }

    #[test]
    fn test_pipe_in_file_name_survives() {
        let bare = FailedListEntry::parse("/w/failed/a|b.mp4").unwrap();
        assert_eq!(bare.path, PathBuf::from("/w/failed/a|b.mp4"));
        assert!(bare.reason.is_none());

        let ts = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        let entry = FailedListEntry::new(PathBuf::from("/w/failed/a|b.mp4"), "probe failed", ts);
        assert_eq!(FailedListEntry::parse(&entry.to_line()).unwrap(), entry);
    }

    #[test]
    fn test_line_round_trip() {
        let ts = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        let entry = FailedListEntry::new(PathBuf::from("/w/a.mp4"), "bad\nthing", ts);
        let line = entry.to_line();
        assert_eq!(line, "/w/a.mp4 | bad thing | 2026-01-02T03:04:05Z");
        assert_eq!(FailedListEntry::parse(&line).unwrap(), entry);
    }
}
