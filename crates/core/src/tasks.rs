//! Building the ordered list of sources for a run.

use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::failed_list::{FailedList, FailedListError};
use crate::fsutil::resolve_path;
use crate::processor::ProcessorConfig;

#[derive(Debug, Error)]
pub enum TaskError {
    #[error("failed to list input directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    FailedList(#[from] FailedListError),
}

/// Where a run takes its sources from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunMode {
    /// Every recognized file directly inside `input/`.
    #[default]
    Normal,
    /// Only entries of the failed list that still exist.
    RerunFailed,
}

/// Lists sources for `mode`.
///
/// Normal mode returns the recognized files in `input_dir` (not recursive),
/// ordered by lowercase file name. Rerun mode returns failed-list entries in
/// list order, dropping paths that no longer exist or are not recognized.
pub fn enumerate_tasks(
    mode: RunMode,
    input_dir: &Path,
    failed_list: &FailedList,
    config: &ProcessorConfig,
) -> Result<Vec<PathBuf>, TaskError> {
    match mode {
        RunMode::Normal => scan_input(input_dir, config),
        RunMode::RerunFailed => Ok(failed_list
            .load()?
            .into_iter()
            .map(|entry| entry.path)
            .filter(|path| path.is_file() && is_recognized(path, config))
            .map(|path| resolve_path(&path))
            .collect()),
    }
}

fn scan_input(input_dir: &Path, config: &ProcessorConfig) -> Result<Vec<PathBuf>, TaskError> {
    let read_err = |source| TaskError::ReadDir {
        path: input_dir.to_path_buf(),
        source,
    };

    let mut tasks = Vec::new();
    for entry in std::fs::read_dir(input_dir).map_err(read_err)? {
        let path = entry.map_err(read_err)?.path();
        if path.is_file() && is_recognized(&path, config) {
            tasks.push(path);
        }
    }

    tasks.sort_by_cached_key(|p| {
        p.file_name()
            .map(|n| n.to_string_lossy().to_lowercase())
            .unwrap_or_default()
    });
    Ok(tasks)
}

fn is_recognized(path: &Path, config: &ProcessorConfig) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| config.accepts_extension(e))
}
