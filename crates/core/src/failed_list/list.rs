use chrono::Utc;
use std::collections::HashSet;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use super::types::{FailedListEntry, FailedListError};
use crate::fsutil::{resolve_path, write_atomic};

/// Handle on the failed-list file.
#[derive(Debug, Clone)]
pub struct FailedList {
    path: PathBuf,
}

impl FailedList {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the list, de-duplicated by resolved path.
    ///
    /// The first occurrence of a path wins and file order is kept. A missing
    /// file is an empty list.
    pub fn load(&self) -> Result<Vec<FailedListEntry>, FailedListError> {
        let text = match std::fs::read(&self.path) {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(FailedListError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        let mut seen = HashSet::new();
        let mut entries = Vec::new();
        for line in text.lines() {
            let Some(mut entry) = FailedListEntry::parse(line) else {
                continue;
            };
            entry.path = resolve_path(&entry.path);
            if seen.insert(entry.path.clone()) {
                entries.push(entry);
            }
        }
        Ok(entries)
    }

    /// Appends one failure stamped with the current time.
    pub fn append(&self, path: &Path, reason: &str) -> Result<(), FailedListError> {
        let entry = FailedListEntry::new(resolve_path(path), reason, Utc::now());
        let mut line = entry.to_line();
        line.push('\n');

        let write_err = |source| FailedListError::Write {
            path: self.path.clone(),
            source,
        };
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(write_err)?;
        file.write_all(line.as_bytes()).map_err(write_err)?;
        file.sync_data().map_err(write_err)?;

        tracing::debug!("Recorded failure of {} in {}", path.display(), self.path.display());
        Ok(())
    }

    /// Replaces the whole file with exactly `remaining`, one resolved path
    /// per line.
    pub fn rewrite(&self, remaining: &[PathBuf]) -> Result<(), FailedListError> {
        let mut text = String::new();
        for path in remaining {
            text.push_str(&resolve_path(path).to_string_lossy());
            text.push('\n');
        }
        write_atomic(&self.path, text.as_bytes()).map_err(|source| FailedListError::Write {
            path: self.path.clone(),
            source,
        })
    }

    /// Drops every entry whose resolved path is in `succeeded`.
    ///
    /// Returns the number of entries removed. The file is left untouched when
    /// nothing matches.
    pub fn prune(&self, succeeded: &[PathBuf]) -> Result<usize, FailedListError> {
        let succeeded: HashSet<PathBuf> = succeeded.iter().map(|p| resolve_path(p)).collect();
        let entries = self.load()?;
        let before = entries.len();
        let remaining: Vec<PathBuf> = entries
            .into_iter()
            .map(|e| e.path)
            .filter(|p| !succeeded.contains(p))
            .collect();

        let removed = before - remaining.len();
        if removed > 0 {
            self.rewrite(&remaining)?;
            tracing::info!(
                "Pruned {} succeeded entr{} from {}",
                removed,
                if removed == 1 { "y" } else { "ies" },
                self.path.display()
            );
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, b"x").unwrap();
        path
    }

    #[test]
    fn test_load_missing_is_empty() {
        let dir = TempDir::new().unwrap();
        let list = FailedList::new(dir.path().join("failed_list.txt"));
        assert!(list.load().unwrap().is_empty());
    }

    #[test]
    fn test_append_twice_loads_once() {
        let dir = TempDir::new().unwrap();
        let a = touch(dir.path(), "a.mp4");
        let b = touch(dir.path(), "b.mp4");
        let list = FailedList::new(dir.path().join("failed_list.txt"));

        list.append(&a, "first").unwrap();
        list.append(&b, "other").unwrap();
        list.append(&a, "second").unwrap();

        let entries = list.load().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].path, resolve_path(&a));
        assert_eq!(entries[0].reason.as_deref(), Some("first"));
        assert_eq!(entries[1].path, resolve_path(&b));
    }

    #[test]
    fn test_dedupe_across_spellings() {
        let dir = TempDir::new().unwrap();
        let a = touch(dir.path(), "a.mp4");
        let list = FailedList::new(dir.path().join("failed_list.txt"));
        let dotted = dir.path().join(".").join("a.mp4");
        std::fs::write(
            list.path(),
            format!("{}\n{} | later | 2026-10-18T00:00:00Z\n", a.display(), dotted.display()),
        )
        .unwrap();

        let entries = list.load().unwrap();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].reason.is_none());
    }

    #[test]
    fn test_append_sanitizes_reason() {
        let dir = TempDir::new().unwrap();
        let a = touch(dir.path(), "a.mp4");
        let list = FailedList::new(dir.path().join("failed_list.txt"));

        list.append(&a, "line one\nline | two").unwrap();

        let text = std::fs::read_to_string(list.path()).unwrap();
        assert_eq!(text.lines().count(), 1);
        let entries = list.load().unwrap();
        assert_eq!(entries[0].reason.as_deref(), Some("line one line / two"));
        assert!(entries[0].timestamp.is_some());
    }

    #[test]
    fn test_rewrite_writes_exact_entries() {
        let dir = TempDir::new().unwrap();
        let a = touch(dir.path(), "a.mp4");
        let b = touch(dir.path(), "b.mp4");
        let list = FailedList::new(dir.path().join("failed_list.txt"));
        list.append(&a, "x").unwrap();
        list.append(&b, "y").unwrap();

        list.rewrite(&[b.clone()]).unwrap();

        let text = std::fs::read_to_string(list.path()).unwrap();
        assert_eq!(text, format!("{}\n", resolve_path(&b).display()));
    }

    #[test]
    fn test_pipe_in_file_name_round_trips() {
        let dir = TempDir::new().unwrap();
        let odd = touch(dir.path(), "a|b.mp4");
        let list = FailedList::new(dir.path().join("failed_list.txt"));

        list.append(&odd, "probe failed").unwrap();
        let entries = list.load().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].path, resolve_path(&odd));
        assert_eq!(entries[0].reason.as_deref(), Some("probe failed"));

        list.rewrite(&[odd.clone()]).unwrap();
        assert_eq!(list.load().unwrap()[0].path, resolve_path(&odd));

        assert_eq!(list.prune(&[odd]).unwrap(), 1);
        assert!(list.load().unwrap().is_empty());
    }

    #[test]
    fn test_prune_removes_successes() {
        let dir = TempDir::new().unwrap();
        let a = touch(dir.path(), "a.mp4");
        let b = touch(dir.path(), "b.mp4");
        let list = FailedList::new(dir.path().join("failed_list.txt"));
        list.append(&a, "x").unwrap();
        list.append(&b, "y").unwrap();

        assert_eq!(list.prune(&[a.clone()]).unwrap(), 1);
        let paths: Vec<_> = list.load().unwrap().into_iter().map(|e| e.path).collect();
        assert_eq!(paths, vec![resolve_path(&b)]);

        assert_eq!(list.prune(&[a]).unwrap(), 0);
    }
}
