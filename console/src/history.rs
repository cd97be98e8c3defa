//! Persistent input history
//!
//! The file uses prompt_toolkit's `FileHistory` layout so it can be shared
//! with other consoles that read it:
//!
//! ```text
//!
//! # 2024-05-01 09:30:12.123456
//! +f <- function(x) {
//! +  x + 1
//! +}
//! ```

use chrono::Local;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error("failed to read history {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write history {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Clone, Default)]
pub struct FileHistory {
    path: Option<PathBuf>,
    entries: Vec<String>,
}

impl FileHistory {
    /// History that is never written anywhere
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Load `path`; a missing file is an empty history
    pub fn load(path: &Path) -> Result<Self, HistoryError> {
        let entries = match std::fs::read_to_string(path) {
            Ok(text) => parse(&text),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Vec::new(),
            Err(source) => {
                return Err(HistoryError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        tracing::debug!(path = %path.display(), entries = entries.len(), "history loaded");
        Ok(FileHistory {
            path: Some(path.to_path_buf()),
            entries,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Oldest first
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// Record a submitted entry
    ///
    /// Blank entries and repeats of the most recent entry are skipped.
    pub fn append(&mut self, entry: &str) -> Result<(), HistoryError> {
        if entry.trim().is_empty() || self.entries.last().is_some_and(|last| last == entry) {
            return Ok(());
        }
        self.entries.push(entry.to_string());

        let Some(path) = &self.path else {
            return Ok(());
        };
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S%.6f").to_string();
        let record = format_entry(entry, &timestamp);
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .and_then(|mut file| file.write_all(record.as_bytes()))
            .map_err(|source| HistoryError::Write {
                path: path.clone(),
                source,
            })
    }
}

/// One entry in file form
pub fn format_entry(entry: &str, timestamp: &str) -> String {
    let mut record = format!("\n# {}\n", timestamp);
    for line in entry.split('\n') {
        record.push('+');
        record.push_str(line);
        record.push('\n');
    }
    record
}

/// Entries of a history file, oldest first
///
/// `+` lines accumulate into the current entry; any other line ends it.
pub fn parse(text: &str) -> Vec<String> {
    let mut entries = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in text.lines() {
        match line.strip_prefix('+') {
            Some(content) => current.push(content),
            None if !current.is_empty() => {
                entries.push(current.join("\n"));
                current.clear();
            }
            None => {}
        }
    }
    if !current.is_empty() {
        entries.push(current.join("\n"));
    }
    entries
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_multi_line_entries() {
        let text = "\n# 2024-05-01 09:30:12.123456\n+x <- 1\n\n# 2024-05-01 09:31:00.000001\n+f <- function() {\n+  1\n+}\n";
        assert_eq!(parse(text), vec!["x <- 1", "f <- function() {\n  1\n}"]);
    }

    #[test]
    fn test_parse_tolerates_missing_headers() {
        assert_eq!(parse("+a\n+b"), vec!["a\nb"]);
        assert!(parse("").is_empty());
        assert!(parse("# only a header\n").is_empty());
    }

    #[test]
    fn test_format_entry() {
        assert_eq!(
            format_entry("a\nb", "2024-05-01 09:30:12.000000"),
            "\n# 2024-05-01 09:30:12.000000\n+a\n+b\n"
        );
    }

    #[test]
    fn test_append_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history");

        let mut history = FileHistory::load(&path).unwrap();
        assert!(history.entries().is_empty());
        history.append("1 + 1").unwrap();
        history.append("1 + 1").unwrap();
        history.append("   ").unwrap();
        history.append("if (TRUE) {\n  2\n}").unwrap();
        assert_eq!(history.entries().len(), 2);

        let reloaded = FileHistory::load(&path).unwrap();
        assert_eq!(reloaded.entries(), history.entries());

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("\n# "));
        assert!(text.contains("+  2\n"));
    }

    #[test]
    fn test_in_memory_history_writes_nothing() {
        let mut history = FileHistory::in_memory();
        history.append("x").unwrap();
        assert_eq!(history.entries(), ["x"]);
        assert!(history.path().is_none());
    }

    #[test]
    fn test_unreadable_history_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        // A directory cannot be read as a file.
        let err = FileHistory::load(dir.path()).unwrap_err();
        assert!(matches!(err, HistoryError::Read { .. }));
    }
}
