#![allow(clippy::result_large_err)]

use crate::core::config::HistoryConfig;
use crate::core::entities::CommandResult;
use crate::core::error::AppError;
use crate::core::types::ErrorCategory;
use crate::utils::serialization::{JsonSerializer, Serializer};
use chrono::{DateTime, Utc};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::{Builder, NamedTempFile};

const FILE_PREFIX: &str = "command-";
const FILE_SUFFIX: &str = ".json";
const MAX_SAME_SECOND_SUFFIX: u32 = 10_000;

/// File-per-record store of executed command results.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    dir: PathBuf,
    max_entries: usize,
    serializer: JsonSerializer,
}

struct StoredEntry {
    path: PathBuf,
    key: (i64, u32),
    result: CommandResult,
}

impl StoredEntry {
    fn timestamp(&self) -> DateTime<Utc> {
        self.result.timestamp
    }
}

impl HistoryStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        HistoryStore {
            dir: dir.into(),
            max_entries: 1000,
            serializer: JsonSerializer::pretty(),
        }
    }

    pub fn from_config(config: &HistoryConfig) -> Self {
        HistoryStore::new(config.dir.clone()).with_max_entries(config.max_entries)
    }

    /// Cap on retained records; 0 keeps everything.
    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Persist one result as `command-{unix_seconds}.json`, never overwriting an existing record.
    pub fn save(&self, result: &CommandResult) -> Result<PathBuf, AppError> {
        fs::create_dir_all(&self.dir).map_err(|e| {
            AppError::new(
                ErrorCategory::IoError,
                format!(
                    "Failed to create history directory {}: {}",
                    self.dir.display(),
                    e
                ),
            )
            .with_code("HISTORY-001")
        })?;

        let content = self.serializer.serialize(result).map_err(|e| {
            AppError::new(
                ErrorCategory::InternalError,
                format!("Failed to encode history record: {}", e),
            )
            .with_code("HISTORY-004")
        })?;

        let seconds = Utc::now().timestamp();
        let path = self.write_new(seconds, &content)?;

        if self.max_entries > 0 {
            if let Err(err) = self.prune() {
                tracing::warn!(error = %err, "failed to prune command history");
            }
        }

        tracing::debug!(path = %path.display(), "saved command history");
        Ok(path)
    }

    /// Write to a temp file, then link it under the first free record name.
    /// Readers never see a partially written record.
    fn write_new(&self, seconds: i64, content: &[u8]) -> Result<PathBuf, AppError> {
        let mut temp: NamedTempFile = Builder::new()
            .prefix(".history-")
            .suffix(".tmp")
            .tempfile_in(&self.dir)
            .map_err(|e| write_error(&self.dir, e))?;
        temp.write_all(content)
            .and_then(|_| temp.as_file().sync_all())
            .map_err(|e| write_error(temp.path(), e))?;

        for suffix in 0..MAX_SAME_SECOND_SUFFIX {
            let path = self.dir.join(file_name(seconds, suffix));
            match temp.persist_noclobber(&path) {
                Ok(_) => return Ok(path),
                Err(err) if err.error.kind() == ErrorKind::AlreadyExists => temp = err.file,
                Err(err) => return Err(write_error(&path, err.error)),
            }
        }
        Err(AppError::new(
            ErrorCategory::IoError,
            format!("Too many history records written at {}", seconds),
        )
        .with_code("HISTORY-002"))
    }

    /// Most recent results first, by embedded timestamp. `limit` 0 returns everything.
    ///
    /// Files that cannot be read or parsed are skipped.
    pub fn list(&self, limit: usize) -> Result<Vec<CommandResult>, AppError> {
        let mut entries = self.load(self.record_paths()?);

        entries.sort_by(|a, b| {
            b.timestamp()
                .cmp(&a.timestamp())
                .then_with(|| b.key.cmp(&a.key))
        });
        if limit > 0 {
            entries.truncate(limit);
        }
        Ok(entries.into_iter().map(|entry| entry.result).collect())
    }

    /// Remove the oldest records beyond `max_entries`.
    ///
    /// Only parsed records are counted or removed; a file that does not parse may
    /// still be in flight from another writer and is left alone.
    pub fn prune(&self) -> Result<usize, AppError> {
        if self.max_entries == 0 {
            return Ok(0);
        }
        let paths = self.record_paths()?;
        if paths.len() <= self.max_entries {
            return Ok(0);
        }
        let mut entries = self.load(paths);
        if entries.len() <= self.max_entries {
            return Ok(0);
        }

        entries.sort_by(|a, b| {
            a.timestamp()
                .cmp(&b.timestamp())
                .then_with(|| a.key.cmp(&b.key))
        });
        let excess = entries.len() - self.max_entries;
        let mut removed = 0;
        for entry in entries.into_iter().take(excess) {
            match fs::remove_file(&entry.path) {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(AppError::new(
                        ErrorCategory::IoError,
                        format!("Failed to remove {}: {}", entry.path.display(), e),
                    )
                    .with_code("HISTORY-005"))
                }
            }
        }
        tracing::debug!(removed, "pruned command history");
        Ok(removed)
    }

    /// Record files in the directory, by name only. Nothing is read.
    fn record_paths(&self) -> Result<Vec<(PathBuf, (i64, u32))>, AppError> {
        let read_dir = match fs::read_dir(&self.dir) {
            Ok(read_dir) => read_dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(AppError::new(
                    ErrorCategory::IoError,
                    format!(
                        "Failed to read history directory {}: {}",
                        self.dir.display(),
                        e
                    ),
                )
                .with_code("HISTORY-003"))
            }
        };

        Ok(read_dir
            .flatten()
            .filter_map(|dir_entry| {
                let path = dir_entry.path();
                let key = path
                    .file_name()
                    .and_then(|name| name.to_str())
                    .and_then(parse_file_name)?;
                Some((path, key))
            })
            .collect())
    }

    /// Read and parse each record, dropping files that cannot be read or parsed.
    fn load(&self, paths: Vec<(PathBuf, (i64, u32))>) -> Vec<StoredEntry> {
        paths
            .into_iter()
            .filter_map(|(path, key)| {
                let bytes = match fs::read(&path) {
                    Ok(bytes) => bytes,
                    Err(err) => {
                        tracing::debug!(path = %path.display(), error = %err, "skipping unreadable history file");
                        return None;
                    }
                };
                match self.serializer.deserialize::<CommandResult>(&bytes) {
                    Ok(result) => Some(StoredEntry { path, key, result }),
                    Err(err) => {
                        tracing::debug!(path = %path.display(), error = %err, "skipping unparsable history file");
                        None
                    }
                }
            })
            .collect()
    }
}

fn file_name(seconds: i64, suffix: u32) -> String {
    if suffix == 0 {
        format!("{}{}{}", FILE_PREFIX, seconds, FILE_SUFFIX)
    } else {
        format!("{}{}-{}{}", FILE_PREFIX, seconds, suffix, FILE_SUFFIX)
    }
}

/// `command-{seconds}[-{n}].json` into `(seconds, n)`.
fn parse_file_name(name: &str) -> Option<(i64, u32)> {
    let stem = name.strip_prefix(FILE_PREFIX)?.strip_suffix(FILE_SUFFIX)?;
    match stem.split_once('-') {
        Some((seconds, suffix)) => Some((seconds.parse().ok()?, suffix.parse().ok()?)),
        None => Some((stem.parse().ok()?, 0)),
    }
}

fn write_error(path: &Path, e: std::io::Error) -> AppError {
    AppError::new(
        ErrorCategory::IoError,
        format!("Failed to write history file {}: {}", path.display(), e),
    )
    .with_code("HISTORY-002")
}
