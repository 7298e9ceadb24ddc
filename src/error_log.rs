use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;

use anyhow::Result;
use chrono::{DateTime, Local, LocalResult, TimeZone};
use serde::{Deserialize, Serialize};

use crate::api::FetchError;
use crate::state::Operation;

#[derive(Clone, Debug)]
pub struct FailureLogEntry {
    pub timestamp: DateTime<Local>,
    pub operation: String,
    pub kind: String,
    pub message: String,
}

impl FailureLogEntry {
    pub fn new(operation: Operation, error: &FetchError) -> Self {
        FailureLogEntry {
            timestamp: Local::now(),
            operation: operation.label().to_string(),
            kind: error.kind().to_string(),
            message: error.to_string(),
        }
    }

    fn timestamp_ms(&self) -> i64 {
        self.timestamp.timestamp_millis()
    }
}

/// Append-only JSON-lines record of failed requests.
#[derive(Clone, Debug)]
pub struct ErrorLogStore {
    path: PathBuf,
}

impl ErrorLogStore {
    pub fn new(path: PathBuf) -> Self {
        ErrorLogStore { path }
    }

    pub fn record_failure(&self, operation: Operation, error: &FetchError) -> Result<()> {
        self.append(&FailureLogEntry::new(operation, error))
    }

    pub fn load(&self) -> Result<Vec<FailureLogEntry>> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };
        let mut entries = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            if let Ok(stored) = serde_json::from_str::<StoredFailureLogEntry>(&line) {
                entries.push(stored.into_entry());
            }
        }
        Ok(entries)
    }

    fn append(&self, entry: &FailureLogEntry) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        serde_json::to_writer(&mut file, &StoredFailureLogEntry::from(entry))?;
        file.write_all(b"\n")?;
        Ok(())
    }
}

#[derive(Serialize, Deserialize)]
struct StoredFailureLogEntry {
    timestamp_ms: i64,
    operation: String,
    kind: String,
    message: String,
}

impl StoredFailureLogEntry {
    fn into_entry(self) -> FailureLogEntry {
        let timestamp = match Local.timestamp_millis_opt(self.timestamp_ms) {
            LocalResult::Single(dt) => dt,
            _ => Local::now(),
        };
        FailureLogEntry {
            timestamp,
            operation: self.operation,
            kind: self.kind,
            message: self.message,
        }
    }
}

impl From<&FailureLogEntry> for StoredFailureLogEntry {
    fn from(entry: &FailureLogEntry) -> Self {
        StoredFailureLogEntry {
            timestamp_ms: entry.timestamp_ms(),
            operation: entry.operation.clone(),
            kind: entry.kind.clone(),
            message: entry.message.clone(),
        }
    }
}
