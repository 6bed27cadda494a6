use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use tracing::info;

use crate::error::SinkError;
use crate::usage::event::TelemetryRecord;

/// Where finished records go. Implementations decide sampling through
/// `is_enabled`; callers skip all expensive work when it reports false.
pub trait TelemetrySink: Send + Sync {
    fn is_enabled(&self) -> bool;
    fn emit(&self, record: TelemetryRecord) -> Result<(), SinkError>;
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Logs each record as one JSON line through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl TelemetrySink for TracingSink {
    fn is_enabled(&self) -> bool {
        true
    }

    fn emit(&self, record: TelemetryRecord) -> Result<(), SinkError> {
        let json = serde_json::to_string(&record)?;
        info!(target: "session_tally::telemetry", event = record.name(), "{}", json);
        Ok(())
    }
}

/// Appends each record as a JSON line to a file.
#[derive(Debug)]
pub struct JsonLinesSink {
    path: PathBuf,
    file: Mutex<File>,
}

impl JsonLinesSink {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SinkError> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TelemetrySink for JsonLinesSink {
    fn is_enabled(&self) -> bool {
        true
    }

    fn emit(&self, record: TelemetryRecord) -> Result<(), SinkError> {
        let mut line = serde_json::to_vec(&record)?;
        line.push(b'\n');
        let mut file = lock(&self.file);
        file.write_all(&line)?;
        file.flush()?;
        Ok(())
    }
}

/// Keeps every record in memory, for hosts that forward them elsewhere.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<TelemetryRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<TelemetryRecord> {
        lock(&self.records).clone()
    }

    pub fn take(&self) -> Vec<TelemetryRecord> {
        std::mem::take(&mut *lock(&self.records))
    }

    pub fn len(&self) -> usize {
        lock(&self.records).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl TelemetrySink for MemorySink {
    fn is_enabled(&self) -> bool {
        true
    }

    fn emit(&self, record: TelemetryRecord) -> Result<(), SinkError> {
        lock(&self.records).push(record);
        Ok(())
    }
}

/// Telemetry switched off or the session not sampled.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledSink;

impl TelemetrySink for DisabledSink {
    fn is_enabled(&self) -> bool {
        false
    }

    fn emit(&self, _record: TelemetryRecord) -> Result<(), SinkError> {
        Ok(())
    }
}
