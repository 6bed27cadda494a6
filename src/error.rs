use std::path::PathBuf;

use thiserror::Error;

/// Failures loading the host configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("sink kind `{0}` needs a path")]
    MissingSinkPath(String),
}

/// Failures turning an opaque process handle into an image path.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("process {0} not found")]
    NotFound(u32),
    #[error("cannot read image of process {pid}: {source}")]
    Io {
        pid: u32,
        #[source]
        source: std::io::Error,
    },
}

/// Failures handing a record to a telemetry sink.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("sink I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("record serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}
