use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, SinkError};
use crate::host::settings::HostSnapshot;
use crate::host::sink::{DisabledSink, JsonLinesSink, TelemetrySink, TracingSink};

/// How the well-known shell is recognized among connecting processes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShellProbe {
    /// Image name compared case-insensitively.
    pub image_name: String,
    /// The shell only counts when its image shares this directory's root.
    pub system_dir: PathBuf,
}

#[cfg(windows)]
impl Default for ShellProbe {
    fn default() -> Self {
        Self {
            image_name: "bash.exe".to_string(),
            system_dir: PathBuf::from(r"C:\Windows\System32"),
        }
    }
}

#[cfg(not(windows))]
impl Default for ShellProbe {
    fn default() -> Self {
        Self {
            image_name: "bash".to_string(),
            system_dir: PathBuf::from("/usr/bin"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkKind {
    Tracing,
    JsonLines,
    Disabled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SinkConfig {
    pub kind: SinkKind,
    /// Whether this session is sampled at all.
    pub enabled: bool,
    /// Target file for `json_lines`.
    pub path: Option<PathBuf>,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            kind: SinkKind::Tracing,
            enabled: true,
            path: None,
        }
    }
}

/// Host-level configuration. Table capacities are compile-time constants
/// and deliberately absent here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UsageConfig {
    pub sink: SinkConfig,
    pub shell: ShellProbe,
    /// `EnvFilter` directive; `RUST_LOG` wins when set.
    pub log_filter: String,
    /// Passed through to the session summary untouched.
    pub host: HostSnapshot,
}

impl Default for UsageConfig {
    fn default() -> Self {
        Self {
            sink: SinkConfig::default(),
            shell: ShellProbe::default(),
            log_filter: "info".to_string(),
            host: HostSnapshot::default(),
        }
    }
}

impl UsageConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sink.kind == SinkKind::JsonLines && self.sink.path.is_none() {
            return Err(ConfigError::MissingSinkPath("json_lines".to_string()));
        }
        Ok(())
    }

    /// Builds the sink this config describes. A disabled config always
    /// yields a `DisabledSink`.
    pub fn build_sink(&self) -> Result<Arc<dyn TelemetrySink>, SinkError> {
        if !self.sink.enabled {
            return Ok(Arc::new(DisabledSink));
        }
        let sink: Arc<dyn TelemetrySink> = match (&self.sink.kind, &self.sink.path) {
            (SinkKind::Tracing, _) => Arc::new(TracingSink),
            (SinkKind::JsonLines, Some(path)) => Arc::new(JsonLinesSink::open(path)?),
            (SinkKind::JsonLines, None) | (SinkKind::Disabled, _) => Arc::new(DisabledSink),
        };
        Ok(sink)
    }
}
