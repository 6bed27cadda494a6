use std::collections::BTreeMap;

use serde::Serialize;
use uuid::Uuid;

use super::metrics::FindDialogStats;
use crate::host::settings::HostSettings;

// Allowed: image names without directories, counts, averages, flags, timestamps.
// Forbidden: full paths, command lines, window text.

/// A record handed to the telemetry sink. Every record carries the
/// session's activity id.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "Event")]
pub enum TelemetryRecord {
    SessionEnding(Box<SessionSummary>),
    FindDialogUsed(FindDialogRecord),
    Assert {
        #[serde(rename = "ActivityId")]
        activity: Uuid,
        #[serde(rename = "SourceText")]
        source_text: String,
        #[serde(rename = "FileName")]
        file_name: String,
        #[serde(rename = "LineNumber")]
        line_number: u32,
    },
    RipMessage {
        #[serde(rename = "ActivityId")]
        activity: Uuid,
        #[serde(rename = "Message")]
        message: String,
    },
}

impl TelemetryRecord {
    pub fn name(&self) -> &'static str {
        match self {
            TelemetryRecord::SessionEnding(_) => "SessionEnding",
            TelemetryRecord::FindDialogUsed(_) => "FindDialogUsed",
            TelemetryRecord::Assert { .. } => "Assert",
            TelemetryRecord::RipMessage { .. } => "RipMessage",
        }
    }

    pub fn activity(&self) -> Uuid {
        match self {
            TelemetryRecord::SessionEnding(summary) => summary.activity,
            TelemetryRecord::FindDialogUsed(record) => record.activity,
            TelemetryRecord::Assert { activity, .. }
            | TelemetryRecord::RipMessage { activity, .. } => *activity,
        }
    }
}

/// Find-dialog averages, sent when the dialog closes.
#[derive(Debug, Clone, Serialize)]
pub struct FindDialogRecord {
    #[serde(rename = "ActivityId")]
    pub activity: Uuid,
    #[serde(flatten)]
    pub stats: FindDialogStats,
}

/// The one consolidated record written at shutdown.
///
/// The per-process arrays are parallel, in arrival order, and exactly as long
/// as the packed name count.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SessionSummary {
    #[serde(rename = "ActivityId")]
    pub activity: Uuid,
    pub bash_used: bool,
    pub ctrl_pg_up_pg_dn_used: bool,
    pub keyboard_text_editing_used: bool,
    pub keyboard_text_selection_used: bool,
    pub launched_from_shortcut: bool,
    /// Packed name table, see `PackedNameBuffer::encode`.
    pub processes_connected: Vec<u8>,
    pub processes_connected_count: Vec<u32>,
    pub processes_connected_codes_count: Vec<u32>,
    pub processes_connected_failed_codes_count: Vec<u32>,
    pub processes_connected_failed_outside_count: Vec<u32>,
    pub started_using_at_seconds: i64,
    pub ended_using_at_seconds: i64,
    pub find_dialog: FindDialogStats,
    pub settings: HostSettings,
    pub api_used: BTreeMap<&'static str, u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_ansi_used: Option<BTreeMap<&'static str, u32>>,
}
