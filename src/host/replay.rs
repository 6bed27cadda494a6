use std::future::Future;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, warn};

use super::identity::{ProcessHandle, ProcessResolver};
use super::pending::AtomicPendingCounters;
use super::settings::HostSnapshot;
use crate::usage::aggregator::UsageAggregator;
use crate::usage::api::ApiCall;

/// Interactive features the host reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Interaction {
    UserInteractive,
    CtrlPgUpPgDn,
    WindowSizeChanged,
    ContextMenu,
    KeyboardTextSelection,
    KeyboardTextEditing,
}

/// Parser verdict on one control sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SequenceOutcome {
    Used,
    Failed,
    FailedOutOfRange,
}

/// One line of a host event stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum HostEvent {
    /// Client attached with a known image path.
    Attach { image: PathBuf },
    /// Client attached; its image is looked up through the resolver.
    Connect { pid: u32 },
    Api {
        api: String,
        #[serde(default)]
        legacy: bool,
    },
    FindNext {
        length: u32,
        direction_down: bool,
        match_case: bool,
    },
    FindClosed,
    Interaction { kind: Interaction },
    Sequence { outcome: SequenceOutcome },
    Assert {
        source_text: String,
        file_name: String,
        line_number: u32,
    },
    Rip { message: String },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayReport {
    pub applied: usize,
    pub malformed: usize,
    pub interrupted: bool,
    pub summary_written: bool,
}

/// Applies one event. `false` when the event names something unknown.
pub fn apply_event<R>(
    aggregator: &mut UsageAggregator,
    pending: &AtomicPendingCounters,
    resolver: &R,
    event: HostEvent,
) -> bool
where
    R: ProcessResolver + ?Sized,
{
    match event {
        HostEvent::Attach { image } => {
            let outcome = aggregator.on_connect_image(&image);
            debug!(?outcome, "attach");
        }
        HostEvent::Connect { pid } => {
            let outcome = aggregator.on_connect(resolver, ProcessHandle(pid));
            debug!(pid, ?outcome, "connect");
        }
        HostEvent::Api { api, legacy } => match ApiCall::from_name(&api) {
            Some(api) => aggregator.record_api_call(api, legacy),
            None => {
                warn!(api = %api, "unknown api kind");
                return false;
            }
        },
        HostEvent::FindNext {
            length,
            direction_down,
            match_case,
        } => aggregator.record_find_next(length, direction_down, match_case),
        HostEvent::FindClosed => aggregator.find_dialog_closed(),
        HostEvent::Interaction { kind } => match kind {
            Interaction::UserInteractive => aggregator.set_user_interactive(),
            Interaction::CtrlPgUpPgDn => aggregator.set_ctrl_pg_up_pg_dn_used(),
            Interaction::WindowSizeChanged => aggregator.set_window_size_changed(),
            Interaction::ContextMenu => aggregator.set_context_menu_used(),
            Interaction::KeyboardTextSelection => aggregator.set_keyboard_text_selection_used(),
            Interaction::KeyboardTextEditing => aggregator.set_keyboard_text_editing_used(),
        },
        HostEvent::Sequence { outcome } => match outcome {
            SequenceOutcome::Used => pending.record_used(),
            SequenceOutcome::Failed => pending.record_failed(),
            SequenceOutcome::FailedOutOfRange => pending.record_failed_out_of_range(),
        },
        HostEvent::Assert {
            source_text,
            file_name,
            line_number,
        } => aggregator.report_assert(&source_text, &file_name, line_number),
        HostEvent::Rip { message } => aggregator.report_rip_message(&message),
    }
    true
}

/// Drives one host session from a JSON-lines event stream.
///
/// The session ends at end of input or when `shutdown` resolves; either
/// way the aggregator is finalized exactly once.
pub async fn run_session<B, R, S>(
    input: B,
    aggregator: &mut UsageAggregator,
    pending: &AtomicPendingCounters,
    resolver: &R,
    host: &HostSnapshot,
    shutdown: S,
) -> std::io::Result<ReplayReport>
where
    B: AsyncBufRead + Unpin,
    R: ProcessResolver + ?Sized,
    S: Future<Output = ()>,
{
    let mut report = ReplayReport::default();
    let mut lines = input.lines();
    tokio::pin!(shutdown);

    loop {
        let line = tokio::select! {
            biased;
            _ = &mut shutdown => {
                report.interrupted = true;
                break;
            }
            line = lines.next_line() => line?,
        };
        let Some(line) = line else { break };
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        match serde_json::from_str::<HostEvent>(line) {
            Ok(event) => {
                if apply_event(aggregator, pending, resolver, event) {
                    report.applied += 1;
                } else {
                    report.malformed += 1;
                }
            }
            Err(err) => {
                warn!(error = %err, "skipping malformed event");
                report.malformed += 1;
            }
        }
    }

    report.summary_written = aggregator.finalize(host);
    Ok(report)
}
