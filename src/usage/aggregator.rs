use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, trace, warn};
use uuid::Uuid;

use super::api::{ApiCall, ApiCounters};
use super::event::{FindDialogRecord, SessionSummary, TelemetryRecord};
use super::metrics::RunningStats;
use super::registry::{Lookup, NameRegistry, ProcessName, SlotIndex};
use crate::config::ShellProbe;
use crate::host::identity::{display_name, shares_root, ProcessHandle, ProcessResolver};
use crate::host::pending::PendingCounters;
use crate::host::settings::HostSnapshot;
use crate::host::sink::TelemetrySink;
use crate::host::time::{Clock, SystemClock};

/// Longest rip message forwarded to the sink, in characters.
pub const MAX_RIP_MESSAGE_CHARS: usize = 200;

/// Session-wide feature flags. Each flips to true at most once.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UsageFlags {
    pub bash_used: bool,
    pub ctrl_pg_up_pg_dn_used: bool,
    pub keyboard_text_editing_used: bool,
    pub keyboard_text_selection_used: bool,
}

/// What happened to a connect event. Callers are free to ignore it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectOutcome {
    /// Telemetry is off; nothing was touched.
    Skipped,
    /// No usable name could be derived from the process.
    Unresolved,
    /// Known name, its connection count went up.
    Counted(SlotIndex),
    /// First sighting, a new slot was created.
    Registered(SlotIndex),
    /// New name but no room left; it is not tracked.
    Dropped,
}

/// Bounded per-session usage table.
///
/// Single writer: every method takes `&mut self` and hosts that dispatch
/// from several threads wrap the whole aggregator in one lock.
pub struct UsageAggregator {
    activity: Uuid,
    registry: NameRegistry,
    /// Slot that receives the next fold of pending parser counters.
    attribution: Option<SlotIndex>,
    api: ApiCounters,
    find_dialog: RunningStats,
    flags: UsageFlags,
    user_interactive: bool,
    started_at: i64,
    shell: ShellProbe,
    sink: Arc<dyn TelemetrySink>,
    pending: Arc<dyn PendingCounters>,
    clock: Arc<dyn Clock>,
}

impl UsageAggregator {
    pub fn new(shell: ShellProbe, sink: Arc<dyn TelemetrySink>, pending: Arc<dyn PendingCounters>) -> Self {
        Self::with_clock(shell, sink, pending, Arc::new(SystemClock))
    }

    pub fn with_clock(
        shell: ShellProbe,
        sink: Arc<dyn TelemetrySink>,
        pending: Arc<dyn PendingCounters>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let activity = Uuid::new_v4();
        let started_at = clock.now_secs();
        debug!(%activity, started_at, "usage session started");
        Self {
            activity,
            registry: NameRegistry::new(),
            attribution: None,
            api: ApiCounters::new(),
            find_dialog: RunningStats::new(),
            flags: UsageFlags::default(),
            user_interactive: false,
            started_at,
            shell,
            sink,
            pending,
            clock,
        }
    }

    // --- producers -------------------------------------------------------

    /// A client process attached to the host.
    pub fn on_connect<R>(&mut self, resolver: &R, process: ProcessHandle) -> ConnectOutcome
    where
        R: ProcessResolver + ?Sized,
    {
        if !self.sink.is_enabled() {
            return ConnectOutcome::Skipped;
        }
        self.fold_pending_counters();

        match resolver.image_path(process) {
            Ok(image) => self.attach_image(&image),
            Err(err) => {
                debug!(pid = process.0, error = %err, "could not resolve process image");
                ConnectOutcome::Unresolved
            }
        }
    }

    /// Same as `on_connect` for a host that already knows the image path.
    pub fn on_connect_image(&mut self, image: &Path) -> ConnectOutcome {
        if !self.sink.is_enabled() {
            return ConnectOutcome::Skipped;
        }
        self.fold_pending_counters();
        self.attach_image(image)
    }

    fn attach_image(&mut self, image: &Path) -> ConnectOutcome {
        let Some(name) = display_name(image).and_then(ProcessName::new) else {
            return ConnectOutcome::Unresolved;
        };

        match self.registry.lookup(&name) {
            Lookup::Found { position } => {
                let Some(index) = self.registry.slot_at(position) else {
                    return ConnectOutcome::Unresolved;
                };
                if let Some(slot) = self.registry.slot_mut(index) {
                    slot.connection_count = slot.connection_count.saturating_add(1);
                }
                self.attribution = Some(index);
                ConnectOutcome::Counted(index)
            }
            Lookup::Vacant { position } => {
                if !self.registry.has_room_for(&name) {
                    debug!(%name, "no room for process name");
                    self.attribution = None;
                    return ConnectOutcome::Dropped;
                }

                // Any shell image with this name on the system drive counts;
                // one run from elsewhere first hides a later system one.
                if !self.flags.bash_used && name.eq_ignore_case(&self.shell.image_name) {
                    self.flags.bash_used = shares_root(image, &self.shell.system_dir);
                }

                match self.registry.insert(&name, position) {
                    Some(index) => {
                        self.attribution = Some(index);
                        ConnectOutcome::Registered(index)
                    }
                    None => {
                        self.attribution = None;
                        ConnectOutcome::Dropped
                    }
                }
            }
        }
    }

    /// Drains the parser counters and credits them to the attributed slot.
    ///
    /// The counters are zeroed even with no attribution so they cannot leak
    /// into the next process's window. A client that exits silently while
    /// another attaches before this runs gets its counts credited to the
    /// slot still attributed; that is accepted.
    pub fn fold_pending_counters(&mut self) {
        let current = self.pending.take_current();
        let failed = self.pending.take_failed();
        let out_of_range = self.pending.take_failed_out_of_range();

        let Some(index) = self.attribution.take() else {
            if (current | failed | out_of_range) != 0 {
                trace!(current, failed, out_of_range, "discarding unattributed counters");
            }
            return;
        };
        if let Some(slot) = self.registry.slot_mut(index) {
            slot.primary_count = slot.primary_count.saturating_add(current);
            slot.failed_count = slot.failed_count.saturating_add(failed);
            slot.failed_out_of_range_count = slot.failed_out_of_range_count.saturating_add(out_of_range);
            trace!(index, current, failed, out_of_range, "folded counters");
        }
    }

    pub fn record_api_call(&mut self, api: ApiCall, legacy: bool) {
        self.api.record(api, legacy);
    }

    pub fn record_api_call_default(&mut self, api: ApiCall) {
        self.api.record_default(api);
    }

    /// One click of "find next".
    pub fn record_find_next(&mut self, string_length: u32, direction_down: bool, match_case: bool) {
        self.find_dialog.record(string_length, direction_down, match_case);
    }

    /// Sends the find-dialog averages and starts over for the next use.
    pub fn find_dialog_closed(&mut self) {
        if self.sink.is_enabled() {
            self.emit(TelemetryRecord::FindDialogUsed(FindDialogRecord {
                activity: self.activity,
                stats: self.find_dialog.snapshot(),
            }));
        }
        self.find_dialog.reset();
    }

    pub fn set_user_interactive(&mut self) {
        self.user_interactive = true;
    }

    pub fn set_ctrl_pg_up_pg_dn_used(&mut self) {
        self.flags.ctrl_pg_up_pg_dn_used = true;
        self.set_user_interactive();
    }

    pub fn set_window_size_changed(&mut self) {
        self.set_user_interactive();
    }

    pub fn set_context_menu_used(&mut self) {
        self.set_user_interactive();
    }

    pub fn set_keyboard_text_selection_used(&mut self) {
        self.flags.keyboard_text_selection_used = true;
        self.set_user_interactive();
    }

    pub fn set_keyboard_text_editing_used(&mut self) {
        self.flags.keyboard_text_editing_used = true;
        self.set_user_interactive();
    }

    // --- shutdown --------------------------------------------------------

    /// Writes the session summary. Runs once, at shutdown.
    ///
    /// Nothing is emitted when telemetry is off or the user never
    /// interacted. Returns whether the summary went out.
    pub fn finalize(&mut self, host: &HostSnapshot) -> bool {
        if !self.sink.is_enabled() {
            return false;
        }
        if !self.user_interactive {
            debug!(activity = %self.activity, "session was not interactive, skipping summary");
            return false;
        }

        self.fold_pending_counters();

        let summary = self.summary(host, self.clock.now_secs());
        let processes = self.registry.len();
        let delivered = self.emit(TelemetryRecord::SessionEnding(Box::new(summary)));
        self.find_dialog.reset();

        if delivered {
            info!(activity = %self.activity, processes, "session summary written");
        }
        delivered
    }

    fn summary(&self, host: &HostSnapshot, ended_at: i64) -> SessionSummary {
        let slots = self.registry.slots();
        SessionSummary {
            activity: self.activity,
            bash_used: self.flags.bash_used,
            ctrl_pg_up_pg_dn_used: self.flags.ctrl_pg_up_pg_dn_used,
            keyboard_text_editing_used: self.flags.keyboard_text_editing_used,
            keyboard_text_selection_used: self.flags.keyboard_text_selection_used,
            launched_from_shortcut: host.launched_from_shortcut,
            processes_connected: self.registry.packed().encode(),
            processes_connected_count: slots.iter().map(|s| s.connection_count).collect(),
            processes_connected_codes_count: slots.iter().map(|s| s.primary_count).collect(),
            processes_connected_failed_codes_count: slots.iter().map(|s| s.failed_count).collect(),
            processes_connected_failed_outside_count: slots
                .iter()
                .map(|s| s.failed_out_of_range_count)
                .collect(),
            started_using_at_seconds: self.started_at,
            ended_using_at_seconds: ended_at,
            find_dialog: self.find_dialog.snapshot(),
            settings: host.settings.clone(),
            api_used: self.api.default_report(),
            api_ansi_used: self.api.legacy_report(),
        }
    }

    // --- diagnostics -----------------------------------------------------

    /// A failed internal assertion in the host.
    pub fn report_assert(&self, source_text: &str, file_name: &str, line_number: u32) {
        warn!(source_text, file_name, line_number, "host assertion failed");
        if self.sink.is_enabled() {
            self.emit(TelemetryRecord::Assert {
                activity: self.activity,
                source_text: source_text.to_owned(),
                file_name: file_name.to_owned(),
                line_number,
            });
        }
    }

    /// Legacy free-form diagnostic. Logged locally, forwarded when non-empty
    /// and cut to `MAX_RIP_MESSAGE_CHARS`.
    pub fn report_rip_message(&self, message: &str) {
        debug!(message, "rip");
        if !message.is_empty() && self.sink.is_enabled() {
            let end = message
                .char_indices()
                .nth(MAX_RIP_MESSAGE_CHARS)
                .map_or(message.len(), |(at, _)| at);
            self.emit(TelemetryRecord::RipMessage {
                activity: self.activity,
                message: message[..end].to_owned(),
            });
        }
    }

    fn emit(&self, record: TelemetryRecord) -> bool {
        let name = record.name();
        match self.sink.emit(record) {
            Ok(()) => true,
            Err(err) => {
                warn!(event = name, error = %err, "telemetry sink rejected record");
                false
            }
        }
    }

    // --- accessors -------------------------------------------------------

    pub fn activity(&self) -> Uuid {
        self.activity
    }

    pub fn registry(&self) -> &NameRegistry {
        &self.registry
    }

    pub fn attribution(&self) -> Option<SlotIndex> {
        self.attribution
    }

    pub fn api_counters(&self) -> &ApiCounters {
        &self.api
    }

    pub fn find_dialog(&self) -> &RunningStats {
        &self.find_dialog
    }

    pub fn flags(&self) -> UsageFlags {
        self.flags
    }

    pub fn is_user_interactive(&self) -> bool {
        self.user_interactive
    }

    pub fn started_at(&self) -> i64 {
        self.started_at
    }
}

impl std::fmt::Debug for UsageAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UsageAggregator")
            .field("activity", &self.activity)
            .field("processes", &self.registry.len())
            .field("attribution", &self.attribution)
            .field("flags", &self.flags)
            .field("user_interactive", &self.user_interactive)
            .finish_non_exhaustive()
    }
}
