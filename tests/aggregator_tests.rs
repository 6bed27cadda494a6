use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use session_tally::config::ShellProbe;
use session_tally::error::SinkError;
use session_tally::host::identity::{ProcessHandle, StaticResolver};
use session_tally::host::pending::{AtomicPendingCounters, PendingCounters};
use session_tally::host::settings::HostSnapshot;
use session_tally::host::sink::{MemorySink, TelemetrySink};
use session_tally::usage::aggregator::{ConnectOutcome, UsageAggregator, UsageFlags};
use session_tally::usage::api::ApiCall;
use session_tally::usage::event::TelemetryRecord;
use session_tally::usage::metrics::RunningStats;

fn unix_shell() -> ShellProbe {
    ShellProbe {
        image_name: "bash".to_string(),
        system_dir: PathBuf::from("/usr/bin"),
    }
}

fn setup() -> (UsageAggregator, Arc<MemorySink>, Arc<AtomicPendingCounters>) {
    let sink = Arc::new(MemorySink::new());
    let pending = Arc::new(AtomicPendingCounters::new());
    let agg = UsageAggregator::new(unix_shell(), sink.clone(), pending.clone());
    (agg, sink, pending)
}

/// Counts every call, enabled or not.
#[derive(Default)]
struct CountingSink {
    enabled: bool,
    checks: AtomicUsize,
    emits: AtomicUsize,
}

impl TelemetrySink for CountingSink {
    fn is_enabled(&self) -> bool {
        self.checks.fetch_add(1, Ordering::SeqCst);
        self.enabled
    }

    fn emit(&self, _record: TelemetryRecord) -> Result<(), SinkError> {
        self.emits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[test]
fn test_counters_credit_previous_process() {
    let (mut agg, _sink, pending) = setup();

    agg.on_connect_image(Path::new("/usr/bin/vim"));
    assert_eq!(agg.attribution(), Some(0));
    for _ in 0..3 {
        pending.record_used();
    }
    pending.record_failed();
    pending.record_failed_out_of_range();
    pending.record_failed_out_of_range();

    // The next connect folds what accrued while vim was current.
    agg.on_connect_image(Path::new("/usr/bin/less"));
    let vim = agg.registry().slot(0).unwrap();
    assert_eq!(vim.primary_count, 3);
    assert_eq!(vim.failed_count, 1);
    assert_eq!(vim.failed_out_of_range_count, 2);
    assert_eq!(agg.attribution(), Some(1));

    let less = agg.registry().slot(1).unwrap();
    assert_eq!((less.primary_count, less.failed_count, less.failed_out_of_range_count), (0, 0, 0));
}

#[test]
fn test_fold_zeroes_source_without_attribution() {
    let (mut agg, _sink, pending) = setup();
    pending.record_used();
    pending.record_failed();
    pending.record_failed_out_of_range();

    assert_eq!(agg.attribution(), None);
    agg.fold_pending_counters();
    assert_eq!(pending.peek(), (0, 0, 0));

    // Nothing from before the first connect reaches the first slot.
    pending.record_used();
    agg.on_connect_image(Path::new("/bin/sh"));
    assert_eq!(agg.registry().slot(0).unwrap().primary_count, 0);
}

#[test]
fn test_fold_clears_attribution() {
    let (mut agg, _sink, pending) = setup();
    agg.on_connect_image(Path::new("/bin/sh"));
    pending.record_used();
    agg.fold_pending_counters();
    assert_eq!(agg.attribution(), None);

    pending.record_used();
    agg.fold_pending_counters();
    assert_eq!(agg.registry().slot(0).unwrap().primary_count, 1, "second fold must be discarded");
    assert_eq!(pending.take_current(), 0);
}

#[test]
fn test_dropped_connect_discards_counters() {
    let (mut agg, _sink, pending) = setup();
    for i in 0..session_tally::usage::registry::MAX_PROCESS_NAMES {
        agg.on_connect_image(Path::new(&format!("t{}", i)));
    }
    assert_eq!(agg.on_connect_image(Path::new("overflow")), ConnectOutcome::Dropped);
    pending.record_used();
    agg.fold_pending_counters();

    let total: u32 = agg.registry().slots().iter().map(|s| s.primary_count).sum();
    assert_eq!(total, 0);
}

#[test]
fn test_unresolved_process_discards_counters() {
    let (mut agg, _sink, pending) = setup();
    let resolver = StaticResolver::new().with(ProcessHandle(10), "/usr/bin/top");

    assert_eq!(agg.on_connect(&resolver, ProcessHandle(10)), ConnectOutcome::Registered(0));
    pending.record_used();
    assert_eq!(agg.on_connect(&resolver, ProcessHandle(11)), ConnectOutcome::Unresolved);
    assert_eq!(agg.attribution(), None);
    // Folded on the failed connect, credited to top which was current.
    assert_eq!(agg.registry().slot(0).unwrap().primary_count, 1);

    pending.record_used();
    agg.fold_pending_counters();
    assert_eq!(agg.registry().slot(0).unwrap().primary_count, 1);
    assert_eq!(pending.peek(), (0, 0, 0));
}

#[test]
fn test_disabled_sink_skips_connect_work() {
    let sink = Arc::new(CountingSink::default());
    let pending = Arc::new(AtomicPendingCounters::new());
    let mut agg = UsageAggregator::new(unix_shell(), sink.clone(), pending.clone());

    pending.record_used();
    assert_eq!(agg.on_connect_image(Path::new("/bin/sh")), ConnectOutcome::Skipped);
    assert!(agg.registry().is_empty());
    // Untouched: the parser keeps its count for whoever reads it next.
    assert_eq!(pending.peek(), (1, 0, 0));

    agg.set_user_interactive();
    assert!(!agg.finalize(&HostSnapshot::default()));
    assert_eq!(sink.emits.load(Ordering::SeqCst), 0);
    assert!(sink.checks.load(Ordering::SeqCst) >= 2);
}

#[test]
fn test_api_counters_split_by_variant() {
    let (mut agg, _sink, _pending) = setup();
    agg.record_api_call(ApiCall::WriteConsole, false);
    agg.record_api_call(ApiCall::WriteConsole, false);
    agg.record_api_call(ApiCall::WriteConsole, true);
    agg.record_api_call_default(ApiCall::GetConsoleMode);

    let api = agg.api_counters();
    assert_eq!(api.get(ApiCall::WriteConsole, false), 2);
    assert_eq!(api.get(ApiCall::WriteConsole, true), 1);
    assert_eq!(api.get(ApiCall::GetConsoleMode, false), 1);
    assert_eq!(api.get(ApiCall::GetConsoleMode, true), 0);
    assert!(api.any_legacy());
}

#[test]
fn test_api_kind_table() {
    assert_eq!(ApiCall::COUNT, 58);
    assert_eq!(ApiCall::ALL.iter().filter(|a| a.has_legacy_variant()).count(), 19);
    for (i, api) in ApiCall::ALL.iter().enumerate() {
        assert_eq!(*api as usize, i);
        assert_eq!(ApiCall::from_name(api.name()), Some(*api));
    }
    assert_eq!(ApiCall::from_name("writeconsole"), None);
}

#[test]
fn test_running_average_exact() {
    let mut stats = RunningStats::new();
    stats.record(4, true, false);
    stats.record(8, false, true);

    let snap = stats.snapshot();
    assert_eq!(snap.string_length_average, 6.0);
    assert_eq!(snap.direction_down_average, 0.5);
    assert_eq!(snap.match_case_average, 0.5);
    assert_eq!(snap.find_next_clicked_total, 2);

    stats.reset();
    assert_eq!(stats.samples(), 0);
    assert_eq!(stats.snapshot().string_length_average, 0.0);
}

#[test]
fn test_shell_detected_on_system_root() {
    let (mut agg, _sink, _pending) = setup();
    agg.on_connect_image(Path::new("/usr/local/bin/BASH"));
    assert!(agg.flags().bash_used);
}

#[test]
fn test_default_probe_detects_shell() {
    let probe = ShellProbe::default();
    let image = probe.system_dir.join(&probe.image_name);
    let mut agg = UsageAggregator::new(
        probe,
        Arc::new(MemorySink::new()),
        Arc::new(AtomicPendingCounters::new()),
    );
    agg.on_connect_image(&image);
    assert!(agg.flags().bash_used, "{} should count as the shell", image.display());
}

#[test]
fn test_drive_letter_probe_detects_shell() {
    let probe = ShellProbe {
        image_name: "bash.exe".to_string(),
        system_dir: PathBuf::from(r"C:\Windows\System32"),
    };
    let mut agg = UsageAggregator::new(
        probe,
        Arc::new(MemorySink::new()),
        Arc::new(AtomicPendingCounters::new()),
    );
    agg.on_connect_image(Path::new(r"C:\Windows\System32\Bash.exe"));
    assert!(agg.flags().bash_used);
}

#[test]
fn test_shell_first_sighting_decides() {
    let (mut agg, _sink, _pending) = setup();

    // A relative image has no root, so it does not count.
    agg.on_connect_image(Path::new("bin/bash"));
    assert!(!agg.flags().bash_used);

    // Same name is already known; it is not checked again.
    agg.on_connect_image(Path::new("/usr/bin/bash"));
    assert!(!agg.flags().bash_used);
    assert_eq!(agg.registry().slot(0).unwrap().connection_count, 2);
}

#[test]
fn test_other_names_never_set_shell_flag() {
    let (mut agg, _sink, _pending) = setup();
    agg.on_connect_image(Path::new("/usr/bin/zsh"));
    agg.on_connect_image(Path::new("/usr/bin/bash-completion"));
    assert!(!agg.flags().bash_used);
}

#[test]
fn test_interaction_setters() {
    let (mut agg, _sink, _pending) = setup();
    assert!(!agg.is_user_interactive());

    agg.set_window_size_changed();
    assert!(agg.is_user_interactive());
    assert_eq!(agg.flags(), UsageFlags::default());

    agg.set_ctrl_pg_up_pg_dn_used();
    agg.set_keyboard_text_selection_used();
    let flags = agg.flags();
    assert!(flags.ctrl_pg_up_pg_dn_used);
    assert!(flags.keyboard_text_selection_used);
    assert!(!flags.keyboard_text_editing_used);
}
