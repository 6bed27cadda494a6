use std::cmp::Ordering;
use std::sync::Arc;

use session_tally::config::ShellProbe;
use session_tally::host::pending::AtomicPendingCounters;
use session_tally::host::sink::MemorySink;
use session_tally::usage::aggregator::{ConnectOutcome, UsageAggregator};
use session_tally::usage::packed::PACKED_NAME_LIMIT;
use session_tally::usage::registry::{cmp_ignore_case, Lookup, ProcessName, MAX_NAME_UNITS, MAX_PROCESS_NAMES};
use std::path::Path;

fn aggregator() -> UsageAggregator {
    UsageAggregator::new(
        ShellProbe::default(),
        Arc::new(MemorySink::new()),
        Arc::new(AtomicPendingCounters::new()),
    )
}

fn utf16(s: &str) -> Vec<u16> {
    s.encode_utf16().collect()
}

fn assert_sorted_permutation(agg: &UsageAggregator) {
    let reg = agg.registry();
    let order = reg.alphabetical();
    assert_eq!(order.len(), reg.len());

    let mut seen = vec![false; reg.len()];
    for &index in order {
        assert!(index < reg.len(), "index {} out of range", index);
        assert!(!seen[index], "index {} appears twice", index);
        seen[index] = true;
    }

    for pair in order.windows(2) {
        let a = utf16(&reg.name(pair[0]).unwrap());
        let b = utf16(&reg.name(pair[1]).unwrap());
        assert_eq!(cmp_ignore_case(&a, &b), Ordering::Less, "alphabetical index out of order");
    }
}

#[test]
fn test_index_stays_sorted_for_any_connect_order() {
    let pool = [
        "cmd.exe", "git.exe", "Bash.exe", "pwsh.exe", "vim.exe", "ssh.exe", "node.exe",
        "python.exe", "CMD.EXE", "cargo.exe", "rustc.exe", "wsl.exe", "less.exe", "a.exe",
        "Z.exe", "_tool.exe", "[x].exe", "{y}.exe",
    ];

    // Small LCG so the order is scrambled but reproducible.
    let mut state: u32 = 0x2545_f491;
    let mut agg = aggregator();
    for _ in 0..200 {
        state = state.wrapping_mul(1_103_515_245).wrapping_add(12_345);
        let name = pool[(state >> 16) as usize % pool.len()];
        agg.on_connect_image(Path::new(name));
        assert_sorted_permutation(&agg);
    }
    for name in pool {
        agg.on_connect_image(Path::new(name));
        assert_sorted_permutation(&agg);
    }
    // "cmd.exe" and "CMD.EXE" share a slot.
    assert_eq!(agg.registry().len(), pool.len() - 1);
}

#[test]
fn test_repeat_connect_reuses_slot() {
    let mut agg = aggregator();
    assert_eq!(agg.on_connect_image(Path::new("/usr/bin/git")), ConnectOutcome::Registered(0));
    assert_eq!(agg.on_connect_image(Path::new("/opt/git/git")), ConnectOutcome::Counted(0));

    let reg = agg.registry();
    assert_eq!(reg.len(), 1);
    assert_eq!(reg.slot(0).unwrap().connection_count, 2);
}

#[test]
fn test_case_insensitive_identity() {
    let mut agg = aggregator();
    agg.on_connect_image(Path::new(r"C:\Windows\System32\Bash.exe"));
    let outcome = agg.on_connect_image(Path::new(r"C:\Windows\System32\BASH.EXE"));
    assert_eq!(outcome, ConnectOutcome::Counted(0));

    let probe = ProcessName::new("bash.EXE").unwrap();
    assert_eq!(agg.registry().lookup(&probe), Lookup::Found { position: 0 });
    // The first spelling seen is the one kept.
    assert_eq!(agg.registry().name(0).as_deref(), Some("Bash.exe"));
}

#[test]
fn test_capacity_cutoff() {
    let mut agg = aggregator();
    for i in 0..MAX_PROCESS_NAMES {
        let name = format!("p{:02}.exe", i);
        assert_eq!(agg.on_connect_image(Path::new(&name)), ConnectOutcome::Registered(i));
    }
    let before: Vec<_> = agg.registry().slots().to_vec();

    assert_eq!(agg.on_connect_image(Path::new("late.exe")), ConnectOutcome::Dropped);
    assert_eq!(agg.attribution(), None);
    assert_eq!(agg.registry().len(), MAX_PROCESS_NAMES);
    assert_eq!(agg.registry().slots(), before.as_slice());

    // Known names still accumulate.
    assert_eq!(agg.on_connect_image(Path::new("p07.exe")), ConnectOutcome::Counted(7));
    assert_eq!(agg.registry().slot(7).unwrap().connection_count, 2);
}

#[test]
fn test_packed_buffer_cutoff() {
    let mut agg = aggregator();
    let mut admitted = 0;
    for letter in 'a'..='z' {
        let name = format!("{}{}", letter, "x".repeat(254));
        match agg.on_connect_image(Path::new(&name)) {
            ConnectOutcome::Registered(_) => admitted += 1,
            ConnectOutcome::Dropped => break,
            other => panic!("unexpected outcome {:?}", other),
        }
    }
    // 256 units per name after the header: the eighth would not fit.
    assert_eq!(admitted, 7);
    assert_eq!(agg.registry().len(), 7);
    assert_eq!(agg.registry().packed().count(), 7);

    // Short names still fit in the remaining space.
    assert!(matches!(agg.on_connect_image(Path::new("sh")), ConnectOutcome::Registered(7)));
}

#[test]
fn test_packed_buffer_keeps_safety_margin() {
    let mut agg = aggregator();
    for letter in 'a'..='g' {
        let name = format!("{}{}", letter, "x".repeat(MAX_NAME_UNITS - 1));
        assert!(matches!(agg.on_connect_image(Path::new(&name)), ConnectOutcome::Registered(_)));
    }
    // 1 + 7 * 261 units used; this name stops one unit short of the margin.
    let filler = format!("h{}", "x".repeat(207));
    assert!(matches!(agg.on_connect_image(Path::new(&filler)), ConnectOutcome::Registered(7)));
    assert_eq!(agg.registry().packed().written_units(), PACKED_NAME_LIMIT - 1);

    assert_eq!(agg.on_connect_image(Path::new("i123456789")), ConnectOutcome::Dropped);
    assert_eq!(agg.on_connect_image(Path::new("j")), ConnectOutcome::Dropped);
    assert_eq!(agg.registry().len(), 8);
    assert!(agg.registry().packed().written_units() <= PACKED_NAME_LIMIT);
}

#[test]
fn test_packed_buffer_fills_exactly_to_margin() {
    let mut agg = aggregator();
    for letter in 'a'..='g' {
        let name = format!("{}{}", letter, "x".repeat(MAX_NAME_UNITS - 1));
        agg.on_connect_image(Path::new(&name));
    }
    let filler = format!("h{}", "x".repeat(208));
    assert!(matches!(agg.on_connect_image(Path::new(&filler)), ConnectOutcome::Registered(7)));
    assert_eq!(agg.registry().packed().written_units(), PACKED_NAME_LIMIT);
    assert_eq!(agg.on_connect_image(Path::new("j")), ConnectOutcome::Dropped);
}

#[test]
fn test_count_header_tracks_inserts() {
    let mut agg = aggregator();
    for (i, name) in ["c.exe", "a.exe", "c.exe", "b.exe", "A.EXE", "d.exe"].iter().enumerate() {
        agg.on_connect_image(Path::new(name));
        let reg = agg.registry();
        assert_eq!(reg.packed().count() as usize, reg.len(), "after insert {}", i);
        let bytes = reg.packed().encode();
        assert_eq!(u16::from_le_bytes([bytes[0], bytes[1]]) as usize, reg.len());
    }
    assert_eq!(agg.registry().len(), 4);
}

#[test]
fn test_paths_never_stored() {
    let mut agg = aggregator();
    agg.on_connect_image(Path::new("/home/alice/projects/bin/tool"));
    let bytes = agg.registry().packed().encode();
    let units: Vec<u16> = bytes[2..]
        .chunks_exact(2)
        .map(|c| u16::from_le_bytes([c[0], c[1]]))
        .collect();
    let text = String::from_utf16_lossy(&units);
    assert_eq!(text, "tool\0");
}
