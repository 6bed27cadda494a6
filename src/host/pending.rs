use std::sync::atomic::{AtomicU32, Ordering};

/// Counters kept by the terminal parser with no notion of which client
/// produced them. Each `take_*` returns the running count and zeroes it.
pub trait PendingCounters: Send + Sync {
    fn take_current(&self) -> u32;
    fn take_failed(&self) -> u32;
    fn take_failed_out_of_range(&self) -> u32;
}

/// Lock-free pending counters, shared between the parser (producer) and
/// the aggregator (consumer).
#[derive(Debug, Default)]
pub struct AtomicPendingCounters {
    current: AtomicU32,
    failed: AtomicU32,
    failed_out_of_range: AtomicU32,
}

impl AtomicPendingCounters {
    pub const fn new() -> Self {
        Self {
            current: AtomicU32::new(0),
            failed: AtomicU32::new(0),
            failed_out_of_range: AtomicU32::new(0),
        }
    }

    /// A control sequence was recognized and applied.
    pub fn record_used(&self) {
        self.current.fetch_add(1, Ordering::Relaxed);
    }

    /// A control sequence was recognized but could not be applied.
    pub fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    /// A control sequence fell outside the supported range.
    pub fn record_failed_out_of_range(&self) {
        self.failed_out_of_range.fetch_add(1, Ordering::Relaxed);
    }

    /// Current values without resetting.
    pub fn peek(&self) -> (u32, u32, u32) {
        (
            self.current.load(Ordering::Relaxed),
            self.failed.load(Ordering::Relaxed),
            self.failed_out_of_range.load(Ordering::Relaxed),
        )
    }
}

impl PendingCounters for AtomicPendingCounters {
    fn take_current(&self) -> u32 {
        self.current.swap(0, Ordering::Relaxed)
    }

    fn take_failed(&self) -> u32 {
        self.failed.swap(0, Ordering::Relaxed)
    }

    fn take_failed_out_of_range(&self) -> u32 {
        self.failed_out_of_range.swap(0, Ordering::Relaxed)
    }
}
