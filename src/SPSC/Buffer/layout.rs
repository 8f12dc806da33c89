use crossbeam_utils::CachePadded;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// The three counters shared by producer, consumer and monitor.
///
/// Each one has a single incrementing side (and, for `slots_filled`, a single
/// decrementing side), so plain atomic add/sub is enough. They are the only
/// ring state written outside a slot lock.
///
/// Every counter sits on its own cache line so the producer's increments do
/// not bounce the consumer's line and vice versa.
#[repr(C, align(128))]
pub struct RingCounters {
    /// Slots currently holding a published, unconsumed record.
    pub slots_filled: CachePadded<AtomicUsize>,

    /// Records published over the lifetime of the ring (sentinel included).
    pub total_produced: CachePadded<AtomicU64>,

    /// Records released over the lifetime of the ring (sentinel included).
    pub total_consumed: CachePadded<AtomicU64>,
}

impl Default for RingCounters {
    fn default() -> Self {
        Self::new()
    }
}

impl RingCounters {
    pub fn new() -> Self {
        Self {
            slots_filled: CachePadded::new(AtomicUsize::new(0)),
            total_produced: CachePadded::new(AtomicU64::new(0)),
            total_consumed: CachePadded::new(AtomicU64::new(0)),
        }
    }

    #[inline]
    pub(crate) fn record_produced(&self) {
        self.total_produced.fetch_add(1, Ordering::Release);
        self.slots_filled.fetch_add(1, Ordering::Release);
    }

    #[inline]
    pub(crate) fn record_consumed(&self) {
        self.slots_filled.fetch_sub(1, Ordering::Release);
        self.total_consumed.fetch_add(1, Ordering::Release);
    }

    /// Three independent loads. The result may mix instants; each field on
    /// its own is never older than a previous snapshot from the same thread.
    pub fn snapshot(&self, num_slots: usize) -> RingStats {
        RingStats {
            num_slots,
            slots_filled: self.slots_filled.load(Ordering::Acquire),
            total_produced: self.total_produced.load(Ordering::Acquire),
            total_consumed: self.total_consumed.load(Ordering::Acquire),
        }
    }
}

/// A point-in-time reading of [`RingCounters`].
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct RingStats {
    pub num_slots: usize,
    pub slots_filled: usize,
    pub total_produced: u64,
    pub total_consumed: u64,
}

impl RingStats {
    pub fn free_slots(&self) -> usize {
        self.num_slots.saturating_sub(self.slots_filled)
    }
}
