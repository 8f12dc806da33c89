use std::sync::atomic::Ordering::{AcqRel, Acquire};
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};
use tracing::{debug, trace, warn};

use super::layout::{RingCounters, RingStats};
use super::Buffer::{RingBuffer, Slot, SlotHeader, SlotState};
use crate::Core::alloc::SlotArena;
use crate::Core::error::{CaptureError, Result};
use crate::SPSC::Structs::Buffer_Structs::RecordMeta;
use crate::SPSC::{Consumer, Producer};

impl Slot {
    fn new(index: usize, num_slots: usize) -> Self {
        Self {
            header: Mutex::new(SlotHeader {
                state: SlotState::Writable,
                meta: RecordMeta::default(),
            }),
            cond: Condvar::new(),
            index,
            next: (index + 1) % num_slots,
        }
    }

    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Index of the slot that follows this one in the ring.
    #[inline]
    pub fn next(&self) -> usize {
        self.next
    }

    /// Current handshake state. Takes the slot lock briefly.
    pub fn state(&self) -> SlotState {
        self.header.lock().state
    }
}

impl RingBuffer {
    /// Allocate a ring of `num_slots` slots, each holding up to `slot_capacity` bytes.
    ///
    /// Every slot starts `Writable` and all counters start at zero. Fails
    /// before anything is shared if either the arena or the slot table cannot
    /// be allocated.
    pub fn create(num_slots: usize, slot_capacity: usize) -> Result<Self> {
        if num_slots == 0 {
            return Err(CaptureError::InvalidGeometry(
                "ring needs at least one slot".into(),
            ));
        }
        if slot_capacity == 0 {
            return Err(CaptureError::InvalidGeometry(
                "slot capacity must be greater than zero".into(),
            ));
        }

        let arena = SlotArena::new(num_slots, slot_capacity)?;

        let mut slots = Vec::new();
        slots
            .try_reserve_exact(num_slots)
            .map_err(|_| CaptureError::SlotAllocation { slots: num_slots })?;
        slots.extend((0..num_slots).map(|i| Slot::new(i, num_slots)));

        debug!(num_slots, slot_capacity, "ring buffer created");

        Ok(Self {
            arena,
            slots: slots.into_boxed_slice(),
            counters: RingCounters::new(),
            closed: Default::default(),
            producer_claimed: Default::default(),
            consumer_claimed: Default::default(),
        })
    }

    /// Claim the single producer endpoint of this ring.
    pub fn producer(self: &Arc<Self>) -> Result<Producer> {
        if self.producer_claimed.swap(true, AcqRel) {
            return Err(CaptureError::EndpointClaimed("producer"));
        }
        Ok(Producer::new(Arc::clone(self)))
    }

    /// Claim the single consumer endpoint of this ring.
    pub fn consumer(self: &Arc<Self>) -> Result<Consumer> {
        if self.consumer_claimed.swap(true, AcqRel) {
            return Err(CaptureError::EndpointClaimed("consumer"));
        }
        Ok(Consumer::new(Arc::clone(self)))
    }

    #[inline]
    pub fn num_slots(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn slot_capacity(&self) -> usize {
        self.arena.span_len()
    }

    #[inline]
    pub fn slot(&self, index: usize) -> &Slot {
        &self.slots[index]
    }

    #[inline]
    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn counters(&self) -> &RingCounters {
        &self.counters
    }

    /// Lock-free sample of the counters; never touches a slot lock.
    pub fn stats(&self) -> RingStats {
        self.counters.snapshot(self.num_slots())
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Acquire)
    }

    /// Poison the ring: wake every waiter and make all further waits fail with `Closed`.
    ///
    /// Used when one side stops for good without a sentinel, so the other side
    /// cannot stay parked on a slot that will never flip.
    pub fn close(&self) {
        if self.closed.swap(true, AcqRel) {
            return;
        }
        warn!("ring buffer closed");
        for slot in self.slots.iter() {
            // Taking the lock orders the flag store before any waiter's re-check.
            let _header = slot.header.lock();
            slot.cond.notify_all();
        }
    }

    /// Block until slot `index` is `Writable`.
    pub(crate) fn wait_writable(&self, index: usize) -> Result<()> {
        let slot = &self.slots[index];
        let mut header = slot.header.lock();
        while header.state != SlotState::Writable {
            if self.is_closed() {
                return Err(CaptureError::Closed);
            }
            trace!(slot = index, "waiting for writable slot");
            slot.cond.wait(&mut header);
        }
        if self.is_closed() {
            return Err(CaptureError::Closed);
        }
        Ok(())
    }

    /// Block until slot `index` is `Readable` and return the header of the record it holds.
    pub(crate) fn wait_readable(&self, index: usize) -> Result<RecordMeta> {
        let slot = &self.slots[index];
        let mut header = slot.header.lock();
        while header.state != SlotState::Readable {
            if self.is_closed() {
                return Err(CaptureError::Closed);
            }
            trace!(slot = index, "waiting for readable slot");
            slot.cond.wait(&mut header);
        }
        Ok(header.meta)
    }

    /// Producer side: publish `meta` and hand slot `index` to the consumer.
    pub(crate) fn mark_readable(&self, index: usize, meta: RecordMeta) {
        let slot = &self.slots[index];
        let mut header = slot.header.lock();
        debug_assert_eq!(header.state, SlotState::Writable);
        header.meta = meta;
        // Count before flipping: the consumer cannot decrement until it sees Readable.
        self.counters.record_produced();
        header.state = SlotState::Readable;
        slot.cond.notify_all();
    }

    /// Consumer side: hand slot `index` back to the producer.
    pub(crate) fn mark_writable(&self, index: usize) {
        let slot = &self.slots[index];
        let mut header = slot.header.lock();
        debug_assert_eq!(header.state, SlotState::Readable);
        self.counters.record_consumed();
        header.state = SlotState::Writable;
        slot.cond.notify_all();
    }

    /// Exclusive view of the payload span of slot `index`.
    ///
    /// # Safety
    /// Caller must be the producer and must have observed the slot `Writable`
    /// without flipping it since.
    #[inline]
    #[allow(clippy::mut_from_ref)]
    pub(crate) unsafe fn payload_mut(&self, index: usize) -> &mut [u8] {
        self.arena.span_mut(index)
    }

    /// Shared view of the payload span of slot `index`.
    ///
    /// # Safety
    /// Caller must be the consumer and must have observed the slot `Readable`
    /// without flipping it since.
    #[inline]
    pub(crate) unsafe fn payload(&self, index: usize) -> &[u8] {
        self.arena.span(index)
    }
}

impl Drop for RingBuffer {
    fn drop(&mut self) {
        let stats = self.stats();
        debug!(
            produced = stats.total_produced,
            consumed = stats.total_consumed,
            filled = stats.slots_filled,
            "ring buffer released"
        );
    }
}
