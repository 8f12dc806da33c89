// This is the slot ring shared by exactly one producer and one consumer

use super::layout::RingCounters;
use crate::Core::alloc::SlotArena;
use crate::SPSC::Structs::Buffer_Structs::RecordMeta;

use parking_lot::{Condvar, Mutex};
use std::sync::atomic::AtomicBool;

/// The two handshake states of a slot.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SlotState {
    /// Owned by the producer: free to be filled.
    Writable,
    /// Owned by the consumer: holds a published record.
    Readable,
}

/// Lock-protected part of a slot.
pub(crate) struct SlotHeader {
    pub(crate) state: SlotState,
    pub(crate) meta: RecordMeta,
}

/// A single cell of the ring.
///
/// The payload bytes live in the ring's arena at span `index`; the slot only
/// carries the handshake. Whoever observed the state they waited for under
/// `header` owns the span until they flip the state back.
pub struct Slot {
    /// State + record header. The only thing the lock protects directly.
    pub(crate) header: Mutex<SlotHeader>,

    /// Signalled on every state flip.
    pub(crate) cond: Condvar,

    /// Position of this slot and of its successor, closing the ring.
    pub(crate) index: usize,
    pub(crate) next: usize,
}

/// A fixed ring of independently locked slots over one contiguous arena.
///
/// ### Concurrency Design:
/// - **Producer**: waits for its current slot to be `Writable`, fills the
///   span, marks it `Readable`, moves to `next`.
/// - **Consumer**: waits for its current slot to be `Readable`, drains the
///   span, marks it `Writable`, moves to `next`.
/// - **Monitor**: reads `counters` only.
///
/// Locking per slot lets the producer fill slot i+1 while the consumer is
/// still draining slot i. Both sides walk the ring in the same order, which
/// makes delivery FIFO.
pub struct RingBuffer {
    /// Backing storage, one span per slot.
    pub(crate) arena: SlotArena,

    /// Handshake cells, one per span.
    pub(crate) slots: Box<[Slot]>,

    pub(crate) counters: RingCounters,

    /// Set once a stage fails; every wait returns `Closed` from then on.
    pub(crate) closed: AtomicBool,

    /// Single-claim guards for the two endpoints.
    pub(crate) producer_claimed: AtomicBool,
    pub(crate) consumer_claimed: AtomicBool,
}
