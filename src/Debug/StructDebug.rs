use std::fmt;
use crate::Core::alloc::SlotArena;
use crate::SPSC::Buffer::{RingBuffer, Slot};

/// Debug function for SlotArena
///
/// Shows the arena geometry and base address; never reads payload bytes.
pub fn debug_slot_arena(arena: &SlotArena, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("SlotArena")
        .field("base", &format_args!("{:p}", arena.as_ptr()))
        .field("spans", &arena.spans())
        .field("span_len", &arena.span_len())
        .field("bytes", &arena.len())
        .finish()
}

/// Debug function for RingBuffer
///
/// Counters are sampled the same way the monitor samples them, without
/// taking any slot lock.
pub fn debug_ring_buffer(buffer: &RingBuffer, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let stats = buffer.stats();
    f.debug_struct("RingBuffer")
        .field("num_slots", &buffer.num_slots())
        .field("slot_capacity", &buffer.slot_capacity())
        .field("slots_filled", &stats.slots_filled)
        .field("total_produced", &stats.total_produced)
        .field("total_consumed", &stats.total_consumed)
        .field("closed", &buffer.is_closed())
        .field("arena", &buffer.arena)
        .finish_non_exhaustive()
}

/// Debug function for Slot
///
/// Uses try_lock so formatting a slot can never stall a worker.
pub fn debug_slot(slot: &Slot, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let mut s = f.debug_struct("Slot");
    s.field("index", &slot.index()).field("next", &slot.next());
    match slot.header.try_lock() {
        Some(header) => s.field("state", &header.state).field("meta", &header.meta),
        None => s.field("state", &"<locked>"),
    };
    s.finish()
}
