mod builder;
mod consumer;
mod monitor;
mod pipeline;
mod producer;

pub use builder::{
    PipelineBuilder, DEFAULT_MONITOR_INTERVAL, DEFAULT_NUM_SLOTS, DEFAULT_POLL_TIMEOUT,
    DEFAULT_SLOT_CAPACITY,
};
pub use consumer::{Consumer, ConsumerReport, SlotReader};
pub use monitor::Monitor;
pub use pipeline::{Pipeline, PipelineReport};
pub use producer::{Producer, ProducerReport, SlotWriter, StopReason};

#[allow(clippy::module_inception)]
pub mod Buffer {
    pub mod Buffer;
    pub mod Buffer_impl;
    pub mod layout;
    pub use Buffer::{RingBuffer, Slot, SlotState}; // re-export for stable path
    pub use layout::{RingCounters, RingStats};
}

pub mod Structs {
    pub mod Buffer_Structs;
    pub use Buffer_Structs::{OversizePolicy, Record, RecordKind, RecordMeta}; // re-export for stable path
}
