use super::Pipeline;
use crate::Core::error::Result;
use crate::SPSC::Buffer::RingBuffer;
use crate::SPSC::Structs::Buffer_Structs::OversizePolicy;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_NUM_SLOTS: usize = 10;
pub const DEFAULT_SLOT_CAPACITY: usize = 8192;
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(1);
pub const DEFAULT_MONITOR_INTERVAL: Duration = Duration::from_millis(100);

pub struct PipelineBuilder {
    num_slots: usize,
    slot_capacity: usize,
    poll_timeout: Duration,
    monitor_interval: Duration,
    oversize: OversizePolicy,
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self {
            num_slots: DEFAULT_NUM_SLOTS,
            slot_capacity: DEFAULT_SLOT_CAPACITY, // one jumbo datagram
            poll_timeout: DEFAULT_POLL_TIMEOUT,
            monitor_interval: DEFAULT_MONITOR_INTERVAL,
            oversize: OversizePolicy::Reject,
        }
    }
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_slots(mut self, num_slots: usize) -> Self {
        self.num_slots = num_slots;
        self
    }

    pub fn with_slot_capacity(mut self, slot_capacity: usize) -> Self {
        self.slot_capacity = slot_capacity;
        self
    }

    /// Upper bound on how long the producer waits for the source before re-checking cancellation.
    pub fn with_poll_timeout(mut self, poll_timeout: Duration) -> Self {
        self.poll_timeout = poll_timeout;
        self
    }

    pub fn with_monitor_interval(mut self, monitor_interval: Duration) -> Self {
        self.monitor_interval = monitor_interval;
        self
    }

    pub fn with_oversize_policy(mut self, oversize: OversizePolicy) -> Self {
        self.oversize = oversize;
        self
    }

    pub fn build_ring(&self) -> Result<Arc<RingBuffer>> {
        Ok(Arc::new(RingBuffer::create(self.num_slots, self.slot_capacity)?))
    }

    pub fn build(self) -> Result<Pipeline> {
        let ring = self.build_ring()?;
        Ok(Pipeline::new(
            ring,
            self.poll_timeout,
            self.monitor_interval,
            self.oversize,
        ))
    }
}
