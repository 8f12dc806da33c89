// In src/SPSC/producer.rs
use crate::Core::cancel::CancellationToken;
use crate::Core::error::{CaptureError, Result};
use crate::Core::source::{Readiness, Source};
use crate::SPSC::Buffer::RingBuffer;
use crate::SPSC::Structs::Buffer_Structs::{OversizePolicy, RecordMeta};
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// The writing endpoint of a ring.
///
/// There is at most one per ring (see [`RingBuffer::producer`]). It walks the
/// slots in ring order, filling each one only after the consumer has handed
/// it back.
pub struct Producer {
    ring: Arc<RingBuffer>,
    cursor: usize,
    oversize: OversizePolicy,
    finished: bool,
}

/// Exclusive, scoped access to the payload of one writable slot.
///
/// Dropping the writer without publishing leaves the slot writable and the
/// cursor where it was, so the next acquire returns the same slot.
pub struct SlotWriter<'a> {
    ring: &'a RingBuffer,
    index: usize,
    cursor: &'a mut usize,
}

/// Why the producer loop stopped.
#[derive(Debug)]
pub enum StopReason {
    /// The cancellation token was observed.
    Cancelled,
    /// The source failed with a non-retryable error.
    SourceFailed(io::Error),
    /// The ring was closed underneath the producer; no sentinel was sent.
    RingClosed,
    /// `run` was entered after the sentinel had already been published.
    AlreadyFinished,
}

/// Summary of one producer loop run.
#[derive(Debug)]
pub struct ProducerReport {
    pub records: u64,
    pub bytes: u64,
    pub oversized_dropped: u64,
    pub truncated: u64,
    pub sentinel_sent: bool,
    pub stop: StopReason,
}

impl<'a> SlotWriter<'a> {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn capacity(&self) -> usize {
        self.ring.slot_capacity()
    }

    /// The slot's full payload span.
    pub fn buf(&mut self) -> &mut [u8] {
        // SAFETY: a SlotWriter only exists after wait_writable succeeded for
        // this index, and it mutably borrows the single Producer, so nobody
        // else can reach this span until publish flips the slot.
        unsafe { self.ring.payload_mut(self.index) }
    }

    /// Publish the first `len` bytes of the span and move the producer to the next slot.
    pub fn publish(self, len: usize) -> Result<()> {
        let capacity = self.capacity();
        if len > capacity {
            return Err(CaptureError::RecordTooLarge { len, capacity });
        }
        self.commit(RecordMeta::data(len));
        Ok(())
    }

    fn commit(self, meta: RecordMeta) {
        self.ring.mark_readable(self.index, meta);
        *self.cursor = self.ring.slot(self.index).next();
    }
}

impl Producer {
    pub(crate) fn new(ring: Arc<RingBuffer>) -> Self {
        Self {
            ring,
            cursor: 0,
            oversize: OversizePolicy::default(),
            finished: false,
        }
    }

    pub fn with_oversize_policy(mut self, policy: OversizePolicy) -> Self {
        self.oversize = policy;
        self
    }

    pub fn ring(&self) -> &Arc<RingBuffer> {
        &self.ring
    }

    /// Index of the slot the next acquire will wait on.
    pub fn position(&self) -> usize {
        self.cursor
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Wait until the current slot is writable and borrow its payload.
    ///
    /// This wait is unbounded: it is where a slow consumer throttles ingest.
    pub fn acquire(&mut self) -> Result<SlotWriter<'_>> {
        if self.finished {
            return Err(CaptureError::StreamEnded);
        }
        self.ring.wait_writable(self.cursor)?;
        Ok(SlotWriter {
            ring: &*self.ring,
            index: self.cursor,
            cursor: &mut self.cursor,
        })
    }

    /// Copy `record` into the next slot and publish it.
    pub fn send(&mut self, record: &[u8]) -> Result<()> {
        let capacity = self.ring.slot_capacity();
        if record.len() > capacity {
            return Err(CaptureError::RecordTooLarge {
                len: record.len(),
                capacity,
            });
        }
        let mut slot = self.acquire()?;
        slot.buf()[..record.len()].copy_from_slice(record);
        slot.publish(record.len())
    }

    /// Enqueue the end-of-stream sentinel. Later calls are no-ops.
    pub fn finish(&mut self) -> Result<()> {
        if self.finished {
            return Ok(());
        }
        let slot = self.acquire()?;
        let index = slot.index();
        slot.commit(RecordMeta::end_of_stream());
        self.finished = true;
        debug!(slot = index, "end-of-stream sentinel published");
        Ok(())
    }

    /// Pull records from `source` into the ring until cancelled or the source fails.
    ///
    /// Whatever the reason for stopping, the loop ends by publishing the
    /// sentinel (unless the ring was closed or the sentinel already went out)
    /// and shutting the source down.
    pub fn run<S: Source + ?Sized>(
        &mut self,
        source: &mut S,
        cancel: &CancellationToken,
        poll_timeout: Duration,
    ) -> ProducerReport {
        let capacity = self.ring.slot_capacity();
        let policy = self.oversize;
        let mut records = 0u64;
        let mut bytes = 0u64;
        let mut oversized_dropped = 0u64;
        let mut truncated = 0u64;

        info!(slots = self.ring.num_slots(), capacity, "producer loop started");

        let stop = loop {
            if self.finished {
                warn!("producer already finished, nothing to run");
                break StopReason::AlreadyFinished;
            }
            if cancel.is_cancelled() {
                break StopReason::Cancelled;
            }
            if self.ring.is_closed() {
                break StopReason::RingClosed;
            }

            match source.wait_ready(poll_timeout) {
                Ok(Readiness::Ready) => {}
                Ok(Readiness::TimedOut) => continue,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    error!(error = %e, "source readiness wait failed");
                    break StopReason::SourceFailed(e);
                }
            }

            let mut slot = match self.acquire() {
                Ok(slot) => slot,
                Err(CaptureError::Closed) => break StopReason::RingClosed,
                Err(CaptureError::StreamEnded) => break StopReason::AlreadyFinished,
                Err(e) => {
                    error!(error = %e, "unable to acquire slot");
                    break StopReason::RingClosed;
                }
            };

            let len = match source.read_into(slot.buf()) {
                Ok(len) => len,
                Err(e)
                    if matches!(
                        e.kind(),
                        io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
                    ) =>
                {
                    // Slot stays writable and is reused on the next pass.
                    continue;
                }
                Err(e) => {
                    error!(error = %e, "source read failed");
                    break StopReason::SourceFailed(e);
                }
            };

            let len = if len > capacity {
                match policy {
                    OversizePolicy::Reject => {
                        oversized_dropped += 1;
                        warn!(len, capacity, "dropping oversized record");
                        continue;
                    }
                    OversizePolicy::Truncate => {
                        truncated += 1;
                        warn!(len, capacity, "truncating oversized record");
                        capacity
                    }
                }
            } else {
                len
            };

            let index = slot.index();
            if let Err(e) = slot.publish(len) {
                error!(error = %e, "publish failed");
                break StopReason::RingClosed;
            }
            records += 1;
            bytes += len as u64;
            debug!(slot = index, len, "received record");
        };

        let sentinel_sent = match stop {
            StopReason::RingClosed | StopReason::AlreadyFinished => false,
            _ => match self.finish() {
                Ok(()) => true,
                Err(e) => {
                    warn!(error = %e, "could not publish end-of-stream sentinel");
                    false
                }
            },
        };

        source.shutdown();

        info!(records, bytes, stop = ?stop, "producer loop finished");

        ProducerReport {
            records,
            bytes,
            oversized_dropped,
            truncated,
            sentinel_sent,
            stop,
        }
    }
}

impl std::fmt::Debug for Producer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Producer")
            .field("cursor", &self.cursor)
            .field("oversize", &self.oversize)
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}
