// src/SPSC/consumer.rs

use crate::Core::error::{CaptureError, Result};
use crate::Core::sink::Sink;
use crate::SPSC::Buffer::RingBuffer;
use crate::SPSC::Structs::Buffer_Structs::{Record, RecordKind, RecordMeta};
use std::sync::Arc;
use tracing::{debug, error, info};

/// The reading endpoint of a ring.
///
/// There is at most one per ring (see [`RingBuffer::consumer`]). It has no
/// cancellation path of its own: it stops only when it drains the
/// end-of-stream sentinel, when the ring is closed, or when the sink fails.
pub struct Consumer {
    ring: Arc<RingBuffer>,
    cursor: usize,
    finished: bool,
}

/// Scoped access to one readable slot.
///
/// Dropping the reader hands the slot back to the producer and advances the
/// consumer, so a slot is released on every path, error paths included.
pub struct SlotReader<'a> {
    ring: &'a RingBuffer,
    index: usize,
    meta: RecordMeta,
    cursor: &'a mut usize,
}

/// Summary of one consumer loop run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ConsumerReport {
    pub records: u64,
    pub bytes: u64,
}

impl<'a> SlotReader<'a> {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn meta(&self) -> RecordMeta {
        self.meta
    }

    pub fn is_end_of_stream(&self) -> bool {
        self.meta.is_end_of_stream()
    }

    /// The record held by this slot, exactly `len` bytes for data records.
    pub fn record(&self) -> Record<'_> {
        match self.meta.kind {
            RecordKind::EndOfStream => Record::EndOfStream,
            RecordKind::Data => {
                // SAFETY: a SlotReader only exists after wait_readable
                // succeeded for this index and it mutably borrows the single
                // Consumer; the producer will not touch the span until Drop
                // marks the slot writable.
                let span = unsafe { self.ring.payload(self.index) };
                Record::Data(&span[..self.meta.len])
            }
        }
    }

    /// Hand the slot back to the producer now.
    pub fn release(self) {}
}

impl Drop for SlotReader<'_> {
    fn drop(&mut self) {
        self.ring.mark_writable(self.index);
        *self.cursor = self.ring.slot(self.index).next();
    }
}

impl Consumer {
    pub(crate) fn new(ring: Arc<RingBuffer>) -> Self {
        Self {
            ring,
            cursor: 0,
            finished: false,
        }
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

    /// Wait until the current slot is readable and borrow it.
    ///
    /// The wait is unbounded. Reading the sentinel marks the consumer
    /// finished; later calls fail with `StreamEnded`.
    pub fn acquire(&mut self) -> Result<SlotReader<'_>> {
        if self.finished {
            return Err(CaptureError::StreamEnded);
        }
        let meta = self.ring.wait_readable(self.cursor)?;
        if meta.is_end_of_stream() {
            self.finished = true;
        }
        Ok(SlotReader {
            ring: &*self.ring,
            index: self.cursor,
            meta,
            cursor: &mut self.cursor,
        })
    }

    /// Copy out the next record; `None` once the sentinel has been drained.
    pub fn recv(&mut self) -> Result<Option<Vec<u8>>> {
        let slot = self.acquire()?;
        let out = match slot.record() {
            Record::EndOfStream => None,
            Record::Data(bytes) => Some(bytes.to_vec()),
        };
        slot.release();
        Ok(out)
    }

    /// Forward every record to `sink` until the sentinel arrives.
    ///
    /// A sink error or a short write is fatal: the slot is released, the ring
    /// is closed so the producer cannot block forever, and the error is
    /// returned. Nothing is retried.
    pub fn run<K: Sink + ?Sized>(&mut self, sink: &mut K) -> Result<ConsumerReport> {
        let mut report = ConsumerReport::default();

        info!("consumer loop started");

        loop {
            let slot = match self.acquire() {
                Ok(slot) => slot,
                Err(e) => {
                    error!(error = %e, "consumer stopped before end of stream");
                    return Err(e);
                }
            };
            let index = slot.index();

            let outcome = match slot.record() {
                Record::EndOfStream => None,
                Record::Data(bytes) => Some((bytes.len(), sink.write_record(bytes))),
            };
            drop(slot);

            let (expected, written) = match outcome {
                None => break,
                Some((expected, Ok(written))) => (expected, written),
                Some((_, Err(e))) => {
                    error!(slot = index, error = %e, "unable to write record");
                    self.ring.close();
                    return Err(CaptureError::Sink(e));
                }
            };

            if written != expected {
                error!(slot = index, written, expected, "short write");
                self.ring.close();
                return Err(CaptureError::ShortWrite { written, expected });
            }

            report.records += 1;
            report.bytes += written as u64;
            debug!(slot = index, len = written, "wrote record");
        }

        sink.flush().map_err(|e| {
            error!(error = %e, "unable to flush sink");
            CaptureError::Sink(e)
        })?;

        info!(records = report.records, bytes = report.bytes, "consumer loop finished");
        Ok(report)
    }
}

impl std::fmt::Debug for Consumer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Consumer")
            .field("cursor", &self.cursor)
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}
