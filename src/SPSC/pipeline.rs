// src/SPSC/pipeline.rs

use crate::Core::cancel::CancellationToken;
use crate::Core::error::{CaptureError, Result};
use crate::Core::sink::Sink;
use crate::Core::source::Source;
use crate::SPSC::consumer::ConsumerReport;
use crate::SPSC::monitor::Monitor;
use crate::SPSC::producer::ProducerReport;
use crate::SPSC::Buffer::{RingBuffer, RingStats};
use crate::SPSC::Structs::Buffer_Structs::OversizePolicy;
use std::io::Write;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

/// One ring plus the settings for the three threads that share it.
///
/// Built by [`super::PipelineBuilder`]. Running it claims both endpoints, so
/// a pipeline runs once.
pub struct Pipeline {
    ring: Arc<RingBuffer>,
    poll_timeout: Duration,
    monitor_interval: Duration,
    oversize: OversizePolicy,
}

/// Outcome of a completed run.
#[derive(Debug)]
pub struct PipelineReport {
    pub producer: ProducerReport,
    pub consumer: ConsumerReport,
    /// Counters after every worker has joined.
    pub stats: RingStats,
}

/// Closes the ring if the owning worker unwinds, so its peer is woken
/// instead of waiting on a slot that will never flip.
struct CloseOnPanic<'a>(&'a RingBuffer);

impl Drop for CloseOnPanic<'_> {
    fn drop(&mut self) {
        if thread::panicking() {
            self.0.close();
        }
    }
}

impl Pipeline {
    pub(crate) fn new(
        ring: Arc<RingBuffer>,
        poll_timeout: Duration,
        monitor_interval: Duration,
        oversize: OversizePolicy,
    ) -> Self {
        Self {
            ring,
            poll_timeout,
            monitor_interval,
            oversize,
        }
    }

    pub fn ring(&self) -> &Arc<RingBuffer> {
        &self.ring
    }

    /// Run producer and consumer to completion without a status overlay.
    pub fn run<S, K>(self, source: S, sink: K, cancel: &CancellationToken) -> Result<PipelineReport>
    where
        S: Source + Send,
        K: Sink + Send,
    {
        self.run_inner::<S, K, std::io::Sink>(source, sink, None, cancel)
    }

    /// Run producer, consumer and a monitor drawing on `status`.
    ///
    /// The monitor stops when `cancel` fires or once the data path has
    /// finished, whichever comes first.
    pub fn run_with_monitor<S, K, W>(
        self,
        source: S,
        sink: K,
        status: W,
        cancel: &CancellationToken,
    ) -> Result<PipelineReport>
    where
        S: Source + Send,
        K: Sink + Send,
        W: Write + Send,
    {
        self.run_inner(source, sink, Some(status), cancel)
    }

    fn run_inner<S, K, W>(
        self,
        mut source: S,
        mut sink: K,
        status: Option<W>,
        cancel: &CancellationToken,
    ) -> Result<PipelineReport>
    where
        S: Source + Send,
        K: Sink + Send,
        W: Write + Send,
    {
        let ring: &RingBuffer = &self.ring;
        let mut producer = self.ring.producer()?.with_oversize_policy(self.oversize);
        let mut consumer = self.ring.consumer()?;
        let monitor = Monitor::new(Arc::clone(&self.ring), self.monitor_interval);
        let monitor_stop = cancel.child();
        let poll_timeout = self.poll_timeout;

        info!(
            slots = ring.num_slots(),
            slot_capacity = ring.slot_capacity(),
            "starting capture pipeline"
        );

        let (produced, consumed, monitored) = thread::scope(|s| -> Result<_> {
            let producer_handle = thread::Builder::new()
                .name("producer".into())
                .spawn_scoped(s, || {
                    let _guard = CloseOnPanic(ring);
                    producer.run(&mut source, cancel, poll_timeout)
                })?;

            let consumer_handle = match thread::Builder::new()
                .name("consumer".into())
                .spawn_scoped(s, || {
                    let _guard = CloseOnPanic(ring);
                    consumer.run(&mut sink)
                }) {
                Ok(handle) => handle,
                Err(e) => {
                    // The producer sees the closed ring and exits on its own.
                    ring.close();
                    return Err(e.into());
                }
            };

            let monitor_handle = match status {
                Some(mut out) => {
                    let stop = &monitor_stop;
                    let monitor = &monitor;
                    match thread::Builder::new()
                        .name("monitor".into())
                        .spawn_scoped(s, move || monitor.run(&mut out, stop))
                    {
                        Ok(handle) => Some(handle),
                        Err(e) => {
                            warn!(error = %e, "status monitor unavailable");
                            None
                        }
                    }
                }
                None => None,
            };

            let consumed = consumer_handle
                .join()
                .map_err(|_| CaptureError::ThreadPanicked("consumer"));
            let produced = producer_handle
                .join()
                .map_err(|_| CaptureError::ThreadPanicked("producer"));

            monitor_stop.cancel();
            let monitored = monitor_handle.map(|handle| handle.join());

            Ok((produced, consumed, monitored))
        })?;

        match monitored {
            Some(Ok(Ok(frames))) => debug!(frames, "monitor joined"),
            Some(Ok(Err(e))) => warn!(error = %e, "status stream failed"),
            Some(Err(_)) => warn!("monitor thread panicked"),
            None => {}
        }

        let producer = produced?;
        info!(
            records = producer.records,
            bytes = producer.bytes,
            oversized = producer.oversized_dropped,
            truncated = producer.truncated,
            stop = ?producer.stop,
            "producer joined"
        );

        let consumer = consumed??;
        let stats = ring.stats();
        info!(
            records = consumer.records,
            bytes = consumer.bytes,
            produced = stats.total_produced,
            consumed = stats.total_consumed,
            "capture pipeline finished"
        );

        Ok(PipelineReport {
            producer,
            consumer,
            stats,
        })
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("ring", &self.ring)
            .field("poll_timeout", &self.poll_timeout)
            .field("monitor_interval", &self.monitor_interval)
            .field("oversize", &self.oversize)
            .finish()
    }
}
