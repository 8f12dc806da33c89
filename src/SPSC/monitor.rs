// src/SPSC/monitor.rs

use crate::Core::cancel::CancellationToken;
use crate::SPSC::Buffer::{RingBuffer, RingStats};
use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Status overlay that redraws a one-line occupancy gauge.
///
/// Reads only the ring counters, never a slot lock, so it cannot slow the
/// data path down or observe a slot mid-handshake.
pub struct Monitor {
    ring: Arc<RingBuffer>,
    interval: Duration,
}

impl Monitor {
    pub fn new(ring: Arc<RingBuffer>, interval: Duration) -> Self {
        Self { ring, interval }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// `buf [###.......] 3/10  received: 42  written: 39`
    pub fn render(stats: &RingStats) -> String {
        let filled = stats.slots_filled.min(stats.num_slots);
        let mut line = String::with_capacity(stats.num_slots + 64);
        line.push_str("buf [");
        line.extend(std::iter::repeat('#').take(filled));
        line.extend(std::iter::repeat('.').take(stats.num_slots - filled));
        line.push_str(&format!(
            "] {}/{}  received: {}  written: {}",
            stats.slots_filled, stats.num_slots, stats.total_produced, stats.total_consumed
        ));
        line
    }

    /// Redraw the gauge on `out` every interval until `cancel` fires.
    ///
    /// Returns the number of frames drawn.
    pub fn run<W: Write + ?Sized>(&self, out: &mut W, cancel: &CancellationToken) -> io::Result<u64> {
        let mut frames = 0u64;

        while !cancel.is_cancelled() {
            std::thread::sleep(self.interval);

            let stats = self.ring.stats();
            write!(out, "\r{}\x1b[K", Self::render(&stats))?;
            out.flush()?;
            frames += 1;
        }

        writeln!(out)?;
        out.flush()?;
        debug!(frames, "monitor loop finished");
        Ok(frames)
    }
}

impl std::fmt::Debug for Monitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Monitor")
            .field("interval", &self.interval)
            .finish_non_exhaustive()
    }
}
