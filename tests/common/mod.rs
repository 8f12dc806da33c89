// Shared fixtures for the integration tests.
#![allow(dead_code)]

use parking_lot::{Condvar, Mutex};
use ringcap::{CancellationToken, Readiness, Sink, Source};
use std::collections::VecDeque;
use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;

/// What a scripted source does once its records run out.
#[derive(Clone, Copy, Debug)]
pub enum WhenDrained {
    /// Report timeouts until cancelled.
    Idle,
    /// Fail the next readiness wait.
    Fail,
}

/// Source that replays a fixed list of reads, errors included.
pub struct ScriptedSource {
    reads: VecDeque<io::Result<Vec<u8>>>,
    interrupted_waits: usize,
    delivered: usize,
    cancel_after: Option<(usize, CancellationToken)>,
    when_drained: WhenDrained,
    pub shutdown_called: bool,
}

impl ScriptedSource {
    pub fn new(records: Vec<Vec<u8>>, when_drained: WhenDrained) -> Self {
        Self::from_reads(records.into_iter().map(Ok).collect(), when_drained)
    }

    /// Each entry is what one `read_into` call returns, in order.
    pub fn from_reads(reads: Vec<io::Result<Vec<u8>>>, when_drained: WhenDrained) -> Self {
        Self {
            reads: reads.into(),
            interrupted_waits: 0,
            delivered: 0,
            cancel_after: None,
            when_drained,
            shutdown_called: false,
        }
    }

    /// Cancel `token` right after the `count`-th record has been read.
    pub fn cancel_after(mut self, count: usize, token: &CancellationToken) -> Self {
        self.cancel_after = Some((count, token.clone()));
        self
    }

    /// Fail the first `count` readiness waits with `Interrupted`.
    pub fn interrupt_waits(mut self, count: usize) -> Self {
        self.interrupted_waits = count;
        self
    }

    pub fn remaining(&self) -> usize {
        self.reads.len()
    }

    pub fn delivered(&self) -> usize {
        self.delivered
    }
}

impl Source for ScriptedSource {
    fn wait_ready(&mut self, timeout: Duration) -> io::Result<Readiness> {
        if self.interrupted_waits > 0 {
            self.interrupted_waits -= 1;
            return Err(io::ErrorKind::Interrupted.into());
        }
        if !self.reads.is_empty() {
            return Ok(Readiness::Ready);
        }
        match self.when_drained {
            WhenDrained::Idle => {
                std::thread::sleep(timeout.min(Duration::from_millis(2)));
                Ok(Readiness::TimedOut)
            }
            WhenDrained::Fail => Err(io::Error::new(io::ErrorKind::ConnectionAborted, "source drained")),
        }
    }

    fn read_into(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let record = match self.reads.pop_front() {
            Some(read) => read?,
            None => return Err(io::ErrorKind::WouldBlock.into()),
        };
        let n = record.len().min(buf.len());
        buf[..n].copy_from_slice(&record[..n]);
        self.delivered += 1;
        if let Some((count, token)) = &self.cancel_after {
            if self.delivered == *count {
                token.cancel();
            }
        }
        Ok(record.len())
    }

    fn shutdown(&mut self) {
        self.shutdown_called = true;
    }
}

/// Sink that keeps every record separately and can be held shut.
#[derive(Clone, Default)]
pub struct RecordingSink {
    pub records: Arc<Mutex<Vec<Vec<u8>>>>,
    gate: Arc<(Mutex<bool>, Condvar)>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink whose writes block until `open` is called.
    pub fn gated() -> Self {
        let sink = Self::default();
        *sink.gate.0.lock() = true;
        sink
    }

    pub fn open(&self) {
        let (closed, cond) = &*self.gate;
        *closed.lock() = false;
        cond.notify_all();
    }

    pub fn snapshot(&self) -> Vec<Vec<u8>> {
        self.records.lock().clone()
    }
}

impl Sink for RecordingSink {
    fn write_record(&mut self, bytes: &[u8]) -> io::Result<usize> {
        let (closed, cond) = &*self.gate;
        let mut closed = closed.lock();
        while *closed {
            cond.wait(&mut closed);
        }
        self.records.lock().push(bytes.to_vec());
        Ok(bytes.len())
    }
}

/// Sink that accepts `ok_records` records, then misbehaves.
pub struct FaultySink {
    pub ok_records: usize,
    pub short: bool,
    pub written: Vec<Vec<u8>>,
}

impl Sink for FaultySink {
    fn write_record(&mut self, bytes: &[u8]) -> io::Result<usize> {
        if self.written.len() < self.ok_records {
            self.written.push(bytes.to_vec());
            return Ok(bytes.len());
        }
        if self.short {
            Ok(bytes.len() / 2)
        } else {
            Err(io::Error::new(io::ErrorKind::Other, "disk full"))
        }
    }
}

/// Thread-safe Write target for the monitor.
#[derive(Clone, Default)]
pub struct SharedBuf(pub Arc<Mutex<Vec<u8>>>);

impl SharedBuf {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }
}

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Record `i` of a run: `len` bytes tagged with its sequence number.
pub fn numbered_record(seq: u32, len: usize) -> Vec<u8> {
    let mut record = vec![(seq % 251) as u8; len];
    let tag = seq.to_be_bytes();
    let n = len.min(4);
    record[..n].copy_from_slice(&tag[..n]);
    record
}
