//! Error type shared by the ring buffer, the worker loops and the binaries.
//!
//! Construction failures surface before any worker thread starts. Readiness
//! timeouts never become errors; they are retried by the producer. Sink
//! failures are fatal and carry enough context to explain the abort.

use std::io;
use thiserror::Error;

/// Convenience alias for results using the crate error type.
pub type Result<T> = std::result::Result<T, CaptureError>;

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("invalid ring geometry: {0}")]
    InvalidGeometry(String),

    #[error("failed to allocate {bytes} byte slot arena")]
    ArenaAllocation { bytes: usize },

    #[error("failed to allocate slot table for {slots} slots")]
    SlotAllocation { slots: usize },

    #[error("{0} endpoint already claimed for this ring")]
    EndpointClaimed(&'static str),

    #[error("record of {len} bytes exceeds slot capacity of {capacity} bytes")]
    RecordTooLarge { len: usize, capacity: usize },

    #[error("ring buffer closed")]
    Closed,

    #[error("end of stream already reached")]
    StreamEnded,

    #[error("source error: {0}")]
    Source(#[source] io::Error),

    #[error("sink error: {0}")]
    Sink(#[source] io::Error),

    #[error("short write: {written} of {expected} bytes")]
    ShortWrite { written: usize, expected: usize },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("failed to install interrupt handler: {0}")]
    Interrupt(#[from] ctrlc::Error),

    #[error("{0} thread panicked")]
    ThreadPanicked(&'static str),

    #[error("failed to initialize logging: {0}")]
    Logging(String),
}

impl CaptureError {
    /// True for failures that must stop the whole capture rather than a single stage.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            CaptureError::Sink(_) | CaptureError::ShortWrite { .. } | CaptureError::ThreadPanicked(_)
        )
    }
}
