//! ringcap: a slot-synchronized single-producer/single-consumer ring buffer
//! that hands captured records from an ingest loop to a persistence loop.

// Module naming follows project convention (SPSC = Single-Producer Single-Consumer)
#[allow(non_snake_case)]
pub mod SPSC;

#[allow(non_snake_case)]
pub mod Core;

#[allow(non_snake_case)]
mod Debug {
    pub mod StructDebug;
}

pub use Core::cancel::CancellationToken;
pub use Core::error::{CaptureError, Result};
pub use Core::sink::{FileSink, Sink};
pub use Core::source::{Readiness, Source, UdpSource};
pub use SPSC::Buffer::RingBuffer;
pub use SPSC::{Consumer, Monitor, Pipeline, PipelineBuilder, Producer};
