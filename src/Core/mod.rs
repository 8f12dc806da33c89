pub mod alloc;
pub mod cancel;
pub mod error;
pub mod logging;
pub mod sink;
pub mod source;

pub use alloc::SlotArena;
pub use cancel::CancellationToken;
pub use error::{CaptureError, Result};
