//! Exact-write sinks for the consumer loop.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
#[cfg(unix)]
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

use tracing::info;

/// Default capture file written by the receiver binary.
pub const DEFAULT_CAPTURE_FILE: &str = "raw_capture.dat";

/// Destination of drained records.
///
/// `write_record` makes a single attempt and reports how many bytes were
/// accepted. The consumer treats anything short of `bytes.len()` as fatal,
/// so implementations must not loop internally to hide partial writes.
pub trait Sink {
    fn write_record(&mut self, bytes: &[u8]) -> io::Result<usize>;

    /// Called once after the sentinel has been drained.
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<K: Sink + ?Sized> Sink for &mut K {
    fn write_record(&mut self, bytes: &[u8]) -> io::Result<usize> {
        (**self).write_record(bytes)
    }

    fn flush(&mut self) -> io::Result<()> {
        (**self).flush()
    }
}

impl<K: Sink + ?Sized> Sink for Box<K> {
    fn write_record(&mut self, bytes: &[u8]) -> io::Result<usize> {
        (**self).write_record(bytes)
    }

    fn flush(&mut self) -> io::Result<()> {
        (**self).flush()
    }
}

/// In-memory sink; records are concatenated.
impl Sink for Vec<u8> {
    fn write_record(&mut self, bytes: &[u8]) -> io::Result<usize> {
        self.extend_from_slice(bytes);
        Ok(bytes.len())
    }
}

/// Append-only capture file. One `write` call per record.
pub struct FileSink {
    file: File,
    path: PathBuf,
}

impl FileSink {
    /// Create (or truncate) `path`, readable and writable by the owner only.
    pub fn create(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        options.mode(0o600);

        let file = options.open(&path).map_err(|e| {
            io::Error::new(
                e.kind(),
                format!("Unable to open capture file {}: {}", path.display(), e),
            )
        })?;

        info!(path = %path.display(), "capture file opened");
        Ok(Self { file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Sink for FileSink {
    fn write_record(&mut self, bytes: &[u8]) -> io::Result<usize> {
        self.file.write(bytes)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()?;
        self.file.sync_data()
    }
}

impl std::fmt::Debug for FileSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileSink").field("path", &self.path).finish()
    }
}
