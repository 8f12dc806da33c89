use super::*;

/// Getter methods for SlotArena
///
/// Used for debugging and by the ring buffer when sizing slots.
impl SlotArena {
    /// Get the raw pointer to the first byte of the arena
    ///
    /// Only meant for diagnostics; never dereference it outside the slot handshake.
    pub fn as_ptr(&self) -> *const u8 {
        self.base.as_ptr()
    }

    /// Length of a single span in bytes
    pub fn span_len(&self) -> usize {
        self.span_len
    }

    /// Number of spans carved out of the arena
    pub fn spans(&self) -> usize {
        self.spans
    }

    /// Total size of the arena in bytes
    pub fn len(&self) -> usize {
        self.layout.size()
    }

    /// Always false: construction rejects empty geometries
    pub fn is_empty(&self) -> bool {
        self.layout.size() == 0
    }
}
