use crate::Core::error::{CaptureError, Result};
use std::alloc::{alloc_zeroed, dealloc, Layout};
use std::ptr::NonNull;
mod debug;
mod getters;

/// Alignment of the backing arena. Matches the 128-byte stride used for the
/// counter padding so the first span never shares a line with anything else.
pub const ARENA_ALIGN: usize = 128;

/// One contiguous, zero-initialised heap allocation carved into equal spans.
///
/// The arena owns the bytes but hands out no safe access of its own: which
/// thread may touch a span at a given instant is decided by the slot
/// handshake in the ring buffer, so span accessors are `unsafe`.
pub struct SlotArena {
    base: NonNull<u8>,
    layout: Layout,
    span_len: usize,
    spans: usize,
}

impl SlotArena {
    /// Allocate `spans * span_len` zeroed bytes.
    pub fn new(spans: usize, span_len: usize) -> Result<Self> {
        if spans == 0 || span_len == 0 {
            return Err(CaptureError::InvalidGeometry(format!(
                "SlotArena::new(): spans ({spans}) and span length ({span_len}) must be non-zero"
            )));
        }

        let bytes = spans.checked_mul(span_len).ok_or_else(|| {
            CaptureError::InvalidGeometry(format!(
                "SlotArena::new(): {spans} spans of {span_len} bytes overflows usize"
            ))
        })?;

        let layout = Layout::from_size_align(bytes, ARENA_ALIGN)
            .map_err(|e| CaptureError::InvalidGeometry(format!("SlotArena::new(): {e}")))?;

        // SAFETY: layout has a non-zero size.
        let raw = unsafe { alloc_zeroed(layout) };
        let base = NonNull::new(raw).ok_or(CaptureError::ArenaAllocation { bytes })?;

        Ok(Self {
            base,
            layout,
            span_len,
            spans,
        })
    }

    #[inline]
    fn span_ptr(&self, index: usize) -> *mut u8 {
        assert!(index < self.spans, "span index {index} out of range");
        // SAFETY: index < spans, so the offset stays inside the allocation.
        unsafe { self.base.as_ptr().add(index * self.span_len) }
    }

    /// Shared view of span `index`.
    ///
    /// # Safety
    /// No mutable view of the same span may be alive for the returned lifetime.
    #[inline]
    pub unsafe fn span(&self, index: usize) -> &[u8] {
        std::slice::from_raw_parts(self.span_ptr(index), self.span_len)
    }

    /// Exclusive view of span `index`.
    ///
    /// # Safety
    /// The caller must hold the only reference to this span for the returned lifetime.
    #[inline]
    #[allow(clippy::mut_from_ref)]
    pub unsafe fn span_mut(&self, index: usize) -> &mut [u8] {
        std::slice::from_raw_parts_mut(self.span_ptr(index), self.span_len)
    }
}

impl Drop for SlotArena {
    fn drop(&mut self) {
        // SAFETY: base was returned by alloc_zeroed with this exact layout.
        unsafe { dealloc(self.base.as_ptr(), self.layout) }
    }
}

// SAFETY: the arena is a plain byte allocation. Every access goes through the
// unsafe span accessors whose callers uphold exclusivity.
unsafe impl Send for SlotArena {}
unsafe impl Sync for SlotArena {}
