// Plain data carried alongside each slot; no atomics, no payload bytes.

/// What a published slot holds.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum RecordKind {
    /// `len` bytes of payload, possibly zero.
    #[default]
    Data,
    /// The producer has stopped; nothing follows in this ring.
    EndOfStream,
}

/// Header of the record currently held in a slot.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct RecordMeta {
    pub kind: RecordKind,
    pub len: usize,
}

impl RecordMeta {
    pub const fn data(len: usize) -> Self {
        Self {
            kind: RecordKind::Data,
            len,
        }
    }

    pub const fn end_of_stream() -> Self {
        Self {
            kind: RecordKind::EndOfStream,
            len: 0,
        }
    }

    pub fn is_end_of_stream(&self) -> bool {
        self.kind == RecordKind::EndOfStream
    }
}

/// Borrowed view of a published record, handed to the consumer.
#[derive(Debug, PartialEq, Eq)]
pub enum Record<'a> {
    Data(&'a [u8]),
    EndOfStream,
}

/// What the producer does with a read that reports more bytes than a slot holds.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum OversizePolicy {
    /// Drop the record, count it, keep the slot for the next read.
    #[default]
    Reject,
    /// Publish the first `slot_capacity` bytes and count the truncation.
    Truncate,
}
