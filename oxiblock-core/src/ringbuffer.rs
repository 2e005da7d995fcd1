//! Circular accumulation buffer for block-aligned codecs.
//!
//! Codecs consume fixed-size blocks, callers write whatever they have. The
//! [`AccumulationBuffer`] sits in between: it absorbs writes of any length,
//! wraps at its physical end without reallocating, and hands out logically
//! contiguous runs of unconsumed bytes.
//!
//! A run that straddles the physical end is linearized by copying both
//! segments into a caller-provided scratch block, so a codec always sees a
//! plain slice.
//!
//! # Sizes
//!
//! The buffer is sized to one block plus one machine word
//! ([`ALIGNMENT_MARGIN`]), which keeps a full block representable at every
//! write cursor position.

/// Extra bytes reserved past one block.
pub const ALIGNMENT_MARGIN: usize = std::mem::size_of::<usize>();

/// A fixed-capacity ring buffer that accumulates bytes until a codec
/// consumes them.
#[derive(Debug, Clone)]
pub struct AccumulationBuffer {
    /// The underlying storage.
    buffer: Vec<u8>,
    /// Next byte will be written here.
    write_pos: usize,
    /// Bytes written but not yet consumed.
    unconsumed: usize,
    /// Total bytes ever appended.
    accepted: u64,
    /// Total bytes ever consumed.
    processed: u64,
}

impl AccumulationBuffer {
    /// Create a buffer with the exact `capacity`.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "Capacity must be greater than 0");

        Self {
            buffer: vec![0; capacity],
            write_pos: 0,
            unconsumed: 0,
            accepted: 0,
            processed: 0,
        }
    }

    /// Create a buffer able to hold one `block_size` block plus the
    /// alignment margin.
    pub fn for_block_size(block_size: usize) -> Self {
        Self::new(block_size + ALIGNMENT_MARGIN)
    }

    /// Get the capacity of the buffer.
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Number of unconsumed bytes.
    pub fn len(&self) -> usize {
        self.unconsumed
    }

    /// Check if no unconsumed bytes remain.
    pub fn is_empty(&self) -> bool {
        self.unconsumed == 0
    }

    /// Check if no more bytes can be appended.
    pub fn is_full(&self) -> bool {
        self.unconsumed == self.capacity()
    }

    /// Free space left for appends.
    pub fn free(&self) -> usize {
        self.capacity() - self.unconsumed
    }

    /// Total bytes appended over the buffer's lifetime.
    pub fn accepted(&self) -> u64 {
        self.accepted
    }

    /// Total bytes consumed over the buffer's lifetime.
    pub fn processed(&self) -> u64 {
        self.processed
    }

    /// Physical index of the oldest unconsumed byte.
    fn read_pos(&self) -> usize {
        (self.write_pos + self.capacity() - self.unconsumed) % self.capacity()
    }

    /// Append as much of `src` as fits, wrapping at the physical end.
    ///
    /// Returns the number of bytes taken; 0 means the buffer is full and a
    /// block has to be consumed first.
    pub fn append(&mut self, src: &[u8]) -> usize {
        let count = src.len().min(self.free());
        if count == 0 {
            return 0;
        }

        let capacity = self.capacity();
        let first = count.min(capacity - self.write_pos);
        self.buffer[self.write_pos..self.write_pos + first].copy_from_slice(&src[..first]);
        let second = count - first;
        if second > 0 {
            self.buffer[..second].copy_from_slice(&src[first..count]);
        }

        self.write_pos = (self.write_pos + count) % capacity;
        self.unconsumed += count;
        self.accepted += count as u64;
        count
    }

    /// View the oldest `len` unconsumed bytes as one slice.
    ///
    /// When the run wraps, both segments are copied into `scratch` and the
    /// returned slice borrows from it; otherwise the buffer is borrowed
    /// directly. Nothing is consumed.
    ///
    /// # Panics
    ///
    /// Panics if `len` exceeds the unconsumed count, or if the run wraps and
    /// `scratch` is shorter than `len`.
    pub fn peek_contiguous<'a>(&'a self, len: usize, scratch: &'a mut [u8]) -> &'a [u8] {
        assert!(
            len <= self.unconsumed,
            "Cannot peek {} bytes, only {} buffered",
            len,
            self.unconsumed
        );

        let start = self.read_pos();
        let tail = self.capacity() - start;
        if len <= tail {
            return &self.buffer[start..start + len];
        }

        scratch[..tail].copy_from_slice(&self.buffer[start..]);
        scratch[tail..len].copy_from_slice(&self.buffer[..len - tail]);
        &scratch[..len]
    }

    /// Mark the oldest `count` bytes as consumed.
    ///
    /// # Panics
    ///
    /// Panics if `count` exceeds the unconsumed count.
    pub fn consume(&mut self, count: usize) {
        assert!(
            count <= self.unconsumed,
            "Cannot consume {} bytes, only {} buffered",
            count,
            self.unconsumed
        );
        self.unconsumed -= count;
        self.processed += count as u64;
    }

    /// Contiguous free region starting at the write cursor.
    ///
    /// Used to read directly from a source into the ring; follow with
    /// [`commit_write`](Self::commit_write).
    pub fn writable_slice(&mut self) -> &mut [u8] {
        let free = self.free();
        let until_end = self.capacity() - self.write_pos;
        let len = free.min(until_end);
        &mut self.buffer[self.write_pos..self.write_pos + len]
    }

    /// Account for `count` bytes written through [`writable_slice`](Self::writable_slice).
    ///
    /// # Panics
    ///
    /// Panics if `count` exceeds the free space.
    pub fn commit_write(&mut self, count: usize) {
        assert!(count <= self.free(), "Commit exceeds free space");
        self.write_pos = (self.write_pos + count) % self.capacity();
        self.unconsumed += count;
        self.accepted += count as u64;
    }

    /// Drop all unconsumed bytes without counting them as processed.
    pub fn discard(&mut self) {
        self.write_pos = 0;
        self.unconsumed = 0;
    }
}
