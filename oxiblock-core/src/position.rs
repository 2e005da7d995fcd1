//! Logical/physical position accounting.

/// Byte counters of a stream adapter.
///
/// `logical` counts uncompressed bytes offered by or delivered to the
/// caller. `physical` counts bytes moved through the underlying sink or
/// source. Both only ever grow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Positions {
    /// Uncompressed bytes offered or delivered.
    pub logical: u64,
    /// Bytes written to or read from the underlying stream.
    pub physical: u64,
}

impl Positions {
    /// Create a zeroed position pair.
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance the logical counter.
    #[inline]
    pub fn advance_logical(&mut self, count: usize) {
        self.logical += count as u64;
    }

    /// Advance the physical counter.
    #[inline]
    pub fn advance_physical(&mut self, count: usize) {
        self.physical += count as u64;
    }

    /// Physical bytes per logical byte, or `None` before any logical bytes.
    pub fn ratio(&self) -> Option<f64> {
        if self.logical == 0 {
            None
        } else {
            Some(self.physical as f64 / self.logical as f64)
        }
    }
}
