//! Core traits for block codecs.
//!
//! A [`BlockCodec`] is the boundary to the actual compression, decompression
//! or hashing engine. The engine itself is opaque: the stream adapter only
//! relies on the block size it declares, the output bound it promises, and
//! the calling convention below.

use crate::error::{OxiBlockError, Result};

/// Status of a block decode call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecompressStatus {
    /// More input is needed before another block can be decoded.
    NeedsInput,
    /// The output buffer is too small for the next block.
    NeedsOutput,
    /// The codec saw the end of the stream.
    Done,
    /// A block boundary was reached; more blocks may follow.
    BlockEnd,
}

/// How far a flush pushes buffered data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlushMode {
    /// Emit buffered bytes as a short, non-terminal block.
    #[default]
    Sync,
    /// Emit buffered bytes as the terminal block and close the stream.
    Finish,
}

impl FlushMode {
    /// Build a flush mode from the `final` flag of a flush request.
    pub fn from_final(is_final: bool) -> Self {
        if is_final {
            FlushMode::Finish
        } else {
            FlushMode::Sync
        }
    }

    /// Whether this flush terminates the stream.
    pub fn is_final(self) -> bool {
        self == FlushMode::Finish
    }
}

/// A block-oriented codec.
///
/// Encoding is driven one block at a time: `encode_block` receives exactly
/// `block_size()` bytes except for short blocks forced by a sync flush.
/// `encode_final` receives the trailing partial block (possibly empty) and
/// is called at most once per stream; codecs that write an end marker or a
/// digest do it there.
///
/// `max_encoded_len(n)` must bound the output of both `encode_block` and
/// `encode_final` for `n` input bytes.
pub trait BlockCodec: Send {
    /// Short codec name used in errors and logs.
    fn name(&self) -> &'static str;

    /// Number of uncompressed bytes per block.
    fn block_size(&self) -> usize;

    /// Smallest block size the codec can operate with.
    fn min_block_size(&self) -> usize {
        1
    }

    /// Upper bound on encoded output for `input_len` input bytes.
    fn max_encoded_len(&self, input_len: usize) -> usize;

    /// Encode one block, returning the number of bytes written to `dst`.
    fn encode_block(&mut self, src: &[u8], dst: &mut [u8]) -> Result<usize>;

    /// Encode the terminal block.
    ///
    /// The default treats the tail as an ordinary block and writes nothing
    /// for an empty tail.
    fn encode_final(&mut self, src: &[u8], dst: &mut [u8]) -> Result<usize> {
        if src.is_empty() {
            Ok(0)
        } else {
            self.encode_block(src, dst)
        }
    }

    /// Decode from `src` into `dst`.
    ///
    /// Returns `(consumed, produced, status)`. A codec that cannot decode a
    /// complete block from `src` returns `NeedsInput` without consuming.
    /// `input_finished` is set once the source is exhausted, so codecs
    /// without an end marker can report `Done`.
    fn decode_block(
        &mut self,
        src: &[u8],
        dst: &mut [u8],
        input_finished: bool,
    ) -> Result<(usize, usize, DecompressStatus)> {
        let _ = (src, dst, input_finished);
        Err(OxiBlockError::unsupported(self.name(), "decoding"))
    }

    /// Side-channel bytes a decoder needs to be reconstructed.
    fn properties(&self) -> Vec<u8> {
        Vec::new()
    }

    /// Whether blocks can be encoded independently of each other.
    fn independent_blocks(&self) -> bool {
        true
    }

    /// Release engine resources. Called once when the owning stream closes.
    fn release(&mut self) {}
}

impl<C: BlockCodec + ?Sized> BlockCodec for Box<C> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn block_size(&self) -> usize {
        (**self).block_size()
    }

    fn min_block_size(&self) -> usize {
        (**self).min_block_size()
    }

    fn max_encoded_len(&self, input_len: usize) -> usize {
        (**self).max_encoded_len(input_len)
    }

    fn encode_block(&mut self, src: &[u8], dst: &mut [u8]) -> Result<usize> {
        (**self).encode_block(src, dst)
    }

    fn encode_final(&mut self, src: &[u8], dst: &mut [u8]) -> Result<usize> {
        (**self).encode_final(src, dst)
    }

    fn decode_block(
        &mut self,
        src: &[u8],
        dst: &mut [u8],
        input_finished: bool,
    ) -> Result<(usize, usize, DecompressStatus)> {
        (**self).decode_block(src, dst, input_finished)
    }

    fn properties(&self) -> Vec<u8> {
        (**self).properties()
    }

    fn independent_blocks(&self) -> bool {
        (**self).independent_blocks()
    }

    fn release(&mut self) {
        (**self).release()
    }
}

/// Check that a codec's block size satisfies its own minimum.
pub fn validate_block_size<C: BlockCodec + ?Sized>(codec: &C) -> Result<usize> {
    let block_size = codec.block_size();
    let minimum = codec.min_block_size().max(1);
    if block_size < minimum {
        return Err(OxiBlockError::capacity(block_size, minimum));
    }
    Ok(block_size)
}
