//! Pass-through codec.

use oxiblock_core::error::Result;
use oxiblock_core::traits::{BlockCodec, DecompressStatus};

/// Copies blocks verbatim in both directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreCodec {
    block_size: usize,
}

impl StoreCodec {
    /// Default block size (64 KB).
    pub const DEFAULT_BLOCK_SIZE: usize = 64 * 1024;

    /// Create a store codec with the given block size.
    pub fn new(block_size: usize) -> Self {
        Self { block_size }
    }
}

impl Default for StoreCodec {
    fn default() -> Self {
        Self::new(Self::DEFAULT_BLOCK_SIZE)
    }
}

impl BlockCodec for StoreCodec {
    fn name(&self) -> &'static str {
        "store"
    }

    fn block_size(&self) -> usize {
        self.block_size
    }

    fn max_encoded_len(&self, input_len: usize) -> usize {
        input_len
    }

    fn encode_block(&mut self, src: &[u8], dst: &mut [u8]) -> Result<usize> {
        dst[..src.len()].copy_from_slice(src);
        Ok(src.len())
    }

    fn decode_block(
        &mut self,
        src: &[u8],
        dst: &mut [u8],
        input_finished: bool,
    ) -> Result<(usize, usize, DecompressStatus)> {
        let n = src.len().min(dst.len());
        dst[..n].copy_from_slice(&src[..n]);

        let status = if n < src.len() {
            DecompressStatus::NeedsOutput
        } else if input_finished {
            DecompressStatus::Done
        } else {
            DecompressStatus::NeedsInput
        };
        Ok((n, n, status))
    }
}
