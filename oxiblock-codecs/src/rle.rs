//! Run-length block codec.
//!
//! ## Block format
//!
//! ```text
//! ┌───────────────────┬──────────┬──────────┬─────┐
//! │ payload_len u32LE │ run, val │ run, val │ ... │
//! └───────────────────┴──────────┴──────────┴─────┘
//! ```
//!
//! Each pair expands to `run` (1..=255) copies of `val`. A block with
//! `payload_len == 0` is the end mark, written after the terminal block
//! when the codec is configured with [`RleCodec::with_end_mark`].
//!
//! ## Properties
//!
//! Five bytes: the block size as u32 LE followed by the end-mark flag.

use oxiblock_core::error::{OxiBlockError, Result};
use oxiblock_core::traits::{BlockCodec, DecompressStatus};
use tracing::trace;

/// Length of the per-block header.
pub const HEADER_LEN: usize = 4;

/// Longest run a single pair encodes.
pub const MAX_RUN: usize = 255;

/// Length of [`RleCodec::properties`].
pub const PROPERTIES_LEN: usize = 5;

/// Run-length codec with independent blocks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RleCodec {
    block_size: usize,
    end_mark: bool,
    /// Compressed bytes consumed by the decode path, for error offsets.
    decode_offset: u64,
}

impl RleCodec {
    /// Default block size (64 KB).
    pub const DEFAULT_BLOCK_SIZE: usize = 64 * 1024;

    /// Largest block whose worst-case payload length fits the header.
    pub const MAX_BLOCK_SIZE: usize = (u32::MAX / 2) as usize;

    /// Create an RLE codec without an end mark.
    ///
    /// Block sizes above [`MAX_BLOCK_SIZE`](Self::MAX_BLOCK_SIZE) are capped
    /// to it; use [`try_new`](Self::try_new) to reject them instead.
    pub fn new(block_size: usize) -> Self {
        Self {
            block_size: block_size.min(Self::MAX_BLOCK_SIZE),
            end_mark: false,
            decode_offset: 0,
        }
    }

    /// Create an RLE codec, failing if `block_size` does not fit the
    /// block header.
    pub fn try_new(block_size: usize) -> Result<Self> {
        if block_size > Self::MAX_BLOCK_SIZE {
            return Err(OxiBlockError::config(format!(
                "RLE block size {} exceeds the maximum of {}",
                block_size,
                Self::MAX_BLOCK_SIZE
            )));
        }
        Ok(Self::new(block_size))
    }

    /// Write (and on decode, require) an end mark after the terminal block.
    pub fn with_end_mark(mut self, end_mark: bool) -> Self {
        self.end_mark = end_mark;
        self
    }

    /// Whether the codec writes an end mark.
    pub fn end_mark(&self) -> bool {
        self.end_mark
    }

    /// Rebuild a codec from [`properties`](BlockCodec::properties) bytes.
    pub fn from_properties(props: &[u8]) -> Result<Self> {
        if props.len() != PROPERTIES_LEN {
            return Err(OxiBlockError::config(format!(
                "RLE properties must be {} bytes, got {}",
                PROPERTIES_LEN,
                props.len()
            )));
        }
        let block_size = u32::from_le_bytes([props[0], props[1], props[2], props[3]]) as usize;
        let end_mark = match props[4] {
            0 => false,
            1 => true,
            other => {
                return Err(OxiBlockError::config(format!(
                    "invalid RLE end-mark flag {}",
                    other
                )));
            }
        };
        Ok(Self::try_new(block_size)?.with_end_mark(end_mark))
    }

    fn corrupted(&self, at: usize, message: &str) -> OxiBlockError {
        OxiBlockError::corrupted(self.decode_offset + at as u64, message)
    }
}

impl Default for RleCodec {
    fn default() -> Self {
        Self::new(Self::DEFAULT_BLOCK_SIZE)
    }
}

/// Write the run pairs of `src` into `dst`, returning the payload length.
fn encode_runs(src: &[u8], dst: &mut [u8]) -> usize {
    let mut written = 0;
    let mut i = 0;
    while i < src.len() {
        let byte = src[i];
        let mut run = 1;
        while run < MAX_RUN && i + run < src.len() && src[i + run] == byte {
            run += 1;
        }
        dst[written] = run as u8;
        dst[written + 1] = byte;
        written += 2;
        i += run;
    }
    written
}

impl BlockCodec for RleCodec {
    fn name(&self) -> &'static str {
        "rle"
    }

    fn block_size(&self) -> usize {
        self.block_size
    }

    fn max_encoded_len(&self, input_len: usize) -> usize {
        let end = if self.end_mark { HEADER_LEN } else { 0 };
        HEADER_LEN + 2 * input_len + end
    }

    fn encode_block(&mut self, src: &[u8], dst: &mut [u8]) -> Result<usize> {
        if src.len() > Self::MAX_BLOCK_SIZE {
            return Err(OxiBlockError::codec(
                "rle",
                format!("block of {} bytes exceeds the header range", src.len()),
            ));
        }
        let payload = encode_runs(src, &mut dst[HEADER_LEN..]);
        dst[..HEADER_LEN].copy_from_slice(&(payload as u32).to_le_bytes());
        Ok(HEADER_LEN + payload)
    }

    fn encode_final(&mut self, src: &[u8], dst: &mut [u8]) -> Result<usize> {
        let mut written = 0;
        if !src.is_empty() {
            written = self.encode_block(src, dst)?;
        }
        if self.end_mark {
            dst[written..written + HEADER_LEN].fill(0);
            written += HEADER_LEN;
        }
        trace!(tail = src.len(), written, "rle terminal block");
        Ok(written)
    }

    fn decode_block(
        &mut self,
        src: &[u8],
        dst: &mut [u8],
        input_finished: bool,
    ) -> Result<(usize, usize, DecompressStatus)> {
        if src.len() < HEADER_LEN {
            if !input_finished {
                return Ok((0, 0, DecompressStatus::NeedsInput));
            }
            if src.is_empty() && !self.end_mark {
                return Ok((0, 0, DecompressStatus::Done));
            }
            let message = if src.is_empty() {
                "missing end mark"
            } else {
                "truncated block header"
            };
            return Err(self.corrupted(0, message));
        }

        let payload_len = u32::from_le_bytes([src[0], src[1], src[2], src[3]]) as usize;
        if payload_len == 0 {
            self.decode_offset += HEADER_LEN as u64;
            return Ok((HEADER_LEN, 0, DecompressStatus::Done));
        }
        if payload_len % 2 != 0 {
            return Err(self.corrupted(0, "odd payload length"));
        }

        let frame_len = HEADER_LEN + payload_len;
        if src.len() < frame_len {
            if input_finished {
                return Err(self.corrupted(src.len(), "truncated block"));
            }
            return Ok((0, 0, DecompressStatus::NeedsInput));
        }

        let mut produced = 0;
        for (index, pair) in src[HEADER_LEN..frame_len].chunks_exact(2).enumerate() {
            let run = pair[0] as usize;
            if run == 0 {
                return Err(self.corrupted(HEADER_LEN + 2 * index, "zero-length run"));
            }
            if produced + run > dst.len() {
                return Err(self.corrupted(
                    HEADER_LEN + 2 * index,
                    "block expands past the block size",
                ));
            }
            dst[produced..produced + run].fill(pair[1]);
            produced += run;
        }

        self.decode_offset += frame_len as u64;
        Ok((frame_len, produced, DecompressStatus::BlockEnd))
    }

    fn properties(&self) -> Vec<u8> {
        // Every constructor caps the block size at MAX_BLOCK_SIZE.
        let block_size = u32::try_from(self.block_size).unwrap_or(u32::MAX);
        let mut props = Vec::with_capacity(PROPERTIES_LEN);
        props.extend_from_slice(&block_size.to_le_bytes());
        props.push(u8::from(self.end_mark));
        props
    }

    fn release(&mut self) {
        self.decode_offset = 0;
    }
}
