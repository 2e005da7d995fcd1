//! Block-aligned codec drivers.
//!
//! [`EncodeDriver`] feeds a codec exactly one block at a time out of an
//! [`AccumulationBuffer`], and [`DecodeDriver`] keeps an input-side ring of
//! compressed bytes for the codec's decode path. Neither touches the
//! underlying sink or source directly except through the `fill_from` read;
//! position accounting and cancellation belong to the stream adapter.

use oxiblock_core::error::{OxiBlockError, Result};
use oxiblock_core::ringbuffer::{ALIGNMENT_MARGIN, AccumulationBuffer};
use oxiblock_core::traits::{BlockCodec, DecompressStatus, FlushMode, validate_block_size};
use std::io::{ErrorKind, Read};
use tracing::{trace, warn};

// ============================================================================
// Encode
// ============================================================================

/// Drives a codec's encode path over fixed-size blocks.
#[derive(Debug)]
pub struct EncodeDriver<C> {
    codec: C,
    ring: AccumulationBuffer,
    /// Linearization target for blocks that wrap in the ring.
    scratch: Vec<u8>,
    block_size: usize,
    blocks: u64,
    finished: bool,
}

impl<C: BlockCodec> EncodeDriver<C> {
    /// Create a driver for `codec`, rejecting block sizes below its minimum.
    pub fn new(codec: C) -> Result<Self> {
        let block_size = validate_block_size(&codec)?;
        Ok(Self {
            codec,
            ring: AccumulationBuffer::for_block_size(block_size),
            scratch: vec![0; block_size],
            block_size,
            blocks: 0,
            finished: false,
        })
    }

    /// The codec being driven.
    pub fn codec(&self) -> &C {
        &self.codec
    }

    /// Mutable access to the codec.
    pub fn codec_mut(&mut self) -> &mut C {
        &mut self.codec
    }

    /// Consume the driver and return the codec.
    pub fn into_codec(self) -> C {
        self.codec
    }

    /// Uncompressed bytes per block.
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Size a destination buffer must have for one encode call.
    pub fn output_bound(&self) -> usize {
        self.codec.max_encoded_len(self.block_size)
    }

    /// Bytes accepted but not yet encoded.
    pub fn buffered(&self) -> usize {
        self.ring.len()
    }

    /// Number of `encode_block` invocations so far.
    pub fn blocks(&self) -> u64 {
        self.blocks
    }

    /// Whether the terminal block was emitted.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Whether a full block is waiting to be encoded.
    pub fn has_full_block(&self) -> bool {
        self.ring.len() >= self.block_size
    }

    /// Accept as many bytes as the ring has room for.
    ///
    /// Returns 0 when the ring is full; encode a block and retry.
    pub fn append(&mut self, src: &[u8]) -> usize {
        debug_assert!(!self.finished, "append after terminal block");
        self.ring.append(src)
    }

    /// Encode one full block into `dst`, returning the bytes produced.
    ///
    /// On codec failure the buffered bytes are discarded.
    pub fn encode_block(&mut self, dst: &mut [u8]) -> Result<usize> {
        debug_assert!(self.has_full_block());
        self.encode_buffered(self.block_size, dst, false)
    }

    /// Encode whatever is buffered as a short block (`Sync`) or as the
    /// terminal block (`Finish`).
    ///
    /// Returns `None` when there was nothing to do: a sync flush with an
    /// empty ring, or any flush after the terminal block.
    pub fn finalize(&mut self, mode: FlushMode, dst: &mut [u8]) -> Result<Option<usize>> {
        if self.finished {
            return Ok(None);
        }
        let pending = self.ring.len();
        debug_assert!(pending <= self.block_size);

        match mode {
            FlushMode::Sync if pending == 0 => Ok(None),
            FlushMode::Sync => self.encode_buffered(pending, dst, false).map(Some),
            FlushMode::Finish => {
                let produced = self.encode_buffered(pending, dst, true)?;
                self.finished = true;
                trace!(
                    codec = self.codec.name(),
                    tail = pending,
                    produced,
                    "terminal block encoded"
                );
                Ok(Some(produced))
            }
        }
    }

    fn encode_buffered(&mut self, len: usize, dst: &mut [u8], last: bool) -> Result<usize> {
        let src = self.ring.peek_contiguous(len, &mut self.scratch);
        let result = if last {
            self.codec.encode_final(src, dst)
        } else {
            self.codec.encode_block(src, dst)
        };

        match result {
            Ok(produced) if produced <= dst.len() => {
                self.ring.consume(len);
                if !last {
                    self.blocks += 1;
                }
                trace!(codec = self.codec.name(), len, produced, "block encoded");
                Ok(produced)
            }
            Ok(produced) => {
                self.ring.discard();
                Err(OxiBlockError::codec(
                    self.codec.name(),
                    format!("reported {} bytes for a {} byte buffer", produced, dst.len()),
                ))
            }
            Err(err) => {
                warn!(codec = self.codec.name(), error = %err, "block encode failed");
                self.ring.discard();
                Err(err)
            }
        }
    }
}

// ============================================================================
// Decode
// ============================================================================

/// Result of one [`DecodeDriver::decode`] step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeStep {
    /// `n` decoded bytes are available in the output buffer.
    Produced(usize),
    /// The driver needs more compressed input.
    NeedsInput,
    /// The codec saw the end of the stream.
    Finished,
}

/// Drives a codec's decode path from an input-side ring.
#[derive(Debug)]
pub struct DecodeDriver<C> {
    codec: C,
    input: AccumulationBuffer,
    scratch: Vec<u8>,
    output: Vec<u8>,
    source_eof: bool,
    finished: bool,
    blocks: u64,
}

impl<C: BlockCodec> DecodeDriver<C> {
    /// Create a driver reading compressed input in chunks of at least
    /// `input_buffer_size` bytes.
    pub fn new(codec: C, input_buffer_size: usize) -> Result<Self> {
        let block_size = validate_block_size(&codec)?;
        let input_capacity = codec
            .max_encoded_len(block_size)
            .max(input_buffer_size)
            .max(1)
            + ALIGNMENT_MARGIN;
        Ok(Self {
            codec,
            input: AccumulationBuffer::new(input_capacity),
            scratch: vec![0; input_capacity],
            output: vec![0; block_size],
            source_eof: false,
            finished: false,
            blocks: 0,
        })
    }

    /// The codec being driven.
    pub fn codec(&self) -> &C {
        &self.codec
    }

    /// Mutable access to the codec.
    pub fn codec_mut(&mut self) -> &mut C {
        &mut self.codec
    }

    /// Consume the driver and return the codec.
    pub fn into_codec(self) -> C {
        self.codec
    }

    /// Decoded bytes from the last productive step.
    pub fn output(&self) -> &[u8] {
        &self.output
    }

    /// Compressed bytes read but not yet decoded.
    pub fn buffered(&self) -> usize {
        self.input.len()
    }

    /// Number of decode calls that produced output or closed a block.
    pub fn blocks(&self) -> u64 {
        self.blocks
    }

    /// Whether the codec reported the end of the stream.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Whether the source reported end of file.
    pub fn source_exhausted(&self) -> bool {
        self.source_eof
    }

    /// Read once from `source` into free ring space.
    ///
    /// Returns the number of bytes read; 0 marks the source as exhausted.
    pub fn fill_from<R: Read>(&mut self, source: &mut R) -> Result<usize> {
        let slot = self.input.writable_slice();
        if slot.is_empty() {
            return Err(OxiBlockError::corrupted(
                self.input.processed(),
                format!(
                    "block does not fit in {} byte input buffer",
                    self.input.capacity()
                ),
            ));
        }

        let read = loop {
            match source.read(slot) {
                Ok(n) => break n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        };

        if read == 0 {
            self.source_eof = true;
        } else {
            self.input.commit_write(read);
        }
        Ok(read)
    }

    /// Run the codec over everything buffered until it produces output,
    /// wants more input, or ends. Empty blocks are skipped in place.
    pub fn decode(&mut self) -> Result<DecodeStep> {
        loop {
            if self.finished {
                return Ok(DecodeStep::Finished);
            }

            let available = self.input.len();
            let src = self.input.peek_contiguous(available, &mut self.scratch);
            let (consumed, produced, status) =
                match self
                    .codec
                    .decode_block(src, &mut self.output, self.source_eof)
                {
                    Ok(step) => step,
                    Err(err) => {
                        warn!(codec = self.codec.name(), error = %err, "block decode failed");
                        self.input.discard();
                        return Err(err);
                    }
                };

            if consumed > available || produced > self.output.len() {
                self.input.discard();
                return Err(OxiBlockError::codec(
                    self.codec.name(),
                    "decode reported more bytes than the buffers hold",
                ));
            }
            self.input.consume(consumed);
            if produced > 0 || status == DecompressStatus::BlockEnd {
                self.blocks += 1;
            }

            return match status {
                DecompressStatus::Done => {
                    self.finished = true;
                    trace!(codec = self.codec.name(), "end of compressed stream");
                    if produced > 0 {
                        Ok(DecodeStep::Produced(produced))
                    } else {
                        Ok(DecodeStep::Finished)
                    }
                }
                _ if produced > 0 => Ok(DecodeStep::Produced(produced)),
                DecompressStatus::NeedsOutput => Err(OxiBlockError::codec(
                    self.codec.name(),
                    format!(
                        "block exceeds the {} byte output buffer",
                        self.output.len()
                    ),
                )),
                DecompressStatus::BlockEnd if consumed > 0 => continue,
                DecompressStatus::NeedsInput | DecompressStatus::BlockEnd => {
                    if self.source_eof {
                        Err(OxiBlockError::corrupted(
                            self.input.processed(),
                            "compressed stream ended before the codec finished",
                        ))
                    } else {
                        Ok(DecodeStep::NeedsInput)
                    }
                }
            };
        }
    }
}
