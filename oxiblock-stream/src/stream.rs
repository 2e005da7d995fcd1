//! Sequential stream adapter over a block codec.
//!
//! [`CodecStream`] runs in exactly one of two modes:
//!
//! - **Compress**: the caller writes uncompressed bytes, the stream encodes
//!   full blocks and writes them to the underlying sink.
//! - **Decompress**: the stream reads compressed bytes from the underlying
//!   source and the caller reads decoded bytes.
//!
//! Both modes keep a [`Positions`] pair. `logical` counts caller-side bytes,
//! `physical` counts bytes actually moved through the sink or source, so a
//! compress stream reports `logical > 0, physical == 0` until its first
//! block is complete.
//!
//! Before every sink/source operation the stream checks its
//! [`CancelToken`]; a cancelled call performs no I/O. Encoded bytes that a
//! cancelled call could not write stay pending and go out with the next
//! successful operation.

use crate::config::StreamConfig;
use crate::driver::{DecodeDriver, DecodeStep, EncodeDriver};
use oxiblock_core::cancel::CancelToken;
use oxiblock_core::error::{OxiBlockError, Result, StreamMode};
use oxiblock_core::position::Positions;
use oxiblock_core::traits::{BlockCodec, FlushMode};
use std::io::{self, ErrorKind, Read, Write};
use tracing::{debug, warn};

/// Encode-side state.
struct EncodeState<C> {
    driver: EncodeDriver<C>,
    /// Encoded bytes of the last block.
    out: Vec<u8>,
    /// `out[pending_start..pending_end]` is not yet in the sink.
    pending_start: usize,
    pending_end: usize,
}

impl<C> EncodeState<C> {
    fn has_pending(&self) -> bool {
        self.pending_start < self.pending_end
    }
}

/// Decode-side state.
struct DecodeState<C> {
    driver: DecodeDriver<C>,
    /// `driver.output()[out_pos..out_len]` is not yet delivered.
    out_pos: usize,
    out_len: usize,
}

enum Engine<C> {
    Encode(EncodeState<C>),
    Decode(DecodeState<C>),
}

impl<C: BlockCodec> Engine<C> {
    fn mode(&self) -> StreamMode {
        match self {
            Engine::Encode(_) => StreamMode::Compress,
            Engine::Decode(_) => StreamMode::Decompress,
        }
    }

    fn codec(&self) -> &C {
        match self {
            Engine::Encode(state) => state.driver.codec(),
            Engine::Decode(state) => state.driver.codec(),
        }
    }

    fn codec_mut(&mut self) -> &mut C {
        match self {
            Engine::Encode(state) => state.driver.codec_mut(),
            Engine::Decode(state) => state.driver.codec_mut(),
        }
    }
}

/// Finalizer installed by the compress constructor, where `S: Write` is
/// known, so `close` and `Drop` can finish the stream without that bound.
type Finisher<C, S> = fn(&mut CodecStream<C, S>) -> Result<()>;

/// A stream adapter hiding a codec's block size behind sequential I/O.
///
/// # Example
///
/// ```rust
/// use oxiblock_core::BlockCodec;
/// use oxiblock_core::error::Result;
/// use oxiblock_stream::CodecStream;
/// use std::io::Write;
///
/// /// Upper-cases blocks of 4 bytes.
/// struct Upper;
///
/// impl BlockCodec for Upper {
///     fn name(&self) -> &'static str { "upper" }
///     fn block_size(&self) -> usize { 4 }
///     fn max_encoded_len(&self, n: usize) -> usize { n }
///     fn encode_block(&mut self, src: &[u8], dst: &mut [u8]) -> Result<usize> {
///         for (d, s) in dst.iter_mut().zip(src) {
///             *d = s.to_ascii_uppercase();
///         }
///         Ok(src.len())
///     }
/// }
///
/// let mut stream = CodecStream::compressor(Upper, Vec::new()).unwrap();
/// stream.write_all(b"hello").unwrap();
/// assert_eq!(stream.position_full_size(), 5);
/// assert_eq!(stream.position(), 4);
///
/// let out = stream.into_inner().unwrap();
/// assert_eq!(out, b"HELLO");
/// ```
pub struct CodecStream<C: BlockCodec, S> {
    inner: Option<S>,
    engine: Engine<C>,
    positions: Positions,
    cancel: CancelToken,
    failed: bool,
    closed: bool,
    finisher: Option<Finisher<C, S>>,
}

impl<C: BlockCodec, S> CodecStream<C, S> {
    /// The mode this stream was opened in.
    pub fn mode(&self) -> StreamMode {
        self.engine.mode()
    }

    /// Bytes moved through the underlying sink or source.
    pub fn position(&self) -> u64 {
        self.positions.physical
    }

    /// Uncompressed bytes offered by or delivered to the caller.
    pub fn position_full_size(&self) -> u64 {
        self.positions.logical
    }

    /// Both position counters.
    pub fn positions(&self) -> Positions {
        self.positions
    }

    /// Codec side-channel bytes needed to build a matching decoder.
    pub fn properties(&self) -> Vec<u8> {
        self.engine.codec().properties()
    }

    /// The codec driven by this stream.
    pub fn codec(&self) -> &C {
        self.engine.codec()
    }

    /// Number of blocks encoded or decoded so far.
    pub fn blocks(&self) -> u64 {
        match &self.engine {
            Engine::Encode(state) => state.driver.blocks(),
            Engine::Decode(state) => state.driver.blocks(),
        }
    }

    /// Bytes held inside the adapter: unencoded input in compress mode,
    /// undecoded input in decompress mode.
    pub fn buffered(&self) -> usize {
        match &self.engine {
            Engine::Encode(state) => state.driver.buffered(),
            Engine::Decode(state) => state.driver.buffered(),
        }
    }

    /// Whether the terminal block was written (compress) or the end of the
    /// compressed stream was reached (decompress).
    pub fn is_finished(&self) -> bool {
        match &self.engine {
            Engine::Encode(state) => state.driver.is_finished() && !state.has_pending(),
            Engine::Decode(state) => {
                state.driver.is_finished() && state.out_pos >= state.out_len
            }
        }
    }

    /// Whether an earlier fatal error disabled this stream.
    pub fn is_failed(&self) -> bool {
        self.failed
    }

    /// Replace the cancellation token.
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    /// The cancellation token checked before sink/source I/O.
    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Borrow the underlying sink or source.
    pub fn get_ref(&self) -> Option<&S> {
        self.inner.as_ref()
    }

    /// Finish the stream (compress mode) and release the codec.
    ///
    /// Runs the terminal flush at most once; closing again is a no-op, and
    /// a stream that failed is released without flushing.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }

        let finisher = self.finisher.take();
        let result = match finisher {
            Some(finish) if !self.failed => finish(self),
            _ => Ok(()),
        };
        self.closed = true;
        self.engine.codec_mut().release();
        debug!(
            codec = self.engine.codec().name(),
            mode = %self.mode(),
            logical = self.positions.logical,
            physical = self.positions.physical,
            "stream closed"
        );
        result
    }

    /// Close the stream and return the underlying sink or source.
    pub fn into_inner(mut self) -> Result<S> {
        self.close()?;
        self.inner.take().ok_or(OxiBlockError::Finished)
    }

    fn new(inner: S, engine: Engine<C>, finisher: Option<Finisher<C, S>>) -> Self {
        debug!(
            codec = engine.codec().name(),
            block_size = engine.codec().block_size(),
            mode = %engine.mode(),
            "stream opened"
        );
        Self {
            inner: Some(inner),
            engine,
            positions: Positions::new(),
            cancel: CancelToken::new(),
            failed: false,
            closed: false,
            finisher,
        }
    }

    fn ensure_open(&self, mode: StreamMode, operation: &'static str) -> Result<()> {
        if self.mode() != mode {
            return Err(OxiBlockError::mode_violation(self.mode(), operation));
        }
        if self.failed {
            return Err(OxiBlockError::StreamFailed);
        }
        if self.closed {
            return Err(OxiBlockError::Finished);
        }
        Ok(())
    }

    fn fail<T>(&mut self, err: OxiBlockError) -> Result<T> {
        if err.is_fatal() && !self.failed {
            warn!(codec = self.engine.codec().name(), error = %err, "stream failed");
            self.failed = true;
        }
        Err(err)
    }
}

// ============================================================================
// Compress mode
// ============================================================================

impl<C: BlockCodec, S: Write> CodecStream<C, S> {
    /// Open a compress stream writing to `sink`.
    pub fn compressor(codec: C, sink: S) -> Result<Self> {
        Self::compressor_with_config(codec, sink, &StreamConfig::default())
    }

    /// Open a compress stream with an explicit configuration.
    pub fn compressor_with_config(codec: C, sink: S, config: &StreamConfig) -> Result<Self> {
        config.validate()?;
        let driver = EncodeDriver::new(codec)?;
        let out = vec![0; driver.output_bound()];
        let engine = Engine::Encode(EncodeState {
            driver,
            out,
            pending_start: 0,
            pending_end: 0,
        });
        Ok(Self::new(sink, engine, Some(Self::finish_for_close)))
    }

    fn finish_for_close(stream: &mut Self) -> Result<()> {
        stream.flush_with(FlushMode::Finish)
    }

    /// Offer `buf` to the stream.
    ///
    /// Every byte taken counts toward the logical position at once; the
    /// physical position moves only when a full block has been encoded and
    /// written. Returns the number of bytes taken, which is `buf.len()`
    /// unless cancellation stopped the call part way.
    pub fn write_bytes(&mut self, buf: &[u8]) -> Result<usize> {
        self.ensure_open(StreamMode::Compress, "write")?;
        if let Engine::Encode(state) = &self.engine {
            if state.driver.is_finished() {
                return Err(OxiBlockError::Finished);
            }
        }
        self.cancel.check()?;
        if let Err(err) = self.write_pending() {
            return self.fail(err);
        }

        let mut offered = 0;
        while offered < buf.len() {
            let Engine::Encode(state) = &mut self.engine else {
                break;
            };
            let taken = state.driver.append(&buf[offered..]);
            offered += taken;
            self.positions.advance_logical(taken);

            match self.encode_full_blocks() {
                Ok(()) => {}
                // The bytes just taken stay accepted; the next call reports it.
                Err(OxiBlockError::Cancelled) => return Ok(offered),
                Err(err) => return self.fail(err),
            }
        }
        Ok(offered)
    }

    /// Push buffered bytes through the codec.
    ///
    /// `FlushMode::Sync` encodes the partial block as a short block and
    /// keeps the stream open. `FlushMode::Finish` encodes it as the
    /// terminal block; once that is written, further flushes of either
    /// kind do nothing.
    pub fn flush_with(&mut self, mode: FlushMode) -> Result<()> {
        let Engine::Encode(state) = &self.engine else {
            return Ok(());
        };
        if state.driver.is_finished() && !state.has_pending() {
            return Ok(());
        }
        if self.failed {
            return Err(OxiBlockError::StreamFailed);
        }
        self.cancel.check()?;

        if let Err(err) = self.flush_inner(mode) {
            return self.fail(err);
        }
        Ok(())
    }

    /// Write the terminal block, flush the sink, and report final positions.
    pub fn complete(&mut self) -> Result<Positions> {
        self.flush_with(FlushMode::Finish)?;
        Ok(self.positions)
    }

    fn flush_inner(&mut self, mode: FlushMode) -> Result<()> {
        self.write_pending()?;
        self.encode_full_blocks()?;

        let Engine::Encode(state) = &mut self.engine else {
            return Ok(());
        };
        if let Some(produced) = state.driver.finalize(mode, &mut state.out)? {
            state.pending_start = 0;
            state.pending_end = produced;
            self.write_pending()?;
        }

        self.cancel.check()?;
        if let Some(sink) = self.inner.as_mut() {
            sink.flush()?;
        }
        Ok(())
    }

    /// Encode and write every full block in the ring.
    fn encode_full_blocks(&mut self) -> Result<()> {
        loop {
            let Engine::Encode(state) = &mut self.engine else {
                return Ok(());
            };
            if !state.driver.has_full_block() {
                return Ok(());
            }
            let produced = state.driver.encode_block(&mut state.out)?;
            state.pending_start = 0;
            state.pending_end = produced;
            self.write_pending()?;
        }
    }

    /// Write encoded bytes not yet in the sink.
    fn write_pending(&mut self) -> Result<()> {
        let Engine::Encode(state) = &mut self.engine else {
            return Ok(());
        };
        if !state.has_pending() {
            return Ok(());
        }
        self.cancel.check()?;
        let sink = self.inner.as_mut().ok_or(OxiBlockError::Finished)?;

        while state.has_pending() {
            match sink.write(&state.out[state.pending_start..state.pending_end]) {
                Ok(0) => return Err(io::Error::from(ErrorKind::WriteZero).into()),
                Ok(n) => {
                    state.pending_start += n;
                    self.positions.advance_physical(n);
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }
}

impl<C: BlockCodec, S: Write> Write for CodecStream<C, S> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_bytes(buf).map_err(Into::into)
    }

    /// Sync-flushes the partial block, then flushes the sink.
    fn flush(&mut self) -> io::Result<()> {
        self.flush_with(FlushMode::Sync).map_err(Into::into)
    }
}

// ============================================================================
// Decompress mode
// ============================================================================

impl<C: BlockCodec, S: Read> CodecStream<C, S> {
    /// Open a decompress stream reading from `source`.
    pub fn decompressor(codec: C, source: S) -> Result<Self> {
        Self::decompressor_with_config(codec, source, &StreamConfig::default())
    }

    /// Open a decompress stream with an explicit configuration.
    pub fn decompressor_with_config(codec: C, source: S, config: &StreamConfig) -> Result<Self> {
        config.validate()?;
        let driver = DecodeDriver::new(codec, config.input_buffer_size)?;
        let engine = Engine::Decode(DecodeState {
            driver,
            out_pos: 0,
            out_len: 0,
        });
        Ok(Self::new(source, engine, None))
    }

    /// Read decoded bytes into `buf`.
    ///
    /// Returns 0 only once the codec has reported the end of the stream
    /// and every decoded byte was delivered (or when `buf` is empty).
    pub fn read_bytes(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.ensure_open(StreamMode::Decompress, "read")?;
        if buf.is_empty() {
            return Ok(0);
        }

        loop {
            let Engine::Decode(state) = &mut self.engine else {
                return Err(OxiBlockError::mode_violation(StreamMode::Compress, "read"));
            };

            if state.out_pos < state.out_len {
                let available = &state.driver.output()[state.out_pos..state.out_len];
                let n = available.len().min(buf.len());
                buf[..n].copy_from_slice(&available[..n]);
                state.out_pos += n;
                self.positions.advance_logical(n);
                return Ok(n);
            }

            let step = match state.driver.decode() {
                Ok(step) => step,
                Err(err) => return self.fail(err),
            };
            match step {
                DecodeStep::Produced(n) => {
                    state.out_pos = 0;
                    state.out_len = n;
                }
                DecodeStep::Finished => return Ok(0),
                DecodeStep::NeedsInput => {
                    self.cancel.check()?;
                    let Some(source) = self.inner.as_mut() else {
                        return Err(OxiBlockError::Finished);
                    };
                    match state.driver.fill_from(source) {
                        Ok(n) => self.positions.advance_physical(n),
                        Err(err) => return self.fail(err),
                    }
                }
            }
        }
    }
}

impl<C: BlockCodec, S: Read> Read for CodecStream<C, S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.read_bytes(buf).map_err(Into::into)
    }
}

impl<C: BlockCodec, S> Drop for CodecStream<C, S> {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            warn!(error = %err, "error while closing stream on drop");
        }
    }
}

impl<C: BlockCodec, S> std::fmt::Debug for CodecStream<C, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodecStream")
            .field("codec", &self.engine.codec().name())
            .field("mode", &self.mode())
            .field("positions", &self.positions)
            .field("failed", &self.failed)
            .field("closed", &self.closed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxiblock_core::traits::DecompressStatus;
    use std::io::Cursor;

    /// Prefixes each block with its length byte; the terminal block is
    /// prefixed with 0xFF.
    #[derive(Debug, Default)]
    struct Framed {
        block_size: usize,
        fail: bool,
        released: bool,
        /// Cancelled from inside the first encode call.
        cancel_on_encode: Option<CancelToken>,
    }

    impl Framed {
        fn new(block_size: usize) -> Self {
            Self {
                block_size,
                ..Self::default()
            }
        }
    }

    impl BlockCodec for Framed {
        fn name(&self) -> &'static str {
            "framed"
        }

        fn block_size(&self) -> usize {
            self.block_size
        }

        fn max_encoded_len(&self, input_len: usize) -> usize {
            input_len + 1
        }

        fn encode_block(&mut self, src: &[u8], dst: &mut [u8]) -> Result<usize> {
            if self.fail {
                return Err(OxiBlockError::codec("framed", "scripted failure"));
            }
            if let Some(token) = self.cancel_on_encode.take() {
                token.cancel();
            }
            dst[0] = src.len() as u8;
            dst[1..=src.len()].copy_from_slice(src);
            Ok(src.len() + 1)
        }

        fn encode_final(&mut self, src: &[u8], dst: &mut [u8]) -> Result<usize> {
            dst[0] = 0xFF;
            dst[1..=src.len()].copy_from_slice(src);
            Ok(src.len() + 1)
        }

        fn decode_block(
            &mut self,
            src: &[u8],
            dst: &mut [u8],
            _input_finished: bool,
        ) -> Result<(usize, usize, DecompressStatus)> {
            let Some(&tag) = src.first() else {
                return Ok((0, 0, DecompressStatus::NeedsInput));
            };
            if tag == 0xFF {
                // Terminal block runs to the end of input.
                let n = src.len() - 1;
                dst[..n].copy_from_slice(&src[1..]);
                return Ok((src.len(), n, DecompressStatus::Done));
            }
            let n = tag as usize;
            if src.len() < n + 1 {
                return Ok((0, 0, DecompressStatus::NeedsInput));
            }
            dst[..n].copy_from_slice(&src[1..=n]);
            Ok((n + 1, n, DecompressStatus::BlockEnd))
        }

        fn release(&mut self) {
            self.released = true;
        }
    }

    #[test]
    fn test_positions_follow_blocks() {
        let mut stream = CodecStream::compressor(Framed::new(4), Vec::new()).unwrap();

        stream.write_bytes(b"abc").unwrap();
        assert_eq!(stream.position_full_size(), 3);
        assert_eq!(stream.position(), 0);

        stream.write_bytes(b"de").unwrap();
        assert_eq!(stream.position_full_size(), 5);
        assert_eq!(stream.position(), 5);
        assert_eq!(stream.buffered(), 1);

        let positions = stream.complete().unwrap();
        assert_eq!(positions.logical, 5);
        assert_eq!(positions.physical, 7);
        assert_eq!(stream.get_ref().unwrap().as_slice(), b"\x04abcd\xFFe");
    }

    #[test]
    fn test_finish_twice_is_idempotent() {
        let mut stream = CodecStream::compressor(Framed::new(4), Vec::new()).unwrap();
        stream.write_bytes(b"xy").unwrap();

        stream.flush_with(FlushMode::Finish).unwrap();
        let after_first = stream.get_ref().unwrap().clone();
        stream.flush_with(FlushMode::Finish).unwrap();
        stream.flush_with(FlushMode::Sync).unwrap();

        assert_eq!(stream.get_ref().unwrap(), &after_first);
        assert!(stream.is_finished());
        assert!(matches!(
            stream.write_bytes(b"z"),
            Err(OxiBlockError::Finished)
        ));
    }

    #[test]
    fn test_sync_flush_keeps_stream_open() {
        let mut stream = CodecStream::compressor(Framed::new(4), Vec::new()).unwrap();
        stream.write_bytes(b"ab").unwrap();
        stream.flush_with(FlushMode::Sync).unwrap();
        assert_eq!(stream.position(), 3);

        stream.write_bytes(b"cdef").unwrap();
        let out = stream.into_inner().unwrap();
        assert_eq!(out, b"\x02ab\x04cdef\xFF");
    }

    #[test]
    fn test_mode_violations() {
        let mut compress = CodecStream::compressor(Framed::new(4), Cursor::new(Vec::new())).unwrap();
        let mut buf = [0u8; 4];
        assert!(matches!(
            compress.read_bytes(&mut buf),
            Err(OxiBlockError::ModeViolation {
                mode: StreamMode::Compress,
                operation: "read"
            })
        ));
        // Not fatal: the stream still works.
        compress.write_bytes(b"ok").unwrap();

        let mut decompress =
            CodecStream::decompressor(Framed::new(4), Cursor::new(vec![0xFF])).unwrap();
        assert!(matches!(
            decompress.write_bytes(b"no"),
            Err(OxiBlockError::ModeViolation {
                mode: StreamMode::Decompress,
                ..
            })
        ));
    }

    #[test]
    fn test_codec_failure_is_fatal_but_closable() {
        let mut stream = CodecStream::compressor(Framed::new(2), Vec::new()).unwrap();
        stream.write_bytes(b"ab").unwrap();

        if let Engine::Encode(state) = &mut stream.engine {
            state.driver.codec_mut().fail = true;
        }
        assert!(matches!(
            stream.write_bytes(b"cd"),
            Err(OxiBlockError::Codec { .. })
        ));
        assert!(stream.is_failed());
        assert_eq!(stream.buffered(), 0);
        assert!(matches!(
            stream.write_bytes(b"e"),
            Err(OxiBlockError::StreamFailed)
        ));

        stream.close().unwrap();
        stream.close().unwrap();
        assert!(stream.codec().released);
        assert_eq!(stream.get_ref().unwrap().as_slice(), b"\x02ab");
    }

    #[test]
    fn test_cancel_before_io() {
        let token = CancelToken::new();
        let mut stream = CodecStream::compressor(Framed::new(2), Vec::new())
            .unwrap()
            .with_cancel_token(token.clone());

        stream.write_bytes(b"a").unwrap();
        token.cancel();

        assert!(matches!(
            stream.write_bytes(b"bc"),
            Err(OxiBlockError::Cancelled)
        ));
        assert_eq!(stream.position_full_size(), 1);
        assert!(stream.get_ref().unwrap().is_empty());
        assert!(!stream.is_failed());
        assert!(matches!(
            stream.flush_with(FlushMode::Finish),
            Err(OxiBlockError::Cancelled)
        ));
        assert!(stream.get_ref().unwrap().is_empty());
    }

    #[test]
    fn test_cancel_mid_write_keeps_taken_bytes() {
        let token = CancelToken::new();
        let mut codec = Framed::new(2);
        codec.cancel_on_encode = Some(token.clone());
        let mut stream = CodecStream::compressor(codec, Vec::new())
            .unwrap()
            .with_cancel_token(token.clone());

        let taken = stream.write_bytes(b"abcdef").unwrap();
        assert!(taken >= 2);
        assert_eq!(stream.position_full_size(), taken as u64);
        assert!(stream.get_ref().unwrap().is_empty());
        assert!(!stream.is_failed());

        assert!(matches!(
            stream.write_bytes(b"g"),
            Err(OxiBlockError::Cancelled)
        ));
        assert_eq!(stream.position_full_size(), taken as u64);
    }

    #[test]
    fn test_decompress_roundtrip() {
        let mut stream = CodecStream::compressor(Framed::new(3), Vec::new()).unwrap();
        stream.write_all(b"abcdefgh").unwrap();
        let encoded = stream.into_inner().unwrap();

        let encoded_len = encoded.len() as u64;
        let config = StreamConfig::new().with_input_buffer_size(2);
        let mut reader =
            CodecStream::decompressor_with_config(Framed::new(3), Cursor::new(encoded), &config)
                .unwrap();
        let mut decoded = Vec::new();
        reader.read_to_end(&mut decoded).unwrap();

        assert_eq!(decoded, b"abcdefgh");
        assert_eq!(reader.position_full_size(), 8);
        assert_eq!(reader.position(), encoded_len);
        assert!(reader.is_finished());
        assert_eq!(reader.read_bytes(&mut [0u8; 4]).unwrap(), 0);
    }

    #[test]
    fn test_truncated_input_is_corrupt() {
        let mut reader =
            CodecStream::decompressor(Framed::new(4), Cursor::new(vec![4, b'a', b'b'])).unwrap();
        let mut buf = [0u8; 8];
        assert!(matches!(
            reader.read_bytes(&mut buf),
            Err(OxiBlockError::CorruptedData { .. })
        ));
        assert!(reader.is_failed());
    }

    #[test]
    fn test_drop_finishes_stream() {
        struct Shared(std::rc::Rc<std::cell::RefCell<Vec<u8>>>);

        impl Write for Shared {
            fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
                self.0.borrow_mut().extend_from_slice(buf);
                Ok(buf.len())
            }

            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let out = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
        {
            let mut stream =
                CodecStream::compressor(Framed::new(4), Shared(out.clone())).unwrap();
            stream.write_bytes(b"abcdef").unwrap();
        }
        assert_eq!(out.borrow().as_slice(), b"\x04abcd\xFFef");
    }
}
