//! Multi-threaded block compression with ordered output.
//!
//! [`ParallelBlockWriter`] accumulates caller bytes in an
//! [`AccumulationBuffer`] like the sequential adapter, but each full block
//! is copied into an [`OrderedPipeline`] slot that carries its own codec
//! clone and destination buffer. Blocks are encoded on worker threads and
//! written to the sink by the completion callback, which runs in
//! submission order.
//!
//! Only codecs whose blocks are independent can be split this way.

use oxiblock_core::cancel::CancelToken;
use oxiblock_core::error::{OxiBlockError, Result};
use oxiblock_core::position::Positions;
use oxiblock_core::ringbuffer::AccumulationBuffer;
use oxiblock_core::traits::{BlockCodec, validate_block_size};
use oxiblock_pipeline::{OrderedPipeline, PipelineConfig};
use std::io::{self, Write};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

/// One unit of parallel work.
struct BlockJob<C> {
    codec: C,
    input: Vec<u8>,
    input_len: usize,
    output: Vec<u8>,
    output_len: usize,
    last: bool,
}

impl<C> BlockJob<C> {
    fn new(codec: C, block_size: usize, output_bound: usize) -> Self {
        Self {
            codec,
            input: vec![0; block_size],
            input_len: 0,
            output: vec![0; output_bound],
            output_len: 0,
            last: false,
        }
    }
}

fn encode_job<C: BlockCodec>(job: &mut BlockJob<C>) -> Result<()> {
    let src = &job.input[..job.input_len];
    let produced = if job.last {
        job.codec.encode_final(src, &mut job.output)?
    } else {
        job.codec.encode_block(src, &mut job.output)?
    };
    if produced > job.output.len() {
        return Err(OxiBlockError::codec(
            job.codec.name(),
            format!(
                "reported {} bytes for a {} byte buffer",
                produced,
                job.output.len()
            ),
        ));
    }
    job.output_len = produced;
    Ok(())
}

/// Sink side, touched only by completion callbacks and after draining.
struct SinkState<W> {
    sink: Option<W>,
    physical: u64,
    /// First block or sink error; later blocks are dropped once set.
    error: Option<OxiBlockError>,
    /// Same token as the writer's. Blocks completing after cancellation
    /// are dropped without sink I/O.
    cancel: CancelToken,
    dropped: u64,
}

fn lock_sink<W>(state: &Mutex<SinkState<W>>) -> MutexGuard<'_, SinkState<W>> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

fn deliver<C, W: Write>(state: &Mutex<SinkState<W>>, job: &mut BlockJob<C>, result: Result<()>) {
    let mut guard = lock_sink(state);
    let state = &mut *guard;
    if state.error.is_some() {
        return;
    }
    if let Err(err) = result {
        warn!(error = %err, "parallel block encode failed");
        state.error = Some(err);
        return;
    }

    if state.cancel.is_cancelled() {
        state.dropped += 1;
        debug!(dropped = state.dropped, "block dropped after cancellation");
        return;
    }

    let Some(sink) = state.sink.as_mut() else {
        return;
    };
    match sink.write_all(&job.output[..job.output_len]) {
        Ok(()) => state.physical += job.output_len as u64,
        Err(err) => state.error = Some(err.into()),
    }
}

/// A `Write` sink that encodes blocks on a worker pool.
///
/// Output is byte-identical to a sequential
/// [`CodecStream`](crate::CodecStream) over the same codec.
pub struct ParallelBlockWriter<C, W>
where
    C: BlockCodec + Clone + 'static,
    W: Write + Send + 'static,
{
    pipeline: Option<OrderedPipeline<BlockJob<C>>>,
    ring: AccumulationBuffer,
    scratch: Vec<u8>,
    block_size: usize,
    state: Arc<Mutex<SinkState<W>>>,
    logical: u64,
    blocks: u64,
    properties: Vec<u8>,
    codec_name: &'static str,
    cancel: CancelToken,
    failed: bool,
    finished: bool,
}

impl<C, W> ParallelBlockWriter<C, W>
where
    C: BlockCodec + Clone + 'static,
    W: Write + Send + 'static,
{
    /// Create a writer encoding with clones of `codec`.
    ///
    /// Fails with `UnsupportedOperation` if the codec's blocks depend on
    /// each other.
    pub fn new(codec: C, sink: W, config: &PipelineConfig) -> Result<Self> {
        if !codec.independent_blocks() {
            return Err(OxiBlockError::unsupported(codec.name(), "parallel encode"));
        }
        let block_size = validate_block_size(&codec)?;
        let output_bound = codec.max_encoded_len(block_size);

        let cancel = CancelToken::new();
        let state = Arc::new(Mutex::new(SinkState {
            sink: Some(sink),
            physical: 0,
            error: None,
            cancel: cancel.clone(),
            dropped: 0,
        }));
        let callback_state = Arc::clone(&state);
        let pipeline = OrderedPipeline::new(
            config,
            || BlockJob::new(codec.clone(), block_size, output_bound),
            encode_job::<C>,
            move |job: &mut BlockJob<C>, result| deliver(&callback_state, job, result),
        )?;

        debug!(
            codec = codec.name(),
            block_size,
            capacity = config.capacity,
            "parallel block writer opened"
        );

        Ok(Self {
            pipeline: Some(pipeline),
            ring: AccumulationBuffer::for_block_size(block_size),
            scratch: vec![0; block_size],
            block_size,
            state,
            logical: 0,
            blocks: 0,
            properties: codec.properties(),
            codec_name: codec.name(),
            cancel,
            failed: false,
            finished: false,
        })
    }

    /// Replace the cancellation token.
    ///
    /// The completion callback observes the same token, so blocks still in
    /// flight when it fires never reach the sink.
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        lock_sink(&self.state).cancel = token.clone();
        self.cancel = token;
        self
    }

    /// Codec side-channel bytes needed to build a matching decoder.
    pub fn properties(&self) -> &[u8] {
        &self.properties
    }

    /// Number of non-terminal blocks submitted.
    pub fn blocks(&self) -> u64 {
        self.blocks
    }

    /// Current positions. `physical` only counts delivered blocks.
    pub fn positions(&self) -> Positions {
        Positions {
            logical: self.logical,
            physical: lock_sink(&self.state).physical,
        }
    }

    /// Blocks that completed after cancellation and were never written.
    pub fn dropped_blocks(&self) -> u64 {
        lock_sink(&self.state).dropped
    }

    /// Offer `buf`, submitting every block it completes.
    pub fn write_bytes(&mut self, buf: &[u8]) -> Result<usize> {
        if self.finished {
            return Err(OxiBlockError::Finished);
        }
        self.check_sink()?;
        self.cancel.check()?;

        let mut offered = 0;
        while offered < buf.len() {
            let taken = self.ring.append(&buf[offered..]);
            offered += taken;
            self.logical += taken as u64;

            if self.cancel.is_cancelled() {
                return Ok(offered);
            }
            self.submit_full_blocks()?;
        }
        Ok(offered)
    }

    /// Submit the partial block as a short block and wait until everything
    /// submitted so far is in the sink.
    pub fn sync(&mut self) -> Result<()> {
        if self.finished {
            return Ok(());
        }
        self.check_sink()?;
        self.cancel.check()?;

        self.submit_full_blocks()?;
        let pending = self.ring.len();
        if pending > 0 {
            self.submit(pending, false)?;
        }
        if let Some(pipeline) = self.pipeline.as_ref() {
            pipeline.wait_idle();
        }
        self.check_sink()?;
        self.cancel.check()?;

        let mut state = lock_sink(&self.state);
        if let Some(sink) = state.sink.as_mut() {
            sink.flush()?;
        }
        Ok(())
    }

    /// Encode the terminal block, wait for every block, and return the
    /// sink with the final positions.
    pub fn finish(mut self) -> Result<(W, Positions)> {
        let positions = self.finish_inner()?;
        let sink = lock_sink(&self.state)
            .sink
            .take()
            .ok_or(OxiBlockError::Finished)?;
        Ok((sink, positions))
    }

    fn finish_inner(&mut self) -> Result<Positions> {
        if self.finished {
            return Err(OxiBlockError::Finished);
        }
        self.check_sink()?;
        self.cancel.check()?;

        self.submit_full_blocks()?;
        let tail = self.ring.len();
        self.submit(tail, true)?;
        self.finished = true;

        let pipeline = self.pipeline.take().ok_or(OxiBlockError::Finished)?;
        let stats = pipeline.drain()?;
        self.check_sink()?;
        self.cancel.check()?;

        let mut state = lock_sink(&self.state);
        if let Some(sink) = state.sink.as_mut() {
            sink.flush()?;
        }
        debug!(
            codec = self.codec_name,
            blocks = stats.submitted,
            logical = self.logical,
            physical = state.physical,
            "parallel block writer finished"
        );
        Ok(Positions {
            logical: self.logical,
            physical: state.physical,
        })
    }

    fn submit_full_blocks(&mut self) -> Result<()> {
        while self.ring.len() >= self.block_size {
            self.submit(self.block_size, false)?;
        }
        Ok(())
    }

    /// Copy the oldest `len` ring bytes into the fill item and dispatch it.
    fn submit(&mut self, len: usize, last: bool) -> Result<()> {
        let pipeline = self.pipeline.as_mut().ok_or(OxiBlockError::Finished)?;
        let job = pipeline.fill_item();
        let src = self.ring.peek_contiguous(len, &mut self.scratch);
        job.input[..len].copy_from_slice(src);
        job.input_len = len;
        job.output_len = 0;
        job.last = last;

        pipeline.submit()?;
        self.ring.consume(len);
        if !last {
            self.blocks += 1;
        }
        Ok(())
    }

    /// Surface the first delivery error once, then refuse further work.
    fn check_sink(&mut self) -> Result<()> {
        if self.failed {
            return Err(OxiBlockError::StreamFailed);
        }
        if let Some(err) = lock_sink(&self.state).error.take() {
            self.failed = true;
            return Err(err);
        }
        Ok(())
    }
}

impl<C, W> Write for ParallelBlockWriter<C, W>
where
    C: BlockCodec + Clone + 'static,
    W: Write + Send + 'static,
{
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_bytes(buf).map_err(Into::into)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.sync().map_err(Into::into)
    }
}

impl<C, W> Drop for ParallelBlockWriter<C, W>
where
    C: BlockCodec + Clone + 'static,
    W: Write + Send + 'static,
{
    fn drop(&mut self) {
        if self.finished || self.failed {
            return;
        }
        if let Err(err) = self.finish_inner() {
            warn!(error = %err, "error while finishing parallel writer on drop");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    /// Wraps each block in brackets; the terminal block gets braces.
    #[derive(Debug, Clone)]
    struct Bracket {
        block_size: usize,
        independent: bool,
        delay: Duration,
    }

    impl Bracket {
        fn new(block_size: usize) -> Self {
            Self {
                block_size,
                independent: true,
                delay: Duration::ZERO,
            }
        }
    }

    /// Sink whose bytes stay visible to the test while the writer owns it.
    #[derive(Clone, Default)]
    struct SharedSink(Arc<Mutex<Vec<u8>>>);

    impl SharedSink {
        fn len(&self) -> usize {
            self.0.lock().unwrap().len()
        }
    }

    impl Write for SharedSink {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl BlockCodec for Bracket {
        fn name(&self) -> &'static str {
            "bracket"
        }

        fn block_size(&self) -> usize {
            self.block_size
        }

        fn max_encoded_len(&self, input_len: usize) -> usize {
            input_len + 2
        }

        fn encode_block(&mut self, src: &[u8], dst: &mut [u8]) -> Result<usize> {
            thread::sleep(self.delay);
            if src.first() == Some(&b'!') {
                return Err(OxiBlockError::codec("bracket", "bang"));
            }
            dst[0] = b'[';
            dst[1..=src.len()].copy_from_slice(src);
            dst[src.len() + 1] = b']';
            Ok(src.len() + 2)
        }

        fn encode_final(&mut self, src: &[u8], dst: &mut [u8]) -> Result<usize> {
            dst[0] = b'{';
            dst[1..=src.len()].copy_from_slice(src);
            dst[src.len() + 1] = b'}';
            Ok(src.len() + 2)
        }

        fn independent_blocks(&self) -> bool {
            self.independent
        }
    }

    fn config() -> PipelineConfig {
        PipelineConfig::new(3).with_threads(3)
    }

    #[test]
    fn test_blocks_in_order() {
        let mut writer = ParallelBlockWriter::new(Bracket::new(2), Vec::new(), &config()).unwrap();
        writer.write_all(b"abcdefg").unwrap();
        assert_eq!(writer.blocks(), 3);

        let (out, positions) = writer.finish().unwrap();
        assert_eq!(out, b"[ab][cd][ef]{g}");
        assert_eq!(positions.logical, 7);
        assert_eq!(positions.physical, out.len() as u64);
    }

    #[test]
    fn test_dependent_codec_rejected() {
        let mut codec = Bracket::new(4);
        codec.independent = false;
        let result = ParallelBlockWriter::new(codec, Vec::new(), &config());
        assert!(matches!(
            result,
            Err(OxiBlockError::UnsupportedOperation { .. })
        ));
    }

    #[test]
    fn test_sync_writes_short_block() {
        let mut writer = ParallelBlockWriter::new(Bracket::new(4), Vec::new(), &config()).unwrap();
        writer.write_all(b"abcdef").unwrap();
        writer.flush().unwrap();
        assert_eq!(writer.positions().physical, 10);

        let (out, _) = writer.finish().unwrap();
        assert_eq!(out, b"[abcd][ef]{}");
    }

    #[test]
    fn test_block_error_becomes_fatal() {
        let mut writer = ParallelBlockWriter::new(Bracket::new(2), Vec::new(), &config()).unwrap();
        writer.write_all(b"ab!def").unwrap();
        writer.sync().unwrap_err();
        assert!(matches!(
            writer.write_bytes(b"x"),
            Err(OxiBlockError::StreamFailed)
        ));
    }

    #[test]
    fn test_cancelled_before_submit() {
        let token = CancelToken::new();
        let mut writer = ParallelBlockWriter::new(Bracket::new(2), Vec::new(), &config())
            .unwrap()
            .with_cancel_token(token.clone());
        token.cancel();
        assert!(matches!(
            writer.write_bytes(b"abcd"),
            Err(OxiBlockError::Cancelled)
        ));
        assert_eq!(writer.positions(), Positions::default());
    }

    #[test]
    fn test_cancel_while_blocks_in_flight() {
        let token = CancelToken::new();
        let sink = SharedSink::default();
        let mut codec = Bracket::new(4);
        codec.delay = Duration::from_millis(100);
        let config = PipelineConfig::new(4).with_threads(4);
        let mut writer = ParallelBlockWriter::new(codec, sink.clone(), &config)
            .unwrap()
            .with_cancel_token(token.clone());

        writer.write_all(&[b'a'; 16]).unwrap();
        assert_eq!(writer.blocks(), 4);
        token.cancel();

        assert!(matches!(writer.sync(), Err(OxiBlockError::Cancelled)));
        let seen = sink.len();
        thread::sleep(Duration::from_millis(400));

        assert_eq!(sink.len(), seen);
        assert_eq!(sink.len(), 0);
        assert_eq!(writer.positions().physical, 0);
        assert_eq!(writer.dropped_blocks(), 4);

        drop(writer);
        assert_eq!(sink.len(), 0);
    }
}
