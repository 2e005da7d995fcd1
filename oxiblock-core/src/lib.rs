//! # OxiBlock Core
//!
//! Core components for the OxiBlock stream library.
//!
//! This crate provides the fundamental building blocks shared by the stream
//! adapter and the ordered pipeline:
//!
//! - [`traits`]: The [`BlockCodec`] boundary to compression engines
//! - [`ringbuffer`]: Circular accumulation buffer for block alignment
//! - [`position`]: Logical/physical byte counters
//! - [`cancel`]: Cooperative cancellation token
//! - [`error`]: Error types
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │ L3: Stream                                              │
//! │     CodecStream, ParallelBlockWriter                    │
//! ├─────────────────────────────────────────────────────────┤
//! │ L2: Scheduling                                          │
//! │     OrderedPipeline (slot pool, in-order completion)    │
//! ├─────────────────────────────────────────────────────────┤
//! │ L1: Core (this crate)                                   │
//! │     BlockCodec, AccumulationBuffer, Positions           │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust
//! use oxiblock_core::ringbuffer::AccumulationBuffer;
//!
//! let mut ring = AccumulationBuffer::for_block_size(4);
//! ring.append(b"abcdef");
//!
//! let mut scratch = [0u8; 4];
//! assert_eq!(ring.peek_contiguous(4, &mut scratch), b"abcd");
//! ring.consume(4);
//! assert_eq!(ring.len(), 2);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod cancel;
pub mod error;
pub mod position;
pub mod ringbuffer;
pub mod traits;

// Re-exports for convenience
pub use cancel::CancelToken;
pub use error::{OxiBlockError, Result, StreamMode};
pub use position::Positions;
pub use ringbuffer::{ALIGNMENT_MARGIN, AccumulationBuffer};
pub use traits::{BlockCodec, DecompressStatus, FlushMode, validate_block_size};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::cancel::CancelToken;
    pub use crate::error::{OxiBlockError, Result, StreamMode};
    pub use crate::position::Positions;
    pub use crate::ringbuffer::AccumulationBuffer;
    pub use crate::traits::{BlockCodec, DecompressStatus, FlushMode};
}
