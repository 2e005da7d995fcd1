//! # OxiBlock Stream
//!
//! Stream adapters that hide a block codec's fixed block size behind
//! ordinary sequential I/O.
//!
//! - [`CodecStream`]: single-threaded adapter implementing
//!   [`std::io::Write`] (compress mode) or [`std::io::Read`] (decompress
//!   mode), with exact logical/physical position accounting.
//! - [`ParallelBlockWriter`]: compress-only writer that encodes blocks on an
//!   [`OrderedPipeline`](oxiblock_pipeline::OrderedPipeline) and writes them
//!   in submission order.
//! - [`driver`]: the block-aligned encode/decode drivers both are built on.
//!
//! ## Example
//!
//! ```rust
//! use oxiblock_core::FlushMode;
//! use oxiblock_codecs::RleCodec;
//! use oxiblock_stream::CodecStream;
//! use std::io::{Read, Write};
//!
//! let data = b"aaaaaaaabbbbbbbbcccc".repeat(10);
//!
//! let mut writer = CodecStream::compressor(RleCodec::new(64), Vec::new()).unwrap();
//! writer.write_all(&data).unwrap();
//! writer.flush_with(FlushMode::Finish).unwrap();
//! assert_eq!(writer.position_full_size(), data.len() as u64);
//! let compressed = writer.into_inner().unwrap();
//! assert!(compressed.len() < data.len());
//!
//! let mut reader = CodecStream::decompressor(RleCodec::new(64), &compressed[..]).unwrap();
//! let mut decoded = Vec::new();
//! reader.read_to_end(&mut decoded).unwrap();
//! assert_eq!(decoded, data);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod driver;
pub mod parallel;
pub mod stream;

pub use config::StreamConfig;
pub use driver::{DecodeDriver, DecodeStep, EncodeDriver};
pub use parallel::ParallelBlockWriter;
pub use stream::CodecStream;
