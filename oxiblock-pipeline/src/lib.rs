//! # OxiBlock Pipeline
//!
//! Ordered parallel execution for block codecs.
//!
//! [`OrderedPipeline`] runs up to `capacity` units at once on a rayon thread
//! pool and hands each finished unit to a completion callback in exactly the
//! order the units were submitted. Completion callbacks never overlap, so
//! they can append to a single output without their own locking.
//!
//! ## Example
//!
//! ```rust
//! use oxiblock_pipeline::{OrderedPipeline, PipelineConfig};
//!
//! let mut out = Vec::new();
//! let (tx, rx) = std::sync::mpsc::channel();
//!
//! let mut pipeline = OrderedPipeline::new(
//!     &PipelineConfig::new(4),
//!     Vec::<u8>::new,
//!     |buf: &mut Vec<u8>| {
//!         buf.reverse();
//!         Ok(())
//!     },
//!     move |buf: &mut Vec<u8>, result| {
//!         if result.is_ok() {
//!             tx.send(buf.clone()).unwrap();
//!         }
//!     },
//! )
//! .unwrap();
//!
//! for chunk in [b"ab", b"cd", b"ef"] {
//!     let buf = pipeline.fill_item();
//!     buf.clear();
//!     buf.extend_from_slice(chunk);
//!     pipeline.submit().unwrap();
//! }
//! pipeline.drain().unwrap();
//!
//! for chunk in rx.try_iter() {
//!     out.extend_from_slice(&chunk);
//! }
//! assert_eq!(out, b"badcfe");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
mod pipeline;

pub use config::PipelineConfig;
pub use pipeline::{OrderedPipeline, PipelineStats};
