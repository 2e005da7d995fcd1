//! # OxiBlock Codecs
//!
//! Reference implementations of [`BlockCodec`](oxiblock_core::BlockCodec).
//!
//! | Codec | Output | Decode | Independent blocks |
//! |-------|--------|--------|--------------------|
//! | [`StoreCodec`] | input bytes verbatim | yes | yes |
//! | [`RleCodec`] | length-prefixed run pairs, optional end mark | yes | yes |
//! | [`Crc32Codec`] | 4-byte big-endian CRC-32 at the end | no | no |
//!
//! ## Example
//!
//! ```rust
//! use oxiblock_codecs::RleCodec;
//! use oxiblock_core::BlockCodec;
//!
//! let mut codec = RleCodec::new(16);
//! let mut dst = vec![0u8; codec.max_encoded_len(16)];
//! let n = codec.encode_block(b"aaaa", &mut dst).unwrap();
//! assert_eq!(&dst[..n], &[2, 0, 0, 0, 4, b'a']);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod checksum;
pub mod rle;
pub mod store;

pub use checksum::{Crc32, Crc32Codec};
pub use rle::RleCodec;
pub use store::StoreCodec;
