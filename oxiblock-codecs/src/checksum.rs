//! CRC-32 as a hash-update codec.
//!
//! [`Crc32Codec`] consumes blocks without producing output and emits the
//! 4-byte big-endian CRC-32 of everything it saw from its terminal path.
//! The running value carries across blocks, so it cannot be split across
//! workers.

use oxiblock_core::error::Result;
use oxiblock_core::traits::BlockCodec;

/// Length of the digest written by the terminal block.
pub const DIGEST_LEN: usize = 4;

/// CRC-32 lookup table (polynomial 0xEDB88320, reflected).
const CRC32_TABLE: [u32; 256] = {
    let mut table = [0u32; 256];
    let mut i = 0usize;
    while i < 256 {
        let mut crc = i as u32;
        let mut j = 0;
        while j < 8 {
            if crc & 1 != 0 {
                crc = (crc >> 1) ^ 0xEDB88320;
            } else {
                crc >>= 1;
            }
            j += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
};

/// CRC-32 calculator (ISO 3309, as used by ZIP and GZIP).
///
/// ```
/// use oxiblock_codecs::Crc32;
///
/// let mut crc = Crc32::new();
/// crc.update(b"Hello, ");
/// crc.update(b"World!");
/// assert_eq!(crc.finalize(), 0xEC4AC3D0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Crc32 {
    crc: u32,
}

impl Crc32 {
    /// Create a new CRC-32 calculator.
    pub fn new() -> Self {
        Self { crc: 0xFFFFFFFF }
    }

    /// Reset to the initial state.
    pub fn reset(&mut self) {
        self.crc = 0xFFFFFFFF;
    }

    /// Feed more data.
    #[inline]
    pub fn update(&mut self, data: &[u8]) {
        let mut crc = self.crc;
        for &byte in data {
            crc = CRC32_TABLE[((crc ^ byte as u32) & 0xFF) as usize] ^ (crc >> 8);
        }
        self.crc = crc;
    }

    /// Current CRC value.
    #[inline]
    pub fn value(&self) -> u32 {
        self.crc ^ 0xFFFFFFFF
    }

    /// Finalize and return the CRC value.
    #[inline]
    pub fn finalize(self) -> u32 {
        self.value()
    }

    /// Compute the CRC-32 of a slice in one call.
    pub fn compute(data: &[u8]) -> u32 {
        let mut crc = Self::new();
        crc.update(data);
        crc.finalize()
    }
}

impl Default for Crc32 {
    fn default() -> Self {
        Self::new()
    }
}

/// Hash-update codec producing a CRC-32 digest.
#[derive(Debug, Clone)]
pub struct Crc32Codec {
    block_size: usize,
    crc: Crc32,
}

impl Crc32Codec {
    /// Default block size (64 KB).
    pub const DEFAULT_BLOCK_SIZE: usize = 64 * 1024;

    /// Create a CRC-32 codec hashing `block_size` bytes per call.
    pub fn new(block_size: usize) -> Self {
        Self {
            block_size,
            crc: Crc32::new(),
        }
    }

    /// CRC of the bytes hashed so far.
    pub fn value(&self) -> u32 {
        self.crc.value()
    }
}

impl Default for Crc32Codec {
    fn default() -> Self {
        Self::new(Self::DEFAULT_BLOCK_SIZE)
    }
}

impl BlockCodec for Crc32Codec {
    fn name(&self) -> &'static str {
        "crc32"
    }

    fn block_size(&self) -> usize {
        self.block_size
    }

    fn max_encoded_len(&self, _input_len: usize) -> usize {
        DIGEST_LEN
    }

    fn encode_block(&mut self, src: &[u8], _dst: &mut [u8]) -> Result<usize> {
        self.crc.update(src);
        Ok(0)
    }

    fn encode_final(&mut self, src: &[u8], dst: &mut [u8]) -> Result<usize> {
        self.crc.update(src);
        dst[..DIGEST_LEN].copy_from_slice(&self.crc.value().to_be_bytes());
        self.crc.reset();
        Ok(DIGEST_LEN)
    }

    fn independent_blocks(&self) -> bool {
        false
    }

    fn release(&mut self) {
        self.crc.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxiblock_core::error::OxiBlockError;

    #[test]
    fn test_crc32_known_values() {
        assert_eq!(Crc32::compute(b""), 0);
        assert_eq!(Crc32::compute(b"123456789"), 0xCBF43926);
        assert_eq!(
            Crc32::compute(b"The quick brown fox jumps over the lazy dog"),
            0x414FA339
        );
    }

    #[test]
    fn test_codec_emits_digest_only_at_end() {
        let mut codec = Crc32Codec::new(4);
        let mut dst = [0u8; DIGEST_LEN];

        assert_eq!(codec.encode_block(b"1234", &mut dst).unwrap(), 0);
        assert_eq!(codec.encode_block(b"5678", &mut dst).unwrap(), 0);
        assert_eq!(codec.encode_final(b"9", &mut dst).unwrap(), 4);
        assert_eq!(dst, 0xCBF43926u32.to_be_bytes());
        assert_eq!(codec.value(), 0);
    }

    #[test]
    fn test_decode_unsupported() {
        let mut codec = Crc32Codec::default();
        assert!(!codec.independent_blocks());
        let err = codec.decode_block(&[0; 4], &mut [0; 4], true).unwrap_err();
        assert!(matches!(
            err,
            OxiBlockError::UnsupportedOperation { codec: "crc32", .. }
        ));
    }
}
