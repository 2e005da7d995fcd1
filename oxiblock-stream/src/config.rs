//! Stream adapter configuration.

use oxiblock_core::error::{OxiBlockError, Result};
use serde::{Deserialize, Serialize};

/// Stream adapter configuration parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Minimum size of the compressed-input ring in decompress mode.
    ///
    /// The ring always holds at least one maximally encoded block.
    pub input_buffer_size: usize,
}

impl StreamConfig {
    /// Default compressed-input ring size (64 KB).
    pub const DEFAULT_INPUT_BUFFER: usize = 64 * 1024;

    /// Create the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the compressed-input ring size.
    pub fn with_input_buffer_size(mut self, size: usize) -> Self {
        self.input_buffer_size = size;
        self
    }

    /// Check the configuration for values a stream cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.input_buffer_size == 0 {
            return Err(OxiBlockError::config("input buffer size must be non-zero"));
        }
        Ok(())
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            input_buffer_size: Self::DEFAULT_INPUT_BUFFER,
        }
    }
}
