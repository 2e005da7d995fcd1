//! Error types for OxiBlock operations.
//!
//! A single error type covers the stream adapter, the codec driver and the
//! ordered pipeline. Codec failures are fatal to the stream that raised them
//! but never to a pipeline; see the variant docs for the exact propagation.

use std::fmt;
use std::io;
use thiserror::Error;

/// Which side of a codec a stream drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamMode {
    /// Logical writes in, compressed bytes out to the sink.
    Compress,
    /// Compressed bytes in from the source, logical reads out.
    Decompress,
}

impl fmt::Display for StreamMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamMode::Compress => f.write_str("compress"),
            StreamMode::Decompress => f.write_str("decompress"),
        }
    }
}

/// The main error type for OxiBlock operations.
#[derive(Debug, Error)]
pub enum OxiBlockError {
    /// I/O error from the underlying sink or source.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The codec reported a failure for the current block.
    #[error("Codec {codec} failed: {message}")]
    Codec {
        /// Name of the failing codec.
        codec: &'static str,
        /// Description reported by the codec.
        message: String,
    },

    /// A block or ring size below the codec minimum was requested.
    #[error("Capacity too small: requested {requested} bytes, minimum is {minimum}")]
    Capacity {
        /// Requested size.
        requested: usize,
        /// Smallest size the codec accepts.
        minimum: usize,
    },

    /// An operation was called that the stream's mode does not allow.
    #[error("Cannot {operation} on a {mode} stream")]
    ModeViolation {
        /// Mode the stream was opened in.
        mode: StreamMode,
        /// The rejected operation.
        operation: &'static str,
    },

    /// Cancellation was observed before touching the sink.
    #[error("Operation cancelled")]
    Cancelled,

    /// The stream previously failed and refuses further reads or writes.
    #[error("Stream is in a failed state after an earlier error")]
    StreamFailed,

    /// The stream already emitted its terminal block or was closed.
    #[error("Stream is already finished")]
    Finished,

    /// Malformed compressed input.
    #[error("Corrupted data at offset {offset}: {message}")]
    CorruptedData {
        /// Physical offset where corruption was detected.
        offset: u64,
        /// Description of the corruption.
        message: String,
    },

    /// The codec does not support the requested operation.
    #[error("Codec {codec} does not support {operation}")]
    UnsupportedOperation {
        /// Name of the codec.
        codec: &'static str,
        /// The unsupported operation.
        operation: &'static str,
    },

    /// A pipeline worker panicked while executing a unit.
    #[error("Worker panicked while executing unit {sequence}")]
    WorkerPanicked {
        /// Sequence index of the unit.
        sequence: u64,
    },

    /// Invalid configuration value.
    #[error("Invalid configuration: {message}")]
    Config {
        /// Description of the problem.
        message: String,
    },
}

/// Result type alias for OxiBlock operations.
pub type Result<T> = std::result::Result<T, OxiBlockError>;

impl OxiBlockError {
    /// Create a codec failure error.
    pub fn codec(codec: &'static str, message: impl Into<String>) -> Self {
        Self::Codec {
            codec,
            message: message.into(),
        }
    }

    /// Create a capacity error.
    pub fn capacity(requested: usize, minimum: usize) -> Self {
        Self::Capacity { requested, minimum }
    }

    /// Create a mode violation error.
    pub fn mode_violation(mode: StreamMode, operation: &'static str) -> Self {
        Self::ModeViolation { mode, operation }
    }

    /// Create a corrupted data error.
    pub fn corrupted(offset: u64, message: impl Into<String>) -> Self {
        Self::CorruptedData {
            offset,
            message: message.into(),
        }
    }

    /// Create an unsupported operation error.
    pub fn unsupported(codec: &'static str, operation: &'static str) -> Self {
        Self::UnsupportedOperation { codec, operation }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Whether this error leaves the stream that raised it unusable.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Self::Cancelled | Self::ModeViolation { .. } | Self::Config { .. } | Self::Finished
        )
    }
}

impl From<OxiBlockError> for io::Error {
    fn from(err: OxiBlockError) -> Self {
        match err {
            OxiBlockError::Io(inner) => inner,
            OxiBlockError::ModeViolation { .. } | OxiBlockError::UnsupportedOperation { .. } => {
                io::Error::new(io::ErrorKind::Unsupported, err)
            }
            OxiBlockError::CorruptedData { .. } => io::Error::new(io::ErrorKind::InvalidData, err),
            OxiBlockError::Capacity { .. } | OxiBlockError::Config { .. } => {
                io::Error::new(io::ErrorKind::InvalidInput, err)
            }
            other => io::Error::other(other),
        }
    }
}
