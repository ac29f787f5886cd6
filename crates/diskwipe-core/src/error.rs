//! Error types for the diskwipe core library

use thiserror::Error;

/// Main error type for erase operations
#[derive(Error, Debug)]
pub enum Error {
    /// IO error during seek, write or flush
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The target stream cannot report or change its position
    #[error("Target stream is not seekable: {0}")]
    NotSeekable(String),

    /// A data window passed to recovery does not fit its buffer
    #[error("Invalid range: start {start} + count {count} exceeds buffer length {len}")]
    InvalidRange {
        /// Offset of the window within the buffer
        start: usize,
        /// Number of bytes in the window
        count: usize,
        /// Length of the buffer
        len: usize,
    },

    /// Single-byte recovery could not move the stream past a damaged range
    #[error("Stream stalled during recovery: expected position {expected}, stream is at {actual}")]
    StreamStalled {
        /// Position the stream should have reached
        expected: u64,
        /// Position the stream actually reports
        actual: u64,
    },

    /// The operating system random number generator failed
    #[error("Entropy source failed: {0}")]
    Entropy(String),

    /// Unknown erase mode name
    #[error("Unknown erase mode: {0}")]
    UnknownMode(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type alias using the diskwipe error type
pub type Result<T> = std::result::Result<T, Error>;
