//! # Error Types
//!
//! Error handling for the framing and P2P codec layers.
//!
//! ## Error Categories
//! - **Queue Errors**: dequeuing a block that has not been completed yet
//! - **Codec Errors**: truncated or inconsistent P2P binary messages
//! - **I/O Errors**: failures of a source being streamed into a data message
//! - **Configuration Errors**: invalid or unreadable settings
//!
//! Partial frames are never an error. The notification-server pool keeps buffering
//! until a block is complete, so "no data yet" is observable through
//! `MessagePool::has_message` rather than through this type.
//!
//! ## Example Usage
//! ```rust
//! use msnp_wire::core::pool::{MessagePool, NsMessagePool};
//! use msnp_wire::error::ProtocolError;
//!
//! let mut pool = NsMessagePool::new();
//! match pool.next_message() {
//!     Err(ProtocolError::EmptyQueue) => {}
//!     other => panic!("unexpected: {other:?}"),
//! }
//! ```

use std::io;
use thiserror::Error;

/// Error message constants to reduce allocations in error paths.
pub mod constants {
    /// Configuration errors
    pub const ERR_CONFIG_OPEN: &str = "Failed to open config file";
    pub const ERR_CONFIG_READ: &str = "Failed to read config file";
    pub const ERR_CONFIG_PARSE: &str = "Failed to parse TOML";
    pub const ERR_CONFIG_SERIALIZE: &str = "Failed to serialize config";
    pub const ERR_CONFIG_WRITE: &str = "Failed to write config file";

    /// Handshake errors
    pub const ERR_HANDSHAKE_RANDOM: &str = "Failed to gather random bytes for handshake GUID";
}

// ProtocolError is the primary error type for all codec operations
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Message queue is empty")]
    EmptyQueue,

    #[error("Malformed message: expected at least {expected} bytes, got {actual}")]
    MalformedMessage { expected: usize, actual: usize },

    #[error("Invalid handshake marker")]
    InvalidMarker,

    #[error("Length prefix mismatch: declared {declared} bytes, frame carries {actual}")]
    LengthMismatch { declared: usize, actual: usize },

    #[error("Frame too large: {0} bytes")]
    OversizedFrame(usize),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Random source error: {0}")]
    RandomError(String),
}

/// Type alias for Results using ProtocolError
pub type Result<T> = std::result::Result<T, ProtocolError>;
