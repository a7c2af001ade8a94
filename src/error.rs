//! # Error Types
//!
//! Comprehensive error handling for the manager-protocol client.
//!
//! This module defines all error variants that can occur while talking to a
//! manager interface, from low-level I/O failures to protocol violations.
//!
//! ## Error Categories
//! - **I/O Errors**: Socket read/write failures
//! - **Codec Errors**: Malformed fields, truncated blocks, oversized lines
//! - **Correlation Errors**: Missing or duplicate action identifiers
//! - **Lifecycle Errors**: Publishing on a dead client, starting twice
//!
//! All errors implement `std::error::Error` for interoperability.
//!
//! ## Example Usage
//! ```rust
//! use ami_client::error::{AmiError, Result};
//! use ami_client::Message;
//!
//! fn parse_block(bytes: &[u8]) -> Result<Message> {
//!     let msg = Message::from_bytes(bytes)?;
//!     Ok(msg)
//! }
//!
//! fn main() {
//!     match parse_block(b"Response: Success\r\n\r\n") {
//!         Ok(msg) => println!("{} field(s)", msg.len()),
//!         Err(AmiError::MalformedField { line }) => eprintln!("bad line {line}"),
//!         Err(e) => eprintln!("{e}"),
//!     }
//! }
//! ```

use std::io;
use thiserror::Error;

/// Error message constants to reduce allocations in error paths.
/// Static strings are borrowed, avoiding heap allocations for common error cases.
pub mod constants {
    /// Dispatcher-related error messages
    pub const ERR_DISPATCHER_WRITE_LOCK: &str = "Failed to acquire write lock on dispatcher";
    pub const ERR_DISPATCHER_READ_LOCK: &str = "Failed to acquire read lock on dispatcher";

    /// Correlation engine errors
    pub const ERR_ENGINE_LOCK: &str = "Failed to acquire correlation state lock";
}

/// The primary error type for all client operations
#[derive(Error, Debug)]
pub enum AmiError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Malformed field on line {line}")]
    MalformedField { line: usize },

    #[error("Unexpected end of message after {lines} line(s)")]
    IncompleteMessage { lines: usize },

    #[error("Line exceeds maximum length ({0} bytes)")]
    OversizedLine(usize),

    #[error("Client not connected")]
    NotConnected,

    #[error("Client already started")]
    AlreadyStarted,

    #[error("An action with id '{0}' is already in flight")]
    DuplicateActionId(String),

    #[error("Request carries no ActionID field")]
    MissingActionId,

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Connection reset: {0}")]
    ConnectionReset(String),

    #[error("Operation timed out")]
    Timeout,

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Custom error: {0}")]
    Custom(String),
}

/// Type alias for Results using AmiError
pub type Result<T> = std::result::Result<T, AmiError>;
