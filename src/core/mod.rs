//! # Core Protocol Components
//!
//! The wire message model, line framing, and record extraction.
//!
//! This module provides the foundation for the protocol: the ordered-field
//! message block, its byte-exact CRLF encoding, and the codec that slices a
//! raw byte stream into lines.
//!
//! ## Wire Format
//! ```text
//! Key: Value\r\n
//! Key: Value\r\n
//! \r\n
//! ```
//!
//! ## Safety
//! - Maximum line length: 16 KiB (prevents unbounded buffering)
//! - Decoding is total over byte content; only structure can fail

pub mod codec;
pub mod message;
pub mod record;
