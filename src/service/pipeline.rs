//! # Block Assembly
//!
//! Turns the decoded line stream back into complete blocks for the message
//! decoder. The remote side greets with a banner line before any field
//! traffic; any line containing the banner text is discarded wherever it
//! appears, since reconnect-through-proxy setups can replay it mid-stream.

use crate::core::message::TERMINATOR;

/// Greeting text sent by the remote side, without its version suffix
/// (the full line reads like `Asterisk Call Manager/5.0.2`).
pub const BANNER_TEXT: &str = "Asterisk Call Manager";

/// Accumulates lines until a blank line closes the block.
#[derive(Debug, Default)]
pub struct BlockAssembler {
    buf: String,
}

impl BlockAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one decoded line (without its terminator).
    ///
    /// Returns a complete block, re-terminated for the message decoder, when
    /// `line` is the blank line closing a non-empty block. Banner lines and
    /// blank lines outside a block produce nothing.
    pub fn push_line(&mut self, line: &str) -> Option<String> {
        if line.is_empty() {
            if self.buf.is_empty() {
                return None;
            }
            let mut block = std::mem::take(&mut self.buf);
            block.push_str(TERMINATOR);
            return Some(block);
        }

        if line.contains(BANNER_TEXT) {
            return None;
        }

        self.buf.push_str(line);
        self.buf.push_str(TERMINATOR);
        None
    }
}
