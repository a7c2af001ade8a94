//! # Line Codec
//!
//! [`tokio_util`] decoder splitting the inbound byte stream into lines on the
//! CRLF terminator. A lone `\n` or `\r` is ordinary line content. Decoded
//! lines carry neither terminator byte.
//!
//! The decoder remembers how far it has scanned, so a line arriving in many
//! small reads is scanned once. Lines are capped at [`MAX_LINE_LENGTH`] to
//! keep a terminator-less peer from growing the buffer without bound.

use crate::error::AmiError;
use bytes::BytesMut;
use tokio_util::codec::Decoder;

/// Upper bound on a single line, in bytes.
pub const MAX_LINE_LENGTH: usize = 16 * 1024;

/// Stateful CRLF line decoder for [`FramedRead`](tokio_util::codec::FramedRead).
#[derive(Debug, Default)]
pub struct LineCodec {
    next_index: usize,
}

impl LineCodec {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Decoder for LineCodec {
    type Item = String;
    type Error = AmiError;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<String>, AmiError> {
        let found = buf[self.next_index..]
            .windows(2)
            .position(|window| window == b"\r\n");

        match found {
            Some(offset) => {
                let end = self.next_index + offset;
                let line = buf.split_to(end + 2);
                self.next_index = 0;
                Ok(Some(String::from_utf8_lossy(&line[..end]).into_owned()))
            }
            None if buf.len() > MAX_LINE_LENGTH => Err(AmiError::OversizedLine(buf.len())),
            None => {
                // a trailing \r may pair with the next chunk's \n
                self.next_index = buf.len().saturating_sub(1);
                Ok(None)
            }
        }
    }
}
