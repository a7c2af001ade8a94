//! # Message
//!
//! The in-memory representation of one protocol block: an ordered sequence of
//! `(key, value)` string fields. Insertion order is preserved and significant;
//! the first field's key decides whether a block is a response or an event.
//! Keys are compared case-insensitively everywhere.

use crate::error::{AmiError, Result};
use std::fmt;
use std::str::FromStr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Line and block terminator on the wire.
pub const TERMINATOR: &str = "\r\n";

/// One protocol block.
///
/// Field rules (applied by [`add`](Message::add)):
/// - keys and values are trimmed on insertion; an empty key is ignored
/// - at most one `ActionID` field exists; setting it replaces any prior one
/// - adding `Action` with no `ActionID` present appends a generated
///   correlation token
/// - adding a key that already exists grows the existing value, separated by
///   the line terminator (multi-valued fields)
/// - a `Timestamp` value that parses as Unix epoch seconds overrides the
///   creation timestamp; anything else is ignored
#[derive(Debug, Clone)]
pub struct Message {
    fields: Vec<(String, String)>,
    responses: Vec<Message>,
    timestamp: SystemTime,
}

impl Default for Message {
    fn default() -> Self {
        Self::new()
    }
}

impl Message {
    /// Create an empty message, capturing the current time.
    pub fn new() -> Self {
        Self {
            fields: Vec::new(),
            responses: Vec::new(),
            timestamp: SystemTime::now(),
        }
    }

    /// Chainable [`add`](Message::add), for building requests.
    pub fn field(mut self, key: &str, value: &str) -> Self {
        self.add(key, value);
        self
    }

    /// Append or merge one field, per the rules on [`Message`].
    pub fn add(&mut self, key: &str, value: &str) {
        let key = key.trim();
        let value = value.trim();
        if key.is_empty() {
            return;
        }

        if key.eq_ignore_ascii_case("ActionID") {
            self.fields
                .retain(|(k, _)| !k.eq_ignore_ascii_case("ActionID"));
            self.fields.push((key.to_string(), value.to_string()));
            return;
        }

        let merged = match self
            .fields
            .iter_mut()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
        {
            Some((_, existing)) => {
                existing.push_str(TERMINATOR);
                existing.push_str(value);
                true
            }
            None => {
                self.fields.push((key.to_string(), value.to_string()));
                false
            }
        };

        if !merged && key.eq_ignore_ascii_case("Action") && self.get("ActionID").is_none() {
            self.fields
                .push(("ActionID".to_string(), Uuid::new_v4().to_string()));
        }

        if key.eq_ignore_ascii_case("Timestamp") {
            if let Some(raw) = self.get("Timestamp") {
                let raw = raw.to_string();
                self.apply_timestamp(&raw);
            }
        }
    }

    /// First value stored under `key`, or `None`.
    pub fn get(&self, key: &str) -> Option<&str> {
        let key = key.trim();
        if key.is_empty() {
            return None;
        }
        self.fields
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// Fields in insertion order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Key and value of the first field, if any.
    pub fn first_field(&self) -> Option<(&str, &str)> {
        self.fields.first().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// True iff any field has key `Response` and value `Success`,
    /// case-insensitive on both.
    pub fn is_success(&self) -> bool {
        self.fields.iter().any(|(k, v)| {
            k.eq_ignore_ascii_case("Response") && v.eq_ignore_ascii_case("Success")
        })
    }

    /// Creation time, or the time carried by a `Timestamp` field.
    pub fn timestamp(&self) -> SystemTime {
        self.timestamp
    }

    /// Child responses accumulated while this message headed a multi-part
    /// reply. Empty for single-part responses and events.
    pub fn responses(&self) -> &[Message] {
        &self.responses
    }

    pub(crate) fn push_response(&mut self, part: Message) {
        self.responses.push(part);
    }

    fn apply_timestamp(&mut self, raw: &str) {
        let Ok(seconds) = raw.trim().parse::<f64>() else {
            return;
        };
        if !seconds.is_finite() {
            return;
        }
        let Ok(magnitude) = Duration::try_from_secs_f64(seconds.abs()) else {
            return;
        };
        let resolved = if seconds >= 0.0 {
            UNIX_EPOCH.checked_add(magnitude)
        } else {
            UNIX_EPOCH.checked_sub(magnitude)
        };
        if let Some(at) = resolved {
            self.timestamp = at;
        }
    }

    /// Decode one block.
    ///
    /// Scans for the CRLF terminator; the first empty line ends the block.
    /// Each preceding line must split into `key: value` on its first `:`.
    ///
    /// # Errors
    /// [`AmiError::MalformedField`] names the offending 1-based line;
    /// [`AmiError::IncompleteMessage`] reports the line that never terminated.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut message = Self::new();
        let mut rest = bytes;
        let mut line_nr = 1usize;

        loop {
            let Some(pos) = find_terminator(rest) else {
                return Err(AmiError::IncompleteMessage { lines: line_nr });
            };
            let line = &rest[..pos];
            rest = &rest[pos + TERMINATOR.len()..];

            if line.is_empty() {
                break;
            }

            let line = String::from_utf8_lossy(line);
            let Some((key, value)) = line.split_once(':') else {
                return Err(AmiError::MalformedField { line: line_nr });
            };
            if key.trim().is_empty() {
                return Err(AmiError::MalformedField { line: line_nr });
            }
            message.add(key, value);
            line_nr += 1;
        }

        Ok(message)
    }

    /// Encode the block: each field as `key: value` CRLF, then one extra
    /// CRLF ending the block. Byte-exact, UTF-8.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.encoded_len());
        for (key, value) in &self.fields {
            out.extend_from_slice(key.as_bytes());
            out.extend_from_slice(b": ");
            out.extend_from_slice(value.as_bytes());
            out.extend_from_slice(TERMINATOR.as_bytes());
        }
        out.extend_from_slice(TERMINATOR.as_bytes());
        out
    }

    fn encoded_len(&self) -> usize {
        let fields: usize = self
            .fields
            .iter()
            .map(|(k, v)| k.len() + v.len() + 4)
            .sum();
        fields + TERMINATOR.len()
    }
}

fn find_terminator(bytes: &[u8]) -> Option<usize> {
    bytes.windows(2).position(|w| w == TERMINATOR.as_bytes())
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.to_bytes()))
    }
}

impl FromStr for Message {
    type Err = AmiError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_bytes(s.as_bytes())
    }
}
