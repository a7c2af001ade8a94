//! # Record Mapping
//!
//! Declarative extraction of typed records from [`Message`] fields. A
//! [`RecordMap`] pairs field keys with setters on a target struct; applying
//! it to a message parses each present field into the setter's value type.
//! Absent fields and values that fail to parse leave the default in place.
//!
//! ```
//! use ami_client::core::message::Message;
//! use ami_client::core::record::RecordMap;
//!
//! #[derive(Default)]
//! struct PeerStatus {
//!     peer: String,
//!     channel_type: String,
//!     time: i64,
//! }
//!
//! let map = RecordMap::new()
//!     .field("Peer", |r: &mut PeerStatus, v| r.peer = v)
//!     .field("ChannelType", |r: &mut PeerStatus, v| r.channel_type = v)
//!     .field("Time", |r: &mut PeerStatus, v| r.time = v);
//!
//! let msg = Message::new()
//!     .field("Event", "PeerStatus")
//!     .field("Peer", "SIP/100")
//!     .field("ChannelType", "SIP")
//!     .field("Time", "42");
//! let status = map.to_record(&msg);
//! assert_eq!(status.peer, "SIP/100");
//! assert_eq!(status.time, 42);
//! ```

use crate::core::message::Message;
use std::str::FromStr;

type Setter<T> = Box<dyn Fn(&mut T, &str) + Send + Sync>;

/// Mapping from message field keys to typed setters on `T`.
pub struct RecordMap<T> {
    entries: Vec<(String, Setter<T>)>,
}

impl<T> Default for RecordMap<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> RecordMap<T> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Bind `key` to `assign`. The field value is parsed with [`FromStr`]
    /// into `V` before the setter runs; a parse failure skips the setter.
    pub fn field<V, F>(mut self, key: &str, assign: F) -> Self
    where
        V: FromStr + 'static,
        F: Fn(&mut T, V) + Send + Sync + 'static,
    {
        let setter: Setter<T> = Box::new(move |record, raw| {
            if let Ok(value) = raw.parse::<V>() {
                assign(record, value);
            }
        });
        self.entries.push((key.to_string(), setter));
        self
    }

    /// Number of bound fields.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Build a `T` from `message`, starting at `T::default()`.
    pub fn to_record(&self, message: &Message) -> T
    where
        T: Default,
    {
        let mut record = T::default();
        for (key, setter) in &self.entries {
            if let Some(value) = message.get(key) {
                setter(&mut record, value);
            }
        }
        record
    }
}
