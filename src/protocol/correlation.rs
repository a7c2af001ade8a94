//! # Correlation Engine
//!
//! Matches inbound response blocks to the requests that caused them, keyed by
//! the `ActionID` correlation token. A published request registers a pending
//! entry holding a oneshot sender; the router task feeds every parsed message
//! through [`CorrelationEngine::route`], which resolves single-part responses
//! immediately and aggregates multi-part responses until their terminating
//! `Event: ...Complete` block arrives.
//!
//! Both tables live behind one mutex. Only the router task mutates an open
//! aggregation, so the head's child list needs no lock of its own.

use crate::core::message::Message;
use crate::error::{constants, AmiError, Result};
use crate::utils::lock_ignore_poison;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Mutex;
use tokio::sync::oneshot;

/// Correlation token. Equality and hashing ignore ASCII case, matching the
/// wire protocol's case-insensitive keys and values.
#[derive(Debug, Clone)]
pub struct ActionId(String);

impl ActionId {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl PartialEq for ActionId {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

impl Eq for ActionId {}

impl Hash for ActionId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for byte in self.0.bytes() {
            state.write_u8(byte.to_ascii_lowercase());
        }
    }
}

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

type ResponseSender = oneshot::Sender<Result<Message>>;

/// A multi-part response being collected: the head message grows a child per
/// interim part until the terminating part resolves the sender.
struct Aggregation {
    head: Message,
    tx: ResponseSender,
}

#[derive(Default)]
struct EngineState {
    pending: HashMap<ActionId, ResponseSender>,
    aggregations: HashMap<ActionId, Aggregation>,
}

/// Pending-request and aggregation tables for one connection.
#[derive(Default)]
pub struct CorrelationEngine {
    state: Mutex<EngineState>,
}

impl CorrelationEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a pending request under `id` and hand back the receiver its
    /// response will resolve.
    ///
    /// # Errors
    /// [`AmiError::DuplicateActionId`] if `id` is already in flight, whether
    /// pending or mid-aggregation.
    pub fn register(&self, id: &ActionId) -> Result<oneshot::Receiver<Result<Message>>> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| AmiError::Custom(constants::ERR_ENGINE_LOCK.to_string()))?;

        if state.pending.contains_key(id) || state.aggregations.contains_key(id) {
            return Err(AmiError::DuplicateActionId(id.as_str().to_string()));
        }

        let (tx, rx) = oneshot::channel();
        state.pending.insert(id.clone(), tx);
        Ok(rx)
    }

    /// Forget a pending registration that never made it onto the wire.
    pub fn discard(&self, id: &ActionId) {
        let mut state = lock_ignore_poison(&self.state);
        state.pending.remove(id);
    }

    /// Offer one parsed message to the correlation tables.
    ///
    /// A message whose first field is `Response` and whose `ActionID` matches
    /// a pending request becomes the head of a new aggregation; a message
    /// whose `ActionID` matches an open aggregation advances it. Anything
    /// else, including every message without an `ActionID`, is left for the
    /// dispatcher alone.
    pub fn route(&self, message: &Message) -> Result<()> {
        let Some(token) = message.get("ActionID") else {
            return Ok(());
        };
        let token = ActionId::new(token);

        let mut state = self
            .state
            .lock()
            .map_err(|_| AmiError::Custom(constants::ERR_ENGINE_LOCK.to_string()))?;

        let heads_response = message
            .first_field()
            .is_some_and(|(key, _)| key.eq_ignore_ascii_case("Response"));

        if heads_response {
            if let Some(tx) = state.pending.remove(&token) {
                let aggregation = Aggregation {
                    head: message.clone(),
                    tx,
                };
                Self::step(&mut state.aggregations, token, aggregation, message, true);
                return Ok(());
            }
        }

        if let Some(aggregation) = state.aggregations.remove(&token) {
            Self::step(&mut state.aggregations, token, aggregation, message, false);
        }
        Ok(())
    }

    /// One aggregation step for `part` against an open aggregation.
    ///
    /// A part with neither `EventList` nor `Event` is a complete single-part
    /// response. A part whose first field is `Event` with a value containing
    /// `Complete` terminates the aggregation. Any other part is interim and
    /// is appended to the head's children, unless it is the head itself.
    fn step(
        aggregations: &mut HashMap<ActionId, Aggregation>,
        token: ActionId,
        mut aggregation: Aggregation,
        part: &Message,
        part_is_head: bool,
    ) {
        let single_part = part.get("EventList").is_none() && part.get("Event").is_none();
        let terminating = part.first_field().is_some_and(|(key, value)| {
            key.eq_ignore_ascii_case("Event") && value.to_ascii_lowercase().contains("complete")
        });

        if single_part || terminating {
            let _ = aggregation.tx.send(Ok(aggregation.head));
            return;
        }

        if !part_is_head {
            aggregation.head.push_response(part.clone());
        }
        aggregations.insert(token, aggregation);
    }

    /// Resolve every outstanding waiter with an error and drop all state.
    ///
    /// With a `reason`, waiters see [`AmiError::ConnectionReset`] carrying the
    /// triggering error's text; without one they see the cancellation signal
    /// [`AmiError::ConnectionClosed`]. Safe to call repeatedly and from
    /// teardown paths that cannot fail.
    pub fn abort_all(&self, reason: Option<&str>) {
        let mut state = lock_ignore_poison(&self.state);
        for (_, tx) in state.pending.drain() {
            let _ = tx.send(Err(teardown_error(reason)));
        }
        for (_, aggregation) in state.aggregations.drain() {
            let _ = aggregation.tx.send(Err(teardown_error(reason)));
        }
    }
}

fn teardown_error(reason: Option<&str>) -> AmiError {
    match reason {
        Some(text) => AmiError::ConnectionReset(text.to_string()),
        None => AmiError::ConnectionClosed,
    }
}
