//! # Event Dispatcher
//!
//! Routes unsolicited event messages to subscribed handlers. A subscription
//! pairs an [`EventFilter`] with an async handler; for each event the first
//! subscription whose filter matches, in registration order, runs. Handler
//! failures are logged and contained so one bad handler cannot stall the
//! read pipeline.

use crate::core::message::Message;
use crate::error::{constants, AmiError, Result};
use futures::future::BoxFuture;
use std::future::Future;
use std::sync::{Arc, RwLock};
use tracing::warn;

type EventHandler = dyn Fn(Message) -> BoxFuture<'static, Result<()>> + Send + Sync;

/// Conjunction of field requirements against an event message.
///
/// Every `(key, value)` pair must be present on the message, with both key
/// and value compared case-insensitively. An empty filter matches every
/// event, giving a catch-all subscription.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    fields: Vec<(String, String)>,
}

impl EventFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Require `key` to carry `value`.
    pub fn field(mut self, key: &str, value: &str) -> Self {
        self.fields.push((key.to_string(), value.to_string()));
        self
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            fields: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// True iff every required pair is present on `message`.
    pub fn matches(&self, message: &Message) -> bool {
        self.fields.iter().all(|(key, value)| {
            message
                .get(key)
                .is_some_and(|found| found.eq_ignore_ascii_case(value))
        })
    }
}

struct Subscription {
    filter: EventFilter,
    handler: Arc<EventHandler>,
}

/// First-match event router.
pub struct EventDispatcher {
    subscriptions: RwLock<Vec<Subscription>>,
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self {
            subscriptions: RwLock::new(Vec::new()),
        }
    }

    /// Append a subscription. Later subscriptions only see events no earlier
    /// filter claimed.
    pub fn subscribe<F, Fut>(&self, filter: EventFilter, handler: F) -> Result<()>
    where
        F: Fn(Message) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let handler: Arc<EventHandler> = Arc::new(move |message| Box::pin(handler(message)));
        let mut subscriptions = self
            .subscriptions
            .write()
            .map_err(|_| AmiError::Custom(constants::ERR_DISPATCHER_WRITE_LOCK.to_string()))?;
        subscriptions.push(Subscription { filter, handler });
        Ok(())
    }

    /// Drop every subscription.
    pub fn clear(&self) -> Result<()> {
        let mut subscriptions = self
            .subscriptions
            .write()
            .map_err(|_| AmiError::Custom(constants::ERR_DISPATCHER_WRITE_LOCK.to_string()))?;
        subscriptions.clear();
        Ok(())
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions.read().map_or(0, |subs| subs.len())
    }

    /// Run the first matching handler for `message`, if any.
    ///
    /// The handler executes outside the subscription lock, so handlers may
    /// themselves subscribe. A handler error is logged, not propagated.
    pub async fn dispatch(&self, message: &Message) -> Result<()> {
        let matched = {
            let subscriptions = self
                .subscriptions
                .read()
                .map_err(|_| AmiError::Custom(constants::ERR_DISPATCHER_READ_LOCK.to_string()))?;
            subscriptions
                .iter()
                .find(|sub| sub.filter.matches(message))
                .map(|sub| Arc::clone(&sub.handler))
        };

        if let Some(handler) = matched {
            if let Err(e) = handler(message.clone()).await {
                warn!(error = %e, event = ?message.get("Event"), "event handler failed");
            }
        }
        Ok(())
    }
}
