//! # Protocol Logic
//!
//! Request/response correlation, event dispatch, and authentication.
//!
//! This module holds the protocol brain: everything between a parsed
//! [`Message`](crate::core::message::Message) and the caller that wants an
//! answer or an event callback.
//!
//! ## Components
//! - **Correlation**: `ActionID`-keyed pending and aggregation tables
//! - **Dispatcher**: ordered event subscriptions with first-match routing
//! - **Auth**: login/logoff request builders and the MD5 challenge digest

pub mod auth;
pub mod correlation;
pub mod dispatcher;

pub use correlation::{ActionId, CorrelationEngine};
pub use dispatcher::{EventDispatcher, EventFilter};
