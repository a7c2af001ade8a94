//! # AMI Client
//!
//! Asynchronous client engine for the Asterisk Manager Interface: a CRLF
//! line-oriented, `Key: Value` block protocol over TCP. The crate handles
//! connection establishment, login (MD5 challenge or clear text), request
//! publishing with `ActionID` correlation, multi-part response aggregation,
//! and unsolicited event dispatch.
//!
//! ## Components
//! - **Core**: the [`Message`] block model, CRLF line codec, and typed
//!   record extraction
//! - **Protocol**: correlation engine, event dispatcher, authentication
//! - **Service**: the [`ManagerClient`] facade and its line pipeline
//! - **Transport**: TCP connect with timeout
//! - **Config**: TOML/env configuration with validation
//!
//! ## Quick Start
//! ```ignore
//! use ami_client::{ManagerClient, ManagerConfig, Message};
//!
//! let config = ManagerConfig::from_file("manager.toml")?;
//! let client = ManagerClient::connect(&config.connection).await?;
//! client.start()?;
//!
//! if client.login("admin", "secret", true).await? {
//!     let response = client
//!         .publish(Message::new().field("Action", "CoreStatus"))
//!         .await?;
//!     println!("{}", response);
//! }
//! client.stop().await;
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod protocol;
pub mod service;
pub mod transport;
pub mod utils;

pub use crate::config::{ConnectionConfig, LoggingConfig, ManagerConfig};
pub use crate::core::codec::LineCodec;
pub use crate::core::message::Message;
pub use crate::core::record::RecordMap;
pub use crate::error::{AmiError, Result};
pub use crate::protocol::auth;
pub use crate::protocol::correlation::{ActionId, CorrelationEngine};
pub use crate::protocol::dispatcher::{EventDispatcher, EventFilter};
pub use crate::service::client::ManagerClient;
