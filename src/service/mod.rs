//! # Client Service
//!
//! The connection-facing layer: the public client facade and the line
//! pipeline feeding it.
//!
//! ## Components
//! - **Client**: `ManagerClient`, publish/login/subscribe/stop over one
//!   shared connection
//! - **Pipeline**: block reassembly and banner discard between the line
//!   codec and the message decoder

pub mod client;
pub mod pipeline;

pub use client::ManagerClient;
