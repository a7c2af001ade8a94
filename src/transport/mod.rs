//! # Transport Layer
//!
//! Connection establishment. The rest of the crate is transport-agnostic:
//! the client consumes any `AsyncRead + AsyncWrite` stream via
//! [`ManagerClient::from_stream`](crate::service::client::ManagerClient::from_stream).

pub mod tcp;
