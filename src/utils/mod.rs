//! # Utility Modules
//!
//! Supporting utilities for logging, timing, and synchronization.
//!
//! This module provides reusable utilities used throughout the client implementation.
//!
//! ## Components
//! - **Logging**: Structured logging configuration
//! - **Timeout**: Async timeout wrappers and default durations
//! - **Sync**: Poison-tolerant lock helpers for teardown paths

pub mod logging;
pub mod sync;
pub mod timeout;

// Re-export helpers used across the crate
pub use sync::lock_ignore_poison;
