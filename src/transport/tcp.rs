//! # TCP Transport
//!
//! Plain TCP connection establishment with a bounded connect.

use crate::config::ConnectionConfig;
use crate::error::Result;
use crate::utils::timeout::with_timeout_error;
use tokio::net::TcpStream;
use tracing::{info, instrument};

/// Connect to the configured address, bounded by the configured connect
/// timeout.
#[instrument(skip(config), fields(address = %config.address))]
pub async fn connect(config: &ConnectionConfig) -> Result<TcpStream> {
    let stream = with_timeout_error(
        async { Ok(TcpStream::connect(&config.address).await?) },
        config.connect_timeout,
    )
    .await?;
    info!(address = %config.address, "connected");
    Ok(stream)
}
