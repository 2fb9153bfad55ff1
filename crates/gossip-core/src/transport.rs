//! Datagram transport trait.
//!
//! Implementations:
//! - UDP: tokio socket (gossip-daemon)
//! - In-memory recorders used by tests

use async_trait::async_trait;
use std::net::SocketAddr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Bind failed on {addr}: {reason}")]
    Bind { addr: String, reason: String },

    #[error("Send to {addr} failed: {reason}")]
    SendFailed { addr: SocketAddr, reason: String },

    #[error("Receive failed: {0}")]
    ReceiveFailed(String),

    #[error("Transport closed")]
    Closed,
}

pub type Result<T> = std::result::Result<T, TransportError>;

/// Unreliable, unordered datagram socket
#[async_trait]
pub trait Transport: Send + Sync {
    /// Address peers reach us on
    fn local_addr(&self) -> SocketAddr;

    /// Send one datagram. Delivery is not guaranteed.
    async fn send_to(&self, data: &[u8], addr: SocketAddr) -> Result<()>;

    /// Receive the next datagram (blocks until one is available)
    async fn recv_from(&self) -> Result<(Vec<u8>, SocketAddr)>;
}
