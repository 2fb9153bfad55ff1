//! UDP implementation of the datagram [`Transport`].

use async_trait::async_trait;
use gossip_core::protocol::MAX_PACKET_SIZE;
use gossip_core::transport::{Result, Transport, TransportError};
use std::net::SocketAddr;
use tokio::net::UdpSocket;
use tracing::info;

/// A bound UDP socket.
pub struct UdpTransport {
    socket: UdpSocket,
    local: SocketAddr,
}

impl UdpTransport {
    /// Bind to `addr`. Port 0 picks a free port.
    pub async fn bind(addr: SocketAddr) -> Result<Self> {
        let socket = UdpSocket::bind(addr).await.map_err(|e| TransportError::Bind {
            addr: addr.to_string(),
            reason: e.to_string(),
        })?;
        let local = socket.local_addr().map_err(|e| TransportError::Bind {
            addr: addr.to_string(),
            reason: e.to_string(),
        })?;
        info!("Listening on udp://{}", local);
        Ok(Self { socket, local })
    }
}

#[async_trait]
impl Transport for UdpTransport {
    fn local_addr(&self) -> SocketAddr {
        self.local
    }

    async fn send_to(&self, data: &[u8], addr: SocketAddr) -> Result<()> {
        self.socket
            .send_to(data, addr)
            .await
            .map(|_| ())
            .map_err(|e| TransportError::SendFailed {
                addr,
                reason: e.to_string(),
            })
    }

    async fn recv_from(&self) -> Result<(Vec<u8>, SocketAddr)> {
        let mut buf = vec![0u8; MAX_PACKET_SIZE];
        let (len, from) = self
            .socket
            .recv_from(&mut buf)
            .await
            .map_err(|e| TransportError::ReceiveFailed(e.to_string()))?;
        buf.truncate(len);
        Ok((buf, from))
    }
}
