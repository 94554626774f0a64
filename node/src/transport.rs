use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use tokio::net::UdpSocket;
use tokio::time::timeout;

/// Largest datagram accepted; one protocol message per datagram.
const MAX_DATAGRAM: usize = 64 * 1024;

/// Datagram transport seam. `recv` resolves to `Ok(None)` when nothing
/// arrived within `wait`; the caller treats that as its stabilization tick.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    async fn send(&self, to: SocketAddr, payload: Vec<u8>) -> io::Result<()>;
    async fn recv(&self, wait: Duration) -> io::Result<Option<(Vec<u8>, SocketAddr)>>;
}

pub struct UdpTransport {
    socket: UdpSocket,
}

impl UdpTransport {
    pub async fn bind(addr: SocketAddr) -> io::Result<Self> {
        let socket = UdpSocket::bind(addr).await?;
        Ok(UdpTransport { socket })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }
}

#[async_trait]
impl Transport for UdpTransport {
    async fn send(&self, to: SocketAddr, payload: Vec<u8>) -> io::Result<()> {
        self.socket.send_to(&payload, to).await?;
        Ok(())
    }

    async fn recv(&self, wait: Duration) -> io::Result<Option<(Vec<u8>, SocketAddr)>> {
        let mut buf = vec![0u8; MAX_DATAGRAM];
        match timeout(wait, self.socket.recv_from(&mut buf)).await {
            Ok(Ok((len, from))) => {
                buf.truncate(len);
                Ok(Some((buf, from)))
            }
            Ok(Err(e)) => Err(e),
            Err(_) => Ok(None),
        }
    }
}
