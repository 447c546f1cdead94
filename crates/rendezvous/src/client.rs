//! The joining peer's half of the bootstrap handshake.
//!
//! Grounded on `bootstrap/bootstrap.go`'s `Bootstrap`: one UDP socket
//! connected to the well-known rendezvous address, `Register`/`Unregister`
//! fire-and-wait-for-reply. The original spawns a background goroutine that
//! calls a reply callback; here the reply is simply awaited inline, since
//! each registration is one request and each has exactly one reply.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::time::timeout;
use tracing::warn;

use crate::error::{Error, Result};
use crate::protocol::{encode_register, encode_unregister, parse_reply, PeerAddr, Reply, RegisterStatus};

const REPLY_TIMEOUT: Duration = Duration::from_secs(5);
const RECV_BUF_SIZE: usize = 1024;

pub struct BootstrapClient {
    socket: UdpSocket,
}

impl BootstrapClient {
    pub async fn connect(rendezvous_addr: SocketAddr) -> Result<Self> {
        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        socket.connect(rendezvous_addr).await?;
        Ok(Self { socket })
    }

    /// Registers `addr` under `username`; returns the success status and
    /// any existing peers the server handed back (first one is the seed).
    pub async fn register(&self, addr: SocketAddr, username: &str) -> Result<(RegisterStatus, Vec<PeerAddr>)> {
        let msg = encode_register(&addr.ip().to_string(), addr.port(), username);
        self.socket.send(msg.as_bytes()).await?;

        match self.recv_reply().await? {
            Reply::RegisterOk { status, peers } => {
                if !status.is_success() {
                    return Err(Error::Rejected(status));
                }
                Ok((status, peers))
            }
            Reply::UnregisterOk { .. } => Err(Error::Malformed("expected REGOK, got UNROK".into())),
        }
    }

    pub async fn unregister(&self, addr: SocketAddr, username: &str) -> Result<()> {
        let msg = encode_unregister(&addr.ip().to_string(), addr.port(), username);
        self.socket.send(msg.as_bytes()).await?;

        match self.recv_reply().await? {
            Reply::UnregisterOk { status } if status == crate::protocol::UnregisterStatus::Ok => Ok(()),
            Reply::UnregisterOk { .. } => {
                warn!("unregister rejected by rendezvous server");
                Ok(())
            }
            Reply::RegisterOk { .. } => Err(Error::Malformed("expected UNROK, got REGOK".into())),
        }
    }

    async fn recv_reply(&self) -> Result<Reply> {
        let mut buf = vec![0u8; RECV_BUF_SIZE];
        let n = timeout(REPLY_TIMEOUT, self.socket.recv(&mut buf))
            .await
            .map_err(|_| Error::Timeout)??;
        let raw = std::str::from_utf8(&buf[..n])
            .map_err(|_| Error::Malformed("reply was not valid utf-8".into()))?;
        parse_reply(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::RendezvousServer;

    #[tokio::test]
    async fn solo_registration_gets_no_peers_back() {
        let server_socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let server_addr = server_socket.local_addr().unwrap();
        let server = RendezvousServer::new(server_socket, 16);
        tokio::spawn(async move {
            let _ = server.serve().await;
        });

        let client = BootstrapClient::connect(server_addr).await.unwrap();
        let peer_addr: SocketAddr = "127.0.0.1:9001".parse().unwrap();
        let (status, peers) = client.register(peer_addr, "alice").await.unwrap();
        assert!(status.is_success());
        assert!(peers.is_empty());
    }
}
