//! The rendezvous server: the other side of the bootstrap handshake.
//!
//! Not present in the base protocol description, but a store one can
//! actually run needs something answering `REG`/`UNREG`; grounded on
//! `bootstrap/bootstrap.go`'s reply semantics (status codes, up to two
//! existing peers returned on success) run in reverse as a server instead
//! of a client.

use std::collections::HashMap;

use parking_lot::Mutex;
use tokio::net::UdpSocket;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::protocol::{
    encode_register_reply, encode_unregister_reply, parse_request, PeerAddr, Request,
    RegisterStatus, UnregisterStatus,
};

#[derive(Clone)]
struct Registration {
    addr: PeerAddr,
    username: String,
}

/// The in-memory peer registry, independent of the socket that carries it.
///
/// One `Mutex<HashMap>` keyed by `addr`; registration is infrequent enough
/// (one per join) that a single lock is not a bottleneck, unlike the
/// per-bucket locking the ring's own store needs.
struct Registry {
    capacity: usize,
    registrations: Mutex<HashMap<String, Registration>>,
}

impl Registry {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            registrations: Mutex::new(HashMap::new()),
        }
    }

    fn register(&self, ip: String, port: u16, username: String) -> (RegisterStatus, Vec<PeerAddr>) {
        let key = format!("{ip}:{port}");
        let mut registrations = self.registrations.lock();

        if registrations.contains_key(&key) {
            return (RegisterStatus::AddrRegistered, Vec::new());
        }
        if registrations.values().any(|r| r.username == username) {
            return (RegisterStatus::AlreadyRegistered, Vec::new());
        }
        if registrations.len() >= self.capacity {
            return (RegisterStatus::BsFull, Vec::new());
        }

        let existing: Vec<PeerAddr> = registrations.values().take(2).map(|r| r.addr.clone()).collect();
        let status = match existing.len() {
            0 => RegisterStatus::Ok,
            1 => RegisterStatus::OkOne,
            _ => RegisterStatus::OkTwo,
        };

        info!(%key, %username, "peer registered");
        registrations.insert(
            key,
            Registration {
                addr: PeerAddr { ip, port },
                username,
            },
        );
        (status, existing)
    }

    fn unregister(&self, ip: &str, port: u16, username: &str) -> UnregisterStatus {
        let key = format!("{ip}:{port}");
        let mut registrations = self.registrations.lock();
        match registrations.get(&key) {
            Some(r) if r.username == username => {
                registrations.remove(&key);
                info!(%key, %username, "peer unregistered");
                UnregisterStatus::Ok
            }
            _ => UnregisterStatus::Error,
        }
    }

    fn handle(&self, request: Request) -> String {
        match request {
            Request::Register { ip, port, username } => {
                let (status, peers) = self.register(ip, port, username);
                encode_register_reply(status, &peers)
            }
            Request::Unregister { ip, port, username } => {
                let status = self.unregister(&ip, port, &username);
                encode_unregister_reply(status)
            }
        }
    }
}

/// Listens on a UDP socket and answers `REG`/`UNREG` requests.
pub struct RendezvousServer {
    socket: UdpSocket,
    registry: Registry,
}

impl RendezvousServer {
    pub fn new(socket: UdpSocket, capacity: usize) -> Self {
        Self {
            socket,
            registry: Registry::new(capacity),
        }
    }

    pub async fn serve(&self) -> Result<()> {
        let mut buf = vec![0u8; 1024];
        loop {
            let (n, peer) = self.socket.recv_from(&mut buf).await?;
            let raw = match std::str::from_utf8(&buf[..n]) {
                Ok(s) => s,
                Err(_) => {
                    warn!(%peer, "received non-utf8 datagram, ignoring");
                    continue;
                }
            };

            let request = match parse_request(raw) {
                Ok(r) => r,
                Err(e) => {
                    debug!(%peer, error = %e, "malformed request, ignoring");
                    continue;
                }
            };

            let reply = self.registry.handle(request);
            if let Err(e) = self.socket.send_to(reply.as_bytes(), peer).await {
                warn!(%peer, error = %e, "failed to send reply");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_registration_of_same_username_is_rejected() {
        let r = Registry::new(2);
        let (status, _) = r.register("10.0.0.1".into(), 1, "alice".into());
        assert_eq!(status, RegisterStatus::Ok);
        let (status, _) = r.register("10.0.0.2".into(), 2, "alice".into());
        assert_eq!(status, RegisterStatus::AlreadyRegistered);
    }

    #[test]
    fn capacity_limit_returns_bs_full() {
        let r = Registry::new(2);
        r.register("10.0.0.1".into(), 1, "a".into());
        r.register("10.0.0.2".into(), 2, "b".into());
        let (status, _) = r.register("10.0.0.3".into(), 3, "c".into());
        assert_eq!(status, RegisterStatus::BsFull);
    }

    #[test]
    fn second_peer_gets_first_peer_back() {
        let r = Registry::new(4);
        r.register("10.0.0.1".into(), 1, "a".into());
        let (status, peers) = r.register("10.0.0.2".into(), 2, "b".into());
        assert_eq!(status, RegisterStatus::OkOne);
        assert_eq!(peers, vec![PeerAddr { ip: "10.0.0.1".into(), port: 1 }]);
    }

    #[test]
    fn unregister_requires_matching_username() {
        let r = Registry::new(4);
        r.register("10.0.0.1".into(), 1, "a".into());
        assert_eq!(r.unregister("10.0.0.1", 1, "wrong"), UnregisterStatus::Error);
        assert_eq!(r.unregister("10.0.0.1", 1, "a"), UnregisterStatus::Ok);
    }
}
