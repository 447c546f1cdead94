//! Bootstrap rendezvous: the well-known UDP endpoint a joining peer
//! registers with before it can reach the ring.

pub mod client;
pub mod error;
pub mod protocol;
pub mod server;

pub use client::BootstrapClient;
pub use error::{Error, Result};
pub use protocol::{PeerAddr, RegisterStatus, UnregisterStatus};
pub use server::RendezvousServer;
