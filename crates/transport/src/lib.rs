//! Peer RPC: the wire format, client handle, and server dispatcher that
//! carry the ring node's `Peer` contract across a process boundary.

pub mod client;
pub mod error;
pub mod server;
pub mod wire;

pub use client::RemoteNode;
pub use error::{Error, Result};
pub use server::PeerServer;
