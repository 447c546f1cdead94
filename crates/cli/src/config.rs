//! Process configuration surface: host address, bootstrap rendezvous
//! address, username, and the ring-wide constants `m`/`ring_size`.
//!
//! Grounded on the teacher's `cli` crate, which already depends on
//! `clap`'s derive feature; `m`/`ring_size` are read once here and handed
//! down as an immutable `RingParams`, never touched again after startup.

use std::net::SocketAddr;

use clap::Parser;
use corelib::RingParams;

#[derive(Parser, Debug, Clone)]
#[command(name = "chord-kv", about = "A Chord-ring distributed key-value store node")]
pub struct Config {
    /// Address this node's peer RPC server binds to and is reachable at.
    #[arg(long, default_value = "127.0.0.1:7000")]
    pub host: SocketAddr,

    /// Well-known UDP address of the bootstrap rendezvous server.
    #[arg(long)]
    pub bootstrap: SocketAddr,

    /// Username registered with the rendezvous server; must be unique.
    #[arg(long)]
    pub username: String,

    /// Number of fingers per node; also bounds the identifier space to 2^m
    /// unless `ring_size` overrides it explicitly.
    #[arg(long, default_value_t = 3)]
    pub m: u32,

    /// Size of the identifier space nodes and buckets are hashed into.
    #[arg(long, default_value_t = 8)]
    pub ring_size: u64,

    /// Bind address for the admin HTTP surface (`/set`, `/get`, `/debug`).
    #[arg(long, default_value = "127.0.0.1:8080")]
    pub admin_addr: SocketAddr,
}

impl Config {
    pub fn ring_params(&self) -> RingParams {
        RingParams::new(self.m, self.ring_size)
    }
}
