//! Core library: ring node state machine, partitioned local store, and the
//! distributed key-value layer built on top of them.
//!
//! - [`id`] — identifier space and arc arithmetic.
//! - [`item`] — the item/insert-item wire-adjacent types.
//! - [`store`] — the partitioned local bucket store.
//! - [`node`] — the `Peer` capability set shared by local and remote nodes.
//! - [`ring_node`] — `RingNode`, the local peer: join/leave/stabilize/route.
//! - [`maintenance`] — the three periodic background loops.
//! - [`kv`] — the key-value API built on `insert_batch`/`query`.

pub mod error;
pub mod id;
pub mod item;
pub mod kv;
pub mod maintenance;
pub mod node;
pub mod ring_node;
pub mod store;

pub use error::{Error, Result};
pub use id::{between, hash, Id, RingParams};
pub use item::{InsertItem, Item};
pub use kv::DistributedKv;
pub use maintenance::Maintenance;
pub use node::{Peer, PeerHandle};
pub use ring_node::{NodeState, RingNode};
pub use store::BucketStore;
