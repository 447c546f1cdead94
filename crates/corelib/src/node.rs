//! The peer capability set shared by local and remote nodes.
//!
//! `Peer` is the one capability set both node kinds implement: `RingNode`
//! (this crate) for the local peer, and `transport::RemoteNode` (the
//! `transport` crate) for every other peer, reached over the wire. A
//! `PeerHandle` never owns the node it names — `successor`/`predecessor`/
//! `finger[i]` are weak references by address, not owning pointers.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::id::Id;
use crate::item::{InsertItem, Item};

/// An opaque handle to any peer, local or remote.
pub type PeerHandle = Arc<dyn Peer>;

/// The capability set every node in the ring exposes to every other node.
///
/// Calling a method on a `RingNode` dispatches locally; calling it on a
/// `transport::RemoteNode` makes an RPC. Any of these calls is a suspension
/// point — implementations must never be invoked while holding a node lock.
///
/// `find_successor`/`insert_batch`/`query`/`leave` take `self: Arc<Self>`
/// rather than `&self`: each may need to hand its own handle to a peer
/// (a recursive hop, a forwarded insert) or hand itself to an inherent
/// helper, and `async_trait` dispatches an `Arc<Self>` receiver through a
/// `dyn Peer` trait object just as readily as `&self`.
#[async_trait]
pub trait Peer: Send + Sync {
    fn id(&self) -> Id;
    fn addr(&self) -> &str;

    async fn find_successor(self: Arc<Self>, id: Id) -> Result<PeerHandle>;
    async fn get_predecessor(&self) -> Result<PeerHandle>;
    async fn set_successor(&self, n: PeerHandle) -> Result<()>;
    async fn set_predecessor(&self, n: PeerHandle) -> Result<()>;

    /// Returns the items the callee just evicted because the caller now
    /// owns them; the caller is responsible for re-inserting them locally.
    async fn notify(&self, p: PeerHandle) -> Result<Vec<Item>>;

    async fn insert_batch(self: Arc<Self>, items: Vec<InsertItem>) -> Result<()>;
    async fn query(self: Arc<Self>, index: &str, query: &str) -> Result<String>;
    async fn healthz(&self) -> Result<()>;

    /// Triggers graceful departure on the callee: it transfers its items to
    /// its successor and exits.
    async fn leave(self: Arc<Self>) -> Result<()>;
}
