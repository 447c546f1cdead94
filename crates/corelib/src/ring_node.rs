//! The ring node core: join/leave/notify/stabilize and request routing.
//!
//! Grounded on `legacy/node.go`'s `Node` (the fullest single-file version of
//! this state machine in the original implementation) and `chord/chord.go`
//! for the tie-break rules in `find_successor`/`closest_preceding_node`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::id::{between, finger_target, hash, Id, RingParams};
use crate::item::{InsertItem, Item};
use crate::node::{Peer, PeerHandle};
use crate::store::BucketStore;

/// A node's lifecycle position. Maintenance loops run only in `Member`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    Unjoined,
    Joining,
    Member,
    Leaving,
    Stopped,
}

/// The local node: the peer this process hosts.
///
/// `successor`/`predecessor`/`finger` are locked independently (the
/// successor lock, the predecessor lock, and — since the finger table is
/// revised only by the fix-finger task — no lock at all, just atomics of
/// convenience via `Mutex` for interior mutability without `unsafe`).
pub struct RingNode {
    id: Id,
    addr: String,
    params: RingParams,
    state: Mutex<NodeState>,
    successor: Mutex<Option<PeerHandle>>,
    predecessor: Mutex<Option<PeerHandle>>,
    finger: Vec<Mutex<Option<PeerHandle>>>,
    finger_target: Vec<Id>,
    store: BucketStore,
    shutting_down: AtomicBool,
}

impl RingNode {
    /// Builds a node hosted at `addr`, not yet part of any ring.
    ///
    /// `Arc::new_cyclic` cannot hand back a valid `Arc<dyn Peer>` self-
    /// reference during construction (`Weak::upgrade` returns `None` until
    /// the `Arc` exists), so construction is two steps: build with
    /// `successor = None`, then immediately adopt self as successor before
    /// handing the `Arc` to any other code.
    pub fn new(addr: impl Into<String>, params: RingParams) -> Arc<Self> {
        let addr = addr.into();
        let id = hash(&addr, &params);
        let finger = (0..params.m).map(|_| Mutex::new(None)).collect();
        let finger_target = (0..params.m).map(|i| finger_target(id, i, &params)).collect();

        let node = Arc::new(Self {
            id,
            addr,
            params,
            state: Mutex::new(NodeState::Unjoined),
            successor: Mutex::new(None),
            predecessor: Mutex::new(None),
            finger,
            finger_target,
            store: BucketStore::new(),
            shutting_down: AtomicBool::new(false),
        });
        *node.successor.lock() = Some(node.clone() as PeerHandle);
        node
    }

    pub fn params(&self) -> RingParams {
        self.params
    }

    pub fn state(&self) -> NodeState {
        *self.state.lock()
    }

    pub fn successor_handle(&self) -> PeerHandle {
        self.successor
            .lock()
            .clone()
            .expect("successor is never absent once constructed")
    }

    pub fn predecessor_handle(&self) -> Option<PeerHandle> {
        self.predecessor.lock().clone()
    }

    pub fn finger_handle(&self, i: usize) -> Option<PeerHandle> {
        self.finger[i].lock().clone()
    }

    /// The ideal id finger `i` (zero-based) chases, fixed at construction
    /// since it depends only on `self.id` and `params`.
    pub fn finger_target(&self, i: usize) -> Id {
        self.finger_target[i]
    }

    pub fn store(&self) -> &BucketStore {
        &self.store
    }

    /// Hashes a raw key and returns the id of the node that owns it, without
    /// touching the bucket store. A convenience lookup independent of the
    /// item-query path.
    pub async fn lookup_id(self: &Arc<Self>, key: &str) -> Result<Id> {
        let target = hash(key, &self.params);
        let owner = self.clone().find_successor(target).await?;
        Ok(owner.id())
    }

    /// Joins the ring through `seed`, or becomes the sole member if absent.
    pub async fn join(self: &Arc<Self>, seed: Option<PeerHandle>) -> Result<()> {
        *self.state.lock() = NodeState::Joining;
        *self.predecessor.lock() = None;

        let Some(seed) = seed else {
            *self.successor.lock() = Some(self.clone() as PeerHandle);
            *self.state.lock() = NodeState::Member;
            info!(id = %self.id, "solo founder, no seed given");
            return Ok(());
        };

        let reply = seed.find_successor(self.id).await?;
        if reply.id() == self.id {
            return Err(Error::IdCollision);
        }

        *self.successor.lock() = Some(reply.clone());
        let evicted = reply.notify(self.clone() as PeerHandle).await?;
        for item in evicted {
            // Notify only hands back items whose (index,key) should now be
            // unique here; a collision would mean the successor is wrong.
            let _ = self.store.add(hash(&item.index, &self.params), item);
        }

        *self.state.lock() = NodeState::Member;
        info!(id = %self.id, successor = %reply.id(), "joined ring");
        Ok(())
    }

    /// Graceful departure: stop callers must invoke this after halting the
    /// maintenance loops (see `maintenance::Maintenance::stop_and_join`).
    pub async fn leave(self: &Arc<Self>) -> Result<()> {
        *self.state.lock() = NodeState::Leaving;
        self.shutting_down.store(true, Ordering::SeqCst);

        let successor = self.successor_handle();
        let predecessor = self.predecessor_handle();
        let distinct_successor = successor.id() != self.id;

        if distinct_successor {
            if let Some(pred) = predecessor.clone() {
                successor.set_predecessor(pred).await?;
            }
        }
        if let Some(pred) = predecessor {
            pred.set_successor(successor.clone()).await?;
        }
        if distinct_successor {
            let items = self.store.snapshot();
            if !items.is_empty() {
                let insert_items: Vec<InsertItem> = items.iter().map(InsertItem::from).collect();
                successor.insert_batch(insert_items).await?;
            }
        }

        *self.state.lock() = NodeState::Stopped;
        info!(id = %self.id, "left ring");
        Ok(())
    }

    /// One tick of the stabilize loop.
    pub async fn stabilize(self: &Arc<Self>) {
        let successor = self.successor_handle();

        let x = match successor.get_predecessor().await {
            Ok(x) => Some(x),
            Err(Error::NoPredecessor) => None,
            Err(e) => {
                warn!(error = %e, "stabilize: get_predecessor failed, skipping tick");
                return;
            }
        };

        let mut successor = successor;
        if let Some(x) = x {
            if between(x.id(), self.id, successor.id()) {
                debug!(new_successor = %x.id(), "stabilize: adopting new successor");
                *self.successor.lock() = Some(x.clone());
                successor = x;
            }
        }

        if successor.id() != self.id {
            match successor.notify(self.clone() as PeerHandle).await {
                Ok(items) => {
                    for item in items {
                        let _ = self.store.add(hash(&item.index, &self.params), item);
                    }
                }
                Err(e) => warn!(error = %e, "stabilize: notify failed"),
            }
        }
    }

    /// `fix_finger(i)`, `i` one-based in `1..=m`.
    pub async fn fix_finger(self: &Arc<Self>, i: u32) -> Result<()> {
        if i == 0 || i > self.params.m {
            return Err(Error::InvalidArgument(format!(
                "finger index {i} out of [1, {}]",
                self.params.m
            )));
        }
        let target = self.finger_target[(i - 1) as usize];
        let owner = self.clone().find_successor(target).await?;
        *self.finger[(i - 1) as usize].lock() = Some(owner);
        Ok(())
    }

    /// Checks the predecessor's liveness; clears it on any failure.
    pub async fn check_predecessor(self: &Arc<Self>) {
        let Some(pred) = self.predecessor_handle() else {
            return;
        };
        if pred.healthz().await.is_err() {
            warn!(predecessor = %pred.id(), "predecessor unresponsive, clearing");
            *self.predecessor.lock() = None;
        }
    }

    /// Scans `finger[m-1]` down to `finger[0]`, returning the first whose id
    /// lies in `(self.id, id)`; falls back to self if none qualifies.
    async fn closest_preceding_node(self: &Arc<Self>, id: Id) -> PeerHandle {
        for slot in self.finger.iter().rev() {
            if let Some(f) = slot.lock().clone() {
                if between(f.id(), self.id, id) {
                    return f;
                }
            }
        }
        self.clone() as PeerHandle
    }
}

#[async_trait]
impl Peer for RingNode {
    fn id(&self) -> Id {
        self.id
    }

    fn addr(&self) -> &str {
        &self.addr
    }

    async fn find_successor(self: Arc<Self>, id: Id) -> Result<PeerHandle> {
        let successor = self.successor_handle();
        if successor.id() == id || between(id, self.id, successor.id()) {
            return Ok(successor);
        }

        let next = self.closest_preceding_node(id).await;
        if next.id() == self.id || next.id() == id {
            return Ok(next);
        }
        next.find_successor(id).await
    }

    async fn get_predecessor(&self) -> Result<PeerHandle> {
        self.predecessor_handle().ok_or(Error::NoPredecessor)
    }

    async fn set_successor(&self, n: PeerHandle) -> Result<()> {
        *self.successor.lock() = Some(n);
        Ok(())
    }

    async fn set_predecessor(&self, n: PeerHandle) -> Result<()> {
        // Setting predecessor to self is how a leave sequence clears it.
        if n.id() == self.id {
            *self.predecessor.lock() = None;
        } else {
            *self.predecessor.lock() = Some(n);
        }
        Ok(())
    }

    async fn notify(&self, p: PeerHandle) -> Result<Vec<Item>> {
        let mut predecessor = self.predecessor.lock();
        let should_adopt = p.id() != self.id
            && match predecessor.as_ref() {
                None => true,
                Some(current) => between(p.id(), current.id(), self.id),
            };
        if !should_adopt {
            return Ok(Vec::new());
        }

        let new_pred_id = p.id();
        *predecessor = Some(p);
        let evicted = self.store.transfer_out_range(new_pred_id, self.id);
        drop(predecessor);

        if !evicted.is_empty() {
            debug!(count = evicted.len(), "notify: evicting items to new predecessor's owner");
        }
        Ok(evicted)
    }

    async fn insert_batch(self: Arc<Self>, items: Vec<InsertItem>) -> Result<()> {
        use std::collections::HashMap;
        let mut groups: HashMap<Id, Vec<InsertItem>> = HashMap::new();
        for item in items {
            let group_id = hash(&item.index, &self.params);
            groups.entry(group_id).or_default().push(item);
        }

        for (group_id, group_items) in groups {
            let owns_locally = {
                let pred = self.predecessor.lock();
                match pred.as_ref() {
                    None => true,
                    Some(p) => between(group_id, p.id(), self.id),
                }
            };

            if owns_locally {
                for item in group_items {
                    self.store.add(group_id, item.into())?;
                }
                continue;
            }

            let owner = self.clone().find_successor(group_id).await?;
            if owner.id() == self.id {
                for item in group_items {
                    self.store.add(group_id, item.into())?;
                }
            } else {
                owner.insert_batch(group_items).await?;
            }
        }
        Ok(())
    }

    async fn query(self: Arc<Self>, index: &str, query: &str) -> Result<String> {
        let id = hash(index, &self.params);

        let owns_locally = {
            let pred = self.predecessor.lock();
            match pred.as_ref() {
                None => true,
                Some(p) => between(id, p.id(), self.id),
            }
        };

        if owns_locally {
            self.store.query(id, index, query)
        } else {
            let owner = self.clone().find_successor(id).await?;
            owner.query(index, query).await
        }
    }

    async fn healthz(&self) -> Result<()> {
        if self.shutting_down.load(Ordering::SeqCst) {
            Err(Error::RemoteUnreachable("node is shutting down".into()))
        } else {
            Ok(())
        }
    }

    async fn leave(self: Arc<Self>) -> Result<()> {
        RingNode::leave(&self).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> RingParams {
        RingParams::new(3, 8)
    }

    #[tokio::test]
    async fn solo_join_points_successor_and_predecessor_at_self() {
        let node = RingNode::new("node6", params());
        node.join(None).await.unwrap();
        assert_eq!(node.successor_handle().id(), node.id());
        assert!(node.predecessor_handle().is_none());
        assert_eq!(node.state(), NodeState::Member);
    }

    #[tokio::test]
    async fn join_rejects_id_collision_with_seed() {
        let seed = RingNode::new("node6", params());
        seed.join(None).await.unwrap();

        // A fabricated peer sharing the seed's id must be rejected.
        let dup = RingNode::new("node6", params());
        let err = dup.join(Some(seed.clone())).await.unwrap_err();
        assert!(matches!(err, Error::IdCollision));
    }

    #[tokio::test]
    async fn two_node_join_sets_mutual_pointers_after_notify() {
        let a = RingNode::new("node6", params());
        a.join(None).await.unwrap();

        let b = RingNode::new("node7", params());
        b.join(Some(a.clone())).await.unwrap();

        // b's join called a.notify(b), so a should now have b as predecessor
        // (since a had none) and b's successor should be a.
        assert_eq!(a.predecessor_handle().unwrap().id(), b.id());
        assert_eq!(b.successor_handle().id(), a.id());
    }

    #[tokio::test]
    async fn insert_and_query_round_trip_on_solo_node() {
        let node = RingNode::new("node6", params());
        node.join(None).await.unwrap();

        let items = vec![InsertItem {
            index: "hello".into(),
            key: "hello damn maxver".into(),
            value: "food".into(),
        }];
        node.clone().insert_batch(items).await.unwrap();

        let value = node.clone().query("hello", "damn maxver").await.unwrap();
        assert_eq!(value, "food");
    }

    #[tokio::test]
    async fn insert_duplicate_surfaces_already_exists() {
        let node = RingNode::new("node6", params());
        node.join(None).await.unwrap();

        let item = InsertItem {
            index: "hello".into(),
            key: "hello damn".into(),
            value: "a".into(),
        };
        node.clone().insert_batch(vec![item.clone()]).await.unwrap();
        let err = node.clone().insert_batch(vec![item]).await.unwrap_err();
        assert!(matches!(err, Error::AlreadyExists));
    }

    #[tokio::test]
    async fn notify_from_unrelated_node_is_ignored() {
        let node = RingNode::new("node6", params());
        node.join(None).await.unwrap();

        // node's own id as "predecessor" is always rejected (p.id == self.id guard).
        let evicted = Peer::notify(node.as_ref(), node.clone() as PeerHandle).await.unwrap();
        assert!(evicted.is_empty());
        assert!(node.predecessor_handle().is_none());
    }

    #[tokio::test]
    async fn fix_finger_rejects_out_of_range_index() {
        let node = RingNode::new("node6", params());
        node.join(None).await.unwrap();
        let err = node.fix_finger(0).await.unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
        let err = node.fix_finger(4).await.unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn leave_hands_off_to_successor_on_two_node_ring() {
        let a = RingNode::new("node6", params());
        a.join(None).await.unwrap();
        let b = RingNode::new("node7", params());
        b.join(Some(a.clone())).await.unwrap();

        let item = InsertItem {
            index: "hello".into(),
            key: "hello damn".into(),
            value: "x".into(),
        };
        b.clone().insert_batch(vec![item]).await.unwrap();

        b.leave().await.unwrap();
        assert_eq!(b.state(), NodeState::Stopped);
        assert_eq!(a.successor_handle().id(), a.id());
    }
}
