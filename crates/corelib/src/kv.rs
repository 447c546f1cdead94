//! The distributed key-value layer built atop a `Peer` handle.
//!
//! Grounded on `kv/kv.go`'s `DistributedKV`: a thin layer that turns a
//! multi-word key into one `InsertItem` per token and leaves routing to
//! `insert_batch`/`query`.

use crate::error::Result;
use crate::item::InsertItem;
use crate::node::{Peer, PeerHandle};

/// A handle to any node in the ring, presenting the key-value API a client
/// actually calls. Any member node works as the entry point.
pub struct DistributedKv {
    entry: PeerHandle,
}

impl DistributedKv {
    pub fn new(entry: PeerHandle) -> Self {
        Self { entry }
    }

    /// Lower-cases `key`, splits it into whitespace tokens, and stores one
    /// `InsertItem` per token, each addressed by that token.
    pub async fn insert(&self, key: &str, value: &str) -> Result<()> {
        let key = key.to_lowercase();
        let items: Vec<InsertItem> = key
            .split_whitespace()
            .map(|token| InsertItem {
                index: token.to_string(),
                key: key.clone(),
                value: value.to_string(),
            })
            .collect();
        self.entry.clone().insert_batch(items).await
    }

    /// Lower-cases `query` and looks it up by its first token.
    pub async fn get(&self, query: &str) -> Result<String> {
        let query = query.to_lowercase();
        let index = query.split_whitespace().next().unwrap_or("");
        self.entry.clone().query(index, &query).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::RingParams;
    use crate::ring_node::RingNode;

    #[tokio::test]
    async fn insert_then_get_round_trips_case_insensitively() {
        let node = RingNode::new("node6", RingParams::new(3, 8));
        node.join(None).await.unwrap();
        let kv = DistributedKv::new(node.clone() as PeerHandle);

        kv.insert("Lord", "v1").await.unwrap();
        assert_eq!(kv.get("lord").await.unwrap(), "v1");
    }

    #[tokio::test]
    async fn get_missing_key_is_not_found() {
        let node = RingNode::new("node6", RingParams::new(3, 8));
        node.join(None).await.unwrap();
        let kv = DistributedKv::new(node as PeerHandle);

        let err = kv.get("nope").await.unwrap_err();
        assert!(matches!(err, crate::error::Error::NotFound));
    }
}
