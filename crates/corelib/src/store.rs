//! Partitioned local store (component B).
//!
//! Grounded on `chord/bucketmap/bucketmap.go`: a concurrent map from bucket
//! id to bucket, each bucket independently locked so reads/writes to
//! distinct buckets never contend.

use std::collections::HashSet;

use dashmap::DashMap;
use parking_lot::RwLock;

use crate::error::{Error, Result};
use crate::id::{between, Id};
use crate::item::Item;

#[derive(Default)]
struct Bucket {
    items: Vec<Item>,
    unique: HashSet<(String, String)>,
}

/// Buckets keyed by `hash(index)`, each independently lockable.
///
/// The outer map is a `DashMap` (lock-per-shard); the inner `RwLock<Bucket>`
/// means two inserts into different buckets never block each other.
pub struct BucketStore {
    buckets: DashMap<Id, RwLock<Bucket>>,
}

impl BucketStore {
    pub fn new() -> Self {
        Self {
            buckets: DashMap::new(),
        }
    }

    /// Inserts `item` into the bucket for `bucket_id`, creating it if absent.
    ///
    /// Fails with `AlreadyExists` if `(item.index, item.key)` is already
    /// present in that bucket; the bucket is left unchanged in that case.
    pub fn add(&self, bucket_id: Id, item: Item) -> Result<()> {
        let entry = self
            .buckets
            .entry(bucket_id)
            .or_insert_with(|| RwLock::new(Bucket::default()));
        let mut bucket = entry.write();

        let key = (item.index.clone(), item.key.clone());
        if bucket.unique.contains(&key) {
            return Err(Error::AlreadyExists);
        }

        bucket.unique.insert(key);
        bucket.items.push(item);
        Ok(())
    }

    /// Finds an item in `bucket_id`'s bucket whose `index` matches and whose
    /// `secondary_tokens` contains, as an in-order subsequence, every
    /// whitespace-separated token of `query`.
    ///
    /// The matcher advances a cursor through `secondary_tokens` per
    /// candidate item: each query token is searched for starting at the
    /// cursor; a hit advances the cursor past that position, a miss rejects
    /// the item outright (it is not a subset match, token order matters).
    pub fn query(&self, bucket_id: Id, index: &str, query: &str) -> Result<String> {
        let query_tokens: Vec<&str> = query.split_whitespace().collect();

        let Some(entry) = self.buckets.get(&bucket_id) else {
            return Err(Error::NotFound);
        };
        let bucket = entry.read();

        for item in &bucket.items {
            if item.index != index {
                continue;
            }
            if subsequence_match(&item.secondary_tokens, &query_tokens) {
                return Ok(item.value.clone());
            }
        }

        Err(Error::NotFound)
    }

    /// Atomically removes and returns every item whose bucket id is not in
    /// `(lo, hi]`: "evict buckets no longer owned when the arc changes."
    pub fn transfer_out_range(&self, lo: Id, hi: Id) -> Vec<Item> {
        let stale: Vec<Id> = self
            .buckets
            .iter()
            .map(|entry| *entry.key())
            .filter(|id| !between(*id, lo, hi))
            .collect();

        let mut evicted = Vec::new();
        for id in stale {
            if let Some((_, lock)) = self.buckets.remove(&id) {
                evicted.extend(lock.into_inner().items);
            }
        }
        evicted
    }

    /// A copy of every item across every bucket, for graceful leave.
    pub fn snapshot(&self) -> Vec<Item> {
        self.buckets
            .iter()
            .flat_map(|entry| entry.value().read().items.clone())
            .collect()
    }
}

impl Default for BucketStore {
    fn default() -> Self {
        Self::new()
    }
}

fn subsequence_match(haystack: &[String], needle: &[&str]) -> bool {
    let mut cursor = 0;
    for token in needle {
        match haystack[cursor..].iter().position(|t| t == token) {
            Some(offset) => cursor += offset + 1,
            None => return false,
        }
    }
    true
}
