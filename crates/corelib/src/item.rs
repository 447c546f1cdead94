//! The item type stored in buckets.

use serde::{Deserialize, Serialize};

/// A single indexed entry: one word of a multi-word key, routed to the peer
/// that owns `hash(index)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub index: String,
    pub key: String,
    pub value: String,
    pub secondary_tokens: Vec<String>,
}

impl Item {
    /// Builds an item, splitting `key` on whitespace into `secondary_tokens`.
    pub fn new(index: impl Into<String>, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        let secondary_tokens = key.split_whitespace().map(str::to_string).collect();
        Self {
            index: index.into(),
            key,
            value: value.into(),
            secondary_tokens,
        }
    }

    /// Uniqueness key for a bucket: items are deduplicated by `(index, key)`.
    pub fn unique_key(&self) -> (&str, &str) {
        (&self.index, &self.key)
    }
}

/// The payload a client insert breaks a multi-word key into — one per token.
/// Unlike `Item`, it carries no `secondary_tokens`, since those are derived
/// locally by whichever peer ends up storing it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsertItem {
    pub index: String,
    pub key: String,
    pub value: String,
}

impl From<InsertItem> for Item {
    fn from(i: InsertItem) -> Self {
        Item::new(i.index, i.key, i.value)
    }
}

impl From<&Item> for InsertItem {
    fn from(i: &Item) -> Self {
        InsertItem {
            index: i.index.clone(),
            key: i.key.clone(),
            value: i.value.clone(),
        }
    }
}
