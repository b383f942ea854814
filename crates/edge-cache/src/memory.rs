use crate::store::{CacheStore, StoreError, StoredResponse};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

/// Number of shards. Must be a power of two for fast modulo via bitmask.
const NUM_SHARDS: usize = 64;
const SHARD_MASK: u64 = (NUM_SHARDS as u64) - 1;

/// In-process implementation of [`CacheStore`].
///
/// Keys are distributed across 64 independent shards, each behind its own
/// `RwLock`: a lookup takes a read lock on one shard while the 63 others stay
/// uncontested. Shard selection uses `ahash` for fast, DoS-resistant hashing.
///
/// The store holds entries until they are explicitly purged; capacity
/// management and expiry belong to whatever backend replaces this one in a
/// real deployment.
pub struct MemoryStore {
    shards: Box<[RwLock<HashMap<String, StoredResponse>>; NUM_SHARDS]>,
    namespace: String,
}

impl MemoryStore {
    /// Open a named store. The namespace separates logical caches sharing a
    /// process and tags log lines and errors.
    pub fn open(namespace: impl Into<String>) -> Self {
        let namespace = namespace.into();
        let shards: Vec<RwLock<HashMap<String, StoredResponse>>> =
            (0..NUM_SHARDS).map(|_| RwLock::new(HashMap::new())).collect();
        let shards: Box<[RwLock<HashMap<String, StoredResponse>>; NUM_SHARDS]> = shards
            .into_boxed_slice()
            .try_into()
            .unwrap_or_else(|_| unreachable!());

        tracing::debug!(namespace = %namespace, shards = NUM_SHARDS, "memory store opened");
        Self { shards, namespace }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    #[inline]
    fn shard_index(key: &str) -> usize {
        let hash = ahash::RandomState::with_seeds(1, 2, 3, 4).hash_one(key);
        (hash & SHARD_MASK) as usize
    }

    /// Total number of entries across all shards.
    pub fn len(&self) -> usize {
        self.shards.iter().map(|s| s.read().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.shards.iter().all(|s| s.read().is_empty())
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn lookup(&self, key: &str) -> Result<Option<StoredResponse>, StoreError> {
        let shard = self.shards[Self::shard_index(key)].read();
        Ok(shard.get(key).cloned())
    }

    async fn store(&self, key: &str, response: StoredResponse) -> Result<(), StoreError> {
        let mut shard = self.shards[Self::shard_index(key)].write();
        shard.insert(key.to_owned(), response);
        Ok(())
    }

    async fn purge(&self, key: &str) -> Result<bool, StoreError> {
        let mut shard = self.shards[Self::shard_index(key)].write();
        Ok(shard.remove(key).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn resp(body: &'static [u8]) -> StoredResponse {
        StoredResponse {
            status: 200,
            headers: vec![("content-type".into(), "text/plain".into())],
            body: Bytes::from_static(body),
        }
    }

    #[tokio::test]
    async fn lookup_on_empty_store_misses() {
        let store = MemoryStore::open("test");
        assert!(store.lookup("https://x.test/a").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn store_then_lookup_returns_same_entry() {
        let store = MemoryStore::open("test");
        store.store("k", resp(b"hello")).await.unwrap();

        let found = store.lookup("k").await.unwrap().unwrap();
        assert_eq!(found, resp(b"hello"));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn overwrite_is_last_write_wins() {
        let store = MemoryStore::open("test");
        store.store("k", resp(b"first")).await.unwrap();
        store.store("k", resp(b"second")).await.unwrap();

        let found = store.lookup("k").await.unwrap().unwrap();
        assert_eq!(found.body, Bytes::from_static(b"second"));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn purge_reports_whether_entry_existed() {
        let store = MemoryStore::open("test");
        store.store("k", resp(b"x")).await.unwrap();

        assert!(store.purge("k").await.unwrap());
        assert!(!store.purge("k").await.unwrap());
        assert!(store.lookup("k").await.unwrap().is_none());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn keys_spread_across_shards() {
        let store = MemoryStore::open("test");
        for i in 0..500 {
            store.store(&format!("https://x.test/{i}"), resp(b"v")).await.unwrap();
        }
        assert_eq!(store.len(), 500);

        let populated = store.shards.iter().filter(|s| !s.read().is_empty()).count();
        assert!(populated > NUM_SHARDS / 2, "keys clumped into {populated} shards");
    }
}
