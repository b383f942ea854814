use async_trait::async_trait;
use bytes::Bytes;

/// Response snapshot stored against a cache key.
///
/// The body is an owned `Bytes` copy, so a stored entry stays readable no
/// matter what happened to the stream it was originally built from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

/// Failure talking to the backing store.
#[derive(Debug, thiserror::Error)]
#[error("cache store '{namespace}': {message}")]
pub struct StoreError {
    pub namespace: String,
    pub message: String,
}

impl StoreError {
    pub fn new(namespace: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            message: message.into(),
        }
    }
}

/// Keyed response store consumed by the proxy.
///
/// Durability, TTL enforcement and eviction live behind this seam; the proxy
/// only relies on get/put/delete semantics. Writes are last-write-wins per
/// key, atomic per key from the caller's point of view.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Look up a key. `None` means no entry, not an error.
    async fn lookup(&self, key: &str) -> Result<Option<StoredResponse>, StoreError>;

    /// Store a response against a key, replacing any existing entry.
    async fn store(&self, key: &str, response: StoredResponse) -> Result<(), StoreError>;

    /// Remove a key. Returns `true` when an entry existed.
    async fn purge(&self, key: &str) -> Result<bool, StoreError>;
}
