//! Optional persistent cache for upstream provider payloads.
//!
//! Successful responses are stored per normalized city with a jittered TTL so
//! a burst of dashboard refreshes does not hammer the provider, and so cached
//! entries for many cities do not all expire in the same instant. The cache
//! is best-effort: when `init` was never called (tests, one-shot CLI use)
//! every lookup is a miss and every store is a no-op.

use std::fmt::Debug;
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{Result, anyhow};
use fjall::Keyspace;
use rand::RngExt;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tokio::sync::OnceCell;
use tokio::task;

static PAYLOAD_CACHE: OnceCell<PayloadCache> = OnceCell::const_new();

#[derive(Serialize, Deserialize)]
struct StoredEntry<T> {
    value: T,
    expires_at: u64, // Unix timestamp (seconds)
}

struct PayloadCache {
    store: Keyspace,
}

fn read_store(store: Keyspace, key: Vec<u8>) -> Result<Option<Vec<u8>>> {
    Ok(store.get(key)?.map(|v| v.to_vec()))
}

impl PayloadCache {
    fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db = fjall::Database::builder(&path).open()?;
        let store = db.keyspace("payloads", fjall::KeyspaceCreateOptions::default)?;
        Ok(PayloadCache { store })
    }

    #[tracing::instrument(name = "cache_put", level = "debug", skip(self, value))]
    async fn put<T: Serialize + Send + Debug + 'static>(
        &self,
        key: &str,
        value: T,
        ttl: Duration,
    ) -> Result<()> {
        let store = self.store.clone();
        let key = key.as_bytes().to_vec();
        // 10% jitter spreads expiry across entries stored together
        let jitter: f32 = rand::rng().random_range(0.9..1.1);
        let expires_at = SystemTime::now()
            .checked_add(ttl.mul_f32(jitter))
            .ok_or(anyhow!("TTL overflow"))?
            .duration_since(UNIX_EPOCH)?
            .as_secs();
        let entry = StoredEntry { value, expires_at };
        let bytes = postcard::to_stdvec(&entry)?;

        let _ = task::spawn_blocking(move || store.insert(key, bytes)).await?;
        Ok(())
    }

    #[tracing::instrument(name = "cache_get", level = "debug", skip(self))]
    async fn get<T: DeserializeOwned + Send + 'static>(&self, key: &str) -> Result<Option<T>> {
        let store = self.store.clone();
        let key_bytes = key.as_bytes().to_vec();

        let maybe_bytes: Option<Vec<u8>> =
            task::spawn_blocking(move || read_store(store, key_bytes)).await??;

        let Some(bytes) = maybe_bytes else {
            tracing::debug!("payload not cached");
            return Ok(None);
        };

        let entry: StoredEntry<T> = postcard::from_bytes(&bytes)?;
        let now = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs();
        if now < entry.expires_at {
            tracing::debug!("payload cached and fresh");
            Ok(Some(entry.value))
        } else {
            tracing::debug!("payload cached but expired");
            self.remove(key).await?;
            Ok(None)
        }
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let key = key.as_bytes().to_vec();
        let store = self.store.clone();
        let _ = task::spawn_blocking(move || store.remove(key)).await?;
        Ok(())
    }
}

/// Initializes the payload cache. Callable at most once per process; requests
/// made before (or without) initialization simply go upstream.
pub fn init(path: impl AsRef<Path>) -> Result<()> {
    let cache = PayloadCache::open(path)?;
    PAYLOAD_CACHE
        .set(cache)
        .map_err(|_| anyhow!("Cache already initialized"))?;
    Ok(())
}

/// Stores a payload under `key`. No-op when the cache is uninitialized.
pub async fn put<T: Serialize + Send + Debug + 'static>(
    key: &str,
    value: T,
    ttl: Duration,
) -> Result<()> {
    match PAYLOAD_CACHE.get() {
        Some(cache) => cache.put(key, value, ttl).await,
        None => Ok(()),
    }
}

/// Fetches a fresh payload for `key`; `None` on miss, expiry, or when the
/// cache is uninitialized.
pub async fn get<T: DeserializeOwned + Send + 'static>(key: &str) -> Result<Option<T>> {
    match PAYLOAD_CACHE.get() {
        Some(cache) => cache.get(key).await,
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // The global cache is process-wide, so unit tests exercise PayloadCache
    // directly against a scratch directory.

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let cache = PayloadCache::open(dir.path().join("db")).unwrap();

        cache
            .put("owm:current:Beijing", vec![1u32, 2, 3], Duration::from_secs(60))
            .await
            .unwrap();
        let hit: Option<Vec<u32>> = cache.get("owm:current:Beijing").await.unwrap();
        assert_eq!(hit, Some(vec![1, 2, 3]));
    }

    #[tokio::test]
    async fn expired_entries_read_as_misses() {
        let dir = tempfile::tempdir().unwrap();
        let cache = PayloadCache::open(dir.path().join("db")).unwrap();

        cache
            .put("owm:forecast:Tokyo", 42u64, Duration::from_secs(0))
            .await
            .unwrap();
        // zero TTL (even jittered) is already in the past by the next second
        tokio::time::sleep(Duration::from_millis(1100)).await;
        let hit: Option<u64> = cache.get("owm:forecast:Tokyo").await.unwrap();
        assert_eq!(hit, None);
    }

    #[tokio::test]
    async fn uninitialized_global_cache_is_inert() {
        // never calls init() in this process's test binary before this point
        put("k", 1u8, Duration::from_secs(5)).await.unwrap();
        let miss: Option<u8> = get("k").await.unwrap();
        // either None (no init) or Some(1) if another test initialized it;
        // with no init() call anywhere in unit tests it is always None
        assert_eq!(miss, None);
    }
}
