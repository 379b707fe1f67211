//! Bounded TTL cache over a DID resolver
//!
//! Registry lookups hit the chain; the cache keeps hot records in memory,
//! bounded by item count (LRU eviction) and wall-clock TTL. Resolution
//! failures are never cached.

use async_trait::async_trait;
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::did::Did;
use crate::record::AgentRecord;
use crate::resolver::{DidResolver, ResolverError};

/// Cache tuning knobs.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of cached records.
    pub max_entries: usize,
    /// How long a cached record stays fresh.
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 1024,
            ttl: Duration::from_secs(300),
        }
    }
}

struct CachedRecord {
    record: AgentRecord,
    fetched_at: Instant,
}

/// Caching decorator around any [`DidResolver`].
pub struct CachingResolver<R> {
    inner: R,
    cache: Arc<Mutex<LruCache<Did, CachedRecord>>>,
    ttl: Duration,
}

impl<R: DidResolver> CachingResolver<R> {
    pub fn new(inner: R, config: CacheConfig) -> Self {
        let capacity = NonZeroUsize::new(config.max_entries.max(1)).expect("non-zero capacity");
        Self {
            inner,
            cache: Arc::new(Mutex::new(LruCache::new(capacity))),
            ttl: config.ttl,
        }
    }

    /// Drop a single cached entry, forcing the next lookup to the chain.
    pub fn invalidate(&self, did: &Did) {
        self.cache.lock().pop(did);
    }

    /// Number of currently cached records.
    pub fn len(&self) -> usize {
        self.cache.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl<R: DidResolver> DidResolver for CachingResolver<R> {
    async fn resolve(&self, did: &Did) -> Result<AgentRecord, ResolverError> {
        if let Some(cached) = self.cache.lock().get(did) {
            if cached.fetched_at.elapsed() < self.ttl {
                return Ok(cached.record.clone());
            }
        }

        let record = self.inner.resolve(did).await?;
        debug!(did = %did, "resolver cache refresh");
        self.cache.lock().put(
            did.clone(),
            CachedRecord { record: record.clone(), fetched_at: Instant::now() },
        );
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::did::ChainId;
    use crate::resolver::MemoryResolver;
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn record(did: Did) -> AgentRecord {
        AgentRecord {
            did,
            endpoint: "https://agent.example".to_string(),
            owner: "owner".to_string(),
            active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            keys: vec![],
            kem_public_key: None,
        }
    }

    /// Counts how many lookups reach the backend.
    struct CountingResolver {
        inner: MemoryResolver,
        hits: AtomicUsize,
    }

    #[async_trait]
    impl DidResolver for CountingResolver {
        async fn resolve(&self, did: &Did) -> Result<AgentRecord, ResolverError> {
            self.hits.fetch_add(1, Ordering::SeqCst);
            self.inner.resolve(did).await
        }
    }

    #[tokio::test]
    async fn test_second_lookup_served_from_cache() {
        let backend = MemoryResolver::new();
        let did = Did::generate(ChainId::Ethereum);
        backend.register(record(did.clone()));

        let counting = CountingResolver { inner: backend, hits: AtomicUsize::new(0) };
        let cached = CachingResolver::new(counting, CacheConfig::default());

        cached.resolve(&did).await.unwrap();
        cached.resolve(&did).await.unwrap();
        assert_eq!(cached.inner.hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_expired_entry_refetched() {
        let backend = MemoryResolver::new();
        let did = Did::generate(ChainId::Ethereum);
        backend.register(record(did.clone()));

        let counting = CountingResolver { inner: backend, hits: AtomicUsize::new(0) };
        let cached = CachingResolver::new(
            counting,
            CacheConfig { max_entries: 16, ttl: Duration::from_millis(0) },
        );

        cached.resolve(&did).await.unwrap();
        cached.resolve(&did).await.unwrap();
        assert_eq!(cached.inner.hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_capacity_bound() {
        let backend = MemoryResolver::new();
        let mut dids = Vec::new();
        for _ in 0..8 {
            let did = Did::generate(ChainId::Solana);
            backend.register(record(did.clone()));
            dids.push(did);
        }

        let cached = CachingResolver::new(
            backend,
            CacheConfig { max_entries: 4, ttl: Duration::from_secs(60) },
        );
        for did in &dids {
            cached.resolve(did).await.unwrap();
        }
        assert_eq!(cached.len(), 4);
    }

    #[tokio::test]
    async fn test_failures_not_cached() {
        let backend = MemoryResolver::new();
        let cached = CachingResolver::new(backend, CacheConfig::default());
        let missing = Did::generate(ChainId::Ethereum);
        assert!(cached.resolve(&missing).await.is_err());
        assert!(cached.is_empty());
    }
}
