//! Query caching layer with TTL expiration.
//!
//! [`CachedGraphStore`] wraps any [`GraphStore`] and memoizes query results.
//! Every mutation clears the cache and bumps its generation. A result read
//! before a write is not cached once that write has happened, so readers
//! never observe results older than the last write made through the wrapper.

use std::collections::{HashMap, VecDeque};
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::Result;
use crate::graph::queries::{GraphQuery, Record};
use crate::graph::GraphStore;
use crate::types::{Entity, Relation};

/// Cache entry with expiration time.
#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

struct CacheInner<K, V> {
    entries: HashMap<K, CacheEntry<V>>,
    /// Keys in insertion order, oldest first.
    order: VecDeque<K>,
    /// Bumped by every `clear`.
    generation: u64,
}

/// Thread-safe cache with a size bound and TTL.
///
/// When full, the oldest inserted key is evicted.
///
/// # Examples
///
/// ```no_run
/// use certify_core::cache::QueryCache;
/// use std::time::Duration;
///
/// # #[tokio::main]
/// # async fn main() {
/// let cache = QueryCache::<String, usize>::new(100, Duration::from_secs(300));
/// cache.insert("unverified".to_string(), 3).await;
/// assert_eq!(cache.get(&"unverified".to_string()).await, Some(3));
/// # }
/// ```
#[derive(Clone)]
pub struct QueryCache<K, V>
where
    K: Clone + Eq + Hash + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    max_size: usize,
    ttl: Duration,
    inner: Arc<RwLock<CacheInner<K, V>>>,
}

impl<K, V> QueryCache<K, V>
where
    K: Clone + Eq + Hash + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Creates a new cache holding at most `max_size` entries for `ttl` each.
    pub fn new(max_size: usize, ttl: Duration) -> Self {
        Self {
            max_size: max_size.max(1),
            ttl,
            inner: Arc::new(RwLock::new(CacheInner {
                entries: HashMap::new(),
                order: VecDeque::new(),
                generation: 0,
            })),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Gets a cached value if present and not expired.
    pub async fn get(&self, key: &K) -> Option<V> {
        {
            let inner = self.inner.read().await;
            match inner.entries.get(key) {
                Some(entry) if Instant::now() < entry.expires_at => return Some(entry.value.clone()),
                Some(_) => {}
                None => return None,
            }
        }

        // Expired
        self.invalidate(key).await;
        None
    }

    /// Inserts a value, evicting the oldest entries if the cache is full.
    pub async fn insert(&self, key: K, value: V) {
        let mut inner = self.inner.write().await;
        Self::store(&mut inner, self.max_size, self.ttl, key, value);
    }

    /// Current generation. Compare with [`QueryCache::insert_if_current`].
    pub async fn generation(&self) -> u64 {
        self.inner.read().await.generation
    }

    /// Inserts only if no `clear` happened since `generation` was read.
    ///
    /// Returns `false` when the value was discarded.
    pub async fn insert_if_current(&self, key: K, value: V, generation: u64) -> bool {
        let mut inner = self.inner.write().await;
        if inner.generation != generation {
            return false;
        }
        Self::store(&mut inner, self.max_size, self.ttl, key, value);
        true
    }

    fn store(inner: &mut CacheInner<K, V>, max_size: usize, ttl: Duration, key: K, value: V) {
        if !inner.entries.contains_key(&key) {
            while inner.order.len() >= max_size {
                match inner.order.pop_front() {
                    Some(oldest) => {
                        inner.entries.remove(&oldest);
                    }
                    None => break,
                }
            }
            inner.order.push_back(key.clone());
        }

        let expires_at = Instant::now() + ttl;
        inner.entries.insert(key, CacheEntry { value, expires_at });
    }

    /// Invalidates a specific entry.
    pub async fn invalidate(&self, key: &K) {
        let mut inner = self.inner.write().await;
        inner.entries.remove(key);
        inner.order.retain(|k| k != key);
    }

    /// Clears all cached entries and starts a new generation.
    pub async fn clear(&self) {
        let mut inner = self.inner.write().await;
        inner.entries.clear();
        inner.order.clear();
        inner.generation += 1;
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.entries.is_empty()
    }
}

/// A [`GraphStore`] decorator that caches query results.
#[derive(Clone)]
pub struct CachedGraphStore {
    inner: Arc<dyn GraphStore>,
    cache: QueryCache<String, Vec<Record>>,
}

impl CachedGraphStore {
    /// Default: 1000 entries, 5 minute TTL.
    pub fn new(inner: Arc<dyn GraphStore>) -> Self {
        Self::with_cache(inner, QueryCache::new(1000, Duration::from_secs(300)))
    }

    pub fn with_cache(inner: Arc<dyn GraphStore>, cache: QueryCache<String, Vec<Record>>) -> Self {
        Self { inner, cache }
    }

    pub fn cache(&self) -> &QueryCache<String, Vec<Record>> {
        &self.cache
    }
}

#[async_trait]
impl GraphStore for CachedGraphStore {
    async fn run_query(&self, query: &GraphQuery) -> Result<Vec<Record>> {
        let key = query.cache_key();
        if let Some(records) = self.cache.get(&key).await {
            tracing::debug!("Cache hit for {:?}", query.statement);
            return Ok(records);
        }

        let generation = self.cache.generation().await;
        let records = self.inner.run_query(query).await?;
        if !self.cache.insert_if_current(key, records.clone(), generation).await {
            tracing::debug!("Discarding {:?} result read before a write", query.statement);
        }
        Ok(records)
    }

    async fn merge_entity(&self, entity: Entity) -> Result<()> {
        let result = self.inner.merge_entity(entity).await;
        self.cache.clear().await;
        result
    }

    async fn merge_relation(&self, relation: Relation) -> Result<bool> {
        let result = self.inner.merge_relation(relation).await;
        self.cache.clear().await;
        result
    }

    async fn clear(&self) -> Result<()> {
        let result = self.inner.clear().await;
        self.cache.clear().await;
        result
    }
}
