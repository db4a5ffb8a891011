//! Async TTL cache with in-flight de-duplication.
//!
//! Every data source instance owns its caches. A key maps to at most one
//! pending fetch: callers asking for the same key while a fetch is running
//! await the same shared result instead of issuing another remote call.
//!
//! Entries are never evicted on a timer; expiry is checked when the key is
//! next requested.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::hash::Hash;
use std::time::Duration;

use futures_util::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use tokio::time::Instant;
use uuid::Uuid;

use crate::error::LogshipResult;
use crate::models::settings::DataSourceSettings;

/// Typed key for cached schema lookups.
///
/// The instance id is part of every key, so two data sources can never read
/// each other's entries even if their caches were ever merged.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// Full schema of the instance's database.
    SchemaOverview {
        /// Owning data source instance
        datasource_id: Uuid,
    },
    /// Resolved columns of a single table.
    TableColumns {
        /// Owning data source instance
        datasource_id: Uuid,
        /// Logical database
        database: String,
        /// Table name as requested by the caller (before mapping)
        table: String,
    },
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SchemaOverview { datasource_id } => write!(f, "{datasource_id}.schema.overview"),
            Self::TableColumns { datasource_id, database, table } => {
                write!(f, "schema_resolver.{datasource_id}.db.{database}.{table}")
            }
        }
    }
}

/// Expiry policy of a cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    /// How long an entry that settled with a value stays live.
    ///
    /// Pending entries are always live, so concurrent callers share one
    /// fetch whatever the TTL.
    pub ttl: Duration,
    /// How long an entry that settled with an error stays live.
    ///
    /// Measured from the entry's creation, like `ttl`. Zero means a failure
    /// is shared only with callers that were already waiting on it.
    pub failure_ttl: Duration,
}

impl CachePolicy {
    /// Create a policy that does not keep failures.
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, failure_ttl: Duration::ZERO }
    }

    /// Set how long failures are kept.
    pub fn with_failure_ttl(mut self, failure_ttl: Duration) -> Self {
        self.failure_ttl = failure_ttl;
        self
    }

    /// Build the policy configured for a data source.
    pub fn from_settings(settings: &DataSourceSettings) -> Self {
        Self { ttl: settings.schema_cache_ttl_value, failure_ttl: settings.failed_fetch_ttl_value }
    }
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self::new(Duration::from_secs(300))
    }
}

/// A fetch every caller of the same key awaits.
pub type SharedFetch<V> = Shared<BoxFuture<'static, LogshipResult<V>>>;

struct CacheEntry<V> {
    fetch: SharedFetch<V>,
    created_at: Instant,
}

impl<V: Clone> CacheEntry<V> {
    fn is_live(&self, now: Instant, policy: &CachePolicy) -> bool {
        let age = now.saturating_duration_since(self.created_at);
        match self.fetch.peek() {
            None => true,
            Some(Ok(_)) => age < policy.ttl,
            Some(Err(_)) => age < policy.failure_ttl,
        }
    }
}

/// Async memoization keyed by `K`.
pub struct TtlCache<K, V> {
    entries: Mutex<HashMap<K, CacheEntry<V>>>,
    policy: CachePolicy,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone + fmt::Display,
    V: Clone + Send + Sync + 'static,
{
    /// Create an empty cache.
    pub fn new(policy: CachePolicy) -> Self {
        Self { entries: Mutex::new(HashMap::new()), policy }
    }

    /// Get the expiry policy.
    pub fn policy(&self) -> CachePolicy {
        self.policy
    }

    /// Return the cached value for `key`, fetching it with `producer` if needed.
    ///
    /// `producer` runs at most once per call and only when there is no live
    /// entry or `force_refresh` is set. A forced refresh replaces the entry
    /// for later callers; callers already awaiting the previous fetch still
    /// receive its result.
    ///
    /// `producer` is called while the entry table is locked and must only
    /// build its future, not drive this cache synchronously.
    ///
    /// The entry is looked up when this is called. The returned future does
    /// not borrow the cache.
    pub fn get_or_fetch<F, Fut>(&self, key: K, producer: F, force_refresh: bool) -> SharedFetch<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = LogshipResult<V>> + Send + 'static,
    {
        let now = Instant::now();
        let mut entries = self.entries.lock();

        if !force_refresh {
            if let Some(entry) = entries.get(&key) {
                if entry.is_live(now, &self.policy) {
                    tracing::trace!(key = %key, "Schema cache hit");
                    return entry.fetch.clone();
                }
            }
        }

        tracing::debug!(key = %key, force_refresh, "Schema cache miss, fetching");
        let fetch = producer().boxed().shared();
        entries.insert(key, CacheEntry { fetch: fetch.clone(), created_at: now });
        fetch
    }

    /// Drop the entry for `key`. Returns true if one existed.
    pub fn invalidate(&self, key: &K) -> bool {
        self.entries.lock().remove(key).is_some()
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// Number of stored entries, including expired ones not yet replaced.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Check if the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl<K, V> Default for TtlCache<K, V>
where
    K: Eq + Hash + Clone + fmt::Display,
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new(CachePolicy::default())
    }
}
