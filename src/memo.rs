//! Memoization for async loaders.
//!
//! [`Memo`] caches the result of an async computation under a SHA-256 of its
//! serialized arguments. Entries expire on a sliding window from their last
//! access. Once the cache is over its limit, settled entries are evicted
//! oldest-inserted-first. Identical calls that arrive while a computation is
//! still running await the same shared future instead of starting a second one.
//!
//! Expiry is checked lazily on access, so the cache never owns a timer.

use futures::future::{BoxFuture, FutureExt, Shared};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::config::MemoOptions;

type SharedResult<V, E> = Shared<BoxFuture<'static, Result<V, E>>>;

struct Entry<V, E> {
    future: SharedResult<V, E>,
    seq: u64,
    last_access: Instant,
}

struct Entries<V, E> {
    map: HashMap<String, Entry<V, E>>,
    // insertion sequence -> key
    insertion_order: BTreeMap<u64, String>,
    next_seq: u64,
}

impl<V: Clone, E: Clone> Entries<V, E> {
    fn new() -> Self {
        Self {
            map: HashMap::new(),
            insertion_order: BTreeMap::new(),
            next_seq: 0,
        }
    }

    fn insert(&mut self, key: String, future: SharedResult<V, E>, now: Instant) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        if let Some(old) = self.map.insert(key.clone(), Entry { future, seq, last_access: now }) {
            self.insertion_order.remove(&old.seq);
        }
        self.insertion_order.insert(seq, key);
        seq
    }

    fn remove_if_seq(&mut self, key: &str, seq: u64) {
        if self.map.get(key).is_some_and(|entry| entry.seq == seq) {
            self.map.remove(key);
            self.insertion_order.remove(&seq);
        }
    }

    fn purge_expired(&mut self, now: Instant, expire: Option<Duration>) {
        let Some(expire) = expire else {
            return;
        };
        // In-flight entries are never expired out from under their waiters.
        let expired: Vec<(String, u64)> = self
            .map
            .iter()
            .filter(|(_, entry)| {
                entry.future.peek().is_some() && now.saturating_duration_since(entry.last_access) > expire
            })
            .map(|(key, entry)| (key.clone(), entry.seq))
            .collect();
        for (key, seq) in expired {
            self.remove_if_seq(&key, seq);
        }
    }

    /// Evict settled entries, oldest inserted first, until at most `limit`
    /// remain. In-flight entries stay so identical calls keep coalescing.
    fn evict_over(&mut self, limit: usize) {
        let excess = self.map.len().saturating_sub(limit);
        if excess == 0 {
            return;
        }
        let victims: Vec<(u64, String)> = self
            .insertion_order
            .iter()
            .filter(|(_, key)| self.map.get(*key).is_some_and(|entry| entry.future.peek().is_some()))
            .take(excess)
            .map(|(seq, key)| (*seq, key.clone()))
            .collect();
        for (seq, key) in victims {
            tracing::debug!("Evicting cache entry {} (seq {})", short(&key), seq);
            self.remove_if_seq(&key, seq);
        }
    }

    /// Sequence of a settled failure stored under `key`.
    fn settled_error(&self, key: &str) -> Option<u64> {
        self.map
            .get(key)
            .filter(|entry| matches!(entry.future.peek(), Some(Err(_))))
            .map(|entry| entry.seq)
    }
}

fn short(key: &str) -> &str {
    &key[..key.len().min(12)]
}

/// Content hash of serialized arguments.
///
/// # Errors
/// Fails when `args` cannot be serialized to JSON, e.g. a non-UTF-8 path.
pub fn cache_key<A: Serialize + ?Sized>(args: &A) -> Result<String, serde_json::Error> {
    let bytes = serde_json::to_vec(args)?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}

/// A memoized async operation. Clones share the same cache.
pub struct Memo<V, E> {
    name: &'static str,
    options: MemoOptions,
    entries: Arc<Mutex<Entries<V, E>>>,
}

impl<V, E> Clone for Memo<V, E> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            options: self.options,
            entries: Arc::clone(&self.entries),
        }
    }
}

impl<V, E> Memo<V, E>
where
    V: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    /// Create an empty cache. `name` only shows up in log lines.
    pub fn new(name: &'static str, options: MemoOptions) -> Self {
        Self {
            name,
            options,
            entries: Arc::new(Mutex::new(Entries::new())),
        }
    }

    /// Return the cached result for `args`, or run `compute` and cache it.
    ///
    /// `compute` is only invoked on a miss. Failed results are dropped from the
    /// cache once settled unless `cache_errors` is set. Arguments that cannot
    /// be serialized bypass the cache.
    pub async fn call<A, F, Fut>(&self, args: &A, compute: F) -> Result<V, E>
    where
        A: Serialize + ?Sized,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
    {
        let key = match cache_key(args) {
            Ok(key) => key,
            Err(e) => {
                tracing::warn!("{}: arguments not cacheable ({}), calling through", self.name, e);
                return compute().await;
            }
        };

        let (future, seq) = {
            let mut entries = self.entries.lock().await;
            let now = Instant::now();
            entries.purge_expired(now, self.options.expire);
            if !self.options.cache_errors {
                if let Some(seq) = entries.settled_error(&key) {
                    entries.remove_if_seq(&key, seq);
                }
            }

            match entries.map.get_mut(&key) {
                Some(entry) => {
                    tracing::debug!("{}: cache hit {}", self.name, short(&key));
                    entry.last_access = now;
                    (entry.future.clone(), entry.seq)
                }
                None => {
                    tracing::debug!("{}: cache miss {}", self.name, short(&key));
                    let future = compute().boxed().shared();
                    let seq = entries.insert(key.clone(), future.clone(), now);
                    entries.evict_over(self.options.cache_limit);
                    (future, seq)
                }
            }
        };

        let result = future.await;
        let mut entries = self.entries.lock().await;
        if result.is_err() && !self.options.cache_errors {
            entries.remove_if_seq(&key, seq);
        }
        entries.evict_over(self.options.cache_limit);
        result
    }

    /// Number of resident entries, including in-flight ones.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.map.len()
    }

    /// `true` when nothing is resident.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Drop every entry. Callers already awaiting an in-flight entry still get its result.
    pub async fn clear(&self) {
        let mut entries = self.entries.lock().await;
        entries.map.clear();
        entries.insertion_order.clear();
        tracing::info!("{}: cache cleared", self.name);
    }
}
