pub mod memory;

use crate::core::cache::Cache;
use crate::core::error::{Error, Result};
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use memory::MemoryCache;
use std::{
    any::{Any, TypeId},
    collections::HashMap,
    future::Future,
    sync::{Arc, PoisonError, RwLock},
    time::Duration,
};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::debug;

type SharedLoad<V> = Shared<BoxFuture<'static, Result<V>>>;

/// A TTL cache whose misses are coalesced per key.
///
/// At most one loader runs per key at a time; concurrent callers for the same
/// key await that loader's result. The in-flight lock only guards the map of
/// pending loads and is never held while a loader runs, so unrelated keys load
/// in parallel. Failures are handed to every waiter and are not cached.
pub struct CacheStore<V>
where
    V: Clone + Send + Sync + 'static,
{
    name: String,
    values: Arc<MemoryCache<String, V>>,
    inflight: Arc<Mutex<HashMap<String, SharedLoad<V>>>>,
}

impl<V> CacheStore<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            values: Arc::new(MemoryCache::new()),
            inflight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the cached value for `key`, running `loader` on a miss.
    ///
    /// A waiter whose shared load was cancelled by another caller's token
    /// starts a fresh load unless its own token is cancelled too.
    pub async fn get_or_load<F, Fut>(
        &self,
        ctx: &CancellationToken,
        key: &str,
        ttl: Duration,
        loader: F,
    ) -> Result<V>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<V>> + Send + 'static,
    {
        let key = key.to_string();
        loop {
            if ctx.is_cancelled() {
                return Err(Error::Cancelled);
            }
            if let Some(value) = self.values.get(&key).await {
                return Ok(value);
            }

            let load = {
                let mut inflight = self.inflight.lock().await;
                match inflight.get(&key) {
                    Some(load) => {
                        debug!(collection = %self.name, key = %key, "Joining in-flight load");
                        load.clone()
                    }
                    None => {
                        // A load may have settled between the first lookup and the lock.
                        if let Some(value) = self.values.get(&key).await {
                            return Ok(value);
                        }
                        debug!(collection = %self.name, key = %key, "Starting load");
                        let load = self.start_load(key.clone(), ttl, loader());
                        inflight.insert(key.clone(), load.clone());
                        load
                    }
                }
            };

            let result = tokio::select! {
                biased;
                _ = ctx.cancelled() => return Err(Error::Cancelled),
                result = load => result,
            };

            match result {
                Err(Error::Cancelled) if !ctx.is_cancelled() => {
                    debug!(collection = %self.name, key = %key, "Shared load was cancelled, retrying");
                    continue;
                }
                other => return other,
            }
        }
    }

    fn start_load<Fut>(&self, key: String, ttl: Duration, load: Fut) -> SharedLoad<V>
    where
        Fut: Future<Output = Result<V>> + Send + 'static,
    {
        let values = Arc::clone(&self.values);
        let inflight = Arc::clone(&self.inflight);

        async move {
            let result = load.await;
            if let Ok(value) = &result {
                values.put(key.clone(), value.clone(), Some(ttl)).await;
            }
            inflight.lock().await.remove(&key);
            result
        }
        .boxed()
        .shared()
    }

    pub async fn in_flight(&self) -> usize {
        self.inflight.lock().await.len()
    }
}

/// The process-wide cache service, holding one typed collection per namespace.
///
/// It is constructed explicitly and handed to the components that need it.
pub struct KeyValueStore {
    collections: RwLock<HashMap<(String, TypeId), Arc<dyn Any + Send + Sync>>>,
}

impl KeyValueStore {
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the collection called `name` holding values of type `V`,
    /// creating it on first use.
    pub fn collection<V>(&self, name: &str) -> Arc<CacheStore<V>>
    where
        V: Clone + Send + Sync + 'static,
    {
        let id = (name.to_string(), TypeId::of::<V>());

        let existing = self
            .collections
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned();
        if let Some(existing) = existing
            && let Ok(collection) = existing.downcast::<CacheStore<V>>()
        {
            return collection;
        }

        let mut collections = self
            .collections
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let entry = collections
            .entry(id)
            .or_insert_with(|| Arc::new(CacheStore::<V>::new(name)));
        match Arc::clone(entry).downcast::<CacheStore<V>>() {
            Ok(collection) => collection,
            Err(_) => {
                let collection = Arc::new(CacheStore::<V>::new(name));
                *entry = collection.clone();
                collection
            }
        }
    }
}

impl Default for KeyValueStore {
    fn default() -> Self {
        Self::new()
    }
}
