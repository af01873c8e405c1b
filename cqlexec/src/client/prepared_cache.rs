use std::sync::Arc;

use dashmap::DashMap;
use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use tracing::{debug, trace};

use crate::errors::RequestError;
use crate::statement::PreparedStatement;

type PrepareFuture = Shared<BoxFuture<'static, Result<Arc<PreparedStatement>, RequestError>>>;

type CacheKey = (Option<String>, String);

/// Default number of statements kept by the prepared statement cache.
pub(crate) const DEFAULT_MAX_PREPARED_CACHE_SIZE: usize = 1000;

/// Prepared statements by (keyspace, query).
///
/// Concurrent requests for the same statement share one prepare call.
/// Failed prepares are not cached. Once `max_capacity` statements are
/// cached, an arbitrary entry is evicted before a new one is added. A zero
/// capacity disables caching.
pub(crate) struct PreparedCache {
    entries: DashMap<CacheKey, PrepareFuture>,
    max_capacity: usize,
}

impl PreparedCache {
    pub(crate) fn new(max_capacity: usize) -> Self {
        PreparedCache {
            entries: DashMap::new(),
            max_capacity,
        }
    }

    pub(crate) async fn get_or_prepare<F>(
        &self,
        keyspace: Option<&str>,
        query: &str,
        prepare: F,
    ) -> Result<Arc<PreparedStatement>, RequestError>
    where
        F: FnOnce() -> BoxFuture<'static, Result<PreparedStatement, RequestError>>,
    {
        if self.max_capacity == 0 {
            return prepare().await.map(Arc::new);
        }

        let key = (keyspace.map(str::to_owned), query.to_owned());
        if !self.entries.contains_key(&key) {
            self.make_room();
        }
        let pending = self
            .entries
            .entry(key.clone())
            .or_insert_with(|| {
                debug!("Preparing statement {:?}", query);
                prepare().map(|res| res.map(Arc::new)).boxed().shared()
            })
            .clone();

        let result = pending.clone().await;
        if result.is_err() {
            self.entries
                .remove_if(&key, |_, cached| cached.ptr_eq(&pending));
        }
        result
    }

    fn make_room(&self) {
        // Loops because concurrent inserters may evict the same entry.
        while self.entries.len() >= self.max_capacity {
            // No reference into the map may be held while removing.
            let Some(victim) = self.entries.iter().next().map(|e| e.key().clone()) else {
                break;
            };
            trace!("Evicting prepared statement {:?}", victim.1);
            self.entries.remove(&victim);
        }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}
