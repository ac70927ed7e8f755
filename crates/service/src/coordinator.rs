use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, error};

use crate::{
    cache::Cache,
    domain::{Entry, Lookup, RemoveRequest, SetRequest},
    errors::ServiceError,
    metrics,
    storage::{DurableBackend, DurableError},
};

/// Turns one client request into cache and durable-store calls.
///
/// A mutation always updates the cache. When the caller asks for durability
/// the durable update is spawned alongside it, and both are joined before
/// the result is returned. Each side runs as its own task, so dropping the
/// caller's future does not cancel a mutation that has started.
///
/// A durable failure does not roll back the cache: the caller receives
/// `ServiceError::Persistence` while reads already observe the new value,
/// and cache and disk disagree on that key until a later persisted write
/// for it succeeds.
#[derive(Clone)]
pub struct CacheService {
    cache: Arc<Cache>,
    durable: Arc<dyn DurableBackend>,
}

impl CacheService {
    pub fn new(cache: Arc<Cache>, durable: Arc<dyn DurableBackend>) -> Self {
        Self { cache, durable }
    }

    pub fn cache(&self) -> &Arc<Cache> {
        &self.cache
    }

    pub async fn set(&self, req: SetRequest) -> Result<Entry, ServiceError> {
        metrics::REQUESTS_TOTAL.with_label_values(&["set"]).inc();
        let SetRequest { key, value, persist } = req;

        let cache_task = {
            let cache = Arc::clone(&self.cache);
            let (key, value) = (key.clone(), value.clone());
            tokio::spawn(async move { cache.set(key, value).await })
        };
        let durable_task = persist.then(|| {
            let durable = Arc::clone(&self.durable);
            let (key, value) = (key.clone(), value.clone());
            tokio::spawn(async move { durable.put(key, value).await })
        });

        if let Err(e) = join_paths(cache_task, durable_task).await {
            report_failure("set", &key, &e);
            return Err(e);
        }
        debug!(%key, persist, "set applied");
        Ok(Entry { key, value })
    }

    pub async fn get(&self, key: String) -> Lookup {
        metrics::REQUESTS_TOTAL.with_label_values(&["get"]).inc();
        let value = self.cache.get(&key).await;
        if value.is_some() {
            metrics::CACHE_HITS_TOTAL.inc();
        } else {
            metrics::CACHE_MISSES_TOTAL.inc();
        }
        Lookup { key, value }
    }

    pub async fn remove(&self, req: RemoveRequest) -> Result<(), ServiceError> {
        metrics::REQUESTS_TOTAL.with_label_values(&["remove"]).inc();
        let RemoveRequest { key, erase } = req;

        let cache_task = {
            let cache = Arc::clone(&self.cache);
            let key = key.clone();
            tokio::spawn(async move { cache.delete(&key).await })
        };
        let durable_task = erase.then(|| {
            let durable = Arc::clone(&self.durable);
            let key = key.clone();
            tokio::spawn(async move { durable.delete(&key).await })
        });

        if let Err(e) = join_paths(cache_task, durable_task).await {
            report_failure("remove", &key, &e);
            return Err(e);
        }
        debug!(%key, erase, "remove applied");
        Ok(())
    }
}

/// Wait for both sides. Only the durable side can fail; a panicked task
/// surfaces as `ServiceError::Task`.
async fn join_paths(
    cache_task: JoinHandle<()>,
    durable_task: Option<JoinHandle<Result<(), DurableError>>>,
) -> Result<(), ServiceError> {
    let durable = async move {
        match durable_task {
            Some(handle) => handle.await.map(Some),
            None => Ok(None),
        }
    };
    let (cache_res, durable_res) = tokio::join!(cache_task, durable);
    cache_res?;
    match durable_res? {
        Some(Err(e)) => Err(ServiceError::Persistence(e)),
        _ => Ok(()),
    }
}

fn report_failure(op: &str, key: &str, err: &ServiceError) {
    match err {
        ServiceError::Persistence(_) => {
            metrics::PERSISTENCE_FAILURES_TOTAL.with_label_values(&[op]).inc();
            error!(op, %key, error = %err, "durable update failed; cache keeps the new state");
        }
        ServiceError::Task(_) => {
            error!(op, %key, error = %err, "request sub-task panicked; cache and disk may both be stale");
        }
        _ => error!(op, %key, error = %err, "mutation failed"),
    }
}
