use async_trait::async_trait;
use serde_json::Value;

use super::DurableError;

/// Persisted half of a mutation, as seen by the coordinator.
/// `DurableStore` is the file-backed implementation; tests swap in
/// backends that fail or record calls.
#[async_trait]
pub trait DurableBackend: Send + Sync {
    async fn put(&self, key: String, value: Value) -> Result<(), DurableError>;
    async fn delete(&self, key: &str) -> Result<(), DurableError>;
}
