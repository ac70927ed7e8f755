use std::collections::HashMap;

use serde_json::Value;
use tokio::sync::Mutex;

/// In-memory table answering every read.
///
/// One lock covers the whole map, so operations on unrelated keys
/// serialize against each other.
#[derive(Debug, Default)]
pub struct Cache {
    values: Mutex<HashMap<String, Value>>,
}

impl Cache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache pre-filled with `entries`, used for warm start from the durable table.
    pub fn warm<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        Self { values: Mutex::new(entries.into_iter().collect()) }
    }

    pub async fn set(&self, key: String, value: Value) {
        self.values.lock().await.insert(key, value);
    }

    pub async fn get(&self, key: &str) -> Option<Value> {
        self.values.lock().await.get(key).cloned()
    }

    /// No-op when the key is absent.
    pub async fn delete(&self, key: &str) {
        self.values.lock().await.remove(key);
    }

    pub async fn len(&self) -> usize {
        self.values.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.values.lock().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn set_get_delete() {
        let cache = Cache::new();
        assert!(cache.is_empty().await);
        assert_eq!(cache.get("a").await, None);

        cache.set("a".into(), json!({"x": 1})).await;
        assert_eq!(cache.get("a").await, Some(json!({"x": 1})));

        cache.set("a".into(), json!(null)).await;
        assert_eq!(cache.get("a").await, Some(json!(null)));

        cache.delete("a").await;
        cache.delete("a").await;
        assert_eq!(cache.get("a").await, None);
    }

    #[tokio::test]
    async fn warm_start_copies_entries() {
        let cache = Cache::warm([("a".to_string(), json!(1)), ("b".to_string(), json!("two"))]);
        assert_eq!(cache.len().await, 2);
        assert_eq!(cache.get("b").await, Some(json!("two")));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_writers_on_distinct_keys() -> Result<(), anyhow::Error> {
        let cache = Arc::new(Cache::new());
        let handles: Vec<_> = (0..64)
            .map(|i| {
                let cache = Arc::clone(&cache);
                tokio::spawn(async move { cache.set(format!("k{i}"), json!(i)).await })
            })
            .collect();
        for h in handles {
            h.await?;
        }
        assert_eq!(cache.len().await, 64);
        Ok(())
    }
}
