use std::{collections::BTreeMap, io::SeekFrom, path::{Path, PathBuf}, sync::Arc};

use async_trait::async_trait;
use serde_json::Value;
use tokio::{
    fs::{File, OpenOptions},
    io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt},
    sync::Mutex,
};
use tracing::debug;

use super::{DurableBackend, DurableError};
use crate::metrics;

/// Decoded contents of the backing file. Sorted so rewrites are stable.
pub type DurableTable = BTreeMap<String, Value>;

struct DurableState {
    file: File,
    table: DurableTable,
}

/// Single-file durable table.
///
/// Keeps the decoded table in memory next to the open file handle. `put`
/// and `delete` mutate the table and then rewrite the whole file while still
/// holding the lock, so concurrent persisted mutations never interleave
/// their writes.
///
/// If a rewrite fails the in-memory table keeps the attempted mutation even
/// though the file may not reflect it.
pub struct DurableStore {
    state: Mutex<DurableState>,
    path: PathBuf,
    sync_writes: bool,
}

impl DurableStore {
    /// Open (creating if absent) the backing file and decode it.
    /// An empty file yields an empty table.
    pub async fn load<P: Into<PathBuf>>(path: P, sync_writes: bool) -> Result<Arc<Self>, DurableError> {
        let path = path.into();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .await
            .map_err(|source| DurableError::Open { path: path.clone(), source })?;
        Self::from_file(file, path, sync_writes).await
    }

    /// Build a store around an already-open handle positioned at the start.
    pub async fn from_file(mut file: File, path: PathBuf, sync_writes: bool) -> Result<Arc<Self>, DurableError> {
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)
            .await
            .map_err(|source| DurableError::Read { path: path.clone(), source })?;
        let table = decode_table(&bytes).map_err(|source| DurableError::Decode { path: path.clone(), source })?;
        debug!(path = %path.display(), entries = table.len(), "durable table loaded");

        Ok(Arc::new(Self {
            state: Mutex::new(DurableState { file, table }),
            path,
            sync_writes,
        }))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Copy of the current durable table.
    pub async fn snapshot(&self) -> DurableTable {
        self.state.lock().await.table.clone()
    }

    /// Insert or overwrite `key`, then rewrite the file.
    pub async fn put(&self, key: String, value: Value) -> Result<(), DurableError> {
        let mut state = self.state.lock().await;
        state.table.insert(key, value);
        self.rewrite(&mut state).await
    }

    /// Remove `key` if present, then rewrite the file. Absent keys are not an error.
    pub async fn delete(&self, key: &str) -> Result<(), DurableError> {
        let mut state = self.state.lock().await;
        state.table.remove(key);
        self.rewrite(&mut state).await
    }

    /// Flush and sync the handle. Called once at shutdown.
    pub async fn close(&self) -> Result<(), DurableError> {
        let mut state = self.state.lock().await;
        state.file.flush().await.map_err(DurableError::Write)?;
        state.file.sync_all().await.map_err(DurableError::Sync)?;
        debug!(path = %self.path.display(), "durable store closed");
        Ok(())
    }

    // Caller holds the lock for the whole truncate + write.
    async fn rewrite(&self, state: &mut DurableState) -> Result<(), DurableError> {
        let _timer = metrics::DURABLE_REWRITE_SECONDS.start_timer();
        let encoded = encode_table(&state.table)?;

        let file = &mut state.file;
        file.set_len(0).await.map_err(DurableError::Truncate)?;
        file.seek(SeekFrom::Start(0)).await.map_err(DurableError::Truncate)?;
        file.write_all(&encoded).await.map_err(DurableError::Write)?;
        file.flush().await.map_err(DurableError::Write)?;
        if self.sync_writes {
            file.sync_data().await.map_err(DurableError::Sync)?;
        }

        debug!(
            path = %self.path.display(),
            entries = state.table.len(),
            bytes = encoded.len(),
            "durable table rewritten"
        );
        Ok(())
    }
}

#[async_trait]
impl DurableBackend for DurableStore {
    async fn put(&self, key: String, value: Value) -> Result<(), DurableError> { self.put(key, value).await }
    async fn delete(&self, key: &str) -> Result<(), DurableError> { self.delete(key).await }
}

fn decode_table(bytes: &[u8]) -> Result<DurableTable, serde_json::Error> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(DurableTable::new());
    }
    serde_json::from_slice(bytes)
}

fn encode_table(table: &DurableTable) -> Result<Vec<u8>, DurableError> {
    let mut buf = serde_json::to_vec_pretty(table).map_err(DurableError::Encode)?;
    buf.push(b'\n');
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tmp_path() -> PathBuf {
        std::env::temp_dir().join(format!("durable_store_{}.json", uuid::Uuid::new_v4()))
    }

    #[tokio::test]
    async fn load_creates_missing_file_with_empty_table() -> Result<(), anyhow::Error> {
        let tmp = tmp_path();
        let store = DurableStore::load(&tmp, false).await?;

        assert!(store.snapshot().await.is_empty());
        assert!(tokio::fs::metadata(&tmp).await?.is_file());

        let _ = tokio::fs::remove_file(&tmp).await;
        Ok(())
    }

    #[tokio::test]
    async fn whitespace_only_file_is_empty_table() -> Result<(), anyhow::Error> {
        let tmp = tmp_path();
        tokio::fs::write(&tmp, " \n\t\n").await?;
        let store = DurableStore::load(&tmp, false).await?;
        assert!(store.snapshot().await.is_empty());

        let _ = tokio::fs::remove_file(&tmp).await;
        Ok(())
    }

    #[tokio::test]
    async fn undecodable_file_fails_load() -> Result<(), anyhow::Error> {
        let tmp = tmp_path();
        tokio::fs::write(&tmp, "{not json").await?;
        let err = DurableStore::load(&tmp, false).await.err().expect("decode must fail");
        assert!(matches!(err, DurableError::Decode { .. }));

        let _ = tokio::fs::remove_file(&tmp).await;
        Ok(())
    }

    #[tokio::test]
    async fn load_fails_when_path_is_unopenable() -> Result<(), anyhow::Error> {
        let dir = std::env::temp_dir().join(format!("durable_store_dir_{}", uuid::Uuid::new_v4()));
        tokio::fs::create_dir_all(&dir).await?;

        let err = DurableStore::load(&dir, false).await.err().expect("a directory is not a backing file");
        assert!(matches!(err, DurableError::Open { .. } | DurableError::Read { .. }));

        let _ = tokio::fs::remove_dir_all(&dir).await;
        Ok(())
    }

    #[tokio::test]
    async fn put_rewrites_pretty_json_and_reloads() -> Result<(), anyhow::Error> {
        let tmp = tmp_path();
        let store = DurableStore::load(&tmp, true).await?;

        store.put("b".into(), json!({"nested": [1, 2]})).await?;
        store.put("a".into(), json!(1)).await?;

        let on_disk = tokio::fs::read_to_string(&tmp).await?;
        assert_eq!(
            on_disk,
            "{\n  \"a\": 1,\n  \"b\": {\n    \"nested\": [\n      1,\n      2\n    ]\n  }\n}\n"
        );

        let reloaded = DurableStore::load(&tmp, false).await?;
        assert_eq!(reloaded.snapshot().await, store.snapshot().await);

        let _ = tokio::fs::remove_file(&tmp).await;
        Ok(())
    }

    #[tokio::test]
    async fn shrinking_rewrite_leaves_no_stale_bytes() -> Result<(), anyhow::Error> {
        let tmp = tmp_path();
        let store = DurableStore::load(&tmp, false).await?;

        store.put("k".into(), json!("a fairly long value that takes up room")).await?;
        store.put("k".into(), json!("x")).await?;

        let decoded: serde_json::Value = serde_json::from_slice(&tokio::fs::read(&tmp).await?)?;
        assert_eq!(decoded, json!({"k": "x"}));

        let _ = tokio::fs::remove_file(&tmp).await;
        Ok(())
    }

    #[tokio::test]
    async fn delete_absent_key_still_rewrites() -> Result<(), anyhow::Error> {
        let tmp = tmp_path();
        let store = DurableStore::load(&tmp, false).await?;

        store.delete("missing").await?;
        assert_eq!(tokio::fs::read_to_string(&tmp).await?, "{}\n");

        store.put("a".into(), json!(true)).await?;
        store.delete("a").await?;
        let reloaded = DurableStore::load(&tmp, false).await?;
        assert!(reloaded.snapshot().await.is_empty());

        let _ = tokio::fs::remove_file(&tmp).await;
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_puts_serialize_rewrites() -> Result<(), anyhow::Error> {
        let tmp = tmp_path();
        let store = DurableStore::load(&tmp, false).await?;

        let handles: Vec<_> = (0..32)
            .map(|i| {
                let store = Arc::clone(&store);
                tokio::spawn(async move { store.put(format!("key{i}"), json!(i)).await })
            })
            .collect();
        for h in handles {
            h.await??;
        }

        let reloaded = DurableStore::load(&tmp, false).await?;
        let table = reloaded.snapshot().await;
        assert_eq!(table.len(), 32);
        for i in 0..32 {
            assert_eq!(table.get(&format!("key{i}")), Some(&json!(i)));
        }

        let _ = tokio::fs::remove_file(&tmp).await;
        Ok(())
    }

    #[tokio::test]
    async fn failed_rewrite_keeps_in_memory_mutation() -> Result<(), anyhow::Error> {
        let tmp = tmp_path();
        tokio::fs::write(&tmp, "{\"a\": 1}").await?;
        let read_only = File::from_std(std::fs::File::open(&tmp)?);
        let store = DurableStore::from_file(read_only, tmp.clone(), false).await?;

        let err = store.put("a".into(), json!(2)).await.err().expect("read-only handle must fail");
        assert!(matches!(err, DurableError::Truncate(_) | DurableError::Write(_)));

        // memory diverges from disk
        assert_eq!(store.snapshot().await.get("a"), Some(&json!(2)));
        assert_eq!(tokio::fs::read_to_string(&tmp).await?, "{\"a\": 1}");

        let _ = tokio::fs::remove_file(&tmp).await;
        Ok(())
    }
}
