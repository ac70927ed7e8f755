//! Environment/runtime helpers
//!
//! Sanity checks run before the backing file is opened.

use std::path::Path;

use tracing::{debug, warn};

/// Make sure the directory holding the backing file exists.
///
/// A bare file name (no parent component) needs nothing.
pub async fn ensure_data_dir(file_path: &Path) -> anyhow::Result<()> {
    let Some(dir) = file_path.parent().filter(|p| !p.as_os_str().is_empty()) else {
        return Ok(());
    };
    if tokio::fs::metadata(dir).await.is_err() {
        warn!(dir = %dir.display(), "data directory not found; creating it");
    }
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| anyhow::anyhow!("cannot create {}: {e}", dir.display()))?;
    debug!(dir = %dir.display(), "data directory ready");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn creates_nested_parent() -> anyhow::Result<()> {
        let root = std::env::temp_dir().join(format!("gdb_env_{}", uuid::Uuid::new_v4()));
        let file = root.join("nested").join("db.json");
        ensure_data_dir(&file).await?;
        assert!(tokio::fs::metadata(root.join("nested")).await?.is_dir());
        let _ = tokio::fs::remove_dir_all(&root).await;
        Ok(())
    }

    #[tokio::test]
    async fn bare_file_name_is_noop() -> anyhow::Result<()> {
        ensure_data_dir(Path::new("db.json")).await
    }
}
