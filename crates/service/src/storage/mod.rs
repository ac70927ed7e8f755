//! Durable side of the cache.
//!
//! One backing file holds the whole durable table as pretty JSON. Every
//! persisted mutation rewrites the file from scratch under the table lock.

pub mod backend;
pub mod durable_store;

pub use backend::DurableBackend;
pub use durable_store::{DurableStore, DurableTable};

use std::{io, path::PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DurableError {
    #[error("cannot open {}: {source}", path.display())]
    Open { path: PathBuf, source: io::Error },
    #[error("cannot read {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("cannot decode {}: {source}", path.display())]
    Decode { path: PathBuf, source: serde_json::Error },
    #[error("encode failed: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("truncate failed: {0}")]
    Truncate(#[source] io::Error),
    #[error("write failed: {0}")]
    Write(#[source] io::Error),
    #[error("sync failed: {0}")]
    Sync(#[source] io::Error),
}
