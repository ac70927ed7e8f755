//! Core of the cache service.
//! - `cache`: the in-memory table that answers every read.
//! - `storage`: the single-file durable table and its rewrite protocol.
//! - `coordinator`: fans a client mutation out to both and joins them.

pub mod errors;
pub mod domain;
pub mod cache;
pub mod storage;
pub mod coordinator;
pub mod metrics;

pub use cache::Cache;
pub use coordinator::CacheService;
pub use storage::{DurableBackend, DurableError, DurableStore};
