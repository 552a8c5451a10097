//! Object store capability used by the checkpoint, the ledger, discovery and
//! the loader.

mod local;
mod memory;

use std::collections::BTreeMap;
use std::io;

use consumption_core::ObjectInfo;

pub use local::LocalObjectStore;
pub use memory::{MemoryObjectStore, StoredObject};

/// Free-form object metadata written alongside a body.
pub type ObjectMetadata = BTreeMap<String, String>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("object not found: {bucket}/{key}")]
    NotFound { bucket: String, key: String },
    #[error("invalid object key {0:?}")]
    InvalidKey(String),
    #[error("io error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("walk error: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("metadata error: {0}")]
    Metadata(#[from] serde_json::Error),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Minimal get/put/list surface of a bucketed object store.
///
/// `list` returns at most `max_keys` objects in lexical key order, which
/// mirrors reading only the first page of a paginated listing.
pub trait ObjectStore {
    fn list(&self, bucket: &str, prefix: &str, max_keys: usize) -> StoreResult<Vec<ObjectInfo>>;

    fn get(&self, bucket: &str, key: &str) -> StoreResult<Vec<u8>>;

    fn put(
        &self,
        bucket: &str,
        key: &str,
        body: &[u8],
        content_type: &str,
        metadata: &ObjectMetadata,
    ) -> StoreResult<()>;
}
