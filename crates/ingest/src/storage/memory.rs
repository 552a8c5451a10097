use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use consumption_core::ObjectInfo;

use super::{ObjectMetadata, ObjectStore, StoreError, StoreResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub body: Vec<u8>,
    pub content_type: String,
    pub metadata: ObjectMetadata,
    pub last_modified: String,
}

#[derive(Debug, Default)]
struct Inner {
    objects: BTreeMap<(String, String), StoredObject>,
    failing_keys: BTreeSet<String>,
    fail_puts: bool,
    puts: usize,
}

/// In-process object store. Keys can be marked as failing to simulate an
/// unreachable backend.
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    inner: Mutex<Inner>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convenience for seeding CSV objects.
    pub fn insert(&self, bucket: &str, key: &str, body: impl Into<Vec<u8>>) -> StoreResult<()> {
        self.put(bucket, key, &body.into(), "text/csv", &ObjectMetadata::new())
    }

    pub fn object(&self, bucket: &str, key: &str) -> StoreResult<Option<StoredObject>> {
        let inner = self.lock()?;
        Ok(inner
            .objects
            .get(&(bucket.to_string(), key.to_string()))
            .cloned())
    }

    pub fn text(&self, bucket: &str, key: &str) -> StoreResult<Option<String>> {
        Ok(self
            .object(bucket, key)?
            .map(|object| String::from_utf8_lossy(&object.body).into_owned()))
    }

    /// Make every `get` of `key` fail with a non-not-found error.
    pub fn fail_reads(&self, key: &str) -> StoreResult<()> {
        self.lock()?.failing_keys.insert(key.to_string());
        Ok(())
    }

    pub fn fail_writes(&self, fail: bool) -> StoreResult<()> {
        self.lock()?.fail_puts = fail;
        Ok(())
    }

    /// Number of successful `put` calls so far.
    pub fn put_count(&self) -> StoreResult<usize> {
        Ok(self.lock()?.puts)
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }
}

impl ObjectStore for MemoryObjectStore {
    fn list(&self, bucket: &str, prefix: &str, max_keys: usize) -> StoreResult<Vec<ObjectInfo>> {
        let inner = self.lock()?;
        Ok(inner
            .objects
            .iter()
            .filter(|((object_bucket, key), _)| object_bucket == bucket && key.starts_with(prefix))
            .take(max_keys)
            .map(|((_, key), object)| ObjectInfo {
                key: key.clone(),
                size: object.body.len() as u64,
                last_modified: Some(object.last_modified.clone()),
            })
            .collect())
    }

    fn get(&self, bucket: &str, key: &str) -> StoreResult<Vec<u8>> {
        let inner = self.lock()?;
        if inner.failing_keys.contains(key) {
            return Err(StoreError::Unavailable(format!("read of {} failed", key)));
        }
        inner
            .objects
            .get(&(bucket.to_string(), key.to_string()))
            .map(|object| object.body.clone())
            .ok_or_else(|| StoreError::NotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            })
    }

    fn put(
        &self,
        bucket: &str,
        key: &str,
        body: &[u8],
        content_type: &str,
        metadata: &ObjectMetadata,
    ) -> StoreResult<()> {
        let mut inner = self.lock()?;
        if inner.fail_puts {
            return Err(StoreError::Unavailable(format!("write of {} failed", key)));
        }
        inner.objects.insert(
            (bucket.to_string(), key.to_string()),
            StoredObject {
                body: body.to_vec(),
                content_type: content_type.to_string(),
                metadata: metadata.clone(),
                last_modified: Utc::now().to_rfc3339(),
            },
        );
        inner.puts += 1;
        Ok(())
    }
}
