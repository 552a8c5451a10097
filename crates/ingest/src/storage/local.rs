use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use chrono::{DateTime, Utc};
use consumption_core::ObjectInfo;
use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use super::{ObjectMetadata, ObjectStore, StoreError, StoreResult};

const SIDECAR_SUFFIX: &str = ".meta.json";

#[derive(Debug, Serialize, Deserialize)]
struct Sidecar {
    content_type: String,
    metadata: ObjectMetadata,
}

/// Object store backed by a directory tree: `<root>/<bucket>/<key>`.
///
/// Content type and metadata live in a `<key>.meta.json` sidecar that
/// listings skip.
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn object_path(&self, bucket: &str, key: &str) -> StoreResult<PathBuf> {
        let bucket_dir = self.bucket_dir(bucket)?;
        if key.is_empty() || key.ends_with('/') || !is_relative_path(key) {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        Ok(bucket_dir.join(key))
    }

    fn bucket_dir(&self, bucket: &str) -> StoreResult<PathBuf> {
        if bucket.is_empty() || bucket.contains('/') || !is_relative_path(bucket) {
            return Err(StoreError::InvalidKey(bucket.to_string()));
        }
        Ok(self.root.join(bucket))
    }

    /// Read the sidecar written by `put`, if any.
    pub fn metadata(
        &self,
        bucket: &str,
        key: &str,
    ) -> StoreResult<Option<(String, ObjectMetadata)>> {
        let path = sidecar_path(&self.object_path(bucket, key)?);
        match fs::read(&path) {
            Ok(bytes) => {
                let sidecar: Sidecar = serde_json::from_slice(&bytes)?;
                Ok(Some((sidecar.content_type, sidecar.metadata)))
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(io_error(&path, err)),
        }
    }
}

impl ObjectStore for LocalObjectStore {
    fn list(&self, bucket: &str, prefix: &str, max_keys: usize) -> StoreResult<Vec<ObjectInfo>> {
        let bucket_dir = self.bucket_dir(bucket)?;
        // Walk only the deepest directory the prefix fully names.
        let walk_root = match prefix.rfind('/') {
            Some(pos) if is_relative_path(&prefix[..pos]) => bucket_dir.join(&prefix[..pos]),
            Some(_) => return Err(StoreError::InvalidKey(prefix.to_string())),
            None => bucket_dir.clone(),
        };
        if !walk_root.is_dir() {
            return Ok(Vec::new());
        }

        let mut objects = Vec::new();
        for entry in WalkDir::new(&walk_root).follow_links(false) {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            if path.to_string_lossy().ends_with(SIDECAR_SUFFIX) {
                continue;
            }
            let Some(key) = key_from_path(&bucket_dir, path) else {
                continue;
            };
            if !key.starts_with(prefix) {
                continue;
            }
            let metadata = entry.metadata()?;
            let last_modified = metadata
                .modified()
                .ok()
                .map(|time| DateTime::<Utc>::from(time).to_rfc3339());
            objects.push(ObjectInfo {
                key,
                size: metadata.len(),
                last_modified,
            });
        }
        // Directory walk order differs from key order once keys nest.
        objects.sort_by(|a, b| a.key.cmp(&b.key));
        objects.truncate(max_keys);
        Ok(objects)
    }

    fn get(&self, bucket: &str, key: &str) -> StoreResult<Vec<u8>> {
        let path = self.object_path(bucket, key)?;
        fs::read(&path).map_err(|err| {
            if err.kind() == io::ErrorKind::NotFound {
                StoreError::NotFound {
                    bucket: bucket.to_string(),
                    key: key.to_string(),
                }
            } else {
                io_error(&path, err)
            }
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
        let path = self.object_path(bucket, key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|err| io_error(parent, err))?;
        }
        fs::write(&path, body).map_err(|err| io_error(&path, err))?;
        let sidecar = Sidecar {
            content_type: content_type.to_string(),
            metadata: metadata.clone(),
        };
        let sidecar_path = sidecar_path(&path);
        fs::write(&sidecar_path, serde_json::to_vec_pretty(&sidecar)?)
            .map_err(|err| io_error(&sidecar_path, err))?;
        Ok(())
    }
}

fn is_relative_path(value: &str) -> bool {
    Path::new(value)
        .components()
        .all(|component| matches!(component, Component::Normal(_)))
}

fn key_from_path(bucket_dir: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(bucket_dir).ok()?;
    let parts = relative
        .components()
        .map(|component| component.as_os_str().to_str())
        .collect::<Option<Vec<_>>>()?;
    Some(parts.join("/"))
}

fn sidecar_path(path: &Path) -> PathBuf {
    let mut raw = path.as_os_str().to_os_string();
    raw.push(SIDECAR_SUFFIX);
    PathBuf::from(raw)
}

fn io_error(path: &Path, source: io::Error) -> StoreError {
    StoreError::Io {
        path: path.display().to_string(),
        source,
    }
}
