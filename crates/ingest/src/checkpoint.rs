use chrono::Utc;
use consumption_core::DateKey;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::storage::{ObjectMetadata, ObjectStore};
use crate::types::{IngestError, IngestSettings, Result};

/// Audit record written next to the plain-text checkpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointAudit {
    pub last_processed_date: DateKey,
    pub updated_at: String,
    pub processor: String,
}

/// Key of the audit record derived from the checkpoint key.
pub fn audit_key(checkpoint_key: &str) -> String {
    match checkpoint_key.strip_suffix(".txt") {
        Some(stem) => format!("{}_detailed.json", stem),
        None => format!("{}_detailed.json", checkpoint_key),
    }
}

/// Reads and advances the last fully processed date.
pub struct CheckpointStore<'a> {
    store: &'a dyn ObjectStore,
    settings: &'a IngestSettings,
}

impl<'a> CheckpointStore<'a> {
    pub fn new(store: &'a dyn ObjectStore, settings: &'a IngestSettings) -> Self {
        Self { store, settings }
    }

    /// Persisted checkpoint, or the configured default when it is absent or
    /// cannot be read.
    pub fn get_checkpoint(&self) -> DateKey {
        let default_date = self.settings.default_date;
        match self.read_checkpoint() {
            Ok(Some(date)) => {
                info!(checkpoint = %date, "found checkpoint");
                date
            }
            Ok(None) => {
                info!(
                    default_date = %default_date,
                    "checkpoint file not found, starting from default date"
                );
                default_date
            }
            Err(err) => {
                error!(
                    key = %self.settings.checkpoint_key,
                    error = %err,
                    "error getting checkpoint, starting from default date"
                );
                default_date
            }
        }
    }

    fn read_checkpoint(&self) -> Result<Option<DateKey>> {
        let body = match self
            .store
            .get(&self.settings.bucket, &self.settings.checkpoint_key)
        {
            Ok(body) => body,
            Err(err) if err.is_not_found() => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let text = String::from_utf8(body)
            .map_err(|err| IngestError::InvalidCheckpoint(err.to_string()))?;
        let date = text
            .trim()
            .parse::<DateKey>()
            .map_err(|err| IngestError::InvalidCheckpoint(err.to_string()))?;
        Ok(Some(date))
    }

    /// Advance the checkpoint to `date` if it is strictly newer.
    ///
    /// Returns `false` when the stored checkpoint is already at or past
    /// `date`. A checkpoint that cannot be read is an error, never the
    /// default date; unparseable content is overwritten. Write failures are
    /// returned to the caller.
    pub fn update_checkpoint(&self, date: DateKey) -> Result<bool> {
        let current = match self.read_checkpoint() {
            Ok(Some(current)) => current,
            Ok(None) => self.settings.default_date,
            Err(IngestError::InvalidCheckpoint(reason)) => {
                warn!(
                    key = %self.settings.checkpoint_key,
                    error = %reason,
                    "replacing unreadable checkpoint content"
                );
                self.settings.default_date
            }
            Err(err) => {
                error!(
                    key = %self.settings.checkpoint_key,
                    error = %err,
                    "error reading checkpoint before update"
                );
                return Err(err);
            }
        };
        if date <= current {
            info!(
                current = %current,
                new = %date,
                "skipping checkpoint update"
            );
            return Ok(false);
        }

        let updated_at = Utc::now().to_rfc3339();
        let mut metadata = ObjectMetadata::new();
        metadata.insert("updated_at".to_string(), updated_at.clone());
        metadata.insert("processor".to_string(), self.settings.processor.clone());
        if let Err(err) = self.store.put(
            &self.settings.bucket,
            &self.settings.checkpoint_key,
            date.to_string().as_bytes(),
            "text/plain",
            &metadata,
        ) {
            error!(checkpoint = %date, error = %err, "error updating checkpoint");
            return Err(err.into());
        }
        info!(checkpoint = %date, "checkpoint updated");

        let audit = CheckpointAudit {
            last_processed_date: date,
            updated_at,
            processor: self.settings.processor.clone(),
        };
        let body = serde_json::to_vec_pretty(&audit)?;
        let key = audit_key(&self.settings.checkpoint_key);
        if let Err(err) = self.store.put(
            &self.settings.bucket,
            &key,
            &body,
            "application/json",
            &ObjectMetadata::new(),
        ) {
            error!(key = %key, error = %err, "error writing checkpoint audit record");
            return Err(err.into());
        }
        Ok(true)
    }
}
