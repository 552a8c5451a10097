use consumption_core::{DEFAULT_PROCESSOR, DateKey, RunOutcome};
use serde::Serialize;

use crate::storage::StoreError;

/// Where the job reads files and keeps its state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestSettings {
    pub bucket: String,
    pub prefix: String,
    pub checkpoint_key: String,
    pub missing_dates_key: String,
    pub default_date: DateKey,
    pub processor: String,
}

impl IngestSettings {
    pub fn new(
        bucket: impl Into<String>,
        prefix: impl Into<String>,
        checkpoint_key: impl Into<String>,
        missing_dates_key: impl Into<String>,
        default_date: DateKey,
    ) -> Self {
        Self {
            bucket: bucket.into(),
            prefix: prefix.into(),
            checkpoint_key: checkpoint_key.into(),
            missing_dates_key: missing_dates_key.into(),
            default_date,
            processor: DEFAULT_PROCESSOR.to_string(),
        }
    }
}

/// Result of loading one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub rows_affected: usize,
    pub success: bool,
    pub failed_row: Option<usize>,
}

impl LoadReport {
    pub fn rejected() -> Self {
        Self {
            rows_affected: 0,
            success: false,
            failed_row: None,
        }
    }
}

/// Per-run counters, reported next to the outcome.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    pub files_discovered: usize,
    pub files_loaded: usize,
    pub files_rejected: usize,
    pub files_empty: usize,
    pub files_skipped: usize,
    pub rows_upserted: usize,
    pub missing_dates: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub outcome: RunOutcome,
    pub stats: RunStats,
}

/// Errors emitted by the ingest pipeline.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("storage error: {0}")]
    Store(#[from] StoreError),
    #[error("db error: {0}")]
    Db(#[from] consumption_db::DbError),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("invalid checkpoint content: {0}")]
    InvalidCheckpoint(String),
    #[error("run stopped while processing {key}: {source}")]
    Aborted {
        key: String,
        processed_dates: Vec<DateKey>,
        #[source]
        source: Box<IngestError>,
    },
}

pub type Result<T> = std::result::Result<T, IngestError>;
