mod checkpoint;
mod discovery;
mod ledger;
mod loader;
mod parser;
mod pipeline;
mod storage;
mod types;

pub use checkpoint::{CheckpointAudit, CheckpointStore, audit_key};
pub use discovery::{DiscoveredWork, candidate_dates, discover_work};
pub use ledger::{MissingDateLedger, retain_recent};
pub use loader::RowLoader;
pub use parser::{CsvTable, DateColumn, ParseError, parse_token_count};
pub use pipeline::run_ingest;
pub use storage::{
    LocalObjectStore, MemoryObjectStore, ObjectMetadata, ObjectStore, StoreError, StoreResult,
    StoredObject,
};
pub use types::{IngestError, IngestSettings, LoadReport, Result, RunReport, RunStats};
