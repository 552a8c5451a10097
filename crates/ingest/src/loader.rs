use consumption_core::{ConsumptionRecord, REQUIRED_COLUMNS, WorkItem};
use consumption_db::ConsumptionBatch;
use tracing::{debug, error, warn};

use crate::parser::{CsvTable, DateColumn, parse_token_count};
use crate::storage::ObjectStore;
use crate::types::{LoadReport, Result};

/// Column positions of the required fields within a table.
struct Columns {
    date: usize,
    client_id: usize,
    client_name: usize,
    service_name: usize,
    total_consumed_tokens: usize,
}

impl Columns {
    fn resolve(table: &CsvTable) -> Option<Self> {
        Some(Self {
            date: table.column_index("date")?,
            client_id: table.column_index("client_id")?,
            client_name: table.column_index("client_name")?,
            service_name: table.column_index("service_name")?,
            total_consumed_tokens: table.column_index("total_consumed_tokens")?,
        })
    }

    fn record(&self, row: &[String]) -> ConsumptionRecord {
        ConsumptionRecord {
            date: row[self.date].trim().to_string(),
            client_id: row[self.client_id].trim().to_string(),
            client_name: non_empty(&row[self.client_name]),
            service_name: non_empty(&row[self.service_name]),
            total_consumed_tokens: parse_token_count(&row[self.total_consumed_tokens]),
        }
    }
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Turns discovered files into upserts on the consumption table.
pub struct RowLoader<'a> {
    store: &'a dyn ObjectStore,
    bucket: &'a str,
}

impl<'a> RowLoader<'a> {
    pub fn new(store: &'a dyn ObjectStore, bucket: &'a str) -> Self {
        Self { store, bucket }
    }

    /// Read and parse the file behind `item`.
    ///
    /// `None` means the file has no usable data: it vanished, is not UTF-8,
    /// is not valid CSV, or has no rows. Other storage errors are returned.
    pub fn fetch(&self, item: &WorkItem) -> Result<Option<CsvTable>> {
        let bytes = match self.store.get(self.bucket, &item.key) {
            Ok(bytes) => bytes,
            Err(err) if err.is_not_found() => {
                warn!(key = %item.key, "file disappeared before it could be read");
                return Ok(None);
            }
            Err(err) => {
                error!(key = %item.key, error = %err, "error reading file");
                return Err(err.into());
            }
        };

        let mut table = match CsvTable::parse(&bytes) {
            Ok(table) => table,
            Err(err) => {
                warn!(key = %item.key, error = %err, "error parsing csv");
                return Ok(None);
            }
        };
        if table.is_empty() {
            return Ok(None);
        }

        match table.normalize_date_column() {
            DateColumn::Unparsed => warn!(key = %item.key, "could not parse date column"),
            format => debug!(key = %item.key, format = ?format, "date column normalized"),
        }
        Ok(Some(table))
    }

    /// Upsert every row of `table` into `batch`, stopping at the first row the
    /// database rejects.
    ///
    /// The caller owns the batch and decides whether to commit it; a report
    /// with `success == false` means it must be rolled back. Database errors
    /// that are not caused by a row's values are returned.
    pub fn load(
        &self,
        batch: &mut ConsumptionBatch<'_>,
        item: &WorkItem,
        table: &CsvTable,
    ) -> Result<LoadReport> {
        let missing = table.missing_columns(&REQUIRED_COLUMNS);
        let Some(columns) = Columns::resolve(table).filter(|_| missing.is_empty()) else {
            warn!(key = %item.key, missing = ?missing, "missing columns");
            return Ok(LoadReport::rejected());
        };

        for (index, row) in table.rows().iter().enumerate() {
            let record = columns.record(row);
            match batch.upsert(&record) {
                Ok(()) => {}
                Err(err) if err.is_row_fault() => {
                    error!(
                        key = %item.key,
                        row = index,
                        error = %err,
                        "error inserting row"
                    );
                    return Ok(LoadReport {
                        rows_affected: batch.upserted(),
                        success: false,
                        failed_row: Some(index),
                    });
                }
                Err(err) => {
                    error!(
                        key = %item.key,
                        row = index,
                        error = %err,
                        "database failure while inserting row"
                    );
                    return Err(err.into());
                }
            }
        }

        Ok(LoadReport {
            rows_affected: batch.upserted(),
            success: true,
            failed_row: None,
        })
    }
}
