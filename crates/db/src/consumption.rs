use chrono::Utc;
use consumption_core::ConsumptionRecord;
use rusqlite::{OptionalExtension, Row, Transaction, params};

use crate::Db;
use crate::error::Result;
use crate::types::StoredConsumption;

const UPSERT_CONSUMPTION: &str = r#"
    INSERT INTO consumptions (
      date, client_id, client_name, service_name, total_consumed_tokens,
      created_at, updated_at, is_active
    ) VALUES (
      ?1, ?2, ?3, ?4, ?5, ?6, ?6, 1
    )
    ON CONFLICT(date, client_id) DO UPDATE SET
      client_name = excluded.client_name,
      service_name = excluded.service_name,
      total_consumed_tokens = excluded.total_consumed_tokens,
      updated_at = excluded.updated_at
"#;

/// Open transaction covering the rows of one file.
///
/// Dropping the batch without calling [`ConsumptionBatch::commit`] rolls
/// every upsert back.
pub struct ConsumptionBatch<'c> {
    tx: Transaction<'c>,
    upserted: usize,
}

impl<'c> ConsumptionBatch<'c> {
    pub fn upsert(&mut self, record: &ConsumptionRecord) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        let mut stmt = self.tx.prepare_cached(UPSERT_CONSUMPTION)?;
        stmt.execute(params![
            record.date,
            record.client_id,
            record.client_name,
            record.service_name,
            record.total_consumed_tokens,
            now,
        ])?;
        self.upserted += 1;
        Ok(())
    }

    pub fn upserted(&self) -> usize {
        self.upserted
    }

    pub fn commit(self) -> Result<usize> {
        let upserted = self.upserted;
        self.tx.commit()?;
        Ok(upserted)
    }

    pub fn rollback(self) -> Result<()> {
        self.tx.rollback()?;
        Ok(())
    }
}

impl Db {
    pub fn begin_batch(&mut self) -> Result<ConsumptionBatch<'_>> {
        let tx = self.conn.transaction()?;
        Ok(ConsumptionBatch { tx, upserted: 0 })
    }

    pub fn count_consumptions(&self) -> Result<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM consumptions", [], |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }

    pub fn get_consumption(
        &self,
        date: &str,
        client_id: &str,
    ) -> Result<Option<StoredConsumption>> {
        Ok(self
            .conn
            .query_row(
                r#"
                SELECT date, client_id, client_name, service_name, total_consumed_tokens,
                       created_at, updated_at, is_active
                FROM consumptions
                WHERE date = ?1 AND client_id = ?2
                "#,
                params![date, client_id],
                row_to_stored_consumption,
            )
            .optional()?)
    }

    pub fn list_consumptions_for_date(&self, date: &str) -> Result<Vec<StoredConsumption>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT date, client_id, client_name, service_name, total_consumed_tokens,
                   created_at, updated_at, is_active
            FROM consumptions
            WHERE date = ?1
            ORDER BY client_id ASC
            "#,
        )?;
        let rows = stmt.query_map(params![date], row_to_stored_consumption)?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }
}

fn row_to_stored_consumption(
    row: &Row<'_>,
) -> std::result::Result<StoredConsumption, rusqlite::Error> {
    Ok(StoredConsumption {
        date: row.get(0)?,
        client_id: row.get(1)?,
        client_name: row.get(2)?,
        service_name: row.get(3)?,
        total_consumed_tokens: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
        is_active: row.get::<_, i64>(7)? != 0,
    })
}
