mod consumption;
mod error;
mod migrations;
mod types;

use std::path::Path;

use rusqlite::Connection;

pub use consumption::ConsumptionBatch;
pub use error::{DbError, Result};
pub use types::StoredConsumption;

/// Single connection to the consumption database, held for a whole run.
pub struct Db {
    conn: Connection,
}

impl Db {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.pragma_update(None, "temp_store", "MEMORY")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self { conn })
    }
}
