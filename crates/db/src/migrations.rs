use rusqlite::Connection;

use crate::Db;
use crate::error::Result;

const MIGRATION_0001: &str = include_str!("../migrations/0001_create_consumptions.sql");
const MIGRATION_0002: &str = include_str!("../migrations/0002_add_consumption_indexes.sql");

const MIGRATIONS: &[(&str, &str)] = &[
    ("0001_create_consumptions", MIGRATION_0001),
    ("0002_add_consumption_indexes", MIGRATION_0002),
];

impl Db {
    pub fn migrate(&mut self) -> Result<()> {
        let tx = self.conn.transaction()?;
        for (name, sql) in MIGRATIONS {
            if *name == "0001_create_consumptions" && table_exists(&tx, "consumptions")? {
                continue;
            }
            tx.execute_batch(sql)?;
        }
        tx.commit()?;
        Ok(())
    }
}

fn table_exists(conn: &Connection, table: &str) -> Result<bool> {
    let mut stmt =
        conn.prepare("SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1")?;
    let mut rows = stmt.query([table])?;
    Ok(rows.next()?.is_some())
}
