#![allow(dead_code)]

use std::path::{Path, PathBuf};

use consumption_core::{DateKey, WorkItem};
use consumption_db::Db;
use ingest::{IngestSettings, MemoryObjectStore};
use tempfile::TempDir;

pub const BUCKET: &str = "consumption-bucket";
pub const PREFIX: &str = "raw/";
pub const CHECKPOINT_KEY: &str = "state/checkpoint.txt";
pub const MISSING_DATES_KEY: &str = "state/missing_dates.txt";

pub const HEADER: &str = "date,client_id,client_name,service_name,total_consumed_tokens";

pub fn date(value: &str) -> DateKey {
    value.parse().expect("date key")
}

pub fn settings(default_date: &str) -> IngestSettings {
    IngestSettings::new(
        BUCKET,
        PREFIX,
        CHECKPOINT_KEY,
        MISSING_DATES_KEY,
        date(default_date),
    )
}

pub struct TestDb {
    pub _dir: TempDir,
    pub db: Db,
    pub path: PathBuf,
}

pub fn setup_db() -> TestDb {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("ingest.sqlite");
    let mut db = Db::open(&path).expect("open db");
    db.migrate().expect("migrate db");
    TestDb {
        _dir: dir,
        db,
        path,
    }
}

/// Drop the consumption table behind the open connection's back, so every
/// later upsert fails with an error that is not caused by row values.
pub fn drop_consumption_table(path: &Path) {
    let conn = rusqlite::Connection::open(path).expect("second connection");
    conn.execute_batch("DROP TABLE consumptions;").expect("drop table");
}

pub fn csv_body(rows: &[&str]) -> String {
    let mut body = String::from(HEADER);
    for row in rows {
        body.push('\n');
        body.push_str(row);
    }
    body.push('\n');
    body
}

pub fn file_key(day: &str, name: &str) -> String {
    format!("{}consumption_{}/{}", PREFIX, day, name)
}

pub fn seed_file(store: &MemoryObjectStore, day: &str, rows: &[&str]) -> String {
    let key = file_key(day, "part-0000.csv");
    store
        .insert(BUCKET, &key, csv_body(rows))
        .expect("seed file");
    key
}

pub fn seed_checkpoint(store: &MemoryObjectStore, day: &str) {
    store
        .insert(BUCKET, CHECKPOINT_KEY, day.as_bytes().to_vec())
        .expect("seed checkpoint");
}

pub fn seed_missing_dates(store: &MemoryObjectStore, days: &[&str]) {
    store
        .insert(BUCKET, MISSING_DATES_KEY, days.join("\n"))
        .expect("seed missing dates");
}

pub fn ledger_lines(store: &MemoryObjectStore) -> Vec<String> {
    store
        .text(BUCKET, MISSING_DATES_KEY)
        .expect("read ledger")
        .unwrap_or_default()
        .lines()
        .filter(|line| !line.is_empty())
        .map(ToString::to_string)
        .collect()
}

pub fn checkpoint_text(store: &MemoryObjectStore) -> Option<String> {
    store.text(BUCKET, CHECKPOINT_KEY).expect("read checkpoint")
}

pub fn work_item(day: &str, key: &str) -> WorkItem {
    WorkItem {
        key: key.to_string(),
        date: date(day),
        size: 0,
        last_modified: None,
    }
}
