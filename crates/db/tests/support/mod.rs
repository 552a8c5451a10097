#![allow(dead_code)]

use std::path::PathBuf;

use consumption_core::ConsumptionRecord;
use consumption_db::Db;
use tempfile::TempDir;

pub struct TestDb {
    pub _dir: TempDir,
    pub db: Db,
    pub path: PathBuf,
}

pub fn setup_db() -> TestDb {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("test.sqlite");
    let mut db = Db::open(&path).expect("open db");
    db.migrate().expect("migrate db");
    TestDb {
        _dir: dir,
        db,
        path,
    }
}

pub fn make_record(date: &str, client_id: &str, tokens: i64) -> ConsumptionRecord {
    ConsumptionRecord {
        date: date.to_string(),
        client_id: client_id.to_string(),
        client_name: Some(format!("Client {}", client_id)),
        service_name: Some("search".to_string()),
        total_consumed_tokens: tokens,
    }
}
