mod support;

use std::collections::BTreeSet;

use ingest::{CheckpointAudit, CheckpointStore, MemoryObjectStore, MissingDateLedger, audit_key};
use support::{
    BUCKET, CHECKPOINT_KEY, MISSING_DATES_KEY, checkpoint_text, date, ledger_lines,
    seed_checkpoint, seed_missing_dates, settings,
};

#[test]
fn checkpoint_defaults_when_absent_or_unreadable() {
    let store = MemoryObjectStore::new();
    let settings = settings("2024_01_01");
    let checkpoints = CheckpointStore::new(&store, &settings);
    assert_eq!(checkpoints.get_checkpoint(), date("2024_01_01"));

    seed_checkpoint(&store, "not a date");
    assert_eq!(checkpoints.get_checkpoint(), date("2024_01_01"));

    store.fail_reads(CHECKPOINT_KEY).expect("fail reads");
    assert_eq!(checkpoints.get_checkpoint(), date("2024_01_01"));
}

#[test]
fn checkpoint_tolerates_surrounding_whitespace() {
    let store = MemoryObjectStore::new();
    let settings = settings("2024_01_01");
    seed_checkpoint(&store, "  2024_02_10\n");
    let checkpoints = CheckpointStore::new(&store, &settings);
    assert_eq!(checkpoints.get_checkpoint(), date("2024_02_10"));
}

#[test]
fn checkpoint_update_writes_value_metadata_and_audit() {
    let store = MemoryObjectStore::new();
    let settings = settings("2024_01_01");
    let checkpoints = CheckpointStore::new(&store, &settings);

    assert!(checkpoints.update_checkpoint(date("2024_01_04")).expect("update"));
    assert_eq!(checkpoint_text(&store).as_deref(), Some("2024_01_04"));

    let object = store
        .object(BUCKET, CHECKPOINT_KEY)
        .expect("read")
        .expect("checkpoint object");
    assert_eq!(object.content_type, "text/plain");
    assert_eq!(
        object.metadata.get("processor").map(String::as_str),
        Some("data-ingestion")
    );
    assert!(object.metadata.contains_key("updated_at"));

    let audit = store
        .object(BUCKET, &audit_key(CHECKPOINT_KEY))
        .expect("read")
        .expect("audit object");
    assert_eq!(audit.content_type, "application/json");
    let parsed: CheckpointAudit = serde_json::from_slice(&audit.body).expect("audit json");
    assert_eq!(parsed.last_processed_date, date("2024_01_04"));
    assert_eq!(parsed.processor, "data-ingestion");
    assert_eq!(
        object.metadata.get("updated_at"),
        Some(&parsed.updated_at)
    );
}

#[test]
fn checkpoint_never_moves_backwards() {
    let store = MemoryObjectStore::new();
    let settings = settings("2024_01_01");
    seed_checkpoint(&store, "2024_01_10");
    let checkpoints = CheckpointStore::new(&store, &settings);

    let puts = store.put_count().expect("puts");
    assert!(!checkpoints.update_checkpoint(date("2024_01_09")).expect("older"));
    assert!(!checkpoints.update_checkpoint(date("2024_01_10")).expect("equal"));
    assert_eq!(store.put_count().expect("puts"), puts);
    assert_eq!(checkpoint_text(&store).as_deref(), Some("2024_01_10"));
}

#[test]
fn checkpoint_update_fails_instead_of_moving_backwards_when_unreadable() {
    let store = MemoryObjectStore::new();
    let settings = settings("2023_12_01");
    seed_checkpoint(&store, "2024_01_10");
    store.fail_reads(CHECKPOINT_KEY).expect("fail reads");
    let checkpoints = CheckpointStore::new(&store, &settings);

    assert!(checkpoints.update_checkpoint(date("2024_01_03")).is_err());
    assert_eq!(checkpoint_text(&store).as_deref(), Some("2024_01_10"));
}

#[test]
fn unparseable_checkpoint_is_replaced_on_update() {
    let store = MemoryObjectStore::new();
    let settings = settings("2023_12_01");
    seed_checkpoint(&store, "not a date");
    let checkpoints = CheckpointStore::new(&store, &settings);

    assert!(checkpoints.update_checkpoint(date("2024_01_03")).expect("update"));
    assert_eq!(checkpoint_text(&store).as_deref(), Some("2024_01_03"));
}

#[test]
fn checkpoint_write_failure_is_returned() {
    let store = MemoryObjectStore::new();
    let settings = settings("2024_01_01");
    store.fail_writes(true).expect("fail writes");
    let checkpoints = CheckpointStore::new(&store, &settings);
    assert!(checkpoints.update_checkpoint(date("2024_01_02")).is_err());
    assert_eq!(checkpoint_text(&store), None);
}

#[test]
fn ledger_is_empty_before_first_write() {
    let store = MemoryObjectStore::new();
    let settings = settings("2024_01_01");
    let ledger = MissingDateLedger::new(&store, &settings);
    assert!(ledger.get_missing_dates().expect("ledger").is_empty());
}

#[test]
fn ledger_read_failure_is_an_error() {
    let store = MemoryObjectStore::new();
    let settings = settings("2024_01_01");
    store.fail_reads(MISSING_DATES_KEY).expect("fail reads");
    let ledger = MissingDateLedger::new(&store, &settings);
    assert!(ledger.get_missing_dates().is_err());
}

#[test]
fn ledger_skips_blank_and_unreadable_lines() {
    let store = MemoryObjectStore::new();
    let settings = settings("2024_01_01");
    seed_missing_dates(&store, &["2024_01_03", "", "garbage", "2024_01_02"]);
    let ledger = MissingDateLedger::new(&store, &settings);
    let dates = ledger.get_missing_dates().expect("ledger");
    assert_eq!(
        dates.into_iter().collect::<Vec<_>>(),
        vec![date("2024_01_02"), date("2024_01_03")]
    );
}

#[test]
fn ledger_update_drops_processed_and_expired_dates() {
    let store = MemoryObjectStore::new();
    let settings = settings("2024_01_01");
    let ledger = MissingDateLedger::new(&store, &settings);
    let missing: BTreeSet<_> = [
        date("2024_01_01"),
        date("2024_01_02"),
        date("2024_01_20"),
        date("2024_01_25"),
    ]
    .into_iter()
    .collect();

    let kept = ledger
        .update_missing_dates(&missing, [date("2024_01_20")], date("2024_01_31"))
        .expect("update");
    assert_eq!(
        kept.into_iter().collect::<Vec<_>>(),
        vec![date("2024_01_02"), date("2024_01_25")]
    );
    assert_eq!(ledger_lines(&store), vec!["2024_01_02", "2024_01_25"]);
}

#[test]
fn ledger_update_writes_even_when_empty() {
    let store = MemoryObjectStore::new();
    let settings = settings("2024_01_01");
    seed_missing_dates(&store, &["2024_01_03"]);
    let ledger = MissingDateLedger::new(&store, &settings);
    let missing = ledger.get_missing_dates().expect("ledger");
    ledger
        .update_missing_dates(&missing, [date("2024_01_03")], date("2024_01_04"))
        .expect("update");
    assert_eq!(store.text(BUCKET, MISSING_DATES_KEY).expect("read").as_deref(), Some(""));
}

#[test]
fn requeue_merges_with_stored_dates() {
    let store = MemoryObjectStore::new();
    let settings = settings("2024_01_01");
    seed_missing_dates(&store, &["2024_01_03"]);
    let ledger = MissingDateLedger::new(&store, &settings);
    ledger
        .requeue([date("2024_01_05"), date("2024_01_03")], date("2024_01_06"))
        .expect("requeue");
    assert_eq!(ledger_lines(&store), vec!["2024_01_03", "2024_01_05"]);
}
