use std::collections::BTreeSet;

use consumption_core::{
    CSV_EXTENSION, DISCOVERY_MAX_KEYS, DateKey, WorkItem, date_marker, date_prefix, date_range,
};
use tracing::{debug, info};

use crate::ledger::MissingDateLedger;
use crate::storage::ObjectStore;
use crate::types::{IngestSettings, Result};

/// Work found by one discovery pass plus the ledger it left behind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveredWork {
    pub items: Vec<WorkItem>,
    pub missing_dates: BTreeSet<DateKey>,
}

/// Candidate dates: every day after the checkpoint up to `today`, followed
/// by ledger dates not already covered.
pub fn candidate_dates(
    checkpoint: DateKey,
    today: DateKey,
    missing: &BTreeSet<DateKey>,
) -> Vec<DateKey> {
    let mut dates = match checkpoint.next_day() {
        Some(start) => date_range(start, today),
        None => Vec::new(),
    };
    let extra: Vec<DateKey> = missing
        .iter()
        .filter(|date| !dates.contains(date))
        .copied()
        .collect();
    dates.extend(extra);
    dates
}

/// Probe storage for files newer than `checkpoint` and for ledger dates,
/// then rewrite the ledger. Items come back sorted by date.
pub fn discover_work(
    store: &dyn ObjectStore,
    settings: &IngestSettings,
    ledger: &MissingDateLedger<'_>,
    checkpoint: DateKey,
    today: DateKey,
) -> Result<DiscoveredWork> {
    let mut missing = ledger.get_missing_dates()?;
    info!(count = missing.len(), "loaded missing dates");

    let dates = candidate_dates(checkpoint, today, &missing);
    info!(
        start = ?dates.first().map(ToString::to_string),
        candidates = dates.len(),
        "dates to check"
    );

    let mut items = Vec::new();
    for date in dates {
        let prefix = date_prefix(&settings.prefix, date);
        let marker = date_marker(date);
        debug!(prefix = %prefix, "checking prefix");

        let mut found = false;
        for object in store.list(&settings.bucket, &prefix, DISCOVERY_MAX_KEYS)? {
            if object.key.ends_with(CSV_EXTENSION) && object.key.contains(&marker) {
                info!(key = %object.key, date = %date, "found file");
                items.push(WorkItem {
                    key: object.key,
                    date,
                    size: object.size,
                    last_modified: object.last_modified,
                });
                found = true;
            }
        }

        if !found && missing.insert(date) {
            info!(date = %date, "no file found, adding to missing dates");
        }
    }

    let discovered = items.iter().map(|item| item.date);
    let missing_dates = ledger.update_missing_dates(&missing, discovered, today)?;

    items.sort_by_key(|item| item.date);
    Ok(DiscoveredWork {
        items,
        missing_dates,
    })
}
