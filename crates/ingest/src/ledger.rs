use std::collections::BTreeSet;

use consumption_core::{DateKey, MISSING_DATE_RETENTION_DAYS};
use tracing::{info, warn};

use crate::storage::{ObjectMetadata, ObjectStore};
use crate::types::{IngestSettings, Result};

/// Dates for which no file has been found yet, kept for retry.
pub struct MissingDateLedger<'a> {
    store: &'a dyn ObjectStore,
    settings: &'a IngestSettings,
}

impl<'a> MissingDateLedger<'a> {
    pub fn new(store: &'a dyn ObjectStore, settings: &'a IngestSettings) -> Self {
        Self { store, settings }
    }

    /// Stored dates, or an empty set when the ledger does not exist yet.
    pub fn get_missing_dates(&self) -> Result<BTreeSet<DateKey>> {
        let body = match self
            .store
            .get(&self.settings.bucket, &self.settings.missing_dates_key)
        {
            Ok(body) => body,
            Err(err) if err.is_not_found() => return Ok(BTreeSet::new()),
            Err(err) => return Err(err.into()),
        };
        let text = String::from_utf8_lossy(&body);
        let mut dates = BTreeSet::new();
        for line in text.lines().map(str::trim).filter(|line| !line.is_empty()) {
            match line.parse::<DateKey>() {
                Ok(date) => {
                    dates.insert(date);
                }
                Err(err) => warn!(
                    key = %self.settings.missing_dates_key,
                    error = %err,
                    "dropping unreadable missing-date entry"
                ),
            }
        }
        Ok(dates)
    }

    /// Persist `missing` minus `processed`, keeping only dates inside the
    /// retention window ending at `today`. Always writes.
    pub fn update_missing_dates<I>(
        &self,
        missing: &BTreeSet<DateKey>,
        processed: I,
        today: DateKey,
    ) -> Result<BTreeSet<DateKey>>
    where
        I: IntoIterator<Item = DateKey>,
    {
        let processed: BTreeSet<DateKey> = processed.into_iter().collect();
        let retained = retain_recent(
            missing.difference(&processed).copied().collect(),
            today,
        );
        self.write(&retained)?;
        Ok(retained)
    }

    /// Merge `dates` back into the stored ledger so a later run retries them.
    pub fn requeue<I>(&self, dates: I, today: DateKey) -> Result<BTreeSet<DateKey>>
    where
        I: IntoIterator<Item = DateKey>,
    {
        let mut merged = self.get_missing_dates()?;
        merged.extend(dates);
        let retained = retain_recent(merged, today);
        self.write(&retained)?;
        Ok(retained)
    }

    fn write(&self, dates: &BTreeSet<DateKey>) -> Result<()> {
        let body = dates
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n");
        self.store.put(
            &self.settings.bucket,
            &self.settings.missing_dates_key,
            body.as_bytes(),
            "text/plain",
            &ObjectMetadata::new(),
        )?;
        info!(count = dates.len(), "missing dates updated");
        Ok(())
    }
}

/// Drop dates on or before `today - MISSING_DATE_RETENTION_DAYS`.
pub fn retain_recent(dates: BTreeSet<DateKey>, today: DateKey) -> BTreeSet<DateKey> {
    match today.days_before(MISSING_DATE_RETENTION_DAYS) {
        Some(cutoff) => dates.into_iter().filter(|date| *date > cutoff).collect(),
        None => dates,
    }
}
