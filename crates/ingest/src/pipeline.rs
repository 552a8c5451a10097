use std::collections::BTreeSet;

use consumption_core::{DateKey, RunOutcome, WorkItem};
use consumption_db::Db;
use tracing::{error, info, warn};

use crate::checkpoint::CheckpointStore;
use crate::discovery::discover_work;
use crate::ledger::MissingDateLedger;
use crate::loader::RowLoader;
use crate::storage::ObjectStore;
use crate::types::{IngestError, IngestSettings, LoadReport, Result, RunReport, RunStats};

enum FileResult {
    Loaded(LoadReport),
    Rejected(LoadReport),
    Empty,
}

fn process_file(loader: &RowLoader<'_>, db: &mut Db, item: &WorkItem) -> Result<FileResult> {
    info!(key = %item.key, date = %item.date, size = item.size, "processing file");
    let Some(table) = loader.fetch(item)? else {
        return Ok(FileResult::Empty);
    };

    // An error below drops the batch, which rolls the file back.
    let mut batch = db.begin_batch()?;
    let report = loader.load(&mut batch, item, &table)?;
    if report.success {
        batch.commit()?;
        Ok(FileResult::Loaded(report))
    } else {
        batch.rollback()?;
        Ok(FileResult::Rejected(report))
    }
}

/// Run one incremental ingest: read the checkpoint, discover new files, load
/// them in date order and advance the checkpoint.
///
/// Files with bad data are skipped and the run continues. Any other failure
/// stops the run after the files loaded so far are checkpointed, and is
/// returned as [`IngestError::Aborted`]. Dates that were not loaded are put
/// back into the missing-date ledger so later runs retry them.
pub fn run_ingest(
    store: &dyn ObjectStore,
    db: &mut Db,
    settings: &IngestSettings,
    today: DateKey,
) -> Result<RunReport> {
    let checkpoints = CheckpointStore::new(store, settings);
    let ledger = MissingDateLedger::new(store, settings);
    let mut stats = RunStats::default();

    let last_processed = checkpoints.get_checkpoint();
    info!(checkpoint = %last_processed, "last processed date");

    let discovered = discover_work(store, settings, &ledger, last_processed, today)?;
    stats.files_discovered = discovered.items.len();
    stats.missing_dates = discovered.missing_dates.len();
    if discovered.items.is_empty() {
        info!("no new files to process");
        return Ok(RunReport {
            outcome: RunOutcome::no_new_files(),
            stats,
        });
    }
    info!(files = discovered.items.len(), "found files to process");

    let loader = RowLoader::new(store, &settings.bucket);
    let mut processed: Vec<DateKey> = Vec::new();
    let mut retry: BTreeSet<DateKey> = BTreeSet::new();
    let mut fault: Option<(String, IngestError)> = None;

    for (position, item) in discovered.items.iter().enumerate() {
        match process_file(&loader, db, item) {
            Ok(FileResult::Loaded(report)) => {
                info!(
                    key = %item.key,
                    rows = report.rows_affected,
                    "successfully processed file"
                );
                stats.files_loaded += 1;
                stats.rows_upserted += report.rows_affected;
                processed.push(item.date);
            }
            Ok(FileResult::Rejected(report)) => {
                warn!(
                    key = %item.key,
                    rows = report.rows_affected,
                    failed_row = ?report.failed_row,
                    "row insertion failed, file rolled back"
                );
                stats.files_rejected += 1;
                retry.insert(item.date);
            }
            Ok(FileResult::Empty) => {
                warn!(key = %item.key, "no data found in file");
                stats.files_empty += 1;
                retry.insert(item.date);
            }
            Err(err) => {
                error!(key = %item.key, error = %err, "error processing file, stopping run");
                let remaining = &discovered.items[position..];
                stats.files_skipped = remaining.len() - 1;
                retry.extend(remaining.iter().map(|pending| pending.date));
                fault = Some((item.key.clone(), err));
                break;
            }
        }
    }

    for date in &processed {
        retry.remove(date);
    }

    let checkpoint_result = match processed.iter().max() {
        Some(latest) => checkpoints.update_checkpoint(*latest).map(|_| ()),
        None => Ok(()),
    };
    let requeue_result = if retry.is_empty() {
        Ok(())
    } else {
        info!(dates = retry.len(), "requeueing dates that were not loaded");
        ledger.requeue(retry.iter().copied(), today).map(|_| ())
    };

    if let Some((key, source)) = fault {
        for err in [&checkpoint_result, &requeue_result]
            .into_iter()
            .filter_map(|result| result.as_ref().err())
        {
            error!(error = %err, "state update failed after aborted run");
        }
        return Err(IngestError::Aborted {
            key,
            processed_dates: processed,
            source: Box::new(source),
        });
    }
    checkpoint_result?;
    requeue_result?;

    Ok(RunReport {
        outcome: RunOutcome::completed(processed),
        stats,
    })
}
