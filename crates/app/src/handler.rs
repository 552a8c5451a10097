use chrono::Utc;
use consumption_core::{DateKey, RunOutcome};
use tracing::{error, info};

use crate::app::JobContext;
use crate::error::Result;

/// Run one ingest for the current UTC day.
pub fn handle_invocation(context: &mut JobContext) -> Result<RunOutcome> {
    let today = DateKey::from(Utc::now().date_naive());
    handle_invocation_at(context, today)
}

/// Run one ingest treating `today` as the newest candidate date.
pub fn handle_invocation_at(context: &mut JobContext, today: DateKey) -> Result<RunOutcome> {
    info!(today = %today, managed = context.config().managed, "invocation started");
    let resources = match context.resources() {
        Ok(resources) => resources,
        Err(err) => {
            error!(error = %err, "failed to initialize job context");
            return Err(err);
        }
    };

    match ingest::run_ingest(
        resources.store.as_ref(),
        &mut resources.db,
        &resources.settings,
        today,
    ) {
        Ok(report) => {
            info!(
                status = ?report.outcome.status,
                discovered = report.stats.files_discovered,
                loaded = report.stats.files_loaded,
                rejected = report.stats.files_rejected,
                empty = report.stats.files_empty,
                rows = report.stats.rows_upserted,
                missing_dates = report.stats.missing_dates,
                "{}",
                report.outcome.message
            );
            Ok(report.outcome)
        }
        Err(err) => {
            error!(error = %err, "error in ingest run");
            Err(err.into())
        }
    }
}
