use std::process::ExitCode;

use consumption_app::{
    IngestConfig, JobContext, LogFormat, MANAGED_RUNTIME_ENV, RunOutcome, handle_invocation,
    init_logging,
};

fn main() -> ExitCode {
    let managed = std::env::var_os(MANAGED_RUNTIME_ENV).is_some_and(|value| !value.is_empty());
    init_logging(LogFormat::for_runtime(managed));

    let result = IngestConfig::from_env().and_then(|config| {
        let mut context = JobContext::new(config);
        handle_invocation(&mut context)
    });

    match result {
        Ok(outcome) => {
            print_outcome(&outcome);
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("consumption-ingest failed: {}", err);
            print_outcome(&err.to_outcome());
            ExitCode::FAILURE
        }
    }
}

fn print_outcome(outcome: &RunOutcome) {
    match serde_json::to_string_pretty(outcome) {
        Ok(json) => println!("{}", json),
        Err(err) => eprintln!("failed to serialize outcome: {}", err),
    }
}
