pub mod app;
pub mod config;
pub mod error;
pub mod handler;
pub mod logging;
pub mod secrets;

pub use app::JobContext;
pub use config::{
    CONFIG_FILE_ENV, ConfigFile, DatabaseSource, IngestConfig, MANAGED_RUNTIME_ENV,
};
pub use consumption_core::{RunOutcome, RunStatus};
pub use error::{AppError, Result};
pub use handler::{handle_invocation, handle_invocation_at};
pub use logging::{LogFormat, init_logging};
pub use secrets::{DirectorySecretStore, SecretStore};
