use consumption_core::RunOutcome;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(String),
    #[error("secret {name}: {message}")]
    Secret { name: String, message: String },
    #[error("db error: {0}")]
    Db(#[from] consumption_db::DbError),
    #[error("ingest error: {0}")]
    Ingest(#[from] ingest::IngestError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("config file error: {0}")]
    Toml(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;

impl AppError {
    pub(crate) fn missing(key: &str) -> Self {
        AppError::Config(format!("missing required setting {}", key))
    }

    /// Failed outcome for this error, keeping the dates an aborted run
    /// managed to load before it stopped.
    pub fn to_outcome(&self) -> RunOutcome {
        let processed_dates = match self {
            AppError::Ingest(ingest::IngestError::Aborted {
                processed_dates, ..
            }) => processed_dates.clone(),
            _ => Vec::new(),
        };
        RunOutcome::failed(format!("Error: {}", self), processed_dates)
    }
}
