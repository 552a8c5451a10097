use std::fs;
use std::path::{Path, PathBuf};

use consumption_core::{DEFAULT_PROCESSOR, DateKey};
use ingest::IngestSettings;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::secrets::SecretStore;

/// Names a TOML file whose values sit beneath the environment.
pub const CONFIG_FILE_ENV: &str = "CONSUMPTION_INGEST_CONFIG";
/// Set by the managed runtime; switches database settings to the secret store.
pub const MANAGED_RUNTIME_ENV: &str = "AWS_LAMBDA_FUNCTION_NAME";

const DEFAULT_SECRETS_DIR: &str = "/run/secrets";

/// Optional file layer. Every field mirrors an environment key in lower case.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    pub s3_bucket: Option<String>,
    pub s3_prefix: Option<String>,
    pub checkpoint_key: Option<String>,
    pub missing_dates_key: Option<String>,
    pub default_date: Option<String>,
    pub storage_root: Option<PathBuf>,
    pub processor_name: Option<String>,
    pub db_name: Option<PathBuf>,
    pub secret_name: Option<String>,
    pub secrets_dir: Option<PathBuf>,
}

impl ConfigFile {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|err| {
            AppError::Config(format!("read config {}: {}", path.display(), err))
        })?;
        Ok(toml::from_str(&contents)?)
    }

    fn get(&self, key: &str) -> Option<String> {
        let path = |value: &Option<PathBuf>| {
            value
                .as_ref()
                .map(|inner| inner.to_string_lossy().into_owned())
        };
        match key {
            "S3_BUCKET" => self.s3_bucket.clone(),
            "S3_PREFIX" => self.s3_prefix.clone(),
            "CHECKPOINT_KEY" => self.checkpoint_key.clone(),
            "MISSING_DATES_KEY" => self.missing_dates_key.clone(),
            "DEFAULT_DATE" => self.default_date.clone(),
            "STORAGE_ROOT" => path(&self.storage_root),
            "PROCESSOR_NAME" => self.processor_name.clone(),
            "DB_NAME" => path(&self.db_name),
            "SECRET_NAME" => self.secret_name.clone(),
            "SECRETS_DIR" => path(&self.secrets_dir),
            _ => None,
        }
    }
}

/// Where the database settings come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseSource {
    /// SQLite file named directly by `DB_NAME`.
    Path(PathBuf),
    /// JSON secret holding `DB_NAME`, read in managed execution.
    Secret { name: String, secrets_dir: PathBuf },
}

#[derive(Debug, Deserialize)]
struct DatabaseSecret {
    #[serde(rename = "DB_NAME")]
    db_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestConfig {
    pub bucket: String,
    pub prefix: String,
    pub checkpoint_key: String,
    pub missing_dates_key: String,
    pub default_date: DateKey,
    pub storage_root: PathBuf,
    pub processor: String,
    pub database: DatabaseSource,
    pub managed: bool,
}

impl IngestConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from `lookup`, falling back to the file named by
    /// [`CONFIG_FILE_ENV`] for keys the lookup does not provide.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let file = match non_blank(lookup(CONFIG_FILE_ENV)) {
            Some(path) => ConfigFile::load(Path::new(&path))?,
            None => ConfigFile::default(),
        };
        let value = |key: &str| non_blank(lookup(key)).or_else(|| non_blank(file.get(key)));
        let required = |key: &str| value(key).ok_or_else(|| AppError::missing(key));

        let default_date = required("DEFAULT_DATE")?;
        let default_date = default_date
            .trim()
            .parse::<DateKey>()
            .map_err(|err| AppError::Config(format!("DEFAULT_DATE: {}", err)))?;

        let managed = non_blank(lookup(MANAGED_RUNTIME_ENV)).is_some();
        let database = if managed {
            DatabaseSource::Secret {
                name: required("SECRET_NAME")?,
                secrets_dir: value("SECRETS_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_SECRETS_DIR)),
            }
        } else {
            DatabaseSource::Path(PathBuf::from(required("DB_NAME")?))
        };

        Ok(Self {
            bucket: required("S3_BUCKET")?,
            prefix: value("S3_PREFIX").unwrap_or_default(),
            checkpoint_key: required("CHECKPOINT_KEY")?,
            missing_dates_key: required("MISSING_DATES_KEY")?,
            default_date,
            storage_root: PathBuf::from(required("STORAGE_ROOT")?),
            processor: value("PROCESSOR_NAME").unwrap_or_else(|| DEFAULT_PROCESSOR.to_string()),
            database,
            managed,
        })
    }

    pub fn settings(&self) -> IngestSettings {
        let mut settings = IngestSettings::new(
            self.bucket.clone(),
            self.prefix.clone(),
            self.checkpoint_key.clone(),
            self.missing_dates_key.clone(),
            self.default_date,
        );
        settings.processor = self.processor.clone();
        settings
    }

    /// Resolve the SQLite database path, reading the secret in managed mode.
    pub fn database_path(&self, secrets: &dyn SecretStore) -> Result<PathBuf> {
        match &self.database {
            DatabaseSource::Path(path) => Ok(path.clone()),
            DatabaseSource::Secret { name, .. } => {
                let raw = secrets.get_secret(name)?;
                let secret: DatabaseSecret =
                    serde_json::from_str(&raw).map_err(|err| AppError::Secret {
                        name: name.clone(),
                        message: format!("expected JSON with DB_NAME: {}", err),
                    })?;
                if secret.db_name.trim().is_empty() {
                    return Err(AppError::Secret {
                        name: name.clone(),
                        message: "DB_NAME is empty".to_string(),
                    });
                }
                Ok(PathBuf::from(secret.db_name))
            }
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}
