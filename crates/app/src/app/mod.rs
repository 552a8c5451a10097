use std::path::PathBuf;

use consumption_db::Db;
use ingest::{IngestSettings, LocalObjectStore, ObjectStore};
use tracing::info;

use crate::config::{DatabaseSource, IngestConfig};
use crate::error::Result;
use crate::secrets::{DirectorySecretStore, SecretStore};

/// Clients built on first use and reused by later invocations.
pub(crate) struct JobResources {
    pub(crate) store: Box<dyn ObjectStore>,
    pub(crate) db: Db,
    pub(crate) settings: IngestSettings,
}

/// State carried across invocations of one process.
pub struct JobContext {
    config: IngestConfig,
    secrets: Box<dyn SecretStore>,
    resources: Option<JobResources>,
}

impl JobContext {
    /// Context whose secret store follows the configured secrets directory.
    pub fn new(config: IngestConfig) -> Self {
        let secrets_dir = match &config.database {
            DatabaseSource::Secret { secrets_dir, .. } => secrets_dir.clone(),
            DatabaseSource::Path(_) => PathBuf::new(),
        };
        Self::with_secrets(config, Box::new(DirectorySecretStore::new(secrets_dir)))
    }

    pub fn with_secrets(config: IngestConfig, secrets: Box<dyn SecretStore>) -> Self {
        Self {
            config,
            secrets,
            resources: None,
        }
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    pub fn is_initialized(&self) -> bool {
        self.resources.is_some()
    }

    /// Open the store and database on first call; later calls reuse them.
    pub(crate) fn resources(&mut self) -> Result<&mut JobResources> {
        let resources = match self.resources.take() {
            Some(resources) => resources,
            None => self.initialize()?,
        };
        Ok(self.resources.insert(resources))
    }

    fn initialize(&self) -> Result<JobResources> {
        let db_path = self.config.database_path(self.secrets.as_ref())?;
        if let Some(parent) = db_path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let mut db = Db::open(&db_path)?;
        db.migrate()?;
        info!(
            db = %db_path.display(),
            storage_root = %self.config.storage_root.display(),
            managed = self.config.managed,
            "job context initialized"
        );
        Ok(JobResources {
            store: Box::new(LocalObjectStore::new(&self.config.storage_root)),
            db,
            settings: self.config.settings(),
        })
    }
}
