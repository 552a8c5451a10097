#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;

use consumption_app::{IngestConfig, Result};

pub const BUCKET: &str = "usage-exports";

pub fn base_env(root: &Path) -> HashMap<String, String> {
    let mut env = HashMap::new();
    env.insert("S3_BUCKET".to_string(), BUCKET.to_string());
    env.insert("S3_PREFIX".to_string(), "exports/".to_string());
    env.insert("CHECKPOINT_KEY".to_string(), "state/checkpoint.txt".to_string());
    env.insert(
        "MISSING_DATES_KEY".to_string(),
        "state/missing_dates.txt".to_string(),
    );
    env.insert("DEFAULT_DATE".to_string(), "2024_01_01".to_string());
    env.insert(
        "STORAGE_ROOT".to_string(),
        root.join("objects").to_string_lossy().into_owned(),
    );
    env.insert(
        "DB_NAME".to_string(),
        root.join("db/consumption.sqlite").to_string_lossy().into_owned(),
    );
    env
}

pub fn config_from(env: &HashMap<String, String>) -> Result<IngestConfig> {
    IngestConfig::from_lookup(|key| env.get(key).cloned())
}
