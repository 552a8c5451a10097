use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::{AppError, Result};

/// Source of named secret strings.
pub trait SecretStore {
    fn get_secret(&self, name: &str) -> Result<String>;
}

/// Reads each secret from a file named after it inside one directory, the
/// layout container runtimes use for mounted secrets.
#[derive(Debug, Clone)]
pub struct DirectorySecretStore {
    dir: PathBuf,
}

impl DirectorySecretStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl SecretStore for DirectorySecretStore {
    fn get_secret(&self, name: &str) -> Result<String> {
        let invalid = name.is_empty()
            || name.contains(['/', '\\'])
            || name == "."
            || name == "..";
        if invalid {
            return Err(AppError::Secret {
                name: name.to_string(),
                message: "invalid secret name".to_string(),
            });
        }
        match fs::read_to_string(self.dir.join(name)) {
            Ok(value) => Ok(value),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Err(AppError::Secret {
                name: name.to_string(),
                message: format!("not found in {}", self.dir.display()),
            }),
            Err(err) => Err(err.into()),
        }
    }
}
