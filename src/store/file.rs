//! YAML model file loading.
//!
//! The file's modification time doubles as the If-Modified-Since marker:
//! when it is not newer than the last successful sync, the tick is skipped
//! without reading or parsing the file.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::model::Data;
use crate::reload::{LoadError, Loader};

/// A read-only, YAML file-backed model source.
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Loader for FileStore {
    fn load(&self, since: Option<SystemTime>) -> Result<Data, LoadError> {
        let modified = fs::metadata(&self.path)?.modified()?;
        if let Some(t) = since {
            if modified <= t {
                return Err(LoadError::NotModified);
            }
        }

        tracing::info!(path = %self.path.display(), "loading gateway model");

        let content = fs::read_to_string(&self.path)?;
        let mut data: Data = serde_yaml::from_str(&content)?;
        data.apply_defaults();
        Ok(data)
    }
}
