//! On-disk persistence for the fitted category model.
//!
//! The model is a single bincode blob. Saves go through a temp file in the
//! same directory and are renamed into place, so a crash mid-write never
//! leaves a truncated model behind.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, warn};

use crate::classifier::CategoryModel;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("model encoding error: {0}")]
    Encode(#[from] bincode::Error),

    #[error("could not move model into place: {0}")]
    Persist(#[from] tempfile::PersistError),

    #[error("no home directory to store the model in")]
    NoHome,
}

/// Reads and writes the category model at a fixed path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifierStore {
    path: PathBuf,
}

impl ClassifierStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `~/.tally/models/expense_model.bin`
    pub fn default_path() -> Result<PathBuf, StoreError> {
        let home = dirs::home_dir().ok_or(StoreError::NoHome)?;
        Ok(home.join(".tally").join("models").join("expense_model.bin"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Load the saved model. A missing, unreadable or undecodable file is
    /// treated as "no model" and only logged.
    pub fn load(&self) -> Option<CategoryModel> {
        if !self.exists() {
            debug!(path = %self.path.display(), "no saved category model");
            return None;
        }
        match self.try_load() {
            Ok(model) => Some(model),
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "ignoring unreadable category model"
                );
                None
            }
        }
    }

    /// Load the saved model, surfacing every failure
    pub fn try_load(&self) -> Result<CategoryModel, StoreError> {
        let reader = BufReader::new(File::open(&self.path)?);
        let mut model: CategoryModel = bincode::deserialize_from(reader)?;
        model.reindex();
        Ok(model)
    }

    /// Write the model, creating the parent directory on first use.
    pub fn save(&self, model: &CategoryModel) -> Result<(), StoreError> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)?;

        let tmp = NamedTempFile::new_in(dir)?;
        {
            let mut writer = BufWriter::new(tmp.as_file());
            bincode::serialize_into(&mut writer, model)?;
            writer.flush()?;
        }
        tmp.persist(&self.path)?;

        debug!(path = %self.path.display(), "saved category model");
        Ok(())
    }

    /// Delete the saved model. Returns whether a file was removed.
    pub fn remove(&self) -> Result<bool, StoreError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
