//! Destinations for downloaded files

use crate::error::StorageError;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Saves a downloaded file
pub trait DownloadSink: Send + Sync {
    /// Save `bytes` under `file_name`
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the file cannot be written.
    fn save(&self, file_name: &str, bytes: &[u8]) -> Result<(), StorageError>;
}

/// Writes downloads into a directory
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    /// Write into `dir`, creating it on first save
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Target directory
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl DownloadSink for DirectorySink {
    fn save(&self, file_name: &str, bytes: &[u8]) -> Result<(), StorageError> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(sanitize(file_name));
        std::fs::write(&path, bytes)?;
        tracing::info!(path = %path.display(), size = bytes.len(), "Download saved");
        Ok(())
    }
}

/// Keeps downloads in memory
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    files: Arc<Mutex<Vec<(String, Vec<u8>)>>>,
}

impl MemorySink {
    /// Create an empty sink
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Saved files in order
    #[must_use]
    pub fn files(&self) -> Vec<(String, Vec<u8>)> {
        self.files
            .lock()
            .map(|files| files.clone())
            .unwrap_or_default()
    }
}

impl DownloadSink for MemorySink {
    fn save(&self, file_name: &str, bytes: &[u8]) -> Result<(), StorageError> {
        let mut files = self.files.lock().map_err(|_| StorageError::Poisoned)?;
        files.push((file_name.to_string(), bytes.to_vec()));
        Ok(())
    }
}

/// Keep only the final path component so a name cannot escape the directory.
fn sanitize(file_name: &str) -> String {
    let name = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();

    if name.is_empty() || name == "." || name == ".." {
        "download".to_string()
    } else {
        name.to_string()
    }
}
