//! Persistence backends for [`PolicySettings`].

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use tempfile::NamedTempFile;

use super::PolicySettings;
use crate::error::StoreError;

/// Result type for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Durable home of the policy record.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// The persisted record, or `None` if nothing was ever saved.
    async fn load(&self) -> StoreResult<Option<PolicySettings>>;

    /// Persist `settings`, replacing any previous record.
    async fn save(&self, settings: &PolicySettings) -> StoreResult<()>;
}

/// Single JSON file on disk.
#[derive(Debug, Clone)]
pub struct FsConfigStore {
    path: PathBuf,
}

impl FsConfigStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ConfigStore for FsConfigStore {
    async fn load(&self) -> StoreResult<Option<PolicySettings>> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let settings: PolicySettings = serde_json::from_slice(&bytes)?;
        Ok(Some(settings.normalized()))
    }

    async fn save(&self, settings: &PolicySettings) -> StoreResult<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;

        // Write to a temp file in the same directory, then rename over the target.
        let mut tmp = NamedTempFile::new_in(&dir)?;
        serde_json::to_writer_pretty(&mut tmp, settings)?;
        tmp.write_all(b"\n")?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }
}

/// In-memory store for tests.
#[derive(Debug, Default)]
pub struct MemoryConfigStore {
    saved: Mutex<Option<PolicySettings>>,
    fail_saves: AtomicBool,
}

impl MemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: PolicySettings) -> Self {
        Self {
            saved: Mutex::new(Some(settings)),
            fail_saves: AtomicBool::new(false),
        }
    }

    /// Make subsequent `save` calls fail.
    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// The last successfully saved record.
    pub fn saved(&self) -> Option<PolicySettings> {
        self.saved.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl ConfigStore for MemoryConfigStore {
    async fn load(&self) -> StoreResult<Option<PolicySettings>> {
        Ok(self.saved())
    }

    async fn save(&self, settings: &PolicySettings) -> StoreResult<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("saves disabled".into()));
        }
        *self.saved.lock().unwrap_or_else(|e| e.into_inner()) = Some(settings.clone());
        Ok(())
    }
}
