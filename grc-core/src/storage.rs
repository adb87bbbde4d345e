//! Key/value persistence for the workspace context.
//!
//! The browser build keeps these values in local storage; here the backing
//! store is pluggable. Callers must treat every operation as fallible and
//! fall back to defaults when storage is unavailable.

use std::collections::HashMap;
use std::sync::RwLock;

use thiserror::Error;

pub type StorageResult<T> = Result<T, StorageError>;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(String),
}

#[cfg(feature = "serde")]
impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// String key/value storage.
pub trait ContextStorage: Send + Sync {
    fn get(&self, key: &str) -> StorageResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> StorageResult<()>;
    fn remove(&self, key: &str) -> StorageResult<()>;
}

/// In-process storage. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    values: RwLock<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ContextStorage for MemoryStorage {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let values = self
            .values
            .read()
            .map_err(|_| StorageError::Unavailable("memory storage poisoned".to_string()))?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let mut values = self
            .values
            .write()
            .map_err(|_| StorageError::Unavailable("memory storage poisoned".to_string()))?;
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        let mut values = self
            .values
            .write()
            .map_err(|_| StorageError::Unavailable("memory storage poisoned".to_string()))?;
        values.remove(key);
        Ok(())
    }
}

#[cfg(feature = "serde")]
pub use file::FileStorage;

#[cfg(feature = "serde")]
mod file {
    use std::collections::HashMap;
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;

    use super::{ContextStorage, StorageError, StorageResult};

    /// A flat JSON object on disk: `{"selectedClientId": "42", ...}`.
    ///
    /// Writes go to a sibling temp file and are renamed into place.
    #[derive(Debug)]
    pub struct FileStorage {
        path: PathBuf,
        lock: Mutex<()>,
    }

    impl FileStorage {
        pub fn new(path: impl Into<PathBuf>) -> Self {
            Self {
                path: path.into(),
                lock: Mutex::new(()),
            }
        }

        pub fn path(&self) -> &Path {
            &self.path
        }

        fn read_all(&self) -> StorageResult<HashMap<String, String>> {
            match std::fs::read_to_string(&self.path) {
                Ok(raw) if raw.trim().is_empty() => Ok(HashMap::new()),
                Ok(raw) => Ok(serde_json::from_str(&raw)?),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
                Err(e) => Err(e.into()),
            }
        }

        fn write_all(&self, values: &HashMap<String, String>) -> StorageResult<()> {
            if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            let tmp = self.path.with_extension("json.tmp");
            std::fs::write(&tmp, serde_json::to_vec_pretty(values)?)?;
            std::fs::rename(&tmp, &self.path)?;
            Ok(())
        }

        fn update<F>(&self, f: F) -> StorageResult<()>
        where
            F: FnOnce(&mut HashMap<String, String>),
        {
            let _guard = self
                .lock
                .lock()
                .map_err(|_| StorageError::Unavailable("file storage lock poisoned".to_string()))?;
            // A corrupt file is replaced rather than blocking every write.
            let mut values = self.read_all().unwrap_or_default();
            f(&mut values);
            self.write_all(&values)
        }
    }

    impl ContextStorage for FileStorage {
        fn get(&self, key: &str) -> StorageResult<Option<String>> {
            let _guard = self
                .lock
                .lock()
                .map_err(|_| StorageError::Unavailable("file storage lock poisoned".to_string()))?;
            Ok(self.read_all()?.get(key).cloned())
        }

        fn set(&self, key: &str, value: &str) -> StorageResult<()> {
            self.update(|values| {
                values.insert(key.to_string(), value.to_string());
            })
        }

        fn remove(&self, key: &str) -> StorageResult<()> {
            self.update(|values| {
                values.remove(key);
            })
        }
    }
}
