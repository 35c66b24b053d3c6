//! Small key/value stores backing the event cache and the scroll position.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Failed to read store: {0}")]
    Read(String),

    #[error("Failed to write store: {0}")]
    Write(String),

    #[error("Store contents are corrupt: {0}")]
    Corrupt(String),
}

/// String keys to JSON values. `clear` removes every key this store holds.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;
    fn set(&self, key: &str, value: Value) -> Result<(), StoreError>;
    fn clear(&self) -> Result<(), StoreError>;
}

/// Process-local store. Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<Map<String, Value>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        self.entries.lock().insert(key.to_string(), value);
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        self.entries.lock().clear();
        Ok(())
    }
}

/// A single JSON object on disk. A missing file reads as an empty store.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    fn read_all(&self) -> Result<Map<String, Value>, StoreError> {
        if !self.path.exists() {
            return Ok(Map::new());
        }

        let json = fs::read_to_string(&self.path)
            .map_err(|e| StoreError::Read(format!("{}: {}", self.path.display(), e)))?;
        if json.trim().is_empty() {
            return Ok(Map::new());
        }

        match serde_json::from_str(&json) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Err(StoreError::Corrupt(format!(
                "{} does not hold a JSON object",
                self.path.display()
            ))),
            Err(e) => Err(StoreError::Corrupt(format!("{}: {}", self.path.display(), e))),
        }
    }

    fn write_all(&self, map: &Map<String, Value>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| StoreError::Write(e.to_string()))?;
        }

        let json =
            serde_json::to_string_pretty(map).map_err(|e| StoreError::Write(e.to_string()))?;
        fs::write(&self.path, json)
            .map_err(|e| StoreError::Write(format!("{}: {}", self.path.display(), e)))
    }

    fn update(&self, f: impl FnOnce(&mut Map<String, Value>)) -> Result<(), StoreError> {
        let _guard = self.lock.lock();
        let mut map = self.read_all()?;
        f(&mut map);
        self.write_all(&map)
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let _guard = self.lock.lock();
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        self.update(|map| {
            map.insert(key.to_string(), value);
        })
    }

    /// Drops the whole file; a corrupt file is cleared too.
    fn clear(&self) -> Result<(), StoreError> {
        let _guard = self.lock.lock();
        if self.path.exists() {
            fs::remove_file(&self.path)
                .map_err(|e| StoreError::Write(format!("{}: {}", self.path.display(), e)))?;
            tracing::debug!("Cleared store at {:?}", self.path);
        }
        Ok(())
    }
}
