//! Feedback store: the persistent merchant-key → category override mapping.
//!
//! The core only needs point lookups and bulk iteration, so the storage
//! technology stays behind a trait. Two implementations ship: an in-memory
//! map for tests and request-scoped use, and a JSON file with atomic writes
//! for simple persistence.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::debug;

use crate::error::{Error, Result};

/// Key-value mapping from merchant key to user-confirmed category.
///
/// Last write wins; no versioning or history. Implementations must be safe
/// for concurrent readers and writers.
pub trait FeedbackStore: Send + Sync {
    /// Point lookup
    fn get(&self, merchant_key: &str) -> Option<String>;

    /// Insert or overwrite
    fn put(&self, merchant_key: &str, category: &str) -> Result<()>;

    /// Bulk iteration over all (merchant_key, category) pairs
    fn entries(&self) -> Vec<(String, String)>;
}

/// Purely in-memory store
#[derive(Debug, Default)]
pub struct MemoryStore {
    map: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FeedbackStore for MemoryStore {
    fn get(&self, merchant_key: &str) -> Option<String> {
        self.map.lock().unwrap().get(merchant_key).cloned()
    }

    fn put(&self, merchant_key: &str, category: &str) -> Result<()> {
        self.map
            .lock()
            .unwrap()
            .insert(merchant_key.to_string(), category.to_string());
        Ok(())
    }

    fn entries(&self) -> Vec<(String, String)> {
        self.map
            .lock()
            .unwrap()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

/// JSON-file-backed store with write-through persistence
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    map: Mutex<BTreeMap<String, String>>,
}

impl JsonFileStore {
    /// Open a store file, creating an empty store if the file is missing
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let map = if path.exists() {
            let text = std::fs::read_to_string(&path)?;
            serde_json::from_str(&text)?
        } else {
            BTreeMap::new()
        };
        debug!(path = %path.display(), entries = map.len(), "opened override store");
        Ok(Self {
            path,
            map: Mutex::new(map),
        })
    }

    /// Write the full map to a temp file in the target directory, then
    /// rename over the store file so readers never see a partial write
    fn persist(&self, map: &BTreeMap<String, String>) -> Result<()> {
        let dir = self.path.parent().filter(|p| !p.as_os_str().is_empty());
        if let Some(dir) = dir {
            std::fs::create_dir_all(dir)?;
        }
        let mut tmp = tempfile::NamedTempFile::new_in(dir.unwrap_or(Path::new(".")))?;
        serde_json::to_writer_pretty(&mut tmp, map)?;
        tmp.persist(&self.path).map_err(|e| Error::Io(e.error))?;
        Ok(())
    }
}

impl FeedbackStore for JsonFileStore {
    fn get(&self, merchant_key: &str) -> Option<String> {
        self.map.lock().unwrap().get(merchant_key).cloned()
    }

    fn put(&self, merchant_key: &str, category: &str) -> Result<()> {
        let mut map = self.map.lock().unwrap();
        map.insert(merchant_key.to_string(), category.to_string());
        self.persist(&map)
    }

    fn entries(&self) -> Vec<(String, String)> {
        self.map
            .lock()
            .unwrap()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}
