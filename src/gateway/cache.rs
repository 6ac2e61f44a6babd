//! Etymology record storage.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use lru::LruCache;
use thiserror::Error;

use super::EtymologyRecord;

/// Bumped whenever the stored record shape changes.
pub const CACHE_KEY_PREFIX: &str = "cache_ety_v2_";

/// Storage key of a word: versioned, trimmed and lower-cased.
#[must_use]
pub fn cache_key(word: &str) -> String {
    format!("{CACHE_KEY_PREFIX}{}", word.trim().to_lowercase())
}

/// The word a storage key was made from, `None` for foreign keys.
#[must_use]
pub fn word_of_key(key: &str) -> Option<&str> {
    key.strip_prefix(CACHE_KEY_PREFIX)
}

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache I/O failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cache file {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Key-value storage for records.
pub trait CacheStore {
    fn get(&mut self, key: &str) -> Option<EtymologyRecord>;

    fn put(&mut self, key: &str, record: EtymologyRecord) -> Result<(), CacheError>;

    /// Returns whether the key was present.
    fn remove(&mut self, key: &str) -> Result<bool, CacheError>;

    fn clear(&mut self) -> Result<(), CacheError>;

    /// All keys, sorted.
    fn keys(&self) -> Vec<String>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<S: CacheStore + ?Sized> CacheStore for Box<S> {
    fn get(&mut self, key: &str) -> Option<EtymologyRecord> {
        (**self).get(key)
    }

    fn put(&mut self, key: &str, record: EtymologyRecord) -> Result<(), CacheError> {
        (**self).put(key, record)
    }

    fn remove(&mut self, key: &str) -> Result<bool, CacheError> {
        (**self).remove(key)
    }

    fn clear(&mut self) -> Result<(), CacheError> {
        (**self).clear()
    }

    fn keys(&self) -> Vec<String> {
        (**self).keys()
    }

    fn len(&self) -> usize {
        (**self).len()
    }
}

/// Unbounded in-memory store.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: BTreeMap<String, EtymologyRecord>,
}

impl MemoryCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl CacheStore for MemoryCache {
    fn get(&mut self, key: &str) -> Option<EtymologyRecord> {
        self.entries.get(key).cloned()
    }

    fn put(&mut self, key: &str, record: EtymologyRecord) -> Result<(), CacheError> {
        self.entries.insert(key.to_string(), record);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<bool, CacheError> {
        Ok(self.entries.remove(key).is_some())
    }

    fn clear(&mut self) -> Result<(), CacheError> {
        self.entries.clear();
        Ok(())
    }

    fn keys(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Unbounded store persisted as one pretty-printed JSON object.
///
/// Every change rewrites the file through a temporary sibling, so a crash
/// leaves either the old or the new map on disk. Nothing is ever evicted.
#[derive(Debug)]
pub struct JsonFileCache {
    path: PathBuf,
    entries: BTreeMap<String, EtymologyRecord>,
}

impl JsonFileCache {
    /// Opens the store at `path`, starting empty when the file does not exist.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let path = path.into();
        let entries = if path.exists() {
            let content = fs::read_to_string(&path).map_err(|source| CacheError::Io {
                path: path.clone(),
                source,
            })?;
            if content.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&content).map_err(|source| CacheError::Corrupt {
                    path: path.clone(),
                    source,
                })?
            }
        } else {
            BTreeMap::new()
        };
        Ok(Self { path, entries })
    }

    /// Like [`JsonFileCache::open`], but a corrupt file is logged and replaced.
    #[must_use]
    pub fn open_or_empty(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self::open(&path).unwrap_or_else(|e| {
            log::error!("Failed to load etymology cache: {e}");
            Self {
                path,
                entries: BTreeMap::new(),
            }
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> CacheError {
        CacheError::Io {
            path: self.path.clone(),
            source,
        }
    }

    fn save(&self) -> Result<(), CacheError> {
        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir).map_err(|e| self.io_error(e))?;

        let json = serde_json::to_string_pretty(&self.entries).map_err(|source| {
            CacheError::Corrupt {
                path: self.path.clone(),
                source,
            }
        })?;

        let mut file = tempfile::NamedTempFile::new_in(&dir).map_err(|e| self.io_error(e))?;
        file.write_all(json.as_bytes())
            .map_err(|e| self.io_error(e))?;
        file.persist(&self.path)
            .map_err(|e| self.io_error(e.error))?;
        Ok(())
    }
}

impl CacheStore for JsonFileCache {
    fn get(&mut self, key: &str) -> Option<EtymologyRecord> {
        self.entries.get(key).cloned()
    }

    fn put(&mut self, key: &str, record: EtymologyRecord) -> Result<(), CacheError> {
        self.entries.insert(key.to_string(), record);
        self.save()
    }

    fn remove(&mut self, key: &str) -> Result<bool, CacheError> {
        if self.entries.remove(key).is_none() {
            return Ok(false);
        }
        self.save()?;
        Ok(true)
    }

    fn clear(&mut self) -> Result<(), CacheError> {
        self.entries.clear();
        self.save()
    }

    fn keys(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// In-memory store that keeps only the most recently used records.
pub struct BoundedCache {
    entries: LruCache<String, EtymologyRecord>,
}

impl BoundedCache {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: LruCache::new(NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN)),
        }
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.entries.cap().get()
    }
}

impl CacheStore for BoundedCache {
    fn get(&mut self, key: &str) -> Option<EtymologyRecord> {
        self.entries.get(key).cloned()
    }

    fn put(&mut self, key: &str, record: EtymologyRecord) -> Result<(), CacheError> {
        self.entries.put(key.to_string(), record);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<bool, CacheError> {
        Ok(self.entries.pop(key).is_some())
    }

    fn clear(&mut self) -> Result<(), CacheError> {
        self.entries.clear();
        Ok(())
    }

    fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.iter().map(|(k, _)| k.clone()).collect();
        keys.sort();
        keys
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}
