//! On-disk cache of raw extractions.
//!
//! Entries are keyed by the SHA-256 of the dataset locator and hold the
//! JSON-serialized raw record. An entry is written once and never replaced, so
//! readers can treat whatever they find as final.

use crate::error::{ExtractorError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use tempfile::NamedTempFile;

/// Hex SHA-256 of a locator.
pub fn cache_key(locator: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(locator.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// File-per-key cache under one directory.
#[derive(Debug, Clone)]
pub struct CacheStore {
    dir: PathBuf,
}

impl CacheStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    /// Bytes stored under `key`, if any.
    pub fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.entry_path(key);
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Stores `value` under `key` unless an entry already exists.
    ///
    /// Returns whether this call wrote the entry. The value goes to a temporary
    /// file first and is moved into place without overwriting, so concurrent
    /// writers of one key leave exactly one complete entry.
    pub fn put(&self, key: &str, value: &[u8]) -> Result<bool> {
        fs::create_dir_all(&self.dir)?;

        let mut file = NamedTempFile::new_in(&self.dir)?;
        file.write_all(value)?;
        file.flush()?;

        match file.persist_noclobber(self.entry_path(key)) {
            Ok(_) => Ok(true),
            Err(e) if e.error.kind() == std::io::ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(e.error.into()),
        }
    }

    /// Runs `fetch` through the cache.
    ///
    /// With `read_from_cache` set, a stored entry for `locator` is returned
    /// without calling `fetch`. Otherwise `fetch` runs and its result is
    /// stored when no entry exists yet.
    pub fn cached<T, F>(&self, locator: &str, read_from_cache: bool, fetch: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Result<T>,
    {
        let key = cache_key(locator);

        if read_from_cache {
            if let Some(bytes) = self.get(&key)? {
                tracing::info!("Reading {} from cache {}", locator, self.entry_path(&key).display());
                return serde_json::from_slice(&bytes).map_err(|e| {
                    ExtractorError::malformed(format!("corrupt cache entry {key}: {e}"))
                });
            }
            tracing::debug!("Cache miss for {}", locator);
        }

        let value = fetch()?;
        let bytes = serde_json::to_vec(&value)?;
        if self.put(&key, &bytes)? {
            tracing::info!("Saved {} to cache {}", locator, self.entry_path(&key).display());
        }
        Ok(value)
    }
}
