//! Two-tier metadata cache.
//!
//! Lookups check an in-process map first and then, if a cache directory is
//! configured, fall through to `<dir>/<sha256(key)>.txt`. Entries hold JSON
//! and are never expired here.

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use pfr_util::errors::PfrError;
use pfr_util::fs::{ensure_dir, read_if_exists};
use pfr_util::hash::sha256_str;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// Metadata cache shared by all spec searchers in one resolution.
#[derive(Debug, Default)]
pub struct Cache {
    memory: HashMap<String, Value>,
    dir: Option<PathBuf>,
}

impl Cache {
    /// Create a cache, optionally backed by `dir`.
    ///
    /// If `dir` cannot be created the cache runs memory-only.
    pub fn new(dir: Option<PathBuf>) -> Self {
        let dir = dir.and_then(|dir| match ensure_dir(&dir) {
            Ok(()) => Some(dir),
            Err(e) => {
                let err = PfrError::CacheUnavailable {
                    message: format!("{}: {e}", dir.display()),
                };
                tracing::warn!("{err}; continuing with an in-memory cache");
                None
            }
        });
        Self {
            memory: HashMap::new(),
            dir,
        }
    }

    /// A cache with no persistent tier.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// The persistent directory, if the disk tier is active.
    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    /// File backing `key` in the persistent tier.
    pub fn entry_path(&self, key: &str) -> Option<PathBuf> {
        self.dir
            .as_ref()
            .map(|dir| dir.join(format!("{}.txt", sha256_str(key))))
    }

    pub fn exists(&self, key: &str) -> bool {
        self.memory.contains_key(key) || self.entry_path(key).is_some_and(|p| p.is_file())
    }

    /// Look up `key`. A disk hit is promoted into memory.
    ///
    /// An entry on disk that is not valid JSON is a [`PfrError::CacheCorruption`].
    pub fn load(&mut self, key: &str) -> Result<Option<Value>, PfrError> {
        if let Some(value) = self.memory.get(key) {
            return Ok(Some(value.clone()));
        }
        let Some(path) = self.entry_path(key) else {
            return Ok(None);
        };
        let Some(content) = read_if_exists(&path)? else {
            return Ok(None);
        };
        let value: Value = serde_json::from_str(&content).map_err(|e| corruption(key, e))?;
        tracing::debug!("cache hit on disk for {key}");
        self.memory.insert(key.to_string(), value.clone());
        Ok(Some(value))
    }

    /// [`Cache::load`] followed by deserialization into `T`.
    pub fn load_as<T: DeserializeOwned>(&mut self, key: &str) -> Result<Option<T>, PfrError> {
        match self.load(key)? {
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|e| corruption(key, e)),
            None => Ok(None),
        }
    }

    /// Store `value` in memory, and on disk when `persist` is set.
    ///
    /// Returns `false` if a requested disk write did not happen.
    pub fn save(&mut self, key: &str, value: Value, persist: bool) -> bool {
        let written = if persist {
            match self.write_entry(key, &value) {
                Ok(written) => written,
                Err(e) => {
                    tracing::warn!("failed to persist cache entry {key}: {e}");
                    false
                }
            }
        } else {
            true
        };
        self.memory.insert(key.to_string(), value);
        written
    }

    /// Serialize `value` and [`Cache::save`] it.
    pub fn save_as<T: Serialize>(&mut self, key: &str, value: &T, persist: bool) -> bool {
        match serde_json::to_value(value) {
            Ok(value) => self.save(key, value, persist),
            Err(e) => {
                tracing::warn!("failed to serialize cache entry {key}: {e}");
                false
            }
        }
    }

    fn write_entry(&self, key: &str, value: &Value) -> Result<bool, PfrError> {
        let (Some(dir), Some(path)) = (self.dir.as_ref(), self.entry_path(key)) else {
            return Ok(false);
        };
        let content = serde_json::to_string(value).map_err(|e| PfrError::Generic {
            message: format!("failed to encode cache entry {key}: {e}"),
        })?;
        // Write then rename so concurrent readers never see a partial file.
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(content.as_bytes())?;
        tmp.persist(&path).map_err(|e| PfrError::Io(e.error))?;
        Ok(true)
    }
}

fn corruption(key: &str, e: serde_json::Error) -> PfrError {
    PfrError::CacheCorruption {
        key: key.to_string(),
        message: e.to_string(),
    }
}
