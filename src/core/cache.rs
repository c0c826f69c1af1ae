use anyhow::{Context, Result};
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use super::config::CacheFormat;
use super::error::{AutoloadError, AutoloadResult};

const KEY_SEPARATOR: char = '-';

/// Namespaced key/value store persisting one file per key
pub struct CacheStore {
    directory: PathBuf,
    namespace: String,
    format: CacheFormat,
}

impl CacheStore {
    /// Open a store rooted at `directory`, which must already exist and be writable.
    pub fn new(
        directory: impl AsRef<Path>,
        namespace: Option<&str>,
        format: CacheFormat,
    ) -> AutoloadResult<Self> {
        let directory = directory.as_ref().to_path_buf();
        if !directory.is_dir() {
            return Err(AutoloadError::CacheDirMissing(directory));
        }

        // Creating (and immediately dropping) a temp file is the only portable
        // way to know the directory accepts writes.
        tempfile::Builder::new()
            .prefix(".autoscan-probe")
            .tempfile_in(&directory)
            .map_err(|source| AutoloadError::CacheDirNotWritable {
                path: directory.clone(),
                source,
            })?;

        Ok(Self {
            directory,
            namespace: sanitize(namespace.unwrap_or_default()),
            format,
        })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn format(&self) -> CacheFormat {
        self.format
    }

    /// Path of the file backing `key`.
    pub fn cache_path(&self, key: &str) -> PathBuf {
        let hash = format!("{:x}", Sha256::digest(key.as_bytes()));
        let filename = if self.namespace.is_empty() {
            hash
        } else {
            format!("{}{}{}", self.namespace, KEY_SEPARATOR, hash)
        };
        self.directory.join(filename)
    }

    /// Raw bytes stored under `key`, or `None` if nothing was saved yet.
    pub fn load_blob(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.cache_path(key);
        match fs::read(&path) {
            Ok(data) => Ok(Some(data)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => {
                Err(err).with_context(|| format!("Failed to read cache file {}", path.display()))
            }
        }
    }

    /// Replace the bytes stored under `key`. Concurrent writers race and the
    /// last persist wins; readers never observe a partially written file.
    pub fn save_blob(&self, key: &str, data: &[u8]) -> Result<()> {
        let path = self.cache_path(key);
        let mut staged = tempfile::NamedTempFile::new_in(&self.directory)
            .with_context(|| format!("Failed to stage cache file in {}", self.directory.display()))?;
        staged.write_all(data)?;
        staged.flush()?;
        staged
            .persist(&path)
            .with_context(|| format!("Failed to write cache file {}", path.display()))?;
        Ok(())
    }

    pub fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let Some(data) = self.load_blob(key)? else {
            return Ok(None);
        };
        let value = match self.format {
            CacheFormat::Json => serde_json::from_slice(&data)?,
            CacheFormat::Bincode => bincode::deserialize(&data)?,
        };
        Ok(Some(value))
    }

    pub fn save<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let data = match self.format {
            CacheFormat::Json => serde_json::to_vec(value)?,
            CacheFormat::Bincode => bincode::serialize(value)?,
        };
        self.save_blob(key, &data)
    }

    /// Delete the entry for `key`. Returns whether a file was removed.
    pub fn remove(&self, key: &str) -> Result<bool> {
        let path = self.cache_path(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(err) => {
                Err(err).with_context(|| format!("Failed to remove cache file {}", path.display()))
            }
        }
    }
}

/// Replace every character outside `[A-Za-z0-9._-]` with `_`.
pub fn sanitize(namespace: &str) -> String {
    static UNSAFE: OnceLock<Regex> = OnceLock::new();
    let pattern = UNSAFE.get_or_init(|| Regex::new(r"[^A-Za-z0-9._-]").expect("valid regex"));
    pattern.replace_all(namespace, "_").into_owned()
}
