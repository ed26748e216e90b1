//! Durable scope backed by a JSON file
//!
//! The whole scope is one JSON object of string values. Every write rewrites the
//! file through a temporary sibling and a rename, so a crash mid-write leaves
//! the previous contents in place. A file that does not parse is moved aside
//! to `*.json.corrupt` before the scope starts over empty.

use crate::error::{StoreError, StoreResult};
use crate::scope::KeyValueScope;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// File-backed scope
#[derive(Debug)]
pub struct FileScope {
    path: PathBuf,
    name: &'static str,
    // serializes read-modify-write cycles within this process
    lock: Mutex<()>,
}

impl FileScope {
    /// Durable scope stored at `path`
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            name: "durable",
            lock: Mutex::new(()),
        }
    }

    /// Same as [`FileScope::new`] with a different log name
    #[must_use]
    pub fn named(path: impl Into<PathBuf>, name: &'static str) -> Self {
        Self {
            name,
            ..Self::new(path)
        }
    }

    /// Backing file path
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> StoreResult<BTreeMap<String, String>> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(StoreError::io_error(&self.path, e)),
        };
        if raw.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        match serde_json::from_str(&raw) {
            Ok(map) => Ok(map),
            Err(e) => {
                let aside = self.path.with_extension("json.corrupt");
                tracing::warn!(
                    "Unreadable {} scope {}: {e}; moving it to {}",
                    self.name,
                    self.path.display(),
                    aside.display()
                );
                tokio::fs::rename(&self.path, &aside)
                    .await
                    .map_err(|e| StoreError::io_error(&aside, e))?;
                Ok(BTreeMap::new())
            }
        }
    }

    async fn save(&self, map: &BTreeMap<String, String>) -> StoreResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| StoreError::io_error(parent, e))?;
            }
        }
        let body = serde_json::to_string_pretty(map).map_err(|source| StoreError::Encode {
            key: self.path.display().to_string(),
            source,
        })?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, body)
            .await
            .map_err(|e| StoreError::io_error(&tmp, e))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| StoreError::io_error(&self.path, e))
    }
}

#[async_trait]
impl KeyValueScope for FileScope {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let _guard = self.lock.lock().await;
        Ok(self.load().await?.remove(key))
    }

    async fn set(&self, key: &str, value: String) -> StoreResult<()> {
        let _guard = self.lock.lock().await;
        let mut map = self.load().await?;
        map.insert(key.to_string(), value);
        self.save(&map).await
    }

    async fn remove(&self, key: &str) -> StoreResult<()> {
        let _guard = self.lock.lock().await;
        let mut map = self.load().await?;
        if map.remove(key).is_some() {
            self.save(&map).await?;
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        self.name
    }
}
