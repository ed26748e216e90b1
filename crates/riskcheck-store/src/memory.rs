//! Plain in-memory scope

use crate::error::StoreResult;
use crate::scope::KeyValueScope;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

/// Map-backed scope without expiry
#[derive(Debug, Default)]
pub struct MemoryScope {
    name: &'static str,
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryScope {
    /// Empty scope with a log name
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            entries: RwLock::new(HashMap::new()),
        }
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[async_trait]
impl KeyValueScope for MemoryScope {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.entries.read().get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> StoreResult<()> {
        self.entries.write().insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> StoreResult<()> {
        self.entries.write().remove(key);
        Ok(())
    }

    fn name(&self) -> &'static str {
        if self.name.is_empty() {
            "memory"
        } else {
            self.name
        }
    }
}
