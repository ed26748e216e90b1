//! Short-lived scope backed by moka
//!
//! Entries disappear after a period of inactivity, the way a browser tab's
//! session storage goes away with the tab.

use crate::error::StoreResult;
use crate::scope::KeyValueScope;
use async_trait::async_trait;
use moka::future::Cache;
use std::time::Duration;

/// Default idle time before session entries expire
pub const DEFAULT_SESSION_IDLE: Duration = Duration::from_secs(60 * 60);

/// In-memory short-lived scope
#[derive(Debug, Clone)]
pub struct SessionScope {
    inner: Cache<String, String>,
}

impl SessionScope {
    /// Create scope whose entries expire after `idle` without access
    #[inline]
    #[must_use]
    pub fn with_idle(max_capacity: u64, idle: Duration) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(max_capacity)
                .time_to_idle(idle)
                .build(),
        }
    }
}

impl Default for SessionScope {
    /// Scope with 1,024 entries and a one hour idle expiry
    fn default() -> Self {
        Self::with_idle(1_024, DEFAULT_SESSION_IDLE)
    }
}

#[async_trait]
impl KeyValueScope for SessionScope {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.inner.get(key).await)
    }

    async fn set(&self, key: &str, value: String) -> StoreResult<()> {
        self.inner.insert(key.to_string(), value).await;
        Ok(())
    }

    async fn remove(&self, key: &str) -> StoreResult<()> {
        self.inner.invalidate(key).await;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "session"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_get_remove() {
        let scope = SessionScope::default();
        scope.set("assessment_id", "a-1".into()).await.unwrap();
        assert_eq!(scope.get("assessment_id").await.unwrap().as_deref(), Some("a-1"));

        scope.remove("assessment_id").await.unwrap();
        assert!(scope.get("assessment_id").await.unwrap().is_none());
        scope.remove("never_set").await.unwrap();
    }

    #[tokio::test]
    async fn idle_entries_expire() {
        let scope = SessionScope::with_idle(16, Duration::from_millis(50));
        scope.set("k", "v".into()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(scope.get("k").await.unwrap().is_none());
    }
}
