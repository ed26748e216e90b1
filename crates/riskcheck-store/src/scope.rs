//! Key/value scope abstraction
//!
//! A scope is a flat string-to-string map. The pipeline keeps two of them: a
//! short-lived one for the current session and a durable one that survives
//! restarts. Values are opaque here; [`crate::repository`] owns their schema.

use crate::error::StoreResult;
use async_trait::async_trait;
use std::fmt::Debug;

/// Flat string key/value storage
#[async_trait]
pub trait KeyValueScope: Send + Sync + Debug {
    /// Value for `key`, if present
    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Store `value` under `key`, replacing any previous value
    async fn set(&self, key: &str, value: String) -> StoreResult<()>;

    /// Remove `key`; removing a missing key is not an error
    async fn remove(&self, key: &str) -> StoreResult<()>;

    /// Short name for logs
    fn name(&self) -> &'static str;
}
