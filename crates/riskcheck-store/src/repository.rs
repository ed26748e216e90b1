//! Typed access to the storage scopes
//!
//! [`AssessmentRepository`] wraps one scope with a get/set/clear per logical
//! key. Stored values are parsed on read; anything that does not parse is
//! logged, removed and reported as absent. [`Scopes`] pairs the short-lived and
//! durable repositories and implements the lookups that consult both.

use crate::error::{StoreError, StoreResult};
use crate::keys::StorageKey;
use crate::memory::MemoryScope;
use crate::scope::KeyValueScope;
use crate::session::SessionScope;
use riskcheck_core::{AssessmentInput, AssessmentResult, Stage, Tier};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;

/// Typed view over one scope
#[derive(Debug, Clone)]
pub struct AssessmentRepository {
    scope: Arc<dyn KeyValueScope>,
}

impl AssessmentRepository {
    #[must_use]
    pub fn new(scope: Arc<dyn KeyValueScope>) -> Self {
        Self { scope }
    }

    /// Log name of the underlying scope
    #[must_use]
    pub fn scope_name(&self) -> &'static str {
        self.scope.name()
    }

    /// Raw stored string for a key
    pub async fn raw(&self, key: &StorageKey) -> StoreResult<Option<String>> {
        self.scope.get(&key.as_key()).await
    }

    /// Remove a key
    pub async fn clear(&self, key: &StorageKey) -> StoreResult<()> {
        self.scope.remove(&key.as_key()).await
    }

    async fn get_text(&self, key: &StorageKey) -> StoreResult<Option<String>> {
        Ok(self.raw(key).await?.filter(|v| !v.trim().is_empty()))
    }

    async fn set_text(&self, key: &StorageKey, value: &str) -> StoreResult<()> {
        self.scope.set(&key.as_key(), value.to_string()).await
    }

    async fn get_json<T: DeserializeOwned>(&self, key: &StorageKey) -> StoreResult<Option<T>> {
        let Some(raw) = self.get_text(key).await? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                tracing::warn!("Discarding malformed {key} in {} scope: {e}", self.scope_name());
                self.clear(key).await?;
                Ok(None)
            }
        }
    }

    async fn set_json<T: Serialize>(&self, key: &StorageKey, value: &T) -> StoreResult<()> {
        let raw = serde_json::to_string(value).map_err(|source| StoreError::Encode {
            key: key.to_string(),
            source,
        })?;
        self.scope.set(&key.as_key(), raw).await
    }

    pub async fn assessment_id(&self) -> StoreResult<Option<String>> {
        self.get_text(&StorageKey::AssessmentId).await
    }

    pub async fn set_assessment_id(&self, id: &str) -> StoreResult<()> {
        self.set_text(&StorageKey::AssessmentId, id).await
    }

    /// Cached result; malformed JSON counts as a miss
    pub async fn result(&self) -> StoreResult<Option<AssessmentResult>> {
        self.get_json(&StorageKey::AssessmentResult).await
    }

    pub async fn set_result(&self, result: &AssessmentResult) -> StoreResult<()> {
        self.set_json(&StorageKey::AssessmentResult, result).await
    }

    pub async fn input(&self) -> StoreResult<Option<AssessmentInput>> {
        self.get_json(&StorageKey::AssessmentInput).await
    }

    pub async fn set_input(&self, input: &AssessmentInput) -> StoreResult<()> {
        self.set_json(&StorageKey::AssessmentInput, input).await
    }

    /// Unlock record for `id`, normalized; `None` when never written or blank
    pub async fn unlocked_tier(&self, id: &str) -> StoreResult<Option<Tier>> {
        let raw = self.get_text(&StorageKey::UnlockedTier(id.to_string())).await?;
        Ok(raw.map(|t| Tier::normalize(Some(t.as_str()))))
    }

    pub async fn set_unlocked_tier(&self, id: &str, tier: Tier) -> StoreResult<()> {
        self.set_text(&StorageKey::UnlockedTier(id.to_string()), tier.as_str())
            .await
    }

    pub async fn user_id(&self) -> StoreResult<Option<String>> {
        self.get_text(&StorageKey::UserId).await
    }

    pub async fn set_user_id(&self, user_id: &str) -> StoreResult<()> {
        self.set_text(&StorageKey::UserId, user_id).await
    }

    /// Stored stage; an unknown value is discarded
    pub async fn stage(&self) -> StoreResult<Option<Stage>> {
        let Some(raw) = self.get_text(&StorageKey::Stage).await? else {
            return Ok(None);
        };
        match raw.parse::<Stage>() {
            Ok(stage) => Ok(Some(stage)),
            Err(e) => {
                tracing::warn!("Discarding stored stage: {e}");
                self.clear(&StorageKey::Stage).await?;
                Ok(None)
            }
        }
    }

    pub async fn set_stage(&self, stage: Stage) -> StoreResult<()> {
        self.set_text(&StorageKey::Stage, stage.as_str()).await
    }
}

/// Short-lived and durable repositories together
#[derive(Debug, Clone)]
pub struct Scopes {
    pub session: AssessmentRepository,
    pub durable: AssessmentRepository,
}

impl Scopes {
    #[must_use]
    pub fn new(session: Arc<dyn KeyValueScope>, durable: Arc<dyn KeyValueScope>) -> Self {
        Self {
            session: AssessmentRepository::new(session),
            durable: AssessmentRepository::new(durable),
        }
    }

    /// Moka session scope plus an in-memory durable scope
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(SessionScope::default()),
            Arc::new(MemoryScope::new("durable")),
        )
    }

    /// Resolve the assessment id: explicit value, then session, then durable
    ///
    /// A resolved id is written back to both scopes.
    pub async fn resolve_assessment_id(&self, explicit: Option<&str>) -> StoreResult<Option<String>> {
        let explicit = explicit.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string);
        let id = match explicit {
            Some(id) => Some(id),
            None => match self.session.assessment_id().await? {
                Some(id) => Some(id),
                None => self.durable.assessment_id().await?,
            },
        };
        if let Some(id) = &id {
            self.remember_assessment_id(id).await?;
        }
        Ok(id)
    }

    /// Write the id to both scopes
    pub async fn remember_assessment_id(&self, id: &str) -> StoreResult<()> {
        self.session.set_assessment_id(id).await?;
        self.durable.set_assessment_id(id).await
    }

    /// Unlock tier for `id` from session then durable scope; `none` when absent
    pub async fn cached_tier(&self, id: &str) -> StoreResult<Tier> {
        if let Some(tier) = self.session.unlocked_tier(id).await? {
            return Ok(tier);
        }
        Ok(self.durable.unlocked_tier(id).await?.unwrap_or_default())
    }

    /// Persist the unlock record to both scopes
    pub async fn persist_tier(&self, id: &str, tier: Tier) -> StoreResult<()> {
        self.session.set_unlocked_tier(id, tier).await?;
        self.durable.set_unlocked_tier(id, tier).await
    }

    /// Questionnaire input from session then durable scope
    pub async fn cached_input(&self) -> StoreResult<Option<AssessmentInput>> {
        if let Some(input) = self.session.input().await? {
            return Ok(Some(input));
        }
        self.durable.input().await
    }

    /// Store the questionnaire input in both scopes
    pub async fn store_input(&self, input: &AssessmentInput) -> StoreResult<()> {
        self.session.set_input(input).await?;
        self.durable.set_input(input).await
    }

    /// Durable user id, generating and storing `user_<uuid>` the first time
    pub async fn user_id_or_create(&self) -> StoreResult<String> {
        if let Some(user_id) = self.durable.user_id().await? {
            return Ok(user_id);
        }
        let user_id = format!("user_{}", uuid::Uuid::new_v4());
        tracing::info!("Generated user id {user_id}");
        self.durable.set_user_id(&user_id).await?;
        Ok(user_id)
    }

    /// Forget the current assessment in both scopes
    ///
    /// Unlock records stay: they belong to an id, not to the session.
    pub async fn clear_assessment(&self) -> StoreResult<()> {
        for repo in [&self.session, &self.durable] {
            repo.clear(&StorageKey::AssessmentId).await?;
            repo.clear(&StorageKey::AssessmentResult).await?;
            repo.clear(&StorageKey::AssessmentInput).await?;
        }
        Ok(())
    }
}
