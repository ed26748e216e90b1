//! Result reconciliation
//!
//! The cached result is only a first paint. The backend is the authority on the
//! unlock tier, and paid sections are only present in a result computed after
//! that tier was recorded. [`Reconciler::refresh`] therefore:
//!
//! 1. reads the authoritative tier for the assessment
//! 2. persists it to both scopes under the id-scoped key
//! 3. re-submits the cached questionnaire for the same id
//! 4. replaces the cached result with the fresh one
//!
//! Step 2 always finishes before step 3 starts. Refreshes for one id are
//! serialized; different ids proceed independently. A retryable failure in
//! step 1 is retried a bounded number of times before the refresh goes stale.

use crate::api::{AssessRequest, ComplianceBackend};
use crate::error::{ApiError, ClientResult};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use riskcheck_core::expiry::REEVALUATE_AFTER_DAYS;
use riskcheck_core::{ActionRules, AssessmentRecord, AssessmentResult, MissingPrecondition, ResultView, Tier, ViewContext};
use riskcheck_store::Scopes;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Name of the reconcile outcome counter
pub const RECONCILE_COUNTER: &str = "riskcheck_reconcile_total";

/// Extra status attempts after a retryable failure
pub const DEFAULT_STATUS_RETRIES: u32 = 1;

/// Pause before each extra status attempt
pub const DEFAULT_STATUS_RETRY_DELAY: Duration = Duration::from_millis(250);

/// What the local scopes know before any network call
#[derive(Debug, Clone, PartialEq)]
pub struct CachedState {
    pub assessment_id: String,
    /// Cached result; `None` on a miss or malformed cache
    pub result: Option<AssessmentResult>,
    /// Cached unlock tier, `none` when never recorded
    pub unlocked_tier: Tier,
}

/// Authoritative unlock record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authority {
    pub unlocked_tier: Tier,
    pub created_at: Option<String>,
}

/// Why a refresh kept the cached data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaleReason {
    /// Tier lookup failed for a reason other than 404
    StatusUnavailable,
    /// No questionnaire input to re-submit
    NoCachedInput,
    /// Re-assessment failed
    AssessFailed,
    /// Fresh result could not be written to the scopes
    StoreFailed,
}

/// Result of a refresh
#[derive(Debug, Clone, PartialEq)]
pub enum RefreshOutcome {
    /// Tier persisted and cached result replaced
    Refreshed {
        authority: Authority,
        result: Box<AssessmentResult>,
    },
    /// Cached data stays; `authority` is set when step 1 succeeded
    Stale {
        authority: Option<Authority>,
        reason: StaleReason,
    },
    /// The backend does not know the id
    NotFound,
}

impl RefreshOutcome {
    /// Metric label
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            RefreshOutcome::Refreshed { .. } => "refreshed",
            RefreshOutcome::Stale { .. } => "stale",
            RefreshOutcome::NotFound => "not_found",
        }
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, RefreshOutcome::NotFound)
    }

    /// Authoritative record, when the backend answered
    #[must_use]
    pub fn authority(&self) -> Option<&Authority> {
        match self {
            RefreshOutcome::Refreshed { authority, .. } => Some(authority),
            RefreshOutcome::Stale { authority, .. } => authority.as_ref(),
            RefreshOutcome::NotFound => None,
        }
    }

    /// Fresh result, when step 4 ran
    #[must_use]
    pub fn result(&self) -> Option<&AssessmentResult> {
        match self {
            RefreshOutcome::Refreshed { result, .. } => Some(result),
            _ => None,
        }
    }
}

/// Everything needed to render the result page
#[derive(Debug, Clone, PartialEq)]
pub enum ResultPage {
    /// Terminal: ask the user to start over
    NotFound { assessment_id: String },
    /// No result anywhere yet
    Loading { assessment_id: String },
    /// A result to show, fresh or cached
    Ready {
        view: Box<ResultView>,
        refreshed: bool,
    },
}

/// Runs the reconciliation pipeline against one backend and pair of scopes
#[derive(Clone)]
pub struct Reconciler {
    backend: Arc<dyn ComplianceBackend>,
    scopes: Scopes,
    rules: ActionRules,
    reevaluate_after_days: i64,
    status_retries: u32,
    retry_delay: Duration,
    /// One entry per id with a refresh in flight
    locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("scopes", &self.scopes)
            .field("reevaluate_after_days", &self.reevaluate_after_days)
            .field("in_flight", &self.locks.len())
            .finish_non_exhaustive()
    }
}

impl Reconciler {
    #[must_use]
    pub fn new(backend: Arc<dyn ComplianceBackend>, scopes: Scopes) -> Self {
        Self {
            backend,
            scopes,
            rules: ActionRules::builtin().clone(),
            reevaluate_after_days: REEVALUATE_AFTER_DAYS,
            status_retries: DEFAULT_STATUS_RETRIES,
            retry_delay: DEFAULT_STATUS_RETRY_DELAY,
            locks: Arc::new(DashMap::new()),
        }
    }

    /// With a custom action rule table
    #[must_use]
    pub fn with_rules(mut self, rules: ActionRules) -> Self {
        self.rules = rules;
        self
    }

    /// With a custom re-evaluation threshold
    #[must_use]
    pub fn with_reevaluate_after_days(mut self, days: i64) -> Self {
        self.reevaluate_after_days = days;
        self
    }

    /// With `retries` extra status attempts, `delay` apart
    #[must_use]
    pub fn with_status_retry(mut self, retries: u32, delay: Duration) -> Self {
        self.status_retries = retries;
        self.retry_delay = delay;
        self
    }

    #[must_use]
    pub fn scopes(&self) -> &Scopes {
        &self.scopes
    }

    #[must_use]
    pub fn backend(&self) -> &Arc<dyn ComplianceBackend> {
        &self.backend
    }

    fn lock_for(&self, id: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry(id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Drop the id's lock entry unless another caller still holds it
    fn release(&self, id: &str, lock: Arc<Mutex<()>>) {
        drop(lock);
        self.locks.remove_if(id, |_, held| Arc::strong_count(held) == 1);
    }

    async fn fetch_status(&self, id: &str) -> Result<AssessmentRecord, ApiError> {
        let mut attempt = 0;
        loop {
            match self.backend.assessment_status(id).await {
                Err(e) if e.is_retryable() && attempt < self.status_retries => {
                    attempt += 1;
                    tracing::debug!("Status for {id} failed ({e}); retry {attempt}/{}", self.status_retries);
                    tokio::time::sleep(self.retry_delay).await;
                }
                other => return other,
            }
        }
    }

    /// Read the cached state without touching the network
    ///
    /// Fails only with [`MissingPrecondition::AssessmentId`] or a storage error.
    pub async fn load_cached(&self, explicit_id: Option<&str>) -> ClientResult<CachedState> {
        let assessment_id = self
            .scopes
            .resolve_assessment_id(explicit_id)
            .await?
            .ok_or(MissingPrecondition::AssessmentId)?;
        let result = self.scopes.session.result().await?;
        let unlocked_tier = self.scopes.cached_tier(&assessment_id).await?;
        Ok(CachedState {
            assessment_id,
            result,
            unlocked_tier,
        })
    }

    /// Run the four refresh steps for `id`
    ///
    /// Never fails: transport and storage problems downgrade to a stale outcome.
    pub async fn refresh(&self, id: &str) -> RefreshOutcome {
        let lock = self.lock_for(id);
        let outcome = {
            let _guard = lock.lock().await;
            self.refresh_locked(id).await
        };
        self.release(id, lock);

        metrics::counter!(RECONCILE_COUNTER, "outcome" => outcome.label()).increment(1);
        outcome
    }

    async fn refresh_locked(&self, id: &str) -> RefreshOutcome {
        match self.fetch_status(id).await {
            Ok(record) => {
                let authority = Authority {
                    unlocked_tier: record.unlocked_tier,
                    created_at: record.created_at,
                };
                if let Err(e) = self.scopes.persist_tier(id, authority.unlocked_tier).await {
                    tracing::warn!("Failed to persist unlocked tier for {id}: {e}");
                }
                self.recompute_locked(id, authority).await
            }
            Err(e) if e.is_not_found() => {
                tracing::info!("Assessment {id} not found on backend");
                RefreshOutcome::NotFound
            }
            Err(e) => {
                tracing::warn!("Failed to fetch assessment status for {id}: {e}");
                RefreshOutcome::Stale {
                    authority: None,
                    reason: StaleReason::StatusUnavailable,
                }
            }
        }
    }

    /// Steps 3 and 4 with a tier already known, e.g. from a payment status
    pub async fn recompute(&self, id: &str, authority: Authority) -> RefreshOutcome {
        let lock = self.lock_for(id);
        let outcome = {
            let _guard = lock.lock().await;
            self.recompute_locked(id, authority).await
        };
        self.release(id, lock);
        metrics::counter!(RECONCILE_COUNTER, "outcome" => outcome.label()).increment(1);
        outcome
    }

    async fn recompute_locked(&self, id: &str, authority: Authority) -> RefreshOutcome {
        let input = match self.scopes.cached_input().await {
            Ok(Some(input)) => input,
            Ok(None) => {
                tracing::debug!("No cached input for {id}; keeping cached result");
                return RefreshOutcome::Stale {
                    authority: Some(authority),
                    reason: StaleReason::NoCachedInput,
                };
            }
            Err(e) => {
                tracing::warn!("Failed to read cached input for {id}: {e}");
                return RefreshOutcome::Stale {
                    authority: Some(authority),
                    reason: StaleReason::NoCachedInput,
                };
            }
        };

        let result = match self.backend.assess(AssessRequest::recompute(input, id)).await {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!("Failed to recompute assessment {id}: {e}");
                return RefreshOutcome::Stale {
                    authority: Some(authority),
                    reason: StaleReason::AssessFailed,
                };
            }
        };

        if authority.unlocked_tier.is_paid() && result.decision_summary.paid_content_empty() {
            tracing::warn!(
                "Assessment {id} is unlocked at {} but paid sections came back empty",
                authority.unlocked_tier
            );
        }

        if let Err(e) = self.store_fresh(id, &result).await {
            tracing::warn!("Failed to cache refreshed result for {id}: {e}");
            return RefreshOutcome::Stale {
                authority: Some(authority),
                reason: StaleReason::StoreFailed,
            };
        }

        tracing::info!("Refreshed assessment {id} at tier {}", authority.unlocked_tier);
        RefreshOutcome::Refreshed {
            authority,
            result: Box::new(result),
        }
    }

    async fn store_fresh(&self, id: &str, result: &AssessmentResult) -> ClientResult<()> {
        self.scopes.session.set_result(result).await?;
        let fresh_id = result.id.as_deref().filter(|s| !s.is_empty()).unwrap_or(id);
        self.scopes.remember_assessment_id(fresh_id).await?;
        Ok(())
    }

    /// Cached read, refresh, then assemble the page from the best result available
    pub async fn load_page(&self, explicit_id: Option<&str>, now: DateTime<Utc>) -> ClientResult<ResultPage> {
        let cached = self.load_cached(explicit_id).await?;
        let id = cached.assessment_id.clone();
        let outcome = self.refresh(&id).await;

        if outcome.is_not_found() {
            return Ok(ResultPage::NotFound { assessment_id: id });
        }

        let unlocked = outcome
            .authority()
            .map_or(cached.unlocked_tier, |a| a.unlocked_tier);
        let created_at = outcome.authority().and_then(|a| a.created_at.clone());
        let refreshed = outcome.result().is_some();

        let cached_result = cached
            .result
            .filter(|r| r.id.as_deref().map_or(true, |rid| rid == id));
        let Some(result) = outcome.result().cloned().or(cached_result) else {
            return Ok(ResultPage::Loading { assessment_id: id });
        };

        let ctx = ViewContext::new(unlocked, now)
            .with_created_at(created_at)
            .with_threshold(self.reevaluate_after_days);
        let view = ResultView::assemble(&result, &ctx, &self.rules);
        Ok(ResultPage::Ready {
            view: Box::new(view),
            refreshed,
        })
    }
}
