//! Stage selection and questionnaire submission

use crate::api::{AssessRequest, ComplianceBackend};
use crate::error::{ApiError, ClientResult};
use riskcheck_core::{AssessmentInput, AssessmentResult, MissingPrecondition, Stage, Tier};
use riskcheck_store::Scopes;
use std::sync::Arc;

/// Intake operations
#[derive(Clone)]
pub struct Intake {
    backend: Arc<dyn ComplianceBackend>,
    scopes: Scopes,
}

impl std::fmt::Debug for Intake {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Intake").field("scopes", &self.scopes).finish_non_exhaustive()
    }
}

impl Intake {
    #[must_use]
    pub fn new(backend: Arc<dyn ComplianceBackend>, scopes: Scopes) -> Self {
        Self { backend, scopes }
    }

    /// Remember the chosen stage in the durable scope
    pub async fn select_stage(&self, stage: Stage) -> ClientResult<()> {
        self.scopes.durable.set_stage(stage).await?;
        tracing::info!("Selected stage {stage}");
        Ok(())
    }

    /// Previously chosen stage
    pub async fn current_stage(&self) -> ClientResult<Option<Stage>> {
        Ok(self.scopes.durable.stage().await?)
    }

    /// Submit a questionnaire and cache the new assessment
    ///
    /// Requires a selected stage. The backend must issue an id; the client never
    /// makes one up.
    pub async fn submit(&self, input: AssessmentInput) -> ClientResult<AssessmentResult> {
        let stage = self
            .current_stage()
            .await?
            .ok_or(MissingPrecondition::Stage)?;
        if stage != input.stage {
            tracing::warn!("Submitting {} input while stage {stage} is selected", input.stage);
        }

        self.scopes.store_input(&input).await?;
        let result = self.backend.assess(AssessRequest::new(input)).await?;

        let id = result
            .id
            .clone()
            .filter(|id| !id.trim().is_empty())
            .ok_or(ApiError::MissingId)?;

        self.scopes.remember_assessment_id(&id).await?;
        self.scopes.session.set_result(&result).await?;
        self.scopes.persist_tier(&id, Tier::None).await?;
        tracing::info!(
            "Created assessment {id}: score {} ({}), paywall {}",
            result.risk_score,
            result.risk_level,
            result.required_tier()
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MockComplianceBackend;
    use crate::error::ClientError;
    use riskcheck_store::StorageKey;
    use riskcheck_test_utils::{bar_input, bar_result};

    #[tokio::test]
    async fn submit_requires_stage() {
        let mut backend = MockComplianceBackend::new();
        backend.expect_assess().never();
        let intake = Intake::new(Arc::new(backend), Scopes::in_memory());

        let err = intake.submit(bar_input()).await.unwrap_err();
        assert_eq!(err.precondition(), Some(MissingPrecondition::Stage));
    }

    #[tokio::test]
    async fn submit_caches_everything() {
        let mut backend = MockComplianceBackend::new();
        backend
            .expect_assess()
            .withf(|request: &AssessRequest| request.assessment_id.is_none() && request.input.industry == "bar")
            .times(1)
            .returning(|_| Ok(bar_result("srv-7", Tier::None)));
        let scopes = Scopes::in_memory();
        let intake = Intake::new(Arc::new(backend), scopes.clone());

        intake.select_stage(Stage::Autonomo).await.unwrap();
        let result = intake.submit(bar_input()).await.unwrap();

        assert_eq!(result.id.as_deref(), Some("srv-7"));
        assert_eq!(result.required_tier(), Tier::Basic15);
        assert_eq!(scopes.resolve_assessment_id(None).await.unwrap().as_deref(), Some("srv-7"));
        assert_eq!(scopes.durable.input().await.unwrap(), Some(bar_input()));
        assert_eq!(scopes.session.result().await.unwrap(), Some(result));
        assert_eq!(
            scopes
                .durable
                .raw(&StorageKey::UnlockedTier("srv-7".into()))
                .await
                .unwrap()
                .as_deref(),
            Some("none")
        );
    }

    #[tokio::test]
    async fn response_without_id_is_rejected() {
        let mut backend = MockComplianceBackend::new();
        backend.expect_assess().returning(|_| {
            let mut result = bar_result("x", Tier::None);
            result.id = None;
            Ok(result)
        });
        let scopes = Scopes::in_memory();
        let intake = Intake::new(Arc::new(backend), scopes.clone());
        intake.select_stage(Stage::Autonomo).await.unwrap();

        let err = intake.submit(bar_input()).await.unwrap_err();
        assert!(matches!(err, ClientError::Api(ApiError::MissingId)));
        assert!(scopes.resolve_assessment_id(None).await.unwrap().is_none());
    }
}
