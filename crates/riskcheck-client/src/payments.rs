//! Checkout and payment confirmation
//!
//! Payment itself happens at the provider. The client only creates a checkout
//! session and, once the user comes back, asks the backend whether the session
//! was paid and which tier it unlocked.

use crate::api::ComplianceBackend;
use crate::error::{ClientError, ClientResult};
use crate::reconcile::{Authority, Reconciler, RefreshOutcome};
use riskcheck_core::{CheckoutRequest, CheckoutSession, MissingPrecondition, PaymentStatus, Tier};
use riskcheck_store::Scopes;
use std::sync::Arc;
use std::time::Duration;

/// Result of confirming a payment
#[derive(Debug, Clone, PartialEq)]
pub enum PaymentOutcome {
    /// The provider has not confirmed the session
    NotPaid,
    /// Paid, but the backend did not say for which assessment
    PaidUnlinked,
    /// Tier recorded locally and the assessment recomputed
    Unlocked {
        assessment_id: String,
        tier: Tier,
        refresh: RefreshOutcome,
    },
}

/// Checkout and confirmation operations
#[derive(Debug, Clone)]
pub struct Payments {
    reconciler: Reconciler,
    poll_delay: Duration,
    poll_retries: u32,
}

impl Payments {
    /// Payments sharing the reconciler's backend and scopes
    #[must_use]
    pub fn new(reconciler: Reconciler) -> Self {
        Self {
            reconciler,
            poll_delay: Duration::from_secs(1),
            poll_retries: 1,
        }
    }

    /// With re-poll delay and count for paid sessions still reporting `none`
    #[must_use]
    pub fn with_polling(mut self, delay: Duration, retries: u32) -> Self {
        self.poll_delay = delay;
        self.poll_retries = retries;
        self
    }

    fn backend(&self) -> &Arc<dyn ComplianceBackend> {
        self.reconciler.backend()
    }

    fn scopes(&self) -> &Scopes {
        self.reconciler.scopes()
    }

    /// Create a checkout session for the current assessment
    pub async fn start_checkout(&self, tier: Tier) -> ClientResult<CheckoutSession> {
        if !tier.is_paid() {
            return Err(ClientError::NotPurchasable(tier));
        }
        let assessment_id = self
            .scopes()
            .session
            .assessment_id()
            .await?
            .ok_or(MissingPrecondition::AssessmentId)?;
        let user_id = self.scopes().user_id_or_create().await?;

        let request = CheckoutRequest {
            tier,
            assessment_id: assessment_id.clone(),
            user_id,
        };
        let session = self
            .backend()
            .create_checkout_session(request)
            .await
            .map_err(ClientError::Checkout)?;
        tracing::info!("Started {tier} checkout for {assessment_id}");
        Ok(session)
    }

    async fn poll_status(&self, session_id: &str) -> ClientResult<PaymentStatus> {
        let mut status = self.backend().payment_status(session_id).await?;
        let mut attempts = 0;
        while status.paid
            && status.assessment_id.is_some()
            && status.unlocked_tier == Tier::None
            && attempts < self.poll_retries
        {
            attempts += 1;
            tracing::debug!("Session {session_id} paid but tier not recorded yet; re-polling");
            tokio::time::sleep(self.poll_delay).await;
            status = self.backend().payment_status(session_id).await?;
        }
        Ok(status)
    }

    /// Confirm a returning checkout session and unlock the assessment locally
    pub async fn confirm_payment(&self, session_id: &str) -> ClientResult<PaymentOutcome> {
        let session_id = session_id.trim();
        if session_id.is_empty() {
            return Err(MissingPrecondition::CheckoutSession.into());
        }

        let status = self.poll_status(session_id).await?;
        if !status.paid {
            tracing::info!("Session {session_id} not paid");
            return Ok(PaymentOutcome::NotPaid);
        }
        let Some(assessment_id) = status.assessment_id.filter(|id| !id.is_empty()) else {
            tracing::warn!("Session {session_id} paid without an assessment id");
            return Ok(PaymentOutcome::PaidUnlinked);
        };

        let tier = status.unlocked_tier;
        self.scopes().remember_assessment_id(&assessment_id).await?;
        self.scopes().persist_tier(&assessment_id, tier).await?;

        let refresh = self
            .reconciler
            .recompute(
                &assessment_id,
                Authority {
                    unlocked_tier: tier,
                    created_at: None,
                },
            )
            .await;
        tracing::info!("Payment confirmed for {assessment_id}: {tier}");
        Ok(PaymentOutcome::Unlocked {
            assessment_id,
            tier,
            refresh,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MockComplianceBackend;
    use crate::error::ApiError;
    use riskcheck_test_utils::{bar_input, bar_result};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn payments(backend: MockComplianceBackend, scopes: &Scopes) -> Payments {
        Payments::new(Reconciler::new(Arc::new(backend), scopes.clone())).with_polling(Duration::from_millis(1), 1)
    }

    #[tokio::test]
    async fn checkout_needs_assessment_id() {
        let mut backend = MockComplianceBackend::new();
        backend.expect_create_checkout_session().never();
        let scopes = Scopes::in_memory();

        let err = payments(backend, &scopes).start_checkout(Tier::Basic15).await.unwrap_err();
        assert_eq!(err.precondition(), Some(MissingPrecondition::AssessmentId));
    }

    #[tokio::test]
    async fn free_tier_is_not_purchasable() {
        let scopes = Scopes::in_memory();
        let err = payments(MockComplianceBackend::new(), &scopes)
            .start_checkout(Tier::None)
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::NotPurchasable(Tier::None)));
    }

    #[tokio::test]
    async fn checkout_sends_stable_user_id() {
        let scopes = Scopes::in_memory();
        scopes.remember_assessment_id("a-1").await.unwrap();
        let mut backend = MockComplianceBackend::new();
        backend
            .expect_create_checkout_session()
            .withf(|request: &CheckoutRequest| {
                request.assessment_id == "a-1" && request.tier == Tier::Expert39 && request.user_id.starts_with("user_")
            })
            .times(2)
            .returning(|request| {
                Ok(CheckoutSession {
                    checkout_url: format!("https://pay.test/{}", request.user_id),
                    session_id: Some("cs_1".into()),
                })
            });

        let payments = payments(backend, &scopes);
        let first = payments.start_checkout(Tier::Expert39).await.unwrap();
        let second = payments.start_checkout(Tier::Expert39).await.unwrap();
        assert_eq!(first.checkout_url, second.checkout_url);
    }

    #[tokio::test]
    async fn checkout_failure_is_reported() {
        let scopes = Scopes::in_memory();
        scopes.remember_assessment_id("a-1").await.unwrap();
        let mut backend = MockComplianceBackend::new();
        backend.expect_create_checkout_session().returning(|_| {
            Err(ApiError::Status {
                status: 502,
                body: "bad gateway".into(),
            })
        });

        let err = payments(backend, &scopes).start_checkout(Tier::Basic15).await.unwrap_err();
        assert!(matches!(err, ClientError::Checkout(ApiError::Status { status: 502, .. })));
    }

    #[tokio::test]
    async fn confirm_retries_until_tier_recorded() {
        let scopes = Scopes::in_memory();
        scopes.store_input(&bar_input()).await.unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let mut backend = MockComplianceBackend::new();
        backend.expect_payment_status().returning(move |_| {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            Ok(PaymentStatus {
                paid: true,
                assessment_id: Some("a-9".into()),
                unlocked_tier: if n == 0 { Tier::None } else { Tier::Basic15 },
            })
        });
        backend
            .expect_assess()
            .times(1)
            .returning(|request| Ok(bar_result(request.assessment_id.as_deref().unwrap_or_default(), Tier::Basic15)));

        let outcome = payments(backend, &scopes).confirm_payment("cs_9").await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        match outcome {
            PaymentOutcome::Unlocked {
                assessment_id,
                tier,
                refresh,
            } => {
                assert_eq!(assessment_id, "a-9");
                assert_eq!(tier, Tier::Basic15);
                assert_eq!(refresh.label(), "refreshed");
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        assert_eq!(scopes.session.unlocked_tier("a-9").await.unwrap(), Some(Tier::Basic15));
        assert_eq!(scopes.durable.assessment_id().await.unwrap().as_deref(), Some("a-9"));
    }

    #[tokio::test]
    async fn unpaid_and_unlinked_sessions() {
        let scopes = Scopes::in_memory();
        let mut backend = MockComplianceBackend::new();
        backend.expect_payment_status().returning(|sid| {
            Ok(PaymentStatus {
                paid: sid == "cs_paid",
                assessment_id: None,
                unlocked_tier: Tier::None,
            })
        });
        backend.expect_assess().never();
        let payments = payments(backend, &scopes);

        assert_eq!(payments.confirm_payment("cs_open").await.unwrap(), PaymentOutcome::NotPaid);
        assert_eq!(payments.confirm_payment("cs_paid").await.unwrap(), PaymentOutcome::PaidUnlinked);
        let err = payments.confirm_payment("  ").await.unwrap_err();
        assert_eq!(err.precondition(), Some(MissingPrecondition::CheckoutSession));
    }
}
