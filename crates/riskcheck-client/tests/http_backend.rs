//! End-to-end tests against the in-process fake backend

use chrono::{DateTime, TimeZone, Utc};
use pretty_assertions::assert_eq;
use riskcheck_client::{
    ApiError, Client, ClientConfig, ClientError, ComplianceBackend, PaymentOutcome, RefreshOutcome, ResultPage,
    StaleReason,
};
use riskcheck_core::{PaymentStatus, Stage, Tier};
use riskcheck_store::{MemoryScope, Scopes};
use riskcheck_test_utils::{bar_input, spawn_fake_backend, FakeBackend, FAKE_PDF};
use std::sync::Arc;

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 21, 9, 0, 0).unwrap()
}

fn client_for(backend: &Arc<FakeBackend>, scopes: Scopes) -> Client {
    let base_url = spawn_fake_backend(backend.clone());
    let config = ClientConfig::new()
        .with_base_url(base_url)
        .with_timeout_secs(5)
        .with_payment_polling(1, 1)
        .with_status_retry(1, 1);
    Client::from_config(&config, scopes).unwrap()
}

async fn ready(client: &Client) -> riskcheck_core::ResultView {
    match client.reconciler().load_page(None, now()).await.unwrap() {
        ResultPage::Ready { view, refreshed } => {
            assert!(refreshed);
            *view
        }
        other => panic!("expected a ready page, got {other:?}"),
    }
}

#[tokio::test]
async fn submit_pay_and_unlock() {
    let backend = FakeBackend::new(Tier::Basic15);
    let scopes = Scopes::in_memory();
    let client = client_for(&backend, scopes.clone());

    client.intake().select_stage(Stage::Autonomo).await.unwrap();
    let result = client.intake().submit(bar_input()).await.unwrap();
    let id = result.id.clone().unwrap();
    assert_eq!(id, "fake-1");

    let locked = ready(&client).await;
    assert!(!locked.visible);
    assert!(locked.paid.is_none());
    assert_eq!(locked.upsell.as_ref().map(|card| card.tier), Some(Tier::Basic15));
    assert!(!locked.expired);

    let session = client.payments().start_checkout(Tier::Basic15).await.unwrap();
    let session_id = session.session_id.clone().unwrap();
    assert_eq!(session.checkout_url, format!("https://checkout.test/pay/{session_id}"));
    let requests = backend.checkout_requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].assessment_id, id);
    assert!(requests[0].user_id.starts_with("user_"));

    assert_eq!(
        client.payments().confirm_payment(&session_id).await.unwrap(),
        PaymentOutcome::NotPaid
    );

    backend.complete_payment(&session_id);
    match client.payments().confirm_payment(&session_id).await.unwrap() {
        PaymentOutcome::Unlocked {
            assessment_id,
            tier,
            refresh,
        } => {
            assert_eq!(assessment_id, id);
            assert_eq!(tier, Tier::Basic15);
            assert!(matches!(refresh, RefreshOutcome::Refreshed { .. }));
        }
        other => panic!("unexpected outcome {other:?}"),
    }
    assert_eq!(scopes.cached_tier(&id).await.unwrap(), Tier::Basic15);

    let unlocked = ready(&client).await;
    assert!(unlocked.visible);
    assert!(unlocked.upsell.is_none());
    let paid = unlocked.paid.expect("paid sections once unlocked");
    assert_eq!(paid.actions.total(), 3);
    assert!(paid.expert_pack.is_none());
    assert_eq!(backend.submitted_input(&id), Some(bar_input()));
}

#[tokio::test]
async fn unknown_assessment_is_not_found() {
    let backend = FakeBackend::new(Tier::Basic15);
    let client = client_for(&backend, Scopes::in_memory());

    let page = client.reconciler().load_page(Some("gone"), now()).await.unwrap();
    assert_eq!(
        page,
        ResultPage::NotFound {
            assessment_id: "gone".into()
        }
    );
    assert_eq!(backend.assess_calls(), 0);
}

#[tokio::test]
async fn status_failure_keeps_cached_result() {
    let backend = FakeBackend::new(Tier::Basic15);
    let scopes = Scopes::in_memory();
    let client = client_for(&backend, scopes.clone());

    client.intake().select_stage(Stage::Autonomo).await.unwrap();
    client.intake().submit(bar_input()).await.unwrap();
    let assess_calls = backend.assess_calls();

    backend.fail_status(true);
    let outcome = client.reconciler().refresh("fake-1").await;
    assert_eq!(
        outcome,
        RefreshOutcome::Stale {
            authority: None,
            reason: StaleReason::StatusUnavailable
        }
    );
    assert_eq!(backend.assess_calls(), assess_calls);

    match client.reconciler().load_page(None, now()).await.unwrap() {
        ResultPage::Ready { view, refreshed } => {
            assert!(!refreshed);
            assert_eq!(view.assessment_id.as_deref(), Some("fake-1"));
            assert!(!view.visible);
        }
        other => panic!("expected the cached page, got {other:?}"),
    }
}

#[tokio::test]
async fn tier_granted_elsewhere_is_picked_up() {
    let backend = FakeBackend::new(Tier::Basic15);
    backend.seed("a-42", bar_input(), Tier::Expert39);
    let scopes = Scopes::in_memory();
    scopes.store_input(&bar_input()).await.unwrap();
    let client = client_for(&backend, scopes.clone());

    let page = client.reconciler().load_page(Some("a-42"), now()).await.unwrap();
    let ResultPage::Ready { view, .. } = page else {
        panic!("expected a ready page, got {page:?}");
    };
    assert_eq!(view.unlocked_tier, Tier::Expert39);
    assert!(view.paid.and_then(|p| p.expert_pack).is_some());
    assert_eq!(scopes.durable.unlocked_tier("a-42").await.unwrap(), Some(Tier::Expert39));
}

#[tokio::test]
async fn checkout_failure_surfaces() {
    let backend = FakeBackend::new(Tier::Basic15);
    backend.fail_checkout(true);
    let scopes = Scopes::in_memory();
    scopes.remember_assessment_id("a-1").await.unwrap();
    let client = client_for(&backend, scopes);

    let err = client.payments().start_checkout(Tier::Basic15).await.unwrap_err();
    assert!(matches!(err, ClientError::Checkout(ApiError::Status { status: 502, .. })));
}

#[tokio::test]
async fn paid_session_without_assessment_is_unlinked() {
    let backend = FakeBackend::new(Tier::Basic15);
    backend.seed_session(
        "cs_orphan",
        PaymentStatus {
            paid: true,
            assessment_id: None,
            unlocked_tier: Tier::Basic15,
        },
    );
    let client = client_for(&backend, Scopes::in_memory());

    assert_eq!(
        client.payments().confirm_payment("cs_orphan").await.unwrap(),
        PaymentOutcome::PaidUnlinked
    );
}

#[tokio::test]
async fn report_download() {
    let backend = FakeBackend::new(Tier::Basic15);
    backend.seed("a-7", bar_input(), Tier::Basic15);
    let client = client_for(&backend, Scopes::in_memory());
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("report.pdf");

    let written = client.http().download_report("a-7", Some("user_1"), &dest).await.unwrap();
    assert_eq!(written, FAKE_PDF.len() as u64);
    assert_eq!(std::fs::read(&dest).unwrap(), FAKE_PDF);

    let err = client
        .http()
        .download_report("missing", None, &dir.path().join("missing.pdf"))
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn http_status_maps_to_api_errors() {
    let backend = FakeBackend::new(Tier::Basic15);
    let client = client_for(&backend, Scopes::in_memory());

    let err = client.http().assessment_status("nope").await.unwrap_err();
    assert!(err.is_not_found());

    backend.fail_status(true);
    let err = client.http().assessment_status("nope").await.unwrap_err();
    assert!(matches!(err, ApiError::Status { status: 500, .. }));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn failing_status_is_retried_once_then_stale() {
    let backend = FakeBackend::new(Tier::Basic15);
    let config = ClientConfig::new()
        .with_base_url(spawn_fake_backend(backend.clone()))
        .with_timeout_secs(5)
        .with_status_retry(1, 5)
        .with_session_idle_secs(60);
    let client = Client::with_durable_scope(&config, Arc::new(MemoryScope::new("durable"))).unwrap();

    client.intake().select_stage(Stage::Autonomo).await.unwrap();
    client.intake().submit(bar_input()).await.unwrap();
    assert_eq!(
        client.scopes().durable.assessment_id().await.unwrap().as_deref(),
        Some("fake-1")
    );

    let before = backend.status_calls();
    assert_eq!(client.reconciler().refresh("fake-1").await.label(), "refreshed");
    assert_eq!(backend.status_calls(), before + 1);

    backend.fail_status(true);
    let before = backend.status_calls();
    assert_eq!(client.reconciler().refresh("fake-1").await.label(), "stale");
    assert_eq!(backend.status_calls(), before + 2);
}
