//! In-process fake of the compliance and payment backend
//!
//! Serves the `/api/v1` routes the client consumes on an ephemeral local port.
//! State is inspectable and steerable from tests: mark sessions as paid, make
//! the status endpoint fail, count calls.

use crate::{record, result_for};
use parking_lot::Mutex;
use riskcheck_core::{AssessmentInput, CheckoutRequest, PaymentStatus, Tier};
use serde_json::json;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use warp::http::StatusCode;
use warp::reply::Response;
use warp::{Filter, Reply};

/// Bytes served for every report download
pub const FAKE_PDF: &[u8] = b"%PDF-1.4\n% fake report\n%%EOF\n";

#[derive(Debug, Clone)]
struct StoredAssessment {
    input: AssessmentInput,
    unlocked: Tier,
}

/// Shared state of the fake backend
#[derive(Debug)]
pub struct FakeBackend {
    paywall: Tier,
    assessments: Mutex<HashMap<String, StoredAssessment>>,
    sessions: Mutex<HashMap<String, PaymentStatus>>,
    checkout_requests: Mutex<Vec<CheckoutRequest>>,
    next_id: AtomicUsize,
    assess_calls: AtomicUsize,
    status_calls: AtomicUsize,
    fail_status: AtomicBool,
    fail_checkout: AtomicBool,
}

impl FakeBackend {
    /// Backend whose assessments all require `paywall`
    pub fn new(paywall: Tier) -> Arc<Self> {
        Arc::new(Self {
            paywall,
            assessments: Mutex::new(HashMap::new()),
            sessions: Mutex::new(HashMap::new()),
            checkout_requests: Mutex::new(Vec::new()),
            next_id: AtomicUsize::new(1),
            assess_calls: AtomicUsize::new(0),
            status_calls: AtomicUsize::new(0),
            fail_status: AtomicBool::new(false),
            fail_checkout: AtomicBool::new(false),
        })
    }

    /// Register an assessment without going through `/assess`
    pub fn seed(&self, id: &str, input: AssessmentInput, unlocked: Tier) {
        self.assessments
            .lock()
            .insert(id.to_string(), StoredAssessment { input, unlocked });
    }

    /// Unlock tier the backend holds for `id`
    pub fn unlocked_tier(&self, id: &str) -> Option<Tier> {
        self.assessments.lock().get(id).map(|a| a.unlocked)
    }

    /// Questionnaire last submitted for `id`
    pub fn submitted_input(&self, id: &str) -> Option<AssessmentInput> {
        self.assessments.lock().get(id).map(|a| a.input.clone())
    }

    /// Set the unlock tier directly, as a completed webhook would
    pub fn set_unlocked(&self, id: &str, tier: Tier) {
        if let Some(assessment) = self.assessments.lock().get_mut(id) {
            assessment.unlocked = tier;
        }
    }

    /// Mark a checkout session paid and unlock its assessment
    pub fn complete_payment(&self, session_id: &str) {
        let mut sessions = self.sessions.lock();
        if let Some(status) = sessions.get_mut(session_id) {
            status.paid = true;
            if let Some(id) = status.assessment_id.clone() {
                self.set_unlocked(&id, status.unlocked_tier);
            }
        }
    }

    /// Register a session directly with the given status
    pub fn seed_session(&self, session_id: &str, status: PaymentStatus) {
        self.sessions.lock().insert(session_id.to_string(), status);
    }

    /// Make `GET /compliance/assessments/{id}` answer 500
    pub fn fail_status(&self, fail: bool) {
        self.fail_status.store(fail, Ordering::SeqCst);
    }

    /// Make checkout session creation answer 502
    pub fn fail_checkout(&self, fail: bool) {
        self.fail_checkout.store(fail, Ordering::SeqCst);
    }

    pub fn assess_calls(&self) -> usize {
        self.assess_calls.load(Ordering::SeqCst)
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub fn checkout_requests(&self) -> Vec<CheckoutRequest> {
        self.checkout_requests.lock().clone()
    }

    fn assess(&self, query: &HashMap<String, String>, input: AssessmentInput) -> Response {
        self.assess_calls.fetch_add(1, Ordering::SeqCst);
        let mut assessments = self.assessments.lock();

        let id = match query.get("assessment_id").filter(|id| !id.is_empty()) {
            Some(id) if assessments.contains_key(id) => id.clone(),
            Some(_) => return not_found(),
            None => format!("fake-{}", self.next_id.fetch_add(1, Ordering::SeqCst)),
        };
        let unlocked = assessments.get(&id).map_or(Tier::None, |a| a.unlocked);
        assessments.insert(
            id.clone(),
            StoredAssessment {
                input: input.clone(),
                unlocked,
            },
        );

        warp::reply::json(&result_for(&id, &input, self.paywall, unlocked)).into_response()
    }

    fn status(&self, id: &str) -> Response {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_status.load(Ordering::SeqCst) {
            return error(StatusCode::INTERNAL_SERVER_ERROR, "status backend down");
        }
        match self.assessments.lock().get(id) {
            Some(assessment) => warp::reply::json(&record(id, assessment.unlocked)).into_response(),
            None => not_found(),
        }
    }

    fn checkout(&self, request: CheckoutRequest) -> Response {
        if self.fail_checkout.load(Ordering::SeqCst) {
            return error(StatusCode::BAD_GATEWAY, "payment provider unavailable");
        }
        let mut requests = self.checkout_requests.lock();
        let session_id = format!("cs_test_{}", requests.len() + 1);
        self.sessions.lock().insert(
            session_id.clone(),
            PaymentStatus {
                paid: false,
                assessment_id: Some(request.assessment_id.clone()),
                unlocked_tier: request.tier,
            },
        );
        requests.push(request);
        warp::reply::json(&json!({
            "checkout_url": format!("https://checkout.test/pay/{session_id}"),
            "session_id": session_id,
        }))
        .into_response()
    }

    fn payment_status(&self, query: &HashMap<String, String>) -> Response {
        let sessions = self.sessions.lock();
        match query.get("session_id").and_then(|sid| sessions.get(sid)) {
            Some(status) => warp::reply::json(status).into_response(),
            None => warp::reply::json(&PaymentStatus {
                paid: false,
                assessment_id: None,
                unlocked_tier: Tier::None,
            })
            .into_response(),
        }
    }

    fn report(&self, id: &str) -> Response {
        if !self.assessments.lock().contains_key(id) {
            return not_found();
        }
        warp::reply::with_header(FAKE_PDF.to_vec(), "content-type", "application/pdf").into_response()
    }
}

fn error(status: StatusCode, message: &str) -> Response {
    warp::reply::with_status(warp::reply::json(&json!({ "detail": message })), status).into_response()
}

fn not_found() -> Response {
    error(StatusCode::NOT_FOUND, "Assessment not found")
}

/// Routes of the fake backend
pub fn routes(
    backend: Arc<FakeBackend>,
) -> impl Filter<Extract = (Response,), Error = warp::Rejection> + Clone + Send + Sync + 'static {
    let with_backend = warp::any().map(move || backend.clone());

    let assess = warp::path!("api" / "v1" / "compliance" / "assess")
        .and(warp::post())
        .and(warp::query::<HashMap<String, String>>())
        .and(warp::body::json())
        .and(with_backend.clone())
        .map(|query: HashMap<String, String>, input: AssessmentInput, backend: Arc<FakeBackend>| {
            backend.assess(&query, input)
        });

    let status = warp::path!("api" / "v1" / "compliance" / "assessments" / String)
        .and(warp::get())
        .and(with_backend.clone())
        .map(|id: String, backend: Arc<FakeBackend>| backend.status(&id));

    let checkout = warp::path!("api" / "v1" / "stripe" / "create-checkout-session")
        .and(warp::post())
        .and(warp::body::json())
        .and(with_backend.clone())
        .map(|request: CheckoutRequest, backend: Arc<FakeBackend>| backend.checkout(request));

    let payment = warp::path!("api" / "v1" / "payment" / "status")
        .and(warp::get())
        .and(warp::query::<HashMap<String, String>>())
        .and(with_backend.clone())
        .map(|query: HashMap<String, String>, backend: Arc<FakeBackend>| backend.payment_status(&query));

    let report = warp::path!("api" / "v1" / "assessments" / String / "report.pdf")
        .and(warp::get())
        .and(with_backend)
        .map(|id: String, backend: Arc<FakeBackend>| backend.report(&id));

    assess
        .or(status)
        .unify()
        .or(checkout)
        .unify()
        .or(payment)
        .unify()
        .or(report)
        .unify()
}

/// Serve `backend` on an ephemeral port; returns the base URL
pub fn spawn_fake_backend(backend: Arc<FakeBackend>) -> String {
    let (addr, server): (SocketAddr, _) = warp::serve(routes(backend)).bind_ephemeral(([127, 0, 0, 1], 0));
    tokio::spawn(server);
    format!("http://{addr}")
}

