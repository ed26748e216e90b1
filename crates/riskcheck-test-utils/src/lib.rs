//! Testing utilities for the riskcheck workspace
//!
//! Shared fixtures and a fake compliance backend.

#![allow(missing_docs)]

pub mod fake_backend;

use riskcheck_core::{AssessmentInput, AssessmentRecord, AssessmentResult, InputEcho, Stage, Tier};
use serde_json::json;

pub use fake_backend::{spawn_fake_backend, FakeBackend, FAKE_PDF};

/// Creation timestamp used by every fixture, naive like the backend emits it
pub const FIXTURE_CREATED_AT: &str = "2024-05-20T10:00:00";

/// The bar questionnaire from the end-to-end scenario
pub fn bar_input() -> AssessmentInput {
    AssessmentInput::new(Stage::Autonomo, "bar", 2000.0, 1, true).with_signal("serves_alcohol", true)
}

/// Result as the backend returns it for `input`
///
/// Paid lists are only filled in when `unlocked` satisfies `paywall`, the way
/// the backend trims responses for locked assessments.
pub fn result_for(id: &str, input: &AssessmentInput, paywall: Tier, unlocked: Tier) -> AssessmentResult {
    let paid = unlocked.satisfies(paywall);
    let expert = unlocked.satisfies(Tier::Expert39);
    let list = |items: &[&str]| if paid { json!(items) } else { json!([]) };

    let mut value = json!({
        "id": id,
        "input": InputEcho::from(input),
        "risk_score": 62,
        "risk_level": "orange",
        "findings": [
            {"code": "RECEIPTS_LOOSE", "title": "Receipts kept loosely", "severity": "low",
             "detail": "Paper receipts are not archived"},
            {"code": "POS_TRACKABLE", "title": "POS income is fully traceable", "severity": "high",
             "detail": "Card terminals report every sale", "pro_only": true, "explain_difficulty": "high"},
            {"code": "EMP_REQUIRED", "title": "Staff without contracts", "severity": "medium",
             "detail": "Helpers must be registered"}
        ],
        "decision_summary": {
            "level": "RISK_AUTONOMO",
            "decision_intent": "FIX",
            "title": "Fix the paper trail first",
            "conclusion": "Traceable income without matching books",
            "confidence_level": "medium",
            "next_review_window": "30 days",
            "paywall": paywall.as_str(),
            "top_risks": [
                {"code": "POS_TRACKABLE", "title": "POS income is fully traceable", "severity": "high"}
            ],
            "reasons": list(&["POS totals exceed declared income"]),
            "recommended_actions": list(&["Download invoices", "Book an appointment", "Set up monthly payroll"]),
            "risk_if_ignore": list(&["Back taxes", "Fines"]),
            "dont_do": list(&["Do not delete POS history"])
        },
        "meta": {"engine": "fake"}
    });

    if expert {
        value["decision_summary"]["expert_pack"] = json!({
            "documents_pack": ["Invoices", "Bank statements"],
            "decision_guidance": {"need_professional": "consider", "suggested_roles": ["gestor"]}
        });
    }

    match serde_json::from_value(value) {
        Ok(result) => result,
        Err(e) => panic!("fixture result must decode: {e}"),
    }
}

/// Bar scenario result with the default `basic_15` paywall
pub fn bar_result(id: &str, unlocked: Tier) -> AssessmentResult {
    result_for(id, &bar_input(), Tier::Basic15, unlocked)
}

/// Authority record for `id`
pub fn record(id: &str, unlocked: Tier) -> AssessmentRecord {
    AssessmentRecord {
        assessment_id: Some(id.to_string()),
        user_id: None,
        unlocked_tier: unlocked,
        created_at: Some(FIXTURE_CREATED_AT.to_string()),
        stripe_session_id: None,
    }
}
