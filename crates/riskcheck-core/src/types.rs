//! Assessment model
//!
//! Mirrors the JSON the scoring backend returns for `POST /compliance/assess`.
//! The client treats these values as read-only snapshots: it caches and
//! re-requests them but never edits scoring fields.
//!
//! Optional and list fields default when absent so that a trimmed free-tier
//! payload decodes into the same types as a fully unlocked one.

use crate::intake::Stage;
use crate::tier::Tier;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Finding severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational
    Info,
    /// Low
    Low,
    /// Medium
    Medium,
    /// High
    High,
    /// Anything the client does not know about
    #[serde(other)]
    Other,
}

impl Severity {
    /// Ordinal rank used for top-finding selection
    #[inline]
    #[must_use]
    pub fn rank(&self) -> u8 {
        match self {
            Severity::High => 3,
            Severity::Medium => 2,
            Severity::Low => 1,
            Severity::Info | Severity::Other => 0,
        }
    }
}

/// Overall risk band
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Green,
    Yellow,
    Orange,
    Red,
}

impl RiskLevel {
    /// Wire spelling
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Green => "green",
            RiskLevel::Yellow => "yellow",
            RiskLevel::Orange => "orange",
            RiskLevel::Red => "red",
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Three-step qualitative scale shared by confidence and explain difficulty
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Grade {
    Low,
    Medium,
    High,
}

/// Risk stage A (calm) through D (critical)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskStage {
    A,
    B,
    C,
    D,
}

/// A single flagged compliance risk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    /// Stable finding code, e.g. `INC_HIGH_AUTONOMO`
    pub code: String,
    /// Short title
    pub title: String,
    /// Explanation text
    #[serde(default)]
    pub detail: String,
    /// Severity
    pub severity: Severity,
    /// Legal reference, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legal_ref: Option<String>,
    /// Only meaningful to paying users
    #[serde(default)]
    pub pro_only: bool,
    /// How hard the finding is to explain to an inspector
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explain_difficulty: Option<Grade>,
    /// Sources that typically surface the finding (POS data, VAT filings, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger_sources: Option<Vec<String>>,
}

/// Consultant-style explanation of the risk score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskExplain {
    pub label: String,
    pub one_liner: String,
    pub stage_note: String,
    #[serde(default)]
    pub main_drivers: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_stage: Option<RiskStage>,
}

/// Whether the user should bring in a professional
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionGuidance {
    /// `no`, `consider`, `strongly_consider` or `yes`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub need_professional: Option<String>,
    #[serde(default)]
    pub suggested_roles: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// One week of the 30 day roadmap
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoadmapWeek {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub week: Option<String>,
    /// Tasks arrive either as a list or as a single string
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tasks: Option<serde_json::Value>,
}

/// Structured enforcement step provided by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnforcementStep {
    pub step: u32,
    pub title: String,
    pub description: String,
}

/// `expert_39` content of a decision summary
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExpertPack {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_groups: Option<BTreeMap<String, Vec<serde_json::Value>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roadmap_30d: Option<Vec<RoadmapWeek>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documents_pack: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub self_audit_checklist: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision_guidance: Option<DecisionGuidance>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cadence_90d: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score_breakdown: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enforcement_path: Option<Vec<EnforcementStep>>,
}

/// The backend's synthesized narrative and action plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionSummary {
    /// Decision level code, e.g. `RISK_AUTONOMO`
    pub level: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision_code: Option<String>,
    /// `REGISTER`, `FIX`, `UPGRADE` or `MONITOR`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision_intent: Option<String>,
    pub title: String,
    pub conclusion: String,
    pub confidence_level: Grade,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence_reason: Option<String>,
    #[serde(default)]
    pub next_review_window: String,
    /// Tier required to see the paid sections
    #[serde(default)]
    pub paywall: Tier,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pay_reason: Option<String>,
    #[serde(default)]
    pub top_risks: Vec<Finding>,
    #[serde(default)]
    pub reasons: Vec<String>,
    #[serde(default)]
    pub recommended_actions: Vec<String>,
    #[serde(default)]
    pub risk_if_ignore: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_explain: Option<RiskExplain>,
    #[serde(default)]
    pub dont_do: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expert_pack: Option<ExpertPack>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pro_brief: Option<serde_json::Value>,
}

impl DecisionSummary {
    /// True when every tier-gated list came back empty
    #[must_use]
    pub fn paid_content_empty(&self) -> bool {
        self.reasons.is_empty() && self.recommended_actions.is_empty() && self.risk_if_ignore.is_empty()
    }
}

/// Questionnaire answers submitted to `POST /compliance/assess`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentInput {
    pub stage: Stage,
    pub industry: String,
    pub monthly_income: f64,
    pub employee_count: u32,
    pub has_pos: bool,
    /// Yes/no signals keyed by signal code, in answer order
    #[serde(default)]
    pub signals: IndexMap<String, bool>,
}

impl AssessmentInput {
    /// Create input with no signals
    #[must_use]
    pub fn new(stage: Stage, industry: impl Into<String>, monthly_income: f64, employee_count: u32, has_pos: bool) -> Self {
        Self {
            stage,
            industry: industry.into(),
            monthly_income,
            employee_count,
            has_pos,
            signals: IndexMap::new(),
        }
    }

    /// With an extra signal
    #[must_use]
    pub fn with_signal(mut self, key: impl Into<String>, value: bool) -> Self {
        self.signals.insert(key.into(), value);
        self
    }
}

/// Echo of the submitted answers, as optionally returned inside a result
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InputEcho {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monthly_income: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub employee_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_pos: Option<bool>,
    #[serde(default)]
    pub signals: IndexMap<String, bool>,
}

impl From<&AssessmentInput> for InputEcho {
    fn from(input: &AssessmentInput) -> Self {
        Self {
            stage: Some(input.stage.as_str().to_string()),
            industry: Some(input.industry.clone()),
            monthly_income: Some(input.monthly_income),
            employee_count: Some(input.employee_count),
            has_pos: Some(input.has_pos),
            signals: input.signals.clone(),
        }
    }
}

/// One server-computed risk evaluation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentResult {
    /// Server-issued assessment id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<InputEcho>,
    pub risk_score: f64,
    pub risk_level: RiskLevel,
    #[serde(default)]
    pub findings: Vec<Finding>,
    pub decision_summary: DecisionSummary,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<serde_json::Value>,
}

impl AssessmentResult {
    /// Tier the backend requires for the paid sections
    #[inline]
    #[must_use]
    pub fn required_tier(&self) -> Tier {
        self.decision_summary.paywall
    }
}

/// Response of `GET /compliance/assessments/{id}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assessment_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default)]
    pub unlocked_tier: Tier,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stripe_session_id: Option<String>,
}

/// Body of `POST /stripe/create-checkout-session`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub tier: Tier,
    pub assessment_id: String,
    pub user_id: String,
}

/// Response of `POST /stripe/create-checkout-session`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub checkout_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

/// Response of `GET /payment/status`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentStatus {
    pub paid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assessment_id: Option<String>,
    #[serde(default)]
    pub unlocked_tier: Tier,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_free_tier_payload() {
        let raw = r#"{
            "id": "a-1",
            "risk_score": 62,
            "risk_level": "orange",
            "findings": [
                {"code": "POS_TRACKABLE", "title": "POS", "detail": "d", "severity": "medium"},
                {"code": "X", "title": "Y", "severity": "critical"}
            ],
            "decision_summary": {
                "level": "RISK_AUTONOMO",
                "title": "Fix the paper trail",
                "conclusion": "c",
                "confidence_level": "medium",
                "next_review_window": "30 days",
                "paywall": "basic_15",
                "reasons": [],
                "recommended_actions": [],
                "risk_if_ignore": []
            }
        }"#;
        let result: AssessmentResult = serde_json::from_str(raw).unwrap();
        assert_eq!(result.id.as_deref(), Some("a-1"));
        assert_eq!(result.required_tier(), Tier::Basic15);
        assert_eq!(result.findings[1].severity, Severity::Other);
        assert!(result.findings[1].detail.is_empty());
        assert!(result.decision_summary.paid_content_empty());
    }

    #[test]
    fn severity_rank_order() {
        assert!(Severity::High.rank() > Severity::Medium.rank());
        assert!(Severity::Medium.rank() > Severity::Low.rank());
        assert_eq!(Severity::Info.rank(), Severity::Other.rank());
    }

    #[test]
    fn input_keeps_signal_order() {
        let input = AssessmentInput::new(Stage::Autonomo, "bar", 2000.0, 1, true)
            .with_signal("serves_alcohol", true)
            .with_signal("has_terrace", false);
        let json = serde_json::to_string(&input).unwrap();
        assert!(json.find("serves_alcohol").unwrap() < json.find("has_terrace").unwrap());
        assert!(json.contains("\"stage\":\"AUTONOMO\""));
    }
}
