//! Result view model
//!
//! Pure derivations over an [`AssessmentResult`]: which finding leads, the
//! three plain-language reasons, the time-bucketed action plan, the enforcement
//! narrative and the key finding. Nothing here mutates the source result; every
//! field of [`ResultView`] is recomputed from scratch on each call.

use crate::expiry;
use crate::gate::{self, PriceCard};
use crate::labels;
use crate::rules::{ActionRules, Bucket};
use crate::tier::Tier;
use crate::types::{AssessmentResult, ExpertPack, Finding, InputEcho, RiskLevel, Severity};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Highest-severity finding; the earliest one wins ties
#[must_use]
pub fn top_finding(findings: &[Finding]) -> Option<&Finding> {
    let mut best: Option<&Finding> = None;
    for finding in findings {
        match best {
            Some(current) if finding.severity.rank() <= current.severity.rank() => {}
            _ => best = Some(finding),
        }
    }
    best
}

/// Code fragment and title keywords for each key-finding priority, highest first
const KEY_PRIORITIES: &[(&str, &[&str])] = &[
    ("INC_HIGH", &["收入", "Income", "income"]),
    ("EMP_REQUIRED", &["用工", "Staff", "staff", "Employ", "employ"]),
    ("POS_TRACKABLE", &["POS"]),
    ("COMBO", &["组合", "Combination", "combination"]),
];

fn matches_priority(finding: &Finding, code: &str, keywords: &[&str]) -> bool {
    finding.code.contains(code) || keywords.iter().any(|kw| finding.title.contains(kw))
}

/// Finding to headline the result with
///
/// Priority findings (income, staffing, POS, combination) are looked up in the
/// top risks first and then in all findings. Without one, the first high
/// severity finding is used, then the first top risk.
#[must_use]
pub fn key_finding<'a>(findings: &'a [Finding], top_risks: &'a [Finding]) -> Option<&'a Finding> {
    for source in [top_risks, findings] {
        for (code, keywords) in KEY_PRIORITIES {
            if let Some(found) = source.iter().find(|f| matches_priority(f, code, keywords)) {
                return Some(found);
            }
        }
    }

    top_risks
        .iter()
        .find(|f| f.severity == Severity::High)
        .or_else(|| findings.iter().find(|f| f.severity == Severity::High))
        .or_else(|| top_risks.first())
}

/// Format a number without a trailing `.0` when it is integral
fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.0}")
    } else {
        format!("{value}")
    }
}

/// Inputs to [`human_reasons`]
#[derive(Debug, Clone, Copy)]
pub struct ReasonInputs<'a> {
    pub decision_title: &'a str,
    pub top_finding_title: Option<&'a str>,
    pub input: Option<&'a InputEcho>,
    pub risk_score: f64,
    pub risk_level: RiskLevel,
}

/// Exactly three plain-language sentences explaining the result
#[must_use]
pub fn human_reasons(params: &ReasonInputs<'_>) -> [String; 3] {
    let first = format!(
        "Your current conclusion is \"{}\" with a risk score of {} ({}): your business is easy to trace but hard to explain.",
        params.decision_title,
        format_number(params.risk_score),
        params.risk_level,
    );

    let second = match params.top_finding_title {
        Some(title) => format!(
            "The key trigger is \"{title}\": issues like this are quickly matched against POS records, VAT filings, consumer complaints or municipal inspections."
        ),
        None => "The key trigger is usually income that does not line up with invoices, filings or staffing records, which POS data checks, VAT records or consumer complaints can surface.".to_string(),
    };

    let mut parts = Vec::new();
    if let Some(input) = params.input {
        if let Some(income) = input.monthly_income.filter(|v| *v != 0.0) {
            parts.push(format!("monthly income about €{}", format_number(income)));
        }
        if let Some(employees) = input.employee_count {
            parts.push(format!("employees {employees}"));
        }
        if let Some(industry) = input.industry.as_deref().filter(|s| !s.is_empty()) {
            parts.push(format!("industry: {industry}"));
        }
        if let Some(stage) = input.stage.as_deref().filter(|s| !s.is_empty()) {
            parts.push(format!("stage: {stage}"));
        }
    }

    let mut third = "What you need now is not an explanation but a complete paper trail (invoices → bookkeeping → filings → staffing and contracts).".to_string();
    if !parts.is_empty() {
        third.push_str(&format!(" (Current input: {})", parts.join(", ")));
    }

    [first, second, third]
}

/// Actions grouped by urgency
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ActionBuckets {
    pub immediate: Vec<String>,
    pub near_term: Vec<String>,
    pub long_term: Vec<String>,
}

impl ActionBuckets {
    /// Items in one bucket
    #[must_use]
    pub fn get(&self, bucket: Bucket) -> &[String] {
        match bucket {
            Bucket::Immediate => &self.immediate,
            Bucket::NearTerm => &self.near_term,
            Bucket::LongTerm => &self.long_term,
        }
    }

    fn get_mut(&mut self, bucket: Bucket) -> &mut Vec<String> {
        match bucket {
            Bucket::Immediate => &mut self.immediate,
            Bucket::NearTerm => &mut self.near_term,
            Bucket::LongTerm => &mut self.long_term,
        }
    }

    /// Item count across all buckets
    #[must_use]
    pub fn total(&self) -> usize {
        self.immediate.len() + self.near_term.len() + self.long_term.len()
    }

    /// Whether every bucket is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

const BUCKET_ORDER: [Bucket; 3] = [Bucket::Immediate, Bucket::NearTerm, Bucket::LongTerm];

/// Route each distinct non-blank action into exactly one bucket, without
/// backfill or caps
#[must_use]
pub fn route_actions(actions: &[String], rules: &ActionRules) -> ActionBuckets {
    let mut buckets = ActionBuckets::default();
    for action in actions.iter().filter(|a| !a.trim().is_empty()) {
        let target = buckets.get_mut(rules.classify(action));
        if !target.contains(action) {
            target.push(action.clone());
        }
    }
    buckets
}

/// Route actions, backfill empty buckets and apply display caps
///
/// An empty bucket takes the raw action at its own position (first, second,
/// third) when the list is long enough and that action is not blank, so a
/// short plan never shows an empty column.
#[must_use]
pub fn bucketize_actions(actions: &[String], rules: &ActionRules) -> ActionBuckets {
    let mut buckets = route_actions(actions, rules);

    for (position, bucket) in BUCKET_ORDER.into_iter().enumerate() {
        if let Some(action) = actions.get(position).filter(|a| !a.trim().is_empty()) {
            let target = buckets.get_mut(bucket);
            if target.is_empty() {
                target.push(action.clone());
            }
        }
    }

    for bucket in BUCKET_ORDER {
        buckets.get_mut(bucket).truncate(bucket.cap());
    }
    buckets
}

/// Fixed detection, notice, escalation narrative
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnforcementNarrative {
    pub steps: [String; 3],
    /// Up to three consequences
    pub consequences: Vec<String>,
}

impl EnforcementNarrative {
    /// Consequences as a bulleted block
    #[must_use]
    pub fn consequences_text(&self) -> String {
        let mut out = String::from("Most likely consequences for you:");
        for item in &self.consequences {
            out.push_str("\n- ");
            out.push_str(item);
        }
        out
    }
}

const DEFAULT_CONSEQUENCES: [&str; 3] = [
    "Back taxes or supplementary filings",
    "Fines and late-payment interest",
    "More frequent follow-up reviews",
];

/// Assemble the enforcement narrative
#[must_use]
pub fn enforcement_path(risk_if_ignore: &[String], top_finding_title: Option<&str>) -> EnforcementNarrative {
    let focus = match top_finding_title {
        Some(title) => format!("around \"{title}\""),
        None => "income versus invoices".to_string(),
    };

    let steps = [
        format!(
            "1) Lead: tax office leads usually come from POS data checks, VAT/IRPF filings, consumer complaints or municipal inspections (especially {focus})."
        ),
        "2) Action: a notice or request for documents (invoices, books, contracts, payroll and social security, payment receipts). If the explanation does not close the loop, you are asked to file supplementary or corrected returns.".to_string(),
        "3) Escalation: the usual outcome is back taxes plus fines plus late interest, possibly followed by more frequent reviews.".to_string(),
    ];

    let consequences = if risk_if_ignore.is_empty() {
        DEFAULT_CONSEQUENCES.iter().map(|s| (*s).to_string()).collect()
    } else {
        risk_if_ignore.iter().take(3).cloned().collect()
    };

    EnforcementNarrative { steps, consequences }
}

/// A finding as rendered, with its detail masked when gated
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FindingView {
    pub code: String,
    pub title: String,
    pub detail: String,
    pub severity: Severity,
    pub masked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub legal_ref: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explain_difficulty: Option<&'static str>,
}

impl FindingView {
    fn new(finding: &Finding, required: Tier, unlocked: Tier) -> Self {
        Self {
            code: finding.code.clone(),
            title: finding.title.clone(),
            detail: gate::visible_detail(finding, required, unlocked).to_string(),
            severity: finding.severity,
            masked: gate::hides_detail(finding, required, unlocked),
            legal_ref: finding.legal_ref.clone(),
            explain_difficulty: finding.explain_difficulty.map(labels::explain_difficulty_label),
        }
    }
}

/// Sections only rendered once the required tier is unlocked
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaidSections {
    pub human_reasons: [String; 3],
    pub reasons: Vec<String>,
    pub actions: ActionBuckets,
    pub enforcement: EnforcementNarrative,
    pub dont_do: Vec<String>,
    /// Present only at `expert_39`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expert_pack: Option<ExpertPack>,
}

/// Unlock and freshness context for assembling a view
#[derive(Debug, Clone)]
pub struct ViewContext {
    pub unlocked: Tier,
    pub created_at: Option<String>,
    pub now: DateTime<Utc>,
    pub reevaluate_after_days: i64,
}

impl ViewContext {
    /// Context at `now` with the default re-evaluation threshold
    #[must_use]
    pub fn new(unlocked: Tier, now: DateTime<Utc>) -> Self {
        Self {
            unlocked,
            created_at: None,
            now,
            reevaluate_after_days: expiry::REEVALUATE_AFTER_DAYS,
        }
    }

    /// With the assessment creation timestamp
    #[must_use]
    pub fn with_created_at(mut self, created_at: Option<String>) -> Self {
        self.created_at = created_at;
        self
    }

    /// With a custom re-evaluation threshold
    #[must_use]
    pub fn with_threshold(mut self, days: i64) -> Self {
        self.reevaluate_after_days = days;
        self
    }
}

/// Render-ready result page
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultView {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assessment_id: Option<String>,
    pub risk_score: f64,
    pub risk_level: RiskLevel,
    pub risk_label: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk_stage_label: Option<&'static str>,
    pub title: String,
    pub conclusion: String,
    pub confidence: &'static str,
    pub next_review_window: String,
    pub required_tier: Tier,
    pub unlocked_tier: Tier,
    pub visible: bool,
    /// Upsell shown in place of the paid sections
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upsell: Option<PriceCard>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_finding: Option<FindingView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_finding: Option<FindingView>,
    pub findings: Vec<FindingView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paid: Option<PaidSections>,
    pub expired: bool,
    pub assessed_on: String,
}

impl ResultView {
    /// Assemble the page for `result` under `ctx`
    #[must_use]
    pub fn assemble(result: &AssessmentResult, ctx: &ViewContext, rules: &ActionRules) -> Self {
        let decision = &result.decision_summary;
        let required = decision.paywall;
        let unlocked = ctx.unlocked;
        let visible = gate::is_visible(required, unlocked);

        let top = top_finding(&result.findings);
        let key = key_finding(&result.findings, &decision.top_risks);

        let paid = visible.then(|| PaidSections {
            human_reasons: human_reasons(&ReasonInputs {
                decision_title: &decision.title,
                top_finding_title: top.map(|f| f.title.as_str()),
                input: result.input.as_ref(),
                risk_score: result.risk_score,
                risk_level: result.risk_level,
            }),
            reasons: decision.reasons.clone(),
            actions: bucketize_actions(&decision.recommended_actions, rules),
            enforcement: enforcement_path(&decision.risk_if_ignore, top.map(|f| f.title.as_str())),
            dont_do: decision.dont_do.clone(),
            expert_pack: if unlocked.satisfies(Tier::Expert39) {
                decision.expert_pack.clone()
            } else {
                None
            },
        });

        Self {
            assessment_id: result.id.clone(),
            risk_score: result.risk_score,
            risk_level: result.risk_level,
            risk_label: labels::risk_level_label(result.risk_level),
            risk_stage_label: decision
                .risk_explain
                .as_ref()
                .and_then(|e| e.risk_stage)
                .map(labels::risk_stage_label),
            title: decision.title.clone(),
            conclusion: decision.conclusion.clone(),
            confidence: labels::confidence_label(decision.confidence_level),
            next_review_window: decision.next_review_window.clone(),
            required_tier: required,
            unlocked_tier: unlocked,
            visible,
            upsell: if visible { None } else { gate::price_card(required) },
            top_finding: top.map(|f| FindingView::new(f, required, unlocked)),
            key_finding: key.map(|f| FindingView::new(f, required, unlocked)),
            findings: result
                .findings
                .iter()
                .map(|f| FindingView::new(f, required, unlocked))
                .collect(),
            paid,
            expired: expiry::is_expired(ctx.created_at.as_deref(), ctx.now, ctx.reevaluate_after_days),
            assessed_on: expiry::display_date(ctx.created_at.as_deref()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn finding(code: &str, title: &str, severity: Severity) -> Finding {
        Finding {
            code: code.into(),
            title: title.into(),
            detail: String::new(),
            severity,
            legal_ref: None,
            pro_only: false,
            explain_difficulty: None,
            trigger_sources: None,
        }
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn top_finding_prefers_severity_then_order() {
        let findings = vec![
            finding("A", "a", Severity::Low),
            finding("B", "b", Severity::High),
            finding("C", "c", Severity::Medium),
            finding("D", "d", Severity::High),
        ];
        assert_eq!(top_finding(&findings).unwrap().code, "B");
        assert!(top_finding(&[]).is_none());

        let infos = vec![finding("I", "i", Severity::Info), finding("O", "o", Severity::Other)];
        assert_eq!(top_finding(&infos).unwrap().code, "I");
    }

    #[test]
    fn key_finding_priority_order() {
        let top_risks = vec![
            finding("POS_TRACKABLE_X", "Card terminal", Severity::Medium),
            finding("EMP_REQUIRED_X", "Hiring", Severity::Low),
        ];
        // staffing outranks POS even though POS is listed first
        assert_eq!(key_finding(&[], &top_risks).unwrap().code, "EMP_REQUIRED_X");

        let findings = vec![finding("X", "Monthly income above threshold", Severity::Low)];
        let plain = vec![finding("Y", "Other", Severity::Low)];
        // top risks searched before findings, but a priority match in findings beats a plain top risk
        assert_eq!(key_finding(&findings, &plain).unwrap().code, "X");
    }

    #[test]
    fn key_finding_fallbacks() {
        let top_risks = vec![finding("A", "a", Severity::Low), finding("B", "b", Severity::Medium)];
        let findings = vec![finding("C", "c", Severity::High)];
        assert_eq!(key_finding(&findings, &top_risks).unwrap().code, "C");
        assert_eq!(key_finding(&[], &top_risks).unwrap().code, "A");
        assert!(key_finding(&[], &[]).is_none());
    }

    #[test]
    fn human_reasons_drop_missing_clauses() {
        let echo = InputEcho {
            industry: Some("bar".into()),
            monthly_income: Some(2000.0),
            employee_count: Some(0),
            ..InputEcho::default()
        };
        let reasons = human_reasons(&ReasonInputs {
            decision_title: "Fix the paper trail",
            top_finding_title: Some("POS records"),
            input: Some(&echo),
            risk_score: 62.0,
            risk_level: RiskLevel::Orange,
        });
        assert_eq!(reasons.len(), 3);
        assert!(reasons[0].contains("risk score of 62 (orange)"));
        assert!(reasons[1].contains("\"POS records\""));
        assert!(reasons[2].ends_with("(Current input: monthly income about €2000, employees 0, industry: bar)"));

        let bare = human_reasons(&ReasonInputs {
            decision_title: "t",
            top_finding_title: None,
            input: None,
            risk_score: 10.5,
            risk_level: RiskLevel::Green,
        });
        assert!(bare[0].contains("10.5"));
        assert!(bare[1].starts_with("The key trigger is usually"));
        assert!(!bare[2].contains("Current input"));
    }

    #[test]
    fn zero_income_is_treated_as_absent() {
        let echo = InputEcho {
            monthly_income: Some(0.0),
            ..InputEcho::default()
        };
        let reasons = human_reasons(&ReasonInputs {
            decision_title: "t",
            top_finding_title: None,
            input: Some(&echo),
            risk_score: 1.0,
            risk_level: RiskLevel::Green,
        });
        assert!(!reasons[2].contains("income"));
    }

    #[test]
    fn backfill_example() {
        let actions = strings(&["Download invoices", "Book an appointment", "Set up monthly payroll"]);
        let buckets = bucketize_actions(&actions, ActionRules::builtin());
        assert_eq!(buckets.immediate, strings(&["Download invoices"]));
        assert_eq!(buckets.near_term, strings(&["Book an appointment"]));
        assert_eq!(buckets.long_term, strings(&["Set up monthly payroll"]));
    }

    #[test]
    fn empty_buckets_backfill_positionally() {
        let actions = strings(&["Download A", "Download B", "Download C"]);
        let buckets = bucketize_actions(&actions, ActionRules::builtin());
        assert_eq!(buckets.immediate, actions);
        assert_eq!(buckets.near_term, strings(&["Download B"]));
        assert_eq!(buckets.long_term, strings(&["Download C"]));
    }

    #[test]
    fn blank_actions_are_not_backfilled() {
        let actions = strings(&["Download invoices", "  ", ""]);
        let buckets = bucketize_actions(&actions, ActionRules::builtin());
        assert_eq!(buckets.immediate, strings(&["Download invoices"]));
        assert!(buckets.near_term.is_empty());
        assert!(buckets.long_term.is_empty());
        assert_eq!(buckets.total(), 1);
    }

    #[test]
    fn caps_and_dedup() {
        let actions: Vec<String> = (0..10).map(|i| format!("Check item {i}")).chain(["Check item 0".to_string()]).collect();
        let routed = route_actions(&actions, ActionRules::builtin());
        assert_eq!(routed.immediate.len(), 10);

        let buckets = bucketize_actions(&actions, ActionRules::builtin());
        assert_eq!(buckets.immediate.len(), 4);
        assert!(bucketize_actions(&[], ActionRules::builtin()).is_empty());
    }

    #[test]
    fn enforcement_narrative() {
        let narrative = enforcement_path(&strings(&["a", "b", "c", "d"]), Some("Undeclared income"));
        assert!(narrative.steps[0].contains("around \"Undeclared income\""));
        assert_eq!(narrative.consequences, strings(&["a", "b", "c"]));

        let default = enforcement_path(&[], None);
        assert!(default.steps[0].contains("income versus invoices"));
        assert_eq!(default.consequences.len(), 3);
        assert!(default.consequences_text().starts_with("Most likely consequences for you:\n- Back taxes"));
    }
}
