//! Plain-text rendering of result pages

use riskcheck_core::labels::guidance_label;
use riskcheck_core::{Bucket, FindingView, PaidSections, ResultView, Severity};
use std::fmt::Write;

fn severity_tag(severity: Severity) -> &'static str {
    match severity {
        Severity::High => "high",
        Severity::Medium => "medium",
        Severity::Low => "low",
        Severity::Info => "info",
        Severity::Other => "-",
    }
}

fn finding_line(out: &mut String, finding: &FindingView) {
    let _ = write!(out, "  - [{}] {}", severity_tag(finding.severity), finding.title);
    if finding.masked {
        out.push_str(" (unlock to see details)");
    } else if !finding.detail.is_empty() {
        let _ = write!(out, ": {}", finding.detail);
    }
    out.push('\n');
    if let Some(legal_ref) = finding.legal_ref.as_deref().filter(|_| !finding.masked) {
        let _ = writeln!(out, "      ref: {legal_ref}");
    }
    if let Some(difficulty) = finding.explain_difficulty {
        let _ = writeln!(out, "      {difficulty}");
    }
}

fn paid_sections(out: &mut String, paid: &PaidSections) {
    out.push_str("\nWhy this result:\n");
    for (i, reason) in paid.human_reasons.iter().enumerate() {
        let _ = writeln!(out, "  {}. {reason}", i + 1);
    }

    if !paid.actions.is_empty() {
        out.push_str("\nWhat to do:\n");
        for bucket in [Bucket::Immediate, Bucket::NearTerm, Bucket::LongTerm] {
            let actions = paid.actions.get(bucket);
            if actions.is_empty() {
                continue;
            }
            let _ = writeln!(out, "  {}:", bucket.heading());
            for action in actions {
                let _ = writeln!(out, "    - {action}");
            }
        }
    }

    out.push_str("\nIf you ignore this:\n");
    for (i, step) in paid.enforcement.steps.iter().enumerate() {
        let _ = writeln!(out, "  {}. {step}", i + 1);
    }
    let _ = writeln!(out, "{}", paid.enforcement.consequences_text());

    if !paid.dont_do.is_empty() {
        out.push_str("\nDo not:\n");
        for item in &paid.dont_do {
            let _ = writeln!(out, "  - {item}");
        }
    }

    if let Some(pack) = &paid.expert_pack {
        out.push_str("\nDecision pack:\n");
        if let Some(documents) = pack.documents_pack.as_deref().filter(|d| !d.is_empty()) {
            let _ = writeln!(out, "  Documents to prepare: {}", documents.join(", "));
        }
        if let Some(guidance) = &pack.decision_guidance {
            let _ = writeln!(
                out,
                "  Professional help: {}",
                guidance_label(guidance.need_professional.as_deref())
            );
            if !guidance.suggested_roles.is_empty() {
                let _ = writeln!(out, "  Suggested: {}", guidance.suggested_roles.join(", "));
            }
        }
    }
}

/// Render a ready result page
pub(crate) fn result_page(view: &ResultView, refreshed: bool) -> String {
    let mut out = String::new();
    let _ = write!(out, "{} · score {}/100", view.risk_label, view.risk_score);
    if let Some(stage) = view.risk_stage_label {
        let _ = write!(out, " · {stage}");
    }
    out.push('\n');
    if let Some(id) = &view.assessment_id {
        let _ = writeln!(out, "Assessment {id}, assessed on {}", view.assessed_on);
    }
    if view.expired {
        out.push_str("This assessment is due for re-evaluation. Run `riskcheck assess` again.\n");
    }

    let _ = writeln!(out, "\n{}", view.title);
    if !view.conclusion.is_empty() {
        let _ = writeln!(out, "{}", view.conclusion);
    }
    let _ = writeln!(out, "{} · next review: {}", view.confidence, view.next_review_window);

    if let Some(key) = &view.key_finding {
        let _ = writeln!(out, "\nKey finding: {}", key.title);
    }
    if !view.findings.is_empty() {
        out.push_str("\nFindings:\n");
        for finding in &view.findings {
            finding_line(&mut out, finding);
        }
    }

    match (&view.paid, &view.upsell) {
        (Some(paid), _) => paid_sections(&mut out, paid),
        (None, Some(card)) => {
            let _ = writeln!(out, "\n{} ({}): {}", card.title, card.price, card.subtitle);
            let _ = writeln!(out, "Run `riskcheck unlock {}` to continue.", card.tier);
        }
        (None, None) => {}
    }

    if !refreshed {
        out.push_str("\n(showing the cached result; the backend could not be reached)\n");
    }
    out
}
