//! Display labels for result badges

use crate::types::{Grade, RiskLevel, RiskStage};

/// Badge text for a risk level
#[must_use]
pub fn risk_level_label(level: RiskLevel) -> &'static str {
    match level {
        RiskLevel::Green => "Low risk",
        RiskLevel::Yellow => "Medium risk",
        RiskLevel::Orange => "High risk",
        RiskLevel::Red => "Very high risk",
    }
}

/// Badge text for a risk stage
#[must_use]
pub fn risk_stage_label(stage: RiskStage) -> &'static str {
    match stage {
        RiskStage::A => "Stage A",
        RiskStage::B => "Stage B",
        RiskStage::C => "Stage C",
        RiskStage::D => "Stage D",
    }
}

#[must_use]
pub fn confidence_label(confidence: Grade) -> &'static str {
    match confidence {
        Grade::High => "Confidence: high",
        Grade::Medium => "Confidence: medium",
        Grade::Low => "Confidence: low (not enough information)",
    }
}

#[must_use]
pub fn explain_difficulty_label(difficulty: Grade) -> &'static str {
    match difficulty {
        Grade::Low => "Explain difficulty: low",
        Grade::Medium => "Explain difficulty: medium",
        Grade::High => "Explain difficulty: high",
    }
}

/// Label for `decision_guidance.need_professional`; unknown values pass through
#[must_use]
pub fn guidance_label(level: Option<&str>) -> &str {
    match level {
        None => "-",
        Some("no") => "Not needed",
        Some("consider") => "Recommended",
        Some("strongly_consider") => "Strongly recommended (at least one document-chain review)",
        Some("yes") => "Required",
        Some(other) => other,
    }
}
