//! Questionnaire vocabulary
//!
//! Business stages, the income ranges each stage offers and the industry
//! catalog shown on the intake form.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Business stage chosen before the questionnaire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    /// Not registered yet
    #[serde(rename = "PRE_AUTONOMO")]
    PreAutonomo,
    /// Registered sole trader
    #[serde(rename = "AUTONOMO")]
    Autonomo,
    /// Limited company
    #[serde(rename = "SL")]
    Sl,
}

impl Stage {
    /// All stages in intake order
    pub const ALL: [Stage; 3] = [Stage::PreAutonomo, Stage::Autonomo, Stage::Sl];

    /// Wire spelling
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::PreAutonomo => "PRE_AUTONOMO",
            Stage::Autonomo => "AUTONOMO",
            Stage::Sl => "SL",
        }
    }

    /// Quick-pick monthly income values
    #[must_use]
    pub fn income_presets(&self) -> &'static [u32] {
        match self {
            Stage::PreAutonomo => &[0, 300, 500, 800, 1000, 1500, 2000, 3000, 5000],
            Stage::Autonomo => &[500, 1000, 1500, 2000, 3000, 5000, 7000, 10000],
            Stage::Sl => &[2000, 3000, 5000, 7000, 10000, 15000, 20000],
        }
    }

    /// Slider bounds for monthly income
    #[must_use]
    pub fn income_bounds(&self) -> IncomeBounds {
        match self {
            Stage::PreAutonomo => IncomeBounds { min: 0, max: 5000, step: 50 },
            Stage::Autonomo => IncomeBounds { min: 0, max: 10000, step: 100 },
            Stage::Sl => IncomeBounds { min: 0, max: 20000, step: 250 },
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rejected stage value
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown stage: {0}")]
pub struct UnknownStage(pub String);

impl FromStr for Stage {
    type Err = UnknownStage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Stage::ALL
            .into_iter()
            .find(|stage| stage.as_str() == s.trim())
            .ok_or_else(|| UnknownStage(s.to_string()))
    }
}

/// Income slider range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IncomeBounds {
    pub min: u32,
    pub max: u32,
    pub step: u32,
}

impl IncomeBounds {
    /// Clamp an income into range; returns the value and whether it moved
    #[must_use]
    pub fn clamp(&self, income: f64) -> (f64, bool) {
        let clamped = income.clamp(f64::from(self.min), f64::from(self.max));
        (clamped, (clamped - income).abs() > f64::EPSILON)
    }
}

/// Human label for the band an income falls in
#[must_use]
pub fn income_band_label(income: f64) -> &'static str {
    if income <= 0.0 {
        "not started / irregular"
    } else if income < 500.0 {
        "€0–€499 (very low)"
    } else if income < 1000.0 {
        "€500–€999 (low)"
    } else if income < 2000.0 {
        "€1000–€1999 (medium)"
    } else if income < 3000.0 {
        "€2000–€2999 (typical)"
    } else if income < 5000.0 {
        "€3000–€4999 (growing)"
    } else if income < 10000.0 {
        "€5000–€9999 (high)"
    } else if income < 20000.0 {
        "€10000–€19999 (very high)"
    } else {
        "≥€20000 (exceptional)"
    }
}

/// Industry keys accepted by the backend, with display labels
pub const INDUSTRIES: &[(&str, &str)] = &[
    ("bazar", "Bazaar / variety store"),
    ("supermarket", "Supermarket"),
    ("restaurant", "Restaurant"),
    ("bar", "Bar"),
    ("takeaway", "Takeaway"),
    ("telecom_agent", "SIM card / phone plan agent"),
    ("fiber_install", "Fiber installation agent"),
    ("phone_shop", "Phone shop / accessories"),
    ("electronics_repair", "Electronics repair"),
    ("beauty", "Hair and beauty"),
    ("delivery", "Delivery"),
    ("construction", "Construction / renovation"),
    ("logistics", "Logistics / transport"),
    ("professional_translation", "Translation"),
    ("professional_consulting", "Consulting"),
    ("professional_it", "IT / freelancer"),
    ("professional_design", "Design"),
    ("education_training", "Education / training"),
    ("real_estate_agent", "Real estate agent"),
    ("advertising_media", "Advertising / media"),
    ("travel_agency", "Travel agency"),
    ("ecommerce", "E-commerce"),
    ("other", "Other"),
];

/// Display label for an industry key
#[must_use]
pub fn industry_label(key: &str) -> Option<&'static str> {
    INDUSTRIES.iter().find(|(k, _)| *k == key).map(|(_, label)| *label)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_only_known_stages() {
        assert_eq!("SL".parse::<Stage>().unwrap(), Stage::Sl);
        assert_eq!(" PRE_AUTONOMO ".parse::<Stage>().unwrap(), Stage::PreAutonomo);
        assert!("sl".parse::<Stage>().is_err());
        assert!("COOP".parse::<Stage>().is_err());
    }

    #[test]
    fn clamps_income_when_stage_changes() {
        let (v, moved) = Stage::PreAutonomo.income_bounds().clamp(12000.0);
        assert_eq!(v, 5000.0);
        assert!(moved);

        let (v, moved) = Stage::Sl.income_bounds().clamp(12000.0);
        assert_eq!(v, 12000.0);
        assert!(!moved);
    }

    #[test]
    fn band_labels() {
        assert_eq!(income_band_label(0.0), "not started / irregular");
        assert_eq!(income_band_label(499.0), "€0–€499 (very low)");
        assert_eq!(income_band_label(2000.0), "€2000–€2999 (typical)");
        assert_eq!(income_band_label(25000.0), "≥€20000 (exceptional)");
    }

    #[test]
    fn industry_lookup() {
        assert_eq!(industry_label("bar"), Some("Bar"));
        assert_eq!(industry_label("casino"), None);
    }
}
