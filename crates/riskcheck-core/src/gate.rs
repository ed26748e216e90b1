//! Unlock gate
//!
//! Decides which parts of an assessment are rendered and which are replaced by
//! an upsell placeholder.

use crate::tier::Tier;
use crate::types::Finding;
use serde::Serialize;

/// Placeholder shown instead of a masked finding detail
pub const LOCKED_DETAIL: &str = "Unlock to see the full explanation for this finding.";

/// Whether paid sections are visible
///
/// `None` requirements are always visible; otherwise the unlocked tier must be
/// at least the required one.
#[inline]
#[must_use]
pub fn is_visible(required: Tier, unlocked: Tier) -> bool {
    unlocked.satisfies(required)
}

/// Whether a finding's detail is replaced by [`LOCKED_DETAIL`]
///
/// Only pro-only findings are masked, only while nothing is unlocked, and only
/// when the assessment requires some tier at all.
#[inline]
#[must_use]
pub fn hides_detail(finding: &Finding, required: Tier, unlocked: Tier) -> bool {
    finding.pro_only && unlocked == Tier::None && required != Tier::None
}

/// Detail text to render for a finding
#[must_use]
pub fn visible_detail(finding: &Finding, required: Tier, unlocked: Tier) -> &str {
    if hides_detail(finding, required, unlocked) {
        LOCKED_DETAIL
    } else {
        &finding.detail
    }
}

/// Upsell card for a paid tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PriceCard {
    pub tier: Tier,
    pub price: &'static str,
    pub title: &'static str,
    pub subtitle: &'static str,
    pub cta: &'static str,
}

/// Price card for a tier; `None` for the free tier
#[must_use]
pub fn price_card(tier: Tier) -> Option<PriceCard> {
    match tier {
        Tier::None => None,
        Tier::Basic15 => Some(PriceCard {
            tier,
            price: "€15",
            title: "Self-check",
            subtitle: "Stage and weak-point summary, basic action list, basic PDF",
            cta: "Unlock €15",
        }),
        Tier::Expert39 => Some(PriceCard {
            tier,
            price: "€39",
            title: "Decision Pack",
            subtitle: "Full stage explanation, what not to do, document checklist and self-audit, professional guidance",
            cta: "Unlock €39",
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Severity;

    fn finding(pro_only: bool) -> Finding {
        Finding {
            code: "EMP_REQUIRED".into(),
            title: "Staffing".into(),
            detail: "secret".into(),
            severity: Severity::High,
            legal_ref: None,
            pro_only,
            explain_difficulty: None,
            trigger_sources: None,
        }
    }

    #[test]
    fn visibility_table() {
        assert!(is_visible(Tier::None, Tier::None));
        assert!(!is_visible(Tier::Basic15, Tier::None));
        assert!(is_visible(Tier::Basic15, Tier::Basic15));
        assert!(is_visible(Tier::Basic15, Tier::Expert39));
        assert!(!is_visible(Tier::Expert39, Tier::Basic15));
        assert!(is_visible(Tier::Expert39, Tier::Expert39));
    }

    #[test]
    fn masks_pro_only_detail_while_locked() {
        let f = finding(true);
        assert_eq!(visible_detail(&f, Tier::Basic15, Tier::None), LOCKED_DETAIL);
        assert_eq!(visible_detail(&f, Tier::Basic15, Tier::Basic15), "secret");
        // nothing required, nothing to mask
        assert_eq!(visible_detail(&f, Tier::None, Tier::None), "secret");
        assert_eq!(visible_detail(&finding(false), Tier::Expert39, Tier::None), "secret");
    }

    #[test]
    fn price_cards() {
        assert!(price_card(Tier::None).is_none());
        assert_eq!(price_card(Tier::Basic15).unwrap().price, "€15");
        assert_eq!(price_card(Tier::Expert39).unwrap().cta, "Unlock €39");
    }
}
