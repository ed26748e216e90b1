use chrono::{Duration, TimeZone, Utc};
use riskcheck_core::expiry::is_expired;
use riskcheck_core::flow::{allowed_transitions, validate_transition};
use riskcheck_core::gate::is_visible;
use riskcheck_core::view::route_actions;
use riskcheck_core::{ActionRules, FlowState, Tier};
use proptest::prelude::*;
use std::collections::HashSet;

fn any_tier() -> impl Strategy<Value = Tier> {
    prop_oneof![Just(Tier::None), Just(Tier::Basic15), Just(Tier::Expert39)]
}

fn any_state() -> impl Strategy<Value = FlowState> {
    prop_oneof![
        Just(FlowState::NeedsStage),
        Just(FlowState::NeedsForm),
        Just(FlowState::HasResult),
        Just(FlowState::Locked),
        Just(FlowState::Unlocked),
        Just(FlowState::Paying),
        Just(FlowState::NotFound),
    ]
}

#[test]
fn known_aliases_normalize() {
    for raw in ["Basic-15", "basic15", "BASIC_15", " basic "] {
        assert_eq!(Tier::normalize(Some(raw)), Tier::Basic15, "{raw}");
    }
    for raw in ["expert_39", "Expert-39", "PRO"] {
        assert_eq!(Tier::normalize(Some(raw)), Tier::Expert39, "{raw}");
    }
    assert_eq!(Tier::normalize(None), Tier::None);
    assert_eq!(Tier::normalize(Some("premium")), Tier::None);
}

#[test]
fn gate_table() {
    assert!(is_visible(Tier::None, Tier::None));
    assert!(!is_visible(Tier::Basic15, Tier::None));
    assert!(is_visible(Tier::Basic15, Tier::Expert39));
    assert!(!is_visible(Tier::Expert39, Tier::Basic15));
    assert!(is_visible(Tier::Expert39, Tier::Expert39));
}

#[test]
fn expiry_boundaries() {
    let now = Utc.with_ymd_and_hms(2024, 3, 31, 9, 15, 0).unwrap();
    let thirty = (now - Duration::days(30)).to_rfc3339();
    let twenty_nine = (now - Duration::days(29)).to_rfc3339();
    assert!(is_expired(Some(&thirty), now, 30));
    assert!(!is_expired(Some(&twenty_nine), now, 30));

    // created late in the day, checked early in the day: still 30 calendar days
    let late = "2024-03-01T23:59:00Z";
    let early = Utc.with_ymd_and_hms(2024, 3, 31, 0, 1, 0).unwrap();
    assert!(is_expired(Some(late), early, 30));

    assert!(!is_expired(Some("yesterday-ish"), now, 30));
    assert!(!is_expired(None, now, 30));
}

proptest! {
    #[test]
    fn prop_normalize_is_idempotent(raw in ".{0,24}") {
        let once = Tier::normalize(Some(&raw));
        let twice = Tier::normalize(Some(once.as_str()));
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn prop_normalize_ignores_case_and_dashes(tier in any_tier(), upper in any::<bool>()) {
        let spelled = tier.as_str().replace('_', "-");
        let spelled = if upper { spelled.to_uppercase() } else { spelled };
        prop_assert_eq!(Tier::normalize(Some(&spelled)), tier);
    }

    #[test]
    fn prop_gate_is_monotonic(required in any_tier(), t1 in any_tier(), t2 in any_tier()) {
        if is_visible(required, t1) && t2 >= t1 {
            prop_assert!(is_visible(required, t2));
        }
    }

    #[test]
    fn prop_routing_never_drops_actions(actions in prop::collection::vec("[a-zA-Z ]{1,20}", 0..20)) {
        let buckets = route_actions(&actions, ActionRules::builtin());
        let distinct: HashSet<&String> = actions.iter().filter(|a| !a.trim().is_empty()).collect();
        prop_assert_eq!(buckets.total(), distinct.len());
    }

    #[test]
    fn prop_transitions_match_table(from in any_state(), to in any_state()) {
        let allowed = allowed_transitions(from);
        prop_assert_eq!(validate_transition(from, to).is_ok(), allowed.contains(&to));
    }
}
