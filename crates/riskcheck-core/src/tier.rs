//! Unlock tiers
//!
//! Tier strings arrive from query parameters, local storage and backend
//! responses in several spellings. Everything funnels through [`Tier::normalize`],
//! which never fails and falls back to [`Tier::None`] for anything it does not
//! recognize.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Unlock level of an assessment, ordered `None < Basic15 < Expert39`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Tier {
    /// Free view
    #[default]
    None,
    /// €15 self-check
    Basic15,
    /// €39 decision pack
    Expert39,
}

const BASIC_ALIASES: &[&str] = &["basic", "basic15", "basic_15"];
const EXPERT_ALIASES: &[&str] = &["expert", "expert39", "expert_39", "pro"];

impl Tier {
    /// All tiers in ascending order
    pub const ALL: [Tier; 3] = [Tier::None, Tier::Basic15, Tier::Expert39];

    /// Map any tier spelling to a canonical tier.
    ///
    /// Comparison is case-insensitive and treats `-` as `_`. Unknown values map
    /// to [`Tier::None`].
    #[must_use]
    pub fn normalize(raw: Option<&str>) -> Self {
        let cleaned = raw
            .unwrap_or_default()
            .trim()
            .to_lowercase()
            .replace('-', "_");

        if cleaned.is_empty() || cleaned == "none" || cleaned == "free" {
            return Tier::None;
        }
        if BASIC_ALIASES.contains(&cleaned.as_str()) {
            return Tier::Basic15;
        }
        if EXPERT_ALIASES.contains(&cleaned.as_str()) {
            return Tier::Expert39;
        }
        Tier::None
    }

    /// Canonical wire spelling
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::None => "none",
            Tier::Basic15 => "basic_15",
            Tier::Expert39 => "expert_39",
        }
    }

    /// Whether this tier requires payment
    #[inline]
    #[must_use]
    pub fn is_paid(&self) -> bool {
        *self != Tier::None
    }

    /// Whether an unlock at `self` satisfies a requirement of `required`
    #[inline]
    #[must_use]
    pub fn satisfies(&self, required: Tier) -> bool {
        *self >= required
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tier {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Tier::normalize(Some(s)))
    }
}

impl Serialize for Tier {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Tier {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(Tier::normalize(raw.as_deref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_aliases() {
        for raw in ["Basic-15", "basic15", "BASIC_15", " basic "] {
            assert_eq!(Tier::normalize(Some(raw)), Tier::Basic15, "{raw}");
        }
        for raw in ["expert", "Expert-39", "EXPERT39", "pro"] {
            assert_eq!(Tier::normalize(Some(raw)), Tier::Expert39, "{raw}");
        }
    }

    #[test]
    fn unknown_and_empty_fail_closed() {
        assert_eq!(Tier::normalize(None), Tier::None);
        assert_eq!(Tier::normalize(Some("")), Tier::None);
        assert_eq!(Tier::normalize(Some("free")), Tier::None);
        assert_eq!(Tier::normalize(Some("platinum")), Tier::None);
        assert_eq!(Tier::normalize(Some("15")), Tier::None);
    }

    #[test]
    fn ordering_and_satisfaction() {
        assert!(Tier::None < Tier::Basic15);
        assert!(Tier::Basic15 < Tier::Expert39);
        assert!(Tier::Expert39.satisfies(Tier::Basic15));
        assert!(!Tier::Basic15.satisfies(Tier::Expert39));
        assert!(Tier::None.satisfies(Tier::None));
    }

    #[test]
    fn serde_goes_through_normalizer() {
        let t: Tier = serde_json::from_str("\"BASIC-15\"").unwrap();
        assert_eq!(t, Tier::Basic15);
        let t: Tier = serde_json::from_str("null").unwrap();
        assert_eq!(t, Tier::None);
        assert_eq!(serde_json::to_string(&Tier::Expert39).unwrap(), "\"expert_39\"");
    }
}
