//! Logical storage keys

use std::borrow::Cow;
use std::fmt;

/// Prefix of the per-assessment unlock record
pub const UNLOCKED_TIER_PREFIX: &str = "assessment_unlocked_tier:";

/// Every key the pipeline reads or writes
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StorageKey {
    /// Current assessment id
    AssessmentId,
    /// Serialized `AssessmentResult`
    AssessmentResult,
    /// Serialized questionnaire input
    AssessmentInput,
    /// Unlock record for one assessment id
    UnlockedTier(String),
    /// Client-generated opaque user id
    UserId,
    /// Chosen business stage
    Stage,
}

impl StorageKey {
    /// Physical key string
    #[must_use]
    pub fn as_key(&self) -> Cow<'static, str> {
        match self {
            StorageKey::AssessmentId => Cow::Borrowed("assessment_id"),
            StorageKey::AssessmentResult => Cow::Borrowed("assessment_result"),
            StorageKey::AssessmentInput => Cow::Borrowed("assessment_input"),
            StorageKey::UnlockedTier(id) => Cow::Owned(format!("{UNLOCKED_TIER_PREFIX}{id}")),
            StorageKey::UserId => Cow::Borrowed("user_id"),
            StorageKey::Stage => Cow::Borrowed("assessment_stage"),
        }
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn physical_keys() {
        assert_eq!(StorageKey::Stage.as_key(), "assessment_stage");
        assert_eq!(
            StorageKey::UnlockedTier("a-1".into()).to_string(),
            "assessment_unlocked_tier:a-1"
        );
    }
}
