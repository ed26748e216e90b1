//! Keyword rules for sorting recommended actions into urgency buckets
//!
//! The backend emits free-text actions. The rule table maps them to a bucket by
//! ordered pattern matching: rules are tried in order and the first match wins.
//! The table is plain data so it can be tuned from a TOML file without touching
//! the bucketing code.

use crate::error::RulesError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Urgency bucket for an action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bucket {
    /// Within the hour: organize, download, check
    Immediate,
    /// Within days: contact, book, file
    NearTerm,
    /// Within the month: contracts, payroll, systems
    LongTerm,
}

impl Bucket {
    /// Display cap for the bucket
    #[must_use]
    pub fn cap(&self) -> usize {
        match self {
            Bucket::Immediate => 4,
            Bucket::NearTerm => 5,
            Bucket::LongTerm => 6,
        }
    }

    /// Heading shown above the bucket
    #[must_use]
    pub fn heading(&self) -> &'static str {
        match self {
            Bucket::Immediate => "Within 1 hour",
            Bucket::NearTerm => "Within 3 days",
            Bucket::LongTerm => "Within 30 days",
        }
    }
}

/// One uncompiled rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSpec {
    pub bucket: Bucket,
    /// Regex alternatives; matched case-insensitively
    pub patterns: Vec<String>,
}

/// Rule table as written in configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleTable {
    /// Bucket for text no rule matches
    #[serde(default = "default_fallback")]
    pub fallback: Bucket,
    #[serde(default)]
    pub rules: Vec<RuleSpec>,
}

fn default_fallback() -> Bucket {
    Bucket::NearTerm
}

impl Default for RuleTable {
    fn default() -> Self {
        let spec = |bucket, patterns: &[&str]| RuleSpec {
            bucket,
            patterns: patterns.iter().map(|p| (*p).to_string()).collect(),
        };
        Self {
            fallback: Bucket::NearTerm,
            rules: vec![
                spec(
                    Bucket::Immediate,
                    &[
                        "整理|汇总|对齐|核对|下载|导出|截图|建立|建一个|做一个|检查|自查|清单|归档|分类",
                        "download|export|screenshot|reconcile|check|organi[sz]e|list",
                    ],
                ),
                spec(
                    Bucket::NearTerm,
                    &[
                        "预约|联系|提交|补交|补申报|更正|登记|申报|开通|申请|咨询|gestor|会计|税务|登记备案",
                        "book|submit|file|register|apply|accountant|gestor|contact",
                    ],
                ),
                spec(
                    Bucket::LongTerm,
                    &[
                        "合同|社保|工资|用工|制度|流程|长期|每月|每季度|建立制度|系统|台账|发票闭环|pos",
                        "contract|social security|payroll|process|monthly|quarterly|system|pos",
                    ],
                ),
            ],
        }
    }
}

impl RuleTable {
    /// Parse a table from TOML text
    pub fn from_toml_str(raw: &str) -> Result<Self, RulesError> {
        toml::from_str(raw).map_err(|e| RulesError::Parse(e.to_string()))
    }

    /// Read a table from a TOML file
    pub fn from_toml_file(path: &Path) -> Result<Self, RulesError> {
        let raw = std::fs::read_to_string(path).map_err(|e| RulesError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_toml_str(&raw)
    }

    /// Compile every pattern
    pub fn compile(&self) -> Result<ActionRules, RulesError> {
        let mut rules = Vec::with_capacity(self.rules.len());
        for spec in &self.rules {
            let mut compiled = Vec::with_capacity(spec.patterns.len());
            for pattern in &spec.patterns {
                let regex = Regex::new(&format!("(?i){pattern}")).map_err(|e| RulesError::InvalidPattern {
                    pattern: pattern.clone(),
                    message: e.to_string(),
                })?;
                compiled.push(regex);
            }
            rules.push((spec.bucket, compiled));
        }
        Ok(ActionRules {
            fallback: self.fallback,
            rules,
        })
    }
}

/// Compiled rule table
#[derive(Debug, Clone)]
pub struct ActionRules {
    fallback: Bucket,
    rules: Vec<(Bucket, Vec<Regex>)>,
}

static DEFAULT_RULES: Lazy<ActionRules> = Lazy::new(|| {
    RuleTable::default()
        .compile()
        .unwrap_or_else(|e| panic!("built-in action rules must compile: {e}"))
});

impl ActionRules {
    /// Built-in rule table
    #[must_use]
    pub fn builtin() -> &'static ActionRules {
        &DEFAULT_RULES
    }

    /// Bucket for a single action
    #[must_use]
    pub fn classify(&self, action: &str) -> Bucket {
        self.rules
            .iter()
            .find(|(_, patterns)| patterns.iter().any(|re| re.is_match(action)))
            .map_or(self.fallback, |(bucket, _)| *bucket)
    }
}

impl Default for ActionRules {
    fn default() -> Self {
        Self::builtin().clone()
    }
}
