//! Client configuration
//!
//! Defaults, then an optional TOML file, then environment overrides.

use crate::error::{ClientError, ClientResult};
use riskcheck_core::expiry::REEVALUATE_AFTER_DAYS;
use riskcheck_core::{ActionRules, RuleTable};
use riskcheck_store::{SessionScope, DEFAULT_SESSION_IDLE};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable overriding the backend base URL
pub const ENV_BASE_URL: &str = "RISKCHECK_API_BASE_URL";
/// Environment variable overriding the state directory
pub const ENV_STATE_DIR: &str = "RISKCHECK_STATE_DIR";

/// Client configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Backend origin, without the `/api/v1` prefix
    pub base_url: String,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    /// Age in calendar days after which an assessment is due for re-evaluation
    pub reevaluate_after_days: i64,
    /// Delay before re-polling a paid session whose tier is still `none`
    pub payment_poll_delay_ms: u64,
    /// How many times to re-poll such a session
    pub payment_poll_retries: u32,
    /// Extra status attempts after a transport error, 5xx or 429
    pub status_retries: u32,
    /// Pause before each extra status attempt
    pub status_retry_delay_ms: u64,
    /// Idle expiry of the in-memory session scope
    pub session_idle_secs: u64,
    /// Entry cap of the in-memory session scope
    pub session_capacity: u64,
    /// Directory for durable state; platform default when unset
    pub state_dir: Option<PathBuf>,
    /// Optional TOML action rule table
    pub rules_path: Option<PathBuf>,
}

impl ClientConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With backend base URL
    #[inline]
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// With request timeout
    #[inline]
    #[must_use]
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_reevaluate_after_days(mut self, days: i64) -> Self {
        self.reevaluate_after_days = days;
        self
    }

    /// With payment re-poll delay and retry count
    #[inline]
    #[must_use]
    pub fn with_payment_polling(mut self, delay_ms: u64, retries: u32) -> Self {
        self.payment_poll_delay_ms = delay_ms;
        self.payment_poll_retries = retries;
        self
    }

    /// With status retry count and delay
    #[inline]
    #[must_use]
    pub fn with_status_retry(mut self, retries: u32, delay_ms: u64) -> Self {
        self.status_retries = retries;
        self.status_retry_delay_ms = delay_ms;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_session_idle_secs(mut self, secs: u64) -> Self {
        self.session_idle_secs = secs;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_state_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.state_dir = Some(dir.into());
        self
    }

    #[inline]
    #[must_use]
    pub fn with_rules_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.rules_path = Some(path.into());
        self
    }

    /// Parse configuration from TOML text; missing keys keep their defaults
    pub fn from_toml_str(raw: &str) -> ClientResult<Self> {
        toml::from_str(raw).map_err(|e| ClientError::Config(e.to_string()))
    }

    /// Read configuration from a TOML file
    pub fn from_file(path: &Path) -> ClientResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| ClientError::io_error(path, e))?;
        Self::from_toml_str(&raw)
    }

    /// Apply overrides from a variable lookup
    #[must_use]
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = lookup(ENV_BASE_URL).filter(|v| !v.trim().is_empty()) {
            self.base_url = url.trim().to_string();
        }
        if let Some(dir) = lookup(ENV_STATE_DIR).filter(|v| !v.trim().is_empty()) {
            self.state_dir = Some(PathBuf::from(dir.trim()));
        }
        self
    }

    /// Apply overrides from the process environment
    #[must_use]
    pub fn with_env(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Defaults, optional file, then environment
    pub fn load(path: Option<&Path>) -> ClientResult<Self> {
        let base = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        let config = base.with_env();
        config.validate()?;
        tracing::debug!("Loaded client config: {config:?}");
        Ok(config)
    }

    /// Reject values the client cannot work with
    pub fn validate(&self) -> ClientResult<()> {
        let url = self.base_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ClientError::Config(format!("base_url must be http(s): {url:?}")));
        }
        if self.timeout_secs == 0 {
            return Err(ClientError::Config("timeout_secs must be positive".into()));
        }
        if self.reevaluate_after_days <= 0 {
            return Err(ClientError::Config("reevaluate_after_days must be positive".into()));
        }
        if self.payment_poll_retries > 0 && self.payment_poll_delay_ms == 0 {
            return Err(ClientError::Config("payment_poll_delay_ms must be positive".into()));
        }
        if self.status_retries > 0 && self.status_retry_delay_ms == 0 {
            return Err(ClientError::Config("status_retry_delay_ms must be positive".into()));
        }
        if self.session_idle_secs == 0 || self.session_capacity == 0 {
            return Err(ClientError::Config("session_idle_secs and session_capacity must be positive".into()));
        }
        Ok(())
    }

    /// `{base_url}/api/v1`
    #[must_use]
    pub fn api_root(&self) -> String {
        format!("{}/api/v1", self.base_url.trim().trim_end_matches('/'))
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    #[must_use]
    pub fn payment_poll_delay(&self) -> Duration {
        Duration::from_millis(self.payment_poll_delay_ms)
    }

    #[must_use]
    pub fn status_retry_delay(&self) -> Duration {
        Duration::from_millis(self.status_retry_delay_ms)
    }

    #[must_use]
    pub fn session_idle(&self) -> Duration {
        Duration::from_secs(self.session_idle_secs)
    }

    /// In-memory session scope sized and expired per this configuration
    #[must_use]
    pub fn session_scope(&self) -> SessionScope {
        SessionScope::with_idle(self.session_capacity, self.session_idle())
    }

    /// Action rules from `rules_path`, or the built-in table
    pub fn action_rules(&self) -> ClientResult<ActionRules> {
        match &self.rules_path {
            Some(path) => Ok(RuleTable::from_toml_file(path)?.compile()?),
            None => Ok(ActionRules::builtin().clone()),
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            timeout_secs: 30,
            reevaluate_after_days: REEVALUATE_AFTER_DAYS,
            payment_poll_delay_ms: 1_000,
            payment_poll_retries: 1,
            status_retries: 1,
            status_retry_delay_ms: 250,
            session_idle_secs: DEFAULT_SESSION_IDLE.as_secs(),
            session_capacity: 1_024,
            state_dir: None,
            rules_path: None,
        }
    }
}
