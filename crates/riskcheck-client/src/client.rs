//! Wiring of the HTTP backend, scopes and operations

use crate::api::{ComplianceBackend, HttpBackend};
use crate::config::ClientConfig;
use crate::error::ClientResult;
use crate::intake::Intake;
use crate::payments::Payments;
use crate::reconcile::Reconciler;
use riskcheck_store::{KeyValueScope, Scopes};
use std::sync::Arc;

/// All client operations against one configured backend
#[derive(Debug, Clone)]
pub struct Client {
    http: HttpBackend,
    intake: Intake,
    reconciler: Reconciler,
    payments: Payments,
}

impl Client {
    /// Build from configuration; rules are read from `config.rules_path` when set
    pub fn from_config(config: &ClientConfig, scopes: Scopes) -> ClientResult<Self> {
        let http = HttpBackend::new(config)?;
        let backend: Arc<dyn ComplianceBackend> = Arc::new(http.clone());

        let reconciler = Reconciler::new(backend.clone(), scopes.clone())
            .with_rules(config.action_rules()?)
            .with_reevaluate_after_days(config.reevaluate_after_days)
            .with_status_retry(config.status_retries, config.status_retry_delay());
        let payments = Payments::new(reconciler.clone())
            .with_polling(config.payment_poll_delay(), config.payment_poll_retries);
        let intake = Intake::new(backend, scopes);

        tracing::debug!("Client ready for {}", config.api_root());
        Ok(Self {
            http,
            intake,
            reconciler,
            payments,
        })
    }

    /// Build with the in-memory session scope from `config` over `durable`
    pub fn with_durable_scope(config: &ClientConfig, durable: Arc<dyn KeyValueScope>) -> ClientResult<Self> {
        let scopes = Scopes::new(Arc::new(config.session_scope()), durable);
        Self::from_config(config, scopes)
    }

    #[must_use]
    pub fn http(&self) -> &HttpBackend {
        &self.http
    }

    #[must_use]
    pub fn intake(&self) -> &Intake {
        &self.intake
    }

    #[must_use]
    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    #[must_use]
    pub fn payments(&self) -> &Payments {
        &self.payments
    }

    #[must_use]
    pub fn scopes(&self) -> &Scopes {
        self.reconciler.scopes()
    }
}
