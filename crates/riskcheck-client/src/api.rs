//! Compliance backend API
//!
//! [`ComplianceBackend`] is the seam between the pipeline and the network.
//! [`HttpBackend`] implements it over reqwest against `{base_url}/api/v1`.

use crate::config::ClientConfig;
use crate::error::{ApiError, ClientError, ClientResult};
use async_trait::async_trait;
use reqwest::{Response, StatusCode, Url};
use riskcheck_core::{
    AssessmentInput, AssessmentRecord, AssessmentResult, CheckoutRequest, CheckoutSession, PaymentStatus,
};
use serde::de::DeserializeOwned;
use std::path::Path;
use tokio::io::AsyncWriteExt;

/// One assessment submission
#[derive(Debug, Clone, PartialEq)]
pub struct AssessRequest {
    pub input: AssessmentInput,
    /// Re-assess an existing assessment instead of creating one
    pub assessment_id: Option<String>,
}

impl AssessRequest {
    /// First submission of a questionnaire
    #[must_use]
    pub fn new(input: AssessmentInput) -> Self {
        Self {
            input,
            assessment_id: None,
        }
    }

    /// Recompute an existing assessment
    #[must_use]
    pub fn recompute(input: AssessmentInput, assessment_id: impl Into<String>) -> Self {
        Self {
            input,
            assessment_id: Some(assessment_id.into()),
        }
    }
}

/// Backend operations the pipeline depends on
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ComplianceBackend: Send + Sync {
    /// `POST /compliance/assess[?assessment_id=]`
    async fn assess(&self, request: AssessRequest) -> Result<AssessmentResult, ApiError>;

    /// `GET /compliance/assessments/{id}`
    async fn assessment_status(&self, id: &str) -> Result<AssessmentRecord, ApiError>;

    /// `POST /stripe/create-checkout-session`
    async fn create_checkout_session(&self, request: CheckoutRequest) -> Result<CheckoutSession, ApiError>;

    /// `GET /payment/status?session_id=`
    async fn payment_status(&self, session_id: &str) -> Result<PaymentStatus, ApiError>;
}

/// reqwest implementation of [`ComplianceBackend`]
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    api_root: Url,
}

impl HttpBackend {
    /// Build a client for `config.api_root()`
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let api_root = Url::parse(&config.api_root()).map_err(|e| ApiError::InvalidUrl(e.to_string()))?;
        if api_root.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl(api_root.to_string()));
        }
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(concat!("riskcheck/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, api_root })
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.api_root.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Report PDF URL for an assessment
    #[must_use]
    pub fn report_url(&self, assessment_id: &str, user_id: Option<&str>) -> Url {
        let mut url = self.endpoint(&["assessments", assessment_id, "report.pdf"]);
        if let Some(user_id) = user_id.filter(|u| !u.is_empty()) {
            url.query_pairs_mut().append_pair("user_id", user_id);
        }
        url
    }

    /// Stream the report PDF into `dest`; returns the number of bytes written
    pub async fn download_report(&self, assessment_id: &str, user_id: Option<&str>, dest: &Path) -> ClientResult<u64> {
        let url = self.report_url(assessment_id, user_id);
        tracing::debug!("GET {url}");
        let mut response = check_status(self.client.get(url).send().await.map_err(ApiError::from)?, "report").await?;

        let mut file = tokio::fs::File::create(dest)
            .await
            .map_err(|e| ClientError::io_error(dest, e))?;
        let mut written = 0u64;
        while let Some(chunk) = response.chunk().await.map_err(ApiError::from)? {
            file.write_all(&chunk).await.map_err(|e| ClientError::io_error(dest, e))?;
            written += chunk.len() as u64;
        }
        file.flush().await.map_err(|e| ClientError::io_error(dest, e))?;
        tracing::info!("Saved report for {assessment_id} to {} ({written} bytes)", dest.display());
        Ok(written)
    }
}

async fn check_status(response: Response, resource: &str) -> Result<Response, ApiError> {
    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        return Err(ApiError::NotFound {
            resource: resource.to_string(),
        });
    }
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ApiError::Status {
            status: status.as_u16(),
            body,
        });
    }
    Ok(response)
}

async fn decode<T: DeserializeOwned>(response: Response, resource: &str) -> Result<T, ApiError> {
    let response = check_status(response, resource).await?;
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode(format!("{resource}: {e}")))
}

#[async_trait]
impl ComplianceBackend for HttpBackend {
    async fn assess(&self, request: AssessRequest) -> Result<AssessmentResult, ApiError> {
        let mut url = self.endpoint(&["compliance", "assess"]);
        if let Some(id) = &request.assessment_id {
            url.query_pairs_mut().append_pair("assessment_id", id);
        }
        tracing::debug!("POST {url}");
        let response = self.client.post(url).json(&request.input).send().await?;
        decode(response, "assessment").await
    }

    async fn assessment_status(&self, id: &str) -> Result<AssessmentRecord, ApiError> {
        let url = self.endpoint(&["compliance", "assessments", id]);
        tracing::debug!("GET {url}");
        let response = self.client.get(url).send().await?;
        decode(response, &format!("assessment {id}")).await
    }

    async fn create_checkout_session(&self, request: CheckoutRequest) -> Result<CheckoutSession, ApiError> {
        let url = self.endpoint(&["stripe", "create-checkout-session"]);
        tracing::debug!("POST {url} tier={}", request.tier);
        let response = self.client.post(url).json(&request).send().await?;
        decode(response, "checkout session").await
    }

    async fn payment_status(&self, session_id: &str) -> Result<PaymentStatus, ApiError> {
        let mut url = self.endpoint(&["payment", "status"]);
        url.query_pairs_mut().append_pair("session_id", session_id);
        tracing::debug!("GET {url}");
        let response = self.client.get(url).send().await?;
        decode(response, "payment status").await
    }
}
