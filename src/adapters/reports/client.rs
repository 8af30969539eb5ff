//! HTTP client for the bulk report collaborator
//!
//! The same client also serves the competitive pricing lookups in [`super::pricing`],
//! which share the host, token and retry policy.

use super::models::{report_id_from_payload, ReportDocument, ReportPoll, ReportSpec};
use crate::adapters::marketplace::RetryPolicy;
use crate::config::{ReportsConfig, SecretString};
use crate::domain::{BazaarError, DocumentId, ReportId, Result, TransportError};
use async_trait::async_trait;
use reqwest::{Client, ClientBuilder, Method};
use secrecy::ExposeSecret;
use serde_json::Value;
use std::time::Duration;

const API_PREFIX: &str = "reports/2021-06-30";
const ACCESS_TOKEN_HEADER: &str = "x-amz-access-token";

/// Operations the report state machine needs from the collaborator
#[async_trait]
pub trait ReportsApi: Send + Sync {
    /// Submit a report request
    async fn create_report(&self, spec: &ReportSpec) -> Result<ReportId>;

    /// Poll a report's processing status
    async fn get_report(&self, report_id: &ReportId) -> Result<ReportPoll>;

    /// Look up where a finished report can be downloaded
    async fn get_report_document(&self, document_id: &DocumentId) -> Result<ReportDocument>;

    /// Download raw document bytes
    async fn download(&self, url: &str) -> Result<Vec<u8>>;
}

/// Reports API over HTTPS
pub struct HttpReportsApi {
    http: Client,
    base_url: String,
    access_token: SecretString,
    marketplace_ids: Vec<String>,
    retry: RetryPolicy,
}

impl HttpReportsApi {
    /// Build a client from the `[reports]` configuration section
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the HTTP client cannot be built.
    pub fn new(config: &ReportsConfig) -> Result<Self> {
        let http = ClientBuilder::new()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| BazaarError::Configuration(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            access_token: config.access_token.clone(),
            marketplace_ids: config.marketplace_ids.clone(),
            retry: RetryPolicy::from_config(&config.retry),
        })
    }

    /// Replace the retry policy
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Marketplaces configured for this client
    pub fn marketplace_ids(&self) -> &[String] {
        &self.marketplace_ids
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{API_PREFIX}/{path}", self.base_url)
    }

    pub(super) fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    pub(super) async fn send_json(&self, method: Method, url: String, body: Option<Value>) -> Result<Value> {
        self.retry
            .run(|| self.send_once(method.clone(), &url, body.as_ref()))
            .await
    }

    async fn send_once(
        &self,
        method: Method,
        url: &str,
        body: Option<&Value>,
    ) -> std::result::Result<Value, TransportError> {
        let mut request = self.http.request(method, url).header(
            ACCESS_TOKEN_HEADER,
            self.access_token.expose_secret().as_str(),
        );
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(TransportError::from_reqwest)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| TransportError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl ReportsApi for HttpReportsApi {
    async fn create_report(&self, spec: &ReportSpec) -> Result<ReportId> {
        let body = self
            .send_json(Method::POST, self.endpoint("reports"), Some(spec.to_body()))
            .await?;
        report_id_from_payload(&body)
    }

    async fn get_report(&self, report_id: &ReportId) -> Result<ReportPoll> {
        let body = self
            .send_json(
                Method::GET,
                self.endpoint(&format!("reports/{report_id}")),
                None,
            )
            .await?;
        Ok(ReportPoll::from_payload(&body))
    }

    async fn get_report_document(&self, document_id: &DocumentId) -> Result<ReportDocument> {
        let body = self
            .send_json(
                Method::GET,
                self.endpoint(&format!("documents/{document_id}")),
                None,
            )
            .await?;
        ReportDocument::from_payload(&body)
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>> {
        self.retry
            .run(|| async {
                let response = self
                    .http
                    .get(url)
                    .send()
                    .await
                    .map_err(TransportError::from_reqwest)?;
                let status = response.status();
                if !status.is_success() {
                    return Err(TransportError::Status {
                        status: status.as_u16(),
                        body: String::new(),
                    });
                }
                response
                    .bytes()
                    .await
                    .map(|b| b.to_vec())
                    .map_err(TransportError::from_reqwest)
            })
            .await
    }
}
