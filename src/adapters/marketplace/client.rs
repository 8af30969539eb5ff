//! Signed HTTP client for the marketplace gateway

use super::envelope;
use super::retry::RetryPolicy;
use super::signing::{ApiCall, RequestSigner, SignedRequest};
use crate::config::MarketplaceConfig;
use crate::domain::{BazaarError, Result, TransportError};
use async_trait::async_trait;
use reqwest::{Client, ClientBuilder};
use serde_json::Value;
use std::time::Duration;

/// Anything that can execute a marketplace API call and return its JSON body
///
/// The fetch engine only depends on this trait, so tests can substitute an in-process
/// implementation for the HTTP client.
#[async_trait]
pub trait MarketplaceApi: Send + Sync {
    /// Execute `call` and return the response body
    ///
    /// # Errors
    ///
    /// Returns [`BazaarError::Transport`] once retries are exhausted.
    async fn call(&self, call: &ApiCall) -> Result<Value>;
}

/// Marketplace client that signs every request and retries transport failures
///
/// # Example
///
/// ```no_run
/// use bazaar::adapters::marketplace::{ApiCall, MarketplaceApi, SignedClient};
/// use bazaar::config::load_config;
///
/// # async fn example() -> bazaar::domain::Result<()> {
/// let config = load_config("bazaar.toml")?;
/// let client = SignedClient::new(&config.marketplace)?;
/// let call = ApiCall::new("com.alibaba.trade/alibaba.trade.getBuyerOrderList")
///     .with_param("pageNo", "1")
///     .with_param("pageSize", "50");
/// let body = client.call(&call).await?;
/// # Ok(())
/// # }
/// ```
pub struct SignedClient {
    http: Client,
    base_url: String,
    signer: RequestSigner,
    retry: RetryPolicy,
}

impl SignedClient {
    /// Build a client from the marketplace configuration section
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the HTTP client cannot be built.
    pub fn new(config: &MarketplaceConfig) -> Result<Self> {
        let http = ClientBuilder::new()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .connect_timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| BazaarError::Configuration(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            signer: RequestSigner::from_config(config),
            retry: RetryPolicy::from_config(&config.retry),
        })
    }

    /// Replace the retry policy
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// The signer used for outgoing requests
    pub fn signer(&self) -> &RequestSigner {
        &self.signer
    }

    /// Full URL for a signed request
    pub fn url_for(&self, request: &SignedRequest) -> String {
        format!("{}/{}", self.base_url, request.path())
    }

    /// Send an already-signed request under the retry policy
    pub async fn execute(&self, request: &SignedRequest) -> Result<Value> {
        tracing::debug!(api = request.api_name(), "Calling marketplace API");
        self.retry.run(|| self.send_once(request)).await
    }

    async fn send_once(&self, request: &SignedRequest) -> std::result::Result<Value, TransportError> {
        let response = self
            .http
            .get(self.url_for(request))
            .query(&request.query_pairs())
            .send()
            .await
            .map_err(TransportError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Status {
                status: status.as_u16(),
                body: truncate(body, 512),
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| TransportError::InvalidResponse(e.to_string()))?;

        if let Some((code, message)) = envelope::api_error(&body) {
            return Err(TransportError::Api { code, message });
        }

        Ok(body)
    }
}

#[async_trait]
impl MarketplaceApi for SignedClient {
    async fn call(&self, call: &ApiCall) -> Result<Value> {
        let request = self.signer.sign(call)?;
        self.execute(&request).await
    }
}

fn truncate(mut body: String, max: usize) -> String {
    if body.len() > max {
        let mut cut = max;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
    }
    body
}
