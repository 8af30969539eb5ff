//! Request signing for the marketplace gateway
//!
//! A request is signed by sorting its parameters by key, concatenating `key‖value` pairs
//! in that order after the resource path, and applying HMAC-SHA1 keyed with the
//! application secret. The digest is rendered as uppercase hex.

use crate::config::{MarketplaceConfig, SecretString};
use crate::domain::{BazaarError, Result};
use hmac::{Hmac, Mac};
use secrecy::ExposeSecret;
use sha1::Sha1;
use std::collections::BTreeMap;

type HmacSha1 = Hmac<Sha1>;

/// Query parameter carrying the signature
pub const SIGNATURE_PARAM: &str = "_aop_signature";

/// Query parameter carrying the access token
pub const ACCESS_TOKEN_PARAM: &str = "access_token";

/// An unsigned API call: which endpoint, which version, which parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiCall {
    /// Namespaced API name, e.g. `com.alibaba.trade/alibaba.trade.getBuyerOrderList`
    pub api_name: String,

    /// API version
    pub version: String,

    /// Request parameters
    pub params: BTreeMap<String, String>,
}

impl ApiCall {
    /// Create a version-1 call with no parameters
    pub fn new(api_name: impl Into<String>) -> Self {
        Self {
            api_name: api_name.into(),
            version: "1".to_string(),
            params: BTreeMap::new(),
        }
    }

    /// Set the API version
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Add or replace a parameter
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }
}

/// A signed request ready to be sent
///
/// Parameters are private: the only way to change them is [`SignedRequest::with_param`],
/// which recomputes the signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedRequest {
    api_name: String,
    version: String,
    path: String,
    params: BTreeMap<String, String>,
    signature: String,
}

impl SignedRequest {
    /// API name
    pub fn api_name(&self) -> &str {
        &self.api_name
    }

    /// API version
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Canonical resource path used for signing and routing
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Signed parameters, in key order
    pub fn params(&self) -> &BTreeMap<String, String> {
        &self.params
    }

    /// Uppercase hex signature
    pub fn signature(&self) -> &str {
        &self.signature
    }

    /// Return a copy with `key` set to `value` and the signature recomputed
    pub fn with_param(
        mut self,
        key: impl Into<String>,
        value: impl Into<String>,
        signer: &RequestSigner,
    ) -> Result<Self> {
        self.params.insert(key.into(), value.into());
        self.signature = signer.signature(&self.path, &self.params)?;
        Ok(self)
    }

    /// Query pairs to send: every parameter followed by the signature
    pub fn query_pairs(&self) -> Vec<(&str, &str)> {
        let mut pairs: Vec<(&str, &str)> = self
            .params
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        pairs.push((SIGNATURE_PARAM, self.signature.as_str()));
        pairs
    }
}

/// Signs API calls with the application key and secret
#[derive(Clone)]
pub struct RequestSigner {
    app_key: String,
    app_secret: SecretString,
    access_token: Option<SecretString>,
}

impl RequestSigner {
    /// Create a signer from raw credentials
    pub fn new(
        app_key: impl Into<String>,
        app_secret: SecretString,
        access_token: Option<SecretString>,
    ) -> Self {
        Self {
            app_key: app_key.into(),
            app_secret,
            access_token,
        }
    }

    /// Create a signer from the marketplace configuration section
    pub fn from_config(config: &MarketplaceConfig) -> Self {
        Self::new(
            config.app_key.clone(),
            config.app_secret.clone(),
            config.access_token.clone(),
        )
    }

    /// Canonical resource path: `param2/{version}/{api_name}/{app_key}`
    pub fn resource_path(&self, api_name: &str, version: &str) -> String {
        format!("param2/{version}/{api_name}/{}", self.app_key)
    }

    /// Compute the signature for `params` under `path`
    pub fn signature(&self, path: &str, params: &BTreeMap<String, String>) -> Result<String> {
        compute_signature(self.app_secret.expose_secret().as_str(), path, params)
    }

    /// Sign a call, adding the access token when one is configured
    pub fn sign(&self, call: &ApiCall) -> Result<SignedRequest> {
        let path = self.resource_path(&call.api_name, &call.version);
        let mut params = call.params.clone();
        if let Some(ref token) = self.access_token {
            params
                .entry(ACCESS_TOKEN_PARAM.to_string())
                .or_insert_with(|| token.expose_secret().as_str().to_string());
        }
        let signature = self.signature(&path, &params)?;

        Ok(SignedRequest {
            api_name: call.api_name.clone(),
            version: call.version.clone(),
            path,
            params,
            signature,
        })
    }
}

impl std::fmt::Debug for RequestSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestSigner")
            .field("app_key", &self.app_key)
            .finish_non_exhaustive()
    }
}

/// HMAC-SHA1 over `path ‖ k1 ‖ v1 ‖ k2 ‖ v2 ...` with keys in lexicographic order
pub fn compute_signature(
    secret: &str,
    path: &str,
    params: &BTreeMap<String, String>,
) -> Result<String> {
    let mut mac = HmacSha1::new_from_slice(secret.as_bytes())
        .map_err(|e| BazaarError::Configuration(format!("Invalid signing key: {e}")))?;

    mac.update(path.as_bytes());
    for (key, value) in params {
        mac.update(key.as_bytes());
        mac.update(value.as_bytes());
    }

    Ok(mac
        .finalize()
        .into_bytes()
        .iter()
        .map(|b| format!("{b:02X}"))
        .collect())
}
