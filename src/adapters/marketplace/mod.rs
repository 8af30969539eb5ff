//! Marketplace gateway integration
//!
//! - [`signing`] - canonical request signing (HMAC-SHA1, uppercase hex)
//! - [`retry`] - bounded exponential backoff policy
//! - [`client`] - signed HTTP client and the [`MarketplaceApi`] seam
//! - [`envelope`] - response envelope helpers

pub mod client;
pub mod envelope;
pub mod retry;
pub mod signing;

pub use client::{MarketplaceApi, SignedClient};
pub use retry::RetryPolicy;
pub use signing::{ApiCall, RequestSigner, SignedRequest};
