//! External system integrations for Bazaar.
//!
//! This module provides adapters for integrating with external systems:
//!
//! - [`marketplace`] - signed marketplace gateway client
//! - [`reports`] - bulk report collaborator
//! - [`database`] - relational sink abstraction (trait-based)
//! - [`postgresql`] - PostgreSQL implementation
//!
//! # Design Pattern
//!
//! Adapters follow the **Adapter Pattern** to isolate external dependencies and
//! enable testing with mock implementations. The core only sees the
//! [`marketplace::MarketplaceApi`], [`reports::ReportsApi`] and
//! [`database::RelationalSink`] traits.
//!
//! # Marketplace Adapter
//!
//! ```rust,no_run
//! use bazaar::adapters::marketplace::{ApiCall, MarketplaceApi, SignedClient};
//! use bazaar::config::{secret_string, MarketplaceConfig, RetryConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = MarketplaceConfig {
//!     base_url: "https://gw.open.1688.com/openapi".to_string(),
//!     app_key: "1234567".to_string(),
//!     app_secret: secret_string("secret".to_string()),
//!     access_token: Some(secret_string("token".to_string())),
//!     timeout_seconds: 15,
//!     retry: RetryConfig::default(),
//! };
//!
//! let client = SignedClient::new(&config)?;
//! let body = client
//!     .call(&ApiCall::new("com.alibaba.product/alibaba.product.list.get"))
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod database;
pub mod marketplace;
pub mod postgresql;
pub mod reports;
