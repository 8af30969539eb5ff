//! Competitive pricing lookups

use super::client::HttpReportsApi;
use crate::domain::{Asin, BazaarError, Result, SellerSku};
use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Most identifiers accepted by a single pricing request
pub const MAX_ITEMS_PER_REQUEST: usize = 20;

const PRICING_PATH: &str = "products/pricing/v0/competitivePrice";

/// Kind of identifier a pricing request is keyed by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ItemType {
    /// The seller's own SKUs
    #[default]
    Sku,
    /// Catalogue ASINs, typically competitors' listings
    Asin,
}

impl ItemType {
    /// Value of the `ItemType` request parameter
    pub fn param_value(self) -> &'static str {
        match self {
            ItemType::Sku => "Sku",
            ItemType::Asin => "Asin",
        }
    }

    /// Request parameter carrying the comma-joined identifiers
    pub fn list_param(self) -> &'static str {
        match self {
            ItemType::Sku => "Skus",
            ItemType::Asin => "Asins",
        }
    }

    /// Suffix of the tables this item type is stored in
    pub fn table_suffix(self) -> &'static str {
        match self {
            ItemType::Sku => "",
            ItemType::Asin => "_competitors",
        }
    }

    /// Validate and normalize one identifier of this type
    pub fn parse_identifier(self, input: &str) -> std::result::Result<String, String> {
        match self {
            ItemType::Sku => SellerSku::new(input).map(|s| s.as_str().to_string()),
            ItemType::Asin => Asin::new(input).map(|a| a.as_str().to_string()),
        }
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ItemType::Sku => "sku",
            ItemType::Asin => "asin",
        })
    }
}

impl FromStr for ItemType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sku" => Ok(ItemType::Sku),
            "asin" => Ok(ItemType::Asin),
            other => Err(format!("Unknown item type '{other}' (expected sku or asin)")),
        }
    }
}

/// Competitive pricing collaborator
#[async_trait]
pub trait PricingApi: Send + Sync {
    /// Pricing items for at most [`MAX_ITEMS_PER_REQUEST`] validated identifiers of
    /// `item_type`, one item per identifier
    async fn competitive_pricing(
        &self,
        item_type: ItemType,
        identifiers: &[String],
    ) -> Result<Vec<Value>>;
}

/// Items of a pricing response, with or without the `payload` wrapper
pub fn pricing_items(body: &Value) -> Result<Vec<Value>> {
    match body.get("payload").unwrap_or(body) {
        Value::Array(items) => Ok(items.clone()),
        other => Err(BazaarError::Serialization(format!(
            "Expected a list of pricing items, got: {}",
            truncate(&other.to_string())
        ))),
    }
}

fn truncate(text: &str) -> String {
    text.chars().take(200).collect()
}

#[async_trait]
impl PricingApi for HttpReportsApi {
    async fn competitive_pricing(
        &self,
        item_type: ItemType,
        identifiers: &[String],
    ) -> Result<Vec<Value>> {
        if identifiers.is_empty() {
            return Ok(Vec::new());
        }
        if identifiers.len() > MAX_ITEMS_PER_REQUEST {
            return Err(BazaarError::Validation(format!(
                "At most {MAX_ITEMS_PER_REQUEST} identifiers per pricing request, got {}",
                identifiers.len()
            )));
        }
        let marketplace = self.marketplace_ids().first().ok_or_else(|| {
            BazaarError::Configuration("reports.marketplace_ids is required for pricing".to_string())
        })?;

        let joined = identifiers.join(",");
        let url = url::Url::parse_with_params(
            &self.url(PRICING_PATH),
            &[
                ("MarketplaceId", marketplace.as_str()),
                ("ItemType", item_type.param_value()),
                (item_type.list_param(), joined.as_str()),
            ],
        )
        .map_err(|e| BazaarError::Configuration(format!("Invalid pricing URL: {e}")))?;

        let body = self.send_json(Method::GET, url.to_string(), None).await?;
        let items = pricing_items(&body)?;

        tracing::debug!(item_type = %item_type, requested = identifiers.len(), items = items.len(), "Competitive pricing fetched");
        Ok(items)
    }
}
