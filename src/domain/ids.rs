//! Domain identifier types with validation
//!
//! Newtype wrappers for the identifiers that flow through the pipeline: report and
//! document identifiers handed out by the report collaborator, ASINs accepted from
//! callers, and the correlation/durable keys used while stitching foreign keys.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Report identifier assigned by the create-report call
///
/// # Examples
///
/// ```
/// use bazaar::domain::ids::ReportId;
///
/// let id = ReportId::new("50039018867").unwrap();
/// assert_eq!(id.as_str(), "50039018867");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReportId(String);

impl ReportId {
    /// Creates a new ReportId, rejecting blank values
    pub fn new(id: impl Into<String>) -> Result<Self, String> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err("Report ID cannot be empty".to_string());
        }
        Ok(Self(id))
    }

    /// Returns the report ID as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReportId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Report document identifier exposed by a status poll once the report is ready
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentId(String);

impl DocumentId {
    /// Creates a new DocumentId, rejecting blank values
    pub fn new(id: impl Into<String>) -> Result<Self, String> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err("Document ID cannot be empty".to_string());
        }
        Ok(Self(id))
    }

    /// Returns the document ID as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Amazon Standard Identification Number
///
/// Exactly 10 ASCII alphanumeric characters. Input is trimmed and upper-cased.
///
/// # Examples
///
/// ```
/// use bazaar::domain::ids::Asin;
/// use std::str::FromStr;
///
/// let asin = Asin::from_str(" b08n5wrwnw ").unwrap();
/// assert_eq!(asin.as_str(), "B08N5WRWNW");
/// assert!(Asin::from_str("SHORT").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Asin(String);

impl Asin {
    /// Length of every valid ASIN
    pub const LEN: usize = 10;

    /// Creates a new Asin after trimming and validating the input
    pub fn new(asin: impl AsRef<str>) -> Result<Self, String> {
        let asin = asin.as_ref().trim();
        if asin.len() != Self::LEN || !asin.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(format!(
                "Invalid ASIN '{asin}': expected {} alphanumeric characters",
                Self::LEN
            ));
        }
        Ok(Self(asin.to_ascii_uppercase()))
    }

    /// Returns the ASIN as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Asin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Asin {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// Seller SKU, the merchant's own identifier for a listing
///
/// Input is trimmed; case is preserved. At most 40 characters and no commas, since
/// SKUs travel comma-joined in pricing requests.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SellerSku(String);

impl SellerSku {
    /// Longest SKU accepted
    pub const MAX_LEN: usize = 40;

    /// Creates a new SellerSku after trimming and validating the input
    pub fn new(sku: impl AsRef<str>) -> Result<Self, String> {
        let sku = sku.as_ref().trim();
        if sku.is_empty() {
            return Err("SKU cannot be empty".to_string());
        }
        if sku.chars().count() > Self::MAX_LEN {
            return Err(format!(
                "Invalid SKU '{sku}': longer than {} characters",
                Self::MAX_LEN
            ));
        }
        if sku.contains(',') {
            return Err(format!("Invalid SKU '{sku}': contains a comma"));
        }
        Ok(Self(sku.to_string()))
    }

    /// Returns the SKU as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SellerSku {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SellerSku {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// Process-local key linking a main-table row to its child rows before persistence
///
/// Equal to the row's position in the normalized input collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CorrelationKey(usize);

impl CorrelationKey {
    /// Creates a correlation key for the row at `position`
    pub fn new(position: usize) -> Self {
        Self(position)
    }

    /// Position of the main row this key was assigned to
    pub fn position(&self) -> usize {
        self.0
    }
}

impl fmt::Display for CorrelationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identifier assigned by the relational sink when a row is stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DurableId(i64);

impl DurableId {
    /// Wraps a sink-assigned identifier
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Raw identifier value
    pub fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for DurableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
