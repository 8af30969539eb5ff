//! Report collaborator payloads

use crate::domain::{BazaarError, DocumentId, ReportId, Result};
use chrono::NaiveDate;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

/// Processing statuses after which no document will ever appear
pub const TERMINAL_FAILURE_STATUSES: [&str; 2] = ["FATAL", "CANCELLED"];

/// What to ask the collaborator to generate
#[derive(Debug, Clone, PartialEq)]
pub struct ReportSpec {
    /// Report type, e.g. `GET_SALES_AND_TRAFFIC_REPORT`
    pub report_type: String,

    /// First day covered (inclusive)
    pub start: Option<NaiveDate>,

    /// Last day covered (inclusive)
    pub end: Option<NaiveDate>,

    /// Marketplaces the report covers
    pub marketplace_ids: Vec<String>,

    /// Report-type specific options
    pub options: BTreeMap<String, String>,
}

impl ReportSpec {
    /// A report with no date range
    pub fn new(report_type: impl Into<String>) -> Self {
        Self {
            report_type: report_type.into(),
            start: None,
            end: None,
            marketplace_ids: Vec::new(),
            options: BTreeMap::new(),
        }
    }

    /// Restrict the report to `start..=end`
    pub fn with_range(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.start = Some(start);
        self.end = Some(end);
        self
    }

    /// Set the marketplaces the report covers
    pub fn with_marketplaces(mut self, marketplace_ids: Vec<String>) -> Self {
        self.marketplace_ids = marketplace_ids;
        self
    }

    /// Add a report option
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// JSON body for the create-report call
    pub fn to_body(&self) -> Value {
        let mut body = Map::new();
        body.insert("reportType".to_string(), json!(self.report_type));
        body.insert("marketplaceIds".to_string(), json!(self.marketplace_ids));
        if let Some(start) = self.start {
            body.insert("dataStartTime".to_string(), json!(start.to_string()));
        }
        if let Some(end) = self.end {
            body.insert("dataEndTime".to_string(), json!(end.to_string()));
        }
        if !self.options.is_empty() {
            body.insert("reportOptions".to_string(), json!(self.options));
        }
        Value::Object(body)
    }
}

/// Result of one status poll
#[derive(Debug, Clone, PartialEq)]
pub struct ReportPoll {
    /// Collaborator processing status, e.g. `IN_PROGRESS`, `DONE`, `FATAL`
    pub processing_status: Option<String>,

    /// Present once the report document is available
    pub document_id: Option<DocumentId>,
}

impl ReportPoll {
    /// Parse a get-report response
    pub fn from_payload(body: &Value) -> Self {
        let body = unwrap_payload(body);
        Self {
            processing_status: body
                .get("processingStatus")
                .and_then(Value::as_str)
                .map(str::to_string),
            document_id: body
                .get("reportDocumentId")
                .and_then(Value::as_str)
                .and_then(|id| DocumentId::new(id).ok()),
        }
    }

    /// Whether the collaborator gave up on the report
    pub fn is_terminal_failure(&self) -> bool {
        self.document_id.is_none()
            && self
                .processing_status
                .as_deref()
                .is_some_and(|s| TERMINAL_FAILURE_STATUSES.contains(&s))
    }
}

/// Location and encoding of a finished report
#[derive(Debug, Clone, PartialEq)]
pub struct ReportDocument {
    /// Pre-signed download URL
    pub url: String,

    /// Compression algorithm, e.g. `GZIP`
    pub compression: Option<String>,
}

impl ReportDocument {
    /// Parse a get-report-document response
    pub fn from_payload(body: &Value) -> Result<Self> {
        let body = unwrap_payload(body);
        let url = body
            .get("url")
            .and_then(Value::as_str)
            .filter(|u| !u.is_empty())
            .ok_or_else(|| BazaarError::Serialization("report document has no url".to_string()))?;

        Ok(Self {
            url: url.to_string(),
            compression: body
                .get("compressionAlgorithm")
                .and_then(Value::as_str)
                .map(str::to_string),
        })
    }

    /// Whether the document body is gzip-compressed
    pub fn is_gzip(&self) -> bool {
        self.compression
            .as_deref()
            .is_some_and(|c| c.eq_ignore_ascii_case("GZIP"))
    }
}

/// Parse a create-report response
pub fn report_id_from_payload(body: &Value) -> Result<ReportId> {
    let body = unwrap_payload(body);
    let id = match body.get("reportId") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => {
            return Err(BazaarError::Serialization(
                "create-report response has no reportId".to_string(),
            ))
        }
    };
    ReportId::new(id).map_err(BazaarError::Serialization)
}

// Older API versions wrap the body in `payload`.
fn unwrap_payload(body: &Value) -> &Value {
    match body.get("payload") {
        Some(inner @ Value::Object(_)) => inner,
        _ => body,
    }
}
