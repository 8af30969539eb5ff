//! Fetch jobs and query descriptions

use crate::adapters::marketplace::ApiCall;
use serde_json::Value;
use std::fmt;

/// Query parameter carrying the 1-based page number
pub const PAGE_NO_PARAM: &str = "pageNo";

/// Query parameter carrying the page size
pub const PAGE_SIZE_PARAM: &str = "pageSize";

/// What a single fetch job retrieves
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum JobKey {
    /// A 1-based page number
    Page(usize),
    /// An external identifier
    Id(String),
}

impl fmt::Display for JobKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobKey::Page(page) => write!(f, "page {page}"),
            JobKey::Id(id) => write!(f, "id {id}"),
        }
    }
}

/// A unit of work plus the records it produced
#[derive(Debug, Clone)]
pub struct FetchJob {
    key: JobKey,
    records: Vec<Value>,
}

impl FetchJob {
    /// Create a completed job
    pub fn new(key: JobKey, records: Vec<Value>) -> Self {
        Self { key, records }
    }

    /// Page or identifier this job fetched
    pub fn key(&self) -> &JobKey {
        &self.key
    }

    /// Records returned by the job
    pub fn records(&self) -> &[Value] {
        &self.records
    }

    /// Number of records returned by the job
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the job returned no records
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Consume the job, yielding its records
    pub fn into_records(self) -> Vec<Value> {
        self.records
    }
}

/// A paginated list endpoint
#[derive(Debug, Clone)]
pub struct PageQuery {
    /// Base call; page parameters are added per job
    pub call: ApiCall,

    /// Records per page
    pub page_size: usize,

    /// List key used when `result` is an object
    pub records_key: String,
}

impl PageQuery {
    /// Describe a paginated endpoint
    pub fn new(call: ApiCall, page_size: usize, records_key: impl Into<String>) -> Self {
        Self {
            call,
            page_size: page_size.max(1),
            records_key: records_key.into(),
        }
    }

    /// Call for page `page` (1-based)
    pub fn page_call(&self, page: usize) -> ApiCall {
        self.call
            .clone()
            .with_param(PAGE_NO_PARAM, page.to_string())
            .with_param(PAGE_SIZE_PARAM, self.page_size.to_string())
    }
}

/// An endpoint queried once per external identifier
#[derive(Debug, Clone)]
pub struct IdQuery {
    /// Base call; the identifier parameter is added per job
    pub call: ApiCall,

    /// Parameter name carrying the identifier, e.g. `orderId`
    pub id_param: String,

    /// List key used when `result` is an object
    pub records_key: String,
}

impl IdQuery {
    /// Describe an identifier-driven endpoint
    pub fn new(call: ApiCall, id_param: impl Into<String>, records_key: impl Into<String>) -> Self {
        Self {
            call,
            id_param: id_param.into(),
            records_key: records_key.into(),
        }
    }

    /// Call for identifier `id`
    pub fn id_call(&self, id: &str) -> ApiCall {
        self.call.clone().with_param(self.id_param.clone(), id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_call_sets_page_params() {
        let query = PageQuery::new(ApiCall::new("a/b").with_param("x", "1"), 50, "items");
        let call = query.page_call(3);
        assert_eq!(call.params.get("pageNo").map(String::as_str), Some("3"));
        assert_eq!(call.params.get("pageSize").map(String::as_str), Some("50"));
        assert_eq!(call.params.get("x").map(String::as_str), Some("1"));
    }

    #[test]
    fn test_page_size_never_zero() {
        let query = PageQuery::new(ApiCall::new("a/b"), 0, "items");
        assert_eq!(query.page_size, 1);
    }

    #[test]
    fn test_id_call_sets_id_param() {
        let query = IdQuery::new(ApiCall::new("a/b"), "orderId", "items");
        let call = query.id_call("9001");
        assert_eq!(call.params.get("orderId").map(String::as_str), Some("9001"));
    }

    #[test]
    fn test_job_key_display() {
        assert_eq!(JobKey::Page(2).to_string(), "page 2");
        assert_eq!(JobKey::Id("A1".to_string()).to_string(), "id A1");
    }
}
