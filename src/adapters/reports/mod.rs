//! Bulk report and pricing collaborator
//!
//! The report state machine drives a [`ReportsApi`] and competitive pricing ingest a
//! [`PricingApi`]; [`HttpReportsApi`] is the production implementation of both.

pub mod client;
pub mod models;
pub mod pricing;

pub use client::{HttpReportsApi, ReportsApi};
pub use models::{ReportDocument, ReportPoll, ReportSpec};
pub use pricing::{ItemType, PricingApi, MAX_ITEMS_PER_REQUEST};
