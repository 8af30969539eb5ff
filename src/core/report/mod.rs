//! Asynchronous bulk reports
//!
//! - [`machine`] - the create, poll, download, decode lifecycle of one report
//! - [`windows`] - splitting a date range into report windows
//! - [`bulk`] - running many windows in three non-interleaved phases
//! - [`decode`] - gzip, charset and content-shape decoding

pub mod bulk;
pub mod decode;
pub mod machine;
pub mod windows;

pub use bulk::BulkReportRunner;
pub use decode::{decode_document, ContentShape};
pub use machine::{ReportRequest, ReportStatus};
pub use windows::{split_windows, ReportWindow};
