//! Report lifecycle state machine
//!
//! ```text
//! Requested -> Polling -> Ready -> Downloaded
//!     \           \         \
//!      +-----------+---------+--> Failed
//! ```
//!
//! Each transition is driven by one collaborator call. A failed call moves the request
//! to `Failed` and returns a [`BazaarError::Report`] naming the stage.

use super::decode::{decode_document, ContentShape};
use crate::adapters::reports::{ReportSpec, ReportsApi};
use crate::domain::{BazaarError, DocumentId, Record, ReportId, ReportStage, Result};
use crate::log_report_transition;
use std::fmt;

/// Lifecycle status of a report request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportStatus {
    /// Not yet acknowledged by the collaborator
    Requested,
    /// Report identifier assigned, waiting for a document
    Polling,
    /// Document identifier known
    Ready,
    /// Document fetched and decoded (terminal)
    Downloaded,
    /// A stage failed (terminal)
    Failed,
}

impl ReportStatus {
    /// Whether no further transitions are possible
    pub fn is_terminal(self) -> bool {
        matches!(self, ReportStatus::Downloaded | ReportStatus::Failed)
    }
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReportStatus::Requested => "Requested",
            ReportStatus::Polling => "Polling",
            ReportStatus::Ready => "Ready",
            ReportStatus::Downloaded => "Downloaded",
            ReportStatus::Failed => "Failed",
        };
        f.write_str(name)
    }
}

/// One report moving through its lifecycle
#[derive(Debug, Clone)]
pub struct ReportRequest {
    spec: ReportSpec,
    shape: ContentShape,
    status: ReportStatus,
    report_id: Option<ReportId>,
    document_id: Option<DocumentId>,
    compressed: bool,
}

impl ReportRequest {
    /// A request that has not been submitted yet
    pub fn new(spec: ReportSpec, shape: ContentShape) -> Self {
        Self {
            spec,
            shape,
            status: ReportStatus::Requested,
            report_id: None,
            document_id: None,
            compressed: false,
        }
    }

    /// What was requested
    pub fn spec(&self) -> &ReportSpec {
        &self.spec
    }

    /// Current status
    pub fn status(&self) -> ReportStatus {
        self.status
    }

    /// Identifier assigned by the create call
    pub fn report_id(&self) -> Option<&ReportId> {
        self.report_id.as_ref()
    }

    /// Document identifier, once ready
    pub fn document_id(&self) -> Option<&DocumentId> {
        self.document_id.as_ref()
    }

    /// Whether the document was gzip-compressed
    pub fn compressed(&self) -> bool {
        self.compressed
    }

    /// Whether the document identifier is known
    pub fn is_ready(&self) -> bool {
        self.status == ReportStatus::Ready
    }

    /// Submit the create-report call: `Requested -> Polling`
    ///
    /// # Errors
    ///
    /// Returns a create-stage error if the call fails.
    pub async fn submit(&mut self, api: &dyn ReportsApi) -> Result<()> {
        self.expect_status(ReportStatus::Requested, ReportStage::Create)?;

        match api.create_report(&self.spec).await {
            Ok(report_id) => {
                tracing::debug!(
                    report_type = %self.spec.report_type,
                    report_id = %report_id,
                    "Report submitted"
                );
                self.report_id = Some(report_id);
                self.transition(ReportStatus::Polling);
                Ok(())
            }
            Err(e) => Err(self.fail(ReportStage::Create, e)),
        }
    }

    /// Poll once; returns `true` on `Polling -> Ready`
    ///
    /// # Errors
    ///
    /// Returns a poll-stage error if the call fails or the collaborator reports a
    /// terminal failure status.
    pub async fn poll_once(&mut self, api: &dyn ReportsApi) -> Result<bool> {
        self.expect_status(ReportStatus::Polling, ReportStage::Poll)?;
        let Some(report_id) = self.report_id.clone() else {
            return Err(self.fail_with(ReportStage::Poll, "report has no identifier"));
        };

        let poll = match api.get_report(&report_id).await {
            Ok(poll) => poll,
            Err(e) => return Err(self.fail(ReportStage::Poll, e)),
        };

        if let Some(document_id) = poll.document_id.clone() {
            self.document_id = Some(document_id);
            self.transition(ReportStatus::Ready);
            return Ok(true);
        }

        if poll.is_terminal_failure() {
            let status = poll.processing_status.unwrap_or_default();
            return Err(self.fail_with(
                ReportStage::Poll,
                format!("report {report_id} finished with status {status}"),
            ));
        }

        Ok(false)
    }

    /// Fetch and decode the document: `Ready -> Downloaded`
    ///
    /// # Errors
    ///
    /// Returns a download-stage error if the document lookup or byte fetch fails, and a
    /// decode-stage error if the content cannot be decoded.
    pub async fn download(&mut self, api: &dyn ReportsApi) -> Result<Vec<Record>> {
        self.expect_status(ReportStatus::Ready, ReportStage::Download)?;
        let Some(document_id) = self.document_id.clone() else {
            return Err(self.fail_with(ReportStage::Download, "report has no document"));
        };

        let document = match api.get_report_document(&document_id).await {
            Ok(document) => document,
            Err(e) => return Err(self.fail(ReportStage::Download, e)),
        };
        self.compressed = document.is_gzip();

        let bytes = match api.download(&document.url).await {
            Ok(bytes) => bytes,
            Err(e) => return Err(self.fail(ReportStage::Download, e)),
        };

        match decode_document(&bytes, self.compressed, &self.shape) {
            Ok(rows) => {
                tracing::info!(
                    report_type = %self.spec.report_type,
                    document_id = %document_id,
                    rows = rows.len(),
                    compressed = self.compressed,
                    "Report document decoded"
                );
                self.transition(ReportStatus::Downloaded);
                Ok(rows)
            }
            Err(e) => Err(self.fail(ReportStage::Decode, e)),
        }
    }

    fn expect_status(&self, expected: ReportStatus, stage: ReportStage) -> Result<()> {
        if self.status == expected {
            Ok(())
        } else {
            Err(BazaarError::report(
                stage,
                format!("expected status {expected}, found {}", self.status),
            ))
        }
    }

    fn transition(&mut self, to: ReportStatus) {
        log_report_transition!(self.spec.report_type, self.status, to);
        self.status = to;
    }

    fn fail(&mut self, stage: ReportStage, source: BazaarError) -> BazaarError {
        match source {
            BazaarError::Report { message, .. } => self.fail_with(stage, message),
            other => self.fail_with(stage, other.to_string()),
        }
    }

    fn fail_with(&mut self, stage: ReportStage, message: impl Into<String>) -> BazaarError {
        let message = message.into();
        tracing::error!(
            report_type = %self.spec.report_type,
            stage = %stage,
            error = %message,
            "Report failed"
        );
        self.transition(ReportStatus::Failed);
        BazaarError::report(stage, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::reports::{ReportDocument, ReportPoll};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct ScriptedApi {
        polls_before_ready: usize,
        polls: AtomicUsize,
        final_status: &'static str,
        body: Vec<u8>,
        fail_create: bool,
    }

    impl ScriptedApi {
        fn ready_after(polls_before_ready: usize) -> Self {
            Self {
                polls_before_ready,
                polls: AtomicUsize::new(0),
                final_status: "DONE",
                body: b"sku\tqty\nA1\t2\n".to_vec(),
                fail_create: false,
            }
        }
    }

    #[async_trait]
    impl ReportsApi for ScriptedApi {
        async fn create_report(&self, _spec: &ReportSpec) -> Result<ReportId> {
            if self.fail_create {
                return Err(BazaarError::Other("quota exceeded".to_string()));
            }
            Ok(ReportId::new("r-1").unwrap())
        }

        async fn get_report(&self, _report_id: &ReportId) -> Result<ReportPoll> {
            let n = self.polls.fetch_add(1, Ordering::SeqCst);
            if n < self.polls_before_ready {
                return Ok(ReportPoll {
                    processing_status: Some("IN_PROGRESS".to_string()),
                    document_id: None,
                });
            }
            if self.final_status != "DONE" {
                return Ok(ReportPoll {
                    processing_status: Some(self.final_status.to_string()),
                    document_id: None,
                });
            }
            Ok(ReportPoll {
                processing_status: Some("DONE".to_string()),
                document_id: Some(DocumentId::new("doc-1").unwrap()),
            })
        }

        async fn get_report_document(&self, _id: &DocumentId) -> Result<ReportDocument> {
            Ok(ReportDocument {
                url: "https://example.com/doc-1".to_string(),
                compression: None,
            })
        }

        async fn download(&self, _url: &str) -> Result<Vec<u8>> {
            Ok(self.body.clone())
        }
    }

    fn request() -> ReportRequest {
        ReportRequest::new(
            ReportSpec::new("GET_MERCHANT_LISTINGS_ALL_DATA"),
            ContentShape::tsv(),
        )
    }

    #[tokio::test]
    async fn test_full_lifecycle() {
        let api = ScriptedApi::ready_after(2);
        let mut req = request();

        req.submit(&api).await.unwrap();
        assert_eq!(req.status(), ReportStatus::Polling);

        assert!(!req.poll_once(&api).await.unwrap());
        assert!(!req.poll_once(&api).await.unwrap());
        assert!(req.poll_once(&api).await.unwrap());
        assert_eq!(req.status(), ReportStatus::Ready);

        let rows = req.download(&api).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(req.status(), ReportStatus::Downloaded);
        assert!(req.status().is_terminal());
    }

    #[tokio::test]
    async fn test_create_failure_names_stage() {
        let api = ScriptedApi {
            fail_create: true,
            ..ScriptedApi::ready_after(0)
        };
        let mut req = request();

        let err = req.submit(&api).await.unwrap_err();
        assert!(matches!(
            err,
            BazaarError::Report {
                stage: ReportStage::Create,
                ..
            }
        ));
        assert_eq!(req.status(), ReportStatus::Failed);
    }

    #[tokio::test]
    async fn test_fatal_status_fails_at_poll() {
        let api = ScriptedApi {
            final_status: "FATAL",
            ..ScriptedApi::ready_after(0)
        };
        let mut req = request();
        req.submit(&api).await.unwrap();

        let err = req.poll_once(&api).await.unwrap_err();
        assert!(matches!(
            err,
            BazaarError::Report {
                stage: ReportStage::Poll,
                ..
            }
        ));
        assert_eq!(req.status(), ReportStatus::Failed);
    }

    #[tokio::test]
    async fn test_decode_failure_names_stage() {
        let api = ScriptedApi {
            body: b"a\tb\n1\t2\t3\n".to_vec(),
            ..ScriptedApi::ready_after(0)
        };
        let mut req = request();
        req.submit(&api).await.unwrap();
        req.poll_once(&api).await.unwrap();

        let err = req.download(&api).await.unwrap_err();
        assert!(matches!(
            err,
            BazaarError::Report {
                stage: ReportStage::Decode,
                ..
            }
        ));
        assert_eq!(req.status(), ReportStatus::Failed);
    }

    #[tokio::test]
    async fn test_download_before_ready_is_rejected() {
        let api = ScriptedApi::ready_after(0);
        let mut req = request();
        assert!(req.download(&api).await.is_err());
        assert_eq!(req.status(), ReportStatus::Requested);
    }
}
