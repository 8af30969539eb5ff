//! Integration tests for bulk reports: windowing, phase ordering and stage failures

use async_trait::async_trait;
use bazaar::adapters::database::MemorySink;
use bazaar::adapters::reports::{ReportDocument, ReportPoll, ReportSpec, ReportsApi};
use bazaar::config::FetchConfig;
use bazaar::core::ingest::{IngestCoordinator, ReportIngest};
use bazaar::core::report::{BulkReportRunner, ContentShape};
use bazaar::domain::{BazaarError, DocumentId, ReportId, ReportStage, Result};
use chrono::NaiveDate;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::collections::{BTreeMap, HashMap};
use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::Duration;

const REPORT_TYPE: &str = "GET_SALES_AND_TRAFFIC_REPORT";

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn gzip(bytes: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(bytes).unwrap();
    encoder.finish().unwrap()
}

/// Scripted collaborator that records every call in order
#[derive(Default)]
struct ScriptedReports {
    events: Mutex<Vec<String>>,
    specs: Mutex<Vec<ReportSpec>>,
    polls: Mutex<HashMap<String, usize>>,
    polls_before_ready: usize,
    fatal_report: Option<usize>,
    garbage_document: bool,
    gzip_documents: bool,
}

impl ScriptedReports {
    fn log(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }

    fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    fn index_of(id: &str) -> usize {
        id.trim_start_matches("report-")
            .trim_start_matches("doc-")
            .parse()
            .unwrap()
    }
}

#[async_trait]
impl ReportsApi for ScriptedReports {
    async fn create_report(&self, spec: &ReportSpec) -> Result<ReportId> {
        let mut specs = self.specs.lock().unwrap();
        let index = specs.len();
        specs.push(spec.clone());
        self.log(format!("create:{index}"));
        Ok(ReportId::new(format!("report-{index}")).unwrap())
    }

    async fn get_report(&self, report_id: &ReportId) -> Result<ReportPoll> {
        let index = Self::index_of(report_id.as_str());
        self.log(format!("poll:{index}"));

        let count = {
            let mut polls = self.polls.lock().unwrap();
            let count = polls.entry(report_id.as_str().to_string()).or_insert(0);
            *count += 1;
            *count
        };

        if self.fatal_report == Some(index) {
            return Ok(ReportPoll {
                processing_status: Some("FATAL".to_string()),
                document_id: None,
            });
        }

        if count > self.polls_before_ready {
            Ok(ReportPoll {
                processing_status: Some("DONE".to_string()),
                document_id: Some(DocumentId::new(format!("doc-{index}")).unwrap()),
            })
        } else {
            Ok(ReportPoll {
                processing_status: Some("IN_PROGRESS".to_string()),
                document_id: None,
            })
        }
    }

    async fn get_report_document(&self, document_id: &DocumentId) -> Result<ReportDocument> {
        let index = Self::index_of(document_id.as_str());
        self.log(format!("document:{index}"));
        Ok(ReportDocument {
            url: format!("https://reports.example.com/{index}"),
            compression: self.gzip_documents.then(|| "GZIP".to_string()),
        })
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>> {
        let index: usize = url.rsplit('/').next().unwrap().parse().unwrap();
        self.log(format!("download:{index}"));

        if self.garbage_document {
            return Ok(b"{ this is not json".to_vec());
        }

        let spec = self.specs.lock().unwrap()[index].clone();
        let start = spec.start.map(|d| d.to_string()).unwrap_or_default();
        let body = format!("date\tsku\tunits\n{start}\tSKU-{index}\t{}\n", index + 1);

        Ok(if self.gzip_documents {
            gzip(body.as_bytes())
        } else {
            body.into_bytes()
        })
    }
}

fn runner(api: Arc<ScriptedReports>, window_days: u32) -> BulkReportRunner {
    BulkReportRunner::new(api, Duration::ZERO, Duration::ZERO, window_days)
        .with_marketplaces(vec!["A1F83G8C2ARO7P".to_string()])
}

/// Position of the first and last event with `prefix`
fn span(events: &[String], prefix: &str) -> (usize, usize) {
    let positions: Vec<usize> = events
        .iter()
        .enumerate()
        .filter(|(_, e)| e.starts_with(prefix))
        .map(|(i, _)| i)
        .collect();
    (positions[0], positions[positions.len() - 1])
}

#[tokio::test]
async fn test_three_windows_run_in_non_interleaved_phases() {
    let api = Arc::new(ScriptedReports {
        polls_before_ready: 2,
        ..Default::default()
    });

    let rows = runner(api.clone(), 30)
        .run(
            REPORT_TYPE,
            day(2025, 1, 1),
            day(2025, 3, 31),
            &BTreeMap::new(),
            &ContentShape::tsv(),
        )
        .await
        .unwrap();

    // Windows are contiguous, inclusive and cover the whole range
    let specs = api.specs.lock().unwrap().clone();
    let windows: Vec<(NaiveDate, NaiveDate)> = specs
        .iter()
        .map(|s| (s.start.unwrap(), s.end.unwrap()))
        .collect();
    assert_eq!(
        windows,
        vec![
            (day(2025, 1, 1), day(2025, 1, 30)),
            (day(2025, 1, 31), day(2025, 3, 1)),
            (day(2025, 3, 2), day(2025, 3, 31)),
        ]
    );
    assert!(specs.iter().all(|s| s.marketplace_ids == vec!["A1F83G8C2ARO7P"]));

    // Every create precedes every poll, every poll precedes every document lookup
    let events = api.events();
    let creates = span(&events, "create:");
    let polls = span(&events, "poll:");
    let documents = span(&events, "document:");
    assert!(creates.1 < polls.0);
    assert!(polls.1 < documents.0);
    assert_eq!(events.iter().filter(|e| e.starts_with("create:")).count(), 3);
    assert_eq!(events.iter().filter(|e| e.starts_with("download:")).count(), 3);

    // Rows come back in window order
    assert_eq!(rows.len(), 3);
    let skus: Vec<&str> = rows.iter().map(|r| r["sku"].as_str().unwrap()).collect();
    assert_eq!(skus, vec!["SKU-0", "SKU-1", "SKU-2"]);
    assert_eq!(rows[1]["date"], "2025-01-31");
}

#[tokio::test]
async fn test_gzip_documents_are_decoded() {
    let api = Arc::new(ScriptedReports {
        gzip_documents: true,
        ..Default::default()
    });

    let rows = runner(api, 7)
        .run(
            REPORT_TYPE,
            day(2025, 6, 1),
            day(2025, 6, 10),
            &BTreeMap::new(),
            &ContentShape::tsv(),
        )
        .await
        .unwrap();

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["units"], "1");
}

#[tokio::test]
async fn test_fatal_status_fails_at_poll_before_any_download() {
    let api = Arc::new(ScriptedReports {
        polls_before_ready: 1,
        fatal_report: Some(1),
        ..Default::default()
    });

    let err = runner(api.clone(), 30)
        .run(
            REPORT_TYPE,
            day(2025, 1, 1),
            day(2025, 3, 31),
            &BTreeMap::new(),
            &ContentShape::tsv(),
        )
        .await
        .unwrap_err();

    match err {
        BazaarError::Report { stage, message } => {
            assert_eq!(stage, ReportStage::Poll);
            assert!(message.contains("FATAL"));
        }
        other => panic!("expected report error, got {other:?}"),
    }
    assert!(!api.events().iter().any(|e| e.starts_with("download:")));
}

#[tokio::test]
async fn test_undecodable_document_fails_at_decode() {
    let api = Arc::new(ScriptedReports {
        garbage_document: true,
        ..Default::default()
    });

    let err = runner(api, 30)
        .run_single(REPORT_TYPE, &BTreeMap::new(), &ContentShape::json("dataByAsin"))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        BazaarError::Report {
            stage: ReportStage::Decode,
            ..
        }
    ));
}

#[tokio::test]
async fn test_report_ingest_replaces_rows_for_the_same_range() {
    let api = Arc::new(ScriptedReports::default());
    let sink = Arc::new(MemorySink::new());
    let coordinator = IngestCoordinator::new(sink.clone(), FetchConfig::default())
        .with_reports(runner(api.clone(), 30));

    let request = ReportIngest {
        report_type: REPORT_TYPE.to_string(),
        range: Some((day(2025, 1, 1), day(2025, 3, 31))),
        options: BTreeMap::new(),
        shape: ContentShape::tsv(),
        table: "sales_traffic".to_string(),
        date_column: Some("date".to_string()),
    };

    let first = coordinator.ingest_bulk_report(&request).await.unwrap();
    assert!(first.success);
    assert_eq!(first.records_fetched, 3);
    assert_eq!(first.rows_written(), 3);

    // A second load of the same range replaces rather than duplicates
    let second = coordinator.ingest_bulk_report(&request).await.unwrap();
    assert_eq!(second.rows_written(), 3);
    assert_eq!(sink.rows("sales_traffic").await.len(), 3);
}

#[tokio::test]
async fn test_report_ingest_requires_reports_section() {
    let coordinator = IngestCoordinator::new(Arc::new(MemorySink::new()), FetchConfig::default());
    let request = ReportIngest {
        report_type: REPORT_TYPE.to_string(),
        range: None,
        options: BTreeMap::new(),
        shape: ContentShape::tsv(),
        table: "sales_traffic".to_string(),
        date_column: None,
    };

    let err = coordinator.ingest_bulk_report(&request).await.unwrap_err();
    assert!(matches!(err, BazaarError::Configuration(_)));
}
