//! Ingest coordinator - composes fetching, normalization and persistence
//!
//! Each `ingest_*` method is one top-level operation. Methods return `Err` for failures
//! that stop the operation; [`super::guard`] turns those (and panics) into an
//! [`IngestOutcome`].

use super::endpoints::{gateway_timestamp, Endpoint};
use super::outcome::IngestOutcome;
use crate::adapters::database::{create_sink, RelationalSink, WriteMode};
use crate::adapters::marketplace::{ApiCall, MarketplaceApi, SignedClient};
use crate::adapters::reports::{HttpReportsApi, ItemType, PricingApi, MAX_ITEMS_PER_REQUEST};
use crate::config::{BazaarConfig, FetchConfig};
use crate::core::fetch::{FetchEngine, IdQuery, PageQuery};
use crate::core::normalize::{
    normalize, persist_record_set, PersistPolicy, Projection, ReconcileStrategy, ShapingOptions,
    TableWrite,
};
use crate::core::report::{BulkReportRunner, ContentShape};
use crate::domain::{BazaarError, Record, Result};
use chrono::{NaiveDate, Utc};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;

/// A listing fetch over a known endpoint
#[derive(Debug, Clone)]
pub struct ListingRequest {
    pub endpoint: Endpoint,
    /// Destination table; the endpoint's default when `None`
    pub table: Option<String>,
    /// Inclusive date range passed to the endpoint and used for the pre-delete
    pub range: Option<(NaiveDate, NaiveDate)>,
    /// Walk pages one at a time instead of using the worker pool
    pub sequential: bool,
    /// Extra call parameters
    pub params: BTreeMap<String, String>,
}

impl ListingRequest {
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            table: None,
            range: None,
            sequential: false,
            params: BTreeMap::new(),
        }
    }

    pub fn with_range(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.range = Some((start, end));
        self
    }

    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    pub fn sequential(mut self, sequential: bool) -> Self {
        self.sequential = sequential;
        self
    }

    fn table(&self) -> String {
        self.table
            .clone()
            .unwrap_or_else(|| self.endpoint.default_table().to_string())
    }

    fn call(&self) -> ApiCall {
        let mut call = ApiCall::new(self.endpoint.api_name());
        for (key, value) in self.endpoint.fixed_params() {
            call = call.with_param(*key, *value);
        }
        if let (Some((start, end)), Some((start_param, end_param))) =
            (self.range, self.endpoint.range_params())
        {
            call = call
                .with_param(start_param, gateway_timestamp(start, false))
                .with_param(end_param, gateway_timestamp(end, true));
        }
        for (key, value) in &self.params {
            call = call.with_param(key.clone(), value.clone());
        }
        call
    }
}

/// A bulk report fetch
#[derive(Debug, Clone)]
pub struct ReportIngest {
    pub report_type: String,
    /// Inclusive date range split into windows; a single undated report when `None`
    pub range: Option<(NaiveDate, NaiveDate)>,
    pub options: BTreeMap<String, String>,
    pub shape: ContentShape,
    pub table: String,
    /// Column compared against the range when replacing previously loaded rows
    pub date_column: Option<String>,
}

/// Orchestrates one ingest operation at a time against shared collaborators
pub struct IngestCoordinator {
    sink: Arc<dyn RelationalSink>,
    engine: Option<FetchEngine>,
    fetch: FetchConfig,
    reports: Option<BulkReportRunner>,
    pricing: Option<Arc<dyn PricingApi>>,
    strategy: ReconcileStrategy,
    pricing_policy: PersistPolicy,
    shutdown: Option<watch::Receiver<bool>>,
}

impl IngestCoordinator {
    /// Create a coordinator writing to `sink`, with no upstream collaborators yet
    pub fn new(sink: Arc<dyn RelationalSink>, fetch: FetchConfig) -> Self {
        Self {
            sink,
            engine: None,
            fetch,
            reports: None,
            pricing: None,
            strategy: ReconcileStrategy::default(),
            pricing_policy: PersistPolicy::default(),
            shutdown: None,
        }
    }

    /// Build every collaborator the configuration describes
    ///
    /// # Errors
    ///
    /// Returns an error if the sink or an HTTP client cannot be created.
    pub async fn from_config(config: &BazaarConfig, shutdown: watch::Receiver<bool>) -> Result<Self> {
        let sink = create_sink(config).await?;
        let marketplace: Arc<dyn MarketplaceApi> = Arc::new(SignedClient::new(&config.marketplace)?);

        let mut coordinator = Self::new(sink, config.fetch.clone())
            .with_shutdown(shutdown)
            .with_marketplace(marketplace);

        if let Some(reports_config) = &config.reports {
            let api = Arc::new(HttpReportsApi::new(reports_config)?);
            let runner = BulkReportRunner::from_config(api.clone(), reports_config);
            coordinator = coordinator
                .with_reports(runner)
                .with_pricing(api)
                .with_pricing_history(reports_config.pricing_history);
        }

        Ok(coordinator)
    }

    /// Abort fetches and report polling when `shutdown` flips to `true`
    ///
    /// Collaborators added after this call inherit the signal.
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.engine = self.engine.map(|e| e.with_shutdown(shutdown.clone()));
        self.reports = self.reports.map(|r| r.with_shutdown(shutdown.clone()));
        self.shutdown = Some(shutdown);
        self
    }

    /// Marketplace API used for listing and ID fetches
    pub fn with_marketplace(mut self, api: Arc<dyn MarketplaceApi>) -> Self {
        let mut engine = FetchEngine::from_config(api, &self.fetch);
        if let Some(rx) = &self.shutdown {
            engine = engine.with_shutdown(rx.clone());
        }
        self.engine = Some(engine);
        self
    }

    /// Runner used for bulk reports
    pub fn with_reports(mut self, runner: BulkReportRunner) -> Self {
        self.reports = Some(match &self.shutdown {
            Some(rx) => runner.with_shutdown(rx.clone()),
            None => runner,
        });
        self
    }

    /// Pricing collaborator used for competitive pricing
    pub fn with_pricing(mut self, pricing: Arc<dyn PricingApi>) -> Self {
        self.pricing = Some(pricing);
        self
    }

    /// Append pricing snapshots instead of replacing the previous one
    pub fn with_pricing_history(mut self, keep: bool) -> Self {
        self.pricing_policy = if keep {
            PersistPolicy::History
        } else {
            PersistPolicy::Snapshot
        };
        self
    }

    /// How main-table identifiers are reconciled
    pub fn with_reconcile_strategy(mut self, strategy: ReconcileStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// The relational sink
    pub fn sink(&self) -> &Arc<dyn RelationalSink> {
        &self.sink
    }

    /// Fetch competitive pricing for `inputs` and store it as linked tables
    ///
    /// Tables are named after the item type's suffix followed by `suffix`, so SKU runs
    /// write `competitive_pricing_main{suffix}` and ASIN runs write
    /// `competitive_pricing_main_competitors{suffix}`. Invalid identifiers are skipped
    /// and counted as soft failures; duplicates are fetched once.
    ///
    /// # Errors
    ///
    /// Fails if no identifier is valid, a pricing call fails, or the main table cannot
    /// be written and reconciled.
    pub async fn ingest_competitive_pricing(
        &self,
        item_type: ItemType,
        inputs: &[String],
        suffix: &str,
    ) -> Result<IngestOutcome> {
        let started = Instant::now();
        let pricing = self.pricing.as_ref().ok_or_else(|| {
            BazaarError::Configuration("[reports] section is required for pricing".to_string())
        })?;

        let (valid, rejected) = parse_identifiers(item_type, inputs);
        if valid.is_empty() {
            return Err(BazaarError::Validation(format!(
                "No valid {item_type} identifiers supplied ({} rejected)",
                rejected.len()
            )));
        }

        tracing::info!(
            item_type = %item_type,
            items = valid.len(),
            rejected = rejected.len(),
            batches = valid.len().div_ceil(MAX_ITEMS_PER_REQUEST),
            policy = ?self.pricing_policy,
            "Fetching competitive pricing"
        );

        let mut items = Vec::with_capacity(valid.len());
        for batch in valid.chunks(MAX_ITEMS_PER_REQUEST) {
            self.ensure_running(items.len())?;
            let fetched = pricing
                .competitive_pricing(item_type, batch)
                .await
                .map_err(|e| BazaarError::PartialFetch {
                    collected: items.len(),
                    expected: valid.len(),
                    source: Box::new(e),
                })?;
            items.extend(fetched);
        }

        let projection =
            Projection::competitive_pricing(&format!("{}{suffix}", item_type.table_suffix()));
        let set = normalize(&projection, &items, Utc::now());
        let report =
            persist_record_set(self.sink.as_ref(), &set, self.strategy, self.pricing_policy)
                .await?;

        let mut outcome = IngestOutcome::new("pricing");
        outcome.records_fetched = items.len();
        outcome.add_soft_failures(rejected.len());
        outcome.add_stitch_report(report);
        Ok(outcome.finish(started.elapsed()))
    }

    /// Fetch every page of a listing endpoint into one table
    ///
    /// # Errors
    ///
    /// Fails if any page fails or the table cannot be written.
    pub async fn ingest_listing(&self, request: &ListingRequest) -> Result<IngestOutcome> {
        let started = Instant::now();
        let engine = self.engine()?;

        let query = PageQuery::new(request.call(), self.fetch.page_size, &self.fetch.records_key);
        let records = if request.sequential {
            engine.fetch_sequential(&query).await?
        } else {
            engine.fetch_pages(&query).await?
        };
        let fetched = records.len();

        let shaping = request.endpoint.shaping();
        let rows = shaping.apply(records);
        let mode = listing_mode(request, &shaping);

        let mut outcome = IngestOutcome::new(request.endpoint.to_string());
        outcome.records_fetched = fetched;
        outcome.add_table(self.write_table(&request.table(), &rows, &mode).await?);
        Ok(outcome.finish(started.elapsed()))
    }

    /// Fetch one call per identifier into one table
    ///
    /// # Errors
    ///
    /// Fails if any identifier's call fails or the table cannot be written.
    pub async fn ingest_by_ids(
        &self,
        request: &ListingRequest,
        ids: &[String],
    ) -> Result<IngestOutcome> {
        let started = Instant::now();
        let engine = self.engine()?;

        let query = IdQuery::new(
            request.call(),
            request.endpoint.id_param(),
            &self.fetch.records_key,
        );
        let jobs = engine.fetch_by_ids(&query, ids).await?;
        let records: Vec<_> = jobs.into_iter().flat_map(|j| j.into_records()).collect();
        let fetched = records.len();

        let rows = request.endpoint.shaping().apply(records);
        let mode = match request.endpoint.id_column() {
            Some(column) => WriteMode::AppendReplacingIds {
                column: column.to_string(),
            },
            None => WriteMode::Append,
        };

        let mut outcome = IngestOutcome::new(format!("{}-by-id", request.endpoint));
        outcome.records_fetched = fetched;
        outcome.add_table(self.write_table(&request.table(), &rows, &mode).await?);
        Ok(outcome.finish(started.elapsed()))
    }

    /// Run a bulk report and store its rows in one table
    ///
    /// With a date column, rows previously loaded for the same range are replaced.
    ///
    /// # Errors
    ///
    /// Fails if any window fails at any stage or the table cannot be written.
    pub async fn ingest_bulk_report(&self, request: &ReportIngest) -> Result<IngestOutcome> {
        let started = Instant::now();
        let runner = self.reports.as_ref().ok_or_else(|| {
            BazaarError::Configuration("[reports] section is required for reports".to_string())
        })?;

        let (rows, mode) = match request.range {
            Some((start, end)) => {
                let rows = runner
                    .run(&request.report_type, start, end, &request.options, &request.shape)
                    .await?;
                let mode = match &request.date_column {
                    Some(column) => WriteMode::AppendReplacingDateRange {
                        column: column.clone(),
                        start,
                        end,
                    },
                    None => WriteMode::Append,
                };
                (rows, mode)
            }
            None => {
                let rows = runner
                    .run_single(&request.report_type, &request.options, &request.shape)
                    .await?;
                (rows, WriteMode::Replace)
            }
        };

        let mut outcome = IngestOutcome::new("report");
        outcome.records_fetched = rows.len();
        outcome.add_table(self.write_table(&request.table, &rows, &mode).await?);
        Ok(outcome.finish(started.elapsed()))
    }

    async fn write_table(&self, table: &str, rows: &[Record], mode: &WriteMode) -> Result<TableWrite> {
        if rows.is_empty() {
            tracing::warn!(table = table, "No rows to write");
            return Ok(TableWrite {
                table: table.to_string(),
                rows_written: 0,
                rows_dropped: 0,
                error: None,
            });
        }

        let written = self.sink.write(table, rows, mode).await?;
        tracing::info!(table = table, rows = written, mode = %mode, sink = self.sink.name(), "Table written");
        Ok(TableWrite {
            table: table.to_string(),
            rows_written: written,
            rows_dropped: 0,
            error: None,
        })
    }

    fn engine(&self) -> Result<&FetchEngine> {
        self.engine.as_ref().ok_or_else(|| {
            BazaarError::Configuration("marketplace client is not configured".to_string())
        })
    }

    fn ensure_running(&self, collected: usize) -> Result<()> {
        match &self.shutdown {
            Some(rx) if *rx.borrow() => Err(BazaarError::Cancelled { collected }),
            _ => Ok(()),
        }
    }
}

/// Write mode for a listing: replace the fetched range when the endpoint has a date
/// column, otherwise replace matching identifiers
///
/// An undated listing without an identifier column is a full snapshot and replaces the
/// table. A dated one the endpoint cannot filter on is appended.
fn listing_mode(request: &ListingRequest, shaping: &ShapingOptions) -> WriteMode {
    match (request.range, &shaping.date_column, request.endpoint.id_column()) {
        (Some((start, end)), Some(column), _) => WriteMode::AppendReplacingDateRange {
            column: column.clone(),
            start,
            end,
        },
        (_, _, Some(column)) => WriteMode::AppendReplacingIds {
            column: column.to_string(),
        },
        (None, _, None) => WriteMode::Replace,
        (Some(_), None, None) => WriteMode::Append,
    }
}

/// Validate and de-duplicate pricing identifiers, keeping first-seen order
///
/// Returns the normalized identifiers and the rejected inputs.
pub fn parse_identifiers(item_type: ItemType, inputs: &[String]) -> (Vec<String>, Vec<String>) {
    let mut seen = HashSet::new();
    let mut valid = Vec::new();
    let mut rejected = Vec::new();

    for input in inputs {
        match item_type.parse_identifier(input) {
            Ok(id) => {
                if seen.insert(id.clone()) {
                    valid.push(id);
                }
            }
            Err(reason) => {
                tracing::warn!(input = %input, item_type = %item_type, reason = %reason, "Skipping invalid identifier");
                rejected.push(input.clone());
            }
        }
    }

    (valid, rejected)
}
