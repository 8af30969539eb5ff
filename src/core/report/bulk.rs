//! Multi-window bulk reports
//!
//! A date range is split into windows and each window gets its own
//! [`ReportRequest`]. The runner works in three phases that never interleave: create
//! every window (pausing after each create call), poll until every window is ready, then
//! download and decode every window in order.

use super::decode::ContentShape;
use super::machine::ReportRequest;
use super::windows::split_windows;
use crate::adapters::reports::{ReportSpec, ReportsApi};
use crate::config::ReportsConfig;
use crate::domain::{BazaarError, Record, Result};
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Drives one report per date window through create, poll and download
pub struct BulkReportRunner {
    api: Arc<dyn ReportsApi>,
    marketplace_ids: Vec<String>,
    poll_interval: Duration,
    creation_delay: Duration,
    window_days: u32,
    shutdown: Option<watch::Receiver<bool>>,
}

impl BulkReportRunner {
    /// Create a runner with explicit pacing
    pub fn new(
        api: Arc<dyn ReportsApi>,
        poll_interval: Duration,
        creation_delay: Duration,
        window_days: u32,
    ) -> Self {
        Self {
            api,
            marketplace_ids: Vec::new(),
            poll_interval,
            creation_delay,
            window_days: window_days.max(1),
            shutdown: None,
        }
    }

    /// Create a runner from the `[reports]` configuration section
    pub fn from_config(api: Arc<dyn ReportsApi>, config: &ReportsConfig) -> Self {
        Self::new(
            api,
            Duration::from_secs(config.poll_interval_seconds),
            Duration::from_secs(config.creation_delay_seconds),
            config.window_days,
        )
        .with_marketplaces(config.marketplace_ids.clone())
    }

    /// Marketplaces included in every request
    pub fn with_marketplaces(mut self, marketplace_ids: Vec<String>) -> Self {
        self.marketplace_ids = marketplace_ids;
        self
    }

    /// Stop between phases and sleeps when `shutdown` flips to `true`
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// Fetch `report_type` for `start..=end`, one report per window
    ///
    /// Returns the concatenation of every window's rows, in window order.
    ///
    /// # Errors
    ///
    /// Returns the first [`BazaarError::Report`] raised by any window, or
    /// [`BazaarError::Cancelled`] if the shutdown signal fires.
    pub async fn run(
        &self,
        report_type: &str,
        start: NaiveDate,
        end: NaiveDate,
        options: &BTreeMap<String, String>,
        shape: &ContentShape,
    ) -> Result<Vec<Record>> {
        let windows = split_windows(start, end, self.window_days);
        if windows.is_empty() {
            tracing::warn!(%start, %end, "Empty report range, nothing to request");
            return Ok(Vec::new());
        }

        tracing::info!(
            report_type = report_type,
            windows = windows.len(),
            window_days = self.window_days,
            "Starting bulk report"
        );

        let requests = windows
            .iter()
            .map(|w| {
                let spec = self.spec(report_type, options).with_range(w.start, w.end);
                ReportRequest::new(spec, shape.clone())
            })
            .collect();

        self.run_requests(requests).await
    }

    /// Fetch a report that takes no date range
    ///
    /// # Errors
    ///
    /// Same as [`BulkReportRunner::run`].
    pub async fn run_single(
        &self,
        report_type: &str,
        options: &BTreeMap<String, String>,
        shape: &ContentShape,
    ) -> Result<Vec<Record>> {
        let request = ReportRequest::new(self.spec(report_type, options), shape.clone());
        self.run_requests(vec![request]).await
    }

    async fn run_requests(&self, mut requests: Vec<ReportRequest>) -> Result<Vec<Record>> {
        let api = self.api.as_ref();

        // Phase 1: create
        for request in requests.iter_mut() {
            self.ensure_running()?;
            request.submit(api).await?;
            self.pause(self.creation_delay).await?;
        }

        // Phase 2: poll
        while requests.iter().any(|r| !r.is_ready()) {
            self.pause(self.poll_interval).await?;
            for request in requests.iter_mut().filter(|r| !r.is_ready()) {
                if request.poll_once(api).await? {
                    tracing::info!(
                        report_type = %request.spec().report_type,
                        start = ?request.spec().start,
                        end = ?request.spec().end,
                        "Report ready"
                    );
                }
            }
        }

        // Phase 3: download
        let mut rows = Vec::new();
        for request in requests.iter_mut() {
            self.ensure_running()?;
            rows.extend(request.download(api).await?);
        }

        tracing::info!(
            reports = requests.len(),
            rows = rows.len(),
            "Bulk report fetched"
        );
        Ok(rows)
    }

    fn spec(&self, report_type: &str, options: &BTreeMap<String, String>) -> ReportSpec {
        let mut spec = ReportSpec::new(report_type).with_marketplaces(self.marketplace_ids.clone());
        spec.options = options.clone();
        spec
    }

    fn ensure_running(&self) -> Result<()> {
        match &self.shutdown {
            Some(rx) if *rx.borrow() => Err(BazaarError::Cancelled { collected: 0 }),
            _ => Ok(()),
        }
    }

    /// Sleep for `delay`, waking early if shutdown is signalled
    async fn pause(&self, delay: Duration) -> Result<()> {
        self.ensure_running()?;
        let Some(mut rx) = self.shutdown.clone() else {
            tokio::time::sleep(delay).await;
            return Ok(());
        };

        let sleep = tokio::time::sleep(delay);
        tokio::pin!(sleep);

        loop {
            tokio::select! {
                _ = &mut sleep => return Ok(()),
                changed = rx.changed() => match changed {
                    Ok(()) if *rx.borrow() => {
                        return Err(BazaarError::Cancelled { collected: 0 });
                    }
                    Ok(()) => {}
                    Err(_) => {
                        (&mut sleep).await;
                        return Ok(());
                    }
                },
            }
        }
    }
}
