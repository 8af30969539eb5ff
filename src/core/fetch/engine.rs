//! Concurrent fetch engine
//!
//! Page mode fetches page 1 first to learn the declared total, then fans pages `2..=N` out to a
//! bounded worker pool. ID mode issues exactly one call per identifier. Either way the
//! first unrecoverable error drops every in-flight call and surfaces as
//! [`BazaarError::PartialFetch`].

use super::job::{FetchJob, IdQuery, JobKey, PageQuery};
use crate::adapters::marketplace::{envelope, ApiCall, MarketplaceApi};
use crate::config::FetchConfig;
use crate::domain::{BazaarError, Result};
use crate::log_fetch_progress;
use futures::stream::{self, StreamExt};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::watch;

/// Bounded-concurrency fetcher over a [`MarketplaceApi`]
pub struct FetchEngine {
    api: Arc<dyn MarketplaceApi>,
    max_workers: usize,
    max_limit: Option<usize>,
    shutdown: Option<watch::Receiver<bool>>,
}

impl FetchEngine {
    /// Create an engine with `max_workers` concurrent calls
    pub fn new(api: Arc<dyn MarketplaceApi>, max_workers: usize) -> Self {
        Self {
            api,
            max_workers: max_workers.max(1),
            max_limit: None,
            shutdown: None,
        }
    }

    /// Create an engine from the `[fetch]` configuration section
    pub fn from_config(api: Arc<dyn MarketplaceApi>, config: &FetchConfig) -> Self {
        Self::new(api, config.max_workers).with_max_limit(config.max_limit)
    }

    /// Cap the number of records collected in page mode
    pub fn with_max_limit(mut self, max_limit: Option<usize>) -> Self {
        self.max_limit = max_limit;
        self
    }

    /// Abort in-flight work when `shutdown` flips to `true`
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// Size of the worker pool
    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    /// Fetch every record of a paginated endpoint
    ///
    /// Returns exactly `min(declared total, max_limit)` records when every page succeeds.
    /// The page count follows the size of the first page actually served. If the response
    /// declares no total, only the first page is returned. Record order across pages is
    /// not guaranteed.
    ///
    /// # Errors
    ///
    /// Returns [`BazaarError::PartialFetch`] if any page fails or the pages together hold
    /// fewer records than the declared total, or
    /// [`BazaarError::Cancelled`] if the shutdown signal fires.
    pub async fn fetch_pages(&self, query: &PageQuery) -> Result<Vec<Value>> {
        self.ensure_running(0)?;

        let first_page = self
            .api
            .call(&query.page_call(1))
            .await
            .map_err(|e| partial(0, 0, e))?;

        let mut records = envelope::extract_records(&first_page, &query.records_key);
        let total = match envelope::total_count(&first_page) {
            Some(declared) => self.cap(declared),
            None => {
                tracing::warn!(
                    api = %query.call.api_name,
                    "Response declares no total, keeping first page only"
                );
                self.cap(records.len())
            }
        };

        // The upstream may cap pages below the requested size
        let page_size = if total > records.len() && !records.is_empty() {
            records.len()
        } else {
            query.page_size
        };
        if page_size != query.page_size {
            tracing::debug!(
                api = %query.call.api_name,
                requested = query.page_size,
                served = page_size,
                "Upstream page size differs from requested"
            );
        }

        let pages = total.div_ceil(page_size);
        tracing::info!(
            api = %query.call.api_name,
            total = total,
            page_size = page_size,
            pages = pages,
            workers = self.max_workers,
            "Starting page fetch"
        );

        if pages > 1 {
            let jobs = (2..=pages)
                .map(|page| (JobKey::Page(page), query.page_call(page)))
                .collect();
            let completed = self
                .drain(jobs, "page", &query.records_key, records.len(), total)
                .await?;
            records.extend(completed.into_iter().flat_map(FetchJob::into_records));
        }

        if records.len() < total {
            tracing::error!(
                api = %query.call.api_name,
                collected = records.len(),
                expected = total,
                "Pages came back short of the declared total"
            );
            return Err(partial(
                records.len(),
                total,
                BazaarError::Other(format!(
                    "{} page(s) of up to {} record(s) came back short",
                    pages, page_size
                )),
            ));
        }

        records.truncate(total);
        Ok(records)
    }

    /// Fetch one response per identifier
    ///
    /// Returns one [`FetchJob`] per identifier, in completion order. An empty identifier
    /// list makes no calls.
    ///
    /// # Errors
    ///
    /// Returns [`BazaarError::PartialFetch`] if any call fails, or
    /// [`BazaarError::Cancelled`] if the shutdown signal fires.
    pub async fn fetch_by_ids(&self, query: &IdQuery, ids: &[String]) -> Result<Vec<FetchJob>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.ensure_running(0)?;

        tracing::info!(
            api = %query.call.api_name,
            ids = ids.len(),
            workers = self.max_workers,
            "Starting ID fetch"
        );

        let jobs = ids
            .iter()
            .map(|id| (JobKey::Id(id.clone()), query.id_call(id)))
            .collect();

        self.drain(jobs, "id", &query.records_key, 0, ids.len()).await
    }

    /// Fetch pages one at a time until the declared total or an empty page
    ///
    /// # Errors
    ///
    /// Returns [`BazaarError::PartialFetch`] if any page fails, or
    /// [`BazaarError::Cancelled`] if the shutdown signal fires.
    pub async fn fetch_sequential(&self, query: &PageQuery) -> Result<Vec<Value>> {
        let mut records: Vec<Value> = Vec::new();
        let mut total: Option<usize> = self.max_limit;
        let mut page = 1;

        loop {
            self.ensure_running(records.len())?;

            let body = self
                .api
                .call(&query.page_call(page))
                .await
                .map_err(|e| partial(records.len(), total.unwrap_or(0), e))?;

            if page == 1 {
                if let Some(declared) = envelope::total_count(&body) {
                    total = Some(self.cap(declared));
                }
            }

            let batch = envelope::extract_records(&body, &query.records_key);
            if batch.is_empty() {
                break;
            }
            records.extend(batch);
            log_fetch_progress!("sequential", records.len(), total.unwrap_or(records.len()));

            if total.is_some_and(|t| records.len() >= t) {
                break;
            }
            page += 1;
        }

        if let Some(total) = total {
            records.truncate(total);
        }
        Ok(records)
    }

    /// Run `jobs` through the worker pool, failing fast
    async fn drain(
        &self,
        jobs: Vec<(JobKey, ApiCall)>,
        mode: &'static str,
        records_key: &str,
        already_collected: usize,
        expected: usize,
    ) -> Result<Vec<FetchJob>> {
        enum Step<T> {
            Item(Option<T>),
            Cancelled,
            Idle,
            SignalClosed,
        }

        let mut completed = Vec::with_capacity(jobs.len());
        let mut collected = already_collected;
        let mut shutdown = self.shutdown.clone();

        let mut pool = stream::iter(jobs)
            .map(|(key, call)| self.run_job(key, call, records_key))
            .buffer_unordered(self.max_workers);

        loop {
            let step = match shutdown.as_mut() {
                Some(rx) => tokio::select! {
                    changed = rx.changed() => match changed {
                        Ok(()) if *rx.borrow() => Step::Cancelled,
                        Ok(()) => Step::Idle,
                        Err(_) => Step::SignalClosed,
                    },
                    item = pool.next() => Step::Item(item),
                },
                None => Step::Item(pool.next().await),
            };

            match step {
                Step::Cancelled => {
                    tracing::warn!(mode = mode, collected = collected, "Fetch cancelled");
                    return Err(BazaarError::Cancelled { collected });
                }
                Step::Idle => continue,
                Step::SignalClosed => shutdown = None,
                Step::Item(None) => break,
                Step::Item(Some(Ok(job))) => {
                    collected += job.len();
                    log_fetch_progress!(mode, collected, expected);
                    completed.push(job);
                }
                Step::Item(Some(Err((key, err)))) => {
                    tracing::error!(
                        mode = mode,
                        job = %key,
                        collected = collected,
                        error = %err,
                        "Fetch job failed, aborting"
                    );
                    return Err(partial(collected, expected, err));
                }
            }
        }

        Ok(completed)
    }

    async fn run_job(
        &self,
        key: JobKey,
        call: ApiCall,
        records_key: &str,
    ) -> std::result::Result<FetchJob, (JobKey, BazaarError)> {
        match self.api.call(&call).await {
            Ok(body) => {
                let records = envelope::extract_records(&body, records_key);
                Ok(FetchJob::new(key, records))
            }
            Err(err) => Err((key, err)),
        }
    }

    fn cap(&self, total: usize) -> usize {
        self.max_limit.map_or(total, |limit| total.min(limit))
    }

    fn ensure_running(&self, collected: usize) -> Result<()> {
        match &self.shutdown {
            Some(rx) if *rx.borrow() => Err(BazaarError::Cancelled { collected }),
            _ => Ok(()),
        }
    }
}

fn partial(collected: usize, expected: usize, source: BazaarError) -> BazaarError {
    if source.is_cancelled() {
        return source;
    }
    BazaarError::PartialFetch {
        collected,
        expected,
        source: Box::new(source),
    }
}
