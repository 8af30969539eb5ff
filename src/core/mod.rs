//! Core ingestion logic for Bazaar.
//!
//! # Modules
//!
//! - [`fetch`] - bounded-concurrency pagination and per-ID fetching
//! - [`report`] - bulk report state machine, windowing and document decoding
//! - [`normalize`] - record shaping, relational projection and foreign-key stitching
//! - [`ingest`] - top-level operations and their structured outcomes
//!
//! # Ingest Workflow
//!
//! 1. **Fetch**: page-based, ID-based or bulk-report retrieval through the adapters
//! 2. **Shape**: flatten nested records, or project them into linked tables
//! 3. **Persist**: write the main table, map correlation keys to durable identifiers,
//!    then write child tables independently
//! 4. **Report**: return an [`ingest::IngestOutcome`] with per-table counts
//!
//! # Example
//!
//! ```rust,no_run
//! use bazaar::config::load_config;
//! use bazaar::core::ingest::{guard, Endpoint, IngestCoordinator, ListingRequest};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("bazaar.toml")?;
//! let (_shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
//!
//! let coordinator = Arc::new(IngestCoordinator::from_config(&config, shutdown_rx).await?);
//! let request = ListingRequest::new(Endpoint::Products);
//!
//! let outcome = guard("products", async move { coordinator.ingest_listing(&request).await }).await;
//! outcome.log_summary();
//! # Ok(())
//! # }
//! ```

pub mod fetch;
pub mod ingest;
pub mod normalize;
pub mod report;
