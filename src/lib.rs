// Bazaar - Marketplace ingestion pipeline
// Copyright (c) 2025 Bazaar Contributors
// Licensed under the MIT License

//! # Bazaar - Marketplace ingestion pipeline
//!
//! Bazaar pulls commerce data from signed marketplace APIs and asynchronous bulk
//! reports, and lands it in PostgreSQL as flat or linked relational tables.
//!
//! ## Overview
//!
//! This library provides the core functionality for:
//! - **Calling** a signed gateway with retry and exponential backoff
//! - **Fetching** every page or every identifier with a bounded worker pool
//! - **Running** bulk reports through create, poll and download over date windows
//! - **Normalizing** nested records into a main table and child tables linked by
//!   durable foreign keys
//!
//! ## Architecture
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`core`] - Business logic (fetch, report, normalize, ingest)
//! - [`adapters`] - External integrations (marketplace gateway, reports, PostgreSQL)
//! - [`domain`] - Identifiers, records and errors
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging and observability
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use bazaar::config::load_config;
//! use bazaar::core::ingest::{Endpoint, IngestCoordinator, ListingRequest};
//! use chrono::NaiveDate;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = load_config("bazaar.toml")?;
//!     let (_shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
//!
//!     let coordinator = IngestCoordinator::from_config(&config, shutdown_rx).await?;
//!
//!     let start = NaiveDate::from_ymd_opt(2025, 1, 1).ok_or("bad date")?;
//!     let end = NaiveDate::from_ymd_opt(2025, 1, 31).ok_or("bad date")?;
//!     let request = ListingRequest::new(Endpoint::Orders).with_range(start, end);
//!
//!     let outcome = coordinator.ingest_listing(&request).await?;
//!     println!("Wrote {} rows", outcome.rows_written());
//!     Ok(())
//! }
//! ```
//!
//! ## Linked Tables
//!
//! Competitive pricing responses are projected into a main table and three child
//! tables. The main rows are written first, their generated identifiers are mapped
//! back to each record's correlation key, and the children are written with that
//! identifier as a foreign key:
//!
//! ```rust,no_run
//! use bazaar::adapters::reports::ItemType;
//! use bazaar::core::ingest::IngestCoordinator;
//!
//! # async fn example(coordinator: IngestCoordinator) -> Result<(), Box<dyn std::error::Error>> {
//! // Competitor ASINs land in `competitive_pricing_main_competitors_uk` and its children
//! let asins = vec!["B000000001".to_string(), "B000000002".to_string()];
//! let outcome = coordinator
//!     .ingest_competitive_pricing(ItemType::Asin, &asins, "_uk")
//!     .await?;
//!
//! for table in &outcome.tables {
//!     println!("{}: {} rows", table.table, table.rows_written);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Bazaar uses [`domain::BazaarError`] for all errors:
//!
//! ```rust,no_run
//! use bazaar::domain::BazaarError;
//!
//! fn example() -> Result<(), BazaarError> {
//!     let _config = bazaar::config::load_config("bazaar.toml")?;
//!     Ok(())
//! }
//! ```
//!
//! ## Logging
//!
//! Bazaar uses structured logging with the `tracing` crate:
//!
//! ```rust,no_run
//! use tracing::{info, warn};
//!
//! info!("Starting ingest");
//! warn!(table = "1688_orders", "No rows fetched");
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod logging;
