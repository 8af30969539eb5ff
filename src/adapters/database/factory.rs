//! Relational sink factory
//!
//! This module provides the factory function that picks a sink based on configuration.

use crate::adapters::database::memory::MemorySink;
use crate::adapters::database::traits::RelationalSink;
use crate::adapters::postgresql::client::PostgreSQLClient;
use crate::adapters::postgresql::sink::PostgreSQLSink;
use crate::config::BazaarConfig;
use crate::domain::{BazaarError, Result};
use std::sync::Arc;

/// Create the relational sink described by the configuration
///
/// Dry runs get an in-memory sink; everything else writes to PostgreSQL.
///
/// # Errors
///
/// Returns an error if the PostgreSQL section is missing or the pool cannot be created.
pub async fn create_sink(config: &BazaarConfig) -> Result<Arc<dyn RelationalSink>> {
    if config.application.dry_run {
        tracing::info!("Dry run: writing to an in-memory sink");
        return Ok(Arc::new(MemorySink::new()));
    }

    let pg_config = config.postgresql.as_ref().ok_or_else(|| {
        BazaarError::Configuration("postgresql section is required unless dry_run".to_string())
    })?;

    tracing::info!("Creating PostgreSQL sink");
    let client = PostgreSQLClient::new(pg_config.clone()).await?;
    Ok(Arc::new(PostgreSQLSink::new(client)))
}
