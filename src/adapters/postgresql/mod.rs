//! PostgreSQL database integration
//!
//! This module provides the pooled client and the [`PostgreSQLSink`] that stores
//! normalized tables, returning generated identifiers directly from each insert.

pub mod client;
pub mod ddl;
pub mod sink;

pub use client::PostgreSQLClient;
pub use sink::PostgreSQLSink;
