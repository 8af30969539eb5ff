//! Pagination and concurrency
//!
//! - [`FetchEngine::fetch_pages`] - page 1 first, then pages `2..=N` through a bounded pool
//! - [`FetchEngine::fetch_by_ids`] - one call per identifier through the same pool
//! - [`FetchEngine::fetch_sequential`] - one page at a time, no pool

pub mod engine;
pub mod job;

pub use engine::FetchEngine;
pub use job::{FetchJob, IdQuery, JobKey, PageQuery};
