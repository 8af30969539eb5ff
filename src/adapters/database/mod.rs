//! Relational sink abstraction layer
//!
//! [`RelationalSink`] is the seam between normalization and storage. The factory picks
//! PostgreSQL, or the in-memory sink for dry runs.

pub mod factory;
pub mod memory;
pub mod traits;

pub use factory::create_sink;
pub use memory::MemorySink;
pub use traits::{RelationalSink, WriteMode, ROW_ID_COLUMN};
