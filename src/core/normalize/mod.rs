//! Relational normalization
//!
//! - [`shaping`] - flattening and per-endpoint record shaping for flat tables
//! - [`schema`] - declared projections from nested items to linked tables
//! - [`normalizer`] - applies a projection, assigning correlation keys
//! - [`stitcher`] - persists the tables and wires foreign keys

pub mod normalizer;
pub mod schema;
pub mod shaping;
pub mod stitcher;

pub use normalizer::{normalize, ChildTable, KeyedRow, NormalizedRecordSet};
pub use schema::{ChildSpec, ColumnSpec, FieldPath, Projection, STAMP_COLUMN};
pub use shaping::ShapingOptions;
pub use stitcher::{
    persist_record_set, KeyMap, PersistPolicy, ReconcileStrategy, StitchReport, TableWrite,
};
