//! Domain models and types for Bazaar.
//!
//! # Overview
//!
//! The domain layer provides:
//! - **Strongly-typed identifiers** ([`ReportId`], [`DocumentId`], [`Asin`], [`SellerSku`],
//!   [`CorrelationKey`], [`DurableId`])
//! - **Row representation** ([`Record`])
//! - **Error types** ([`BazaarError`], [`TransportError`], [`ReportStage`])
//! - **Result type alias** ([`Result`])
//!
//! # Error Handling
//!
//! All fallible operations return [`Result<T, BazaarError>`]:
//!
//! ```rust,no_run
//! use bazaar::domain::Result;
//!
//! fn example() -> Result<()> {
//!     let config = bazaar::config::load_config("bazaar.toml")?;
//!     Ok(())
//! }
//! ```

pub mod errors;
pub mod ids;
pub mod record;
pub mod result;

// Re-export commonly used types for convenience
pub use errors::{BazaarError, ReportStage, TransportError};
pub use ids::{Asin, CorrelationKey, DocumentId, DurableId, ReportId, SellerSku};
pub use record::Record;
pub use result::Result;
