//! Result type alias for Bazaar

use super::errors::BazaarError;

/// Result type alias for Bazaar operations
///
/// # Examples
///
/// ```
/// use bazaar::domain::result::Result;
/// use bazaar::domain::errors::BazaarError;
///
/// fn example_function() -> Result<String> {
///     Ok("success".to_string())
/// }
///
/// fn failing_function() -> Result<()> {
///     Err(BazaarError::Validation("Invalid input".to_string()))
/// }
/// ```
pub type Result<T> = std::result::Result<T, BazaarError>;
