//! Result type alias for skiplot
//!
//! This module provides a convenient Result type alias that uses SkipLotError
//! as the error type.

use super::errors::SkipLotError;

/// Result type alias for skiplot operations
///
/// # Examples
///
/// ```
/// use skiplot::domain::result::Result;
/// use skiplot::domain::errors::SkipLotError;
///
/// fn example_function() -> Result<String> {
///     Ok("success".to_string())
/// }
///
/// fn failing_function() -> Result<()> {
///     Err(SkipLotError::Configuration("SkipLoteSampleQty must be greater than 1".to_string()))
/// }
/// ```
pub type Result<T> = std::result::Result<T, SkipLotError>;
