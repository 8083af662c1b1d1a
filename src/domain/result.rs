//! Result type alias for phiscrub

use super::errors::PhiScrubError;

/// Result type alias for phiscrub operations
///
/// ```
/// use phiscrub::domain::{PhiScrubError, Result, SessionId};
///
/// fn session_from_arg(arg: &str) -> Result<SessionId> {
///     SessionId::new(arg).map_err(PhiScrubError::Validation)
/// }
///
/// assert!(session_from_arg("MR-0042").is_ok());
/// assert!(matches!(session_from_arg("../etc"), Err(PhiScrubError::Validation(_))));
/// ```
pub type Result<T> = std::result::Result<T, PhiScrubError>;
