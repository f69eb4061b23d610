//! Convenience result type alias for Heritage.

use crate::error::AppError;

/// A specialized `Result` type for Heritage operations.
pub type AppResult<T> = Result<T, AppError>;
