//! Request DTOs with validation.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Default number of audit records returned.
pub const DEFAULT_AUDIT_LIMIT: usize = 100;

/// Query parameters of `GET /api/admin/audit`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct AuditQuery {
    /// How many of the most recent records to return.
    #[validate(range(min = 1, max = 1000, message = "must be between 1 and 1000"))]
    pub limit: Option<usize>,
}

impl AuditQuery {
    /// The requested limit, or the default when none was given.
    pub fn effective_limit(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_AUDIT_LIMIT)
    }
}
