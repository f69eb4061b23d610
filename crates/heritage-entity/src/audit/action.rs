//! Audit action tags.

use serde::{Deserialize, Serialize};
use std::fmt;

/// What kind of action an audit record describes.
///
/// Serialized as a bare upper-case string. Anything that is not one of the
/// well-known tags is an operation-specific sensitive action
/// (e.g. `BULK_DELETE`, `PERMISSION_CHANGE`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AuditAction {
    /// A resource was created.
    Create,
    /// A resource was updated.
    Update,
    /// A resource was deleted.
    Delete,
    /// A login attempt succeeded.
    LoginSuccess,
    /// A login attempt failed.
    LoginFailed,
    /// Caller-defined sensitive operation tag.
    Sensitive(String),
}

impl AuditAction {
    /// Return the tag as written to the log.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Create => "CREATE",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
            Self::LoginSuccess => "LOGIN_SUCCESS",
            Self::LoginFailed => "LOGIN_FAILED",
            Self::Sensitive(tag) => tag,
        }
    }

    /// Build a sensitive-operation tag, normalized to upper snake case.
    pub fn sensitive(operation: &str) -> Self {
        let tag = operation.trim().replace([' ', '-', '.'], "_").to_uppercase();
        Self::from(tag)
    }

    /// Whether this is one of the authentication tags.
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::LoginSuccess | Self::LoginFailed)
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for AuditAction {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "CREATE" => Self::Create,
            "UPDATE" => Self::Update,
            "DELETE" => Self::Delete,
            "LOGIN_SUCCESS" => Self::LoginSuccess,
            "LOGIN_FAILED" => Self::LoginFailed,
            _ => Self::Sensitive(tag),
        }
    }
}

impl From<AuditAction> for String {
    fn from(action: AuditAction) -> Self {
        match action {
            AuditAction::Sensitive(tag) => tag,
            other => other.as_str().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_well_known_tags_serialize_as_strings() {
        assert_eq!(
            serde_json::to_string(&AuditAction::Delete).unwrap(),
            "\"DELETE\""
        );
        assert_eq!(
            serde_json::to_string(&AuditAction::LoginFailed).unwrap(),
            "\"LOGIN_FAILED\""
        );
    }

    #[test]
    fn test_unknown_tag_parses_as_sensitive() {
        let action: AuditAction = serde_json::from_str("\"BULK_DELETE\"").unwrap();
        assert_eq!(action, AuditAction::Sensitive("BULK_DELETE".to_string()));

        let known: AuditAction = serde_json::from_str("\"UPDATE\"").unwrap();
        assert_eq!(known, AuditAction::Update);
    }

    #[test]
    fn test_sensitive_normalizes_tag() {
        assert_eq!(
            AuditAction::sensitive("permission change").as_str(),
            "PERMISSION_CHANGE"
        );
        assert_eq!(AuditAction::sensitive("create"), AuditAction::Create);
    }
}
