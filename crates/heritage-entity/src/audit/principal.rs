//! The acting principal of an audited operation.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier written for unauthenticated callers.
pub const ANONYMOUS: &str = "anonymous";

/// Identifier written for operations triggered by the server itself.
pub const SYSTEM: &str = "system";

/// Prefix added to usernames that spell a built-in identifier.
pub const RESERVED_USER_PREFIX: &str = "user:";

/// Who performed an action.
///
/// The authentication layer inserts a `Principal` into request extensions;
/// requests without one are [`Principal::Anonymous`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(tag = "kind", content = "username", rename_all = "lowercase")]
pub enum Principal {
    /// No authenticated user.
    #[default]
    Anonymous,
    /// An authenticated admin user. Build it with
    /// [`Principal::from_username`] so the name cannot pose as a built-in one.
    User(String),
    /// The server itself (scheduled jobs).
    System,
}

impl Principal {
    /// Build a principal from an optional username. Blank names are anonymous.
    ///
    /// A user literally named `anonymous` or `system` (in any case) is
    /// recorded as `user:<name>`.
    pub fn from_username(username: Option<&str>) -> Self {
        match username.map(str::trim) {
            Some(name) if name.is_empty() => Self::Anonymous,
            Some(name) if is_reserved(name) => Self::User(format!("{RESERVED_USER_PREFIX}{name}")),
            Some(name) => Self::User(name.to_string()),
            None => Self::Anonymous,
        }
    }

    /// The identifier stored in the `user` field of an audit record.
    pub fn identifier(&self) -> &str {
        match self {
            Self::Anonymous => ANONYMOUS,
            Self::User(name) => name,
            Self::System => SYSTEM,
        }
    }

    /// Whether the principal is authenticated.
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::User(_))
    }
}

fn is_reserved(name: &str) -> bool {
    name.eq_ignore_ascii_case(ANONYMOUS) || name.eq_ignore_ascii_case(SYSTEM)
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.identifier())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_or_blank_username_is_anonymous() {
        assert_eq!(Principal::from_username(None), Principal::Anonymous);
        assert_eq!(Principal::from_username(Some("  ")), Principal::Anonymous);
        assert_eq!(Principal::from_username(None).identifier(), "anonymous");
    }

    #[test]
    fn test_identifier() {
        assert_eq!(
            Principal::from_username(Some("alice")).identifier(),
            "alice"
        );
        assert_eq!(Principal::System.identifier(), "system");
    }

    #[test]
    fn test_user_cannot_pose_as_builtin_principal() {
        let system = Principal::from_username(Some("system"));
        assert!(system.is_authenticated());
        assert_eq!(system.identifier(), "user:system");
        assert_ne!(system.identifier(), Principal::System.identifier());

        let anonymous = Principal::from_username(Some("Anonymous"));
        assert_eq!(anonymous.identifier(), "user:Anonymous");
        assert_ne!(anonymous.identifier(), Principal::Anonymous.identifier());

        assert_eq!(Principal::from_username(Some("systems")).identifier(), "systems");
    }
}
