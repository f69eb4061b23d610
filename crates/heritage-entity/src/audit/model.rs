//! Audit record entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::action::AuditAction;
use super::principal::Principal;

/// An immutable audit log entry recording one completed administrative action.
///
/// One record is one line of the audit log. `seq`, `prev_hash` and `hash`
/// chain the records together so that edits or deletions are detectable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditRecord {
    /// Unique record identifier (UUID v7, time ordered).
    pub id: Uuid,
    /// 1-based position in the log.
    pub seq: u64,
    /// Write time, non-decreasing within one writer process.
    pub timestamp: DateTime<Utc>,
    /// The action that was performed.
    pub action: AuditAction,
    /// The resource class (e.g. `"persons"`, `"news"`, `"auth"`).
    pub resource: String,
    /// The specific entity affected, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,
    /// Principal identifier; `"anonymous"` when unauthenticated.
    pub user: String,
    /// Client IP address, best effort.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    /// Client User-Agent, best effort.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    /// HTTP method (HTTP-triggered records only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    /// Request path (HTTP-triggered records only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Final response status (HTTP-triggered records only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    /// Free-form structured payload (e.g. a failure reason).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    /// Hash of the previous record (64 zeros for the first record).
    pub prev_hash: String,
    /// Hash of this record, covering every other field.
    #[serde(default)]
    pub hash: String,
}

impl AuditRecord {
    /// Build an unsealed record from creation data. `hash` is left empty
    /// for the log writer to fill in.
    pub fn new(
        data: CreateAuditRecord,
        seq: u64,
        timestamp: DateTime<Utc>,
        prev_hash: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            seq,
            timestamp,
            action: data.action,
            resource: data.resource,
            resource_id: data.resource_id,
            user: data.principal.identifier().to_string(),
            ip: data.ip,
            user_agent: data.user_agent,
            method: data.method,
            path: data.path,
            status_code: data.status_code,
            details: data.details,
            prev_hash: prev_hash.into(),
            hash: String::new(),
        }
    }
}

/// Data required to append a new audit record.
///
/// Everything except the write-time fields (`id`, `seq`, `timestamp`,
/// hashes), which the log writer assigns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAuditRecord {
    /// The action performed.
    pub action: AuditAction,
    /// Resource class.
    pub resource: String,
    /// Specific entity identifier.
    pub resource_id: Option<String>,
    /// Acting principal.
    pub principal: Principal,
    /// Client IP address.
    pub ip: Option<String>,
    /// Client User-Agent.
    pub user_agent: Option<String>,
    /// HTTP method.
    pub method: Option<String>,
    /// Request path.
    pub path: Option<String>,
    /// Final response status code.
    pub status_code: Option<u16>,
    /// Additional details.
    pub details: Option<serde_json::Value>,
}

impl CreateAuditRecord {
    /// Start a record for `action` on `resource` with every optional field unset.
    pub fn new(action: AuditAction, resource: impl Into<String>, principal: Principal) -> Self {
        Self {
            action,
            resource: resource.into(),
            resource_id: None,
            principal,
            ip: None,
            user_agent: None,
            method: None,
            path: None,
            status_code: None,
            details: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_http_record_omits_http_fields() {
        let data = CreateAuditRecord::new(
            AuditAction::LoginSuccess,
            "auth",
            Principal::from_username(Some("alice")),
        );
        let record = AuditRecord::new(data, 1, Utc::now(), "0".repeat(64));
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["action"], "LOGIN_SUCCESS");
        assert_eq!(json["user"], "alice");
        assert!(json.get("method").is_none());
        assert!(json.get("statusCode").is_none());
        assert!(json.get("resourceId").is_none());
    }

    #[test]
    fn test_camel_case_field_names() {
        let mut data = CreateAuditRecord::new(AuditAction::Delete, "persons", Principal::Anonymous);
        data.resource_id = Some("42".to_string());
        data.status_code = Some(200);
        data.user_agent = Some("curl/8.0".to_string());
        let record = AuditRecord::new(data, 7, Utc::now(), "abc");
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["resourceId"], "42");
        assert_eq!(json["statusCode"], 200);
        assert_eq!(json["userAgent"], "curl/8.0");
        assert_eq!(json["prevHash"], "abc");
        assert_eq!(json["user"], "anonymous");
    }
}
