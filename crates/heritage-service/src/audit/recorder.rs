//! Builds audit records and hands them to the sink.

use std::sync::Arc;

use serde_json::{Value, json};
use tracing::{debug, error};

use heritage_audit::AuditSink;
use heritage_entity::audit::{AuditAction, CreateAuditRecord, Principal};

use crate::context::RequestContext;

/// Resource class of authentication records.
pub const AUTH_RESOURCE: &str = "auth";

/// Resource class of sensitive-operation records.
pub const SENSITIVE_RESOURCE: &str = "sensitive";

/// Audit recording service.
///
/// None of the methods return an error. A failed append is logged and the
/// method returns `false`; the operation being audited is not affected.
#[derive(Debug, Clone)]
pub struct AuditRecorder {
    sink: Arc<dyn AuditSink>,
}

impl AuditRecorder {
    /// Creates a new recorder writing to `sink`.
    pub fn new(sink: Arc<dyn AuditSink>) -> Self {
        Self { sink }
    }

    /// Record a completed admin mutation.
    ///
    /// Appends only when the context carries a 2xx status; returns whether a
    /// record was written.
    pub async fn record_admin_action(
        &self,
        ctx: &RequestContext,
        action: AuditAction,
        resource: &str,
    ) -> bool {
        if !ctx.is_success() {
            debug!(
                action = %action,
                resource,
                status = ?ctx.status_code,
                "Skipping audit record for unsuccessful request"
            );
            return false;
        }

        let mut data = from_context(ctx, action, resource);
        data.status_code = ctx.status_code;
        self.append(data).await
    }

    /// Record a login attempt, successful or not.
    ///
    /// `reason` is stored in `details.reason` for failed attempts only.
    pub async fn record_auth_attempt(
        &self,
        username: Option<&str>,
        success: bool,
        ip: Option<String>,
        user_agent: Option<String>,
        reason: Option<&str>,
    ) -> bool {
        let action = if success {
            AuditAction::LoginSuccess
        } else {
            AuditAction::LoginFailed
        };

        let mut data =
            CreateAuditRecord::new(action, AUTH_RESOURCE, Principal::from_username(username));
        data.ip = ip;
        data.user_agent = user_agent;
        if !success {
            data.details = reason.map(|reason| json!({ "reason": reason }));
        }
        self.append(data).await
    }

    /// Record a sensitive operation unconditionally.
    pub async fn record_sensitive_operation(
        &self,
        ctx: &RequestContext,
        operation: &str,
        details: Option<Value>,
    ) -> bool {
        let mut data = from_context(ctx, AuditAction::sensitive(operation), SENSITIVE_RESOURCE);
        data.status_code = ctx.status_code;
        data.details = details;
        self.append(data).await
    }

    async fn append(&self, data: CreateAuditRecord) -> bool {
        let action = data.action.clone();
        let resource = data.resource.clone();
        match self.sink.append(data).await {
            Ok(record) => {
                debug!(seq = record.seq, action = %record.action, resource = %record.resource, "Audit record written");
                true
            }
            Err(e) => {
                error!(action = %action, resource = %resource, error = %e, "Failed to write audit record");
                false
            }
        }
    }
}

fn from_context(ctx: &RequestContext, action: AuditAction, resource: &str) -> CreateAuditRecord {
    let mut data = CreateAuditRecord::new(action, resource, ctx.principal.clone());
    data.resource_id = ctx.resource_id.clone();
    data.ip = ctx.ip.clone();
    data.user_agent = ctx.user_agent.clone();
    data.method = ctx.method.clone();
    data.path = ctx.path.clone();
    data
}

#[cfg(test)]
mod tests {
    use heritage_audit::MemoryAuditSink;

    use super::*;

    fn recorder() -> (AuditRecorder, MemoryAuditSink) {
        let sink = MemoryAuditSink::new();
        (AuditRecorder::new(Arc::new(sink.clone())), sink)
    }

    fn delete_person(status: u16) -> RequestContext {
        RequestContext::http(
            Principal::from_username(Some("alice")),
            "DELETE",
            "/admin/persons/42",
        )
        .with_client(Some("10.0.0.1".into()), Some("curl/8.0".into()))
        .with_resource_id("42")
        .with_status(status)
    }

    #[tokio::test]
    async fn test_admin_action_success_is_recorded() {
        let (recorder, sink) = recorder();
        assert!(
            recorder
                .record_admin_action(&delete_person(200), AuditAction::Delete, "persons")
                .await
        );

        let records = sink.records();
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.action, AuditAction::Delete);
        assert_eq!(record.resource, "persons");
        assert_eq!(record.resource_id.as_deref(), Some("42"));
        assert_eq!(record.status_code, Some(200));
        assert_eq!(record.user, "alice");
        assert_eq!(record.method.as_deref(), Some("DELETE"));
        assert_eq!(record.ip.as_deref(), Some("10.0.0.1"));
    }

    #[tokio::test]
    async fn test_admin_action_non_2xx_is_skipped() {
        let (recorder, sink) = recorder();
        for status in [199, 300, 403, 500] {
            assert!(
                !recorder
                    .record_admin_action(&delete_person(status), AuditAction::Delete, "persons")
                    .await
            );
        }
        let no_status = RequestContext::http(Principal::Anonymous, "PUT", "/admin/news/1");
        assert!(
            !recorder
                .record_admin_action(&no_status, AuditAction::Update, "news")
                .await
        );
        assert!(sink.is_empty());
    }

    #[tokio::test]
    async fn test_anonymous_principal() {
        let (recorder, sink) = recorder();
        let ctx = RequestContext::http(Principal::Anonymous, "POST", "/admin/news").with_status(201);
        recorder
            .record_admin_action(&ctx, AuditAction::Create, "news")
            .await;
        assert_eq!(sink.records()[0].user, "anonymous");
    }

    #[tokio::test]
    async fn test_auth_attempt_reason_only_on_failure() {
        let (recorder, sink) = recorder();
        recorder
            .record_auth_attempt(Some("bob"), false, None, None, Some("bad password"))
            .await;
        recorder
            .record_auth_attempt(Some("bob"), true, None, None, Some("ignored"))
            .await;
        recorder
            .record_auth_attempt(None, false, None, None, None)
            .await;

        let records = sink.records();
        assert_eq!(records[0].action, AuditAction::LoginFailed);
        assert_eq!(records[0].resource, "auth");
        assert_eq!(records[0].details, Some(json!({ "reason": "bad password" })));
        assert_eq!(records[1].action, AuditAction::LoginSuccess);
        assert!(records[1].details.is_none());
        assert_eq!(records[2].user, "anonymous");
        assert!(records[2].details.is_none());
        assert!(records[2].method.is_none());
    }

    #[tokio::test]
    async fn test_sensitive_operation_is_unconditional() {
        let (recorder, sink) = recorder();
        let ctx = RequestContext::system();
        assert!(
            recorder
                .record_sensitive_operation(&ctx, "BULK_DELETE", Some(json!({ "count": 3 })))
                .await
        );

        let record = &sink.records()[0];
        assert_eq!(record.action, AuditAction::Sensitive("BULK_DELETE".into()));
        assert_eq!(record.resource, "sensitive");
        assert_eq!(record.user, "system");
        assert_eq!(record.details, Some(json!({ "count": 3 })));
    }

    #[tokio::test]
    async fn test_sink_failure_is_swallowed() {
        let (recorder, sink) = recorder();
        sink.set_failing(true);
        assert!(
            !recorder
                .record_admin_action(&delete_person(200), AuditAction::Delete, "persons")
                .await
        );
        assert!(
            !recorder
                .record_auth_attempt(Some("bob"), true, None, None, None)
                .await
        );
    }
}
