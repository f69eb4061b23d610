//! One-shot audit hook around a single response.

use std::sync::atomic::{AtomicBool, Ordering};

use heritage_entity::audit::AuditAction;

use super::recorder::AuditRecorder;
use crate::context::RequestContext;

/// Emits at most one audit record for one request.
///
/// Created before the handler runs and finalized with the final status once
/// the response exists. Only the first [`finalize`](Self::finalize) records
/// anything; an interceptor dropped without finalizing records nothing.
#[derive(Debug)]
pub struct ResponseInterceptor {
    recorder: AuditRecorder,
    ctx: RequestContext,
    action: AuditAction,
    resource: String,
    finalized: AtomicBool,
}

impl ResponseInterceptor {
    /// Bind an interceptor to a route's `(action, resource)`.
    pub fn new(
        recorder: AuditRecorder,
        ctx: RequestContext,
        action: AuditAction,
        resource: impl Into<String>,
    ) -> Self {
        Self {
            recorder,
            ctx,
            action,
            resource: resource.into(),
            finalized: AtomicBool::new(false),
        }
    }

    /// Whether `finalize` has already been called.
    pub fn is_finalized(&self) -> bool {
        self.finalized.load(Ordering::Acquire)
    }

    /// Record the outcome of the request.
    ///
    /// Returns whether a record was written: `false` for repeat calls,
    /// non-2xx statuses and failed appends.
    pub async fn finalize(&self, status_code: u16) -> bool {
        if self.finalized.swap(true, Ordering::AcqRel) {
            return false;
        }

        let ctx = self.ctx.clone().with_status(status_code);
        self.recorder
            .record_admin_action(&ctx, self.action.clone(), &self.resource)
            .await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use heritage_audit::MemoryAuditSink;
    use heritage_entity::audit::Principal;

    use super::*;

    fn interceptor(sink: &MemoryAuditSink) -> ResponseInterceptor {
        ResponseInterceptor::new(
            AuditRecorder::new(Arc::new(sink.clone())),
            RequestContext::http(Principal::Anonymous, "PUT", "/admin/news/7")
                .with_resource_id("7"),
            AuditAction::Update,
            "news",
        )
    }

    #[tokio::test]
    async fn test_finalize_records_once() {
        let sink = MemoryAuditSink::new();
        let interceptor = interceptor(&sink);

        assert!(interceptor.finalize(200).await);
        assert!(!interceptor.finalize(200).await);
        assert!(!interceptor.finalize(204).await);
        assert_eq!(sink.len(), 1);
        assert!(interceptor.is_finalized());
    }

    #[tokio::test]
    async fn test_concurrent_finalize_records_once() {
        let sink = MemoryAuditSink::new();
        let interceptor = Arc::new(interceptor(&sink));

        let calls = (0..8).map(|_| {
            let interceptor = interceptor.clone();
            async move { interceptor.finalize(200).await }
        });
        let written = futures::future::join_all(calls)
            .await
            .into_iter()
            .filter(|written| *written)
            .count();

        assert_eq!(written, 1);
        assert_eq!(sink.len(), 1);
    }

    #[tokio::test]
    async fn test_failed_response_then_success_records_nothing() {
        let sink = MemoryAuditSink::new();
        let interceptor = interceptor(&sink);

        assert!(!interceptor.finalize(403).await);
        assert!(!interceptor.finalize(200).await);
        assert!(sink.is_empty());
    }

    #[tokio::test]
    async fn test_dropped_interceptor_records_nothing() {
        let sink = MemoryAuditSink::new();
        drop(interceptor(&sink));
        assert!(sink.is_empty());
    }
}
