//! Audit middleware for mutating admin routes.
//!
//! ```ignore
//! .route(
//!     "/admin/persons/{id}",
//!     delete(delete_person).layer(from_fn_with_state(
//!         AuditTarget::new(state.recorder.clone(), AuditAction::Delete, "persons"),
//!         audit_response,
//!     )),
//! )
//! ```

use axum::extract::{FromRequestParts, RawPathParams, Request, State};
use axum::middleware::Next;
use axum::response::Response;

use heritage_entity::audit::AuditAction;
use heritage_service::{AuditRecorder, RequestContext, ResponseInterceptor};

use crate::extractors::{ClientInfo, CurrentPrincipal};

/// Path parameter holding the affected entity's id.
const RESOURCE_ID_PARAM: &str = "id";

/// The `(action, resource)` a route is audited as.
#[derive(Debug, Clone)]
pub struct AuditTarget {
    recorder: AuditRecorder,
    action: AuditAction,
    resource: String,
}

impl AuditTarget {
    /// Bind a route to an action on a resource class.
    pub fn new(recorder: AuditRecorder, action: AuditAction, resource: impl Into<String>) -> Self {
        Self {
            recorder,
            action,
            resource: resource.into(),
        }
    }
}

/// Records one audit entry when the wrapped handler responds with a 2xx.
///
/// Must be layered on the route itself (not the whole router) so the `id`
/// path parameter is available. The append is awaited before the response
/// is returned; its latency is bounded by the audit sink.
pub async fn audit_response(
    State(target): State<AuditTarget>,
    request: Request,
    next: Next,
) -> Response {
    let (mut parts, body) = request.into_parts();

    let CurrentPrincipal(principal) = CurrentPrincipal::from_parts(&parts);
    let client = ClientInfo::from_parts(&parts);
    let resource_id = match RawPathParams::from_request_parts(&mut parts, &()).await {
        Ok(params) => params
            .iter()
            .find(|(name, _)| *name == RESOURCE_ID_PARAM)
            .map(|(_, value)| value.to_string()),
        Err(_) => None,
    };

    let mut ctx = RequestContext::http(principal, parts.method.as_str(), parts.uri.path())
        .with_client(client.ip, client.user_agent);
    ctx.resource_id = resource_id;

    let interceptor = ResponseInterceptor::new(target.recorder, ctx, target.action, target.resource);
    let response = next.run(Request::from_parts(parts, body)).await;
    interceptor.finalize(response.status().as_u16()).await;

    response
}
