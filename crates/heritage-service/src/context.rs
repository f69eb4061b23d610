//! Request context carrying the acting principal and request provenance.

use heritage_entity::audit::Principal;

/// Context of the request an audit record is built from.
///
/// Filled in by the HTTP layer before the handler runs; `status_code` is set
/// once the response is known. Scheduled jobs use [`RequestContext::system`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestContext {
    /// Who is acting.
    pub principal: Principal,
    /// Client IP address, best effort.
    pub ip: Option<String>,
    /// User-Agent header value.
    pub user_agent: Option<String>,
    /// HTTP method.
    pub method: Option<String>,
    /// Request path.
    pub path: Option<String>,
    /// Final response status.
    pub status_code: Option<u16>,
    /// Value of the route's `id` path parameter, if any.
    pub resource_id: Option<String>,
}

impl RequestContext {
    /// Context of an HTTP request.
    pub fn http(principal: Principal, method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            principal,
            method: Some(method.into()),
            path: Some(path.into()),
            ..Self::default()
        }
    }

    /// Context for work the server does on its own behalf.
    pub fn system() -> Self {
        Self {
            principal: Principal::System,
            ..Self::default()
        }
    }

    /// Set the client provenance.
    pub fn with_client(mut self, ip: Option<String>, user_agent: Option<String>) -> Self {
        self.ip = ip;
        self.user_agent = user_agent;
        self
    }

    /// Set the affected entity.
    pub fn with_resource_id(mut self, resource_id: impl Into<String>) -> Self {
        self.resource_id = Some(resource_id.into());
        self
    }

    /// Set the final response status.
    pub fn with_status(mut self, status_code: u16) -> Self {
        self.status_code = Some(status_code);
        self
    }

    /// Whether the recorded status is a 2xx.
    pub fn is_success(&self) -> bool {
        matches!(self.status_code, Some(code) if (200..300).contains(&code))
    }
}
