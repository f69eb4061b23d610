//! `ClientInfo` extractor: best-effort client IP and User-Agent.

use std::convert::Infallible;
use std::net::SocketAddr;

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::request::Parts;
use axum::http::header::USER_AGENT;

/// Where a request came from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClientInfo {
    /// Client IP address.
    pub ip: Option<String>,
    /// User-Agent header value.
    pub user_agent: Option<String>,
}

impl ClientInfo {
    /// Read client provenance from request parts.
    ///
    /// The IP is the first `X-Forwarded-For` entry, then `X-Real-IP`, then
    /// the peer address when the server was started with connect info.
    pub fn from_parts(parts: &Parts) -> Self {
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
        };

        let ip = header("x-forwarded-for")
            .and_then(|v| v.split(',').next())
            .map(|v| v.trim().to_string())
            .or_else(|| header("x-real-ip").map(String::from))
            .or_else(|| {
                parts
                    .extensions
                    .get::<ConnectInfo<SocketAddr>>()
                    .map(|ConnectInfo(addr)| addr.ip().to_string())
            });

        let user_agent = parts
            .headers
            .get(USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(String::from);

        Self { ip, user_agent }
    }
}

impl<S> FromRequestParts<S> for ClientInfo
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_parts(parts))
    }
}
