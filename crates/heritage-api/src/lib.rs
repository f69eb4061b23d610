//! # heritage-api
//!
//! HTTP API layer for Heritage Admin built on Axum.
//!
//! Provides the audit middleware that mutating admin routes are wrapped
//! with, the backup settings endpoints, the audit review endpoints, and
//! error mapping.

pub mod app;
pub mod dto;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use app::{build_app, serve};
pub use error::ApiError;
pub use middleware::audit::{AuditTarget, audit_response};
pub use state::AppState;
