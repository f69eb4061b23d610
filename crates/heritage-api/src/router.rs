//! Route definitions for the Heritage admin HTTP API.
//!
//! All routes are mounted under `/api`. Mutating routes are wrapped with
//! the audit middleware at the method level so the path parameters are
//! visible to it.

use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{get, put},
};

use heritage_entity::audit::AuditAction;

use crate::handlers;
use crate::middleware::audit::{AuditTarget, audit_response};
use crate::state::AppState;

/// Resource class of backup settings changes in the audit log.
pub const SETTINGS_RESOURCE: &str = "settings";

/// Build the API router.
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .merge(settings_routes(&state))
        .merge(audit_routes())
        .merge(health_routes());

    Router::new().nest("/api", api_routes).with_state(state)
}

/// Backup settings read and partial update
fn settings_routes(state: &AppState) -> Router<AppState> {
    let audit_update = from_fn_with_state(
        AuditTarget::new(state.recorder.clone(), AuditAction::Update, SETTINGS_RESOURCE),
        audit_response,
    );

    Router::new().route(
        "/admin/settings/backup",
        get(handlers::settings::get_backup_settings)
            .merge(put(handlers::settings::update_backup_settings).layer(audit_update)),
    )
}

/// Audit log review
fn audit_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/audit", get(handlers::audit::list_audit))
        .route("/admin/audit/verify", get(handlers::audit::verify_audit))
}

fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(handlers::health::health))
}
