//! Audit log review handlers.

use axum::Json;
use axum::extract::{Query, State};
use validator::Validate;

use heritage_audit::VerifyReport;
use heritage_core::error::{AppError, ErrorKind};
use heritage_entity::audit::AuditRecord;

use crate::dto::{ApiResponse, AuditQuery};
use crate::error::ApiError;
use crate::state::AppState;

/// GET /api/admin/audit
///
/// The most recent `limit` records, oldest first. `limit` must lie in
/// `1..=1000`.
pub async fn list_audit(
    State(state): State<AppState>,
    Query(query): Query<AuditQuery>,
) -> Result<Json<ApiResponse<Vec<AuditRecord>>>, ApiError> {
    query.validate().map_err(AppError::from)?;
    let limit = query.effective_limit();
    let reader = state.audit_reader.clone();
    let records = tokio::task::spawn_blocking(move || reader.tail(limit))
        .await
        .map_err(join_error)??;
    Ok(Json(ApiResponse::ok(records)))
}

/// GET /api/admin/audit/verify
pub async fn verify_audit(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<VerifyReport>>, ApiError> {
    let reader = state.audit_reader.clone();
    let report = tokio::task::spawn_blocking(move || reader.verify())
        .await
        .map_err(join_error)??;

    if let Some(first_break) = &report.first_break {
        tracing::warn!(?first_break, records = report.records, "Audit log chain is broken");
    }
    Ok(Json(ApiResponse::ok(report)))
}

fn join_error(e: tokio::task::JoinError) -> AppError {
    AppError::with_source(ErrorKind::Internal, "Audit log reader task failed", e)
}
