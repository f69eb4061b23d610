//! Backup settings handlers.

use axum::Json;
use axum::extract::State;

use heritage_entity::backup::{BackupSettings, BackupSettingsUpdate};

use crate::dto::ApiResponse;
use crate::error::ApiError;
use crate::extractors::CurrentPrincipal;
use crate::state::AppState;

/// GET /api/admin/settings/backup
pub async fn get_backup_settings(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<BackupSettings>>, ApiError> {
    let settings = state.backup_settings.get_settings().await?;
    Ok(Json(ApiResponse::ok(settings)))
}

/// PUT /api/admin/settings/backup
///
/// Partial update: only the fields present in the body change.
pub async fn update_backup_settings(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Json(update): Json<BackupSettingsUpdate>,
) -> Result<Json<ApiResponse<BackupSettings>>, ApiError> {
    let settings = state
        .backup_settings
        .update_settings(&update, principal.identifier())
        .await?;
    Ok(Json(ApiResponse::ok(settings)))
}
