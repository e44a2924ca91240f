//! Messaging settings endpoints

use axum::{extract::State, response::Json};
use serde::Deserialize;

use super::dto::MessagingSettingsResponse;
use crate::auth::CurrentUser;
use crate::data::MessagingPolicy;
use crate::error::AppError;
use crate::AppState;

/// Settings update request
#[derive(Debug, Deserialize)]
pub struct UpdateSettingsRequest {
    pub policy: String,
}

/// GET /api/v1/messaging_settings - Current messaging settings
///
/// Auto-creates the default row (policy `everyone`) on first read.
pub async fn get_settings(
    State(state): State<AppState>,
    CurrentUser(account): CurrentUser,
) -> Result<Json<MessagingSettingsResponse>, AppError> {
    let settings = state.db.ensure_messaging_settings(&account.id).await?;

    Ok(Json(settings.into()))
}

/// PUT /api/v1/messaging_settings - Update messaging policy
pub async fn update_settings(
    State(state): State<AppState>,
    CurrentUser(account): CurrentUser,
    Json(request): Json<UpdateSettingsRequest>,
) -> Result<Json<MessagingSettingsResponse>, AppError> {
    let policy = MessagingPolicy::parse(&request.policy).ok_or_else(|| {
        AppError::Validation(format!(
            "unknown policy '{}'; expected one of everyone, followers, following, mutual, nobody",
            request.policy
        ))
    })?;

    let settings = state
        .db
        .update_messaging_settings(&account.id, policy)
        .await?;

    tracing::info!(
        account = %account.username,
        policy = %settings.policy,
        "Messaging policy updated"
    );

    Ok(Json(settings.into()))
}
