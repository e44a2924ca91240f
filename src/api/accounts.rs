//! Account and follow-graph endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use chrono::Utc;
use serde::Deserialize;

use super::dto::{AccountResponse, RegisterResponse, RelationshipResponse};
use crate::auth::{mint_access_token, CurrentUser};
use crate::data::{Account, EntityId};
use crate::error::AppError;
use crate::metrics::ACCOUNTS_TOTAL;
use crate::service::RelationshipService;
use crate::AppState;

const MAX_USERNAME_LENGTH: usize = 64;

/// Registration request
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub display_name: Option<String>,
    pub note: Option<String>,
}

fn validate_username(raw: &str) -> Result<String, AppError> {
    let username = raw.trim();
    if username.is_empty() {
        return Err(AppError::Validation("username cannot be empty".to_string()));
    }
    if username.len() > MAX_USERNAME_LENGTH {
        return Err(AppError::Validation(format!(
            "username must be at most {} characters",
            MAX_USERNAME_LENGTH
        )));
    }
    if !username
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '-' || ch == '.')
    {
        return Err(AppError::Validation(
            "username may only contain letters, digits, '_', '-' and '.'".to_string(),
        ));
    }

    Ok(username.to_string())
}

fn normalize_optional_text(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// POST /api/v1/accounts - Register a new account
///
/// Returns the account plus a freshly minted access token; the
/// plaintext token is only ever returned here.
pub async fn create_account(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), AppError> {
    let username = validate_username(&request.username)?;
    let now = Utc::now();

    let account = Account {
        id: EntityId::new().0,
        username: username.clone(),
        display_name: request.display_name.and_then(normalize_optional_text),
        note: request.note.and_then(normalize_optional_text),
        created_at: now,
        updated_at: now,
    };

    let inserted = state.db.insert_account(&account).await?;
    if !inserted {
        return Err(AppError::Conflict(format!(
            "username '{}' is already taken",
            username
        )));
    }

    let access_token = mint_access_token(state.config.auth.token_bytes);
    state
        .db
        .insert_access_token(&account.id, &access_token)
        .await?;

    ACCOUNTS_TOTAL.set(state.db.count_accounts().await?);
    tracing::info!(username = %account.username, "Account registered");

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            account: account.into(),
            access_token,
        }),
    ))
}

/// GET /api/v1/accounts/verify_credentials - Current account
pub async fn verify_credentials(
    CurrentUser(account): CurrentUser,
) -> Result<Json<AccountResponse>, AppError> {
    Ok(Json(account.into()))
}

/// GET /api/v1/accounts/:id - Public profile
pub async fn get_account(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<AccountResponse>, AppError> {
    let account = state.db.get_account(&id).await?.ok_or(AppError::NotFound)?;

    Ok(Json(account.into()))
}

/// POST /api/v1/accounts/:id/follow - Follow an account
///
/// Idempotent: following twice reports the same relationship.
pub async fn follow_account(
    State(state): State<AppState>,
    CurrentUser(account): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<RelationshipResponse>, AppError> {
    if account.id == id {
        return Err(AppError::Validation("cannot follow yourself".to_string()));
    }
    let target = state.db.get_account(&id).await?.ok_or(AppError::NotFound)?;

    let created = state.db.insert_follow_if_absent(&account.id, &target.id).await?;
    if created {
        tracing::info!(
            follower = %account.username,
            target = %target.username,
            "Follow created"
        );
    }

    relationship_response(&state, &account.id, &target.id).await
}

/// POST /api/v1/accounts/:id/unfollow - Unfollow an account
pub async fn unfollow_account(
    State(state): State<AppState>,
    CurrentUser(account): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<RelationshipResponse>, AppError> {
    let target = state.db.get_account(&id).await?.ok_or(AppError::NotFound)?;

    state.db.delete_follow(&account.id, &target.id).await?;

    relationship_response(&state, &account.id, &target.id).await
}

/// GET /api/v1/accounts/:id/relationship - Relationship to an account
///
/// Resolved from the caller's perspective: `following` means the
/// caller follows the target.
pub async fn get_relationship(
    State(state): State<AppState>,
    CurrentUser(account): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<RelationshipResponse>, AppError> {
    let target = state.db.get_account(&id).await?.ok_or(AppError::NotFound)?;

    relationship_response(&state, &account.id, &target.id).await
}

async fn relationship_response(
    state: &AppState,
    viewer_id: &str,
    target_id: &str,
) -> Result<Json<RelationshipResponse>, AppError> {
    let relationship = RelationshipService::new(state.db.clone())
        .resolve(viewer_id, target_id)
        .await?;

    Ok(Json(RelationshipResponse {
        account_id: target_id.to_string(),
        relationship: relationship.as_str().to_string(),
    }))
}
