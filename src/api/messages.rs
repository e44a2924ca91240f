//! Message endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;

use super::dto::MessageResponse;
use crate::auth::CurrentUser;
use crate::error::AppError;
use crate::metrics::{HTTP_REQUESTS_TOTAL, HTTP_REQUEST_DURATION_SECONDS};
use crate::service::MessageService;
use crate::AppState;

/// Message listing parameters
#[derive(Debug, Deserialize)]
pub struct MessagesParams {
    /// Maximum number of results to return
    limit: Option<usize>,
    /// Return results older than this ID
    max_id: Option<String>,
    /// Return results newer than this ID
    since_id: Option<String>,
}

/// Message send request
#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub content: String,
    pub reply_to_id: Option<String>,
}

/// Message edit request
#[derive(Debug, Deserialize)]
pub struct EditMessageRequest {
    pub content: String,
}

fn message_service(state: &AppState) -> MessageService {
    MessageService::new(
        state.db.clone(),
        state.config.messaging.max_message_length,
    )
}

/// GET /api/v1/conversations/:id/messages - Page through messages
///
/// Reverse chronological; soft-deleted messages appear as tombstones.
pub async fn get_messages(
    State(state): State<AppState>,
    CurrentUser(account): CurrentUser,
    Path(id): Path<String>,
    Query(params): Query<MessagesParams>,
) -> Result<Json<Vec<MessageResponse>>, AppError> {
    // Start timing the request
    let _timer = HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&["GET", "/api/v1/conversations/:id/messages"])
        .start_timer();

    let limit = params
        .limit
        .unwrap_or(state.config.messaging.default_page_size)
        .min(state.config.messaging.max_page_size);

    let messages = message_service(&state)
        .list(
            &id,
            &account.id,
            limit,
            params.max_id.as_deref(),
            params.since_id.as_deref(),
        )
        .await?;

    // Record successful request
    HTTP_REQUESTS_TOTAL
        .with_label_values(&["GET", "/api/v1/conversations/:id/messages", "200"])
        .inc();

    Ok(Json(messages.into_iter().map(Into::into).collect()))
}

/// POST /api/v1/conversations/:id/messages - Send a message
pub async fn send_message(
    State(state): State<AppState>,
    CurrentUser(account): CurrentUser,
    Path(id): Path<String>,
    Json(request): Json<SendMessageRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), AppError> {
    // Start timing the request
    let _timer = HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&["POST", "/api/v1/conversations/:id/messages"])
        .start_timer();

    let message = message_service(&state)
        .send(&id, &account.id, request.content, request.reply_to_id)
        .await?;

    // Record successful request
    HTTP_REQUESTS_TOTAL
        .with_label_values(&["POST", "/api/v1/conversations/:id/messages", "201"])
        .inc();

    Ok((StatusCode::CREATED, Json(message.into())))
}

/// PATCH /api/v1/messages/:id - Edit own message
pub async fn edit_message(
    State(state): State<AppState>,
    CurrentUser(account): CurrentUser,
    Path(id): Path<String>,
    Json(request): Json<EditMessageRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    let message = message_service(&state)
        .edit(&id, &account.id, request.content)
        .await?;

    Ok(Json(message.into()))
}

/// DELETE /api/v1/messages/:id - Soft-delete own message
pub async fn delete_message(
    State(state): State<AppState>,
    CurrentUser(account): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    message_service(&state).delete(&id, &account.id).await?;

    Ok(Json(serde_json::json!({})))
}
