//! Conversation endpoints (direct messages and message requests)

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;

use super::dto::ConversationResponse;
use crate::auth::CurrentUser;
use crate::data::{ConversationFilter, ParticipantFlag};
use crate::error::AppError;
use crate::metrics::{HTTP_REQUESTS_TOTAL, HTTP_REQUEST_DURATION_SECONDS};
use crate::service::ConversationService;
use crate::AppState;

/// Conversation listing parameters
#[derive(Debug, Deserialize)]
pub struct ConversationsParams {
    /// Maximum number of results to return
    limit: Option<usize>,
    /// Slice selector: requests, archived (default: primary inbox)
    filter: Option<String>,
}

/// Conversation open request
#[derive(Debug, Deserialize)]
pub struct OpenConversationRequest {
    pub recipient_id: String,
}

fn parse_filter(raw: Option<&str>) -> Result<ConversationFilter, AppError> {
    match raw {
        None => Ok(ConversationFilter::Primary),
        Some("requests") => Ok(ConversationFilter::Requests),
        Some("archived") => Ok(ConversationFilter::Archived),
        Some(other) => Err(AppError::Validation(format!(
            "unknown filter '{}'; expected requests or archived",
            other
        ))),
    }
}

/// POST /api/v1/conversations - Open (find or create) a DM
///
/// Returns 403 when the recipient's messaging policy denies the
/// caller. Idempotent per pair: reopening returns the existing
/// conversation with 200 instead of 201.
pub async fn open_conversation(
    State(state): State<AppState>,
    CurrentUser(account): CurrentUser,
    Json(request): Json<OpenConversationRequest>,
) -> Result<(StatusCode, Json<ConversationResponse>), AppError> {
    // Start timing the request
    let _timer = HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&["POST", "/api/v1/conversations"])
        .start_timer();

    let service = ConversationService::new(state.db.clone());
    let (conversation, created) = service.open_dm(&account.id, &request.recipient_id).await?;
    let view = service.view(&conversation.id, &account.id).await?;

    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };

    // Record successful request
    HTTP_REQUESTS_TOTAL
        .with_label_values(&["POST", "/api/v1/conversations", status.as_str()])
        .inc();

    Ok((status, Json(view.into())))
}

/// GET /api/v1/conversations - List the caller's conversations
///
/// Most recent activity first. The default slice excludes archived
/// conversations and pending requests; `filter=requests` and
/// `filter=archived` select those instead.
pub async fn get_conversations(
    State(state): State<AppState>,
    CurrentUser(account): CurrentUser,
    Query(params): Query<ConversationsParams>,
) -> Result<Json<Vec<ConversationResponse>>, AppError> {
    // Start timing the request
    let _timer = HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&["GET", "/api/v1/conversations"])
        .start_timer();

    let limit = params
        .limit
        .unwrap_or(state.config.messaging.default_page_size)
        .min(state.config.messaging.max_page_size);
    let filter = parse_filter(params.filter.as_deref())?;

    let views = ConversationService::new(state.db.clone())
        .list(&account.id, filter, limit)
        .await?;

    // Record successful request
    HTTP_REQUESTS_TOTAL
        .with_label_values(&["GET", "/api/v1/conversations", "200"])
        .inc();

    Ok(Json(views.into_iter().map(Into::into).collect()))
}

/// GET /api/v1/conversations/:id - Single conversation
pub async fn get_conversation(
    State(state): State<AppState>,
    CurrentUser(account): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<ConversationResponse>, AppError> {
    let view = ConversationService::new(state.db.clone())
        .view(&id, &account.id)
        .await?;

    Ok(Json(view.into()))
}

/// POST /api/v1/conversations/:id/accept - Accept a message request
pub async fn accept_conversation(
    State(state): State<AppState>,
    CurrentUser(account): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<ConversationResponse>, AppError> {
    let service = ConversationService::new(state.db.clone());
    service.accept_request(&id, &account.id).await?;
    let view = service.view(&id, &account.id).await?;

    Ok(Json(view.into()))
}

/// POST /api/v1/conversations/:id/decline - Decline a message request
///
/// Removes the conversation and its messages for both sides.
pub async fn decline_conversation(
    State(state): State<AppState>,
    CurrentUser(account): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    ConversationService::new(state.db.clone())
        .decline_request(&id, &account.id)
        .await?;

    Ok(Json(serde_json::json!({})))
}

/// POST /api/v1/conversations/:id/read - Mark as read
pub async fn mark_conversation_read(
    State(state): State<AppState>,
    CurrentUser(account): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<ConversationResponse>, AppError> {
    let view = ConversationService::new(state.db.clone())
        .mark_read(&id, &account.id)
        .await?;

    Ok(Json(view.into()))
}

async fn set_conversation_flag(
    state: AppState,
    account_id: String,
    conversation_id: String,
    flag: ParticipantFlag,
    value: bool,
) -> Result<Json<ConversationResponse>, AppError> {
    let view = ConversationService::new(state.db.clone())
        .set_flag(&conversation_id, &account_id, flag, value)
        .await?;

    Ok(Json(view.into()))
}

/// POST /api/v1/conversations/:id/archive - Archive for the caller
pub async fn archive_conversation(
    State(state): State<AppState>,
    CurrentUser(account): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<ConversationResponse>, AppError> {
    set_conversation_flag(state, account.id, id, ParticipantFlag::Archived, true).await
}

/// POST /api/v1/conversations/:id/unarchive - Unarchive for the caller
pub async fn unarchive_conversation(
    State(state): State<AppState>,
    CurrentUser(account): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<ConversationResponse>, AppError> {
    set_conversation_flag(state, account.id, id, ParticipantFlag::Archived, false).await
}

/// POST /api/v1/conversations/:id/mute - Mute notifications
pub async fn mute_conversation(
    State(state): State<AppState>,
    CurrentUser(account): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<ConversationResponse>, AppError> {
    set_conversation_flag(state, account.id, id, ParticipantFlag::Muted, true).await
}

/// POST /api/v1/conversations/:id/unmute - Unmute notifications
pub async fn unmute_conversation(
    State(state): State<AppState>,
    CurrentUser(account): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<ConversationResponse>, AppError> {
    set_conversation_flag(state, account.id, id, ParticipantFlag::Muted, false).await
}

/// POST /api/v1/conversations/:id/pin - Pin for the caller
pub async fn pin_conversation(
    State(state): State<AppState>,
    CurrentUser(account): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<ConversationResponse>, AppError> {
    set_conversation_flag(state, account.id, id, ParticipantFlag::Pinned, true).await
}

/// POST /api/v1/conversations/:id/unpin - Unpin for the caller
pub async fn unpin_conversation(
    State(state): State<AppState>,
    CurrentUser(account): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<ConversationResponse>, AppError> {
    set_conversation_flag(state, account.id, id, ParticipantFlag::Pinned, false).await
}
