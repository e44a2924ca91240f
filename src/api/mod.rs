//! API layer
//!
//! HTTP handlers for:
//! - Accounts and the follow graph
//! - Messaging settings
//! - Conversations and message requests
//! - Messages
//! - Metrics (Prometheus)

mod accounts;
mod conversations;
mod dto;
mod messages;
pub mod metrics;
mod settings;

pub use dto::*;

pub use metrics::metrics_router;

use axum::{
    routing::{delete, get, patch, post, put},
    Router,
};

use crate::AppState;

/// Create the API router
///
/// Routes are split into public and authenticated endpoints.
pub fn api_router() -> Router<AppState> {
    // Public endpoints (no authentication required)
    let public_routes = Router::new()
        // Account creation is public
        .route("/v1/accounts", post(accounts::create_account))
        // Public account views
        .route("/v1/accounts/:id", get(accounts::get_account));

    // Authenticated endpoints (require valid token)
    let authenticated_routes = Router::new()
        // Accounts - authenticated operations
        .route(
            "/v1/accounts/verify_credentials",
            get(accounts::verify_credentials),
        )
        .route("/v1/accounts/:id/follow", post(accounts::follow_account))
        .route(
            "/v1/accounts/:id/unfollow",
            post(accounts::unfollow_account),
        )
        .route(
            "/v1/accounts/:id/relationship",
            get(accounts::get_relationship),
        )
        // Messaging settings
        .route("/v1/messaging_settings", get(settings::get_settings))
        .route("/v1/messaging_settings", put(settings::update_settings))
        // Conversations
        .route("/v1/conversations", post(conversations::open_conversation))
        .route("/v1/conversations", get(conversations::get_conversations))
        .route("/v1/conversations/:id", get(conversations::get_conversation))
        .route(
            "/v1/conversations/:id/accept",
            post(conversations::accept_conversation),
        )
        .route(
            "/v1/conversations/:id/decline",
            post(conversations::decline_conversation),
        )
        .route(
            "/v1/conversations/:id/read",
            post(conversations::mark_conversation_read),
        )
        .route(
            "/v1/conversations/:id/archive",
            post(conversations::archive_conversation),
        )
        .route(
            "/v1/conversations/:id/unarchive",
            post(conversations::unarchive_conversation),
        )
        .route(
            "/v1/conversations/:id/mute",
            post(conversations::mute_conversation),
        )
        .route(
            "/v1/conversations/:id/unmute",
            post(conversations::unmute_conversation),
        )
        .route(
            "/v1/conversations/:id/pin",
            post(conversations::pin_conversation),
        )
        .route(
            "/v1/conversations/:id/unpin",
            post(conversations::unpin_conversation),
        )
        // Messages
        .route(
            "/v1/conversations/:id/messages",
            get(messages::get_messages),
        )
        .route(
            "/v1/conversations/:id/messages",
            post(messages::send_message),
        )
        .route("/v1/messages/:id", patch(messages::edit_message))
        .route("/v1/messages/:id", delete(messages::delete_message));

    // Merge public and authenticated routes
    // Note: Authentication is enforced by using CurrentUser extractor in handlers
    public_routes.merge(authenticated_routes)
}
