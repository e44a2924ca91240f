//! API response DTOs
//!
//! Data Transfer Objects for the JSON REST surface.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::data::{Account, Message, MessagingSettings, Participant};
use crate::service::ConversationView;

/// Account response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountResponse {
    pub id: String,
    pub username: String,
    pub display_name: String,
    pub note: String,
    pub created_at: DateTime<Utc>,
}

impl From<Account> for AccountResponse {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            username: account.username,
            display_name: account.display_name.unwrap_or_default(),
            note: account.note.unwrap_or_default(),
            created_at: account.created_at,
        }
    }
}

/// Registration response: the account plus its one-time plaintext token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub account: AccountResponse,
    pub access_token: String,
}

/// Messaging settings response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagingSettingsResponse {
    pub policy: String,
    pub updated_at: DateTime<Utc>,
}

impl From<MessagingSettings> for MessagingSettingsResponse {
    fn from(settings: MessagingSettings) -> Self {
        Self {
            policy: settings.policy,
            updated_at: settings.updated_at,
        }
    }
}

/// Message response
///
/// Soft-deleted messages are rendered as tombstones: empty content
/// with `deleted: true`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub id: String,
    pub conversation_id: String,
    pub sender_id: String,
    pub content: String,
    pub message_type: String,
    pub reply_to_id: Option<String>,
    pub deleted: bool,
    pub edited: bool,
    pub created_at: DateTime<Utc>,
    pub edited_at: Option<DateTime<Utc>>,
}

impl From<Message> for MessageResponse {
    fn from(message: Message) -> Self {
        Self {
            id: message.id,
            conversation_id: message.conversation_id,
            sender_id: message.sender_id,
            content: if message.is_deleted {
                String::new()
            } else {
                message.content
            },
            message_type: message.message_type,
            reply_to_id: message.reply_to_id,
            deleted: message.is_deleted,
            edited: message.is_edited,
            created_at: message.created_at,
            edited_at: message.edited_at,
        }
    }
}

/// The viewer's own per-conversation state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipantStateResponse {
    pub is_request: bool,
    pub request_accepted: bool,
    pub is_muted: bool,
    pub is_pinned: bool,
    pub is_archived: bool,
    pub last_read_at: Option<DateTime<Utc>>,
}

impl From<Participant> for ParticipantStateResponse {
    fn from(participant: Participant) -> Self {
        Self {
            is_request: participant.is_request,
            request_accepted: participant.request_accepted,
            is_muted: participant.is_muted,
            is_pinned: participant.is_pinned,
            is_archived: participant.is_archived,
            last_read_at: participant.last_read_at,
        }
    }
}

/// Conversation response, as one participant sees it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationResponse {
    pub id: String,
    pub kind: String,
    pub updated_at: DateTime<Utc>,
    pub unread_count: i64,
    pub state: ParticipantStateResponse,
    pub members: Vec<AccountResponse>,
    pub last_message: Option<MessageResponse>,
}

impl From<ConversationView> for ConversationResponse {
    fn from(view: ConversationView) -> Self {
        Self {
            id: view.conversation.id,
            kind: view.conversation.kind,
            updated_at: view.conversation.updated_at,
            unread_count: view.unread_count,
            state: view.participant.into(),
            members: view.members.into_iter().map(Into::into).collect(),
            last_message: view.last_message.map(Into::into),
        }
    }
}

/// Relationship response, from the caller's perspective
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationshipResponse {
    pub account_id: String,
    pub relationship: String,
}
