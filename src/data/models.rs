//! Data models
//!
//! Rust structs representing database entities.
//! All models use ULID for IDs and chrono for timestamps.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// ID Types
// =============================================================================

/// Entity ID wrapper (ULID format, 26 characters)
///
/// Example: "01ARZ3NDEKTSV4RRFFQ69G5FAV"
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub String);

impl EntityId {
    /// Generate a new ULID
    pub fn new() -> Self {
        Self(ulid::Ulid::new().to_string())
    }

    /// Create from existing string
    pub fn from_string(s: String) -> Self {
        Self(s)
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Account
// =============================================================================

/// A registered account
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Account {
    pub id: String,
    pub username: String,
    pub display_name: Option<String>,
    /// Bio/about text
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Follow graph
// =============================================================================

/// Directed follow edge: `follower_id` follows `target_id`
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Follow {
    pub id: String,
    pub follower_id: String,
    pub target_id: String,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Conversations
// =============================================================================

/// A conversation between accounts
///
/// DM conversations have exactly two participants; the `dm_key`
/// (sorted member id pair) enforces at most one DM per pair.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Conversation {
    pub id: String,
    /// Kind: dm, group
    pub kind: String,
    /// Sorted "{id}:{id}" pair for DMs, null for groups
    pub dm_key: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Bumped whenever a message arrives
    pub updated_at: DateTime<Utc>,
}

/// Conversation kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationKind {
    Dm,
    Group,
}

impl ConversationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dm => "dm",
            Self::Group => "group",
        }
    }
}

/// Per-account state within a conversation
///
/// One row exists for every (conversation, account) pair.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Participant {
    pub conversation_id: String,
    pub account_id: String,
    /// The conversation arrived as a message request for this side
    pub is_request: bool,
    /// The request (if any) has been accepted
    pub request_accepted: bool,
    pub is_muted: bool,
    pub is_pinned: bool,
    pub is_archived: bool,
    /// Unset until the participant first marks the conversation read
    pub last_read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Participant {
    /// Whether this side still has an unanswered message request.
    pub fn has_active_request(&self) -> bool {
        self.is_request && !self.request_accepted
    }
}

// =============================================================================
// Messages
// =============================================================================

/// A message within a conversation
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Message {
    pub id: String,
    pub conversation_id: String,
    pub sender_id: String,
    pub content: String,
    /// Type: text (others reserved)
    pub message_type: String,
    /// Message in the same conversation this replies to
    pub reply_to_id: Option<String>,
    /// Soft-delete flag; deleted messages become tombstones
    pub is_deleted: bool,
    pub is_edited: bool,
    pub created_at: DateTime<Utc>,
    pub edited_at: Option<DateTime<Utc>>,
}

// =============================================================================
// Messaging settings
// =============================================================================

/// Per-account messaging preference
///
/// Auto-created with policy `everyone` on first read.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct MessagingSettings {
    pub account_id: String,
    /// Policy: everyone, followers, following, mutual, nobody
    pub policy: String,
    pub updated_at: DateTime<Utc>,
}

/// Who may open an unsolicited conversation with the account
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessagingPolicy {
    Everyone,
    Followers,
    Following,
    Mutual,
    Nobody,
}

impl MessagingPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Everyone => "everyone",
            Self::Followers => "followers",
            Self::Following => "following",
            Self::Mutual => "mutual",
            Self::Nobody => "nobody",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "everyone" => Some(Self::Everyone),
            "followers" => Some(Self::Followers),
            "following" => Some(Self::Following),
            "mutual" => Some(Self::Mutual),
            "nobody" => Some(Self::Nobody),
            _ => None,
        }
    }
}

impl Default for MessagingPolicy {
    fn default() -> Self {
        Self::Everyone
    }
}

// =============================================================================
// Access tokens
// =============================================================================

/// Bearer access token
///
/// `access_token` holds a sha256 digest, never the plaintext token.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AccessToken {
    pub id: String,
    pub account_id: String,
    pub access_token: String,
    pub created_at: DateTime<Utc>,
    pub revoked: bool,
}
