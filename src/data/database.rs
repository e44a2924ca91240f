//! SQLite database operations
//!
//! All database access goes through this module.

use chrono::{DateTime, Utc};
use sqlx::{Pool, Sqlite, SqlitePool};
use std::path::Path;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use sha2::{Digest, Sha256};

use super::models::*;
use crate::error::AppError;

const ACCESS_TOKEN_HASH_PREFIX: &str = "sha256:";

/// Hash a plaintext bearer token for storage.
///
/// Tokens are stored as `sha256:<base64url(digest)>` so a leaked
/// database does not leak usable credentials.
pub(crate) fn hash_access_token(access_token: &str) -> String {
    let digest = Sha256::digest(access_token.as_bytes());
    format!("{}{}", ACCESS_TOKEN_HASH_PREFIX, URL_SAFE_NO_PAD.encode(digest))
}

fn is_unique_violation(error: &sqlx::Error) -> bool {
    matches!(
        error,
        sqlx::Error::Database(db_error) if db_error.is_unique_violation()
    )
}

/// Canonical DM pair key: the two member ids sorted and joined.
///
/// Makes conversation lookup order-independent and lets a unique
/// index enforce at most one DM per pair.
pub fn dm_key(a: &str, b: &str) -> String {
    if a <= b {
        format!("{}:{}", a, b)
    } else {
        format!("{}:{}", b, a)
    }
}

/// Which slice of an account's conversations to list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationFilter {
    /// Accepted, non-archived conversations (the default inbox)
    Primary,
    /// Pending message requests
    Requests,
    /// Archived conversations
    Archived,
}

/// Database connection pool wrapper.
pub struct Database {
    pool: Pool<Sqlite>,
}

impl Database {
    // =========================================================================
    // Connection
    // =========================================================================

    /// Connect to SQLite database
    ///
    /// Creates the database file if it doesn't exist.
    /// Runs pending migrations automatically.
    ///
    /// # Arguments
    /// * `path` - Path to SQLite database file
    ///
    /// # Errors
    /// Returns error if connection or migration fails
    pub async fn connect(path: &Path) -> Result<Self, AppError> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| AppError::Database(sqlx::Error::Io(e)))?;
        }

        let connection_string = format!("sqlite:{}?mode=rwc", path.display());
        let pool = SqlitePool::connect(&connection_string).await?;

        sqlx::query("PRAGMA foreign_keys = ON")
            .execute(&pool)
            .await?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| {
                tracing::error!("Migration failed: {}", e);
                AppError::Internal(anyhow::anyhow!("Migration failed: {}", e))
            })?;

        tracing::info!("Database connected and migrated successfully");

        Ok(Self { pool })
    }

    // =========================================================================
    // Accounts
    // =========================================================================

    /// Insert a new account.
    ///
    /// # Returns
    /// `true` if inserted, `false` if the username is already taken.
    pub async fn insert_account(&self, account: &Account) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            INSERT INTO accounts (id, username, display_name, note, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&account.id)
        .bind(&account.username)
        .bind(&account.display_name)
        .bind(&account.note)
        .bind(account.created_at)
        .bind(account.updated_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(true),
            Err(error) if is_unique_violation(&error) => Ok(false),
            Err(error) => Err(error.into()),
        }
    }

    pub async fn get_account(&self, id: &str) -> Result<Option<Account>, AppError> {
        let account = sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(account)
    }

    pub async fn get_account_by_username(
        &self,
        username: &str,
    ) -> Result<Option<Account>, AppError> {
        let account = sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;

        Ok(account)
    }

    pub async fn count_accounts(&self) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM accounts")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    // =========================================================================
    // Follow graph
    // =========================================================================

    /// Insert a follow edge unless it already exists.
    ///
    /// # Returns
    /// `true` if a new edge was created.
    pub async fn insert_follow_if_absent(
        &self,
        follower_id: &str,
        target_id: &str,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO follows (id, follower_id, target_id, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(EntityId::new().0)
        .bind(follower_id)
        .bind(target_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Delete a follow edge.
    ///
    /// # Returns
    /// `true` if an edge was removed.
    pub async fn delete_follow(
        &self,
        follower_id: &str,
        target_id: &str,
    ) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM follows WHERE follower_id = ? AND target_id = ?")
            .bind(follower_id)
            .bind(target_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Check one direction of the follow edge set.
    pub async fn follow_exists(
        &self,
        follower_id: &str,
        target_id: &str,
    ) -> Result<bool, AppError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM follows WHERE follower_id = ? AND target_id = ?",
        )
        .bind(follower_id)
        .bind(target_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count > 0)
    }

    // =========================================================================
    // Messaging settings
    // =========================================================================

    /// Fetch the account's messaging settings, creating the default
    /// row (policy `everyone`) if none exists.
    pub async fn ensure_messaging_settings(
        &self,
        account_id: &str,
    ) -> Result<MessagingSettings, AppError> {
        sqlx::query(
            r#"
            INSERT OR IGNORE INTO messaging_settings (account_id, policy, updated_at)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(account_id)
        .bind(MessagingPolicy::default().as_str())
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        let settings = sqlx::query_as::<_, MessagingSettings>(
            "SELECT * FROM messaging_settings WHERE account_id = ?",
        )
        .bind(account_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(settings)
    }

    pub async fn update_messaging_settings(
        &self,
        account_id: &str,
        policy: MessagingPolicy,
    ) -> Result<MessagingSettings, AppError> {
        let updated_at = Utc::now();
        sqlx::query(
            r#"
            INSERT INTO messaging_settings (account_id, policy, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT (account_id) DO UPDATE SET policy = excluded.policy,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(account_id)
        .bind(policy.as_str())
        .bind(updated_at)
        .execute(&self.pool)
        .await?;

        Ok(MessagingSettings {
            account_id: account_id.to_string(),
            policy: policy.as_str().to_string(),
            updated_at,
        })
    }

    // =========================================================================
    // Conversations
    // =========================================================================

    pub async fn get_conversation(&self, id: &str) -> Result<Option<Conversation>, AppError> {
        let conversation =
            sqlx::query_as::<_, Conversation>("SELECT * FROM conversations WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(conversation)
    }

    /// Find the DM conversation between two accounts, if any.
    pub async fn find_dm_conversation(
        &self,
        a: &str,
        b: &str,
    ) -> Result<Option<Conversation>, AppError> {
        let conversation =
            sqlx::query_as::<_, Conversation>("SELECT * FROM conversations WHERE dm_key = ?")
                .bind(dm_key(a, b))
                .fetch_optional(&self.pool)
                .await?;

        Ok(conversation)
    }

    /// Create a DM conversation and both participant rows atomically.
    ///
    /// The sender's side is never a request; the receiver's side carries
    /// the policy decision. If a concurrent call created the conversation
    /// first, the existing one is returned instead.
    pub async fn create_dm_conversation(
        &self,
        sender_id: &str,
        receiver_id: &str,
        receiver_is_request: bool,
    ) -> Result<Conversation, AppError> {
        let now = Utc::now();
        let conversation = Conversation {
            id: EntityId::new().0,
            kind: ConversationKind::Dm.as_str().to_string(),
            dm_key: Some(dm_key(sender_id, receiver_id)),
            created_at: now,
            updated_at: now,
        };

        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO conversations (id, kind, dm_key, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&conversation.id)
        .bind(&conversation.kind)
        .bind(&conversation.dm_key)
        .bind(conversation.created_at)
        .bind(conversation.updated_at)
        .execute(&mut *tx)
        .await;

        if let Err(error) = inserted {
            drop(tx);
            if is_unique_violation(&error) {
                // Lost the race; the pair's conversation already exists.
                return self
                    .find_dm_conversation(sender_id, receiver_id)
                    .await?
                    .ok_or(AppError::NotFound);
            }
            return Err(error.into());
        }

        // Sender side: never a request.
        sqlx::query(
            r#"
            INSERT INTO participants (
                conversation_id, account_id, is_request, request_accepted, created_at
            ) VALUES (?, ?, 0, 1, ?)
            "#,
        )
        .bind(&conversation.id)
        .bind(sender_id)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        // Receiver side: carries the policy decision.
        sqlx::query(
            r#"
            INSERT INTO participants (
                conversation_id, account_id, is_request, request_accepted, created_at
            ) VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&conversation.id)
        .bind(receiver_id)
        .bind(receiver_is_request)
        .bind(!receiver_is_request)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(conversation)
    }

    /// Delete a conversation with its participants and messages.
    ///
    /// # Returns
    /// `true` if a conversation was removed.
    pub async fn delete_conversation(&self, id: &str) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM conversations WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    // =========================================================================
    // Participants
    // =========================================================================

    pub async fn get_participant(
        &self,
        conversation_id: &str,
        account_id: &str,
    ) -> Result<Option<Participant>, AppError> {
        let participant = sqlx::query_as::<_, Participant>(
            "SELECT * FROM participants WHERE conversation_id = ? AND account_id = ?",
        )
        .bind(conversation_id)
        .bind(account_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(participant)
    }

    pub async fn get_participants(
        &self,
        conversation_id: &str,
    ) -> Result<Vec<Participant>, AppError> {
        let participants = sqlx::query_as::<_, Participant>(
            "SELECT * FROM participants WHERE conversation_id = ? ORDER BY account_id",
        )
        .bind(conversation_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(participants)
    }

    /// Accept a pending message request.
    ///
    /// # Returns
    /// `true` if an active request was accepted, `false` when the
    /// participant is missing or has no active request.
    pub async fn accept_participant_request(
        &self,
        conversation_id: &str,
        account_id: &str,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE participants
            SET request_accepted = 1
            WHERE conversation_id = ? AND account_id = ?
              AND is_request = 1 AND request_accepted = 0
            "#,
        )
        .bind(conversation_id)
        .bind(account_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Set one of the per-participant boolean flags.
    pub async fn set_participant_flag(
        &self,
        conversation_id: &str,
        account_id: &str,
        flag: ParticipantFlag,
        value: bool,
    ) -> Result<bool, AppError> {
        let column = flag.column();
        let sql = format!(
            "UPDATE participants SET {} = ? WHERE conversation_id = ? AND account_id = ?",
            column
        );

        let result = sqlx::query(&sql)
            .bind(value)
            .bind(conversation_id)
            .bind(account_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Record that the participant has read the conversation up to `at`.
    pub async fn set_participant_last_read(
        &self,
        conversation_id: &str,
        account_id: &str,
        at: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE participants SET last_read_at = ? WHERE conversation_id = ? AND account_id = ?",
        )
        .bind(at)
        .bind(conversation_id)
        .bind(account_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// List an account's conversations, most recent activity first.
    pub async fn list_conversations(
        &self,
        account_id: &str,
        filter: ConversationFilter,
        limit: usize,
    ) -> Result<Vec<(Conversation, Participant)>, AppError> {
        let filter_sql = match filter {
            ConversationFilter::Primary => {
                "p.is_archived = 0 AND NOT (p.is_request = 1 AND p.request_accepted = 0)"
            }
            ConversationFilter::Requests => "p.is_request = 1 AND p.request_accepted = 0",
            ConversationFilter::Archived => "p.is_archived = 1",
        };

        let sql = format!(
            r#"
            SELECT c.id, c.kind, c.dm_key, c.created_at, c.updated_at,
                   p.conversation_id, p.account_id, p.is_request, p.request_accepted,
                   p.is_muted, p.is_pinned, p.is_archived, p.last_read_at,
                   p.created_at AS participant_created_at
            FROM conversations c
            JOIN participants p ON p.conversation_id = c.id
            WHERE p.account_id = ? AND {}
            ORDER BY c.updated_at DESC
            LIMIT ?
            "#,
            filter_sql
        );

        let rows = sqlx::query(&sql)
            .bind(account_id)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;

        use sqlx::Row;
        let mut results = Vec::with_capacity(rows.len());
        for row in rows {
            let conversation = Conversation {
                id: row.try_get("id")?,
                kind: row.try_get("kind")?,
                dm_key: row.try_get("dm_key")?,
                created_at: row.try_get("created_at")?,
                updated_at: row.try_get("updated_at")?,
            };
            let participant = Participant {
                conversation_id: row.try_get("conversation_id")?,
                account_id: row.try_get("account_id")?,
                is_request: row.try_get("is_request")?,
                request_accepted: row.try_get("request_accepted")?,
                is_muted: row.try_get("is_muted")?,
                is_pinned: row.try_get("is_pinned")?,
                is_archived: row.try_get("is_archived")?,
                last_read_at: row.try_get("last_read_at")?,
                created_at: row.try_get("participant_created_at")?,
            };
            results.push((conversation, participant));
        }

        Ok(results)
    }

    // =========================================================================
    // Messages
    // =========================================================================

    /// Insert a message and bump the conversation timestamp atomically.
    pub async fn insert_message(&self, message: &Message) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO messages (
                id, conversation_id, sender_id, content, message_type,
                reply_to_id, is_deleted, is_edited, created_at, edited_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&message.id)
        .bind(&message.conversation_id)
        .bind(&message.sender_id)
        .bind(&message.content)
        .bind(&message.message_type)
        .bind(&message.reply_to_id)
        .bind(message.is_deleted)
        .bind(message.is_edited)
        .bind(message.created_at)
        .bind(message.edited_at)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE conversations SET updated_at = ? WHERE id = ?")
            .bind(message.created_at)
            .bind(&message.conversation_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(())
    }

    pub async fn get_message(&self, id: &str) -> Result<Option<Message>, AppError> {
        let message = sqlx::query_as::<_, Message>("SELECT * FROM messages WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(message)
    }

    /// Page through a conversation's messages, newest first.
    ///
    /// ULIDs sort by creation time, so id-based paging doubles as
    /// time-based paging.
    pub async fn list_messages(
        &self,
        conversation_id: &str,
        limit: usize,
        max_id: Option<&str>,
        since_id: Option<&str>,
    ) -> Result<Vec<Message>, AppError> {
        let mut sql = String::from("SELECT * FROM messages WHERE conversation_id = ?");
        if max_id.is_some() {
            sql.push_str(" AND id < ?");
        }
        if since_id.is_some() {
            sql.push_str(" AND id > ?");
        }
        sql.push_str(" ORDER BY id DESC LIMIT ?");

        let mut query = sqlx::query_as::<_, Message>(&sql).bind(conversation_id);
        if let Some(max_id) = max_id {
            query = query.bind(max_id);
        }
        if let Some(since_id) = since_id {
            query = query.bind(since_id);
        }

        let messages = query.bind(limit as i64).fetch_all(&self.pool).await?;

        Ok(messages)
    }

    /// Latest non-deleted message of a conversation, if any.
    pub async fn get_last_message(
        &self,
        conversation_id: &str,
    ) -> Result<Option<Message>, AppError> {
        let message = sqlx::query_as::<_, Message>(
            r#"
            SELECT * FROM messages
            WHERE conversation_id = ? AND is_deleted = 0
            ORDER BY id DESC
            LIMIT 1
            "#,
        )
        .bind(conversation_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(message)
    }

    /// Replace a message's content, marking it edited.
    ///
    /// Only the sender may edit, and tombstones stay tombstones.
    pub async fn update_message_content(
        &self,
        id: &str,
        sender_id: &str,
        content: &str,
        edited_at: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE messages
            SET content = ?, is_edited = 1, edited_at = ?
            WHERE id = ? AND sender_id = ? AND is_deleted = 0
            "#,
        )
        .bind(content)
        .bind(edited_at)
        .bind(id)
        .bind(sender_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Soft-delete a message, leaving a tombstone row.
    pub async fn soft_delete_message(
        &self,
        id: &str,
        sender_id: &str,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE messages
            SET is_deleted = 1, content = ''
            WHERE id = ? AND sender_id = ? AND is_deleted = 0
            "#,
        )
        .bind(id)
        .bind(sender_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Count messages the participant has not read yet.
    ///
    /// With no `last_read_at`, every non-deleted message from other
    /// participants counts; otherwise only those newer than the mark.
    /// The viewer's own messages never count.
    pub async fn count_unread_messages(
        &self,
        conversation_id: &str,
        account_id: &str,
        last_read_at: Option<DateTime<Utc>>,
    ) -> Result<i64, AppError> {
        let count = match last_read_at {
            Some(last_read_at) => {
                sqlx::query_scalar::<_, i64>(
                    r#"
                    SELECT COUNT(*) FROM messages
                    WHERE conversation_id = ? AND sender_id != ?
                      AND is_deleted = 0 AND created_at > ?
                    "#,
                )
                .bind(conversation_id)
                .bind(account_id)
                .bind(last_read_at)
                .fetch_one(&self.pool)
                .await?
            }
            None => {
                sqlx::query_scalar::<_, i64>(
                    r#"
                    SELECT COUNT(*) FROM messages
                    WHERE conversation_id = ? AND sender_id != ? AND is_deleted = 0
                    "#,
                )
                .bind(conversation_id)
                .bind(account_id)
                .fetch_one(&self.pool)
                .await?
            }
        };

        Ok(count)
    }

    // =========================================================================
    // Access tokens
    // =========================================================================

    /// Store a freshly minted access token (hashed).
    pub async fn insert_access_token(
        &self,
        account_id: &str,
        plaintext_token: &str,
    ) -> Result<AccessToken, AppError> {
        let token = AccessToken {
            id: EntityId::new().0,
            account_id: account_id.to_string(),
            access_token: hash_access_token(plaintext_token),
            created_at: Utc::now(),
            revoked: false,
        };

        sqlx::query(
            r#"
            INSERT INTO access_tokens (id, account_id, access_token, created_at, revoked)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&token.id)
        .bind(&token.account_id)
        .bind(&token.access_token)
        .bind(token.created_at)
        .bind(token.revoked)
        .execute(&self.pool)
        .await?;

        Ok(token)
    }

    /// Resolve a plaintext bearer token to its account.
    pub async fn get_account_by_token(
        &self,
        plaintext_token: &str,
    ) -> Result<Option<Account>, AppError> {
        let account = sqlx::query_as::<_, Account>(
            r#"
            SELECT a.* FROM accounts a
            JOIN access_tokens t ON t.account_id = a.id
            WHERE t.access_token = ? AND t.revoked = 0
            "#,
        )
        .bind(hash_access_token(plaintext_token))
        .fetch_optional(&self.pool)
        .await?;

        Ok(account)
    }

    /// Revoke a token by its plaintext value.
    pub async fn revoke_access_token(&self, plaintext_token: &str) -> Result<bool, AppError> {
        let result =
            sqlx::query("UPDATE access_tokens SET revoked = 1 WHERE access_token = ? AND revoked = 0")
                .bind(hash_access_token(plaintext_token))
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected() == 1)
    }
}

/// Per-participant boolean flags that can be toggled individually.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParticipantFlag {
    Archived,
    Muted,
    Pinned,
}

impl ParticipantFlag {
    fn column(&self) -> &'static str {
        match self {
            Self::Archived => "is_archived",
            Self::Muted => "is_muted",
            Self::Pinned => "is_pinned",
        }
    }
}
