//! Message service
//!
//! Handles sending, editing, soft-deleting, and listing messages
//! within a conversation.

use std::sync::Arc;

use chrono::Utc;

use crate::data::{Database, EntityId, Message};
use crate::error::AppError;
use crate::metrics::MESSAGES_SENT_TOTAL;

const DEFAULT_MESSAGE_TYPE: &str = "text";

/// Message service
pub struct MessageService {
    db: Arc<Database>,
    max_message_length: usize,
}

impl MessageService {
    /// Create new message service
    pub fn new(db: Arc<Database>, max_message_length: usize) -> Self {
        Self {
            db,
            max_message_length,
        }
    }

    /// Send a message into a conversation the sender participates in.
    ///
    /// The policy gates conversation creation, not subsequent sends, so
    /// a sender may keep writing into a pending request. Bumps the
    /// conversation's activity timestamp.
    pub async fn send(
        &self,
        conversation_id: &str,
        sender_id: &str,
        content: String,
        reply_to_id: Option<String>,
    ) -> Result<Message, AppError> {
        self.db
            .get_participant(conversation_id, sender_id)
            .await?
            .ok_or(AppError::NotFound)?;

        let content = self.validate_content(content)?;

        if let Some(reply_to_id) = &reply_to_id {
            let replied = self
                .db
                .get_message(reply_to_id)
                .await?
                .filter(|message| message.conversation_id == conversation_id)
                .ok_or_else(|| {
                    AppError::Validation(
                        "reply_to_id must reference a message in the same conversation"
                            .to_string(),
                    )
                })?;
            if replied.is_deleted {
                return Err(AppError::Validation(
                    "cannot reply to a deleted message".to_string(),
                ));
            }
        }

        let message = Message {
            id: EntityId::new().0,
            conversation_id: conversation_id.to_string(),
            sender_id: sender_id.to_string(),
            content,
            message_type: DEFAULT_MESSAGE_TYPE.to_string(),
            reply_to_id,
            is_deleted: false,
            is_edited: false,
            created_at: Utc::now(),
            edited_at: None,
        };

        self.db.insert_message(&message).await?;

        MESSAGES_SENT_TOTAL
            .with_label_values(&[DEFAULT_MESSAGE_TYPE])
            .inc();
        tracing::debug!(
            conversation = %conversation_id,
            message = %message.id,
            "Message sent"
        );

        Ok(message)
    }

    /// List a page of the conversation's messages, newest first.
    pub async fn list(
        &self,
        conversation_id: &str,
        viewer_id: &str,
        limit: usize,
        max_id: Option<&str>,
        since_id: Option<&str>,
    ) -> Result<Vec<Message>, AppError> {
        self.db
            .get_participant(conversation_id, viewer_id)
            .await?
            .ok_or(AppError::NotFound)?;

        self.db
            .list_messages(conversation_id, limit, max_id, since_id)
            .await
    }

    /// Edit the sender's own message.
    pub async fn edit(
        &self,
        message_id: &str,
        sender_id: &str,
        content: String,
    ) -> Result<Message, AppError> {
        let content = self.validate_content(content)?;
        let edited_at = Utc::now();

        let updated = self
            .db
            .update_message_content(message_id, sender_id, &content, edited_at)
            .await?;
        if !updated {
            // Either missing, deleted, or not the caller's message.
            return match self.db.get_message(message_id).await? {
                Some(message) if message.sender_id != sender_id => Err(AppError::Forbidden),
                Some(_) => Err(AppError::Unprocessable(
                    "message has been deleted".to_string(),
                )),
                None => Err(AppError::NotFound),
            };
        }

        self.db
            .get_message(message_id)
            .await?
            .ok_or(AppError::NotFound)
    }

    /// Soft-delete the sender's own message, leaving a tombstone.
    pub async fn delete(&self, message_id: &str, sender_id: &str) -> Result<(), AppError> {
        let deleted = self.db.soft_delete_message(message_id, sender_id).await?;
        if !deleted {
            return match self.db.get_message(message_id).await? {
                Some(message) if message.sender_id != sender_id => Err(AppError::Forbidden),
                Some(_) => Ok(()), // already a tombstone; deleting twice is fine
                None => Err(AppError::NotFound),
            };
        }

        Ok(())
    }

    fn validate_content(&self, content: String) -> Result<String, AppError> {
        let trimmed = content.trim();
        if trimmed.is_empty() {
            return Err(AppError::Validation(
                "message content cannot be empty".to_string(),
            ));
        }
        if trimmed.chars().count() > self.max_message_length {
            return Err(AppError::Validation(format!(
                "message content exceeds {} characters",
                self.max_message_length
            )));
        }

        Ok(trimmed.to_string())
    }
}
