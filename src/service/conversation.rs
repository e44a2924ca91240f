//! Conversation service
//!
//! Materializes DM conversations, resolves message requests, and
//! derives per-participant unread counts.

use std::sync::Arc;

use chrono::Utc;

use crate::data::{
    Account, Conversation, ConversationFilter, Database, Message, Participant, ParticipantFlag,
};
use crate::error::AppError;
use crate::metrics::{
    CONVERSATIONS_CREATED_TOTAL, MESSAGE_REQUESTS_RESOLVED_TOTAL, POLICY_DENIALS_TOTAL,
};
use crate::service::policy::PolicyService;

/// A conversation as one participant sees it
#[derive(Debug, Clone)]
pub struct ConversationView {
    pub conversation: Conversation,
    /// The viewer's own participant state
    pub participant: Participant,
    pub unread_count: i64,
    pub last_message: Option<Message>,
    /// The other members' accounts
    pub members: Vec<Account>,
}

/// Conversation service
pub struct ConversationService {
    db: Arc<Database>,
    policy: PolicyService,
}

impl ConversationService {
    /// Create new conversation service
    pub fn new(db: Arc<Database>) -> Self {
        let policy = PolicyService::new(db.clone());
        Self { db, policy }
    }

    /// Find or create the DM conversation between sender and receiver.
    ///
    /// Idempotent: an existing conversation is returned as-is without
    /// re-evaluating the policy. A new conversation is only created when
    /// the receiver's policy admits the sender; the receiver's side then
    /// carries the request flag the policy decided.
    pub async fn open_dm(
        &self,
        sender_id: &str,
        receiver_id: &str,
    ) -> Result<(Conversation, bool), AppError> {
        let receiver = self
            .db
            .get_account(receiver_id)
            .await?
            .ok_or(AppError::NotFound)?;

        if let Some(existing) = self.db.find_dm_conversation(sender_id, receiver_id).await? {
            return Ok((existing, false));
        }

        let decision = self.policy.evaluate(sender_id, receiver_id).await?;
        if !decision.can_message {
            let settings = self.db.ensure_messaging_settings(receiver_id).await?;
            POLICY_DENIALS_TOTAL
                .with_label_values(&[settings.policy.as_str()])
                .inc();
            tracing::info!(
                sender = %sender_id,
                receiver = %receiver.username,
                "Conversation open denied by messaging policy"
            );
            return Err(AppError::Forbidden);
        }

        let conversation = self
            .db
            .create_dm_conversation(sender_id, receiver_id, decision.is_request)
            .await?;

        CONVERSATIONS_CREATED_TOTAL
            .with_label_values(&[if decision.is_request { "request" } else { "direct" }])
            .inc();
        tracing::info!(
            conversation = %conversation.id,
            sender = %sender_id,
            receiver = %receiver_id,
            is_request = decision.is_request,
            "Conversation created"
        );

        Ok((conversation, true))
    }

    /// Fetch a conversation as seen by one of its participants.
    ///
    /// Non-participants get NotFound rather than Forbidden so the
    /// conversation's existence is not leaked.
    pub async fn view(
        &self,
        conversation_id: &str,
        viewer_id: &str,
    ) -> Result<ConversationView, AppError> {
        let conversation = self
            .db
            .get_conversation(conversation_id)
            .await?
            .ok_or(AppError::NotFound)?;
        let participant = self
            .db
            .get_participant(conversation_id, viewer_id)
            .await?
            .ok_or(AppError::NotFound)?;

        self.build_view(conversation, participant).await
    }

    /// List the viewer's conversations, most recent activity first.
    pub async fn list(
        &self,
        viewer_id: &str,
        filter: ConversationFilter,
        limit: usize,
    ) -> Result<Vec<ConversationView>, AppError> {
        let rows = self.db.list_conversations(viewer_id, filter, limit).await?;

        let mut views = Vec::with_capacity(rows.len());
        for (conversation, participant) in rows {
            views.push(self.build_view(conversation, participant).await?);
        }

        Ok(views)
    }

    /// Accept a pending message request.
    pub async fn accept_request(
        &self,
        conversation_id: &str,
        viewer_id: &str,
    ) -> Result<Participant, AppError> {
        self.require_participant(conversation_id, viewer_id).await?;

        let accepted = self
            .db
            .accept_participant_request(conversation_id, viewer_id)
            .await?;
        if !accepted {
            return Err(AppError::Unprocessable(
                "conversation has no pending request".to_string(),
            ));
        }

        MESSAGE_REQUESTS_RESOLVED_TOTAL
            .with_label_values(&["accepted"])
            .inc();
        tracing::info!(
            conversation = %conversation_id,
            account = %viewer_id,
            "Message request accepted"
        );

        self.db
            .get_participant(conversation_id, viewer_id)
            .await?
            .ok_or(AppError::NotFound)
    }

    /// Decline a pending message request.
    ///
    /// Removes the conversation and its messages for both sides, so a
    /// later open starts the policy evaluation from scratch.
    pub async fn decline_request(
        &self,
        conversation_id: &str,
        viewer_id: &str,
    ) -> Result<(), AppError> {
        let participant = self.require_participant(conversation_id, viewer_id).await?;

        if !participant.has_active_request() {
            return Err(AppError::Unprocessable(
                "conversation has no pending request".to_string(),
            ));
        }

        self.db.delete_conversation(conversation_id).await?;

        MESSAGE_REQUESTS_RESOLVED_TOTAL
            .with_label_values(&["declined"])
            .inc();
        tracing::info!(
            conversation = %conversation_id,
            account = %viewer_id,
            "Message request declined"
        );

        Ok(())
    }

    /// Mark the conversation read up to now.
    pub async fn mark_read(
        &self,
        conversation_id: &str,
        viewer_id: &str,
    ) -> Result<ConversationView, AppError> {
        self.require_participant(conversation_id, viewer_id).await?;

        self.db
            .set_participant_last_read(conversation_id, viewer_id, Utc::now())
            .await?;

        self.view(conversation_id, viewer_id).await
    }

    /// Toggle one of the viewer's participant flags.
    pub async fn set_flag(
        &self,
        conversation_id: &str,
        viewer_id: &str,
        flag: ParticipantFlag,
        value: bool,
    ) -> Result<ConversationView, AppError> {
        self.require_participant(conversation_id, viewer_id).await?;

        self.db
            .set_participant_flag(conversation_id, viewer_id, flag, value)
            .await?;

        self.view(conversation_id, viewer_id).await
    }

    async fn require_participant(
        &self,
        conversation_id: &str,
        viewer_id: &str,
    ) -> Result<Participant, AppError> {
        self.db
            .get_participant(conversation_id, viewer_id)
            .await?
            .ok_or(AppError::NotFound)
    }

    async fn build_view(
        &self,
        conversation: Conversation,
        participant: Participant,
    ) -> Result<ConversationView, AppError> {
        let unread_count = self
            .db
            .count_unread_messages(
                &conversation.id,
                &participant.account_id,
                participant.last_read_at,
            )
            .await?;
        let last_message = self.db.get_last_message(&conversation.id).await?;

        let mut members = Vec::new();
        for other in self.db.get_participants(&conversation.id).await? {
            if other.account_id == participant.account_id {
                continue;
            }
            if let Some(account) = self.db.get_account(&other.account_id).await? {
                members.push(account);
            }
        }

        Ok(ConversationView {
            conversation,
            participant,
            unread_count,
            last_message,
            members,
        })
    }
}
