//! Messaging policy evaluator
//!
//! Maps a receiver's messaging preference plus the sender→receiver
//! relationship into a (can_message, is_request) decision.

use std::sync::Arc;

use crate::data::{Database, MessagingPolicy};
use crate::error::AppError;
use crate::service::relationship::{Relationship, RelationshipService};

/// Outcome of a policy evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolicyDecision {
    pub can_message: bool,
    /// When allowed, whether the receiver's side opens as a request
    pub is_request: bool,
}

impl PolicyDecision {
    const DENY: Self = Self {
        can_message: false,
        is_request: false,
    };
    const ALLOW: Self = Self {
        can_message: true,
        is_request: false,
    };
    const ALLOW_AS_REQUEST: Self = Self {
        can_message: true,
        is_request: true,
    };
}

impl MessagingPolicy {
    /// Decide whether a sender with the given relationship (from the
    /// sender's perspective: `Following` = sender follows receiver)
    /// may open a conversation with an account using this policy.
    pub fn decide(&self, relationship: Relationship) -> PolicyDecision {
        use Relationship::*;

        match self {
            Self::Nobody => PolicyDecision::DENY,
            Self::Mutual => match relationship {
                Mutual => PolicyDecision::ALLOW,
                _ => PolicyDecision::DENY,
            },
            Self::Following => match relationship {
                Mutual | Following => PolicyDecision::ALLOW,
                _ => PolicyDecision::DENY,
            },
            Self::Followers => match relationship {
                Mutual => PolicyDecision::ALLOW,
                Following => PolicyDecision::ALLOW_AS_REQUEST,
                _ => PolicyDecision::DENY,
            },
            Self::Everyone => match relationship {
                Mutual => PolicyDecision::ALLOW,
                _ => PolicyDecision::ALLOW_AS_REQUEST,
            },
        }
    }
}

/// Messaging policy evaluation service
pub struct PolicyService {
    db: Arc<Database>,
    relationships: RelationshipService,
}

impl PolicyService {
    pub fn new(db: Arc<Database>) -> Self {
        let relationships = RelationshipService::new(db.clone());
        Self { db, relationships }
    }

    /// Evaluate whether `sender_id` may message `receiver_id`.
    ///
    /// The receiver's settings row is auto-created with the default
    /// policy (`everyone`) if absent. Self-messaging is rejected.
    pub async fn evaluate(
        &self,
        sender_id: &str,
        receiver_id: &str,
    ) -> Result<PolicyDecision, AppError> {
        if sender_id == receiver_id {
            return Err(AppError::Validation(
                "cannot open a conversation with yourself".to_string(),
            ));
        }

        let settings = self.db.ensure_messaging_settings(receiver_id).await?;
        let policy = MessagingPolicy::parse(&settings.policy).ok_or_else(|| {
            AppError::Internal(anyhow::anyhow!(
                "invalid messaging policy stored for account {}: {}",
                receiver_id,
                settings.policy
            ))
        })?;

        let relationship = self.relationships.resolve(sender_id, receiver_id).await?;
        let decision = policy.decide(relationship);

        tracing::debug!(
            sender = %sender_id,
            receiver = %receiver_id,
            policy = %policy.as_str(),
            relationship = %relationship.as_str(),
            can_message = decision.can_message,
            is_request = decision.is_request,
            "Evaluated messaging policy"
        );

        Ok(decision)
    }
}
