//! Service layer
//!
//! Contains business logic separated from HTTP handlers.
//! Services orchestrate database operations.

mod conversation;
mod message;
mod policy;
mod relationship;

pub use conversation::{ConversationService, ConversationView};
pub use message::MessageService;
pub use policy::{PolicyDecision, PolicyService};
pub use relationship::{Relationship, RelationshipService};
