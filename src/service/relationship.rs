//! Relationship resolver
//!
//! Derives the relationship between two accounts from the directed
//! follow edge set. Two existence checks, no side effects.

use std::sync::Arc;

use serde::Serialize;

use crate::data::Database;
use crate::error::AppError;

/// Relationship between a viewer and another account,
/// seen from the viewer's side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Relationship {
    /// Both follow each other
    Mutual,
    /// The viewer follows the other account
    Following,
    /// The other account follows the viewer
    Follower,
    /// No follow edge in either direction
    None,
}

impl Relationship {
    /// Classify from the two directed edge checks.
    pub fn classify(viewer_follows_other: bool, other_follows_viewer: bool) -> Self {
        match (viewer_follows_other, other_follows_viewer) {
            (true, true) => Self::Mutual,
            (true, false) => Self::Following,
            (false, true) => Self::Follower,
            (false, false) => Self::None,
        }
    }

    /// The same relationship seen from the other account's side.
    pub fn inverse(self) -> Self {
        match self {
            Self::Following => Self::Follower,
            Self::Follower => Self::Following,
            other => other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mutual => "mutual",
            Self::Following => "following",
            Self::Follower => "follower",
            Self::None => "none",
        }
    }
}

/// Relationship resolution service
pub struct RelationshipService {
    db: Arc<Database>,
}

impl RelationshipService {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Resolve the relationship from `viewer_id`'s perspective.
    pub async fn resolve(&self, viewer_id: &str, other_id: &str) -> Result<Relationship, AppError> {
        let viewer_follows_other = self.db.follow_exists(viewer_id, other_id).await?;
        let other_follows_viewer = self.db.follow_exists(other_id, viewer_id).await?;

        Ok(Relationship::classify(
            viewer_follows_other,
            other_follows_viewer,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_covers_all_edge_combinations() {
        assert_eq!(Relationship::classify(true, true), Relationship::Mutual);
        assert_eq!(Relationship::classify(true, false), Relationship::Following);
        assert_eq!(Relationship::classify(false, true), Relationship::Follower);
        assert_eq!(Relationship::classify(false, false), Relationship::None);
    }

    #[test]
    fn resolve_is_symmetric_under_inverse() {
        // resolve(A,B) with edges (a->b, b->a) equals the inverse of
        // resolve(B,A) with the same edges seen from B's side.
        for a_follows_b in [false, true] {
            for b_follows_a in [false, true] {
                let from_a = Relationship::classify(a_follows_b, b_follows_a);
                let from_b = Relationship::classify(b_follows_a, a_follows_b);
                assert_eq!(from_a, from_b.inverse());
            }
        }
    }
}
