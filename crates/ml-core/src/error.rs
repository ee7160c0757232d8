//! Error types for the grouping engine.

use ml_events::{GroupId, LinkType};
use thiserror::Error;

/// Errors surfaced by grouping, reassessment and removal passes.
///
/// Stale references (ids that are no longer registered) never produce an
/// error; they are skipped. Only caller contract violations and structural
/// inconsistencies reach the caller.
#[derive(Debug, Error)]
pub enum GroupError {
    /// A clustering producer yielded fewer than two entities
    #[error("Cluster must name at least 2 entities, got {0}")]
    ClusterTooSmall(usize),

    /// A reassessment check asked to detach fewer than two entities
    #[error("Detachment from group {group} must name at least 2 entities, got {len}")]
    MalformedDetachment { group: GroupId, len: usize },

    /// A caller-chosen group id is already taken by a live group
    #[error("Group id already in use: {0}")]
    DuplicateGroupId(GroupId),

    /// A group was offered as a member while the engine runs flat
    #[error("Group {0} cannot join another group: nesting is disabled")]
    NestingDisabled(GroupId),

    /// The reverse index names a group that is not registered
    #[error("Unknown group {group} referenced under link type {link_type}")]
    UnknownGroup { group: GroupId, link_type: LinkType },

    /// Any other broken invariant
    #[error("Structural inconsistency: {0}")]
    Inconsistency(String),
}

impl GroupError {
    /// Creates an inconsistency error.
    pub fn inconsistency(msg: impl Into<String>) -> Self {
        Self::Inconsistency(msg.into())
    }

    /// True for errors caused by the caller's inputs rather than engine state
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            GroupError::ClusterTooSmall(_)
                | GroupError::MalformedDetachment { .. }
                | GroupError::DuplicateGroupId(_)
                | GroupError::NestingDisabled(_)
        )
    }
}

/// Result alias used throughout the engine
pub type Result<T> = std::result::Result<T, GroupError>;
