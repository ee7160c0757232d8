//! Group Lifecycle Events
//!
//! Records of every structural change the grouping engine makes. The engine
//! buffers these; hosts drain and log them as JSONL.

use serde::{Deserialize, Serialize};

use crate::ids::{AgentId, EntityId, GroupId, LinkType};

/// What happened to a group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupEventKind {
    /// A new group was created from two unaffiliated entities
    Formed,
    /// An unaffiliated entity joined an existing group
    Joined,
    /// A member left a group during reassessment or deregistration
    Detached,
    /// A group fell below the membership floor and was torn down
    Dissolved,
    /// A leaf agent was removed from the engine
    Deregistered,
}

/// A single lifecycle record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupEvent {
    /// Monotonic sequence number within one engine
    pub sequence: u64,
    pub kind: GroupEventKind,
    /// Group concerned (absent for plain deregistrations)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<GroupId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_type: Option<LinkType>,
    /// Entities the change applied to
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entities: Vec<EntityId>,
}

impl GroupEvent {
    pub fn formed(sequence: u64, group: GroupId, link: LinkType, members: Vec<EntityId>) -> Self {
        Self {
            sequence,
            kind: GroupEventKind::Formed,
            group_id: Some(group),
            link_type: Some(link),
            entities: members,
        }
    }

    pub fn joined(sequence: u64, group: GroupId, link: LinkType, entity: EntityId) -> Self {
        Self {
            sequence,
            kind: GroupEventKind::Joined,
            group_id: Some(group),
            link_type: Some(link),
            entities: vec![entity],
        }
    }

    pub fn detached(sequence: u64, group: GroupId, link: LinkType, entities: Vec<EntityId>) -> Self {
        Self {
            sequence,
            kind: GroupEventKind::Detached,
            group_id: Some(group),
            link_type: Some(link),
            entities,
        }
    }

    /// `remaining` are the members released when the group died
    pub fn dissolved(sequence: u64, group: GroupId, link: LinkType, remaining: Vec<EntityId>) -> Self {
        Self {
            sequence,
            kind: GroupEventKind::Dissolved,
            group_id: Some(group),
            link_type: Some(link),
            entities: remaining,
        }
    }

    pub fn deregistered(sequence: u64, agent: AgentId) -> Self {
        Self {
            sequence,
            kind: GroupEventKind::Deregistered,
            group_id: None,
            link_type: None,
            entities: vec![EntityId::Agent(agent)],
        }
    }

    /// Serializes the event to a JSON line (for JSONL format).
    pub fn to_jsonl(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserializes an event from a JSON line.
    pub fn from_jsonl(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line)
    }
}
