//! Identifier Types
//!
//! Newtype identifiers for agents, groups, agent kinds and link types, plus
//! the tagged [`EntityId`] that every schedule, membership and graph entry
//! stores.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind tag reserved for group agents.
pub const GROUP_KIND: &str = "group";

/// Link type used when the caller does not name a grouping dimension.
pub const DEFAULT_LINK_TYPE: &str = "group";

/// Unique identifier for a leaf agent
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AgentId(pub String);

impl AgentId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for AgentId {
    fn from(s: &str) -> Self {
        AgentId(s.to_string())
    }
}

impl From<String> for AgentId {
    fn from(s: String) -> Self {
        AgentId(s)
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a group agent
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GroupId(pub String);

impl GroupId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for GroupId {
    fn from(s: &str) -> Self {
        GroupId(s.to_string())
    }
}

impl From<String> for GroupId {
    fn from(s: String) -> Self {
        GroupId(s)
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Either a leaf agent or a group agent.
///
/// Serializes as `{"agent": "a1"}` or `{"group": "kinship_0"}`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityId {
    Agent(AgentId),
    Group(GroupId),
}

impl EntityId {
    pub fn agent(id: impl Into<AgentId>) -> Self {
        EntityId::Agent(id.into())
    }

    pub fn group(id: impl Into<GroupId>) -> Self {
        EntityId::Group(id.into())
    }

    pub fn is_group(&self) -> bool {
        matches!(self, EntityId::Group(_))
    }

    pub fn as_agent(&self) -> Option<&AgentId> {
        match self {
            EntityId::Agent(id) => Some(id),
            EntityId::Group(_) => None,
        }
    }

    pub fn as_group(&self) -> Option<&GroupId> {
        match self {
            EntityId::Group(id) => Some(id),
            EntityId::Agent(_) => None,
        }
    }

    /// The bare id string, without the variant tag
    pub fn as_str(&self) -> &str {
        match self {
            EntityId::Agent(id) => id.as_str(),
            EntityId::Group(id) => id.as_str(),
        }
    }
}

impl From<AgentId> for EntityId {
    fn from(id: AgentId) -> Self {
        EntityId::Agent(id)
    }
}

impl From<GroupId> for EntityId {
    fn from(id: GroupId) -> Self {
        EntityId::Group(id)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityId::Agent(id) => write!(f, "agent:{}", id),
            EntityId::Group(id) => write!(f, "group:{}", id),
        }
    }
}

/// Type tag of an agent (the "breed" of the agent)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AgentKind(pub String);

impl AgentKind {
    /// The kind every group agent carries
    pub fn group() -> Self {
        AgentKind(GROUP_KIND.to_string())
    }

    pub fn is_group(&self) -> bool {
        self.0 == GROUP_KIND
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for AgentKind {
    fn from(s: &str) -> Self {
        AgentKind(s.to_string())
    }
}

impl From<String> for AgentKind {
    fn from(s: String) -> Self {
        AgentKind(s)
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Grouping dimension (e.g. "kinship" vs "trade").
///
/// An entity may belong to at most one group per link type through the
/// grouping passes, but to any number of link types at once.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LinkType(pub String);

impl LinkType {
    pub fn new(s: impl Into<String>) -> Self {
        LinkType(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_default(&self) -> bool {
        self.0 == DEFAULT_LINK_TYPE
    }
}

impl Default for LinkType {
    fn default() -> Self {
        LinkType(DEFAULT_LINK_TYPE.to_string())
    }
}

impl From<&str> for LinkType {
    fn from(s: &str) -> Self {
        LinkType(s.to_string())
    }
}

impl From<String> for LinkType {
    fn from(s: String) -> Self {
        LinkType(s)
    }
}

impl fmt::Display for LinkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
