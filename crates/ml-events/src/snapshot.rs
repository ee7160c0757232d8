//! Snapshot Types
//!
//! Serialization structs for population snapshots.
//!
//! A snapshot captures the grouping state of the engine at a point in time,
//! used for analysis and debugging.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::ids::{EntityId, GroupId, LinkType};

/// Generates a snapshot ID with the given sequence number.
pub fn generate_snapshot_id(sequence: u64) -> String {
    format!("snap_{:06}", sequence)
}

/// A single live group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupSnapshot {
    pub group_id: GroupId,
    pub link_type: LinkType,
    pub members: Vec<EntityId>,
    /// Member counts keyed by kind
    #[serde(default)]
    pub members_by_kind: BTreeMap<String, usize>,
    #[serde(default)]
    pub has_policy: bool,
    #[serde(default)]
    pub scheduled: bool,
}

impl GroupSnapshot {
    pub fn size(&self) -> usize {
        self.members.len()
    }

    /// Number of members that are themselves groups
    pub fn nested_count(&self) -> usize {
        self.members.iter().filter(|m| m.is_group()).count()
    }
}

/// Whole-population snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopulationSnapshot {
    pub snapshot_id: String,
    pub tick: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<Uuid>,
    /// Registered leaf agents keyed by kind
    pub agents_by_kind: BTreeMap<String, usize>,
    /// Entities in the independent schedule (agents and groups)
    pub active_count: usize,
    pub edge_count: usize,
    pub groups: Vec<GroupSnapshot>,
}

impl PopulationSnapshot {
    pub fn agent_total(&self) -> usize {
        self.agents_by_kind.values().sum()
    }

    /// Live groups under one link type
    pub fn groups_of(&self, link: &LinkType) -> Vec<&GroupSnapshot> {
        self.groups.iter().filter(|g| &g.link_type == link).collect()
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
