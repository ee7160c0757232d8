//! Engine Books
//!
//! The shared structures every grouping pass touches: agent registry, type
//! index, relationship graph, reverse index, schedule and the group arena.
//! Only the engine holds them mutably; groups receive `&mut Books` for the
//! duration of a single `add`/`remove` call.

use std::collections::{BTreeMap, BTreeSet};

use ml_events::{AgentId, AgentKind, EntityId, GroupId};

use crate::agent::RegisteredAgent;
use crate::graph::RelationshipGraph;
use crate::group::GroupAgent;
use crate::reverse::ReverseIndex;

#[derive(Debug, Default)]
pub struct Books {
    pub(crate) agents: BTreeMap<AgentId, RegisteredAgent>,
    pub(crate) by_kind: BTreeMap<AgentKind, BTreeSet<AgentId>>,
    pub(crate) graph: RelationshipGraph,
    pub(crate) reverse: ReverseIndex,
    pub(crate) schedule: BTreeSet<EntityId>,
    pub(crate) groups: BTreeMap<GroupId, GroupAgent>,
}

impl Books {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn agent(&self, id: &AgentId) -> Option<&RegisteredAgent> {
        self.agents.get(id)
    }

    pub fn group(&self, id: &GroupId) -> Option<&GroupAgent> {
        self.groups.get(id)
    }

    pub fn graph(&self) -> &RelationshipGraph {
        &self.graph
    }

    pub fn reverse(&self) -> &ReverseIndex {
        &self.reverse
    }

    pub fn schedule(&self) -> &BTreeSet<EntityId> {
        &self.schedule
    }

    /// Ids of registered agents of one kind
    pub fn agents_of_kind(&self, kind: &AgentKind) -> Vec<AgentId> {
        self.by_kind
            .get(kind)
            .map(|ids| ids.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Is the entity still registered (agent) or alive in the arena (group)?
    pub fn is_live(&self, entity: &EntityId) -> bool {
        match entity {
            EntityId::Agent(id) => self.agents.contains_key(id),
            EntityId::Group(id) => self.groups.contains_key(id),
        }
    }

    /// Type tag of a live entity. Groups always report the group kind.
    pub fn kind_of(&self, entity: &EntityId) -> Option<AgentKind> {
        match entity {
            EntityId::Agent(id) => self.agents.get(id).map(|a| a.kind.clone()),
            EntityId::Group(id) => self.groups.get(id).map(|_| AgentKind::group()),
        }
    }

    /// Put an entity back on the schedule if nothing keeps it off.
    ///
    /// An entity stays unscheduled while it still holds any membership it
    /// entered without `double`. Missing groups count as blocking.
    pub fn reinstate(&mut self, entity: &EntityId) -> bool {
        if !self.is_live(entity) {
            return false;
        }
        let blocked = self.reverse.memberships(entity).iter().any(|(_, gid)| {
            self.groups
                .get(gid)
                .map_or(true, |g| !g.is_double_member(entity))
        });
        if blocked {
            return false;
        }
        self.schedule.insert(entity.clone())
    }

    /// Every group reachable upward from `group` through the reverse index,
    /// including `group` itself
    pub fn ancestors_or_self(&self, group: &GroupId) -> BTreeSet<GroupId> {
        let mut seen = BTreeSet::new();
        let mut stack = vec![group.clone()];
        while let Some(current) = stack.pop() {
            if !seen.insert(current.clone()) {
                continue;
            }
            for (_, parent) in self.reverse.memberships(&EntityId::Group(current)) {
                stack.push(parent);
            }
        }
        seen
    }
}
