//! Group Engine
//!
//! Sole owner of the registry, relationship graph, reverse index, schedule
//! and group arena. Grouping, reassessment and deregistration passes live
//! in the submodules; this file holds registration, queries and the
//! consistency check.

mod grouping;
mod reassess;
mod teardown;

pub use grouping::{Cluster, GroupNaming, GroupingOptions, GroupingReport};
pub use reassess::ReassessReport;

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use ml_events::{
    generate_snapshot_id, AgentId, AgentKind, EntityId, GroupEvent, GroupId, GroupSnapshot,
    LinkType, PopulationSnapshot,
};

use crate::agent::{Agent, AgentRef, RegisteredAgent};
use crate::books::Books;
use crate::config::{ConfigError, EngineConfig, MIN_GROUP_FLOOR};
use crate::error::{GroupError, Result};
use crate::events::PendingEvents;
use crate::graph::RelationshipGraph;
use crate::group::GroupAgent;
use crate::reverse::ReverseIndex;

#[derive(Debug)]
pub struct GroupEngine {
    books: Books,
    config: EngineConfig,
    next_group: u64,
    snapshots_taken: u64,
    events: PendingEvents,
}

impl GroupEngine {
    pub fn new(config: EngineConfig) -> std::result::Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            books: Books::new(),
            config,
            next_group: 0,
            snapshots_taken: 0,
            events: PendingEvents::new(),
        })
    }

    /// Engine with a floor of two and flat grouping
    pub fn with_defaults() -> Self {
        Self {
            books: Books::new(),
            config: EngineConfig::default(),
            next_group: 0,
            snapshots_taken: 0,
            events: PendingEvents::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn books(&self) -> &Books {
        &self.books
    }

    pub fn graph(&self) -> &RelationshipGraph {
        &self.books.graph
    }

    pub fn reverse(&self) -> &ReverseIndex {
        &self.books.reverse
    }

    // ============ Registration ============

    /// Register a leaf agent. `schedule` puts it on the independent
    /// schedule, `net` adds it as a node of the relationship graph.
    /// Registering an id twice keeps the first registration.
    pub fn add(&mut self, agent: AgentRef, schedule: bool, net: bool) -> AgentId {
        let (id, kind) = {
            let inner = agent.borrow();
            (inner.id(), inner.kind())
        };
        if self.books.agents.contains_key(&id) {
            tracing::warn!(agent = %id, "Agent already registered");
            return id;
        }

        let entity = EntityId::Agent(id.clone());
        if net {
            self.books.graph.add_node(entity.clone());
        }
        if schedule {
            self.books.schedule.insert(entity);
        }
        self.books
            .by_kind
            .entry(kind.clone())
            .or_default()
            .insert(id.clone());
        self.books.agents.insert(
            id.clone(),
            RegisteredAgent {
                handle: agent,
                kind,
                networked: net,
            },
        );
        id
    }

    /// Register a scheduled, networked agent and hand back a typed handle
    pub fn register<A: Agent + 'static>(&mut self, agent: A) -> Rc<RefCell<A>> {
        let handle = Rc::new(RefCell::new(agent));
        let shared: AgentRef = handle.clone();
        self.add(shared, true, true);
        handle
    }

    pub fn contains_agent(&self, id: &AgentId) -> bool {
        self.books.agents.contains_key(id)
    }

    pub fn contains_group(&self, id: &GroupId) -> bool {
        self.books.groups.contains_key(id)
    }

    pub fn is_live(&self, entity: &EntityId) -> bool {
        self.books.is_live(entity)
    }

    pub fn agent(&self, id: &AgentId) -> Option<AgentRef> {
        self.books.agents.get(id).map(|a| a.handle.clone())
    }

    pub fn group(&self, id: &GroupId) -> Option<&GroupAgent> {
        self.books.groups.get(id)
    }

    /// Live groups in id order
    pub fn groups(&self) -> impl Iterator<Item = &GroupAgent> {
        self.books.groups.values()
    }

    /// Suspend or resume a group's stepping. Returns false for unknown ids.
    pub fn set_group_active(&mut self, id: &GroupId, active: bool) -> bool {
        match self.books.groups.get_mut(id) {
            Some(group) => {
                group.set_active(active);
                true
            }
            None => false,
        }
    }

    // ============ Queries ============

    /// Registered leaf agents per kind
    pub fn agent_count(&self) -> BTreeMap<AgentKind, usize> {
        self.books
            .by_kind
            .iter()
            .map(|(kind, ids)| (kind.clone(), ids.len()))
            .collect()
    }

    pub fn total_agents(&self) -> usize {
        self.books.agents.len()
    }

    /// Entities on the independent schedule
    pub fn active_agent_count(&self) -> usize {
        self.books.schedule.len()
    }

    pub fn group_count(&self) -> usize {
        self.books.groups.len()
    }

    /// First group of `entity` under `link`
    pub fn group_of(&self, entity: &EntityId, link: &LinkType) -> Option<GroupId> {
        self.books.reverse.first_group(entity, link).cloned()
    }

    pub fn groups_of(&self, entity: &EntityId, link: &LinkType) -> Vec<GroupId> {
        self.books.reverse.groups_of(entity, link)
    }

    pub fn is_scheduled(&self, entity: &EntityId) -> bool {
        self.books.schedule.contains(entity)
    }

    pub fn scheduled(&self) -> Vec<EntityId> {
        self.books.schedule.iter().cloned().collect()
    }

    /// Capture the grouping state at `tick`
    pub fn snapshot(&mut self, tick: u64) -> PopulationSnapshot {
        self.snapshots_taken += 1;
        let groups = self
            .books
            .groups
            .values()
            .map(|group| GroupSnapshot {
                group_id: group.id().clone(),
                link_type: group.link_type().clone(),
                members: group.members().cloned().collect(),
                members_by_kind: group
                    .kinds()
                    .into_iter()
                    .map(|(kind, count)| (kind.0, count))
                    .collect(),
                has_policy: group.has_policy(),
                scheduled: self.books.schedule.contains(&group.entity_id()),
            })
            .collect();

        PopulationSnapshot {
            snapshot_id: generate_snapshot_id(self.snapshots_taken),
            tick,
            run_id: None,
            agents_by_kind: self
                .agent_count()
                .into_iter()
                .map(|(kind, count)| (kind.0, count))
                .collect(),
            active_count: self.books.schedule.len(),
            edge_count: self.books.graph.edge_count(),
            groups,
        }
    }

    /// Lifecycle events recorded since the last drain
    pub fn drain_events(&mut self) -> Vec<GroupEvent> {
        self.events.drain()
    }

    pub fn pending_events(&self) -> usize {
        self.events.len()
    }

    /// Verify every structural invariant across the books
    pub fn check_consistency(&self) -> Result<()> {
        let books = &self.books;

        for (kind, ids) in &books.by_kind {
            for id in ids {
                match books.agents.get(id) {
                    Some(agent) if &agent.kind == kind => {}
                    _ => {
                        return Err(GroupError::inconsistency(format!(
                            "type index lists {} under {} but the registry disagrees",
                            id, kind
                        )))
                    }
                }
            }
        }
        let indexed: usize = books.by_kind.values().map(|ids| ids.len()).sum();
        if indexed != books.agents.len() {
            return Err(GroupError::inconsistency(format!(
                "type index holds {} agents, registry holds {}",
                indexed,
                books.agents.len()
            )));
        }

        for (id, agent) in &books.agents {
            if agent.networked && !books.graph.contains_node(&EntityId::Agent(id.clone())) {
                return Err(GroupError::inconsistency(format!(
                    "networked agent {} missing from the graph",
                    id
                )));
            }
        }

        for (gid, group) in &books.groups {
            if group.id() != gid {
                return Err(GroupError::inconsistency(format!(
                    "group stored under {} reports id {}",
                    gid,
                    group.id()
                )));
            }
            // Groups form from a pair; the configured floor applies once
            // members start leaving.
            if group.len() < MIN_GROUP_FLOOR {
                return Err(GroupError::inconsistency(format!(
                    "group {} has {} members",
                    gid,
                    group.len()
                )));
            }
            let partitioned: usize = group.kinds().values().sum();
            if partitioned != group.len() {
                return Err(GroupError::inconsistency(format!(
                    "group {} kind partition covers {} of {} members",
                    gid,
                    partitioned,
                    group.len()
                )));
            }
            for member in group.members() {
                if !books.is_live(member) {
                    return Err(GroupError::inconsistency(format!(
                        "group {} holds dead member {}",
                        gid, member
                    )));
                }
                if !books.reverse.contains(member, group.link_type(), gid) {
                    return Err(GroupError::inconsistency(format!(
                        "member {} of {} missing from the reverse index",
                        member, gid
                    )));
                }
                if member.is_group() && !self.config.nesting {
                    return Err(GroupError::inconsistency(format!(
                        "group {} nests {} while nesting is disabled",
                        gid, member
                    )));
                }
            }
            if self.config.nesting && !books.graph.contains_node(&group.entity_id()) {
                return Err(GroupError::inconsistency(format!(
                    "group {} missing from the graph",
                    gid
                )));
            }
        }

        for entity in books.reverse.entities() {
            for (link, gid) in books.reverse.memberships(entity) {
                let Some(group) = books.groups.get(&gid) else {
                    return Err(GroupError::UnknownGroup {
                        group: gid,
                        link_type: link,
                    });
                };
                if group.link_type() != &link || !group.contains(entity) {
                    return Err(GroupError::inconsistency(format!(
                        "reverse index places {} in {} under {}, group disagrees",
                        entity, gid, link
                    )));
                }
            }
        }

        for entity in &books.schedule {
            if !books.is_live(entity) {
                return Err(GroupError::inconsistency(format!(
                    "schedule holds dead entity {}",
                    entity
                )));
            }
            for (_, gid) in books.reverse.memberships(entity) {
                if books
                    .groups
                    .get(&gid)
                    .map_or(false, |g| !g.is_double_member(entity))
                {
                    return Err(GroupError::inconsistency(format!(
                        "{} is scheduled while grouped in {}",
                        entity, gid
                    )));
                }
            }
        }

        Ok(())
    }

    fn allocate_group_id(&mut self, link: &LinkType, naming: &GroupNaming) -> Result<GroupId> {
        let prefix = match naming {
            GroupNaming::Fixed(id) => {
                if self.books.groups.contains_key(id) {
                    return Err(GroupError::DuplicateGroupId(id.clone()));
                }
                return Ok(id.clone());
            }
            GroupNaming::Auto => link.as_str().to_string(),
            GroupNaming::Prefixed(prefix) => prefix.clone(),
        };
        loop {
            let candidate = GroupId::from(format!("{}_{}", prefix, self.next_group));
            self.next_group += 1;
            if !self.books.groups.contains_key(&candidate) {
                return Ok(candidate);
            }
        }
    }
}
