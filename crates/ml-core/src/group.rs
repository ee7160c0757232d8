//! Group Agents
//!
//! A group is a schedulable entity made of two or more members (agents or
//! other groups) under one link type. It keeps its own membership maps and
//! an internal relationship subgraph; the shared structures it touches are
//! borrowed from the engine's [`Books`] for the length of one call.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use rand::seq::SliceRandom;
use rand::RngCore;

use ml_events::{AgentKind, Attributes, EdgeFilter, EntityId, GroupId, LinkType};

use crate::books::Books;
use crate::graph::RelationshipGraph;
use crate::policy::{GroupPolicy, PolicyContext};
use crate::scheduler::{step_entity, StepCount, TickOptions};

/// Result of removing members from a group
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoveOutcome {
    /// The group is still at or above its floor
    Retained,
    /// The group fell below its floor. Its remaining members have been
    /// released and the caller must tear the group itself down.
    Dissolved {
        link_type: LinkType,
        remaining: Vec<EntityId>,
    },
}

impl RemoveOutcome {
    pub fn is_dissolved(&self) -> bool {
        matches!(self, RemoveOutcome::Dissolved { .. })
    }
}

pub struct GroupAgent {
    id: GroupId,
    link_type: LinkType,
    sub_agents: BTreeMap<EntityId, AgentKind>,
    subs_by_type: BTreeMap<AgentKind, BTreeSet<EntityId>>,
    internal: RelationshipGraph,
    policy: Option<RefCell<Box<dyn GroupPolicy>>>,
    active: bool,
    /// Members that joined with `double` and keep their own schedule slot
    doubled: BTreeSet<EntityId>,
}

impl fmt::Debug for GroupAgent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GroupAgent")
            .field("id", &self.id)
            .field("link_type", &self.link_type)
            .field("members", &self.sub_agents.len())
            .field("has_policy", &self.policy.is_some())
            .field("active", &self.active)
            .field("doubled", &self.doubled.len())
            .finish()
    }
}

impl GroupAgent {
    /// Create an empty group. Members arrive through [`GroupAgent::add`].
    pub fn new(id: GroupId, link_type: LinkType, policy: Option<Box<dyn GroupPolicy>>) -> Self {
        Self {
            id,
            link_type,
            sub_agents: BTreeMap::new(),
            subs_by_type: BTreeMap::new(),
            internal: RelationshipGraph::new(),
            policy: policy.map(RefCell::new),
            active: true,
            doubled: BTreeSet::new(),
        }
    }

    pub fn id(&self) -> &GroupId {
        &self.id
    }

    pub fn entity_id(&self) -> EntityId {
        EntityId::Group(self.id.clone())
    }

    pub fn link_type(&self) -> &LinkType {
        &self.link_type
    }

    pub fn len(&self) -> usize {
        self.sub_agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sub_agents.is_empty()
    }

    pub fn contains(&self, member: &EntityId) -> bool {
        self.sub_agents.contains_key(member)
    }

    /// Members in id order
    pub fn members(&self) -> impl Iterator<Item = &EntityId> {
        self.sub_agents.keys()
    }

    pub fn member_kind(&self, member: &EntityId) -> Option<&AgentKind> {
        self.sub_agents.get(member)
    }

    pub fn members_of_kind(&self, kind: &AgentKind) -> Vec<EntityId> {
        self.subs_by_type
            .get(kind)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Member counts per kind
    pub fn kinds(&self) -> BTreeMap<AgentKind, usize> {
        self.subs_by_type
            .iter()
            .map(|(kind, set)| (kind.clone(), set.len()))
            .collect()
    }

    pub fn internal_graph(&self) -> &RelationshipGraph {
        &self.internal
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub(crate) fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    /// Whether `member` joined with `double` and keeps its own place on the
    /// schedule
    pub fn is_double_member(&self, member: &EntityId) -> bool {
        self.doubled.contains(member)
    }

    pub fn has_policy(&self) -> bool {
        self.policy.is_some()
    }

    /// Add members. A newcomer is connected to every existing member of the
    /// internal subgraph and recorded in the reverse index. `double` marks
    /// the newcomers as also stepping on their own. Members already present
    /// and entities that are no longer live are skipped.
    pub fn add(&mut self, members: &[EntityId], double: bool, books: &mut Books) -> usize {
        let mut added = 0;
        for member in members {
            if self.sub_agents.contains_key(member) {
                continue;
            }
            let Some(kind) = books.kind_of(member) else {
                tracing::debug!(group = %self.id, %member, "Skipping stale member");
                continue;
            };

            let existing: Vec<EntityId> = self.sub_agents.keys().cloned().collect();
            self.internal.add_node(member.clone());
            for other in &existing {
                self.internal.add_edge(member, other, Attributes::new());
            }

            self.subs_by_type
                .entry(kind.clone())
                .or_default()
                .insert(member.clone());
            self.sub_agents.insert(member.clone(), kind);
            if double {
                self.doubled.insert(member.clone());
            }
            books.reverse.add(member, &self.link_type, &self.id);
            added += 1;
        }
        added
    }

    /// Record the relationship that justified a membership on the internal
    /// subgraph. Both ends must already be members.
    pub fn link(&mut self, a: &EntityId, b: &EntityId, attrs: Attributes) -> bool {
        if !self.contains(a) || !self.contains(b) {
            return false;
        }
        self.internal.add_edge(a, b, attrs)
    }

    /// Drop an internal edge
    pub fn unlink(&mut self, a: &EntityId, b: &EntityId) -> bool {
        self.internal.remove_edge(a, b)
    }

    /// Remove members. Non-members are ignored.
    ///
    /// Removed members lose their reverse-index entry for this group. When
    /// the size falls below `min_for_group` every remaining member is
    /// released as well and, with `reintroduce`, put back on the schedule.
    pub fn remove(
        &mut self,
        ids: &[EntityId],
        min_for_group: usize,
        reintroduce: bool,
        books: &mut Books,
    ) -> RemoveOutcome {
        for id in ids {
            let Some(kind) = self.sub_agents.remove(id) else {
                continue;
            };
            if let Some(set) = self.subs_by_type.get_mut(&kind) {
                set.remove(id);
                if set.is_empty() {
                    self.subs_by_type.remove(&kind);
                }
            }
            self.internal.remove_node(id);
            self.doubled.remove(id);
            books.reverse.discard(id, &self.link_type, &self.id);
        }

        if self.sub_agents.len() >= min_for_group {
            return RemoveOutcome::Retained;
        }

        let remaining: Vec<EntityId> = self.sub_agents.keys().cloned().collect();
        for member in &remaining {
            books.reverse.discard(member, &self.link_type, &self.id);
        }
        self.doubled.clear();
        if reintroduce {
            for member in &remaining {
                books.reinstate(member);
            }
        }
        tracing::debug!(
            group = %self.id,
            link = %self.link_type,
            remaining = remaining.len(),
            "Group fell below its floor"
        );
        RemoveOutcome::Dissolved {
            link_type: self.link_type.clone(),
            remaining,
        }
    }

    /// Snapshot of internal edges matching `filter`
    pub fn edge_buffer(&self, filter: &EdgeFilter) -> Vec<(EntityId, EntityId)> {
        self.internal
            .edges(filter)
            .map(|(a, b, _)| (a.clone(), b.clone()))
            .collect()
    }

    /// Default tick: step every member, optionally in shuffled order.
    /// Members of the constant kind are left to the scheduler's own pass.
    pub fn step(
        &self,
        books: &Books,
        options: &TickOptions,
        shuffled: bool,
        rng: &mut dyn RngCore,
        counts: &mut StepCount,
    ) {
        let members: Vec<EntityId> = self.sub_agents.keys().cloned().collect();
        self.step_members(members, books, options, shuffled, rng, counts);
    }

    /// Step only the members of one kind
    pub fn step_by_type(
        &self,
        kind: &AgentKind,
        books: &Books,
        options: &TickOptions,
        shuffled: bool,
        rng: &mut dyn RngCore,
        counts: &mut StepCount,
    ) {
        let members = self.members_of_kind(kind);
        self.step_members(members, books, options, shuffled, rng, counts);
    }

    fn step_members(
        &self,
        mut members: Vec<EntityId>,
        books: &Books,
        options: &TickOptions,
        shuffled: bool,
        rng: &mut dyn RngCore,
        counts: &mut StepCount,
    ) {
        if shuffled {
            members.shuffle(&mut *rng);
        }
        for member in &members {
            step_entity(books, member, options, &mut *rng, counts);
        }
    }

    /// Composite tick. A policy, if attached, takes over the whole tick;
    /// otherwise members step by kind (when `by_type` is set) or all at once.
    pub fn group_step(
        &self,
        books: &Books,
        options: &TickOptions,
        rng: &mut dyn RngCore,
        counts: &mut StepCount,
    ) -> bool {
        if !self.active {
            return false;
        }
        counts.groups += 1;

        if let Some(policy) = &self.policy {
            let Ok(mut policy) = policy.try_borrow_mut() else {
                tracing::warn!(group = %self.id, "Policy re-entered; skipping tick");
                return false;
            };
            let mut ctx = PolicyContext {
                group: self,
                books,
                options,
                rng,
                counts,
            };
            policy.step(&mut ctx);
            return true;
        }

        match &options.by_type {
            Some(kinds) => {
                for kind in kinds {
                    if options.constant.as_ref() == Some(kind) {
                        continue;
                    }
                    self.step_by_type(kind, books, options, options.shuffled, rng, counts);
                }
            }
            None => self.step(books, options, options.shuffled, rng, counts),
        }
        true
    }
}
