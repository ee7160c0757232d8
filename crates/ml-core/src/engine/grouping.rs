//! Grouping passes.
//!
//! Pairs are processed first come, first served. Two unaffiliated entities
//! form a new group, an unaffiliated entity joins its partner's group, and
//! anything else only records the edge. Existing groups are never merged.

use ml_events::{Attributes, EdgeFilter, EntityId, GroupId, LinkType};

use super::GroupEngine;
use crate::error::{GroupError, Result};
use crate::group::GroupAgent;
use crate::policy::PolicyFactory;

/// How new group ids are chosen
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum GroupNaming {
    /// `"{link type}_{counter}"`
    #[default]
    Auto,
    /// `"{prefix}_{counter}"`
    Prefixed(String),
    /// Caller-chosen id; must not collide with a live group
    Fixed(GroupId),
}

/// Settings applied to every group a pass creates
#[derive(Clone, Default)]
pub struct GroupingOptions {
    pub naming: GroupNaming,
    /// Members keep stepping on their own as well as through the group
    pub double: bool,
    pub policy: Option<PolicyFactory>,
}

impl GroupingOptions {
    pub fn with_naming(mut self, naming: GroupNaming) -> Self {
        self.naming = naming;
        self
    }

    pub fn with_double(mut self, double: bool) -> Self {
        self.double = double;
        self
    }

    pub fn with_policy(mut self, policy: PolicyFactory) -> Self {
        self.policy = Some(policy);
        self
    }
}

impl std::fmt::Debug for GroupingOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroupingOptions")
            .field("naming", &self.naming)
            .field("double", &self.double)
            .field("policy", &self.policy.is_some())
            .finish()
    }
}

/// One cluster yielded by an explicit grouping producer. The first entity
/// is the hub and is paired with each of the others.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cluster {
    Members(Vec<EntityId>),
    Named(GroupId, Vec<EntityId>),
}

impl Cluster {
    pub fn members(&self) -> &[EntityId] {
        match self {
            Cluster::Members(members) | Cluster::Named(_, members) => members,
        }
    }
}

/// What a grouping pass did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupingReport {
    /// Groups created, in creation order
    pub formed: Vec<GroupId>,
    /// Entities that joined an existing group
    pub joined: usize,
    /// Pairs that only had their edge recorded
    pub linked: usize,
    /// Pairs or clusters skipped as stale or cyclic
    pub skipped: usize,
}

impl GroupingReport {
    fn absorb(&mut self, other: GroupingReport) {
        self.formed.extend(other.formed);
        self.joined += other.joined;
        self.linked += other.linked;
        self.skipped += other.skipped;
    }
}

impl GroupEngine {
    /// Core pairwise grouping pass over `links` under `link_type`
    pub fn group_iterate(
        &mut self,
        links: &[(EntityId, EntityId)],
        link_type: &LinkType,
        options: &GroupingOptions,
    ) -> Result<GroupingReport> {
        let mut report = GroupingReport::default();

        for (a, b) in links {
            if a == b || !self.books.is_live(a) || !self.books.is_live(b) {
                tracing::debug!(%a, %b, "Skipping stale or degenerate pair");
                report.skipped += 1;
                continue;
            }
            if !self.config.nesting {
                for entity in [a, b] {
                    if let EntityId::Group(gid) = entity {
                        return Err(GroupError::NestingDisabled(gid.clone()));
                    }
                }
            }

            if !self.books.reverse.shared_groups(a, b, link_type).is_empty() {
                self.books.graph.add_edge(a, b, Attributes::new());
                report.linked += 1;
                continue;
            }

            let home_a = self.books.reverse.first_group(a, link_type).cloned();
            let home_b = self.books.reverse.first_group(b, link_type).cloned();
            match (home_a, home_b) {
                (None, None) => {
                    let gid = self.form_pair(a, b, link_type, options)?;
                    report.formed.push(gid);
                }
                (None, Some(target)) => {
                    if self.join(a, b, &target, link_type, options.double)? {
                        report.joined += 1;
                    } else {
                        report.skipped += 1;
                    }
                }
                (Some(target), None) => {
                    if self.join(b, a, &target, link_type, options.double)? {
                        report.joined += 1;
                    } else {
                        report.skipped += 1;
                    }
                }
                (Some(_), Some(_)) => {
                    self.books.graph.add_edge(a, b, Attributes::new());
                    report.linked += 1;
                }
            }
        }

        Ok(report)
    }

    /// Explicit grouping from a producer of clusters
    pub fn form_group<I>(
        &mut self,
        producer: I,
        link_type: &LinkType,
        options: &GroupingOptions,
    ) -> Result<GroupingReport>
    where
        I: IntoIterator<Item = Cluster>,
    {
        let mut report = GroupingReport::default();

        for cluster in producer {
            let size = cluster.members().len();
            if size < 2 {
                return Err(GroupError::ClusterTooSmall(size));
            }
            let (naming, members) = match cluster {
                Cluster::Members(members) => (options.naming.clone(), members),
                Cluster::Named(id, members) => (GroupNaming::Fixed(id), members),
            };

            let live: Vec<EntityId> = members
                .into_iter()
                .filter(|entity| self.books.is_live(entity))
                .collect();
            if live.len() < 2 {
                tracing::debug!(size, live = live.len(), "Dropping cluster reduced below two");
                report.skipped += 1;
                continue;
            }

            let hub = &live[0];
            let pairs: Vec<(EntityId, EntityId)> = live[1..]
                .iter()
                .map(|member| (hub.clone(), member.clone()))
                .collect();
            let pass_options = GroupingOptions {
                naming,
                ..options.clone()
            };
            report.absorb(self.group_iterate(&pairs, link_type, &pass_options)?);
        }

        Ok(report)
    }

    /// Graph-driven grouping: every edge matching `filter` is a candidate
    /// pair, grouped under the link type the filter synthesizes.
    pub fn net_group(
        &mut self,
        filter: &EdgeFilter,
        options: &GroupingOptions,
    ) -> Result<GroupingReport> {
        let link_type = filter.link_type();
        let pairs: Vec<(EntityId, EntityId)> = self
            .books
            .graph
            .edges(filter)
            .map(|(a, b, _)| (a.clone(), b.clone()))
            .collect();
        tracing::debug!(link = %link_type, candidates = pairs.len(), "Graph-driven grouping");
        self.group_iterate(&pairs, &link_type, options)
    }

    /// Connect live entities on the global graph: a pair becomes one edge,
    /// a longer list every pairwise combination. A flat engine keeps groups
    /// off the graph and refuses them.
    pub fn add_link(&mut self, entities: &[EntityId], attrs: Attributes) -> Result<usize> {
        if !self.config.nesting {
            if let Some(gid) = entities.iter().find_map(EntityId::as_group) {
                return Err(GroupError::NestingDisabled(gid.clone()));
            }
        }
        let live: Vec<EntityId> = entities
            .iter()
            .filter(|entity| self.books.is_live(entity))
            .cloned()
            .collect();
        Ok(self.books.graph.add_edges(&live, &attrs))
    }

    /// Remove edges among `entities` from the global graph
    pub fn remove_link(&mut self, entities: &[EntityId]) -> usize {
        self.books.graph.remove_edges(entities)
    }

    /// Mutable access to a global edge's attributes
    pub fn link_attributes_mut(&mut self, a: &EntityId, b: &EntityId) -> Option<&mut Attributes> {
        self.books.graph.edge_attributes_mut(a, b)
    }

    fn form_pair(
        &mut self,
        a: &EntityId,
        b: &EntityId,
        link_type: &LinkType,
        options: &GroupingOptions,
    ) -> Result<GroupId> {
        let gid = self.allocate_group_id(link_type, &options.naming)?;
        let policy = options.policy.map(|factory| factory());
        let mut group = GroupAgent::new(gid.clone(), link_type.clone(), policy);

        self.books.graph.add_edge(a, b, Attributes::new());
        let attrs = self
            .books
            .graph
            .edge_attributes(a, b)
            .cloned()
            .unwrap_or_default();
        group.add(&[a.clone(), b.clone()], options.double, &mut self.books);
        group.link(a, b, attrs);

        let entity = group.entity_id();
        if self.config.nesting {
            self.books.graph.add_node(entity.clone());
        }
        self.books.schedule.insert(entity);
        if !options.double {
            self.books.schedule.remove(a);
            self.books.schedule.remove(b);
        }
        self.books.groups.insert(gid.clone(), group);

        tracing::debug!(group = %gid, link = %link_type, %a, %b, "Formed group");
        self.events.formed(&gid, link_type, vec![a.clone(), b.clone()]);
        Ok(gid)
    }

    /// `joiner` enters `target`, justified by its link to `partner`. Unless
    /// `double`, the joiner leaves the schedule. Returns false when joining
    /// would make a group contain itself.
    fn join(
        &mut self,
        joiner: &EntityId,
        partner: &EntityId,
        target: &GroupId,
        link_type: &LinkType,
        double: bool,
    ) -> Result<bool> {
        if let EntityId::Group(joining) = joiner {
            if self.books.ancestors_or_self(target).contains(joining) {
                tracing::debug!(group = %joining, %target, "Refusing cyclic join");
                return Ok(false);
            }
        }

        let Some(mut group) = self.books.groups.remove(target) else {
            return Err(GroupError::UnknownGroup {
                group: target.clone(),
                link_type: link_type.clone(),
            });
        };

        self.books.graph.add_edge(joiner, partner, Attributes::new());
        let attrs = self
            .books
            .graph
            .edge_attributes(joiner, partner)
            .cloned()
            .unwrap_or_default();
        group.add(std::slice::from_ref(joiner), double, &mut self.books);
        group.link(joiner, partner, attrs);
        if !double {
            self.books.schedule.remove(joiner);
        }

        self.books.groups.insert(target.clone(), group);

        tracing::debug!(group = %target, entity = %joiner, "Joined group");
        self.events.joined(target, link_type, joiner);
        Ok(true)
    }
}
