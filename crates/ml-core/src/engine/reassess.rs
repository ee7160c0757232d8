//! Reassessment passes.
//!
//! Existing groups are rechecked against a caller's judgement or against
//! the current state of the relationship graph. Members that no longer
//! qualify leave; a group pushed below the floor dissolves and the
//! dissolution cascades through its parents.

use std::collections::BTreeSet;

use ml_events::{EdgeFilter, EntityId, GroupId, LinkType};

use super::GroupEngine;
use crate::error::{GroupError, Result};
use crate::group::GroupAgent;

/// What a reassessment pass did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReassessReport {
    /// Groups examined
    pub examined: usize,
    /// Members that left a group
    pub detached: usize,
    /// Groups dissolved directly by this pass (cascades excluded)
    pub dissolved: Vec<GroupId>,
}

impl GroupEngine {
    /// Recheck every live group, or only those of `link_type`, with a
    /// caller-supplied check.
    ///
    /// The check returns `None` to keep a group as is, or a detachment list:
    /// the first entity is the departing member, the rest are the members it
    /// is no longer linked to. A list of fewer than two entities is rejected.
    pub fn reassess_group<F>(
        &mut self,
        link_type: Option<&LinkType>,
        reintroduce: bool,
        mut check: F,
    ) -> Result<ReassessReport>
    where
        F: FnMut(&GroupAgent) -> Option<Vec<EntityId>>,
    {
        let mut report = ReassessReport::default();
        let ids: Vec<GroupId> = self
            .books
            .groups
            .values()
            .filter(|g| link_type.map_or(true, |link| g.link_type() == link))
            .map(|g| g.id().clone())
            .collect();

        for gid in ids {
            let Some(group) = self.books.groups.get(&gid) else {
                continue;
            };
            report.examined += 1;
            let Some(detachment) = check(group) else {
                continue;
            };
            if detachment.len() < 2 {
                return Err(GroupError::MalformedDetachment {
                    group: gid,
                    len: detachment.len(),
                });
            }
            let (departing, others) = (&detachment[0], &detachment[1..]);
            if self.detach(&gid, departing, others, reintroduce, &mut report)? {
                report.dissolved.push(gid);
            }
        }

        Ok(report)
    }

    /// Recheck graph-driven groups: a member stays only while it holds a
    /// qualifying global edge to another current member.
    pub fn reassess_net_group(
        &mut self,
        filter: &EdgeFilter,
        reintroduce: bool,
    ) -> Result<ReassessReport> {
        let link_type = filter.link_type();
        let mut report = ReassessReport::default();
        let ids: Vec<GroupId> = self
            .books
            .groups
            .values()
            .filter(|g| g.link_type() == &link_type)
            .map(|g| g.id().clone())
            .collect();

        'groups: for gid in ids {
            if !self.books.groups.contains_key(&gid) {
                continue;
            }
            report.examined += 1;

            loop {
                let Some(group) = self.books.groups.get(&gid) else {
                    continue 'groups;
                };
                let unsupported = self.unsupported_members(group, filter);
                if unsupported.is_empty() {
                    continue 'groups;
                }

                for member in unsupported {
                    let still_member = self
                        .books
                        .groups
                        .get(&gid)
                        .map_or(false, |g| g.contains(&member));
                    if !still_member {
                        continue;
                    }
                    if self.detach(&gid, &member, &[], reintroduce, &mut report)? {
                        report.dissolved.push(gid);
                        continue 'groups;
                    }
                }
            }
        }

        Ok(report)
    }

    /// Members without a qualifying global edge to any fellow member
    fn unsupported_members(&self, group: &GroupAgent, filter: &EdgeFilter) -> Vec<EntityId> {
        let supported: BTreeSet<EntityId> = group
            .edge_buffer(&EdgeFilter::any())
            .into_iter()
            .filter(|(a, b)| self.books.graph.edge_qualifies(a, b, filter))
            .flat_map(|(a, b)| [a, b])
            .collect();
        group
            .members()
            .filter(|member| !supported.contains(*member))
            .cloned()
            .collect()
    }

    /// `departing` leaves `gid`. Its edges to `others` are dropped from the
    /// global graph and the group's subgraph first. Returns true when the
    /// group dissolved.
    fn detach(
        &mut self,
        gid: &GroupId,
        departing: &EntityId,
        others: &[EntityId],
        reintroduce: bool,
        report: &mut ReassessReport,
    ) -> Result<bool> {
        let Some(group) = self.books.groups.get_mut(gid) else {
            return Ok(false);
        };
        if !group.contains(departing) {
            tracing::debug!(group = %gid, member = %departing, "Detachment names a non-member");
            return Ok(false);
        }
        for other in others {
            group.unlink(departing, other);
            self.books.graph.remove_edge(departing, other);
        }

        let link_type = group.link_type().clone();
        self.books.reverse.discard(departing, &link_type, gid);
        if reintroduce {
            self.books.reinstate(departing);
        }
        report.detached += 1;
        tracing::debug!(group = %gid, member = %departing, "Member detached");

        self.detach_members(gid, std::slice::from_ref(departing), reintroduce)
    }
}
