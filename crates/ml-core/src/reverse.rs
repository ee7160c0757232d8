//! Reverse Group Index
//!
//! Maps every entity to the groups it belongs to, per link type. This is the
//! authoritative answer to "is this entity already grouped?".

use std::collections::{BTreeMap, BTreeSet};

use ml_events::{EntityId, GroupId, LinkType};

/// `entity -> link type -> groups`
///
/// Reads of missing entries behave as empty sets. Emptied sets and maps are
/// pruned, so an entity with no memberships has no entry at all.
#[derive(Debug, Clone, Default)]
pub struct ReverseIndex {
    entries: BTreeMap<EntityId, BTreeMap<LinkType, BTreeSet<GroupId>>>,
}

impl ReverseIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `entity` belongs to `group` under `link`
    pub fn add(&mut self, entity: &EntityId, link: &LinkType, group: &GroupId) -> bool {
        self.entries
            .entry(entity.clone())
            .or_default()
            .entry(link.clone())
            .or_default()
            .insert(group.clone())
    }

    /// Drop one membership. Discarding a non-member is a no-op.
    pub fn discard(&mut self, entity: &EntityId, link: &LinkType, group: &GroupId) -> bool {
        let Some(by_link) = self.entries.get_mut(entity) else {
            return false;
        };
        let Some(groups) = by_link.get_mut(link) else {
            return false;
        };
        let removed = groups.remove(group);
        if groups.is_empty() {
            by_link.remove(link);
        }
        if by_link.is_empty() {
            self.entries.remove(entity);
        }
        removed
    }

    /// Remove an entity's whole entry, returning the memberships it held
    pub fn remove_entity(&mut self, entity: &EntityId) -> Vec<(LinkType, GroupId)> {
        self.entries
            .remove(entity)
            .map(flatten)
            .unwrap_or_default()
    }

    /// Groups of `entity` under `link`, in id order
    pub fn groups_of(&self, entity: &EntityId, link: &LinkType) -> Vec<GroupId> {
        self.entries
            .get(entity)
            .and_then(|by_link| by_link.get(link))
            .map(|groups| groups.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// First group of `entity` under `link`, if any
    pub fn first_group(&self, entity: &EntityId, link: &LinkType) -> Option<&GroupId> {
        self.entries
            .get(entity)
            .and_then(|by_link| by_link.get(link))
            .and_then(|groups| groups.iter().next())
    }

    pub fn is_grouped(&self, entity: &EntityId, link: &LinkType) -> bool {
        self.first_group(entity, link).is_some()
    }

    pub fn is_grouped_anywhere(&self, entity: &EntityId) -> bool {
        self.entries.contains_key(entity)
    }

    pub fn contains(&self, entity: &EntityId, link: &LinkType, group: &GroupId) -> bool {
        self.entries
            .get(entity)
            .and_then(|by_link| by_link.get(link))
            .map_or(false, |groups| groups.contains(group))
    }

    /// Groups shared by `a` and `b` under `link`
    pub fn shared_groups(&self, a: &EntityId, b: &EntityId, link: &LinkType) -> Vec<GroupId> {
        let (Some(left), Some(right)) = (
            self.entries.get(a).and_then(|m| m.get(link)),
            self.entries.get(b).and_then(|m| m.get(link)),
        ) else {
            return Vec::new();
        };
        left.intersection(right).cloned().collect()
    }

    /// Snapshot of every membership an entity holds
    pub fn memberships(&self, entity: &EntityId) -> Vec<(LinkType, GroupId)> {
        self.entries
            .get(entity)
            .cloned()
            .map(flatten)
            .unwrap_or_default()
    }

    /// Every indexed entity
    pub fn entities(&self) -> impl Iterator<Item = &EntityId> {
        self.entries.keys()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn flatten(by_link: BTreeMap<LinkType, BTreeSet<GroupId>>) -> Vec<(LinkType, GroupId)> {
    by_link
        .into_iter()
        .flat_map(|(link, groups)| groups.into_iter().map(move |g| (link.clone(), g)))
        .collect()
}
