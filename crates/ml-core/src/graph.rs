//! Relationship Graph
//!
//! Undirected graph over agents (and, when nesting is enabled, groups) with
//! attributed edges. The engine keeps one global graph; every group keeps a
//! private one over its members.

use std::collections::{BTreeMap, BTreeSet};

use ml_events::{Attributes, EdgeFilter, EntityId};

/// Normalized key of an undirected edge
fn edge_key(a: &EntityId, b: &EntityId) -> (EntityId, EntityId) {
    if a <= b {
        (a.clone(), b.clone())
    } else {
        (b.clone(), a.clone())
    }
}

/// Expand a list of entities into the edges it stands for: two entities are
/// one edge, more are every pairwise combination.
pub fn pairwise(entities: &[EntityId]) -> Vec<(EntityId, EntityId)> {
    let mut pairs = Vec::new();
    for (i, a) in entities.iter().enumerate() {
        for b in &entities[i + 1..] {
            pairs.push((a.clone(), b.clone()));
        }
    }
    pairs
}

/// Graph of all relationships between entities
#[derive(Debug, Clone, Default)]
pub struct RelationshipGraph {
    adjacency: BTreeMap<EntityId, BTreeSet<EntityId>>,
    edges: BTreeMap<(EntityId, EntityId), Attributes>,
}

impl RelationshipGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node. Returns false if it was already present.
    pub fn add_node(&mut self, id: EntityId) -> bool {
        if self.adjacency.contains_key(&id) {
            return false;
        }
        self.adjacency.insert(id, BTreeSet::new());
        true
    }

    pub fn contains_node(&self, id: &EntityId) -> bool {
        self.adjacency.contains_key(id)
    }

    pub fn node_count(&self) -> usize {
        self.adjacency.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &EntityId> {
        self.adjacency.keys()
    }

    /// Remove a node and every incident edge. Absent nodes are a no-op.
    pub fn remove_node(&mut self, id: &EntityId) -> bool {
        let Some(neighbors) = self.adjacency.remove(id) else {
            return false;
        };
        for other in neighbors {
            if let Some(set) = self.adjacency.get_mut(&other) {
                set.remove(id);
            }
            self.edges.remove(&edge_key(id, &other));
        }
        true
    }

    /// Add an edge, creating missing endpoints. Attributes are merged into
    /// an existing edge. Self-loops are refused.
    pub fn add_edge(&mut self, a: &EntityId, b: &EntityId, attrs: Attributes) -> bool {
        if a == b {
            return false;
        }
        self.adjacency.entry(a.clone()).or_default().insert(b.clone());
        self.adjacency.entry(b.clone()).or_default().insert(a.clone());
        self.edges.entry(edge_key(a, b)).or_default().extend(attrs);
        true
    }

    /// Connect a list of entities: a pair becomes one edge, a longer list
    /// becomes every pairwise combination.
    pub fn add_edges(&mut self, entities: &[EntityId], attrs: &Attributes) -> usize {
        pairwise(entities)
            .iter()
            .filter(|(a, b)| self.add_edge(a, b, attrs.clone()))
            .count()
    }

    /// Remove an edge. Absent edges are a no-op.
    pub fn remove_edge(&mut self, a: &EntityId, b: &EntityId) -> bool {
        if self.edges.remove(&edge_key(a, b)).is_none() {
            return false;
        }
        if let Some(set) = self.adjacency.get_mut(a) {
            set.remove(b);
        }
        if let Some(set) = self.adjacency.get_mut(b) {
            set.remove(a);
        }
        true
    }

    /// Remove every pairwise edge among `entities`
    pub fn remove_edges(&mut self, entities: &[EntityId]) -> usize {
        pairwise(entities)
            .iter()
            .filter(|(a, b)| self.remove_edge(a, b))
            .count()
    }

    pub fn has_edge(&self, a: &EntityId, b: &EntityId) -> bool {
        self.edges.contains_key(&edge_key(a, b))
    }

    pub fn edge_attributes(&self, a: &EntityId, b: &EntityId) -> Option<&Attributes> {
        self.edges.get(&edge_key(a, b))
    }

    /// Mutable access to an edge's attributes
    pub fn edge_attributes_mut(&mut self, a: &EntityId, b: &EntityId) -> Option<&mut Attributes> {
        self.edges.get_mut(&edge_key(a, b))
    }

    /// Does an edge between `a` and `b` exist and satisfy `filter`?
    pub fn edge_qualifies(&self, a: &EntityId, b: &EntityId, filter: &EdgeFilter) -> bool {
        self.edge_attributes(a, b)
            .map_or(false, |attrs| filter.matches(attrs))
    }

    pub fn neighbors(&self, id: &EntityId) -> impl Iterator<Item = &EntityId> {
        self.adjacency.get(id).into_iter().flatten()
    }

    pub fn degree(&self, id: &EntityId) -> usize {
        self.adjacency.get(id).map_or(0, |set| set.len())
    }

    /// Every edge once, as `(a, b)` with `a < b`, filtered by `filter`
    pub fn edges<'a>(
        &'a self,
        filter: &'a EdgeFilter,
    ) -> impl Iterator<Item = (&'a EntityId, &'a EntityId, &'a Attributes)> + 'a {
        self.edges
            .iter()
            .filter(move |(_, attrs)| filter.matches(attrs))
            .map(|((a, b), attrs)| (a, b, attrs))
    }
}
