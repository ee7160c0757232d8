//! Deregistration and dissolution.
//!
//! A group that falls below the floor is torn down through an explicit
//! worklist. With nesting enabled the worklist also walks every parent the
//! dissolved group belonged to, so a cascade of any depth completes in one
//! call. A flat engine skips the parent walk.

use ml_events::{AgentId, EntityId, GroupId};

use super::GroupEngine;
use crate::error::{GroupError, Result};
use crate::group::{GroupAgent, RemoveOutcome};

impl GroupEngine {
    /// Remove a leaf agent from the engine, cascading any dissolution its
    /// departure causes. Unknown ids are a no-op returning `Ok(false)`.
    pub fn remove(&mut self, id: &AgentId) -> Result<bool> {
        if !self.books.agents.contains_key(id) {
            tracing::debug!(agent = %id, "Ignoring removal of unknown agent");
            return Ok(false);
        }
        let entity = EntityId::Agent(id.clone());
        for (link, gid) in self.books.reverse.memberships(&entity) {
            if !self.books.groups.contains_key(&gid) {
                return Err(GroupError::UnknownGroup {
                    group: gid,
                    link_type: link,
                });
            }
        }

        let Some(registered) = self.books.agents.remove(id) else {
            return Ok(false);
        };
        if let Some(ids) = self.books.by_kind.get_mut(&registered.kind) {
            ids.remove(id);
            if ids.is_empty() {
                self.books.by_kind.remove(&registered.kind);
            }
        }

        self.books.graph.remove_node(&entity);

        for (link, gid) in self.books.reverse.memberships(&entity) {
            if !self.books.reverse.contains(&entity, &link, &gid) {
                continue;
            }
            self.detach_members(&gid, std::slice::from_ref(&entity), true)?;
        }

        self.books.reverse.remove_entity(&entity);
        self.books.schedule.remove(&entity);
        tracing::debug!(agent = %id, "Deregistered agent");
        self.events.deregistered(id);
        Ok(true)
    }

    /// Remove `members` from a live group. Returns true when the group
    /// dissolved as a result.
    pub(crate) fn detach_members(
        &mut self,
        gid: &GroupId,
        members: &[EntityId],
        reintroduce: bool,
    ) -> Result<bool> {
        let Some(mut group) = self.books.groups.remove(gid) else {
            return Err(GroupError::inconsistency(format!(
                "detaching from group {} which is not registered",
                gid
            )));
        };

        let outcome = group.remove(
            members,
            self.config.min_for_group,
            reintroduce,
            &mut self.books,
        );
        self.events
            .detached(gid, group.link_type(), members.to_vec());

        match outcome {
            RemoveOutcome::Retained => {
                self.books.groups.insert(gid.clone(), group);
                Ok(false)
            }
            RemoveOutcome::Dissolved { remaining, .. } => {
                self.dissolve(group, remaining, reintroduce)?;
                Ok(true)
            }
        }
    }

    /// Tear down a group already taken out of the arena, then every parent
    /// its departure drops below the floor
    fn dissolve(
        &mut self,
        group: GroupAgent,
        remaining: Vec<EntityId>,
        reintroduce: bool,
    ) -> Result<()> {
        let mut worklist = vec![(group, remaining)];

        while let Some((dead, remaining)) = worklist.pop() {
            let entity = dead.entity_id();
            self.books.schedule.remove(&entity);
            tracing::debug!(
                group = %dead.id(),
                link = %dead.link_type(),
                released = remaining.len(),
                "Dissolved group"
            );
            self.events.dissolved(dead.id(), dead.link_type(), remaining);

            if !self.config.nesting {
                continue;
            }

            self.books.graph.remove_node(&entity);
            for (link, parent_id) in self.books.reverse.remove_entity(&entity) {
                let Some(mut parent) = self.books.groups.remove(&parent_id) else {
                    return Err(GroupError::UnknownGroup {
                        group: parent_id,
                        link_type: link,
                    });
                };
                let outcome = parent.remove(
                    std::slice::from_ref(&entity),
                    self.config.min_for_group,
                    reintroduce,
                    &mut self.books,
                );
                self.events
                    .detached(&parent_id, &link, vec![entity.clone()]);
                match outcome {
                    RemoveOutcome::Retained => {
                        self.books.groups.insert(parent_id, parent);
                    }
                    RemoveOutcome::Dissolved { remaining, .. } => {
                        worklist.push((parent, remaining));
                    }
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{agent_ref, Agent};
    use crate::config::EngineConfig;
    use crate::engine::GroupingOptions;
    use ml_events::{AgentKind, GroupEventKind, LinkType};

    struct Leaf(AgentId);

    impl Agent for Leaf {
        fn id(&self) -> AgentId {
            self.0.clone()
        }

        fn kind(&self) -> AgentKind {
            AgentKind::from("leaf")
        }

        fn step(&mut self) {}
    }

    fn engine_with(names: &[&str], config: EngineConfig) -> GroupEngine {
        let mut engine = GroupEngine::new(config).unwrap();
        for name in names {
            engine.add(agent_ref(Leaf(AgentId::from(*name))), true, true);
        }
        engine
    }

    fn e(name: &str) -> EntityId {
        EntityId::agent(name)
    }

    #[test]
    fn test_remove_unknown_agent_is_noop() {
        let mut engine = GroupEngine::with_defaults();
        assert!(!engine.remove(&AgentId::from("nobody")).unwrap());
        assert_eq!(engine.pending_events(), 0);
    }

    #[test]
    fn test_remove_with_dangling_membership_changes_nothing() {
        let mut engine = engine_with(&["a"], EngineConfig::default());
        engine
            .books
            .reverse
            .add(&e("a"), &LinkType::default(), &GroupId::from("lost"));

        let err = engine.remove(&AgentId::from("a")).unwrap_err();
        assert!(matches!(err, GroupError::UnknownGroup { .. }));
        assert!(!err.is_contract_violation());
        assert!(engine.contains_agent(&AgentId::from("a")));
        assert!(engine.graph().contains_node(&e("a")));
        assert!(engine.is_scheduled(&e("a")));
        assert_eq!(engine.agent_count()[&AgentKind::from("leaf")], 1);
        assert_eq!(engine.pending_events(), 0);
    }

    #[test]
    fn test_remove_ungrouped_agent() {
        let mut engine = engine_with(&["a"], EngineConfig::default());
        assert!(engine.remove(&AgentId::from("a")).unwrap());
        assert!(!engine.is_scheduled(&e("a")));
        assert!(!engine.graph().contains_node(&e("a")));
        assert!(engine.agent_count().is_empty());
        assert!(engine.check_consistency().is_ok());
    }

    #[test]
    fn test_flat_removal_dissolves_pair() {
        let mut engine = engine_with(&["a", "b"], EngineConfig::default());
        engine
            .group_iterate(&[(e("a"), e("b"))], &LinkType::default(), &GroupingOptions::default())
            .unwrap();
        engine.drain_events();

        engine.remove(&AgentId::from("a")).unwrap();
        assert_eq!(engine.group_count(), 0);
        assert!(engine.is_scheduled(&e("b")));
        assert!(!engine.is_scheduled(&EntityId::group("group_0")));
        assert!(engine.check_consistency().is_ok());

        let kinds: Vec<GroupEventKind> = engine.drain_events().iter().map(|ev| ev.kind).collect();
        assert_eq!(
            kinds,
            vec![
                GroupEventKind::Detached,
                GroupEventKind::Dissolved,
                GroupEventKind::Deregistered
            ]
        );
    }

    #[test]
    fn test_removal_across_link_types() {
        let mut engine = engine_with(&["a", "b", "c"], EngineConfig::default());
        let options = GroupingOptions::default();
        engine
            .group_iterate(&[(e("a"), e("b"))], &LinkType::from("kinship"), &options)
            .unwrap();
        engine
            .group_iterate(&[(e("a"), e("c"))], &LinkType::from("trade"), &options)
            .unwrap();
        assert_eq!(engine.group_count(), 2);

        engine.remove(&AgentId::from("a")).unwrap();
        assert_eq!(engine.group_count(), 0);
        assert!(engine.is_scheduled(&e("b")));
        assert!(engine.is_scheduled(&e("c")));
        assert!(engine.check_consistency().is_ok());
    }
}
