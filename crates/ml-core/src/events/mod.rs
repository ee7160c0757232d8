//! Lifecycle event buffering and logging.

pub mod logger;

pub use logger::EventLogger;

use ml_events::{AgentId, EntityId, GroupEvent, GroupId, LinkType};

/// Events recorded by the engine, waiting for the host to drain them
#[derive(Debug, Default)]
pub struct PendingEvents {
    events: Vec<GroupEvent>,
    next_sequence: u64,
}

impl PendingEvents {
    pub fn new() -> Self {
        Self::default()
    }

    fn sequence(&mut self) -> u64 {
        let seq = self.next_sequence;
        self.next_sequence += 1;
        seq
    }

    pub fn push(&mut self, event: GroupEvent) {
        self.events.push(event);
    }

    pub fn formed(&mut self, group: &GroupId, link: &LinkType, members: Vec<EntityId>) {
        let seq = self.sequence();
        self.push(GroupEvent::formed(seq, group.clone(), link.clone(), members));
    }

    pub fn joined(&mut self, group: &GroupId, link: &LinkType, entity: &EntityId) {
        let seq = self.sequence();
        self.push(GroupEvent::joined(seq, group.clone(), link.clone(), entity.clone()));
    }

    pub fn detached(&mut self, group: &GroupId, link: &LinkType, entities: Vec<EntityId>) {
        let seq = self.sequence();
        self.push(GroupEvent::detached(seq, group.clone(), link.clone(), entities));
    }

    pub fn dissolved(&mut self, group: &GroupId, link: &LinkType, remaining: Vec<EntityId>) {
        let seq = self.sequence();
        self.push(GroupEvent::dissolved(seq, group.clone(), link.clone(), remaining));
    }

    pub fn deregistered(&mut self, agent: &AgentId) {
        let seq = self.sequence();
        self.push(GroupEvent::deregistered(seq, agent.clone()));
    }

    pub fn drain(&mut self) -> Vec<GroupEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }
}
