//! Group Policies
//!
//! A policy replaces a group's default per-member stepping for a whole tick.
//! Each group owns its own instance, built from a factory when the group
//! forms.

use rand::seq::SliceRandom;
use rand::RngCore;

use ml_events::{AgentId, EntityId};

use crate::agent::RegisteredAgent;
use crate::books::Books;
use crate::group::GroupAgent;
use crate::scheduler::{step_entity, StepCount, TickOptions};

/// Custom per-tick behaviour for a group
pub trait GroupPolicy {
    fn step(&mut self, ctx: &mut PolicyContext<'_>);
}

/// Builds a fresh policy for every new group
pub type PolicyFactory = fn() -> Box<dyn GroupPolicy>;

/// Factory for any default-constructible policy
pub fn default_policy<P: GroupPolicy + Default + 'static>() -> Box<dyn GroupPolicy> {
    Box::new(P::default())
}

/// What a policy sees during its tick
pub struct PolicyContext<'a> {
    pub(crate) group: &'a GroupAgent,
    pub(crate) books: &'a Books,
    pub(crate) options: &'a TickOptions,
    pub(crate) rng: &'a mut dyn RngCore,
    pub(crate) counts: &'a mut StepCount,
}

impl<'a> PolicyContext<'a> {
    pub fn group(&self) -> &GroupAgent {
        self.group
    }

    /// Current members, optionally shuffled with the tick's random source
    pub fn members(&mut self, shuffled: bool) -> Vec<EntityId> {
        let mut members: Vec<EntityId> = self.group.members().cloned().collect();
        if shuffled {
            members.shuffle(&mut *self.rng);
        }
        members
    }

    pub fn agent(&self, id: &AgentId) -> Option<&RegisteredAgent> {
        self.books.agent(id)
    }

    /// Step one member the way the scheduler would
    pub fn step_member(&mut self, member: &EntityId) -> bool {
        if !self.group.contains(member) {
            return false;
        }
        step_entity(self.books, member, self.options, &mut *self.rng, self.counts)
    }

    pub fn rng(&mut self) -> &mut dyn RngCore {
        &mut *self.rng
    }
}
