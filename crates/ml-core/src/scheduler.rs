//! Scheduling Facade
//!
//! Drives one tick over the engine's schedule. The schedule is snapshotted
//! at tick start, optionally shuffled with the caller's random source, and
//! every entry is re-checked for liveness before it is stepped.

use rand::seq::SliceRandom;
use rand::RngCore;
use serde::{Deserialize, Serialize};

use ml_events::{AgentKind, EntityId};

use crate::books::Books;
use crate::engine::GroupEngine;

/// Per-tick stepping options
#[derive(Debug, Clone, PartialEq)]
pub struct TickOptions {
    /// Randomize activation order
    pub shuffled: bool,
    /// Inside groups, step members kind by kind in this order
    pub by_type: Option<Vec<AgentKind>>,
    /// Kind stepped exactly once per tick in a separate pass, whatever its
    /// grouping
    pub constant: Option<AgentKind>,
}

impl Default for TickOptions {
    fn default() -> Self {
        Self {
            shuffled: true,
            by_type: None,
            constant: None,
        }
    }
}

/// Running totals of what got stepped
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepCount {
    pub agents: usize,
    pub groups: usize,
}

/// Outcome of one tick
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickReport {
    pub tick: u64,
    /// Leaf agents stepped during the main pass, including inside groups
    pub agents: usize,
    pub groups: usize,
    /// Agents stepped by the constant pass
    pub constant: usize,
}

/// Step a single entity: a leaf directly, a group through its composite
/// step. Stale ids and members of the constant kind are skipped.
pub fn step_entity(
    books: &Books,
    entity: &EntityId,
    options: &TickOptions,
    rng: &mut dyn RngCore,
    counts: &mut StepCount,
) -> bool {
    match entity {
        EntityId::Agent(id) => {
            let Some(agent) = books.agent(id) else {
                return false;
            };
            if options.constant.as_ref() == Some(&agent.kind) {
                return false;
            }
            if !agent.step() {
                tracing::warn!(agent = %id, "Agent busy; step skipped");
                return false;
            }
            counts.agents += 1;
            true
        }
        EntityId::Group(id) => match books.group(id) {
            Some(group) => group.group_step(books, options, rng, counts),
            None => false,
        },
    }
}

/// Tick driver. Holds nothing but the tick counter; the host owns time and
/// randomness.
#[derive(Debug, Clone, Default)]
pub struct Scheduler {
    tick: u64,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ticks completed so far
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Run one tick
    pub fn step(
        &mut self,
        engine: &GroupEngine,
        options: &TickOptions,
        rng: &mut dyn RngCore,
    ) -> TickReport {
        let books = engine.books();
        let mut order: Vec<EntityId> = books.schedule().iter().cloned().collect();
        if options.shuffled {
            order.shuffle(&mut *rng);
        }

        let mut counts = StepCount::default();
        for entity in &order {
            if !books.is_live(entity) {
                continue;
            }
            step_entity(books, entity, options, &mut *rng, &mut counts);
        }

        let mut constant = 0;
        if let Some(kind) = &options.constant {
            for id in books.agents_of_kind(kind) {
                if books.agent(&id).map_or(false, |agent| agent.step()) {
                    constant += 1;
                }
            }
        }

        let report = TickReport {
            tick: self.tick,
            agents: counts.agents,
            groups: counts.groups,
            constant,
        };
        tracing::trace!(
            tick = report.tick,
            agents = report.agents,
            groups = report.groups,
            constant = report.constant,
            "Tick complete"
        );
        self.tick += 1;
        report
    }

    /// Run several ticks back to back
    pub fn run(
        &mut self,
        engine: &GroupEngine,
        ticks: u64,
        options: &TickOptions,
        rng: &mut dyn RngCore,
    ) -> Vec<TickReport> {
        (0..ticks).map(|_| self.step(engine, options, &mut *rng)).collect()
    }
}
