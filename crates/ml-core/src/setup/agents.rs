//! Agent Spawning
//!
//! Demo agents for the `mlsim` binary: villagers tied by kinship, traders
//! tied to villagers by goods, and elders stepped once per tick whatever
//! their grouping.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use rand::rngs::SmallRng;
use rand::Rng;

use ml_events::{AgentId, AgentKind};

use crate::agent::Agent;
use crate::config::PopulationConfig;
use crate::engine::GroupEngine;
use crate::policy::{GroupPolicy, PolicyContext};

pub const VILLAGER: &str = "villager";
pub const TRADER: &str = "trader";
pub const ELDER: &str = "elder";

const NAMES: &[&str] = &[
    "Alder", "Ash", "Birch", "Bryn", "Cedar", "Elm", "Fern", "Hazel", "Holly", "Ivy", "Laurel",
    "Linden", "Maple", "Oak", "Reed", "Rowan", "Sage", "Thorn", "Willow", "Wren",
];

/// A demo agent. Stamina drains while it works and recovers while it rests.
#[derive(Debug, Clone)]
pub struct DemoAgent {
    pub id: AgentId,
    pub kind: AgentKind,
    pub name: String,
    pub stamina: f32,
    pub steps: u64,
}

impl DemoAgent {
    pub fn new(id: AgentId, kind: &str, name: impl Into<String>, stamina: f32) -> Self {
        Self {
            id,
            kind: AgentKind::from(kind),
            name: name.into(),
            stamina,
            steps: 0,
        }
    }
}

impl Agent for DemoAgent {
    fn id(&self) -> AgentId {
        self.id.clone()
    }

    fn kind(&self) -> AgentKind {
        self.kind.clone()
    }

    fn step(&mut self) {
        self.steps += 1;
        if self.stamina > 0.2 {
            self.stamina -= 0.1;
        } else {
            self.stamina = (self.stamina + 0.3).min(1.0);
        }
    }
}

/// Handles to every spawned agent, by kind
#[derive(Debug, Default)]
pub struct Population {
    pub villagers: Vec<Rc<RefCell<DemoAgent>>>,
    pub traders: Vec<Rc<RefCell<DemoAgent>>>,
    pub elders: Vec<Rc<RefCell<DemoAgent>>>,
}

impl Population {
    pub fn villager_ids(&self) -> Vec<AgentId> {
        self.villagers.iter().map(|a| a.borrow().id.clone()).collect()
    }

    pub fn trader_ids(&self) -> Vec<AgentId> {
        self.traders.iter().map(|a| a.borrow().id.clone()).collect()
    }

    /// Total steps taken by every spawned agent
    pub fn total_steps(&self) -> u64 {
        self.villagers
            .iter()
            .chain(&self.traders)
            .chain(&self.elders)
            .map(|a| a.borrow().steps)
            .sum()
    }
}

/// Spawn summary for reporting
#[derive(Debug, Default)]
pub struct SpawnSummary {
    pub total_agents: usize,
    pub by_kind: BTreeMap<String, usize>,
}

fn spawn_kind(
    engine: &mut GroupEngine,
    kind: &str,
    count: usize,
    rng: &mut SmallRng,
) -> Vec<Rc<RefCell<DemoAgent>>> {
    (0..count)
        .map(|i| {
            let id = AgentId::from(format!("{}_{:04}", kind, i + 1));
            let name = NAMES[rng.gen_range(0..NAMES.len())];
            let stamina = rng.gen_range(0.3..1.0);
            engine.register(DemoAgent::new(id, kind, name, stamina))
        })
        .collect()
}

/// Register the whole demo population with the engine
pub fn spawn_population(
    engine: &mut GroupEngine,
    config: &PopulationConfig,
    rng: &mut SmallRng,
) -> Population {
    let population = Population {
        villagers: spawn_kind(engine, VILLAGER, config.villagers, rng),
        traders: spawn_kind(engine, TRADER, config.traders, rng),
        elders: spawn_kind(engine, ELDER, config.elders, rng),
    };
    tracing::info!(
        villagers = population.villagers.len(),
        traders = population.traders.len(),
        elders = population.elders.len(),
        "Spawned population"
    );
    population
}

pub fn spawn_summary(engine: &GroupEngine) -> SpawnSummary {
    let by_kind: BTreeMap<String, usize> = engine
        .agent_count()
        .into_iter()
        .map(|(kind, count)| (kind.0, count))
        .collect();
    SpawnSummary {
        total_agents: by_kind.values().sum(),
        by_kind,
    }
}

/// Trading posts alternate which half of their members works each tick
#[derive(Debug, Default)]
pub struct RotatingShifts {
    turn: usize,
}

impl GroupPolicy for RotatingShifts {
    fn step(&mut self, ctx: &mut PolicyContext<'_>) {
        let members = ctx.members(false);
        for (i, member) in members.iter().enumerate() {
            if i % 2 == self.turn % 2 {
                ctx.step_member(member);
            }
        }
        self.turn += 1;
    }
}
