//! Relationship Seeding
//!
//! Builds the demo relationship network: numeric kinship strengths between
//! villagers and text-tagged trade links between traders and villagers.

use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::Rng;

use ml_events::{attributes, AgentId, AttrValue, EdgeFilter, EntityId};

use crate::config::NetworkConfig;
use crate::engine::GroupEngine;
use crate::error::Result;

pub const KINSHIP: &str = "kinship";
pub const TRADE: &str = "trade";

/// Villagers a single trader deals with
const TRADE_PARTNERS: usize = 2;

/// Link random pairs of villagers with a kinship strength in `[0, 1)`
pub fn seed_kinship(
    engine: &mut GroupEngine,
    villagers: &[AgentId],
    config: &NetworkConfig,
    rng: &mut SmallRng,
) -> Result<usize> {
    let mut links = 0;
    for (i, a) in villagers.iter().enumerate() {
        for b in &villagers[i + 1..] {
            if rng.gen::<f64>() >= config.link_probability {
                continue;
            }
            let strength: f64 = rng.gen();
            links += engine.add_link(
                &[EntityId::Agent(a.clone()), EntityId::Agent(b.clone())],
                attributes([(KINSHIP, strength)]),
            )?;
        }
    }
    Ok(links)
}

/// Tie every trader to a few villagers, tagging each link with one good
pub fn seed_trade(
    engine: &mut GroupEngine,
    traders: &[AgentId],
    villagers: &[AgentId],
    config: &NetworkConfig,
    rng: &mut SmallRng,
) -> Result<usize> {
    if config.trade_goods.is_empty() {
        return Ok(0);
    }
    let mut links = 0;
    for trader in traders {
        let Some(good) = config.trade_goods.choose(rng) else {
            continue;
        };
        for partner in villagers.choose_multiple(rng, TRADE_PARTNERS) {
            links += engine.add_link(
                &[EntityId::Agent(trader.clone()), EntityId::Agent(partner.clone())],
                attributes([(TRADE, good.as_str())]),
            )?;
        }
    }
    Ok(links)
}

/// Nudge every kinship strength by up to `drift` in either direction
pub fn drift_kinship(engine: &mut GroupEngine, drift: f64, rng: &mut SmallRng) -> usize {
    let filter = EdgeFilter::has(KINSHIP);
    let pairs: Vec<(EntityId, EntityId)> = engine
        .graph()
        .edges(&filter)
        .map(|(a, b, _)| (a.clone(), b.clone()))
        .collect();

    let mut changed = 0;
    for (a, b) in pairs {
        let delta = rng.gen_range(-drift..=drift);
        let Some(attrs) = engine.link_attributes_mut(&a, &b) else {
            continue;
        };
        if let Some(strength) = attrs.get(KINSHIP).and_then(AttrValue::as_number) {
            attrs.insert(
                KINSHIP.to_string(),
                AttrValue::Number((strength + delta).clamp(0.0, 1.0)),
            );
            changed += 1;
        }
    }
    changed
}

/// Filter selecting strong kinship ties
pub fn kinship_filter(config: &NetworkConfig) -> EdgeFilter {
    EdgeFilter::at_least(KINSHIP, config.kinship_threshold)
}

/// One filter per trade good
pub fn trade_filters(config: &NetworkConfig) -> Vec<EdgeFilter> {
    config
        .trade_goods
        .iter()
        .map(|good| EdgeFilter::equals(TRADE, good.as_str()))
        .collect()
}
