//! Multilevel Grouping Demo
//!
//! Villagers, traders and elders step on a shared schedule while kinship
//! and trade ties pull them into groups and drifting ties pull them apart.

use std::path::PathBuf;

use clap::Parser;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tracing_subscriber::EnvFilter;
use uuid::Builder;

use ml_core::config::{SimConfig, DEFAULT_CONFIG_PATH};
use ml_core::setup::{self, ELDER};
use ml_core::{
    default_policy, AgentKind, EventLogger, GroupEngine, GroupingOptions, Scheduler, TickOptions,
};

/// Command line arguments for the demo
#[derive(Parser, Debug)]
#[command(name = "mlsim")]
#[command(about = "Multilevel grouping demo simulation")]
struct Args {
    /// Random seed for reproducibility (overrides the config file)
    #[arg(long)]
    seed: Option<u64>,

    /// Number of ticks to simulate (overrides the config file)
    #[arg(long)]
    ticks: Option<u64>,

    /// Path to a TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write lifecycle events as JSONL to this path
    #[arg(long)]
    events: Option<PathBuf>,

    /// Interval between population snapshots (in ticks)
    #[arg(long)]
    snapshot_interval: Option<u64>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => match SimConfig::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Could not load {}: {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => SimConfig::load_or_default(),
    };
    if let Some(seed) = args.seed {
        config.simulation.seed = seed;
    }
    if let Some(ticks) = args.ticks {
        config.simulation.ticks = ticks;
    }
    if let Some(interval) = args.snapshot_interval {
        config.simulation.snapshot_interval = interval;
    }

    println!("Multilevel Grouping Demo");
    println!("========================");
    println!("Seed: {}", config.simulation.seed);
    println!("Ticks: {}", config.simulation.ticks);
    println!("Min group size: {}", config.engine.min_for_group);
    println!("Nesting: {}", config.engine.nesting);
    if args.config.is_none() {
        println!("(tuning from {} or defaults)", DEFAULT_CONFIG_PATH);
    }
    println!();

    let mut rng = SmallRng::seed_from_u64(config.simulation.seed);
    let run_id = Builder::from_random_bytes(rng.gen()).into_uuid();

    let mut engine = match GroupEngine::new(config.engine.clone()) {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("Invalid engine configuration: {}", e);
            std::process::exit(1);
        }
    };

    let mut logger = match &args.events {
        Some(path) => match EventLogger::new(path) {
            Ok(logger) => logger,
            Err(e) => {
                eprintln!("Warning: Could not open event log {}: {}", path.display(), e);
                EventLogger::null()
            }
        },
        None => EventLogger::null(),
    };

    // Population and relationships
    println!("Spawning agents...");
    let population = setup::spawn_population(&mut engine, &config.population, &mut rng);
    let summary = setup::spawn_summary(&engine);
    println!("  Spawned {} agents", summary.total_agents);
    for (kind, count) in &summary.by_kind {
        println!("    {}: {}", kind, count);
    }

    let villagers = population.villager_ids();
    let seeded = setup::seed_kinship(&mut engine, &villagers, &config.network, &mut rng)
        .and_then(|kin| {
            let trade = setup::seed_trade(
                &mut engine,
                &population.trader_ids(),
                &villagers,
                &config.network,
                &mut rng,
            )?;
            Ok((kin, trade))
        });
    let (kin_links, trade_links) = match seeded {
        Ok(links) => links,
        Err(e) => {
            eprintln!("Relationship seeding failed: {}", e);
            std::process::exit(1);
        }
    };
    println!("  Seeded {} kinship and {} trade links", kin_links, trade_links);

    let kinship = setup::kinship_filter(&config.network);
    let kin_options = GroupingOptions::default();
    let trade_options =
        GroupingOptions::default().with_policy(default_policy::<setup::RotatingShifts>);

    for filter in setup::trade_filters(&config.network) {
        if let Err(e) = engine.net_group(&filter, &trade_options) {
            eprintln!("Trade grouping failed: {}", e);
            std::process::exit(1);
        }
    }

    let tick_options = TickOptions {
        shuffled: config.simulation.shuffled,
        by_type: None,
        constant: Some(AgentKind::from(ELDER)),
    };
    let mut scheduler = Scheduler::new();

    println!();
    println!("Starting simulation...");
    println!();

    for tick in 0..config.simulation.ticks {
        if tick % config.simulation.regroup_interval == 0 {
            if let Err(e) = engine.net_group(&kinship, &kin_options) {
                eprintln!("Kinship grouping failed at tick {}: {}", tick, e);
                std::process::exit(1);
            }
        }

        if tick > 0 && tick % config.simulation.reassess_interval == 0 {
            setup::drift_kinship(&mut engine, config.network.drift, &mut rng);
            match engine.reassess_net_group(&kinship, true) {
                Ok(report) => tracing::info!(
                    tick,
                    detached = report.detached,
                    dissolved = report.dissolved.len(),
                    "Reassessed kinship groups"
                ),
                Err(e) => {
                    eprintln!("Reassessment failed at tick {}: {}", tick, e);
                    std::process::exit(1);
                }
            }
        }

        let report = scheduler.step(&engine, &tick_options, &mut rng);

        let events = engine.drain_events();
        if let Err(e) = logger.log_batch(&events) {
            eprintln!("Warning: Could not log events at tick {}: {}", tick, e);
        }
        if tick % 10 == 0 && !events.is_empty() {
            println!(
                "[Tick {:>4}] {} events, {} agents and {} groups stepped",
                tick,
                events.len(),
                report.agents,
                report.groups
            );
        }

        let interval = config.simulation.snapshot_interval;
        if interval > 0 && tick > 0 && tick % interval == 0 {
            let mut snapshot = engine.snapshot(tick);
            snapshot.run_id = Some(run_id);
            match snapshot.to_json_pretty() {
                Ok(json) => println!("{}", json),
                Err(e) => eprintln!("Warning: Could not serialize snapshot: {}", e),
            }
        }
    }

    if let Err(e) = engine.check_consistency() {
        eprintln!("Consistency check failed: {}", e);
        std::process::exit(1);
    }
    if let Err(e) = logger.flush() {
        eprintln!("Warning: Could not flush event log: {}", e);
    }

    println!();
    println!(
        "Simulation complete. Ran {} ticks, {} groups alive, {} entities scheduled.",
        scheduler.tick(),
        engine.group_count(),
        engine.active_agent_count()
    );
    println!(
        "Logged {} events, {} agent steps in total.",
        logger.event_count(),
        population.total_steps()
    );
}
