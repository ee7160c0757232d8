//! Multilevel Grouping Engine Library
//!
//! Keeps a population of agents, the relationship graph between them, the
//! groups they form under independent link types and the schedule of what
//! steps each tick consistent under continuous mutation. Groups are
//! schedulable entities of their own and may nest when enabled.

pub mod agent;
pub mod books;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod graph;
pub mod group;
pub mod policy;
pub mod reverse;
pub mod scheduler;
pub mod setup;

pub use agent::{agent_ref, Agent, AgentRef, RegisteredAgent};
pub use books::Books;
pub use config::{ConfigError, EngineConfig, SimConfig};
pub use engine::{
    Cluster, GroupEngine, GroupNaming, GroupingOptions, GroupingReport, ReassessReport,
};
pub use error::{GroupError, Result};
pub use events::{EventLogger, PendingEvents};
pub use graph::{pairwise, RelationshipGraph};
pub use group::{GroupAgent, RemoveOutcome};
pub use policy::{default_policy, GroupPolicy, PolicyContext, PolicyFactory};
pub use reverse::ReverseIndex;
pub use scheduler::{Scheduler, StepCount, TickOptions, TickReport};

pub use ml_events::{
    attributes, AgentId, AgentKind, AttrValue, Attributes, EdgeFilter, EntityId, GroupEvent,
    GroupEventKind, GroupId, LinkType, PopulationSnapshot,
};
