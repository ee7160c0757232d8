//! Shared identifier, attribute, event and snapshot types for the multilevel
//! grouping engine.
//!
//! This crate contains pure data structures with no grouping logic.
//! It is a dependency for all other crates in the workspace.

pub mod attr;
pub mod event;
pub mod ids;
pub mod snapshot;

// Re-export identifier types
pub use ids::{AgentId, AgentKind, EntityId, GroupId, LinkType, DEFAULT_LINK_TYPE, GROUP_KIND};

// Re-export attribute types
pub use attr::{attributes, AttrValue, Attributes, EdgeFilter};

// Re-export event types
pub use event::{GroupEvent, GroupEventKind};

// Re-export snapshot types
pub use snapshot::{generate_snapshot_id, GroupSnapshot, PopulationSnapshot};
