//! Demo Model Setup
//!
//! Population spawning and relationship seeding for the `mlsim` binary.

pub mod agents;
pub mod network;

pub use agents::*;
pub use network::*;
