//! Shared identifiers and enums used across the wayfarer crates.
//!
//! # Invariants
//! - A `LocationId` is never empty and never contains whitespace.

mod types;

pub use glam::Vec3;
pub use types::{
    AgentId, EntityId, Faction, GameState, IdError, LoadingMethod, LocationId, LocationKind,
    TriggerKind,
};
