//! Locations: streamable records, their registry, exits and world manifests.
//!
//! # Invariants
//! - A location id is registered at most once.
//! - Persistent locations never leave the registry through `unload`.
//! - Records hold no reference to the registry or the bus; the registry
//!   announces every load, unload, enter and exit it performs.

mod behavior;
pub mod events;
mod exit;
mod loader;
mod manifest;
mod record;
mod registry;

pub use behavior::{Loadable, LocationBehavior, OccupancyAware, SafeZone, Standard};
pub use exit::LocationExit;
pub use loader::{LocationLoader, ManifestLoader, NoFallback};
pub use manifest::{BehaviorDef, ExitDef, LocationDef, ManifestError, WorldManifest};
pub use record::{DEFAULT_MAX_NPCS, LocationRecord};
pub use registry::LocationRegistry;

pub fn crate_info() -> &'static str {
    "wayfarer-locations v0.1.0"
}
