use std::any::Any;
use std::fmt;

use wayfarer_common::{EntityId, Faction, LocationId};

/// Hooks run when a location enters or leaves the loaded state.
pub trait Loadable {
    fn on_loaded(&mut self, _location: &LocationId) {}
    fn on_unloaded(&mut self, _location: &LocationId) {}
}

/// Hooks run when NPC occupancy changes.
pub trait OccupancyAware {
    fn on_npc_added(&mut self, _location: &LocationId, _npc: EntityId) {}
    fn on_npc_removed(&mut self, _location: &LocationId, _npc: EntityId) {}
}

/// Per-variant behaviour plugged into a [`LocationRecord`](crate::LocationRecord).
pub trait LocationBehavior: Loadable + OccupancyAware + fmt::Debug {
    /// Short variant name for logs.
    fn label(&self) -> &'static str;

    fn as_any(&self) -> &dyn Any;
}

/// A location with no extra behaviour.
#[derive(Debug, Clone, Copy, Default)]
pub struct Standard;

impl Loadable for Standard {}
impl OccupancyAware for Standard {}

impl LocationBehavior for Standard {
    fn label(&self) -> &'static str {
        "standard"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A guarded settlement offering services while loaded.
#[derive(Debug, Clone)]
pub struct SafeZone {
    pub trading: bool,
    pub healing: bool,
    pub repairs: bool,
    pub faction: Faction,
    features_active: bool,
    residents_admitted: u32,
}

impl SafeZone {
    pub fn new(faction: Faction) -> Self {
        Self {
            trading: true,
            healing: true,
            repairs: true,
            faction,
            features_active: false,
            residents_admitted: 0,
        }
    }

    /// True between load and unload.
    pub fn features_active(&self) -> bool {
        self.features_active
    }

    /// NPCs admitted since creation.
    pub fn residents_admitted(&self) -> u32 {
        self.residents_admitted
    }
}

impl Default for SafeZone {
    fn default() -> Self {
        Self::new(Faction::default())
    }
}

impl Loadable for SafeZone {
    fn on_loaded(&mut self, location: &LocationId) {
        self.features_active = true;
        tracing::info!(
            %location,
            faction = ?self.faction,
            trading = self.trading,
            healing = self.healing,
            repairs = self.repairs,
            "safe zone services enabled"
        );
    }

    fn on_unloaded(&mut self, location: &LocationId) {
        self.features_active = false;
        tracing::info!(%location, "safe zone services disabled");
    }
}

impl OccupancyAware for SafeZone {
    fn on_npc_added(&mut self, location: &LocationId, npc: EntityId) {
        self.residents_admitted += 1;
        tracing::debug!(%location, npc = %npc.0, "npc admitted to safe zone");
    }
}

impl LocationBehavior for SafeZone {
    fn label(&self) -> &'static str {
        "safe_zone"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
