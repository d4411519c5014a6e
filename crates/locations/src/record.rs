use std::collections::BTreeMap;

use glam::Vec3;
use wayfarer_common::{AgentId, EntityId, LocationId, LocationKind};

use crate::behavior::{LocationBehavior, Standard};
use crate::events::LocationInfo;
use crate::exit::LocationExit;

/// Default NPC capacity of a location.
pub const DEFAULT_MAX_NPCS: usize = 40;

/// One streamable location and its occupancy.
///
/// Records never publish events themselves; state-changing operations report
/// whether anything changed and the owning
/// [`LocationRegistry`](crate::LocationRegistry) does the notifying.
#[derive(Debug)]
pub struct LocationRecord {
    id: LocationId,
    name: String,
    kind: LocationKind,
    persistent: bool,
    loaded: bool,
    default_spawn: Vec3,
    spawn_points: BTreeMap<String, Vec3>,
    exits: Vec<LocationExit>,
    max_npcs: usize,
    npcs: Vec<EntityId>,
    agents: Vec<AgentId>,
    /// Sequence number of the last time this became current (0 = never).
    last_used: u64,
    behavior: Box<dyn LocationBehavior>,
}

impl LocationRecord {
    /// An unloaded, non-persistent location with no extra behaviour.
    pub fn new(id: LocationId) -> Self {
        Self {
            name: id.to_string(),
            id,
            kind: LocationKind::default(),
            persistent: false,
            loaded: false,
            default_spawn: Vec3::ZERO,
            spawn_points: BTreeMap::new(),
            exits: Vec::new(),
            max_npcs: DEFAULT_MAX_NPCS,
            npcs: Vec::new(),
            agents: Vec::new(),
            last_used: 0,
            behavior: Box::new(Standard),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_kind(mut self, kind: LocationKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn persistent(mut self, persistent: bool) -> Self {
        self.persistent = persistent;
        self
    }

    pub fn with_default_spawn(mut self, position: Vec3) -> Self {
        self.default_spawn = position;
        self
    }

    pub fn with_spawn_point(mut self, name: impl Into<String>, position: Vec3) -> Self {
        self.spawn_points.insert(name.into(), position);
        self
    }

    pub fn with_exit(mut self, exit: LocationExit) -> Self {
        self.exits.push(exit);
        self
    }

    pub fn with_max_npcs(mut self, max: usize) -> Self {
        self.max_npcs = max;
        self
    }

    pub fn with_behavior(mut self, behavior: impl LocationBehavior + 'static) -> Self {
        self.behavior = Box::new(behavior);
        self
    }

    pub fn id(&self) -> &LocationId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> LocationKind {
        self.kind
    }

    pub fn is_persistent(&self) -> bool {
        self.persistent
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn default_spawn(&self) -> Vec3 {
        self.default_spawn
    }

    pub fn exits(&self) -> &[LocationExit] {
        &self.exits
    }

    pub fn exits_mut(&mut self) -> &mut [LocationExit] {
        &mut self.exits
    }

    pub fn max_npcs(&self) -> usize {
        self.max_npcs
    }

    pub fn npcs(&self) -> &[EntityId] {
        &self.npcs
    }

    pub fn agents(&self) -> &[AgentId] {
        &self.agents
    }

    pub fn last_used(&self) -> u64 {
        self.last_used
    }

    pub fn behavior(&self) -> &dyn LocationBehavior {
        self.behavior.as_ref()
    }

    pub fn info(&self) -> LocationInfo {
        LocationInfo {
            id: self.id.clone(),
            name: self.name.clone(),
            kind: self.kind,
            persistent: self.persistent,
        }
    }

    /// Mark loaded. Returns false if it already was.
    pub fn load(&mut self) -> bool {
        if self.loaded {
            return false;
        }
        self.loaded = true;
        self.behavior.on_loaded(&self.id);
        true
    }

    /// Evict all NPCs and mark unloaded.
    ///
    /// Persistent locations refuse. Returns false if nothing changed.
    pub fn unload(&mut self) -> bool {
        if !self.loaded || self.persistent {
            return false;
        }
        for npc in std::mem::take(&mut self.npcs) {
            self.behavior.on_npc_removed(&self.id, npc);
        }
        self.loaded = false;
        self.behavior.on_unloaded(&self.id);
        true
    }

    /// Named spawn point if given and present, else the default spawn.
    pub fn spawn_position(&self, name: Option<&str>) -> Vec3 {
        name.and_then(|n| self.spawn_points.get(n))
            .copied()
            .unwrap_or(self.default_spawn)
    }

    pub fn can_add_npc(&self) -> bool {
        self.npcs.len() < self.max_npcs
    }

    /// Returns false if the NPC is already here or the location is full.
    pub fn add_npc(&mut self, npc: EntityId) -> bool {
        if self.npcs.contains(&npc) || !self.can_add_npc() {
            return false;
        }
        self.npcs.push(npc);
        self.behavior.on_npc_added(&self.id, npc);
        true
    }

    pub fn remove_npc(&mut self, npc: EntityId) -> bool {
        let Some(index) = self.npcs.iter().position(|n| *n == npc) else {
            return false;
        };
        self.npcs.remove(index);
        self.behavior.on_npc_removed(&self.id, npc);
        true
    }

    /// Record the agent as present. Returns false if it already was.
    pub fn enter(&mut self, agent: AgentId) -> bool {
        if self.agents.contains(&agent) {
            return false;
        }
        self.agents.push(agent);
        true
    }

    /// Record the agent as gone. Returns false if it was not here.
    pub fn exit(&mut self, agent: AgentId) -> bool {
        let before = self.agents.len();
        self.agents.retain(|a| *a != agent);
        self.agents.len() != before
    }

    pub(crate) fn touch(&mut self, sequence: u64) {
        self.last_used = sequence;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behavior::SafeZone;

    fn record(raw: &str) -> LocationRecord {
        LocationRecord::new(LocationId::parse(raw).unwrap())
    }

    #[test]
    fn load_is_idempotent() {
        let mut r = record("camp");
        assert!(r.load());
        assert!(!r.load());
        assert!(r.is_loaded());
    }

    #[test]
    fn unload_clears_npcs() {
        let mut r = record("camp");
        r.load();
        r.add_npc(EntityId::new());
        r.add_npc(EntityId::new());
        assert!(r.unload());
        assert!(!r.is_loaded());
        assert!(r.npcs().is_empty());
        assert!(!r.unload());
    }

    #[test]
    fn persistent_refuses_unload() {
        let mut r = record("hub").persistent(true);
        r.load();
        r.add_npc(EntityId::new());
        assert!(!r.unload());
        assert!(r.is_loaded());
        assert_eq!(r.npcs().len(), 1);
    }

    #[test]
    fn spawn_position_falls_back_to_default() {
        let r = record("camp")
            .with_default_spawn(Vec3::new(1.0, 0.0, 1.0))
            .with_spawn_point("gate", Vec3::new(5.0, 0.0, 0.0));
        assert_eq!(r.spawn_position(Some("gate")), Vec3::new(5.0, 0.0, 0.0));
        assert_eq!(r.spawn_position(Some("missing")), Vec3::new(1.0, 0.0, 1.0));
        assert_eq!(r.spawn_position(None), Vec3::new(1.0, 0.0, 1.0));
    }

    #[test]
    fn npc_capacity_and_dedup() {
        let mut r = record("hut").with_max_npcs(2);
        let a = EntityId::new();
        assert!(r.add_npc(a));
        assert!(!r.add_npc(a));
        assert!(r.add_npc(EntityId::new()));
        assert!(!r.can_add_npc());
        assert!(!r.add_npc(EntityId::new()));
        assert!(r.remove_npc(a));
        assert!(!r.remove_npc(a));
        assert!(r.can_add_npc());
    }

    #[test]
    fn agent_membership() {
        let mut r = record("camp");
        let agent = AgentId::new();
        assert!(r.enter(agent));
        assert!(!r.enter(agent));
        assert!(r.exit(agent));
        assert!(!r.exit(agent));
    }

    #[test]
    fn behavior_hooks_follow_lifecycle() {
        let mut r = record("haven").with_behavior(SafeZone::default());
        r.load();
        r.add_npc(EntityId::new());
        let zone = r.behavior().as_any().downcast_ref::<SafeZone>().unwrap();
        assert!(zone.features_active());
        assert_eq!(zone.residents_admitted(), 1);

        r.unload();
        let zone = r.behavior().as_any().downcast_ref::<SafeZone>().unwrap();
        assert!(!zone.features_active());
    }

    #[test]
    fn info_mirrors_record() {
        let r = record("vault")
            .with_name("Vault 7")
            .with_kind(LocationKind::Underground)
            .persistent(true);
        let info = r.info();
        assert_eq!(info.id.as_str(), "vault");
        assert_eq!(info.name, "Vault 7");
        assert_eq!(info.kind, LocationKind::Underground);
        assert!(info.persistent);
    }
}
