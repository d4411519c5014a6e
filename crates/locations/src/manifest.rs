//! YAML world manifests: the list of locations a world can stream.
//!
//! ```yaml
//! start: camp
//! locations:
//!   - id: camp
//!     persistent: true
//!     exits:
//!       - id: camp_road
//!         target: market
//!         spawn_point: south_gate
//!   - id: market
//!     kind: building
//!     spawn_points:
//!       south_gate: [0.0, 0.0, -20.0]
//!     behavior:
//!       type: safe_zone
//!       faction: free_stalkers
//! ```

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use glam::Vec3;
use serde::{Deserialize, Serialize};
use wayfarer_common::{Faction, LoadingMethod, LocationId, LocationKind, TriggerKind};

use crate::behavior::SafeZone;
use crate::exit::LocationExit;
use crate::record::{DEFAULT_MAX_NPCS, LocationRecord};

/// Errors from reading or validating a manifest.
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("duplicate location id: {0}")]
    DuplicateLocation(LocationId),
    #[error("exit {exit} in {location} leads to unknown location {target}")]
    UnknownExitTarget {
        location: LocationId,
        exit: String,
        target: LocationId,
    },
    #[error("start location {0} is not defined")]
    UnknownStart(LocationId),
}

/// Every location of a world plus where the agent begins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldManifest {
    pub start: LocationId,
    pub locations: Vec<LocationDef>,
}

/// Serialized form of a [`LocationRecord`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationDef {
    pub id: LocationId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub kind: LocationKind,
    #[serde(default)]
    pub persistent: bool,
    #[serde(default = "default_max_npcs")]
    pub max_npcs: usize,
    #[serde(default)]
    pub default_spawn: Vec3,
    #[serde(default)]
    pub spawn_points: BTreeMap<String, Vec3>,
    #[serde(default)]
    pub exits: Vec<ExitDef>,
    #[serde(default)]
    pub behavior: BehaviorDef,
    /// Present in the scene from the start. When false the location is only
    /// reachable through the asset-load fallback.
    #[serde(default = "default_true")]
    pub in_scene: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExitDef {
    pub id: String,
    pub target: LocationId,
    #[serde(default)]
    pub spawn_point: Option<String>,
    #[serde(default)]
    pub method: LoadingMethod,
    #[serde(default)]
    pub trigger: TriggerKind,
    #[serde(default)]
    pub requires_interaction: bool,
    #[serde(default = "default_radius")]
    pub radius: f32,
    #[serde(default)]
    pub position: Vec3,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BehaviorDef {
    #[default]
    Standard,
    SafeZone {
        #[serde(default = "default_true")]
        trading: bool,
        #[serde(default = "default_true")]
        healing: bool,
        #[serde(default = "default_true")]
        repairs: bool,
        #[serde(default)]
        faction: Faction,
    },
}

fn default_max_npcs() -> usize {
    DEFAULT_MAX_NPCS
}

fn default_true() -> bool {
    true
}

fn default_radius() -> f32 {
    2.0
}

impl WorldManifest {
    pub fn from_yaml_str(text: &str) -> Result<Self, ManifestError> {
        let manifest: Self = serde_yaml::from_str(text)?;
        manifest.validate()?;
        Ok(manifest)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ManifestError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    /// Reject duplicate ids, dangling exits and an undefined start.
    pub fn validate(&self) -> Result<(), ManifestError> {
        let mut seen = HashSet::new();
        for def in &self.locations {
            if !seen.insert(&def.id) {
                return Err(ManifestError::DuplicateLocation(def.id.clone()));
            }
        }
        for def in &self.locations {
            for exit in &def.exits {
                if !seen.contains(&exit.target) {
                    return Err(ManifestError::UnknownExitTarget {
                        location: def.id.clone(),
                        exit: exit.id.clone(),
                        target: exit.target.clone(),
                    });
                }
            }
        }
        if !seen.contains(&self.start) {
            return Err(ManifestError::UnknownStart(self.start.clone()));
        }
        Ok(())
    }

    pub fn get(&self, id: &LocationId) -> Option<&LocationDef> {
        self.locations.iter().find(|def| &def.id == id)
    }

    /// Instantiate every location that starts out in the scene.
    pub fn scene_records(&self) -> Vec<LocationRecord> {
        self.locations
            .iter()
            .filter(|def| def.in_scene)
            .map(LocationDef::instantiate)
            .collect()
    }

    /// Definitions only reachable through the asset fallback.
    pub fn fallback_defs(&self) -> impl Iterator<Item = &LocationDef> {
        self.locations.iter().filter(|def| !def.in_scene)
    }
}

impl LocationDef {
    /// Build a fresh, unloaded record.
    pub fn instantiate(&self) -> LocationRecord {
        let mut record = LocationRecord::new(self.id.clone())
            .with_kind(self.kind)
            .persistent(self.persistent)
            .with_max_npcs(self.max_npcs)
            .with_default_spawn(self.default_spawn);
        if let Some(name) = &self.name {
            record = record.with_name(name.clone());
        }
        for (name, position) in &self.spawn_points {
            record = record.with_spawn_point(name.clone(), *position);
        }
        for exit in &self.exits {
            record = record.with_exit(exit.instantiate());
        }
        match &self.behavior {
            BehaviorDef::Standard => record,
            BehaviorDef::SafeZone {
                trading,
                healing,
                repairs,
                faction,
            } => {
                let mut zone = SafeZone::new(*faction);
                zone.trading = *trading;
                zone.healing = *healing;
                zone.repairs = *repairs;
                record.with_behavior(zone)
            }
        }
    }
}

impl ExitDef {
    pub fn instantiate(&self) -> LocationExit {
        let mut exit = LocationExit::new(self.id.clone(), self.target.clone())
            .with_method(self.method)
            .with_trigger(self.trigger)
            .requiring_interaction(self.requires_interaction)
            .with_radius(self.radius)
            .at(self.position);
        if let Some(spawn) = &self.spawn_point {
            exit = exit.with_spawn_point(spawn.clone());
        }
        exit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const WORLD: &str = r#"
start: camp
locations:
  - id: camp
    name: Border Camp
    persistent: true
    exits:
      - id: camp_road
        target: market
        spawn_point: south_gate
        position: [10.0, 0.0, 0.0]
  - id: market
    kind: building
    max_npcs: 12
    default_spawn: [0.0, 0.0, 5.0]
    spawn_points:
      south_gate: [0.0, 0.0, -20.0]
    behavior:
      type: safe_zone
      faction: free_stalkers
      repairs: false
  - id: vault
    kind: underground
    in_scene: false
"#;

    fn id(raw: &str) -> LocationId {
        LocationId::parse(raw).unwrap()
    }

    #[test]
    fn parses_and_applies_defaults() {
        let manifest = WorldManifest::from_yaml_str(WORLD).unwrap();
        assert_eq!(manifest.start, id("camp"));
        assert_eq!(manifest.locations.len(), 3);

        let camp = manifest.get(&id("camp")).unwrap();
        assert!(camp.persistent);
        assert!(camp.in_scene);
        assert_eq!(camp.max_npcs, DEFAULT_MAX_NPCS);
        assert_eq!(camp.exits[0].radius, 2.0);
        assert_eq!(camp.exits[0].method, LoadingMethod::Immediate);
    }

    #[test]
    fn instantiates_records() {
        let manifest = WorldManifest::from_yaml_str(WORLD).unwrap();
        let market = manifest.get(&id("market")).unwrap().instantiate();
        assert_eq!(market.kind(), LocationKind::Building);
        assert_eq!(market.max_npcs(), 12);
        assert_eq!(
            market.spawn_position(Some("south_gate")),
            Vec3::new(0.0, 0.0, -20.0)
        );
        assert_eq!(market.spawn_position(None), Vec3::new(0.0, 0.0, 5.0));
        let zone = market
            .behavior()
            .as_any()
            .downcast_ref::<SafeZone>()
            .unwrap();
        assert_eq!(zone.faction, Faction::FreeStalkers);
        assert!(zone.trading);
        assert!(!zone.repairs);

        let camp = manifest.get(&id("camp")).unwrap().instantiate();
        assert_eq!(camp.name(), "Border Camp");
        assert_eq!(camp.behavior().label(), "standard");
        assert_eq!(camp.exits()[0].target(), &id("market"));
        assert_eq!(camp.exits()[0].spawn_point(), Some("south_gate"));
    }

    #[test]
    fn scene_and_fallback_partition() {
        let manifest = WorldManifest::from_yaml_str(WORLD).unwrap();
        let scene: Vec<String> = manifest
            .scene_records()
            .iter()
            .map(|r| r.id().to_string())
            .collect();
        assert_eq!(scene, vec!["camp", "market"]);
        let fallback: Vec<&LocationId> = manifest.fallback_defs().map(|d| &d.id).collect();
        assert_eq!(fallback, vec![&id("vault")]);
    }

    #[test]
    fn rejects_duplicate_ids() {
        let text = "start: a\nlocations:\n  - id: a\n  - id: a\n";
        assert!(matches!(
            WorldManifest::from_yaml_str(text),
            Err(ManifestError::DuplicateLocation(_))
        ));
    }

    #[test]
    fn rejects_dangling_exit() {
        let text = "start: a\nlocations:\n  - id: a\n    exits:\n      - id: door\n        target: b\n";
        let err = WorldManifest::from_yaml_str(text).unwrap_err();
        assert!(matches!(err, ManifestError::UnknownExitTarget { .. }));
        assert!(err.to_string().contains("door"));
    }

    #[test]
    fn rejects_unknown_start() {
        let text = "start: z\nlocations:\n  - id: a\n";
        assert!(matches!(
            WorldManifest::from_yaml_str(text),
            Err(ManifestError::UnknownStart(_))
        ));
    }

    #[test]
    fn rejects_invalid_location_id() {
        let text = "start: a\nlocations:\n  - id: \"bad id\"\n";
        assert!(matches!(
            WorldManifest::from_yaml_str(text),
            Err(ManifestError::Yaml(_))
        ));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(WORLD.as_bytes()).unwrap();
        let manifest = WorldManifest::load(file.path()).unwrap();
        assert_eq!(manifest.locations.len(), 3);
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = WorldManifest::load(dir.path().join("absent.yaml")).unwrap_err();
        assert!(matches!(err, ManifestError::Io(_)));
    }
}
