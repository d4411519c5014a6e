use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a non-player occupant (NPC, prop with presence).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub Uuid);

impl EntityId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

/// Identifier of the controlled agent moving between locations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgentId(pub Uuid);

impl AgentId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AgentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.8}", self.0.to_string())
    }
}

/// Errors from parsing identifiers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdError {
    #[error("location id must not be empty")]
    Empty,
    #[error("location id {0:?} contains whitespace")]
    Whitespace(String),
}

/// Stable string identifier of a streamable location.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LocationId(String);

impl LocationId {
    /// Build an id, rejecting empty strings and embedded whitespace.
    pub fn parse(raw: &str) -> Result<Self, IdError> {
        if raw.is_empty() {
            return Err(IdError::Empty);
        }
        if raw.chars().any(char::is_whitespace) {
            return Err(IdError::Whitespace(raw.to_string()));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for LocationId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for LocationId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<LocationId> for String {
    fn from(id: LocationId) -> Self {
        id.0
    }
}

impl fmt::Display for LocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for LocationId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Broad category of a location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationKind {
    #[default]
    Zone,
    Building,
    Underground,
    Special,
}

/// How the host should present a transition. Advisory: the streamer carries it
/// through to its events but runs the same pipeline for every method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadingMethod {
    #[default]
    Immediate,
    WithLoadingScreen,
    AsyncBackground,
}

/// What makes an exit fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    #[default]
    Automatic,
    Proximity,
    Interaction,
}

/// Coarse game state observed by the streamer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameState {
    #[default]
    MainMenu,
    Loading,
    Playing,
    Paused,
    GameOver,
}

/// Faction controlling a safe zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Faction {
    #[default]
    Government,
    FreeStalkers,
    Cultists,
    Bandits,
    Scientists,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_id_uniqueness() {
        let a = EntityId::new();
        let b = EntityId::new();
        assert_ne!(a, b);
        assert_ne!(AgentId::new(), AgentId::new());
    }

    #[test]
    fn location_id_rejects_blank_and_whitespace() {
        assert_eq!(LocationId::parse(""), Err(IdError::Empty));
        assert!(matches!(
            LocationId::parse("old town"),
            Err(IdError::Whitespace(_))
        ));
        let id: LocationId = "old_town".parse().unwrap();
        assert_eq!(id.as_str(), "old_town");
        assert_eq!(id.to_string(), "old_town");
    }

    #[test]
    fn location_id_deserializes_through_validation() {
        let id: LocationId = serde_yaml::from_str("bunker_7").unwrap();
        assert_eq!(id.as_str(), "bunker_7");
        assert!(serde_yaml::from_str::<LocationId>("\"\"").is_err());
    }

    #[test]
    fn enums_use_snake_case() {
        let method: LoadingMethod = serde_yaml::from_str("with_loading_screen").unwrap();
        assert_eq!(method, LoadingMethod::WithLoadingScreen);
        let kind: LocationKind = serde_yaml::from_str("underground").unwrap();
        assert_eq!(kind, LocationKind::Underground);
    }
}
