//! Event catalog for location lifecycle and streaming progress.

use serde::Serialize;
use wayfarer_common::{AgentId, LoadingMethod, LocationId, LocationKind};
use wayfarer_events::Event;

/// Lightweight description of a location carried by events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocationInfo {
    pub id: LocationId,
    pub name: String,
    pub kind: LocationKind,
    pub persistent: bool,
}

/// A pipeline run has started for `location`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadingStarted {
    pub location: LocationId,
    pub method: LoadingMethod,
}

/// Advisory progress of the in-flight pipeline run, in `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadingProgress {
    pub location: LocationId,
    pub fraction: f32,
}

/// How a pipeline run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadOutcome {
    /// The target resolved and became current.
    Transitioned,
    /// The target could not be found anywhere; current is unchanged.
    Unresolved,
}

/// A pipeline run finished. Always published, whatever the outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadingCompleted {
    pub location: LocationId,
    pub outcome: LoadOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationLoaded {
    pub location: LocationInfo,
}

/// Why a location left the active set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnloadReason {
    /// Forced out to make room for a new load.
    Evicted,
    /// Drained from the unload queue.
    Requested,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationUnloaded {
    pub location: LocationInfo,
    pub reason: UnloadReason,
}

/// The current location changed. `previous` is `None` for the first move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationChanged {
    pub previous: Option<LocationId>,
    pub current: LocationId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerEnteredLocation {
    pub location: LocationInfo,
    pub agent: AgentId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerExitedLocation {
    pub location: LocationInfo,
    pub agent: AgentId,
}

/// Published by trigger sources (exits) to ask the streamer for a move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionRequested {
    pub from: Option<LocationId>,
    pub to: LocationId,
    pub spawn_point: Option<String>,
    pub method: LoadingMethod,
    pub exit: Option<String>,
    pub agent: Option<AgentId>,
}

impl Event for LoadingStarted {}
impl Event for LoadingProgress {}
impl Event for LoadingCompleted {}
impl Event for LocationLoaded {}
impl Event for LocationUnloaded {}
impl Event for LocationChanged {}
impl Event for PlayerEnteredLocation {}
impl Event for PlayerExitedLocation {}
impl Event for TransitionRequested {}
