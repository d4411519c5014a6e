use std::time::Duration;

use wayfarer_common::{LoadingMethod, LocationId};

/// Progress reported once eviction is done.
pub(crate) const PROGRESS_EVICTED: f32 = 0.3;
/// Progress reported once the target has been resolved (or given up on).
pub(crate) const PROGRESS_RESOLVED: f32 = 0.7;
pub(crate) const PROGRESS_DONE: f32 = 1.0;

/// A queued request to make a location current.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadRequest {
    pub location: LocationId,
    pub spawn_point: Option<String>,
    pub method: LoadingMethod,
}

impl LoadRequest {
    pub fn new(location: LocationId) -> Self {
        Self {
            location,
            spawn_point: None,
            method: LoadingMethod::default(),
        }
    }

    pub fn with_spawn_point(mut self, name: impl Into<String>) -> Self {
        self.spawn_point = Some(name.into());
        self
    }

    pub fn with_method(mut self, method: LoadingMethod) -> Self {
        self.method = method;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnloadRequest {
    pub location: LocationId,
}

/// An unload waiting for its delay to elapse.
#[derive(Debug, Clone)]
pub(crate) struct DelayedUnload {
    pub location: LocationId,
    pub due: Duration,
}

/// Where an in-flight load currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelinePhase {
    /// Making room in the active set, one eviction per tick.
    Evicting,
    /// Looking the target up in the registry, then the scene.
    Resolving,
    /// Waiting on the fallback loader.
    AwaitingAsset,
    Transitioning,
    /// Reporting final progress.
    Reporting,
    Finishing,
}

/// State of the single in-flight load.
#[derive(Debug)]
pub(crate) struct PipelineRun {
    pub request: LoadRequest,
    pub phase: PipelinePhase,
    /// Clock value before which the run stays suspended.
    pub wait_until: Option<Duration>,
    pub resolved: bool,
}

impl PipelineRun {
    pub fn new(request: LoadRequest) -> Self {
        Self {
            request,
            phase: PipelinePhase::Evicting,
            wait_until: None,
            resolved: false,
        }
    }
}

/// What the driver should do after one pipeline step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Step {
    Continue,
    Yield,
    Done,
}
