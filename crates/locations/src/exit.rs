use glam::Vec3;
use wayfarer_common::{AgentId, LoadingMethod, LocationId, TriggerKind};
use wayfarer_events::EventBus;

use crate::events::TransitionRequested;

const DEFAULT_TRIGGER_RADIUS: f32 = 2.0;

/// A spatial trigger leading out of a location.
///
/// Exits never touch the streamer directly: they publish
/// [`TransitionRequested`] and whoever listens decides what to do.
#[derive(Debug, Clone)]
pub struct LocationExit {
    id: String,
    target: LocationId,
    spawn_point: Option<String>,
    method: LoadingMethod,
    trigger: TriggerKind,
    requires_interaction: bool,
    radius: f32,
    position: Vec3,
    agent_in_range: bool,
}

impl LocationExit {
    pub fn new(id: impl Into<String>, target: LocationId) -> Self {
        Self {
            id: id.into(),
            target,
            spawn_point: None,
            method: LoadingMethod::Immediate,
            trigger: TriggerKind::Automatic,
            requires_interaction: false,
            radius: DEFAULT_TRIGGER_RADIUS,
            position: Vec3::ZERO,
            agent_in_range: false,
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

    pub fn with_trigger(mut self, trigger: TriggerKind) -> Self {
        self.trigger = trigger;
        self
    }

    pub fn requiring_interaction(mut self, required: bool) -> Self {
        self.requires_interaction = required;
        self
    }

    pub fn with_radius(mut self, radius: f32) -> Self {
        self.radius = radius.max(0.0);
        self
    }

    pub fn at(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn target(&self) -> &LocationId {
        &self.target
    }

    pub fn spawn_point(&self) -> Option<&str> {
        self.spawn_point.as_deref()
    }

    pub fn method(&self) -> LoadingMethod {
        self.method
    }

    pub fn trigger(&self) -> TriggerKind {
        self.trigger
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    pub fn agent_in_range(&self) -> bool {
        self.agent_in_range
    }

    /// Whether `point` lies inside the trigger sphere.
    pub fn contains(&self, point: Vec3) -> bool {
        self.position.distance(point) <= self.radius
    }

    /// Feed the agent's latest position. Tracks entering and leaving the
    /// trigger sphere; an automatic exit requests travel on entry.
    ///
    /// Returns true if travel was requested.
    pub fn update_proximity(
        &mut self,
        from: &LocationId,
        agent: AgentId,
        agent_position: Vec3,
        bus: &EventBus,
    ) -> bool {
        let inside = self.contains(agent_position);
        match (self.agent_in_range, inside) {
            (false, true) => {
                self.agent_in_range = true;
                tracing::debug!(exit = %self.id, %from, "agent entered exit trigger");
                if self.trigger == TriggerKind::Automatic && !self.requires_interaction {
                    self.request_travel(from, Some(agent), bus);
                    return true;
                }
                false
            }
            (true, false) => {
                self.agent_in_range = false;
                tracing::debug!(exit = %self.id, %from, "agent left exit trigger");
                false
            }
            _ => false,
        }
    }

    /// The agent pressed "use" while standing in range.
    ///
    /// Only exits that need interaction respond. Returns true if travel was
    /// requested.
    pub fn interact(&self, from: &LocationId, agent: AgentId, bus: &EventBus) -> bool {
        let needs_interaction =
            self.requires_interaction || self.trigger == TriggerKind::Interaction;
        if !self.agent_in_range || !needs_interaction {
            return false;
        }
        self.request_travel(from, Some(agent), bus);
        true
    }

    /// Publish a [`TransitionRequested`] towards this exit's target.
    pub fn request_travel(&self, from: &LocationId, agent: Option<AgentId>, bus: &EventBus) {
        tracing::info!(exit = %self.id, %from, to = %self.target, "travel requested");
        bus.publish(TransitionRequested {
            from: Some(from.clone()),
            to: self.target.clone(),
            spawn_point: self.spawn_point.clone(),
            method: self.method,
            exit: Some(self.id.clone()),
            agent,
        });
    }
}
