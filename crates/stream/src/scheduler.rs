use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, VecDeque};
use std::rc::Rc;
use std::task::Poll;
use std::time::Duration;

use glam::Vec3;
use serde::Serialize;
use wayfarer_common::{AgentId, EntityId, GameState, LocationId};
use wayfarer_events::{EventBus, Subscription};
use wayfarer_locations::events::{
    LoadOutcome, LoadingCompleted, LoadingProgress, LoadingStarted, LocationChanged,
    TransitionRequested, UnloadReason,
};
use wayfarer_locations::{LocationLoader, LocationRecord, LocationRegistry, NoFallback};
use wayfarer_session::GameStateChanged;

use crate::config::{ConfigError, EvictionPolicy, StreamingConfig};
use crate::pipeline::{
    DelayedUnload, LoadRequest, PROGRESS_DONE, PROGRESS_EVICTED, PROGRESS_RESOLVED, PipelinePhase,
    PipelineRun, Step, UnloadRequest,
};

/// Errors from constructing or seeding a scheduler.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    #[error("invalid streaming config: {0}")]
    Config(#[from] ConfigError),
    #[error("location {0} is neither registered nor in the scene")]
    UnknownLocation(LocationId),
    #[error("initial location already set to {0}")]
    AlreadyStarted(LocationId),
}

/// The single agent whose location the scheduler tracks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Agent {
    pub id: AgentId,
    pub position: Vec3,
}

/// Cumulative streaming statistics for instrumentation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StreamStats {
    pub ticks: u64,
    pub loads_started: u64,
    pub loads_completed: u64,
    pub loads_failed: u64,
    pub evictions: u64,
    pub unloads: u64,
    pub unloads_cancelled: u64,
    pub capacity_exhaustions: u64,
}

/// Serializes location loads, keeps the active set within capacity and
/// retires locations the agent has left.
///
/// Work happens only inside [`tick`](Self::tick). At most one load runs at a
/// time; unloads are processed one per tick and only while no load is in
/// flight or queued.
pub struct StreamingScheduler {
    config: StreamingConfig,
    bus: Rc<EventBus>,
    registry: LocationRegistry,
    scene: BTreeMap<LocationId, LocationRecord>,
    loader: Box<dyn LocationLoader>,
    load_queue: Rc<RefCell<VecDeque<LoadRequest>>>,
    unload_queue: VecDeque<UnloadRequest>,
    delayed_unloads: Vec<DelayedUnload>,
    pipeline: Option<PipelineRun>,
    current: Option<LocationId>,
    agent: Option<Agent>,
    game_state: Rc<Cell<GameState>>,
    clock: Duration,
    use_sequence: u64,
    subscriptions: Vec<Subscription>,
    stats: StreamStats,
}

impl StreamingScheduler {
    /// Create a scheduler with an empty scene and no asset fallback.
    ///
    /// Subscribes to [`TransitionRequested`] (queued as loads) and
    /// [`GameStateChanged`] on `bus` until dropped.
    pub fn new(config: StreamingConfig, bus: Rc<EventBus>) -> Result<Self, StreamError> {
        config.validate()?;

        let load_queue = Rc::new(RefCell::new(VecDeque::new()));
        let game_state = Rc::new(Cell::new(GameState::default()));

        let queue = Rc::clone(&load_queue);
        let on_transition = bus.subscribe(move |e: &TransitionRequested| {
            tracing::debug!(from = ?e.from, to = %e.to, exit = ?e.exit, "transition requested");
            queue.borrow_mut().push_back(LoadRequest {
                location: e.to.clone(),
                spawn_point: e.spawn_point.clone(),
                method: e.method,
            });
            Ok(())
        });
        let state = Rc::clone(&game_state);
        let on_state = bus.subscribe(move |e: &GameStateChanged| {
            state.set(e.current);
            Ok(())
        });

        Ok(Self {
            config,
            registry: LocationRegistry::new(Rc::clone(&bus)),
            bus,
            scene: BTreeMap::new(),
            loader: Box::new(NoFallback),
            load_queue,
            unload_queue: VecDeque::new(),
            delayed_unloads: Vec::new(),
            pipeline: None,
            current: None,
            agent: None,
            game_state,
            clock: Duration::ZERO,
            use_sequence: 0,
            subscriptions: vec![on_transition, on_state],
            stats: StreamStats::default(),
        })
    }

    /// Use `loader` for locations found neither in the registry nor the scene.
    pub fn with_loader(mut self, loader: impl LocationLoader + 'static) -> Self {
        self.loader = Box::new(loader);
        self
    }

    /// Place an unregistered location in the scene. Returns false if the id is
    /// already known.
    pub fn add_to_scene(&mut self, record: LocationRecord) -> bool {
        if self.registry.contains(record.id()) || self.scene.contains_key(record.id()) {
            return false;
        }
        self.scene.insert(record.id().clone(), record);
        true
    }

    pub fn in_scene(&self, id: &LocationId) -> bool {
        self.scene.contains_key(id)
    }

    pub fn scene_len(&self) -> usize {
        self.scene.len()
    }

    pub fn attach_agent(&mut self, id: AgentId, position: Vec3) {
        self.agent = Some(Agent { id, position });
    }

    pub fn agent(&self) -> Option<&Agent> {
        self.agent.as_ref()
    }

    /// Make `id` current without running the pipeline.
    ///
    /// Meant for startup: publishes `PlayerEnteredLocation` but no
    /// `LocationChanged`.
    pub fn set_initial_location(&mut self, id: LocationId) -> Result<(), StreamError> {
        if let Some(current) = &self.current {
            return Err(StreamError::AlreadyStarted(current.clone()));
        }
        if !self.resolve_local(&id) {
            return Err(StreamError::UnknownLocation(id));
        }
        self.registry.load(&id);
        if let Some(agent) = self.agent.as_mut() {
            if let Some(record) = self.registry.get(&id) {
                agent.position = record.default_spawn();
            }
            self.registry.enter(&id, agent.id);
        }
        self.use_sequence += 1;
        self.registry.touch(&id, self.use_sequence);
        tracing::info!(location = %id, "initial location set");
        self.current = Some(id);
        Ok(())
    }

    /// Queue a request to make `location` current. Never fails; an unknown
    /// location surfaces later as an unresolved load.
    pub fn enqueue_load(&mut self, request: LoadRequest) {
        tracing::debug!(location = %request.location, "load queued");
        self.load_queue.borrow_mut().push_back(request);
    }

    /// Queue an unload of `location`, after `delay` of scheduler time.
    pub fn enqueue_unload(&mut self, location: LocationId, delay: Duration) {
        if delay.is_zero() {
            tracing::debug!(%location, "unload queued");
            self.unload_queue.push_back(UnloadRequest { location });
        } else {
            tracing::debug!(%location, ?delay, "unload scheduled");
            self.delayed_unloads.push(DelayedUnload {
                location,
                due: self.clock.saturating_add(delay),
            });
        }
    }

    pub fn current_location(&self) -> Option<&LocationId> {
        self.current.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.pipeline.is_some()
    }

    /// Phase of the in-flight load, if any.
    pub fn phase(&self) -> Option<PipelinePhase> {
        self.pipeline.as_ref().map(|run| run.phase)
    }

    /// No load in flight and nothing queued or scheduled.
    pub fn is_idle(&self) -> bool {
        self.pipeline.is_none()
            && self.load_queue.borrow().is_empty()
            && self.unload_queue.is_empty()
            && self.delayed_unloads.is_empty()
    }

    pub fn pending_loads(&self) -> usize {
        self.load_queue.borrow().len()
    }

    /// Queued plus not-yet-due unloads.
    pub fn pending_unloads(&self) -> usize {
        self.unload_queue.len() + self.delayed_unloads.len()
    }

    pub fn registry(&self) -> &LocationRegistry {
        &self.registry
    }

    pub fn config(&self) -> &StreamingConfig {
        &self.config
    }

    pub fn bus(&self) -> &Rc<EventBus> {
        &self.bus
    }

    /// Scheduler time elapsed over all unsuspended ticks.
    pub fn clock(&self) -> Duration {
        self.clock
    }

    /// Last game state seen on the bus.
    pub fn game_state(&self) -> GameState {
        self.game_state.get()
    }

    pub fn stats(&self) -> &StreamStats {
        &self.stats
    }

    pub fn add_npc(&mut self, location: &LocationId, npc: EntityId) -> bool {
        self.registry
            .get_mut(location)
            .is_some_and(|record| record.add_npc(npc))
    }

    pub fn remove_npc(&mut self, location: &LocationId, npc: EntityId) -> bool {
        self.registry
            .get_mut(location)
            .is_some_and(|record| record.remove_npc(npc))
    }

    /// Move the agent and feed the new position to the current location's
    /// exits. Returns how many exits requested travel.
    pub fn move_agent(&mut self, position: Vec3) -> usize {
        let Some(agent) = self.agent.as_mut() else {
            return 0;
        };
        agent.position = position;
        let agent_id = agent.id;
        let Some(current) = self.current.clone() else {
            return 0;
        };
        let Some(record) = self.registry.get_mut(&current) else {
            return 0;
        };
        let bus = &self.bus;
        record
            .exits_mut()
            .iter_mut()
            .map(|exit| exit.update_proximity(&current, agent_id, position, bus))
            .filter(|fired| *fired)
            .count()
    }

    /// The agent pressed "use". Returns how many exits requested travel.
    pub fn interact(&mut self) -> usize {
        let (Some(agent), Some(current)) = (self.agent, self.current.as_ref()) else {
            return 0;
        };
        let Some(record) = self.registry.get(current) else {
            return 0;
        };
        record
            .exits()
            .iter()
            .filter(|exit| exit.interact(current, agent.id, &self.bus))
            .count()
    }

    /// Advance the scheduler by `dt`.
    ///
    /// Fires due delayed unloads, resumes the in-flight load, then starts the
    /// next queued load or, if none, processes one queued unload.
    pub fn tick(&mut self, dt: Duration) {
        let _span = tracing::info_span!("stream_tick", tick = self.stats.ticks).entered();
        if self.config.suspend_while_paused && self.game_state.get() == GameState::Paused {
            tracing::trace!("suspended while paused");
            return;
        }
        self.stats.ticks += 1;
        self.clock = self.clock.saturating_add(dt);

        self.fire_delayed_unloads();
        self.advance_pipeline();

        if self.pipeline.is_some() {
            return;
        }
        let next = self.load_queue.borrow_mut().pop_front();
        if let Some(request) = next {
            self.start_run(request);
        } else if let Some(request) = self.unload_queue.pop_front() {
            self.process_unload(request);
        }
    }

    /// Tick with a fixed `dt` until idle or `max_ticks` is reached. Returns the
    /// number of ticks taken.
    pub fn run_until_idle(&mut self, dt: Duration, max_ticks: usize) -> usize {
        let mut ticks = 0;
        while !self.is_idle() && ticks < max_ticks {
            self.tick(dt);
            ticks += 1;
        }
        ticks
    }

    fn fire_delayed_unloads(&mut self) {
        if self.delayed_unloads.is_empty() {
            return;
        }
        let clock = self.clock;
        let (mut due, pending): (Vec<_>, Vec<_>) = std::mem::take(&mut self.delayed_unloads)
            .into_iter()
            .partition(|unload| unload.due <= clock);
        self.delayed_unloads = pending;
        due.sort_by_key(|unload| unload.due);
        for unload in due {
            tracing::debug!(location = %unload.location, "delayed unload due");
            self.unload_queue.push_back(UnloadRequest {
                location: unload.location,
            });
        }
    }

    fn start_run(&mut self, request: LoadRequest) {
        tracing::info!(location = %request.location, method = ?request.method, "loading started");
        self.stats.loads_started += 1;
        let started = LoadingStarted {
            location: request.location.clone(),
            method: request.method,
        };
        self.pipeline = Some(PipelineRun::new(request));
        self.bus.publish(started);
        self.advance_pipeline();
    }

    /// Run the in-flight load until its next suspension point.
    fn advance_pipeline(&mut self) {
        let Some(mut run) = self.pipeline.take() else {
            return;
        };
        loop {
            match self.step(&mut run) {
                Step::Continue => {}
                Step::Yield => {
                    self.pipeline = Some(run);
                    return;
                }
                Step::Done => return,
            }
        }
    }

    fn step(&mut self, run: &mut PipelineRun) -> Step {
        if let Some(until) = run.wait_until {
            if self.clock < until {
                return Step::Yield;
            }
            run.wait_until = None;
        }

        let target = run.request.location.clone();
        match run.phase {
            PipelinePhase::Evicting => {
                if self.registry.count() >= self.config.max_loaded_locations {
                    if let Some(victim) = self.pick_evictable(&target) {
                        self.evict(&victim);
                        return Step::Yield;
                    }
                    tracing::warn!(
                        location = %target,
                        loaded = self.registry.count(),
                        capacity = self.config.max_loaded_locations,
                        "no evictable location, loading over capacity"
                    );
                    self.stats.capacity_exhaustions += 1;
                }
                self.report_progress(&target, PROGRESS_EVICTED);
                run.phase = PipelinePhase::Resolving;
                self.settle(run)
            }
            PipelinePhase::Resolving => {
                if self.resolve_local(&target) {
                    run.resolved = true;
                    return self.resolved(run);
                }
                tracing::debug!(location = %target, "not in scene, trying asset fallback");
                self.loader.begin(&target);
                run.phase = PipelinePhase::AwaitingAsset;
                Step::Continue
            }
            PipelinePhase::AwaitingAsset => match self.loader.poll(&target) {
                Poll::Pending => Step::Yield,
                Poll::Ready(Some(record)) => {
                    run.resolved = self.adopt(record, &target);
                    self.resolved(run)
                }
                Poll::Ready(None) => {
                    run.resolved = false;
                    self.resolved(run)
                }
            },
            PipelinePhase::Transitioning => {
                run.phase = PipelinePhase::Reporting;
                if run.resolved && self.transition(&run.request) {
                    return Step::Yield;
                }
                run.resolved = false;
                tracing::error!(location = %target, "location not found");
                self.stats.loads_failed += 1;
                Step::Continue
            }
            PipelinePhase::Reporting => {
                self.report_progress(&target, PROGRESS_DONE);
                run.phase = PipelinePhase::Finishing;
                self.settle(run)
            }
            PipelinePhase::Finishing => {
                let outcome = if run.resolved {
                    self.stats.loads_completed += 1;
                    LoadOutcome::Transitioned
                } else {
                    LoadOutcome::Unresolved
                };
                tracing::info!(location = %target, ?outcome, "loading completed");
                self.bus.publish(LoadingCompleted {
                    location: target,
                    outcome,
                });
                Step::Done
            }
        }
    }

    fn resolved(&mut self, run: &mut PipelineRun) -> Step {
        self.report_progress(&run.request.location, PROGRESS_RESOLVED);
        run.phase = PipelinePhase::Transitioning;
        self.settle(run)
    }

    fn settle(&self, run: &mut PipelineRun) -> Step {
        run.wait_until = Some(self.clock.saturating_add(self.config.settle_delay()));
        Step::Yield
    }

    fn report_progress(&self, location: &LocationId, fraction: f32) {
        tracing::debug!(%location, fraction, "loading progress");
        self.bus.publish(LoadingProgress {
            location: location.clone(),
            fraction,
        });
    }

    /// Registry first, then the scene. A scene hit is registered.
    fn resolve_local(&mut self, id: &LocationId) -> bool {
        if self.registry.contains(id) {
            return true;
        }
        match self.scene.remove(id) {
            Some(record) => {
                tracing::debug!(location = %id, "found in scene");
                self.registry.register(record)
            }
            None => false,
        }
    }

    /// Register a record delivered by the loader.
    fn adopt(&mut self, record: LocationRecord, expected: &LocationId) -> bool {
        if record.id() != expected {
            tracing::warn!(%expected, got = %record.id(), "loader returned a different location");
            self.add_to_scene(record);
            return false;
        }
        self.registry.register(record)
    }

    fn pick_evictable(&self, target: &LocationId) -> Option<LocationId> {
        let mut candidates = self.registry.iter().filter(|record| {
            !record.is_persistent()
                && Some(record.id()) != self.current.as_ref()
                && record.id() != target
        });
        let victim = match self.config.eviction {
            EvictionPolicy::FirstRegistered => candidates.next(),
            EvictionPolicy::LeastRecentlyUsed => candidates.min_by_key(|record| record.last_used()),
        };
        victim.map(|record| record.id().clone())
    }

    fn evict(&mut self, victim: &LocationId) {
        tracing::info!(location = %victim, "evicting to stay within capacity");
        if let Some(record) = self.registry.unload(victim, UnloadReason::Evicted) {
            self.stats.evictions += 1;
            self.scene.insert(record.id().clone(), record);
        }
    }

    fn transition(&mut self, request: &LoadRequest) -> bool {
        let target = &request.location;
        if !self.registry.contains(target) {
            return false;
        }
        let previous = self.current.clone();

        self.registry.load(target);
        if let Some(agent) = self.agent.as_mut() {
            if let Some(record) = self.registry.get(target) {
                agent.position = record.spawn_position(request.spawn_point.as_deref());
            }
            if let Some(previous) = &previous {
                self.registry.exit(previous, agent.id);
            }
            self.registry.enter(target, agent.id);
        }

        self.use_sequence += 1;
        self.registry.touch(target, self.use_sequence);
        self.current = Some(target.clone());
        self.cancel_unloads(target);

        tracing::info!(from = ?previous, to = %target, "location changed");
        self.bus.publish(LocationChanged {
            previous: previous.clone(),
            current: target.clone(),
        });

        if let Some(previous) = previous.filter(|p| p != target) {
            let persistent = self
                .registry
                .get(&previous)
                .is_some_and(LocationRecord::is_persistent);
            if !persistent {
                self.enqueue_unload(previous, self.config.unload_delay());
            }
        }
        true
    }

    /// Drop scheduled and queued unloads of a location that became current.
    fn cancel_unloads(&mut self, location: &LocationId) {
        let before = self.pending_unloads();
        self.delayed_unloads.retain(|u| &u.location != location);
        self.unload_queue.retain(|u| &u.location != location);
        let cancelled = before - self.pending_unloads();
        if cancelled > 0 {
            tracing::debug!(%location, cancelled, "pending unloads cancelled");
            self.stats.unloads_cancelled += cancelled as u64;
        }
    }

    fn process_unload(&mut self, request: UnloadRequest) {
        let location = request.location;
        if self.current.as_ref() == Some(&location) {
            tracing::debug!(%location, "skipping unload of current location");
            return;
        }
        match self.registry.unload(&location, UnloadReason::Requested) {
            Some(record) => {
                self.stats.unloads += 1;
                self.scene.insert(record.id().clone(), record);
            }
            None => tracing::debug!(%location, "nothing to unload"),
        }
    }
}

impl Drop for StreamingScheduler {
    fn drop(&mut self) {
        for subscription in &self.subscriptions {
            self.bus.unsubscribe(subscription);
        }
    }
}

impl std::fmt::Debug for StreamingScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamingScheduler")
            .field("current", &self.current)
            .field("phase", &self.phase())
            .field("registry", &self.registry)
            .field("scene", &self.scene.keys().collect::<Vec<_>>())
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wayfarer_common::LoadingMethod;
    use wayfarer_locations::events::{LocationLoaded, LocationUnloaded};

    const DT: Duration = Duration::from_millis(50);

    fn id(raw: &str) -> LocationId {
        LocationId::parse(raw).unwrap()
    }

    fn scheduler(config: StreamingConfig, ids: &[&str]) -> StreamingScheduler {
        let bus = Rc::new(EventBus::new());
        let mut s = StreamingScheduler::new(config, bus).unwrap();
        for raw in ids {
            s.add_to_scene(LocationRecord::new(id(raw)));
        }
        s
    }

    #[test]
    fn rejects_invalid_config() {
        let config = StreamingConfig {
            max_loaded_locations: 0,
            ..StreamingConfig::default()
        };
        let err = StreamingScheduler::new(config, Rc::new(EventBus::new())).unwrap_err();
        assert!(matches!(err, StreamError::Config(ConfigError::ZeroCapacity)));
    }

    #[test]
    fn initial_location_resolves_from_scene() {
        let mut s = scheduler(StreamingConfig::default(), &["camp"]);
        s.attach_agent(AgentId::new(), Vec3::splat(9.0));
        s.set_initial_location(id("camp")).unwrap();
        assert_eq!(s.current_location(), Some(&id("camp")));
        assert!(s.registry().is_loaded(&id("camp")));
        assert!(!s.in_scene(&id("camp")));
        assert_eq!(s.agent().unwrap().position, Vec3::ZERO);
        assert!(s.is_idle());
    }

    #[test]
    fn initial_location_errors() {
        let mut s = scheduler(StreamingConfig::default(), &["camp"]);
        assert!(matches!(
            s.set_initial_location(id("nowhere")),
            Err(StreamError::UnknownLocation(_))
        ));
        s.set_initial_location(id("camp")).unwrap();
        assert!(matches!(
            s.set_initial_location(id("camp")),
            Err(StreamError::AlreadyStarted(_))
        ));
    }

    #[test]
    fn load_walks_through_phases() {
        let mut s = scheduler(StreamingConfig::default(), &["camp"]);
        s.enqueue_load(LoadRequest::new(id("camp")).with_method(LoadingMethod::WithLoadingScreen));
        assert!(!s.is_loading());

        s.tick(DT);
        assert!(s.is_loading());
        assert_eq!(s.phase(), Some(PipelinePhase::Resolving));

        let ticks = s.run_until_idle(DT, 100);
        assert!(ticks > 0);
        assert!(!s.is_loading());
        assert_eq!(s.phase(), None);
        assert_eq!(s.current_location(), Some(&id("camp")));
        assert_eq!(s.stats().loads_started, 1);
        assert_eq!(s.stats().loads_completed, 1);
    }

    #[test]
    fn settle_delay_holds_each_phase() {
        let config = StreamingConfig {
            settle_delay_secs: 0.25,
            ..StreamingConfig::default()
        };
        let mut s = scheduler(config, &["camp"]);
        s.enqueue_load(LoadRequest::new(id("camp")));
        s.tick(DT);
        for _ in 0..4 {
            s.tick(DT);
            assert_eq!(s.phase(), Some(PipelinePhase::Resolving));
        }
        s.tick(DT);
        assert_eq!(s.phase(), Some(PipelinePhase::Transitioning));
    }

    #[test]
    fn unloads_wait_for_loads() {
        let mut s = scheduler(StreamingConfig::default(), &["a", "b"]);
        s.set_initial_location(id("a")).unwrap();
        s.enqueue_load(LoadRequest::new(id("b")));
        s.enqueue_unload(id("a"), Duration::ZERO);
        s.tick(DT);
        // The load started first; the unload is still queued.
        assert!(s.is_loading());
        assert_eq!(s.pending_unloads(), 1);
        assert!(s.registry().contains(&id("a")));
    }

    #[test]
    fn huge_unload_delay_never_fires() {
        let mut s = scheduler(StreamingConfig::default(), &["a", "b"]);
        s.set_initial_location(id("b")).unwrap();
        s.add_to_scene(LocationRecord::new(id("c")));
        s.tick(DT);
        s.enqueue_unload(id("a"), Duration::MAX);
        s.enqueue_unload(id("c"), Duration::MAX);
        for _ in 0..100 {
            s.tick(DT);
        }
        assert_eq!(s.pending_unloads(), 2);
        assert!(!s.is_idle());
        assert_eq!(s.stats().unloads, 0);
    }

    #[test]
    fn unload_of_current_location_is_skipped() {
        let mut s = scheduler(StreamingConfig::default(), &["a"]);
        s.set_initial_location(id("a")).unwrap();
        s.enqueue_unload(id("a"), Duration::ZERO);
        s.tick(DT);
        assert!(s.registry().is_loaded(&id("a")));
        assert!(s.is_idle());
    }

    #[test]
    fn unloaded_location_returns_to_scene() {
        let mut s = scheduler(StreamingConfig::default(), &["a", "b"]);
        s.set_initial_location(id("a")).unwrap();
        s.enqueue_load(LoadRequest::new(id("b")));
        s.run_until_idle(DT, 1000);
        assert!(!s.registry().contains(&id("a")));
        assert!(s.in_scene(&id("a")));
        assert_eq!(s.stats().unloads, 1);

        s.enqueue_load(LoadRequest::new(id("a")));
        s.run_until_idle(DT, 1000);
        assert_eq!(s.current_location(), Some(&id("a")));
    }

    #[test]
    fn transition_request_events_are_queued() {
        let mut s = scheduler(StreamingConfig::default(), &["a"]);
        s.bus().publish(TransitionRequested {
            from: None,
            to: id("a"),
            spawn_point: None,
            method: LoadingMethod::Immediate,
            exit: None,
            agent: None,
        });
        assert_eq!(s.pending_loads(), 1);
        s.run_until_idle(DT, 100);
        assert_eq!(s.current_location(), Some(&id("a")));
    }

    #[test]
    fn game_state_is_tracked() {
        let s = scheduler(StreamingConfig::default(), &[]);
        s.bus().publish(GameStateChanged {
            previous: GameState::Loading,
            current: GameState::Playing,
        });
        assert_eq!(s.game_state(), GameState::Playing);
    }

    #[test]
    fn drop_unsubscribes() {
        let bus = Rc::new(EventBus::new());
        let s = StreamingScheduler::new(StreamingConfig::default(), Rc::clone(&bus)).unwrap();
        assert_eq!(bus.handler_count::<TransitionRequested>(), 1);
        drop(s);
        assert_eq!(bus.handler_count::<TransitionRequested>(), 0);
        assert_eq!(bus.handler_count::<GameStateChanged>(), 0);
    }

    #[test]
    fn npc_pass_through_needs_registration() {
        let mut s = scheduler(StreamingConfig::default(), &["a"]);
        let npc = EntityId::new();
        assert!(!s.add_npc(&id("a"), npc));
        s.set_initial_location(id("a")).unwrap();
        assert!(s.add_npc(&id("a"), npc));
        assert!(s.remove_npc(&id("a"), npc));
        assert!(!s.remove_npc(&id("a"), npc));
    }

    #[test]
    fn events_published_in_order() {
        let mut s = scheduler(StreamingConfig::default(), &["a", "b"]);
        s.set_initial_location(id("a")).unwrap();
        let log = Rc::new(RefCell::new(Vec::new()));
        let bus = Rc::clone(s.bus());
        let sink = Rc::clone(&log);
        bus.subscribe(move |e: &LoadingStarted| {
            sink.borrow_mut().push(format!("started:{}", e.location));
            Ok(())
        });
        let sink = Rc::clone(&log);
        bus.subscribe(move |e: &LoadingProgress| {
            sink.borrow_mut().push(format!("progress:{}", e.fraction));
            Ok(())
        });
        let sink = Rc::clone(&log);
        bus.subscribe(move |e: &LocationLoaded| {
            sink.borrow_mut().push(format!("loaded:{}", e.location.id));
            Ok(())
        });
        let sink = Rc::clone(&log);
        bus.subscribe(move |e: &LocationChanged| {
            sink.borrow_mut().push(format!("changed:{}", e.current));
            Ok(())
        });
        let sink = Rc::clone(&log);
        bus.subscribe(move |e: &LoadingCompleted| {
            sink.borrow_mut().push(format!("completed:{}:{:?}", e.location, e.outcome));
            Ok(())
        });
        let sink = Rc::clone(&log);
        bus.subscribe(move |e: &LocationUnloaded| {
            sink.borrow_mut().push(format!("unloaded:{}", e.location.id));
            Ok(())
        });

        s.enqueue_load(LoadRequest::new(id("b")));
        s.run_until_idle(DT, 1000);
        assert_eq!(
            *log.borrow(),
            vec![
                "started:b",
                "progress:0.3",
                "progress:0.7",
                "loaded:b",
                "changed:b",
                "progress:1",
                "completed:b:Transitioned",
                "unloaded:a",
            ]
        );
    }
}
