//! Scripted routes through a world, driven tick by tick.

use std::cell::{Cell, RefCell};
use std::path::Path;
use std::rc::Rc;
use std::time::Duration;

use anyhow::{Context, bail};
use glam::Vec3;
use serde::{Deserialize, Serialize};
use wayfarer_common::{AgentId, GameState, LoadingMethod, LocationId};
use wayfarer_events::{Event, EventBus};
use wayfarer_locations::events::{
    LoadingCompleted, LoadingStarted, LocationChanged, LocationLoaded, LocationUnloaded,
};
use wayfarer_locations::{ManifestLoader, WorldManifest};
use wayfarer_session::GameSession;
use wayfarer_stream::{LoadRequest, StreamStats, StreamingConfig, StreamingScheduler};

/// A world, streaming settings and the route the agent follows.
#[derive(Debug, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub streaming: StreamingConfig,
    pub world: WorldManifest,
    /// Pending polls before the asset fallback answers.
    #[serde(default)]
    pub asset_latency_polls: u32,
    #[serde(default, with = "serde_yaml::with::singleton_map_recursive")]
    pub route: Vec<RouteStep>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteStep {
    /// Request a load directly.
    Travel {
        to: LocationId,
        #[serde(default)]
        spawn_point: Option<String>,
        #[serde(default)]
        method: LoadingMethod,
    },
    /// Move the agent; exits in range may fire.
    Walk { to: Vec3 },
    /// Use interaction exits in range.
    Interact,
    /// Let time pass.
    Wait { secs: f32 },
    Pause,
    Resume,
}

#[derive(Debug, Serialize)]
pub struct Report {
    pub current: Option<String>,
    pub registered: Vec<String>,
    pub scene: usize,
    pub clock_secs: f32,
    pub stats: StreamStats,
    pub events: Vec<LogEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub at_secs: f32,
    pub event: String,
}

impl Scenario {
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read scenario {}", path.display()))?;
        Self::from_yaml_str(&text).with_context(|| format!("invalid scenario {}", path.display()))
    }

    pub fn from_yaml_str(text: &str) -> anyhow::Result<Self> {
        let scenario: Self = serde_yaml::from_str(text)?;
        scenario.streaming.validate()?;
        scenario.world.validate()?;
        for (index, step) in scenario.route.iter().enumerate() {
            if let RouteStep::Wait { secs } = step {
                anyhow::ensure!(
                    secs.is_finite() && *secs >= 0.0,
                    "route step {index} waits an invalid {secs}s"
                );
            }
        }
        Ok(scenario)
    }
}

/// Shared event log stamped with the simulation clock.
#[derive(Clone, Default)]
struct EventLog {
    clock: Rc<Cell<Duration>>,
    entries: Rc<RefCell<Vec<LogEntry>>>,
}

impl EventLog {
    fn record<E: Event>(&self, bus: &EventBus, describe: impl Fn(&E) -> String + 'static) {
        let log = self.clone();
        bus.subscribe(move |event: &E| {
            log.entries.borrow_mut().push(LogEntry {
                at_secs: log.clock.get().as_secs_f32(),
                event: describe(event),
            });
            Ok(())
        });
    }
}

/// Play `scenario` with a fixed tick of `dt`. Each step may take at most
/// `max_ticks` ticks to settle.
pub fn run(scenario: Scenario, dt: Duration, max_ticks: usize) -> anyhow::Result<Report> {
    let bus = Rc::new(EventBus::new());
    let log = EventLog::default();
    log.record(&bus, |e: &LoadingStarted| format!("loading {} ({:?})", e.location, e.method));
    log.record(&bus, |e: &LoadingCompleted| {
        format!("completed {} ({:?})", e.location, e.outcome)
    });
    log.record(&bus, |e: &LocationChanged| match &e.previous {
        Some(previous) => format!("moved {previous} -> {}", e.current),
        None => format!("arrived at {}", e.current),
    });
    log.record(&bus, |e: &LocationLoaded| format!("loaded {}", e.location.id));
    log.record(&bus, |e: &LocationUnloaded| {
        format!("unloaded {} ({:?})", e.location.id, e.reason)
    });

    let mut session = GameSession::new(Rc::clone(&bus), GameState::MainMenu);
    session.start_game();

    let loader = ManifestLoader::new(scenario.world.fallback_defs(), scenario.asset_latency_polls);
    let mut scheduler =
        StreamingScheduler::new(scenario.streaming.clone(), Rc::clone(&bus))?.with_loader(loader);
    for record in scenario.world.scene_records() {
        scheduler.add_to_scene(record);
    }
    scheduler.attach_agent(AgentId::new(), Vec3::ZERO);
    scheduler
        .set_initial_location(scenario.world.start.clone())
        .context("start location must be in the scene")?;
    session.change_state(GameState::Playing);

    let settle = |scheduler: &mut StreamingScheduler, step: usize| -> anyhow::Result<()> {
        let mut ticks = 0;
        while scheduler.is_loading() || scheduler.pending_loads() > 0 {
            if ticks == max_ticks {
                bail!("route step {step} did not settle within {max_ticks} ticks");
            }
            scheduler.tick(dt);
            log.clock.set(scheduler.clock());
            ticks += 1;
        }
        Ok(())
    };

    for (index, step) in scenario.route.iter().enumerate() {
        tracing::debug!(step = index, ?step, "route step");
        match step {
            RouteStep::Travel {
                to,
                spawn_point,
                method,
            } => {
                let mut request = LoadRequest::new(to.clone()).with_method(*method);
                if let Some(spawn) = spawn_point {
                    request = request.with_spawn_point(spawn.clone());
                }
                scheduler.enqueue_load(request);
            }
            RouteStep::Walk { to } => {
                scheduler.move_agent(*to);
            }
            RouteStep::Interact => {
                scheduler.interact();
            }
            RouteStep::Wait { secs } => {
                let ticks = (f64::from(secs.max(0.0)) / dt.as_secs_f64()).ceil();
                if !ticks.is_finite() || ticks > max_ticks as f64 {
                    bail!("route step {index} waits {secs}s, more than {max_ticks} ticks");
                }
                for _ in 0..ticks as usize {
                    scheduler.tick(dt);
                    log.clock.set(scheduler.clock());
                }
            }
            RouteStep::Pause => {
                session.pause();
            }
            RouteStep::Resume => {
                session.resume();
            }
        }
        settle(&mut scheduler, index)?;
    }

    let ticks = scheduler.run_until_idle(dt, max_ticks);
    log.clock.set(scheduler.clock());
    if !scheduler.is_idle() {
        tracing::warn!(ticks, "streaming still busy at end of route");
    }

    let events = log.entries.borrow().clone();
    Ok(Report {
        current: scheduler.current_location().map(ToString::to_string),
        registered: scheduler
            .registry()
            .iter()
            .map(|record| record.id().to_string())
            .collect(),
        scene: scheduler.scene_len(),
        clock_secs: scheduler.clock().as_secs_f32(),
        stats: scheduler.stats().clone(),
        events,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SCENARIO: &str = r#"
streaming:
  max_loaded_locations: 2
asset_latency_polls: 2
world:
  start: camp
  locations:
    - id: camp
      exits:
        - id: camp_road
          target: market
          spawn_point: south_gate
          position: [10.0, 0.0, 0.0]
    - id: market
      kind: building
      spawn_points:
        south_gate: [0.0, 0.0, -20.0]
    - id: vault
      in_scene: false
route:
  - walk:
      to: [9.5, 0.0, 0.0]
  - wait:
      secs: 6
  - travel:
      to: vault
  - interact
"#;

    #[test]
    fn parses_route_steps() {
        let scenario = Scenario::from_yaml_str(SCENARIO).unwrap();
        assert_eq!(scenario.streaming.max_loaded_locations, 2);
        assert_eq!(scenario.streaming.unload_delay_secs, 5.0);
        assert_eq!(scenario.route.len(), 4);
        assert!(matches!(scenario.route[0], RouteStep::Walk { .. }));
        assert!(matches!(scenario.route[3], RouteStep::Interact));
    }

    #[test]
    fn runs_route_to_completion() {
        let scenario = Scenario::from_yaml_str(SCENARIO).unwrap();
        let report = run(scenario, Duration::from_millis(50), 10_000).unwrap();
        assert_eq!(report.current.as_deref(), Some("vault"));
        assert_eq!(report.registered, vec!["vault"]);
        assert_eq!(report.stats.loads_completed, 2);
        assert!(report.events.iter().any(|e| e.event == "moved camp -> market"));
        assert!(report.events.iter().any(|e| e.event.starts_with("unloaded camp")));
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"loads_completed\":2"));
    }

    #[test]
    fn rejects_invalid_streaming_config() {
        let text = SCENARIO.replace("max_loaded_locations: 2", "max_loaded_locations: 0");
        assert!(Scenario::from_yaml_str(&text).is_err());
    }

    #[test]
    fn rejects_negative_wait() {
        let text = SCENARIO.replace("secs: 6", "secs: -1");
        let err = Scenario::from_yaml_str(&text).unwrap_err();
        assert!(err.to_string().contains("route step 1"));
    }

    #[test]
    fn wait_longer_than_tick_limit_fails_fast() {
        let text = SCENARIO.replace("secs: 6", "secs: 1.0e30");
        let scenario = Scenario::from_yaml_str(&text).unwrap();
        let err = run(scenario, Duration::from_millis(50), 100).unwrap_err();
        assert!(err.to_string().contains("more than 100 ticks"));
    }

    #[test]
    fn load_reports_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"world: [").unwrap();
        let err = Scenario::load(file.path()).unwrap_err();
        assert!(format!("{err:#}").contains("invalid scenario"));
    }
}
