//! Game session: the coarse play state every other system observes.
//!
//! # Invariants
//! - `GameStateChanged` is published only when the state actually changes.
//! - Pause is only reachable from `Playing`; resume only from `Paused`.

use std::rc::Rc;

use wayfarer_common::GameState;
use wayfarer_events::{Event, EventBus};

/// Published on every state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameStateChanged {
    pub previous: GameState,
    pub current: GameState,
}

impl Event for GameStateChanged {}

/// Owns the current [`GameState`] and announces transitions.
#[derive(Debug)]
pub struct GameSession {
    bus: Rc<EventBus>,
    state: GameState,
}

impl GameSession {
    /// Start in `initial` without publishing.
    pub fn new(bus: Rc<EventBus>, initial: GameState) -> Self {
        Self {
            bus,
            state: initial,
        }
    }

    pub fn state(&self) -> GameState {
        self.state
    }

    /// Simulation speed multiplier for the current state.
    pub fn time_scale(&self) -> f32 {
        match self.state {
            GameState::Paused | GameState::GameOver => 0.0,
            _ => 1.0,
        }
    }

    /// Move to `next`. Returns false if already there.
    pub fn change_state(&mut self, next: GameState) -> bool {
        if self.state == next {
            return false;
        }
        let previous = std::mem::replace(&mut self.state, next);
        tracing::info!(?previous, current = ?next, "game state changed");
        self.bus.publish(GameStateChanged {
            previous,
            current: next,
        });
        true
    }

    pub fn start_game(&mut self) -> bool {
        self.change_state(GameState::Loading)
    }

    pub fn pause(&mut self) -> bool {
        self.state == GameState::Playing && self.change_state(GameState::Paused)
    }

    pub fn resume(&mut self) -> bool {
        self.state == GameState::Paused && self.change_state(GameState::Playing)
    }

    pub fn end_game(&mut self) -> bool {
        self.change_state(GameState::GameOver)
    }

    pub fn return_to_menu(&mut self) -> bool {
        self.change_state(GameState::MainMenu)
    }
}

pub fn crate_info() -> &'static str {
    "wayfarer-session v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    fn session() -> (GameSession, Rc<RefCell<Vec<GameStateChanged>>>) {
        let bus = Rc::new(EventBus::new());
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        bus.subscribe(move |e: &GameStateChanged| {
            sink.borrow_mut().push(*e);
            Ok(())
        });
        (GameSession::new(bus, GameState::MainMenu), seen)
    }

    #[test]
    fn unchanged_state_is_silent() {
        let (mut s, seen) = session();
        assert!(!s.change_state(GameState::MainMenu));
        assert!(seen.borrow().is_empty());
    }

    #[test]
    fn transitions_publish_previous_and_current() {
        let (mut s, seen) = session();
        assert!(s.start_game());
        assert!(s.change_state(GameState::Playing));
        assert_eq!(
            *seen.borrow(),
            vec![
                GameStateChanged {
                    previous: GameState::MainMenu,
                    current: GameState::Loading
                },
                GameStateChanged {
                    previous: GameState::Loading,
                    current: GameState::Playing
                },
            ]
        );
    }

    #[test]
    fn pause_and_resume_are_guarded() {
        let (mut s, _) = session();
        assert!(!s.pause());
        assert!(!s.resume());
        s.change_state(GameState::Playing);
        assert!(s.pause());
        assert_eq!(s.time_scale(), 0.0);
        assert!(!s.pause());
        assert!(s.resume());
        assert_eq!(s.state(), GameState::Playing);
        assert_eq!(s.time_scale(), 1.0);
    }

    #[test]
    fn end_and_menu() {
        let (mut s, seen) = session();
        s.change_state(GameState::Playing);
        assert!(s.end_game());
        assert_eq!(s.time_scale(), 0.0);
        assert!(s.return_to_menu());
        assert_eq!(s.state(), GameState::MainMenu);
        assert_eq!(seen.borrow().len(), 3);
    }

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("session"));
    }
}
