//! Streaming: serialized location loads, a capacity-bounded active set and
//! delayed retirement of locations the agent has left.
//!
//! # Invariants
//! - At most one load pipeline is in flight; loads start in FIFO order.
//! - The current location is never evicted or unloaded.
//! - Persistent locations never leave the registry.
//! - Unloads are processed only while no load is in flight or queued.
//! - The scheduler never reads a wall clock; time only moves through `tick`.
//!
//! # Workaround
//! The fallback asset load is modelled as a polled [`LocationLoader`]
//! (`wayfarer_locations`) rather than a real async runtime. A loader that
//! never answers stalls the pipeline; there is no watchdog.
//!
//! [`LocationLoader`]: wayfarer_locations::LocationLoader

mod config;
mod pipeline;
mod scheduler;

pub use config::{ConfigError, EvictionPolicy, StreamingConfig};
pub use pipeline::{LoadRequest, PipelinePhase, UnloadRequest};
pub use scheduler::{Agent, StreamError, StreamStats, StreamingScheduler};

pub fn crate_info() -> &'static str {
    "wayfarer-stream v0.1.0"
}
