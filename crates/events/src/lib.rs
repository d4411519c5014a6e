//! Event bus: typed publish/subscribe used for all cross-component notification.
//!
//! # Invariants
//! - One handler list per event type, in subscription order.
//! - `publish` never fails and never lets a handler fault escape.
//! - Delivery is synchronous: every handler has run when `publish` returns.

mod bus;

pub use bus::{EventBus, Event, HandlerError, HandlerResult, Subscription, SubscriptionId};

pub fn crate_info() -> &'static str {
    "wayfarer-events v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("events"));
    }
}
