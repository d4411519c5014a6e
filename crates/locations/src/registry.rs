use std::collections::HashMap;
use std::rc::Rc;

use wayfarer_common::{AgentId, LocationId};
use wayfarer_events::EventBus;

use crate::events::{
    LocationLoaded, LocationUnloaded, PlayerEnteredLocation, PlayerExitedLocation, UnloadReason,
};
use crate::record::LocationRecord;

/// Owns the records of every registered location.
///
/// Iteration follows registration order, so "first scanned" means "registered
/// earliest". Lookups miss with `None`, never with an error. The bus is used
/// only to announce state changes.
pub struct LocationRegistry {
    bus: Rc<EventBus>,
    records: HashMap<LocationId, LocationRecord>,
    order: Vec<LocationId>,
}

impl LocationRegistry {
    pub fn new(bus: Rc<EventBus>) -> Self {
        Self {
            bus,
            records: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Add a record. Returns false (dropping `record`) if the id is taken.
    pub fn register(&mut self, record: LocationRecord) -> bool {
        if self.records.contains_key(record.id()) {
            tracing::trace!(location = %record.id(), "already registered");
            return false;
        }
        tracing::debug!(location = %record.id(), "registered");
        self.order.push(record.id().clone());
        self.records.insert(record.id().clone(), record);
        true
    }

    /// Remove and return a record.
    pub fn unregister(&mut self, id: &LocationId) -> Option<LocationRecord> {
        let record = self.records.remove(id)?;
        self.order.retain(|o| o != id);
        tracing::debug!(location = %id, "unregistered");
        Some(record)
    }

    pub fn get(&self, id: &LocationId) -> Option<&LocationRecord> {
        self.records.get(id)
    }

    pub fn get_mut(&mut self, id: &LocationId) -> Option<&mut LocationRecord> {
        self.records.get_mut(id)
    }

    pub fn contains(&self, id: &LocationId) -> bool {
        self.records.contains_key(id)
    }

    /// True only if registered and flagged loaded.
    pub fn is_loaded(&self, id: &LocationId) -> bool {
        self.records.get(id).is_some_and(LocationRecord::is_loaded)
    }

    /// Number of registered records, persistent ones included.
    pub fn count(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &LocationRecord> {
        self.order.iter().filter_map(|id| self.records.get(id))
    }

    /// Load a registered location, announcing it if it was not loaded yet.
    pub fn load(&mut self, id: &LocationId) -> bool {
        let Some(record) = self.records.get_mut(id) else {
            return false;
        };
        if !record.load() {
            return false;
        }
        tracing::info!(location = %id, behavior = record.behavior().label(), "location loaded");
        self.bus.publish(LocationLoaded {
            location: record.info(),
        });
        true
    }

    /// Unload a location and take it out of the registry.
    ///
    /// Persistent locations stay put and yield `None`. A registered record that
    /// was never loaded is still removed, just without an announcement.
    pub fn unload(&mut self, id: &LocationId, reason: UnloadReason) -> Option<LocationRecord> {
        let record = self.records.get_mut(id)?;
        if record.is_persistent() {
            tracing::debug!(location = %id, "persistent location kept");
            return None;
        }
        if record.unload() {
            tracing::info!(location = %id, ?reason, "location unloaded");
            self.bus.publish(LocationUnloaded {
                location: record.info(),
                reason,
            });
        }
        self.unregister(id)
    }

    /// Note that `agent` entered. Publishes on change.
    pub fn enter(&mut self, id: &LocationId, agent: AgentId) -> bool {
        let Some(record) = self.records.get_mut(id) else {
            return false;
        };
        if !record.enter(agent) {
            return false;
        }
        self.bus.publish(PlayerEnteredLocation {
            location: record.info(),
            agent,
        });
        true
    }

    /// Note that `agent` left. Publishes on change.
    pub fn exit(&mut self, id: &LocationId, agent: AgentId) -> bool {
        let Some(record) = self.records.get_mut(id) else {
            return false;
        };
        if !record.exit(agent) {
            return false;
        }
        self.bus.publish(PlayerExitedLocation {
            location: record.info(),
            agent,
        });
        true
    }

    /// Stamp a record with a use sequence number (for recency-based eviction).
    pub fn touch(&mut self, id: &LocationId, sequence: u64) {
        if let Some(record) = self.records.get_mut(id) {
            record.touch(sequence);
        }
    }
}

impl std::fmt::Debug for LocationRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocationRegistry")
            .field("order", &self.order)
            .finish()
    }
}
