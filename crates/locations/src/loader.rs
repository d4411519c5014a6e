use std::collections::{BTreeMap, HashMap};
use std::task::Poll;

use wayfarer_common::LocationId;

use crate::manifest::LocationDef;
use crate::record::LocationRecord;

/// Last-resort source of locations that are neither registered nor in the scene.
///
/// The streamer calls [`begin`](LocationLoader::begin) once and then polls once
/// per tick until the loader answers. A loader that never leaves `Pending`
/// stalls the streamer; there is no timeout.
pub trait LocationLoader {
    fn begin(&mut self, id: &LocationId);

    /// `Ready(None)` means the location does not exist.
    fn poll(&mut self, id: &LocationId) -> Poll<Option<LocationRecord>>;
}

/// Loader that knows nothing; every lookup fails at once.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoFallback;

impl LocationLoader for NoFallback {
    fn begin(&mut self, _id: &LocationId) {}

    fn poll(&mut self, _id: &LocationId) -> Poll<Option<LocationRecord>> {
        Poll::Ready(None)
    }
}

/// Instantiates records from manifest definitions after a fixed number of
/// pending polls, standing in for an asynchronous asset load.
#[derive(Debug, Default)]
pub struct ManifestLoader {
    defs: BTreeMap<LocationId, LocationDef>,
    latency_polls: u32,
    in_flight: HashMap<LocationId, u32>,
}

impl ManifestLoader {
    pub fn new<'a>(defs: impl IntoIterator<Item = &'a LocationDef>, latency_polls: u32) -> Self {
        Self {
            defs: defs
                .into_iter()
                .map(|def| (def.id.clone(), def.clone()))
                .collect(),
            latency_polls,
            in_flight: HashMap::new(),
        }
    }

    pub fn knows(&self, id: &LocationId) -> bool {
        self.defs.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }
}

impl LocationLoader for ManifestLoader {
    fn begin(&mut self, id: &LocationId) {
        if self.defs.contains_key(id) {
            tracing::debug!(location = %id, latency = self.latency_polls, "asset load started");
            self.in_flight.insert(id.clone(), self.latency_polls);
        } else {
            tracing::debug!(location = %id, "no asset for location");
        }
    }

    fn poll(&mut self, id: &LocationId) -> Poll<Option<LocationRecord>> {
        let Some(def) = self.defs.get(id) else {
            return Poll::Ready(None);
        };
        let remaining = self
            .in_flight
            .entry(id.clone())
            .or_insert(self.latency_polls);
        if *remaining > 0 {
            *remaining -= 1;
            return Poll::Pending;
        }
        self.in_flight.remove(id);
        tracing::debug!(location = %id, "asset load finished");
        Poll::Ready(Some(def.instantiate()))
    }
}
