use std::any::{Any, TypeId, type_name};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

/// Error a handler may return. The bus logs it and keeps delivering.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Return type of every event handler.
pub type HandlerResult = Result<(), HandlerError>;

/// Marker for message types that travel over the [`EventBus`].
///
/// Each implementing type gets its own handler list; there is no
/// subtyping between events.
pub trait Event: Any + fmt::Debug {}

/// Opaque per-bus handler number, unique for the bus lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

/// Receipt returned by [`EventBus::subscribe`]; pass it back to unsubscribe.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Subscription {
    event: TypeId,
    event_name: &'static str,
    id: SubscriptionId,
}

impl Subscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Type name of the event this subscription listens to.
    pub fn event_name(&self) -> &'static str {
        self.event_name
    }
}

type ErasedHandler = Rc<dyn Fn(&dyn Any) -> HandlerResult>;

struct Slot {
    id: SubscriptionId,
    handler: ErasedHandler,
}

/// Single-threaded typed publish/subscribe registry.
///
/// Handlers are kept per event type in subscription order. [`publish`]
/// runs them synchronously on the caller's stack. A handler that returns an
/// error or panics is logged and skipped; the remaining handlers still run
/// and nothing propagates to the publisher.
///
/// Handlers may subscribe, unsubscribe and publish re-entrantly. Delivery
/// works on a snapshot of the handler list taken when `publish` starts:
/// handlers added during delivery see the next event, handlers removed during
/// delivery are not called again, not even for the event in flight.
///
/// [`publish`]: EventBus::publish
#[derive(Default)]
pub struct EventBus {
    table: RefCell<HashMap<TypeId, Vec<Slot>>>,
    next_id: Cell<u64>,
    faults: Cell<u64>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for events of type `E`. Always succeeds.
    pub fn subscribe<E, F>(&self, handler: F) -> Subscription
    where
        E: Event,
        F: Fn(&E) -> HandlerResult + 'static,
    {
        let id = SubscriptionId(self.next_id.get());
        self.next_id.set(id.0 + 1);

        let erased: ErasedHandler = Rc::new(move |event: &dyn Any| match event.downcast_ref::<E>() {
            Some(event) => handler(event),
            None => Ok(()),
        });

        self.table
            .borrow_mut()
            .entry(TypeId::of::<E>())
            .or_default()
            .push(Slot {
                id,
                handler: erased,
            });

        tracing::trace!(event = type_name::<E>(), subscription = id.0, "subscribed");

        Subscription {
            event: TypeId::of::<E>(),
            event_name: type_name::<E>(),
            id,
        }
    }

    /// Remove a handler. Returns false (and does nothing) if it was already gone.
    ///
    /// The type's entry is dropped once its last handler leaves.
    pub fn unsubscribe(&self, subscription: &Subscription) -> bool {
        let mut table = self.table.borrow_mut();
        let Some(slots) = table.get_mut(&subscription.event) else {
            return false;
        };
        let before = slots.len();
        slots.retain(|slot| slot.id != subscription.id);
        let removed = slots.len() != before;
        if slots.is_empty() {
            table.remove(&subscription.event);
        }
        if removed {
            tracing::trace!(
                event = subscription.event_name,
                subscription = subscription.id.0,
                "unsubscribed"
            );
        }
        removed
    }

    /// Deliver `event` to every handler currently registered for `E`.
    pub fn publish<E: Event>(&self, event: E) {
        let key = TypeId::of::<E>();
        let snapshot: Vec<(SubscriptionId, ErasedHandler)> = {
            let table = self.table.borrow();
            match table.get(&key) {
                Some(slots) => slots
                    .iter()
                    .map(|slot| (slot.id, Rc::clone(&slot.handler)))
                    .collect(),
                None => return,
            }
        };

        let payload: &dyn Any = &event;
        for (id, handler) in snapshot {
            if !self.is_live(key, id) {
                continue;
            }
            match panic::catch_unwind(AssertUnwindSafe(|| handler(payload))) {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    self.faults.set(self.faults.get() + 1);
                    tracing::error!(
                        event = type_name::<E>(),
                        subscription = id.0,
                        error = %err,
                        "event handler failed"
                    );
                }
                Err(panic_payload) => {
                    self.faults.set(self.faults.get() + 1);
                    tracing::error!(
                        event = type_name::<E>(),
                        subscription = id.0,
                        panic = panic_message(panic_payload.as_ref()),
                        "event handler panicked"
                    );
                }
            }
        }
    }

    /// Number of handlers registered for `E`.
    pub fn handler_count<E: Event>(&self) -> usize {
        self.table
            .borrow()
            .get(&TypeId::of::<E>())
            .map_or(0, Vec::len)
    }

    /// Number of event types with at least one handler.
    pub fn event_type_count(&self) -> usize {
        self.table.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.borrow().is_empty()
    }

    /// Handler errors and panics contained since the bus was created.
    pub fn fault_count(&self) -> u64 {
        self.faults.get()
    }

    /// Drop every subscription. Used at teardown.
    pub fn clear(&self) {
        self.table.borrow_mut().clear();
    }

    fn is_live(&self, key: TypeId, id: SubscriptionId) -> bool {
        self.table
            .borrow()
            .get(&key)
            .is_some_and(|slots| slots.iter().any(|slot| slot.id == id))
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let table = self.table.borrow();
        f.debug_struct("EventBus")
            .field("event_types", &table.len())
            .field("handlers", &table.values().map(Vec::len).sum::<usize>())
            .field("faults", &self.faults.get())
            .finish()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}
