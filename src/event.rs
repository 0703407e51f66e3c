//! Queued publish/subscribe event bus.
//!
//! Events are queued on `publish` and only delivered when the owner
//! calls [`EventBus::process`], so handlers always run at a known point
//! in the engine loop. Each bus owns its own name registry; kinds from
//! one bus are re-interned when events are channeled into another.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

/// Interned identifier for a named event within one bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventKind(u32);

/// A published event instance.
#[derive(Debug, Clone)]
pub struct Event {
    kind: EventKind,
    name: Arc<str>,
}

impl Event {
    pub fn kind(&self) -> EventKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

type Handler = Box<dyn Fn(&Event) + Send + Sync>;

#[derive(Default)]
struct Registry {
    kinds: HashMap<Arc<str>, EventKind>,
    next_id: u32,
}

impl Registry {
    fn intern(&mut self, name: &str) -> (EventKind, Arc<str>) {
        if let Some((interned, &kind)) = self.kinds.get_key_value(name) {
            return (kind, Arc::clone(interned));
        }
        let interned: Arc<str> = Arc::from(name);
        let kind = EventKind(self.next_id);
        self.next_id += 1;
        self.kinds.insert(Arc::clone(&interned), kind);
        (kind, interned)
    }
}

/// Centralized bus for queued events and their subscribers.
///
/// All methods take `&self`; handlers may publish further events while
/// the bus is dispatching, and those are processed within the same
/// `process` call.
#[derive(Default)]
pub struct EventBus {
    registry: RwLock<Registry>,
    queue: Mutex<VecDeque<Event>>,
    handlers: RwLock<HashMap<EventKind, Vec<Handler>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares an event name, returning its kind. Consumers should
    /// call this while loading to avoid repeated lookups later.
    pub fn kind(&self, name: &str) -> EventKind {
        self.registry.write().intern(name).0
    }

    /// Builds an event value for the given name without queueing it.
    pub fn event(&self, name: &str) -> Event {
        let (kind, name) = self.registry.write().intern(name);
        Event { kind, name }
    }

    /// Queues an event by name.
    pub fn publish(&self, name: &str) {
        let event = self.event(name);
        self.publish_event(event);
    }

    /// Queues an already-built event.
    pub fn publish_event(&self, event: Event) {
        self.queue.lock().push_back(event);
    }

    /// Subscribes a handler to every future publication of the named
    /// event. Multiple handlers per event are invoked in subscription
    /// order.
    pub fn subscribe(&self, name: &str, handler: impl Fn(&Event) + Send + Sync + 'static) {
        let kind = self.kind(name);
        self.handlers
            .write()
            .entry(kind)
            .or_default()
            .push(Box::new(handler));
    }

    /// Delivers all queued events in publication order.
    pub fn process(&self) {
        loop {
            let event = match self.queue.lock().pop_front() {
                Some(event) => event,
                None => return,
            };
            let handlers = self.handlers.read();
            if let Some(subscribed) = handlers.get(&event.kind) {
                for handler in subscribed {
                    handler(&event);
                }
            }
        }
    }

    /// Moves all queued events onto another bus, re-interning their
    /// names in the target's registry.
    pub fn channel(&self, target: &EventBus) {
        let drained: Vec<Event> = self.queue.lock().drain(..).collect();
        for event in drained {
            target.publish(event.name());
        }
    }

    /// Number of queued, not yet processed events.
    pub fn pending(&self) -> usize {
        self.queue.lock().len()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("pending", &self.pending())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn events_are_delivered_in_publication_order() {
        let bus = EventBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        for name in ["demo::first", "demo::second"] {
            let seen = Arc::clone(&seen);
            bus.subscribe(name, move |event| {
                seen.lock().push(event.name().to_string());
            });
        }

        bus.publish("demo::first");
        bus.publish("demo::second");
        bus.publish("demo::first");
        assert_eq!(bus.pending(), 3);

        bus.process();
        assert_eq!(bus.pending(), 0);
        assert_eq!(
            *seen.lock(),
            vec!["demo::first", "demo::second", "demo::first"]
        );
    }

    #[test]
    fn unsubscribed_events_are_dropped_silently() {
        let bus = EventBus::new();
        bus.publish("demo::ignored");
        bus.process();
        assert_eq!(bus.pending(), 0);
    }

    #[test]
    fn every_handler_for_a_kind_runs() {
        let bus = EventBus::new();
        let count = Arc::new(AtomicU32::new(0));
        for _ in 0..3 {
            let count = Arc::clone(&count);
            bus.subscribe("demo::tick", move |_| {
                count.fetch_add(1, Ordering::Relaxed);
            });
        }
        bus.publish("demo::tick");
        bus.process();
        assert_eq!(count.load(Ordering::Relaxed), 3);
    }

    #[test]
    fn handlers_can_publish_followup_events() {
        let bus = Arc::new(EventBus::new());
        let count = Arc::new(AtomicU32::new(0));

        let chain = Arc::clone(&bus);
        bus.subscribe("demo::spark", move |_| {
            chain.publish("demo::flame");
        });
        let counter = Arc::clone(&count);
        bus.subscribe("demo::flame", move |_| {
            counter.fetch_add(1, Ordering::Relaxed);
        });

        bus.publish("demo::spark");
        bus.process();
        assert_eq!(count.load(Ordering::Relaxed), 1, "followup handled in the same call");
    }

    #[test]
    fn channel_moves_events_between_buses() {
        let root = EventBus::new();
        let state = EventBus::new();
        let count = Arc::new(AtomicU32::new(0));

        let counter = Arc::clone(&count);
        state.subscribe("demo::input", move |_| {
            counter.fetch_add(1, Ordering::Relaxed);
        });

        root.publish("demo::input");
        root.channel(&state);
        assert_eq!(root.pending(), 0);
        assert_eq!(state.pending(), 1);

        state.process();
        assert_eq!(count.load(Ordering::Relaxed), 1);
    }
}
