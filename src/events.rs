//! Typed viewer events and their subscribers.

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

/// Topics a listener can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum EventKind {
    ViewChanged,
    FeatureAdded,
    DrawEnd,
    FeatureEnter,
    FeatureLeave,
    FeatureClick,
}

impl EventKind {
    pub const ALL: [EventKind; 6] = [
        EventKind::ViewChanged,
        EventKind::FeatureAdded,
        EventKind::DrawEnd,
        EventKind::FeatureEnter,
        EventKind::FeatureLeave,
        EventKind::FeatureClick,
    ];

    /// The public event name, e.g. `change:view`.
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::ViewChanged => "change:view",
            EventKind::FeatureAdded => "viewer:addedFeature",
            EventKind::DrawEnd => "draw:end",
            EventKind::FeatureEnter => "feature:enter",
            EventKind::FeatureLeave => "feature:leave",
            EventKind::FeatureClick => "feature:click",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An event with its payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum ViewerEvent {
    ViewChanged,
    FeatureAdded { id: String, layer: String },
    DrawEnd,
    FeatureEnter { id: String },
    FeatureLeave { id: String },
    FeatureClick { id: String },
}

impl ViewerEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            ViewerEvent::ViewChanged => EventKind::ViewChanged,
            ViewerEvent::FeatureAdded { .. } => EventKind::FeatureAdded,
            ViewerEvent::DrawEnd => EventKind::DrawEnd,
            ViewerEvent::FeatureEnter { .. } => EventKind::FeatureEnter,
            ViewerEvent::FeatureLeave { .. } => EventKind::FeatureLeave,
            ViewerEvent::FeatureClick { .. } => EventKind::FeatureClick,
        }
    }

    /// The feature the event refers to, if any.
    pub fn feature_id(&self) -> Option<&str> {
        match self {
            ViewerEvent::FeatureAdded { id, .. }
            | ViewerEvent::FeatureEnter { id }
            | ViewerEvent::FeatureLeave { id }
            | ViewerEvent::FeatureClick { id } => Some(id),
            ViewerEvent::ViewChanged | ViewerEvent::DrawEnd => None,
        }
    }
}

/// Handle returned by [`EventBus::on`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Box<dyn FnMut(&ViewerEvent)>;

/// Topic to subscriber fan-out.
#[derive(Default)]
pub struct EventBus {
    next_id: u64,
    listeners: HashMap<EventKind, Vec<(SubscriptionId, Listener)>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on<F>(&mut self, kind: EventKind, listener: F) -> SubscriptionId
    where
        F: FnMut(&ViewerEvent) + 'static,
    {
        self.next_id += 1;
        let id = SubscriptionId(self.next_id);
        self.listeners
            .entry(kind)
            .or_default()
            .push((id, Box::new(listener)));
        id
    }

    /// Remove a listener. Returns false when it was not subscribed.
    pub fn off(&mut self, id: SubscriptionId) -> bool {
        for listeners in self.listeners.values_mut() {
            if let Some(pos) = listeners.iter().position(|(sid, _)| *sid == id) {
                listeners.remove(pos);
                return true;
            }
        }
        false
    }

    pub fn emit(&mut self, event: &ViewerEvent) {
        let kind = event.kind();
        log::trace!("Event {}", kind);
        if let Some(listeners) = self.listeners.get_mut(&kind) {
            for (_, listener) in listeners.iter_mut() {
                listener(event);
            }
        }
    }

    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.listeners.get(&kind).map_or(0, Vec::len)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listeners.values().map(Vec::len).sum::<usize>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_event_names_roundtrip() {
        for kind in EventKind::ALL {
            assert_eq!(EventKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(EventKind::from_name("draw:start"), None);
    }

    #[test]
    fn test_emit_reaches_only_topic_listeners() {
        let mut bus = EventBus::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        bus.on(EventKind::DrawEnd, move |e| sink.borrow_mut().push(e.clone()));

        bus.emit(&ViewerEvent::ViewChanged);
        bus.emit(&ViewerEvent::DrawEnd);
        assert_eq!(*seen.borrow(), vec![ViewerEvent::DrawEnd]);
    }

    #[test]
    fn test_off_unsubscribes() {
        let mut bus = EventBus::new();
        let count = Rc::new(RefCell::new(0));
        let c = Rc::clone(&count);
        let id = bus.on(EventKind::ViewChanged, move |_| *c.borrow_mut() += 1);

        bus.emit(&ViewerEvent::ViewChanged);
        assert!(bus.off(id));
        assert!(!bus.off(id));
        bus.emit(&ViewerEvent::ViewChanged);
        assert_eq!(*count.borrow(), 1);
        assert_eq!(bus.listener_count(EventKind::ViewChanged), 0);
    }

    #[test]
    fn test_feature_payload() {
        let e = ViewerEvent::FeatureClick { id: "z1".to_string() };
        assert_eq!(e.feature_id(), Some("z1"));
        assert_eq!(e.kind().name(), "feature:click");
        let json = serde_json::to_value(&e).unwrap();
        assert_eq!(json["event"], "featureClick");
    }
}
