//! Typed event bus for observers outside the engine (chart, button, status line).

use std::collections::HashSet;

use chrono::NaiveDate;

use crate::playback::PlaybackState;
use crate::HandleRole;

/// Notifications published by the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum RideMapEvent {
    /// The slider resolved a new date window
    SelectionChanged { start: NaiveDate, end: NaiveDate },
    /// The ActiveSet was applied to the map
    ActiveChanged(HashSet<String>),
    /// The HighlightSet was applied to the map
    HighlightChanged(HashSet<String>),
    /// Playback moved to a new state
    PlaybackStateChanged(PlaybackState),
    /// A slider thumb must be redrawn at a new position
    ThumbMoved { role: HandleRole, position: f64 },
    /// A `slide_to` animation finished
    SlideFinished,
}

/// Discriminant of [`RideMapEvent`], for filtered subscriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    SelectionChanged,
    ActiveChanged,
    HighlightChanged,
    PlaybackStateChanged,
    ThumbMoved,
    SlideFinished,
}

impl RideMapEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            RideMapEvent::SelectionChanged { .. } => EventKind::SelectionChanged,
            RideMapEvent::ActiveChanged(_) => EventKind::ActiveChanged,
            RideMapEvent::HighlightChanged(_) => EventKind::HighlightChanged,
            RideMapEvent::PlaybackStateChanged(_) => EventKind::PlaybackStateChanged,
            RideMapEvent::ThumbMoved { .. } => EventKind::ThumbMoved,
            RideMapEvent::SlideFinished => EventKind::SlideFinished,
        }
    }
}

/// Handle returned by `subscribe`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct Subscriber {
    id: SubscriptionId,
    kind: Option<EventKind>,
    callback: Box<dyn FnMut(&RideMapEvent)>,
}

/// Single-threaded observer list. Subscribers are called synchronously, in
/// subscription order.
pub struct EventBus {
    next_id: u64,
    subscribers: Vec<Subscriber>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self {
            next_id: 0,
            subscribers: Vec::new(),
        }
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn add(
        &mut self,
        kind: Option<EventKind>,
        callback: Box<dyn FnMut(&RideMapEvent)>,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscribers.push(Subscriber { id, kind, callback });
        id
    }

    /// Receive every event.
    pub fn subscribe(
        &mut self,
        callback: impl FnMut(&RideMapEvent) + 'static,
    ) -> SubscriptionId {
        self.add(None, Box::new(callback))
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|s| s.id != id);
        self.subscribers.len() != before
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    /// Receive only events of one kind.
    pub fn subscribe_kind(
        &mut self,
        kind: EventKind,
        callback: impl FnMut(&RideMapEvent) + 'static,
    ) -> SubscriptionId {
        self.add(Some(kind), Box::new(callback))
    }

    pub fn emit(&mut self, event: &RideMapEvent) {
        let kind = event.kind();
        for subscriber in &mut self.subscribers {
            if subscriber.kind.map_or(true, |k| k == kind) {
                (subscriber.callback)(event);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    #[test]
    fn test_subscribe_and_emit() {
        let mut bus = EventBus::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        bus.subscribe(move |e: &RideMapEvent| sink.borrow_mut().push(e.kind()));

        bus.emit(&RideMapEvent::SlideFinished);
        bus.emit(&RideMapEvent::PlaybackStateChanged(PlaybackState::Playing));

        assert_eq!(
            *seen.borrow(),
            vec![EventKind::SlideFinished, EventKind::PlaybackStateChanged]
        );
    }

    #[test]
    fn test_kind_filter() {
        let mut bus = EventBus::new();
        let count = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&count);
        bus.subscribe_kind(EventKind::HighlightChanged, move |_| {
            *counter.borrow_mut() += 1;
        });

        bus.emit(&RideMapEvent::SlideFinished);
        bus.emit(&RideMapEvent::HighlightChanged(HashSet::new()));
        assert_eq!(*count.borrow(), 1);
    }

    #[test]
    fn test_unsubscribe() {
        let mut bus = EventBus::new();
        let count = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&count);
        let id = bus.subscribe(move |_: &RideMapEvent| *counter.borrow_mut() += 1);

        assert_eq!(bus.len(), 1);
        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        assert!(bus.is_empty());

        bus.emit(&RideMapEvent::SlideFinished);
        assert_eq!(*count.borrow(), 0);
    }
}
