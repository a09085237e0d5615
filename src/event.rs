//! World Event System
//!
//! Lifecycle events (collision enter/exit, sleep, wake, removal) are delivered
//! synchronously to the affected body's [`Listener`], inline with the phase
//! that raised them. The world holds listeners weakly: dropping the listener
//! on the caller's side silently stops delivery.
//!
//! Every delivered event is also appended to an [`EventLog`], which the world
//! clears at the start of each step. Consumers that prefer message passing can
//! read or drain it after `update` returns instead of registering listeners.

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

use alloc::rc::Weak;
use core::cell::RefCell;

use crate::body::BodyHandle;
use crate::math::Vec2Fix;

/// What happened to a body.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventKind {
    /// A new contact was created with `other`.
    CollisionEnter {
        /// The other participant
        other: BodyHandle,
        /// Collision feature id reported by the geometry
        feature: u32,
        /// Contact point on this body's surface
        point: Vec2Fix,
        /// Outward normal on this body's side
        normal: Vec2Fix,
    },
    /// The contact with `other` was released.
    CollisionExit {
        /// The other participant
        other: BodyHandle,
    },
    /// The body's island went to sleep.
    Sleep,
    /// The body's island woke up.
    Wake,
    /// The body was removed from the world.
    Removed,
}

/// An event addressed to one body.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Event {
    /// Receiving body
    pub body: BodyHandle,
    /// What happened
    pub kind: EventKind,
}

/// Receives events for the bodies it is attached to.
///
/// Listeners get the event record only; they cannot reach back into the
/// world while a step is running.
pub trait Listener {
    /// Handle one event.
    fn on_event(&mut self, event: &Event);
}

impl<F: FnMut(&Event)> Listener for F {
    fn on_event(&mut self, event: &Event) {
        self(event)
    }
}

/// Deliver to a weakly held listener. Dropped or busy listeners are skipped.
pub(crate) fn deliver(listener: Option<&Weak<RefCell<dyn Listener>>>, event: &Event) {
    let Some(listener) = listener.and_then(Weak::upgrade) else {
        return;
    };
    let Ok(mut listener) = listener.try_borrow_mut() else {
        return;
    };
    listener.on_event(event);
}

/// Events raised during the current step, in delivery order.
#[derive(Clone, Debug, Default)]
pub struct EventLog {
    events: Vec<Event>,
}

impl EventLog {
    /// Create an empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event
    #[inline]
    pub fn push(&mut self, event: Event) {
        self.events.push(event);
    }

    /// Forget everything
    #[inline]
    pub fn clear(&mut self) {
        self.events.clear();
    }

    /// Events in delivery order
    #[inline]
    pub fn as_slice(&self) -> &[Event] {
        &self.events
    }

    /// Take every event out of the log
    pub fn drain(&mut self) -> Vec<Event> {
        core::mem::take(&mut self.events)
    }

    /// Number of logged events
    #[inline]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// True when nothing was logged
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Count events for `body` matching `pred`
    pub fn count_for(&self, body: BodyHandle, pred: impl Fn(&EventKind) -> bool) -> usize {
        self.events
            .iter()
            .filter(|e| e.body == body && pred(&e.kind))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::rc::Rc;

    fn handle(i: u32) -> BodyHandle {
        BodyHandle::new(i, 0)
    }

    #[test]
    fn test_closure_listener_receives_event() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let listener: Rc<RefCell<dyn Listener>> =
            Rc::new(RefCell::new(move |e: &Event| sink.borrow_mut().push(*e)));

        let weak = Rc::downgrade(&listener);
        let event = Event {
            body: handle(1),
            kind: EventKind::Wake,
        };
        deliver(Some(&weak), &event);

        assert_eq!(seen.borrow().as_slice(), &[event]);
    }

    #[test]
    fn test_dropped_listener_is_noop() {
        let count = Rc::new(RefCell::new(0));
        let sink = Rc::clone(&count);
        let listener: Rc<RefCell<dyn Listener>> =
            Rc::new(RefCell::new(move |_: &Event| *sink.borrow_mut() += 1));
        let weak = Rc::downgrade(&listener);
        drop(listener);

        let event = Event {
            body: handle(0),
            kind: EventKind::Sleep,
        };
        deliver(Some(&weak), &event);
        deliver(None, &event);
        assert_eq!(*count.borrow(), 0);
    }

    #[test]
    fn test_busy_listener_skips_reentrant_event() {
        let count = Rc::new(RefCell::new(0));
        let sink = Rc::clone(&count);
        let listener: Rc<RefCell<dyn Listener>> =
            Rc::new(RefCell::new(move |_: &Event| *sink.borrow_mut() += 1));
        let weak = Rc::downgrade(&listener);
        let event = Event {
            body: handle(2),
            kind: EventKind::Wake,
        };

        {
            let _held = listener.borrow_mut();
            deliver(Some(&weak), &event);
        }
        assert_eq!(*count.borrow(), 0);

        deliver(Some(&weak), &event);
        assert_eq!(*count.borrow(), 1);
    }

    #[test]
    fn test_log_count_and_drain() {
        let mut log = EventLog::new();
        log.push(Event {
            body: handle(0),
            kind: EventKind::Sleep,
        });
        log.push(Event {
            body: handle(1),
            kind: EventKind::Sleep,
        });
        log.push(Event {
            body: handle(0),
            kind: EventKind::Removed,
        });

        assert_eq!(log.count_for(handle(0), |k| *k == EventKind::Sleep), 1);
        assert_eq!(log.count_for(handle(0), |_| true), 2);

        let drained = log.drain();
        assert_eq!(drained.len(), 3);
        assert!(log.is_empty());
    }
}
