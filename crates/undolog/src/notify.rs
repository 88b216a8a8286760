#![forbid(unsafe_code)]

//! Change notification for history mutations.
//!
//! # Design
//!
//! [`Observers`] holds subscriber callbacks as `Weak` references; the
//! strong `Rc` lives inside the [`Subscription`] guard handed back to the
//! caller. Dropping the guard unsubscribes. Dead entries are pruned lazily
//! on the next [`Observers::notify`].
//!
//! Callbacks receive a [`HistoryEvent`] carrying the post-mutation counts,
//! so a subscriber that only toggles undo/redo controls never needs to
//! borrow the history back.
//!
//! # Invariants
//!
//! 1. Subscribers are notified in registration order.
//! 2. A callback whose guard was dropped is never invoked again.

use std::fmt;
use std::rc::{Rc, Weak};

type CallbackRc = Rc<dyn Fn(&HistoryEvent)>;
type CallbackWeak = Weak<dyn Fn(&HistoryEvent)>;

/// Which operation changed the history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HistoryEventKind {
    /// A new action was applied and recorded.
    Executed,
    /// The most recent past action was reversed.
    Undone,
    /// The next future action was re-applied.
    Redone,
    /// Every action was retired and the log cleared.
    Flushed,
}

/// Payload delivered to subscribers after a successful mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryEvent {
    /// Operation that fired the notification.
    pub kind: HistoryEventKind,
    /// Past count after the operation.
    pub past_count: usize,
    /// Future count after the operation.
    pub future_count: usize,
    /// History revision after the operation.
    pub revision: u64,
}

impl HistoryEvent {
    /// Whether an undo is possible after this event.
    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.past_count > 0
    }

    /// Whether a redo is possible after this event.
    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.future_count > 0
    }
}

/// Observer list owned by a history.
#[derive(Default)]
pub(crate) struct Observers {
    subscribers: Vec<CallbackWeak>,
}

impl fmt::Debug for Observers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observers")
            .field("subscriber_count", &self.subscribers.len())
            .finish()
    }
}

impl Observers {
    pub(crate) fn subscribe(&mut self, callback: impl Fn(&HistoryEvent) + 'static) -> Subscription {
        let strong: CallbackRc = Rc::new(callback);
        self.subscribers.push(Rc::downgrade(&strong));
        Subscription { _guard: strong }
    }

    /// Registered subscribers, including dead ones not yet pruned.
    pub(crate) fn len(&self) -> usize {
        self.subscribers.len()
    }

    /// Prune dead subscribers and call live ones in registration order.
    pub(crate) fn notify(&mut self, event: &HistoryEvent) {
        self.subscribers.retain(|w| w.strong_count() > 0);
        // Upgrade first so a callback dropping another guard mid-notify
        // cannot invalidate the iteration.
        let callbacks: Vec<CallbackRc> =
            self.subscribers.iter().filter_map(Weak::upgrade).collect();
        for cb in &callbacks {
            cb(event);
        }
    }
}

/// RAII guard for a change-notification callback.
///
/// Dropping the `Subscription` unsubscribes the callback.
#[must_use = "dropping the subscription immediately unsubscribes"]
pub struct Subscription {
    _guard: CallbackRc,
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};

    fn event(kind: HistoryEventKind) -> HistoryEvent {
        HistoryEvent {
            kind,
            past_count: 1,
            future_count: 0,
            revision: 1,
        }
    }

    #[test]
    fn notifies_in_registration_order() {
        let mut observers = Observers::default();
        let order = Rc::new(RefCell::new(Vec::new()));
        let (o1, o2) = (Rc::clone(&order), Rc::clone(&order));
        let _a = observers.subscribe(move |_| o1.borrow_mut().push(1));
        let _b = observers.subscribe(move |_| o2.borrow_mut().push(2));

        observers.notify(&event(HistoryEventKind::Executed));
        assert_eq!(*order.borrow(), vec![1, 2]);
    }

    #[test]
    fn dropped_guard_unsubscribes() {
        let mut observers = Observers::default();
        let count = Rc::new(Cell::new(0u32));
        let c = Rc::clone(&count);
        let sub = observers.subscribe(move |_| c.set(c.get() + 1));

        observers.notify(&event(HistoryEventKind::Undone));
        drop(sub);
        observers.notify(&event(HistoryEventKind::Redone));

        assert_eq!(count.get(), 1);
        assert_eq!(observers.len(), 0, "dead subscriber pruned");
    }

    #[test]
    fn callback_receives_event() {
        let mut observers = Observers::default();
        let seen = Rc::new(Cell::new(None));
        let s = Rc::clone(&seen);
        let _sub = observers.subscribe(move |e| s.set(Some(e.kind)));

        observers.notify(&event(HistoryEventKind::Flushed));
        assert_eq!(seen.get(), Some(HistoryEventKind::Flushed));
    }

    #[test]
    fn event_helpers() {
        let e = event(HistoryEventKind::Executed);
        assert!(e.can_undo());
        assert!(!e.can_redo());
    }

    #[test]
    fn subscription_debug() {
        let mut observers = Observers::default();
        let sub = observers.subscribe(|_| {});
        assert!(format!("{sub:?}").contains("Subscription"));
        assert!(format!("{observers:?}").contains("subscriber_count"));
    }
}
