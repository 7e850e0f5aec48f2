//! Observer registry for clock changes.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use crate::types::ClockStatus;

/// What happened to the clock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockEvent {
    Initialized,
    Started,
    Paused,
    Ticked,
    Expired,
    Reset,
    Restored,
}

/// Delivered to every observer after a state change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockChange {
    pub event: ClockEvent,
    pub remaining_seconds: u64,
    pub status: ClockStatus,
}

pub type Observer = Arc<dyn Fn(&ClockChange) + Send + Sync>;

#[derive(Default)]
struct Registry {
    next_id: AtomicU64,
    observers: Mutex<Vec<(u64, Observer)>>,
}

#[derive(Default)]
pub(crate) struct Observers {
    inner: Arc<Registry>,
}

impl Observers {
    pub(crate) fn subscribe(&self, observer: Observer) -> Subscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner
            .observers
            .lock()
            .expect("observer lock poisoned")
            .push((id, observer));

        Subscription {
            id,
            registry: Arc::downgrade(&self.inner),
        }
    }

    pub(crate) fn notify(&self, change: ClockChange) {
        // Call outside the lock so observers may subscribe or unsubscribe
        let observers: Vec<Observer> = self
            .inner
            .observers
            .lock()
            .expect("observer lock poisoned")
            .iter()
            .map(|(_, o)| o.clone())
            .collect();

        for observer in observers {
            observer(&change);
        }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.inner
            .observers
            .lock()
            .expect("observer lock poisoned")
            .len()
    }
}

/// Handle returned by `SessionClock::subscribe`. Dropping it unsubscribes.
#[must_use = "dropping a Subscription unsubscribes the observer"]
pub struct Subscription {
    id: u64,
    registry: Weak<Registry>,
}

impl Subscription {
    pub fn unsubscribe(self) {
        // Drop does the work
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            if let Ok(mut observers) = registry.observers.lock() {
                observers.retain(|(id, _)| *id != self.id);
            }
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn change() -> ClockChange {
        ClockChange {
            event: ClockEvent::Ticked,
            remaining_seconds: 5,
            status: ClockStatus::Running,
        }
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let observers = Observers::default();
        let calls = Arc::new(AtomicUsize::new(0));

        let counter = calls.clone();
        let sub = observers.subscribe(Arc::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        observers.notify(change());
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        sub.unsubscribe();
        observers.notify(change());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(observers.len(), 0);
    }

    #[test]
    fn test_dropping_handle_unsubscribes() {
        let observers = Observers::default();
        {
            let _sub = observers.subscribe(Arc::new(|_| {}));
            assert_eq!(observers.len(), 1);
        }
        assert_eq!(observers.len(), 0);
    }
}
