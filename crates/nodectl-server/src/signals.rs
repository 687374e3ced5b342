//! Lifecycle observer lists.

use std::sync::{Arc, PoisonError, RwLock};

use crate::registry::CommandDescriptor;

type Slot<A> = Arc<dyn Fn(&A) + Send + Sync>;

/// A list of callbacks fired synchronously, in connection order.
pub struct Signal<A: ?Sized> {
    slots: RwLock<Vec<Slot<A>>>,
}

impl<A: ?Sized> Default for Signal<A> {
    fn default() -> Self {
        Self {
            slots: RwLock::new(Vec::new()),
        }
    }
}

impl<A: ?Sized> Signal<A> {
    pub fn connect<F>(&self, slot: F)
    where
        F: Fn(&A) + Send + Sync + 'static,
    {
        self.slots
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::new(slot));
    }

    /// Call every connected slot with `arg`.
    ///
    /// The slot list is copied first so a slot may connect further slots
    /// without deadlocking; those run from the next emit on.
    pub fn emit(&self, arg: &A) {
        let slots: Vec<Slot<A>> = self
            .slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for slot in slots {
            slot(arg);
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Observer lists owned by a server instance.
#[derive(Default)]
pub struct LifecycleSignals {
    pub started: Signal<()>,
    pub stopped: Signal<()>,
    pub pre_command: Signal<CommandDescriptor>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_emit_in_connection_order() {
        let signal: Signal<u32> = Signal::default();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let first = Arc::clone(&seen);
        signal.connect(move |n| first.lock().unwrap().push(("first", *n)));
        let second = Arc::clone(&seen);
        signal.connect(move |n| second.lock().unwrap().push(("second", *n)));

        signal.emit(&7);
        assert_eq!(*seen.lock().unwrap(), vec![("first", 7), ("second", 7)]);
        assert_eq!(signal.len(), 2);
    }

    #[test]
    fn test_emit_without_slots() {
        let signal: Signal<()> = Signal::default();
        assert!(signal.is_empty());
        signal.emit(&());
    }

    #[test]
    fn test_connect_from_inside_slot() {
        let signal: Arc<Signal<()>> = Arc::new(Signal::default());
        let inner = Arc::clone(&signal);
        signal.connect(move |()| inner.connect(|()| {}));

        signal.emit(&());
        assert_eq!(signal.len(), 2);
    }
}
