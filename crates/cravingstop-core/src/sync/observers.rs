//! Observer registry for the coordinator's record stream.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use super::types::SyncView;

type Callback = Box<dyn FnMut(&SyncView<'_>)>;

struct Entry {
    id: u64,
    active: Cell<bool>,
    callback: RefCell<Callback>,
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    entries: Vec<Rc<Entry>>,
}

#[derive(Default)]
pub(crate) struct Observers {
    registry: Rc<RefCell<Registry>>,
}

/// Disposer returned by `SyncCoordinator::subscribe`.
///
/// Dropping it leaves the observer registered; call
/// [`unsubscribe`](Self::unsubscribe) to stop deliveries.
pub struct Unsubscribe {
    registry: Weak<RefCell<Registry>>,
    entry: Weak<Entry>,
}

impl Unsubscribe {
    /// Stop this observer. Other observers are unaffected.
    pub fn unsubscribe(self) {
        let Some(entry) = self.entry.upgrade() else {
            return;
        };
        entry.active.set(false);
        if let Some(registry) = self.registry.upgrade() {
            registry.borrow_mut().entries.retain(|e| e.id != entry.id);
        }
    }
}

impl std::fmt::Debug for Unsubscribe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Unsubscribe")
            .field("registered", &(self.entry.strong_count() > 0))
            .finish()
    }
}

impl Observers {
    pub(crate) fn add(&self, callback: Callback) -> Unsubscribe {
        let entry = {
            let mut registry = self.registry.borrow_mut();
            registry.next_id += 1;
            let entry = Rc::new(Entry {
                id: registry.next_id,
                active: Cell::new(true),
                callback: RefCell::new(callback),
            });
            registry.entries.push(Rc::clone(&entry));
            entry
        };
        Unsubscribe {
            registry: Rc::downgrade(&self.registry),
            entry: Rc::downgrade(&entry),
        }
    }

    /// Deliver `view` to one freshly added observer.
    pub(crate) fn deliver_to(&self, handle: &Unsubscribe, view: &SyncView<'_>) {
        if let Some(entry) = handle.entry.upgrade() {
            call(&entry, view);
        }
    }

    /// Deliver `view` to every registered observer, in registration order.
    pub(crate) fn notify(&self, view: &SyncView<'_>) {
        // Callbacks may unsubscribe; iterate over a copy.
        let entries: Vec<Rc<Entry>> = self.registry.borrow().entries.clone();
        for entry in &entries {
            call(entry, view);
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.registry.borrow().entries.len()
    }
}

fn call(entry: &Entry, view: &SyncView<'_>) {
    if !entry.active.get() {
        return;
    }
    if let Ok(mut callback) = entry.callback.try_borrow_mut() {
        callback(view);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::types::Authority;

    fn view() -> SyncView<'static> {
        SyncView {
            records: &[],
            authority: Authority::Local,
            notice: None,
        }
    }

    #[test]
    fn unsubscribe_stops_only_that_observer() {
        let observers = Observers::default();
        let hits = Rc::new(Cell::new((0, 0)));

        let h = Rc::clone(&hits);
        let first = observers.add(Box::new(move |_| h.set((h.get().0 + 1, h.get().1))));
        let h = Rc::clone(&hits);
        let _second = observers.add(Box::new(move |_| h.set((h.get().0, h.get().1 + 1))));

        observers.notify(&view());
        first.unsubscribe();
        observers.notify(&view());

        assert_eq!(hits.get(), (1, 2));
        assert_eq!(observers.len(), 1);
    }

    #[test]
    fn same_callback_registered_twice_counts_twice() {
        let observers = Observers::default();
        let hits = Rc::new(Cell::new(0));
        let mk = |hits: &Rc<Cell<i32>>| {
            let h = Rc::clone(hits);
            Box::new(move |_: &SyncView<'_>| h.set(h.get() + 1)) as Callback
        };
        let a = observers.add(mk(&hits));
        let _b = observers.add(mk(&hits));

        observers.notify(&view());
        a.unsubscribe();
        observers.notify(&view());
        assert_eq!(hits.get(), 3);
    }

    #[test]
    fn unsubscribe_after_registry_dropped_is_harmless() {
        let observers = Observers::default();
        let handle = observers.add(Box::new(|_| {}));
        drop(observers);
        handle.unsubscribe();
    }
}
