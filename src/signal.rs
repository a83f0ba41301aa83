//! Single-threaded observer registry with scoped subscriptions.
//!
//! Listeners may subscribe or drop their own `Subscription` while an event is
//! being delivered; such changes take effect once delivery finishes, except
//! that a released listener is never called again.

use std::cell::{Cell, RefCell};
use std::mem;
use std::rc::{Rc, Weak};

type Listener<T> = Box<dyn FnMut(&T)>;

struct Registry<T> {
    listeners: RefCell<Vec<(u64, Listener<T>)>>,
    /// Ids released while their listener was taken out for delivery.
    released: RefCell<Vec<u64>>,
    emitting: Cell<u32>,
}

impl<T> Registry<T> {
    fn release(&self, id: u64) {
        self.listeners.borrow_mut().retain(|(i, _)| *i != id);
        if self.emitting.get() > 0 {
            self.released.borrow_mut().push(id);
        }
    }

    fn is_released(&self, id: u64) -> bool {
        self.released.borrow().contains(&id)
    }
}

pub struct Signal<T> {
    registry: Rc<Registry<T>>,
    next_id: Cell<u64>,
}

impl<T> Default for Signal<T> {
    fn default() -> Self {
        Self {
            registry: Rc::new(Registry {
                listeners: RefCell::new(Vec::new()),
                released: RefCell::new(Vec::new()),
                emitting: Cell::new(0),
            }),
            next_id: Cell::new(0),
        }
    }
}

impl<T: 'static> Signal<T> {
    /// Register `f`. It stays registered until the returned guard is dropped.
    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn subscribe(&self, f: impl FnMut(&T) + 'static) -> Subscription {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.registry.listeners.borrow_mut().push((id, Box::new(f)));

        let registry: Weak<Registry<T>> = Rc::downgrade(&self.registry);
        Subscription {
            release: Some(Box::new(move || {
                if let Some(registry) = registry.upgrade() {
                    registry.release(id);
                }
            })),
        }
    }

    /// Call every listener in subscription order. No borrow is held while a
    /// listener runs.
    pub fn emit(&self, value: &T) {
        let reg = &self.registry;
        let mut delivering = mem::take(&mut *reg.listeners.borrow_mut());
        reg.emitting.set(reg.emitting.get() + 1);

        for (id, f) in delivering.iter_mut() {
            if !reg.is_released(*id) {
                f(value);
            }
        }

        reg.emitting.set(reg.emitting.get() - 1);
        // listeners added during delivery go after the existing ones
        let added = mem::take(&mut *reg.listeners.borrow_mut());
        delivering.retain(|(id, _)| !reg.is_released(*id));
        delivering.extend(added);
        *reg.listeners.borrow_mut() = delivering;
        if reg.emitting.get() == 0 {
            reg.released.borrow_mut().clear();
        }
    }

    #[cfg(test)]
    pub(crate) fn listener_count(&self) -> usize {
        self.registry.listeners.borrow().len()
    }
}

/// Owned registration; unsubscribes on drop.
pub struct Subscription {
    release: Option<Box<dyn FnOnce()>>,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}
