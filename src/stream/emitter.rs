//! Subscriber-list event emitter.

use super::observable::{Listener, Stream};
use super::subscription::Subscription;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

struct EmitterInner<T> {
    listeners: RefCell<Vec<(u64, Listener<T>)>>,
    next_id: Cell<u64>,
}

/// Multicast emitter: every emitted value is passed by reference to all
/// current listeners, in subscription order.
///
/// Emission iterates over a snapshot of the listener list, so listeners
/// may subscribe, unsubscribe or emit on other emitters while running.
/// Listeners added during an emission first see the next one.
pub struct Emitter<T> {
    inner: Rc<EmitterInner<T>>,
}

impl<T> Clone for Emitter<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: 'static> Default for Emitter<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> Emitter<T> {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(EmitterInner {
                listeners: RefCell::new(Vec::new()),
                next_id: Cell::new(0),
            }),
        }
    }

    /// Deliver `value` to every current listener.
    pub fn emit(&self, value: &T) {
        let snapshot: Vec<Listener<T>> = self
            .inner
            .listeners
            .borrow()
            .iter()
            .map(|(_, listener)| Rc::clone(listener))
            .collect();
        for listener in snapshot {
            listener(value);
        }
    }

    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&T) + 'static,
    {
        self.subscribe_listener(Rc::new(listener))
    }

    pub(crate) fn subscribe_listener(&self, listener: Listener<T>) -> Subscription {
        let id = self.inner.next_id.get();
        self.inner.next_id.set(id + 1);
        self.inner.listeners.borrow_mut().push((id, listener));

        let weak = Rc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.listeners.borrow_mut().retain(|(i, _)| *i != id);
            }
        })
    }

    /// Detach every listener.
    pub fn clear(&self) {
        self.inner.listeners.borrow_mut().clear();
    }

    pub fn listener_count(&self) -> usize {
        self.inner.listeners.borrow().len()
    }

    /// View this emitter as a [`Stream`].
    pub fn stream(&self) -> Stream<T> {
        let emitter = self.clone();
        Stream::new(move |listener| emitter.subscribe_listener(listener))
    }
}
