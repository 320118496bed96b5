//! Subscribable streams and their combinators.

use super::subscription::Subscription;
use std::rc::Rc;

/// Shared listener callback.
pub type Listener<T> = Rc<dyn Fn(&T)>;

type SubscribeFn<T> = dyn Fn(Listener<T>) -> Subscription;

/// A cloneable source of values that listeners can subscribe to.
///
/// Combinators build derived streams lazily: nothing happens upstream
/// until a listener subscribes, and each subscription to a derived stream
/// runs its own copy of the combinator chain. Sharing one upstream
/// subscription across many listeners is the job of
/// [`LifecycleGate`](super::LifecycleGate).
///
/// # Example
///
/// ```rust
/// use tickstate::stream::Emitter;
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// let emitter = Emitter::new();
/// let total = Rc::new(Cell::new(0));
/// let t = total.clone();
///
/// emitter
///     .stream()
///     .filter(|v: &i32| *v % 2 == 0)
///     .map(|v| v * 10)
///     .subscribe(move |v| t.set(t.get() + *v));
///
/// for v in 1..=4 {
///     emitter.emit(&v);
/// }
/// assert_eq!(total.get(), 60);
/// ```
pub struct Stream<T> {
    subscribe_fn: Rc<SubscribeFn<T>>,
}

impl<T> Clone for Stream<T> {
    fn clone(&self) -> Self {
        Self {
            subscribe_fn: Rc::clone(&self.subscribe_fn),
        }
    }
}

impl<T: 'static> Stream<T> {
    /// Build a stream from its subscribe function.
    pub fn new<F>(subscribe_fn: F) -> Self
    where
        F: Fn(Listener<T>) -> Subscription + 'static,
    {
        Self {
            subscribe_fn: Rc::new(subscribe_fn),
        }
    }

    /// A stream that never emits.
    pub fn never() -> Self {
        Self::new(|_| Subscription::empty())
    }

    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&T) + 'static,
    {
        self.subscribe_listener(Rc::new(listener))
    }

    pub(crate) fn subscribe_listener(&self, listener: Listener<T>) -> Subscription {
        (self.subscribe_fn)(listener)
    }

    /// Forward only values matching `predicate`.
    pub fn filter<F>(&self, predicate: F) -> Stream<T>
    where
        F: Fn(&T) -> bool + 'static,
    {
        let upstream = self.clone();
        let predicate = Rc::new(predicate);
        Stream::new(move |listener: Listener<T>| {
            let predicate = Rc::clone(&predicate);
            upstream.subscribe(move |value| {
                if predicate(value) {
                    listener(value);
                }
            })
        })
    }

    /// Transform each value.
    pub fn map<U, F>(&self, f: F) -> Stream<U>
    where
        U: 'static,
        F: Fn(&T) -> U + 'static,
    {
        let upstream = self.clone();
        let f = Rc::new(f);
        Stream::new(move |listener: Listener<U>| {
            let f = Rc::clone(&f);
            upstream.subscribe(move |value| listener(&f(value)))
        })
    }

    /// Run `f` for its side effect before forwarding each value.
    pub fn inspect<F>(&self, f: F) -> Stream<T>
    where
        F: Fn(&T) + 'static,
    {
        let upstream = self.clone();
        let f = Rc::new(f);
        Stream::new(move |listener: Listener<T>| {
            let f = Rc::clone(&f);
            upstream.subscribe(move |value| {
                f(value);
                listener(value);
            })
        })
    }

    /// Discard the value, keeping only the signal.
    pub fn unit(&self) -> Stream<()> {
        self.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::Emitter;
    use std::cell::{Cell, RefCell};

    #[test]
    fn filter_drops_rejected_values() {
        let emitter = Emitter::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = seen.clone();
        emitter
            .stream()
            .filter(|v: &u32| *v > 2)
            .subscribe(move |v| s.borrow_mut().push(*v));

        for v in 0..5 {
            emitter.emit(&v);
        }
        assert_eq!(*seen.borrow(), vec![3, 4]);
    }

    #[test]
    fn inspect_runs_before_listener() {
        let emitter = Emitter::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let (l1, l2) = (log.clone(), log.clone());
        emitter
            .stream()
            .inspect(move |_: &()| l1.borrow_mut().push("inspect"))
            .subscribe(move |_| l2.borrow_mut().push("listener"));

        emitter.emit(&());
        assert_eq!(*log.borrow(), vec!["inspect", "listener"]);
    }

    #[test]
    fn unsubscribe_from_derived_stream_detaches_upstream() {
        let emitter: Emitter<i32> = Emitter::new();
        let count = Rc::new(Cell::new(0));
        let c = count.clone();
        let sub = emitter
            .stream()
            .map(|v| v + 1)
            .subscribe(move |_| c.set(c.get() + 1));

        assert_eq!(emitter.listener_count(), 1);
        sub.unsubscribe();
        assert_eq!(emitter.listener_count(), 0);
        emitter.emit(&1);
        assert_eq!(count.get(), 0);
    }

    #[test]
    fn never_stream_does_not_emit() {
        let stream: Stream<()> = Stream::never();
        let sub = stream.subscribe(|_| panic!("never emits"));
        assert!(sub.is_empty());
    }
}
