//! Lifecycle gate: scopes a continuous stream to an activation window.
//!
//! A gate watches three inputs: a source stream, a begin signal and an
//! end signal. Values from the source are forwarded only between a begin
//! and the next end. After an end the gate re-arms, so the same derived
//! stream goes through one open/close cycle per activation until the gate
//! is terminated.
//!
//! The gate holds at most one subscription to its source no matter how
//! many listeners subscribe to [`LifecycleGate::stream`]. It connects when
//! the first listener arrives and releases the source when the last one
//! leaves.

use super::emitter::Emitter;
use super::observable::{Listener, Stream};
use super::subscription::Subscription;
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

/// Current phase of a [`LifecycleGate`].
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum GatePhase {
    /// Waiting for the next begin signal.
    Closed,
    /// Forwarding source values.
    Open,
    /// Permanently shut; begin signals are ignored.
    Terminated,
}

struct GateInner<T> {
    source: Stream<T>,
    output: Emitter<T>,
    phase: Cell<GatePhase>,
    activations: Cell<u64>,
    subscribers: Cell<usize>,
    upstream: RefCell<Option<Subscription>>,
    signals: RefCell<Vec<Subscription>>,
}

impl<T: 'static> GateInner<T> {
    fn connect(self: &Rc<Self>) {
        if self.upstream.borrow().is_some() {
            return;
        }
        let weak: Weak<Self> = Rc::downgrade(self);
        let subscription = self.source.subscribe(move |value| {
            if let Some(gate) = weak.upgrade() {
                if gate.phase.get() == GatePhase::Open {
                    gate.output.emit(value);
                }
            }
        });
        *self.upstream.borrow_mut() = Some(subscription);
    }

    fn release(&self) {
        let remaining = self.subscribers.get().saturating_sub(1);
        self.subscribers.set(remaining);
        if remaining == 0 {
            self.disconnect();
        }
    }

    fn disconnect(&self) {
        let upstream = self.upstream.borrow_mut().take();
        if let Some(subscription) = upstream {
            subscription.unsubscribe();
        }
    }

    fn open(&self) {
        if self.phase.get() != GatePhase::Terminated {
            self.phase.set(GatePhase::Open);
            self.activations.set(self.activations.get() + 1);
        }
    }

    fn close(&self) {
        if self.phase.get() == GatePhase::Open {
            self.phase.set(GatePhase::Closed);
        }
    }
}

/// Restricts a source stream to the window between a begin signal and the
/// next end signal.
///
/// Edge cases:
/// - an end with no preceding begin leaves the gate closed;
/// - a begin while already open counts as a fresh activation.
///
/// # Example
///
/// ```rust
/// use tickstate::stream::{Emitter, LifecycleGate};
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// let ticks = Emitter::new();
/// let begin = Emitter::new();
/// let end = Emitter::new();
/// let gate = LifecycleGate::new(ticks.stream(), begin.stream(), end.stream());
///
/// let seen = Rc::new(Cell::new(0));
/// let s = seen.clone();
/// gate.stream().subscribe(move |_: &u32| s.set(s.get() + 1));
///
/// ticks.emit(&1);
/// begin.emit(&());
/// ticks.emit(&2);
/// end.emit(&());
/// ticks.emit(&3);
///
/// assert_eq!(seen.get(), 1);
/// ```
pub struct LifecycleGate<T> {
    inner: Rc<GateInner<T>>,
}

impl<T> Clone for LifecycleGate<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: 'static> LifecycleGate<T> {
    /// Create a closed gate over `source`, driven by `begin` and `end`.
    pub fn new(source: Stream<T>, begin: Stream<()>, end: Stream<()>) -> Self {
        let inner = Rc::new(GateInner {
            source,
            output: Emitter::new(),
            phase: Cell::new(GatePhase::Closed),
            activations: Cell::new(0),
            subscribers: Cell::new(0),
            upstream: RefCell::new(None),
            signals: RefCell::new(Vec::with_capacity(2)),
        });

        let weak = Rc::downgrade(&inner);
        let on_begin = begin.subscribe(move |_| {
            if let Some(gate) = weak.upgrade() {
                gate.open();
            }
        });
        let weak = Rc::downgrade(&inner);
        let on_end = end.subscribe(move |_| {
            if let Some(gate) = weak.upgrade() {
                gate.close();
            }
        });
        inner.signals.borrow_mut().extend([on_begin, on_end]);

        Self { inner }
    }

    /// The gated stream. Every clone shares this gate's single source
    /// subscription.
    pub fn stream(&self) -> Stream<T> {
        let weak = Rc::downgrade(&self.inner);
        Stream::new(move |listener: Listener<T>| match weak.upgrade() {
            Some(gate) => Self::attach(&gate, listener),
            None => Subscription::empty(),
        })
    }

    fn attach(gate: &Rc<GateInner<T>>, listener: Listener<T>) -> Subscription {
        if gate.phase.get() == GatePhase::Terminated {
            return Subscription::empty();
        }
        let subscription = gate.output.subscribe_listener(listener);
        gate.subscribers.set(gate.subscribers.get() + 1);
        gate.connect();

        let weak = Rc::downgrade(gate);
        Subscription::new(move || {
            subscription.unsubscribe();
            if let Some(gate) = weak.upgrade() {
                gate.release();
            }
        })
    }

    pub fn phase(&self) -> GatePhase {
        self.inner.phase.get()
    }

    pub fn is_open(&self) -> bool {
        self.phase() == GatePhase::Open
    }

    /// Number of begin signals that opened this gate.
    pub fn activations(&self) -> u64 {
        self.inner.activations.get()
    }

    /// Number of listeners currently attached to the gated stream.
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.get()
    }

    /// True while the gate holds its source subscription.
    pub fn is_connected(&self) -> bool {
        self.inner.upstream.borrow().is_some()
    }

    /// Shut the gate for good: drop the source and signal subscriptions
    /// and detach every listener.
    pub fn terminate(&self) {
        let inner = &self.inner;
        if inner.phase.replace(GatePhase::Terminated) == GatePhase::Terminated {
            return;
        }
        inner.disconnect();
        let signals: Vec<Subscription> = inner.signals.borrow_mut().drain(..).collect();
        for subscription in signals {
            subscription.unsubscribe();
        }
        inner.output.clear();
        inner.subscribers.set(0);
    }
}
