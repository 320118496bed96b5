//! Disposable subscription handles.

use std::fmt;

/// Handle to a live subscription.
///
/// Dropping a `Subscription` does NOT detach the listener: wiring done in
/// `initialize` stays alive as long as its source does. Call
/// [`Subscription::unsubscribe`] to detach explicitly.
pub struct Subscription {
    dispose: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    pub(crate) fn new<F>(dispose: F) -> Self
    where
        F: FnOnce() + 'static,
    {
        Self {
            dispose: Some(Box::new(dispose)),
        }
    }

    /// A subscription that is already detached.
    pub fn empty() -> Self {
        Self { dispose: None }
    }

    /// Detach the listener from its source.
    pub fn unsubscribe(mut self) {
        if let Some(dispose) = self.dispose.take() {
            dispose();
        }
    }

    pub fn is_empty(&self) -> bool {
        self.dispose.is_none()
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.dispose.is_some())
            .finish()
    }
}
