//! Observer events with RAII subscriptions, and the buffer that
//! coalesces change notifications during batches.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

type Listener<A> = Rc<dyn Fn(&A)>;

/// Something a [`Subscription`] can detach itself from.
trait Unsubscribe {
    fn unsubscribe(&self, id: u64);
}

/// A multicast event.
///
/// Listeners are invoked in subscription order with a snapshot of the
/// listener list, so listeners may subscribe or unsubscribe while the
/// event is being raised.
///
/// # Examples
///
/// ```rust
/// use statgraph::event::ChangeEvent;
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// let event = Rc::new(ChangeEvent::new());
/// let calls = Rc::new(Cell::new(0));
/// let counter = calls.clone();
/// let subscription = event.subscribe(move |_| counter.set(counter.get() + 1));
///
/// event.notify();
/// drop(subscription);
/// event.notify();
/// assert_eq!(calls.get(), 1);
/// ```
pub struct Event<A> {
    listeners: RefCell<Vec<(u64, Listener<A>)>>,
    next_id: Cell<u64>,
}

/// An event without payload.
pub type ChangeEvent = Event<()>;

impl<A: 'static> Event<A> {
    pub fn new() -> Self {
        Self {
            listeners: RefCell::new(Vec::new()),
            next_id: Cell::new(0),
        }
    }

    /// Attach a listener. It stays attached until the returned
    /// subscription is dropped.
    #[must_use = "dropping the subscription detaches the listener"]
    pub fn subscribe(self: &Rc<Self>, listener: impl Fn(&A) + 'static) -> Subscription {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.listeners.borrow_mut().push((id, Rc::new(listener)));
        let source: Weak<Event<A>> = Rc::downgrade(self);
        Subscription { source, id }
    }

    /// Invoke every listener with `args`.
    pub fn raise(&self, args: &A) {
        let listeners: Vec<Listener<A>> = self
            .listeners
            .borrow()
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();
        for listener in listeners {
            listener(args);
        }
    }

    /// Number of attached listeners.
    pub fn subscriber_count(&self) -> usize {
        self.listeners.borrow().len()
    }
}

impl ChangeEvent {
    /// Raise a payload-less event.
    pub fn notify(&self) {
        self.raise(&());
    }
}

impl<A: 'static> Default for Event<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A> Unsubscribe for Event<A> {
    fn unsubscribe(&self, id: u64) {
        self.listeners.borrow_mut().retain(|(i, _)| *i != id);
    }
}

/// A listener's attachment to an [`Event`]. Dropping it detaches the
/// listener.
pub struct Subscription {
    source: Weak<dyn Unsubscribe>,
    id: u64,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(source) = self.source.upgrade() {
            source.unsubscribe(self.id);
        }
    }
}

/// Defers change notifications while a batch is running.
///
/// Outside of a batch events are raised right away. Inside one, each
/// event is queued at most once and raised when the outermost batch ends.
pub struct EventBuffer {
    enabled: bool,
    depth: Cell<usize>,
    pending: RefCell<Vec<Rc<ChangeEvent>>>,
}

impl EventBuffer {
    /// A buffer that defers events while batching.
    pub fn new() -> Self {
        Self::with_buffering(true)
    }

    /// A buffer that defers events only when `enabled` is set.
    pub fn with_buffering(enabled: bool) -> Self {
        Self {
            enabled,
            depth: Cell::new(0),
            pending: RefCell::new(Vec::new()),
        }
    }

    /// Raise `event` now, or queue it if a batch is running.
    pub fn raise(&self, event: &Rc<ChangeEvent>) {
        if self.enabled && self.depth.get() > 0 {
            let mut pending = self.pending.borrow_mut();
            if !pending.iter().any(|e| Rc::ptr_eq(e, event)) {
                pending.push(event.clone());
            }
        } else {
            event.notify();
        }
    }

    /// Run `f` as a batch. Queued events are raised once the outermost
    /// batch returns.
    pub fn buffer<R>(&self, f: impl FnOnce() -> R) -> R {
        self.depth.set(self.depth.get() + 1);
        let result = f();
        self.depth.set(self.depth.get() - 1);
        if self.depth.get() == 0 {
            self.flush();
        }
        result
    }

    /// Whether a batch is currently running.
    pub fn is_buffering(&self) -> bool {
        self.depth.get() > 0
    }

    fn flush(&self) {
        loop {
            let pending = std::mem::take(&mut *self.pending.borrow_mut());
            if pending.is_empty() {
                break;
            }
            tracing::trace!(events = pending.len(), "flushing buffered change events");
            for event in pending {
                event.notify();
            }
        }
    }
}

impl Default for EventBuffer {
    fn default() -> Self {
        Self::new()
    }
}
