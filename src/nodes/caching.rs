//! Lazily cached node values with buffered change notification.

use crate::error::{CalcResult, CalculationError};
use crate::event::{ChangeEvent, EventBuffer, Subscription};
use crate::node_value::NodeValue;
use crate::nodes::{CalculationNode, SubscriberCountingNode};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Single-flag reentrancy guard.
///
/// Entering a guard that is already entered is a cyclic dependency.
#[derive(Debug, Default)]
pub struct CycleGuard {
    entered: Cell<bool>,
}

/// Leaves the guard when dropped.
pub struct CycleGuardToken<'a> {
    guard: &'a CycleGuard,
}

impl CycleGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter the guarded region. `label` names the guarded node in the
    /// error if the guard is already entered.
    pub fn enter(&self, label: &str) -> CalcResult<CycleGuardToken<'_>> {
        if self.entered.replace(true) {
            tracing::warn!(node = label, "cyclic dependency detected");
            return Err(CalculationError::cycle_at(label));
        }
        Ok(CycleGuardToken { guard: self })
    }

    pub fn is_entered(&self) -> bool {
        self.entered.get()
    }
}

impl Drop for CycleGuardToken<'_> {
    fn drop(&mut self) {
        self.guard.entered.set(false);
    }
}

/// Memoizes a node's value until the node reports a change.
///
/// Invalidation is lazy: a change of the decorated node only drops the
/// cache and notifies. Two notifications exist:
/// `value_change_received` is raised immediately and is what other nodes
/// of the graph subscribe to (through [`CachingNodeAdapter`]), while
/// `value_changed` goes through the [`EventBuffer`] and is what hosts
/// subscribe to, so a batch of edits reaches them at most once per node.
///
/// Nodes are only notified if their value was read since the last
/// notification. Errors are never cached.
pub struct CachingNode {
    label: String,
    decorated: Rc<dyn CalculationNode>,
    buffer: Rc<EventBuffer>,
    cache: Cell<Option<Option<NodeValue>>>,
    observed: Cell<bool>,
    stale: Cell<bool>,
    guard: CycleGuard,
    value_change_received: Rc<ChangeEvent>,
    value_changed: Rc<ChangeEvent>,
    subscription: RefCell<Option<Subscription>>,
}

impl CachingNode {
    /// Wrap `decorated`. `label` identifies the node in logs and cycle
    /// errors.
    pub fn new(decorated: Rc<dyn CalculationNode>, buffer: Rc<EventBuffer>, label: impl Into<String>) -> Rc<Self> {
        let node = Rc::new(Self {
            label: label.into(),
            decorated,
            buffer,
            cache: Cell::new(None),
            observed: Cell::new(false),
            stale: Cell::new(false),
            guard: CycleGuard::new(),
            value_change_received: Rc::new(ChangeEvent::new()),
            value_changed: Rc::new(ChangeEvent::new()),
            subscription: RefCell::new(None),
        });
        let weak = Rc::downgrade(&node);
        let subscription = node.decorated.value_changed().subscribe(move |_| {
            if let Some(node) = weak.upgrade() {
                node.invalidate();
            }
        });
        *node.subscription.borrow_mut() = Some(subscription);
        node
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Raised immediately when the cached value is dropped.
    pub fn value_change_received(&self) -> &Rc<ChangeEvent> {
        &self.value_change_received
    }

    /// Whether a value is currently cached.
    pub fn is_cached(&self) -> bool {
        self.cache.get().is_some()
    }

    /// Listeners of the internal (immediate) signal.
    pub fn internal_subscriber_count(&self) -> usize {
        self.value_change_received.subscriber_count()
    }

    /// Listeners of the external (buffered) signal.
    pub fn external_subscriber_count(&self) -> usize {
        self.value_changed.subscriber_count()
    }

    fn invalidate(&self) {
        if self.guard.is_entered() {
            self.stale.set(true);
        }
        self.cache.set(None);
        if self.observed.replace(false) {
            tracing::trace!(node = %self.label, "cache invalidated");
            self.value_change_received.notify();
            self.buffer.raise(&self.value_changed);
        }
    }

    fn compute(&self) -> CalcResult<Option<NodeValue>> {
        let _token = self.guard.enter(&self.label)?;
        self.stale.set(false);
        tracing::trace!(node = %self.label, "recomputing");
        let value = self
            .decorated
            .value()
            .map_err(|e| e.unwind_through(&self.label))?;
        if !self.stale.get() {
            self.cache.set(Some(value));
        }
        Ok(value)
    }
}

impl CalculationNode for CachingNode {
    fn value(&self) -> CalcResult<Option<NodeValue>> {
        let result = match self.cache.get() {
            Some(value) => Ok(value),
            None => self.compute(),
        };
        self.observed.set(true);
        result
    }

    fn value_changed(&self) -> &Rc<ChangeEvent> {
        &self.value_changed
    }

    fn dispose(&self) {
        self.subscription.borrow_mut().take();
        self.cache.set(None);
        self.decorated.dispose();
    }
}

/// Exposes a [`CachingNode`]'s immediate invalidation signal as a plain
/// node, for wiring caching nodes into the rest of the graph.
pub struct CachingNodeAdapter {
    node: Rc<CachingNode>,
}

impl CachingNodeAdapter {
    pub fn new(node: Rc<CachingNode>) -> Self {
        Self { node }
    }
}

impl CalculationNode for CachingNodeAdapter {
    fn value(&self) -> CalcResult<Option<NodeValue>> {
        self.node.value()
    }

    fn value_changed(&self) -> &Rc<ChangeEvent> {
        self.node.value_change_received()
    }

    fn dispose(&self) {
        self.node.dispose();
    }
}

impl SubscriberCountingNode for CachingNodeAdapter {
    fn subscriber_count(&self) -> usize {
        self.node.internal_subscriber_count()
    }
}
