//! Host-facing handle on a caching node.

use crate::error::CalcResult;
use crate::event::{ChangeEvent, Subscription};
use crate::node_value::NodeValue;
use crate::nodes::{CachingNode, CalculationNode, SubscriberCountingNode};
use std::cell::RefCell;
use std::rc::Rc;

/// A stable handle on a caching node for hosts.
///
/// The wrapping node is the one subscriber of the wrapped node's
/// buffered signal, however many hosts listen to the wrapping node. Its
/// lifetime is tied to the explicit registration of a stat rather than
/// to the internal graph.
pub struct WrappingNode {
    node: Rc<CachingNode>,
    value_changed: Rc<ChangeEvent>,
    subscription: RefCell<Option<Subscription>>,
}

impl WrappingNode {
    pub fn new(node: Rc<CachingNode>) -> Self {
        let value_changed = Rc::new(ChangeEvent::new());
        let forward = Rc::downgrade(&value_changed);
        let subscription = node.value_changed().subscribe(move |_| {
            if let Some(forward) = forward.upgrade() {
                forward.notify();
            }
        });
        Self {
            node,
            value_changed,
            subscription: RefCell::new(Some(subscription)),
        }
    }

    /// The wrapped node.
    pub fn inner(&self) -> &Rc<CachingNode> {
        &self.node
    }
}

impl CalculationNode for WrappingNode {
    fn value(&self) -> CalcResult<Option<NodeValue>> {
        self.node.value()
    }

    fn value_changed(&self) -> &Rc<ChangeEvent> {
        &self.value_changed
    }

    /// Detach from the wrapped node. The wrapped node itself stays alive;
    /// it belongs to the graph.
    fn dispose(&self) {
        self.subscription.borrow_mut().take();
    }
}

impl SubscriberCountingNode for WrappingNode {
    fn subscriber_count(&self) -> usize {
        self.value_changed.subscriber_count()
    }
}
