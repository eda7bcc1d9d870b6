//! Combines the modifier nodes of one form into a single value.

use crate::aggregation::aggregate;
use crate::collection::{CollectionChange, ModifierNodeCollection};
use crate::error::CalcResult;
use crate::event::{ChangeEvent, Subscription};
use crate::node_type::Form;
use crate::node_value::NodeValue;
use crate::nodes::CalculationNode;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

fn node_address(node: &Rc<dyn CalculationNode>) -> *const () {
    Rc::as_ptr(node) as *const ()
}

/// Follows an observable collection of modifier nodes.
///
/// The node subscribes to every member; additions and removals adjust
/// those subscriptions one by one, a reset resubscribes from scratch.
/// Any structural change or member change raises `value_changed`.
pub struct AggregatingNode {
    collection: Rc<ModifierNodeCollection>,
    form: Form,
    value_changed: Rc<ChangeEvent>,
    collection_subscription: RefCell<Option<Subscription>>,
    member_subscriptions: RefCell<Vec<(*const (), Subscription)>>,
}

impl AggregatingNode {
    /// Aggregate the modifiers in `collection` as `form` modifiers.
    pub fn new(collection: Rc<ModifierNodeCollection>, form: Form) -> Rc<Self> {
        Rc::new_cyclic(|weak: &Weak<AggregatingNode>| {
            let on_change = weak.clone();
            let collection_subscription = collection.changed().subscribe(move |change| {
                if let Some(node) = on_change.upgrade() {
                    node.on_collection_changed(change);
                }
            });
            let value_changed = Rc::new(ChangeEvent::new());
            let member_subscriptions = collection
                .nodes()
                .iter()
                .map(|member| (node_address(member), forward(member, &value_changed)))
                .collect();
            Self {
                collection,
                form,
                value_changed,
                collection_subscription: RefCell::new(Some(collection_subscription)),
                member_subscriptions: RefCell::new(member_subscriptions),
            }
        })
    }

    pub fn collection(&self) -> &Rc<ModifierNodeCollection> {
        &self.collection
    }

    /// The value of every member, in collection order.
    pub fn values(&self) -> CalcResult<Vec<Option<NodeValue>>> {
        self.collection.nodes().iter().map(|node| node.value()).collect()
    }

    /// Number of listeners attached to this node.
    pub fn subscriber_count(&self) -> usize {
        self.value_changed.subscriber_count()
    }

    fn on_collection_changed(&self, change: &CollectionChange) {
        {
            let mut subscriptions = self.member_subscriptions.borrow_mut();
            match change {
                CollectionChange::Added(node) => {
                    subscriptions.push((node_address(node), forward(node, &self.value_changed)));
                }
                CollectionChange::Removed(node) => {
                    let address = node_address(node);
                    if let Some(index) = subscriptions.iter().position(|(a, _)| *a == address) {
                        subscriptions.remove(index);
                    }
                }
                CollectionChange::Reset => {
                    subscriptions.clear();
                    for node in self.collection.nodes() {
                        subscriptions.push((node_address(&node), forward(&node, &self.value_changed)));
                    }
                }
            }
        }
        self.value_changed.notify();
    }
}

fn forward(member: &Rc<dyn CalculationNode>, target: &Rc<ChangeEvent>) -> Subscription {
    let target = Rc::downgrade(target);
    member.value_changed().subscribe(move |_| {
        if let Some(target) = target.upgrade() {
            target.notify();
        }
    })
}

impl CalculationNode for AggregatingNode {
    fn value(&self) -> CalcResult<Option<NodeValue>> {
        aggregate(self.form, &self.values()?)
    }

    fn value_changed(&self) -> &Rc<ChangeEvent> {
        &self.value_changed
    }

    fn dispose(&self) {
        self.collection_subscription.borrow_mut().take();
        self.member_subscriptions.borrow_mut().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modifier::Modifier;
    use crate::nodes::NullNode;
    use crate::source::ModifierSource;
    use crate::stat::Stat;
    use std::cell::Cell;

    struct ConstantNode {
        value: NodeValue,
        value_changed: Rc<ChangeEvent>,
    }

    fn constant(value: f64) -> Rc<ConstantNode> {
        Rc::new(ConstantNode {
            value: NodeValue::from(value),
            value_changed: Rc::new(ChangeEvent::new()),
        })
    }

    impl CalculationNode for ConstantNode {
        fn value(&self) -> CalcResult<Option<NodeValue>> {
            Ok(Some(self.value))
        }

        fn value_changed(&self) -> &Rc<ChangeEvent> {
            &self.value_changed
        }
    }

    fn modifier(value: f64) -> Modifier {
        Modifier::constant(vec![Stat::new("Life")], Form::Increase, value, ModifierSource::Global)
    }

    #[test]
    fn test_aggregates_members() {
        let collection = Rc::new(ModifierNodeCollection::new());
        collection.add(constant(20.0), modifier(20.0));
        let node = AggregatingNode::new(collection.clone(), Form::Increase);
        collection.add(constant(10.0), modifier(10.0));

        assert_eq!(node.value().unwrap(), Some(NodeValue::from(0.3)));
        assert_eq!(node.values().unwrap().len(), 2);
    }

    #[test]
    fn test_follows_member_and_structure_changes() {
        let collection = Rc::new(ModifierNodeCollection::new());
        let node = AggregatingNode::new(collection.clone(), Form::BaseAdd);
        let notifications = Rc::new(Cell::new(0));
        let n = notifications.clone();
        let _subscription = node.value_changed().subscribe(move |_| n.set(n.get() + 1));

        let member = constant(5.0);
        let added = modifier(5.0);
        collection.add(member.clone(), added.clone());
        assert_eq!(notifications.get(), 1);
        assert_eq!(member.value_changed.subscriber_count(), 1);

        member.value_changed.notify();
        assert_eq!(notifications.get(), 2);

        collection.remove(&added);
        assert_eq!(notifications.get(), 3);
        assert_eq!(member.value_changed.subscriber_count(), 0);
    }

    #[test]
    fn test_reset_resubscribes_and_dispose_releases() {
        let collection = Rc::new(ModifierNodeCollection::new());
        let member = constant(5.0);
        collection.add(member.clone(), modifier(5.0));
        let node = AggregatingNode::new(collection.clone(), Form::BaseAdd);
        assert_eq!(member.value_changed.subscriber_count(), 1);

        collection.clear();
        assert_eq!(member.value_changed.subscriber_count(), 0);
        collection.add(Rc::new(NullNode::new()), modifier(1.0));
        assert_eq!(node.value().unwrap(), None);

        node.dispose();
        assert_eq!(collection.changed().subscriber_count(), 0);
    }
}
