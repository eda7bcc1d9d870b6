//! Evaluates a value against the graph and records what it read.

use crate::collection::PathSet;
use crate::error::{CalcResult, CalculationError};
use crate::event::{ChangeEvent, Subscription};
use crate::node_type::{Form, NodeType};
use crate::node_value::NodeValue;
use crate::nodes::{AggregatingNode, CalculationNode, DependencyKey, NodeKey};
use crate::path::PathDefinition;
use crate::stat::Stat;
use crate::transformable::TransformableValue;
use crate::value::{Value, ValueCalculationContext};
use indexmap::IndexMap;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// Looks up the nodes a formula reads.
///
/// Implemented by the node repository. Lookups create missing nodes, so
/// they cannot fail.
pub trait NodeResolver {
    /// The node `(stat, node_type, path)`.
    fn node(&self, stat: &Stat, node_type: NodeType, path: &PathDefinition) -> Rc<dyn CalculationNode>;

    /// The node following the modifiers of `form` on `(stat, path)`.
    fn form_node(&self, stat: &Stat, form: Form, path: &PathDefinition) -> Rc<AggregatingNode>;

    /// The paths `stat` has nodes or modifiers on.
    fn path_set(&self, stat: &Stat) -> Rc<PathSet>;
}

/// Records every dependency read during one evaluation.
struct RecordingContext<'a> {
    resolver: &'a dyn NodeResolver,
    path: &'a PathDefinition,
    recorded: RefCell<IndexMap<DependencyKey, Weak<ChangeEvent>>>,
}

impl RecordingContext<'_> {
    fn record(&self, key: DependencyKey, event: &Rc<ChangeEvent>) {
        self.recorded
            .borrow_mut()
            .entry(key)
            .or_insert_with(|| Rc::downgrade(event));
    }
}

impl ValueCalculationContext for RecordingContext<'_> {
    fn current_path(&self) -> &PathDefinition {
        self.path
    }

    fn paths(&self, stat: &Stat) -> CalcResult<Vec<PathDefinition>> {
        let paths = self.resolver.path_set(stat);
        self.record(DependencyKey::Paths(stat.key().clone()), paths.changed());
        Ok(paths.paths())
    }

    fn value(
        &self,
        stat: &Stat,
        node_type: NodeType,
        path: &PathDefinition,
    ) -> CalcResult<Option<NodeValue>> {
        let path = if node_type.is_path_dependent() {
            path.clone()
        } else {
            PathDefinition::main()
        };
        let node = self.resolver.node(stat, node_type, &path);
        let key = NodeKey {
            stat: stat.key().clone(),
            node_type,
            path,
        };
        self.record(DependencyKey::Node(key), node.value_changed());
        node.value()
    }

    fn values(
        &self,
        form: Form,
        paths: &[(Stat, PathDefinition)],
    ) -> CalcResult<Vec<Option<NodeValue>>> {
        let mut values = Vec::new();
        for (stat, path) in paths {
            let node = self.resolver.form_node(stat, form, path);
            let key = DependencyKey::FormCollection {
                stat: stat.key().clone(),
                form,
                path: path.clone(),
            };
            self.record(key, node.value_changed());
            values.extend(node.values()?);
        }
        Ok(values)
    }
}

/// A node evaluating a formula, re-discovering its dependencies on every
/// evaluation.
///
/// Each evaluation runs against a recording context. Afterwards the
/// recorded set is diffed against the current subscriptions: stale ones
/// are dropped, new ones added. The node itself does not cache; wrap it
/// in a [`CachingNode`](crate::nodes::CachingNode) for that.
pub struct ValueNode {
    value: Rc<dyn Value>,
    resolver: Weak<dyn NodeResolver>,
    path: PathDefinition,
    subscriptions: RefCell<IndexMap<DependencyKey, (Weak<ChangeEvent>, Subscription)>>,
    trigger: RefCell<Option<Subscription>>,
    value_changed: Rc<ChangeEvent>,
}

impl ValueNode {
    /// A node evaluating `value` on `path`, resolving reads through
    /// `resolver`.
    pub fn new(value: Rc<dyn Value>, resolver: Weak<dyn NodeResolver>, path: PathDefinition) -> Self {
        Self {
            value,
            resolver,
            path,
            subscriptions: RefCell::new(IndexMap::new()),
            trigger: RefCell::new(None),
            value_changed: Rc::new(ChangeEvent::new()),
        }
    }

    /// A node over a transformable formula. Installing or removing a
    /// transformation counts as a change of the node's value.
    pub fn transformable(
        value: Rc<TransformableValue>,
        resolver: Weak<dyn NodeResolver>,
        path: PathDefinition,
    ) -> Self {
        let changed = value.value_changed().clone();
        let node = Self::new(value, resolver, path);
        *node.trigger.borrow_mut() = Some(node.forward_from(&changed));
        node
    }

    pub fn path(&self) -> &PathDefinition {
        &self.path
    }

    /// What the last evaluation read.
    pub fn dependencies(&self) -> Vec<DependencyKey> {
        self.subscriptions.borrow().keys().cloned().collect()
    }

    fn forward_from(&self, event: &Rc<ChangeEvent>) -> Subscription {
        let changed = Rc::downgrade(&self.value_changed);
        event.subscribe(move |_| {
            if let Some(changed) = changed.upgrade() {
                changed.notify();
            }
        })
    }

    fn resubscribe(&self, recorded: IndexMap<DependencyKey, Weak<ChangeEvent>>) {
        let mut subscriptions = self.subscriptions.borrow_mut();
        subscriptions.retain(|key, (event, _)| {
            recorded
                .get(key)
                .is_some_and(|current| Weak::ptr_eq(current, event))
        });
        for (key, event) in recorded {
            if subscriptions.contains_key(&key) {
                continue;
            }
            if let Some(strong) = event.upgrade() {
                let subscription = self.forward_from(&strong);
                subscriptions.insert(key, (event, subscription));
            }
        }
    }
}

impl CalculationNode for ValueNode {
    fn value(&self) -> CalcResult<Option<NodeValue>> {
        let resolver = self
            .resolver
            .upgrade()
            .ok_or(CalculationError::GraphReleased)?;
        let context = RecordingContext {
            resolver: &*resolver,
            path: &self.path,
            recorded: RefCell::new(IndexMap::new()),
        };
        let result = self.value.calculate(&context);
        self.resubscribe(context.recorded.into_inner());
        result
    }

    fn value_changed(&self) -> &Rc<ChangeEvent> {
        &self.value_changed
    }

    fn dispose(&self) {
        self.subscriptions.borrow_mut().clear();
        self.trigger.borrow_mut().take();
    }
}
