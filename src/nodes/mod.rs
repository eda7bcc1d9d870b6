//! The reactive node layer.
//!
//! Every node exposes its current value and a change notification.
//! [`ValueNode`] evaluates a formula and records what it read,
//! [`CachingNode`] memoizes and guards against cycles,
//! [`AggregatingNode`] follows an observable modifier collection and
//! [`WrappingNode`] gives hosts a stable handle on a stat's total.

mod aggregating;
mod caching;
mod value_node;
mod wrapping;

pub use aggregating::AggregatingNode;
pub use caching::{CachingNode, CachingNodeAdapter, CycleGuard};
pub use value_node::{NodeResolver, ValueNode};
pub use wrapping::WrappingNode;

use crate::error::CalcResult;
use crate::event::ChangeEvent;
use crate::node_type::{Form, NodeType};
use crate::node_value::NodeValue;
use crate::path::PathDefinition;
use crate::stat::StatKey;
use std::fmt;
use std::rc::Rc;

/// A node of the calculation graph.
pub trait CalculationNode {
    /// The node's current value. Absent values are `Ok(None)`.
    fn value(&self) -> CalcResult<Option<NodeValue>>;

    /// Raised whenever the value may have changed.
    fn value_changed(&self) -> &Rc<ChangeEvent>;

    /// Release every subscription the node holds.
    fn dispose(&self) {}
}

/// A node that knows how many listeners are attached to it.
pub trait SubscriberCountingNode: CalculationNode {
    fn subscriber_count(&self) -> usize;
}

/// A node whose value is always absent. Stands in for optional stat
/// references that are not set.
#[derive(Default)]
pub struct NullNode {
    value_changed: Rc<ChangeEvent>,
}

impl NullNode {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CalculationNode for NullNode {
    fn value(&self) -> CalcResult<Option<NodeValue>> {
        Ok(None)
    }

    fn value_changed(&self) -> &Rc<ChangeEvent> {
        &self.value_changed
    }
}

/// Identity of a node within a repository.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct NodeKey {
    pub stat: StatKey,
    pub node_type: NodeType,
    pub path: PathDefinition,
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_main() {
            write!(f, "{} {}", self.stat, self.node_type)
        } else {
            write!(f, "{} {} ({})", self.stat, self.node_type, self.path)
        }
    }
}

/// Anything an evaluation can depend on.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum DependencyKey {
    /// A node's value.
    Node(NodeKey),
    /// The modifiers of one form on one path of a stat.
    FormCollection {
        stat: StatKey,
        form: Form,
        path: PathDefinition,
    },
    /// The set of paths of a stat.
    Paths(StatKey),
}

impl fmt::Display for DependencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DependencyKey::Node(key) => write!(f, "{}", key),
            DependencyKey::FormCollection { stat, form, path } if path.is_main() => {
                write!(f, "{} {} modifiers", stat, form)
            }
            DependencyKey::FormCollection { stat, form, path } => {
                write!(f, "{} {} modifiers ({})", stat, form, path)
            }
            DependencyKey::Paths(stat) => write!(f, "{} paths", stat),
        }
    }
}
