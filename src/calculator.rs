//! Calculator module.
//!
//! Provides the `Calculator` type, the entry point hosts use: it applies
//! modifier updates to the node repository and reads stat values back.

use crate::config::CalculatorConfig;
use crate::error::CalcResult;
use crate::event::{Event, EventBuffer};
use crate::graph::DependencyGraph;
use crate::modifier::Modifier;
use crate::node_type::NodeType;
use crate::node_value::NodeValue;
use crate::nodes::{CachingNode, CalculationNode, NodeResolver, WrappingNode};
use crate::path::PathDefinition;
use crate::registry::RegistryChange;
use crate::repository::NodeRepository;
use crate::snapshot::{PathSnapshot, StatSnapshot};
use crate::stat::Stat;
use std::rc::Rc;

/// A batch of modifier changes.
///
/// Removals are applied before additions, so a modifier can be replaced
/// in one update.
#[derive(Debug, Default)]
pub struct CalculatorUpdate {
    pub added: Vec<Modifier>,
    pub removed: Vec<Modifier>,
}

impl CalculatorUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `modifier` to the batch.
    pub fn add(mut self, modifier: Modifier) -> Self {
        self.added.push(modifier);
        self
    }

    /// Remove `modifier` in the batch.
    pub fn remove(mut self, modifier: Modifier) -> Self {
        self.removed.push(modifier);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Computes stat values from registered modifiers.
///
/// Values are computed on demand and cached. A modifier change only
/// invalidates the nodes that read it; the next read recomputes them.
///
/// # Examples
///
/// ```rust
/// use statgraph::{Calculator, Form, Modifier, ModifierSource, NodeValue, Stat};
///
/// let calculator = Calculator::new();
/// let life = Stat::new("Life");
///
/// calculator.add_modifier(Modifier::constant(vec![life.clone()], Form::BaseAdd, 100.0, ModifierSource::Global));
/// calculator.add_modifier(Modifier::constant(vec![life.clone()], Form::Increase, 20.0, ModifierSource::Global));
/// assert_eq!(calculator.total(&life).unwrap(), Some(NodeValue::from(120.0)));
///
/// calculator.add_modifier(Modifier::constant(vec![life.clone()], Form::Increase, 10.0, ModifierSource::Global));
/// assert_eq!(calculator.total(&life).unwrap(), Some(NodeValue::from(130.0)));
/// ```
pub struct Calculator {
    config: CalculatorConfig,
    buffer: Rc<EventBuffer>,
    repository: Rc<NodeRepository>,
}

impl Calculator {
    /// Create a calculator with the default configuration.
    pub fn new() -> Self {
        Self::with_config(CalculatorConfig::default())
    }

    /// Create a calculator with `config`.
    pub fn with_config(config: CalculatorConfig) -> Self {
        let buffer = Rc::new(EventBuffer::with_buffering(config.buffer_events));
        let repository = NodeRepository::new(buffer.clone());
        Self {
            config,
            buffer,
            repository,
        }
    }

    pub fn config(&self) -> &CalculatorConfig {
        &self.config
    }

    /// The repository holding every node.
    pub fn repository(&self) -> &Rc<NodeRepository> {
        &self.repository
    }

    /// Apply a batch of modifier changes.
    ///
    /// External change notifications raised meanwhile are delivered once
    /// the whole batch is applied. Unused nodes are pruned afterwards if
    /// the configuration says so.
    pub fn update(&self, update: CalculatorUpdate) {
        if update.is_empty() {
            return;
        }
        tracing::debug!(
            added = update.added.len(),
            removed = update.removed.len(),
            "applying update"
        );
        self.buffer.buffer(|| {
            for modifier in &update.removed {
                self.repository.remove_modifier(modifier);
            }
            for modifier in &update.added {
                self.repository.add_modifier(modifier);
            }
        });
        if self.config.prune_after_update {
            self.repository.remove_unused_nodes();
        }
    }

    /// Register a single modifier.
    pub fn add_modifier(&self, modifier: Modifier) {
        self.update(CalculatorUpdate::new().add(modifier));
    }

    /// Unregister a single modifier.
    pub fn remove_modifier(&self, modifier: Modifier) {
        self.update(CalculatorUpdate::new().remove(modifier));
    }

    /// Run `f` with external change notifications held back until it
    /// returns.
    pub fn batch<R>(&self, f: impl FnOnce() -> R) -> R {
        self.buffer.buffer(f)
    }

    /// The Total of `stat`.
    pub fn total(&self, stat: &Stat) -> CalcResult<Option<NodeValue>> {
        self.node_value(stat, NodeType::Total, &PathDefinition::main())
    }

    /// The value of node `(stat, node_type, path)`.
    pub fn node_value(&self, stat: &Stat, node_type: NodeType, path: &PathDefinition) -> CalcResult<Option<NodeValue>> {
        self.node(stat, node_type, path).value()
    }

    /// The node `(stat, node_type, path)`. Subscribe to its
    /// `value_changed` to follow it; the subscription keeps the node from
    /// being pruned.
    pub fn node(&self, stat: &Stat, node_type: NodeType, path: &PathDefinition) -> Rc<CachingNode> {
        self.repository.caching_node(stat, node_type, path)
    }

    /// The paths `stat` currently has.
    pub fn paths(&self, stat: &Stat) -> Vec<PathDefinition> {
        self.repository.path_set(stat).paths()
    }

    /// The explicitly registered stats, in registration order.
    pub fn explicitly_registered_stats(&self) -> Vec<(Stat, Rc<WrappingNode>)> {
        self.repository.registry().entries()
    }

    /// Raised when a stat is explicitly registered or unregistered.
    pub fn explicitly_registered_stats_changed(&self) -> &Rc<Event<RegistryChange>> {
        self.repository.registry().changed()
    }

    /// Dispose every node nothing listens to on stats without modifiers.
    /// Returns how many nodes, collections and stats were removed.
    pub fn remove_unused_nodes(&self) -> usize {
        self.repository.remove_unused_nodes()
    }

    /// Read back the values of `stat` with a breakdown by path.
    pub fn snapshot(&self, stat: &Stat) -> CalcResult<StatSnapshot> {
        let main = PathDefinition::main();
        let total = self.node_value(stat, NodeType::Total, &main)?;
        let subtotal = self.node_value(stat, NodeType::Subtotal, &main)?;
        let uncapped_subtotal = self.node_value(stat, NodeType::UncappedSubtotal, &main)?;

        let mut paths = Vec::new();
        for path in self.paths(stat) {
            paths.push(PathSnapshot {
                path: path.to_string(),
                path_total: self.node_value(stat, NodeType::PathTotal, &path)?,
                base: self.node_value(stat, NodeType::Base, &path)?,
                increase: self.node_value(stat, NodeType::Increase, &path)?,
                more: self.node_value(stat, NodeType::More, &path)?,
            });
        }

        Ok(StatSnapshot {
            stat: stat.key().clone(),
            total,
            subtotal,
            uncapped_subtotal,
            paths,
        })
    }

    /// The dependencies recorded by every node in its last evaluation.
    pub fn dependency_graph(&self) -> DependencyGraph {
        self.repository.dependency_graph()
    }
}

impl Default for Calculator {
    fn default() -> Self {
        Self::new()
    }
}
