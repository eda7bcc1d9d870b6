//! Node repository.
//!
//! Owns the subgraph of every stat: its calculation nodes keyed by
//! `(node type, path)`, its modifier collections keyed by `(form, path)`
//! and its path set. Nodes are created on first request and shared
//! afterwards, so a `(stat, node type, path)` triple always resolves to
//! the same node.

use crate::behavior::ValueTransformer;
use crate::collection::{ModifierNodeCollection, PathSet};
use crate::core_values::core_value;
use crate::event::EventBuffer;
use crate::graph::DependencyGraph;
use crate::modifier::Modifier;
use crate::node_type::{Form, NodeType};
use crate::nodes::{
    AggregatingNode, CachingNode, CachingNodeAdapter, CalculationNode, DependencyKey, NodeKey, NodeResolver,
    NullNode, SubscriberCountingNode, ValueNode,
};
use crate::path::PathDefinition;
use crate::registry::ExplicitRegistry;
use crate::stat::Stat;
use crate::transformable::TransformableValue;
use indexmap::IndexMap;
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

#[derive(Clone)]
struct NodeEntry {
    value_node: Rc<ValueNode>,
    caching: Rc<CachingNode>,
    adapter: Rc<CachingNodeAdapter>,
}

impl NodeEntry {
    fn is_unused(&self) -> bool {
        self.caching.internal_subscriber_count() == 0 && self.caching.external_subscriber_count() == 0
    }
}

#[derive(Clone)]
struct FormEntry {
    collection: Rc<ModifierNodeCollection>,
    aggregating: Rc<AggregatingNode>,
    modifier_nodes: Rc<RefCell<Vec<(Modifier, Rc<ValueNode>)>>>,
}

/// The nodes, modifier collections and paths of one stat.
pub struct StatSubgraph {
    stat: Stat,
    nodes: RefCell<IndexMap<(NodeType, PathDefinition), NodeEntry>>,
    collections: RefCell<IndexMap<(Form, PathDefinition), FormEntry>>,
    modifier_count: Cell<usize>,
    paths: Rc<PathSet>,
}

impl StatSubgraph {
    fn new(stat: Stat) -> Self {
        Self {
            stat,
            nodes: RefCell::new(IndexMap::new()),
            collections: RefCell::new(IndexMap::new()),
            modifier_count: Cell::new(0),
            paths: Rc::new(PathSet::new()),
        }
    }

    pub fn stat(&self) -> &Stat {
        &self.stat
    }

    pub fn paths(&self) -> &Rc<PathSet> {
        &self.paths
    }

    /// Number of calculation nodes, modifier nodes excluded.
    pub fn node_count(&self) -> usize {
        self.nodes.borrow().len()
    }

    pub fn collection_count(&self) -> usize {
        self.collections.borrow().len()
    }

    /// Number of registered modifiers targeting the stat.
    pub fn modifier_count(&self) -> usize {
        self.modifier_count.get()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.borrow().is_empty() && self.collections.borrow().is_empty()
    }
}

/// Creates, shares and disposes the nodes of every stat.
///
/// The repository resolves the reads of its own nodes. Nodes hold it
/// weakly, so dropping the repository releases the whole graph.
pub struct NodeRepository {
    self_weak: Weak<NodeRepository>,
    buffer: Rc<EventBuffer>,
    transformer: ValueTransformer,
    registry: ExplicitRegistry,
    graphs: RefCell<IndexMap<Stat, Rc<StatSubgraph>>>,
}

impl NodeRepository {
    /// An empty repository whose caching nodes raise their external
    /// notifications through `buffer`.
    pub fn new(buffer: Rc<EventBuffer>) -> Rc<Self> {
        Rc::new_cyclic(|self_weak| Self {
            self_weak: self_weak.clone(),
            buffer,
            transformer: ValueTransformer::default(),
            registry: ExplicitRegistry::new(),
            graphs: RefCell::new(IndexMap::new()),
        })
    }

    pub fn buffer(&self) -> &Rc<EventBuffer> {
        &self.buffer
    }

    pub fn transformer(&self) -> &ValueTransformer {
        &self.transformer
    }

    pub fn registry(&self) -> &ExplicitRegistry {
        &self.registry
    }

    /// Every stat that currently has a subgraph, in creation order.
    pub fn stats(&self) -> Vec<Stat> {
        self.graphs.borrow().keys().cloned().collect()
    }

    pub fn subgraph(&self, stat: &Stat) -> Option<Rc<StatSubgraph>> {
        self.graphs.borrow().get(stat).cloned()
    }

    /// The caching node `(stat, node_type, path)`, created if missing.
    ///
    /// Path independent node types live on the main path whatever `path`
    /// is passed.
    pub fn caching_node(&self, stat: &Stat, node_type: NodeType, path: &PathDefinition) -> Rc<CachingNode> {
        self.node_entry(stat, node_type, path).caching
    }

    /// Like [`NodeResolver::node`], but an absent stat yields a node that
    /// is always absent.
    pub fn optional_node(
        &self,
        stat: Option<&Stat>,
        node_type: NodeType,
        path: &PathDefinition,
    ) -> Rc<dyn CalculationNode> {
        match stat {
            Some(stat) => self.node(stat, node_type, path),
            None => Rc::new(NullNode::new()),
        }
    }

    /// Register `modifier` with the collections of each of its stats.
    pub fn add_modifier(&self, modifier: &Modifier) {
        let path = PathDefinition::new(modifier.source().canonical().clone());
        for stat in modifier.stats() {
            let entry = self.form_entry(stat, modifier.form(), &path);
            let label = format!("{} {} modifier from {}", stat, modifier.form(), modifier.source());
            let value_node = Rc::new(ValueNode::new(modifier.value().clone(), self.resolver(), path.clone()));
            let caching = CachingNode::new(value_node.clone(), self.buffer.clone(), label);
            entry.modifier_nodes.borrow_mut().push((modifier.clone(), value_node));
            entry
                .collection
                .add(Rc::new(CachingNodeAdapter::new(caching)), modifier.clone());
            let graph = self.subgraph_or_create(stat);
            graph.modifier_count.set(graph.modifier_count.get() + 1);
        }
        tracing::debug!(?modifier, "modifier added");
    }

    /// Unregister `modifier`. Returns whether it was registered.
    pub fn remove_modifier(&self, modifier: &Modifier) -> bool {
        let path = PathDefinition::new(modifier.source().canonical().clone());
        let mut removed = false;
        for stat in modifier.stats() {
            let Some(graph) = self.subgraph(stat) else {
                continue;
            };
            let entry = graph.collections.borrow().get(&(modifier.form(), path.clone())).cloned();
            let Some(entry) = entry else {
                continue;
            };
            if let Some(node) = entry.collection.remove(modifier) {
                {
                    let mut modifier_nodes = entry.modifier_nodes.borrow_mut();
                    if let Some(index) = modifier_nodes.iter().position(|(m, _)| m == modifier) {
                        modifier_nodes.remove(index);
                    }
                }
                node.dispose();
                graph.modifier_count.set(graph.modifier_count.get().saturating_sub(1));
                removed = true;
            }
        }
        if removed {
            tracing::debug!(?modifier, "modifier removed");
        }
        removed
    }

    /// Dispose every node nothing listens to, on stats without modifiers.
    ///
    /// Runs until a pass removes nothing, since disposing a node releases
    /// the nodes it read. Returns the number of removed nodes, collections
    /// and subgraphs.
    pub fn remove_unused_nodes(&self) -> usize {
        let mut removed = 0;
        loop {
            let pass = self.prune_pass();
            if pass == 0 {
                break;
            }
            removed += pass;
        }
        if removed > 0 {
            tracing::debug!(removed, stats = self.graphs.borrow().len(), "pruned unused nodes");
        }
        removed
    }

    /// Snapshot of the dependencies every node recorded in its last
    /// evaluation.
    pub fn dependency_graph(&self) -> DependencyGraph {
        let mut dependencies = DependencyGraph::new();
        for graph in self.graphs.borrow().values() {
            let stat = graph.stat.key();
            for ((node_type, path), entry) in graph.nodes.borrow().iter() {
                let key = DependencyKey::Node(NodeKey {
                    stat: stat.clone(),
                    node_type: *node_type,
                    path: path.clone(),
                });
                dependencies.add_node(key.clone());
                for dependency in entry.value_node.dependencies() {
                    dependencies.add_edge(key.clone(), dependency);
                }
            }
            // A collection changes with whatever its modifiers read.
            for ((form, path), entry) in graph.collections.borrow().iter() {
                let key = DependencyKey::FormCollection {
                    stat: stat.clone(),
                    form: *form,
                    path: path.clone(),
                };
                dependencies.add_node(key.clone());
                for (_, node) in entry.modifier_nodes.borrow().iter() {
                    for dependency in node.dependencies() {
                        dependencies.add_edge(key.clone(), dependency);
                    }
                }
            }
        }
        dependencies
    }

    fn resolver(&self) -> Weak<dyn NodeResolver> {
        self.self_weak.clone()
    }

    fn subgraph_or_create(&self, stat: &Stat) -> Rc<StatSubgraph> {
        if let Some(graph) = self.subgraph(stat) {
            return graph;
        }
        let graph = Rc::new(StatSubgraph::new(stat.clone()));
        self.graphs.borrow_mut().insert(stat.clone(), graph.clone());
        tracing::debug!(%stat, behaviors = stat.behaviors().len(), "stat subgraph created");
        self.transformer.add_behaviors(stat.behaviors());
        if stat.is_explicitly_registered() {
            let total = self.caching_node(stat, NodeType::Total, &PathDefinition::main());
            self.registry.add(stat, total);
        }
        graph
    }

    fn node_entry(&self, stat: &Stat, node_type: NodeType, path: &PathDefinition) -> NodeEntry {
        let path = if node_type.is_path_dependent() {
            path.clone()
        } else {
            PathDefinition::main()
        };
        let graph = self.subgraph_or_create(stat);
        if let Some(entry) = graph.nodes.borrow().get(&(node_type, path.clone())) {
            return entry.clone();
        }

        let key = NodeKey {
            stat: stat.key().clone(),
            node_type,
            path: path.clone(),
        };
        let transformable = Rc::new(TransformableValue::new(core_value(graph.stat(), node_type)));
        let value_node = Rc::new(ValueNode::transformable(transformable.clone(), self.resolver(), path.clone()));
        let caching = CachingNode::new(value_node.clone(), self.buffer.clone(), key.to_string());
        let adapter = Rc::new(CachingNodeAdapter::new(caching.clone()));
        let entry = NodeEntry {
            value_node,
            caching,
            adapter,
        };
        graph.nodes.borrow_mut().insert((node_type, path.clone()), entry.clone());
        if node_type.is_path_dependent() {
            graph.paths.add(&path);
        }
        self.transformer.add_value(stat.key(), node_type, &path, &transformable);
        entry
    }

    fn form_entry(&self, stat: &Stat, form: Form, path: &PathDefinition) -> FormEntry {
        let graph = self.subgraph_or_create(stat);
        if let Some(entry) = graph.collections.borrow().get(&(form, path.clone())) {
            return entry.clone();
        }
        let collection = Rc::new(ModifierNodeCollection::new());
        let aggregating = AggregatingNode::new(collection.clone(), form);
        let entry = FormEntry {
            collection,
            aggregating,
            modifier_nodes: Rc::new(RefCell::new(Vec::new())),
        };
        graph.collections.borrow_mut().insert((form, path.clone()), entry.clone());
        graph.paths.add(path);
        entry
    }

    fn prune_pass(&self) -> usize {
        let graphs: Vec<Rc<StatSubgraph>> = self.graphs.borrow().values().cloned().collect();
        let mut removed = 0;
        for graph in graphs {
            if graph.modifier_count() > 0 {
                continue;
            }
            removed += self.prune_subgraph(&graph);
        }
        removed
    }

    fn prune_subgraph(&self, graph: &StatSubgraph) -> usize {
        let stat = graph.stat();
        let mut removed = 0;

        if let Some(node) = self.registry.node(stat) {
            if node.subscriber_count() == 0 {
                self.registry.remove(stat);
            }
        }

        for node_type in NodeType::ALL {
            let unused: Vec<(PathDefinition, NodeEntry)> = graph
                .nodes
                .borrow()
                .iter()
                .filter(|((nt, _), entry)| *nt == node_type && entry.is_unused())
                .map(|((_, path), entry)| (path.clone(), entry.clone()))
                .collect();
            for (path, entry) in unused {
                graph.nodes.borrow_mut().shift_remove(&(node_type, path.clone()));
                entry.adapter.dispose();
                self.transformer.remove_value(stat.key(), node_type, &path);
                if node_type.is_path_dependent() {
                    graph.paths.remove(&path);
                }
                removed += 1;
            }
        }

        let unused: Vec<((Form, PathDefinition), FormEntry)> = graph
            .collections
            .borrow()
            .iter()
            .filter(|(_, entry)| entry.collection.is_empty() && entry.aggregating.subscriber_count() == 0)
            .map(|(key, entry)| (key.clone(), entry.clone()))
            .collect();
        for (key, entry) in unused {
            graph.collections.borrow_mut().shift_remove(&key);
            for node in entry.collection.clear() {
                node.dispose();
            }
            entry.aggregating.dispose();
            graph.paths.remove(&key.1);
            removed += 1;
        }

        if graph.is_empty() {
            self.graphs.borrow_mut().shift_remove(stat);
            self.registry.remove(stat);
            self.transformer.remove_behaviors(stat.behaviors());
            tracing::debug!(%stat, "stat subgraph removed");
            removed += 1;
        }
        removed
    }
}

impl NodeResolver for NodeRepository {
    fn node(&self, stat: &Stat, node_type: NodeType, path: &PathDefinition) -> Rc<dyn CalculationNode> {
        self.node_entry(stat, node_type, path).adapter
    }

    fn form_node(&self, stat: &Stat, form: Form, path: &PathDefinition) -> Rc<AggregatingNode> {
        self.form_entry(stat, form, path).aggregating
    }

    fn path_set(&self, stat: &Stat) -> Rc<PathSet> {
        self.subgraph_or_create(stat).paths.clone()
    }
}
