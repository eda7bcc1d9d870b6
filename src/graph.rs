//! Dependency graph inspection.
//!
//! The live graph tracks its dependencies through subscriptions, which
//! are not navigable. [`DependencyGraph`] is a snapshot of the recorded
//! dependency edges as a directed graph, for answering "what does this
//! read" and "what would a change here invalidate".

use crate::error::CalculationError;
use crate::nodes::DependencyKey;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use std::collections::{HashMap, HashSet};

/// A directed graph of dependencies between nodes, form collections and
/// path sets.
///
/// Edges point from a dependency to its dependent. If A depends on B,
/// B comes before A in the evaluation order.
///
/// # Examples
///
/// ```rust
/// use statgraph::graph::DependencyGraph;
/// use statgraph::nodes::{DependencyKey, NodeKey};
/// use statgraph::{Entity, NodeType, PathDefinition, StatKey};
///
/// let node = |node_type| DependencyKey::Node(NodeKey {
///     stat: StatKey::new("Life", Entity::Character),
///     node_type,
///     path: PathDefinition::main(),
/// });
///
/// let mut graph = DependencyGraph::new();
/// // Total depends on Subtotal
/// graph.add_edge(node(NodeType::Total), node(NodeType::Subtotal));
///
/// let order = graph.evaluation_order().unwrap();
/// assert_eq!(order, vec![node(NodeType::Subtotal), node(NodeType::Total)]);
/// ```
pub struct DependencyGraph {
    graph: DiGraph<DependencyKey, ()>,
    node_map: HashMap<DependencyKey, NodeIndex>,
}

impl DependencyGraph {
    /// Create a new empty graph.
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            node_map: HashMap::new(),
        }
    }

    /// Add a node to the graph if it doesn't exist.
    ///
    /// Returns the index of the new or existing node.
    pub fn add_node(&mut self, key: DependencyKey) -> NodeIndex {
        if let Some(&idx) = self.node_map.get(&key) {
            idx
        } else {
            let idx = self.graph.add_node(key.clone());
            self.node_map.insert(key, idx);
            idx
        }
    }

    /// Add an edge representing a dependency.
    ///
    /// `from` depends on `to`. Both nodes are added if they don't exist.
    pub fn add_edge(&mut self, from: DependencyKey, to: DependencyKey) {
        let from_idx = self.add_node(from);
        let to_idx = self.add_node(to);
        if !self.graph.contains_edge(to_idx, from_idx) {
            self.graph.add_edge(to_idx, from_idx, ());
        }
    }

    /// What `key` directly depends on.
    pub fn dependencies_of(&self, key: &DependencyKey) -> Vec<DependencyKey> {
        let Some(&idx) = self.node_map.get(key) else {
            return Vec::new();
        };
        self.graph
            .neighbors_directed(idx, Direction::Incoming)
            .map(|n| self.graph[n].clone())
            .collect()
    }

    /// Everything that directly or transitively depends on `key`: what a
    /// change of `key` invalidates.
    pub fn dependents_of(&self, key: &DependencyKey) -> Vec<DependencyKey> {
        let Some(&start) = self.node_map.get(key) else {
            return Vec::new();
        };
        let mut visited = HashSet::new();
        let mut stack = vec![start];
        let mut dependents = Vec::new();

        while let Some(idx) = stack.pop() {
            for neighbor in self.graph.neighbors_directed(idx, Direction::Outgoing) {
                if visited.insert(neighbor) {
                    dependents.push(self.graph[neighbor].clone());
                    stack.push(neighbor);
                }
            }
        }

        dependents
    }

    /// Detect cycles in the graph.
    ///
    /// Uses depth-first search. A found cycle is reported as a
    /// [`CalculationError::Cycle`] whose path starts and ends with the
    /// same key.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use statgraph::graph::DependencyGraph;
    /// use statgraph::nodes::DependencyKey;
    /// use statgraph::{Entity, StatKey};
    ///
    /// let a = DependencyKey::Paths(StatKey::new("A", Entity::Character));
    /// let b = DependencyKey::Paths(StatKey::new("B", Entity::Character));
    ///
    /// let mut graph = DependencyGraph::new();
    /// graph.add_edge(b.clone(), a.clone());
    /// assert!(graph.detect_cycles().is_ok());
    ///
    /// graph.add_edge(a, b);
    /// assert!(graph.detect_cycles().is_err());
    /// ```
    pub fn detect_cycles(&self) -> Result<(), CalculationError> {
        let mut visited = HashSet::new();
        let mut rec_stack = HashSet::new();

        for node_idx in self.graph.node_indices() {
            if !visited.contains(&node_idx) {
                let mut cycle_path = Vec::new();
                if let Some(cycle) = self.dfs_cycle_detect(node_idx, &mut visited, &mut rec_stack, &mut cycle_path) {
                    return Err(cycle);
                }
            }
        }

        Ok(())
    }

    fn dfs_cycle_detect(
        &self,
        node: NodeIndex,
        visited: &mut HashSet<NodeIndex>,
        rec_stack: &mut HashSet<NodeIndex>,
        cycle_path: &mut Vec<NodeIndex>,
    ) -> Option<CalculationError> {
        visited.insert(node);
        rec_stack.insert(node);
        cycle_path.push(node);

        for neighbor in self.graph.neighbors_directed(node, Direction::Outgoing) {
            if !visited.contains(&neighbor) {
                if let Some(cycle) = self.dfs_cycle_detect(neighbor, visited, rec_stack, cycle_path) {
                    return Some(cycle);
                }
            } else if rec_stack.contains(&neighbor) {
                // Only the part of the path from the neighbor on is the cycle.
                let start = cycle_path.iter().position(|&idx| idx == neighbor).unwrap_or(0);
                let path = cycle_path[start..]
                    .iter()
                    .chain(std::iter::once(&neighbor))
                    .map(|&idx| self.graph[idx].to_string())
                    .collect();
                return Some(CalculationError::Cycle { path });
            }
        }

        rec_stack.remove(&node);
        cycle_path.pop();
        None
    }

    /// Every key, dependencies before dependents.
    pub fn evaluation_order(&self) -> Result<Vec<DependencyKey>, CalculationError> {
        self.detect_cycles()?;

        match toposort(&self.graph, None) {
            Ok(indices) => Ok(indices.into_iter().map(|idx| self.graph[idx].clone()).collect()),
            Err(cycle) => Err(CalculationError::Cycle {
                path: vec![self.graph[cycle.node_id()].to_string()],
            }),
        }
    }

    /// Get all keys in the graph.
    pub fn nodes(&self) -> Vec<DependencyKey> {
        self.graph
            .node_indices()
            .map(|idx| self.graph[idx].clone())
            .collect()
    }

    pub fn contains_node(&self, key: &DependencyKey) -> bool {
        self.node_map.contains_key(key)
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }
}

impl Default for DependencyGraph {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stat::{Entity, StatKey};

    fn key(id: &str) -> DependencyKey {
        DependencyKey::Paths(StatKey::new(id, Entity::Character))
    }

    #[test]
    fn test_graph_add_nodes() {
        let mut graph = DependencyGraph::new();
        let life = key("Life");

        let idx1 = graph.add_node(life.clone());
        let idx2 = graph.add_node(life.clone());

        assert_eq!(idx1, idx2);
        assert!(graph.contains_node(&life));
        assert!(!graph.contains_node(&key("Damage")));
        assert_eq!(graph.nodes().len(), 1);
    }

    #[test]
    fn test_duplicate_edges_are_ignored() {
        let mut graph = DependencyGraph::new();
        graph.add_edge(key("Damage"), key("Strength"));
        graph.add_edge(key("Damage"), key("Strength"));
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn test_dependencies_and_dependents() {
        let mut graph = DependencyGraph::new();
        // Strength <- Damage <- Dps, Life unrelated
        graph.add_edge(key("Damage"), key("Strength"));
        graph.add_edge(key("Dps"), key("Damage"));
        graph.add_node(key("Life"));

        assert_eq!(graph.dependencies_of(&key("Dps")), vec![key("Damage")]);
        let dependents = graph.dependents_of(&key("Strength"));
        assert_eq!(dependents.len(), 2);
        assert!(dependents.contains(&key("Damage")));
        assert!(dependents.contains(&key("Dps")));
        assert!(graph.dependents_of(&key("Life")).is_empty());
        assert!(graph.dependents_of(&key("Missing")).is_empty());
    }

    #[test]
    fn test_evaluation_order() {
        let mut graph = DependencyGraph::new();
        graph.add_edge(key("Damage"), key("Strength"));
        graph.add_edge(key("Accuracy"), key("Dexterity"));

        let sorted = graph.evaluation_order().unwrap();
        let pos = |k: &str| sorted.iter().position(|s| s == &key(k)).unwrap();

        assert!(pos("Strength") < pos("Damage"));
        assert!(pos("Dexterity") < pos("Accuracy"));
    }

    #[test]
    fn test_cycle_path_excludes_non_cycle_nodes() {
        let mut graph = DependencyGraph::new();
        // X -> Y -> A -> B -> C -> A
        graph.add_edge(key("Y"), key("X"));
        graph.add_edge(key("A"), key("Y"));
        graph.add_edge(key("B"), key("A"));
        graph.add_edge(key("C"), key("B"));
        graph.add_edge(key("A"), key("C"));

        match graph.detect_cycles() {
            Err(CalculationError::Cycle { path }) => {
                assert_eq!(path.len(), 4);
                assert_eq!(path[0], path[3]);
                assert!(!path.iter().any(|p| p.starts_with('X') || p.starts_with('Y')));
            }
            other => panic!("Expected Cycle error, got {:?}", other),
        }
        assert!(graph.evaluation_order().is_err());
    }

    #[test]
    fn test_self_cycle() {
        let mut graph = DependencyGraph::new();
        graph.add_edge(key("A"), key("A"));

        match graph.detect_cycles() {
            Err(CalculationError::Cycle { path }) => assert_eq!(path, vec!["A paths", "A paths"]),
            other => panic!("Expected Cycle error, got {:?}", other),
        }
    }
}
