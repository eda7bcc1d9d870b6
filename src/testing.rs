//! An in-memory [`ValueCalculationContext`] for exercising formulas and
//! behaviors without building a graph.

use crate::error::CalcResult;
use crate::node_type::{Form, NodeType};
use crate::node_value::NodeValue;
use crate::path::PathDefinition;
use crate::stat::{Stat, StatKey};
use crate::value::ValueCalculationContext;
use std::collections::HashMap;

/// A context answering from fixed tables. Anything not in a table is
/// absent: no paths, no value, no modifiers.
#[derive(Debug, Clone, Default)]
pub struct MockContext {
    current_path: PathDefinition,
    paths: HashMap<StatKey, Vec<PathDefinition>>,
    values: HashMap<(StatKey, NodeType, PathDefinition), NodeValue>,
    form_values: HashMap<(Form, StatKey, PathDefinition), Vec<Option<NodeValue>>>,
}

impl MockContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Evaluate as if the node being computed were on `path`.
    pub fn at_path(mut self, path: PathDefinition) -> Self {
        self.current_path = path;
        self
    }

    pub fn with_paths(mut self, stat: &Stat, paths: Vec<PathDefinition>) -> Self {
        self.paths.insert(stat.key().clone(), paths);
        self
    }

    pub fn with_value(
        mut self,
        stat: &Stat,
        node_type: NodeType,
        path: PathDefinition,
        value: impl Into<NodeValue>,
    ) -> Self {
        self.values
            .insert((stat.key().clone(), node_type, path), value.into());
        self
    }

    pub fn with_form_values(mut self, form: Form, stat: &Stat, path: PathDefinition, values: &[f64]) -> Self {
        self.form_values.insert(
            (form, stat.key().clone(), path),
            values.iter().map(|v| Some(NodeValue::from(*v))).collect(),
        );
        self
    }
}

impl ValueCalculationContext for MockContext {
    fn current_path(&self) -> &PathDefinition {
        &self.current_path
    }

    fn paths(&self, stat: &Stat) -> CalcResult<Vec<PathDefinition>> {
        Ok(self.paths.get(stat.key()).cloned().unwrap_or_default())
    }

    fn value(
        &self,
        stat: &Stat,
        node_type: NodeType,
        path: &PathDefinition,
    ) -> CalcResult<Option<NodeValue>> {
        Ok(self
            .values
            .get(&(stat.key().clone(), node_type, path.clone()))
            .copied())
    }

    fn values(
        &self,
        form: Form,
        paths: &[(Stat, PathDefinition)],
    ) -> CalcResult<Vec<Option<NodeValue>>> {
        Ok(paths
            .iter()
            .flat_map(|(stat, path)| {
                self.form_values
                    .get(&(form, stat.key().clone(), path.clone()))
                    .cloned()
                    .unwrap_or_default()
            })
            .collect())
    }
}
