//! The formula layer.
//!
//! A [`Value`] is a pure function of a [`ValueCalculationContext`]. The
//! context is the only way a formula can read other nodes, which lets the
//! graph record exactly what each evaluation depended on and lets
//! behaviors rewrite what a formula sees.

use crate::error::CalcResult;
use crate::node_type::{Form, NodeType};
use crate::node_value::NodeValue;
use crate::path::PathDefinition;
use crate::stat::Stat;
use std::fmt;
use std::rc::Rc;

/// Read access to the graph during one evaluation.
pub trait ValueCalculationContext {
    /// The path of the node being evaluated.
    fn current_path(&self) -> &PathDefinition;

    /// The paths `stat` currently has values on.
    fn paths(&self, stat: &Stat) -> CalcResult<Vec<PathDefinition>>;

    /// The value of node `(stat, node_type, path)`.
    fn value(
        &self,
        stat: &Stat,
        node_type: NodeType,
        path: &PathDefinition,
    ) -> CalcResult<Option<NodeValue>>;

    /// The values of every modifier of `form` registered on each
    /// `(stat, path)` pair, in pair order.
    fn values(
        &self,
        form: Form,
        paths: &[(Stat, PathDefinition)],
    ) -> CalcResult<Vec<Option<NodeValue>>>;

    /// The total of `stat`.
    fn total(&self, stat: &Stat) -> CalcResult<Option<NodeValue>> {
        self.value(stat, NodeType::Total, &PathDefinition::main())
    }

    /// The total of `stat`, or `None` without a stat.
    fn optional_total(&self, stat: Option<&Stat>) -> CalcResult<Option<NodeValue>> {
        match stat {
            Some(stat) => self.total(stat),
            None => Ok(None),
        }
    }

    /// The main-path value of node `(stat, node_type)`.
    fn main_value(&self, stat: &Stat, node_type: NodeType) -> CalcResult<Option<NodeValue>> {
        self.value(stat, node_type, &PathDefinition::main())
    }

    /// The main-path modifier values of `form` on `stat`.
    fn form_values(&self, form: Form, stat: &Stat) -> CalcResult<Vec<Option<NodeValue>>> {
        self.values(form, &[(stat.clone(), PathDefinition::main())])
    }

    /// The values of `(stat, node_type)` on every path of `stat`.
    fn stat_values(&self, stat: &Stat, node_type: NodeType) -> CalcResult<Vec<Option<NodeValue>>> {
        self.paths(stat)?
            .iter()
            .map(|path| self.value(stat, node_type, path))
            .collect()
    }
}

/// A formula computing a node's value.
pub trait Value {
    fn calculate(&self, context: &dyn ValueCalculationContext) -> CalcResult<Option<NodeValue>>;
}

/// A formula that ignores its context.
///
/// # Examples
///
/// ```rust
/// use statgraph::value::ConstantValue;
/// use statgraph::NodeValue;
///
/// let value = ConstantValue::from(42.0);
/// assert_eq!(value.get(), Some(NodeValue::from(42.0)));
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstantValue(Option<NodeValue>);

impl ConstantValue {
    pub fn new(value: Option<NodeValue>) -> Self {
        Self(value)
    }

    pub fn get(self) -> Option<NodeValue> {
        self.0
    }
}

impl From<f64> for ConstantValue {
    fn from(value: f64) -> Self {
        Self(Some(NodeValue::from(value)))
    }
}

impl Value for ConstantValue {
    fn calculate(&self, _context: &dyn ValueCalculationContext) -> CalcResult<Option<NodeValue>> {
        Ok(self.0)
    }
}

type Formula = dyn Fn(&dyn ValueCalculationContext) -> CalcResult<Option<NodeValue>>;

/// A formula given as a closure, with a description for debugging.
#[derive(Clone)]
pub struct FunctionalValue {
    formula: Rc<Formula>,
    description: String,
}

impl FunctionalValue {
    pub fn new(
        description: impl Into<String>,
        formula: impl Fn(&dyn ValueCalculationContext) -> CalcResult<Option<NodeValue>> + 'static,
    ) -> Self {
        Self {
            formula: Rc::new(formula),
            description: description.into(),
        }
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}

impl Value for FunctionalValue {
    fn calculate(&self, context: &dyn ValueCalculationContext) -> CalcResult<Option<NodeValue>> {
        (self.formula)(context)
    }
}

impl fmt::Debug for FunctionalValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("FunctionalValue").field(&self.description).finish()
    }
}

/// Wrap a closure as a shared formula.
pub fn formula(
    description: impl Into<String>,
    f: impl Fn(&dyn ValueCalculationContext) -> CalcResult<Option<NodeValue>> + 'static,
) -> Rc<dyn Value> {
    Rc::new(FunctionalValue::new(description, f))
}

type PathsOverride<'a> = Box<dyn Fn(&dyn ValueCalculationContext, &Stat) -> CalcResult<Vec<PathDefinition>> + 'a>;
type ValueOverride<'a> = Box<
    dyn Fn(&dyn ValueCalculationContext, &Stat, NodeType, &PathDefinition) -> CalcResult<Option<NodeValue>>
        + 'a,
>;
type ValuesOverride<'a> = Box<
    dyn Fn(&dyn ValueCalculationContext, Form, &[(Stat, PathDefinition)]) -> CalcResult<Vec<Option<NodeValue>>>
        + 'a,
>;

/// A context passing everything through to an inner context, except for
/// the lookups it was given overrides for.
///
/// Overrides receive the inner context so they can fall back to it.
pub struct ContextDecorator<'a> {
    inner: &'a dyn ValueCalculationContext,
    paths: Option<PathsOverride<'a>>,
    value: Option<ValueOverride<'a>>,
    values: Option<ValuesOverride<'a>>,
}

impl<'a> ContextDecorator<'a> {
    /// A decorator passing everything through.
    pub fn new(inner: &'a dyn ValueCalculationContext) -> Self {
        Self {
            inner,
            paths: None,
            value: None,
            values: None,
        }
    }

    pub fn with_paths(
        mut self,
        f: impl Fn(&dyn ValueCalculationContext, &Stat) -> CalcResult<Vec<PathDefinition>> + 'a,
    ) -> Self {
        self.paths = Some(Box::new(f));
        self
    }

    pub fn with_value(
        mut self,
        f: impl Fn(&dyn ValueCalculationContext, &Stat, NodeType, &PathDefinition) -> CalcResult<Option<NodeValue>>
            + 'a,
    ) -> Self {
        self.value = Some(Box::new(f));
        self
    }

    pub fn with_values(
        mut self,
        f: impl Fn(&dyn ValueCalculationContext, Form, &[(Stat, PathDefinition)]) -> CalcResult<Vec<Option<NodeValue>>>
            + 'a,
    ) -> Self {
        self.values = Some(Box::new(f));
        self
    }
}

impl ValueCalculationContext for ContextDecorator<'_> {
    fn current_path(&self) -> &PathDefinition {
        self.inner.current_path()
    }

    fn paths(&self, stat: &Stat) -> CalcResult<Vec<PathDefinition>> {
        match &self.paths {
            Some(f) => f(self.inner, stat),
            None => self.inner.paths(stat),
        }
    }

    fn value(
        &self,
        stat: &Stat,
        node_type: NodeType,
        path: &PathDefinition,
    ) -> CalcResult<Option<NodeValue>> {
        match &self.value {
            Some(f) => f(self.inner, stat, node_type, path),
            None => self.inner.value(stat, node_type, path),
        }
    }

    fn values(
        &self,
        form: Form,
        paths: &[(Stat, PathDefinition)],
    ) -> CalcResult<Vec<Option<NodeValue>>> {
        match &self.values {
            Some(f) => f(self.inner, form, paths),
            None => self.inner.values(form, paths),
        }
    }
}
