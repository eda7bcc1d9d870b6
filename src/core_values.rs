//! The formulas of a stat's subgraph.
//!
//! ```text
//! Total            = TotalOverride ?? Subtotal
//! Subtotal         = UncappedSubtotal clipped to [Minimum, Maximum]
//! UncappedSubtotal = Σ PathTotal over the stat's paths
//! PathTotal        = Base * (1 + Increase) * More
//! Base             = BaseOverride ?? (BaseSet + BaseAdd) ?? BaseAdd
//! ```
//!
//! Form node types aggregate the modifiers registered for their form.

use crate::aggregation::aggregate;
use crate::error::CalcResult;
use crate::node_type::{Form, NodeType};
use crate::node_value::NodeValue;
use crate::path::PathDefinition;
use crate::stat::Stat;
use crate::value::{Value, ValueCalculationContext};
use std::rc::Rc;

/// The formula of node type `node_type` of `stat`.
pub fn core_value(stat: &Stat, node_type: NodeType) -> Rc<dyn Value> {
    let stat = stat.clone();
    match node_type.form() {
        Some(form) => Rc::new(FormAggregatingValue { stat, form }),
        None => Rc::new(StatValue { stat, node_type }),
    }
}

struct StatValue {
    stat: Stat,
    node_type: NodeType,
}

impl Value for StatValue {
    fn calculate(&self, context: &dyn ValueCalculationContext) -> CalcResult<Option<NodeValue>> {
        let stat = &self.stat;
        match self.node_type {
            NodeType::Total => total(stat, context),
            NodeType::Subtotal => subtotal(stat, context),
            NodeType::UncappedSubtotal => Ok(NodeValue::sum(context.stat_values(stat, NodeType::PathTotal)?)),
            NodeType::PathTotal => path_total(stat, context),
            NodeType::Base => base(stat, context),
            _ => Ok(None),
        }
    }
}

fn total(stat: &Stat, context: &dyn ValueCalculationContext) -> CalcResult<Option<NodeValue>> {
    match context.main_value(stat, NodeType::TotalOverride)? {
        Some(value) => Ok(Some(value)),
        None => context.main_value(stat, NodeType::Subtotal),
    }
}

fn subtotal(stat: &Stat, context: &dyn ValueCalculationContext) -> CalcResult<Option<NodeValue>> {
    let Some(uncapped) = context.main_value(stat, NodeType::UncappedSubtotal)? else {
        return Ok(None);
    };
    if uncapped.is_zero() {
        return Ok(Some(NodeValue::ZERO));
    }
    let lower = context.optional_total(stat.minimum())?.map(NodeValue::minimum);
    let upper = context.optional_total(stat.maximum())?.map(NodeValue::maximum);
    Ok(Some(uncapped.clip(lower, upper)))
}

fn path_total(stat: &Stat, context: &dyn ValueCalculationContext) -> CalcResult<Option<NodeValue>> {
    let path = context.current_path();
    let Some(base) = context.value(stat, NodeType::Base, path)? else {
        return Ok(None);
    };
    let increase = context
        .value(stat, NodeType::Increase, path)?
        .unwrap_or(NodeValue::ZERO);
    let more = context
        .value(stat, NodeType::More, path)?
        .unwrap_or(NodeValue::ONE);
    Ok(Some(base * (1.0 + increase) * more))
}

fn base(stat: &Stat, context: &dyn ValueCalculationContext) -> CalcResult<Option<NodeValue>> {
    let path = context.current_path();
    if let Some(value) = context.value(stat, NodeType::BaseOverride, path)? {
        return Ok(Some(value));
    }
    let base_set = context.value(stat, NodeType::BaseSet, path)?;
    let base_add = context.value(stat, NodeType::BaseAdd, path)?;
    Ok(match base_set {
        Some(set) => Some(set + base_add.unwrap_or(NodeValue::ZERO)),
        None => base_add,
    })
}

/// Aggregates the modifiers of one form that apply on the current path.
struct FormAggregatingValue {
    stat: Stat,
    form: Form,
}

impl FormAggregatingValue {
    /// The `(stat, path)` pairs whose modifiers apply on `path`.
    ///
    /// Increase and More modifiers of every influencing source apply, and
    /// those to the stats a path was converted from apply to the converted
    /// value too.
    fn modifier_paths(&self, path: &PathDefinition) -> Vec<(Stat, PathDefinition)> {
        match self.form {
            Form::TotalOverride => vec![(self.stat.clone(), PathDefinition::main())],
            Form::BaseOverride | Form::BaseSet | Form::BaseAdd => vec![(self.stat.clone(), path.clone())],
            Form::Increase | Form::More => {
                let stats: Vec<&Stat> = std::iter::once(&self.stat)
                    .chain(path.conversion_stats())
                    .collect();
                let mut paths = Vec::new();
                for source in path.source().influencing_sources() {
                    let source_path = PathDefinition::new(source);
                    for stat in &stats {
                        paths.push(((*stat).clone(), source_path.clone()));
                    }
                }
                paths
            }
        }
    }
}

impl Value for FormAggregatingValue {
    fn calculate(&self, context: &dyn ValueCalculationContext) -> CalcResult<Option<NodeValue>> {
        let paths = self.modifier_paths(context.current_path());
        aggregate(self.form, &context.values(self.form, &paths)?)
    }
}
