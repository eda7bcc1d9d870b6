//! Requirements take the highest path instead of the sum.

use crate::error::CalcResult;
use crate::node_type::NodeType;
use crate::node_value::NodeValue;
use crate::stat::StatKey;
use crate::transformable::ValueTransformation;
use crate::value::{ContextDecorator, Value, ValueCalculationContext};
use std::rc::Rc;

/// A requirement is the highest of its path totals, not their sum.
///
/// The stat's paths are restricted to the one path with the maximum path
/// total. Paths without a value never win.
#[derive(Clone)]
pub struct RequirementUncappedSubtotal {
    stat: StatKey,
}

impl RequirementUncappedSubtotal {
    pub fn new(stat: StatKey) -> Rc<Self> {
        Rc::new(Self { stat })
    }
}

impl ValueTransformation for RequirementUncappedSubtotal {
    fn transform(&self, value: Rc<dyn Value>) -> Rc<dyn Value> {
        Rc::new(RequirementUncappedSubtotalValue {
            stat: self.stat.clone(),
            inner: value,
        })
    }
}

struct RequirementUncappedSubtotalValue {
    stat: StatKey,
    inner: Rc<dyn Value>,
}

impl Value for RequirementUncappedSubtotalValue {
    fn calculate(&self, context: &dyn ValueCalculationContext) -> CalcResult<Option<NodeValue>> {
        let decorated = ContextDecorator::new(context).with_paths(|inner, stat| {
            let paths = inner.paths(stat)?;
            if stat.key() != &self.stat {
                return Ok(paths);
            }
            let mut highest: Option<(_, NodeValue)> = None;
            for path in paths {
                let Some(value) = inner.value(stat, NodeType::PathTotal, &path)? else {
                    continue;
                };
                if highest.as_ref().map_or(true, |(_, h)| value.maximum() > h.maximum()) {
                    highest = Some((path, value));
                }
            }
            Ok(highest.map(|(path, _)| vec![path]).unwrap_or_default())
        });
        self.inner.calculate(&decorated)
    }
}
