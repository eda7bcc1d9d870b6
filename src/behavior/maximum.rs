//! Maximum aggregation for forms of single-valued stats.

use crate::error::{CalcResult, CalculationError};
use crate::node_type::Form;
use crate::node_value::NodeValue;
use crate::stat::StatKey;
use crate::transformable::ValueTransformation;
use crate::value::{ContextDecorator, Value, ValueCalculationContext};
use std::rc::Rc;

/// Aggregates one form of a stat by taking the maximum modifier.
///
/// Queries for the form must either all be for the stat or none of them.
/// A query mixing both cannot be answered and is an error.
#[derive(Clone)]
pub struct MaximumFormAggregating {
    stat: StatKey,
    form: Form,
}

impl MaximumFormAggregating {
    pub fn new(stat: StatKey, form: Form) -> Rc<Self> {
        Rc::new(Self { stat, form })
    }
}

impl ValueTransformation for MaximumFormAggregating {
    fn transform(&self, value: Rc<dyn Value>) -> Rc<dyn Value> {
        Rc::new(MaximumFormAggregatingValue {
            behavior: self.clone(),
            inner: value,
        })
    }
}

struct MaximumFormAggregatingValue {
    behavior: MaximumFormAggregating,
    inner: Rc<dyn Value>,
}

impl Value for MaximumFormAggregatingValue {
    fn calculate(&self, context: &dyn ValueCalculationContext) -> CalcResult<Option<NodeValue>> {
        let b = &self.behavior;
        let decorated = ContextDecorator::new(context).with_values(|inner, form, paths| {
            if form != b.form {
                return inner.values(form, paths);
            }
            let affected = paths.iter().filter(|(stat, _)| stat.key() == &b.stat).count();
            if affected == 0 {
                return inner.values(form, paths);
            }
            if affected != paths.len() {
                tracing::warn!(stat = %b.stat, %form, "maximum aggregation queried with mixed stats");
                return Err(CalculationError::InconsistentMaximumAggregation {
                    stat: b.stat.to_string(),
                    form,
                });
            }
            let maximum = inner
                .values(form, paths)?
                .into_iter()
                .flatten()
                .reduce(|x, y| x.combine(y, f64::max));
            Ok(maximum.into_iter().map(Some).collect())
        });
        self.inner.calculate(&decorated)
    }
}
