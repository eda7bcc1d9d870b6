//! Rounding of item property values.

use crate::error::CalcResult;
use crate::node_value::NodeValue;
use crate::transformable::ValueTransformation;
use crate::value::{Value, ValueCalculationContext};
use std::rc::Rc;

/// Rounds the result to a number of decimal places.
#[derive(Debug, Clone, Copy)]
pub struct Rounding {
    decimals: i32,
}

impl Rounding {
    pub fn new(decimals: i32) -> Rc<Self> {
        Rc::new(Self { decimals })
    }
}

impl ValueTransformation for Rounding {
    fn transform(&self, value: Rc<dyn Value>) -> Rc<dyn Value> {
        Rc::new(RoundedValue {
            decimals: self.decimals,
            inner: value,
        })
    }
}

struct RoundedValue {
    decimals: i32,
    inner: Rc<dyn Value>,
}

impl Value for RoundedValue {
    fn calculate(&self, context: &dyn ValueCalculationContext) -> CalcResult<Option<NodeValue>> {
        Ok(self.inner.calculate(context)?.map(|v| v.round(self.decimals)))
    }
}
