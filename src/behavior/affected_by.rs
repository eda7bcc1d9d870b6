//! Modifiers to one stat applying to another.

use super::stat_factory;
use crate::error::CalcResult;
use crate::node_type::Form;
use crate::node_value::NodeValue;
use crate::stat::Stat;
use crate::stat_factory::StatFactory;
use crate::transformable::ValueTransformation;
use crate::value::{ContextDecorator, Value, ValueCalculationContext};
use std::rc::{Rc, Weak};

/// Lets modifiers of one form to `other` also apply to `stat`.
///
/// Whenever the modifiers of `form` on `stat` are read, those of `other`
/// on the same paths are added, scaled by the total of the
/// `affected_by_modifiers_to` meta stat in percent. Without a total
/// nothing is added.
#[derive(Clone)]
pub struct AffectedByModifiersTo {
    stat: Stat,
    other: Stat,
    form: Form,
    factory: Weak<StatFactory>,
}

impl AffectedByModifiersTo {
    pub fn new(stat: Stat, other: Stat, form: Form, factory: Weak<StatFactory>) -> Rc<Self> {
        Rc::new(Self {
            stat,
            other,
            form,
            factory,
        })
    }
}

impl ValueTransformation for AffectedByModifiersTo {
    fn transform(&self, value: Rc<dyn Value>) -> Rc<dyn Value> {
        Rc::new(AffectedByModifiersToValue {
            behavior: self.clone(),
            inner: value,
        })
    }
}

struct AffectedByModifiersToValue {
    behavior: AffectedByModifiersTo,
    inner: Rc<dyn Value>,
}

impl Value for AffectedByModifiersToValue {
    fn calculate(&self, context: &dyn ValueCalculationContext) -> CalcResult<Option<NodeValue>> {
        let b = &self.behavior;
        let factory = stat_factory(&b.factory)?;
        let meta = factory.affected_by_modifiers_to(&b.stat, &b.other, b.form);
        let Some(percent) = context.total(&meta)? else {
            return self.inner.calculate(context);
        };

        let decorated = ContextDecorator::new(context).with_values(|inner, form, paths| {
            let mut values = inner.values(form, paths)?;
            if form != b.form {
                return Ok(values);
            }
            let redirected: Vec<_> = paths
                .iter()
                .filter(|(stat, _)| stat == &b.stat)
                .map(|(_, path)| (b.other.clone(), path.clone()))
                .collect();
            if redirected.is_empty() {
                return Ok(values);
            }
            values.extend(
                inner
                    .values(form, &redirected)?
                    .into_iter()
                    .map(|v| v.map(|v| v * percent / 100.0)),
            );
            Ok(values)
        });
        self.inner.calculate(&decorated)
    }
}
