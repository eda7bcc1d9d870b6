//! Damage effectiveness applied to base hit damage.

use super::stat_factory;
use crate::error::CalcResult;
use crate::node_type::NodeType;
use crate::node_value::NodeValue;
use crate::stat::{Entity, StatKey};
use crate::stat_factory::StatFactory;
use crate::transformable::ValueTransformation;
use crate::value::{ContextDecorator, Value, ValueCalculationContext};
use std::rc::{Rc, Weak};

/// Scales the BaseSet and BaseAdd of hit damage by the entity's damage
/// effectiveness stats. Missing effectiveness counts as 1.
#[derive(Clone)]
pub struct DamageEffectivenessBase {
    damage: StatKey,
    entity: Entity,
    factory: Weak<StatFactory>,
}

impl DamageEffectivenessBase {
    pub fn new(damage: StatKey, entity: Entity, factory: Weak<StatFactory>) -> Rc<Self> {
        Rc::new(Self {
            damage,
            entity,
            factory,
        })
    }
}

impl ValueTransformation for DamageEffectivenessBase {
    fn transform(&self, value: Rc<dyn Value>) -> Rc<dyn Value> {
        Rc::new(DamageEffectivenessBaseValue {
            behavior: self.clone(),
            inner: value,
        })
    }
}

struct DamageEffectivenessBaseValue {
    behavior: DamageEffectivenessBase,
    inner: Rc<dyn Value>,
}

impl Value for DamageEffectivenessBaseValue {
    fn calculate(&self, context: &dyn ValueCalculationContext) -> CalcResult<Option<NodeValue>> {
        let b = &self.behavior;
        let factory = stat_factory(&b.factory)?;
        let base_set = factory.damage_base_set_effectiveness(b.entity);
        let base_add = factory.damage_base_add_effectiveness(b.entity);

        let decorated = ContextDecorator::new(context).with_value(|inner, stat, node_type, path| {
            let value = inner.value(stat, node_type, path)?;
            if stat.key() != &b.damage {
                return Ok(value);
            }
            let effectiveness = match node_type {
                NodeType::BaseSet => &base_set,
                NodeType::BaseAdd => &base_add,
                _ => return Ok(value),
            };
            let Some(value) = value else {
                return Ok(None);
            };
            let effectiveness = inner.total(effectiveness)?.unwrap_or(NodeValue::ONE);
            Ok(Some(value * effectiveness))
        });
        self.inner.calculate(&decorated)
    }
}
