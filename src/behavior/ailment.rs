//! Ailment damage borrows the hit damage it originates from.
//!
//! An ailment damage stat such as `Fire.Damage.Ignite` takes its paths
//! and base values from the matching hit damage stat, scaled by the
//! entity's damage effectiveness. If the ailment deals a different damage
//! type than it was inflicted with, modifiers to the ailment damage of the
//! dealt type apply as well.

use super::stat_factory;
use crate::error::CalcResult;
use crate::node_type::{Form, NodeType};
use crate::node_value::NodeValue;
use crate::stat::{Entity, Stat, StatKey};
use crate::stat_factory::{Ailment, DamageType, StatFactory};
use crate::transformable::ValueTransformation;
use crate::value::{ContextDecorator, Value, ValueCalculationContext};
use std::rc::{Rc, Weak};

/// The ailment damage has the paths of the hit damage.
#[derive(Clone)]
pub struct AilmentDamageUncappedSubtotal {
    ailment_damage: StatKey,
    hit_damage: Stat,
}

impl AilmentDamageUncappedSubtotal {
    pub fn new(ailment_damage: StatKey, hit_damage: Stat) -> Rc<Self> {
        Rc::new(Self {
            ailment_damage,
            hit_damage,
        })
    }
}

impl ValueTransformation for AilmentDamageUncappedSubtotal {
    fn transform(&self, value: Rc<dyn Value>) -> Rc<dyn Value> {
        Rc::new(AilmentDamageUncappedSubtotalValue {
            behavior: self.clone(),
            inner: value,
        })
    }
}

struct AilmentDamageUncappedSubtotalValue {
    behavior: AilmentDamageUncappedSubtotal,
    inner: Rc<dyn Value>,
}

impl Value for AilmentDamageUncappedSubtotalValue {
    fn calculate(&self, context: &dyn ValueCalculationContext) -> CalcResult<Option<NodeValue>> {
        let b = &self.behavior;
        let decorated = ContextDecorator::new(context).with_paths(|inner, stat| {
            if stat.key() == &b.ailment_damage {
                inner.paths(&b.hit_damage)
            } else {
                inner.paths(stat)
            }
        });
        self.inner.calculate(&decorated)
    }
}

/// The ailment damage's BaseSet and BaseAdd are the hit damage's, scaled
/// by the matching effectiveness.
#[derive(Clone)]
pub struct AilmentDamageBase {
    ailment_damage: StatKey,
    hit_damage: Stat,
    factory: Weak<StatFactory>,
}

impl AilmentDamageBase {
    pub fn new(ailment_damage: StatKey, hit_damage: Stat, factory: Weak<StatFactory>) -> Rc<Self> {
        Rc::new(Self {
            ailment_damage,
            hit_damage,
            factory,
        })
    }
}

impl ValueTransformation for AilmentDamageBase {
    fn transform(&self, value: Rc<dyn Value>) -> Rc<dyn Value> {
        Rc::new(AilmentDamageBaseValue {
            behavior: self.clone(),
            inner: value,
        })
    }
}

struct AilmentDamageBaseValue {
    behavior: AilmentDamageBase,
    inner: Rc<dyn Value>,
}

impl Value for AilmentDamageBaseValue {
    fn calculate(&self, context: &dyn ValueCalculationContext) -> CalcResult<Option<NodeValue>> {
        let b = &self.behavior;
        let factory = stat_factory(&b.factory)?;
        let entity = b.hit_damage.entity();
        let base_set = factory.damage_base_set_effectiveness(entity);
        let base_add = factory.damage_base_add_effectiveness(entity);

        let decorated = ContextDecorator::new(context).with_value(|inner, stat, node_type, path| {
            if stat.key() != &b.ailment_damage {
                return inner.value(stat, node_type, path);
            }
            let effectiveness = match node_type {
                NodeType::BaseSet => &base_set,
                NodeType::BaseAdd => &base_add,
                _ => return inner.value(stat, node_type, path),
            };
            let Some(value) = inner.value(&b.hit_damage, node_type, path)? else {
                return Ok(None);
            };
            let effectiveness = inner.total(effectiveness)?.unwrap_or(NodeValue::ONE);
            Ok(Some(value * effectiveness))
        });
        self.inner.calculate(&decorated)
    }
}

/// Increase and More of the ailment damage also read the modifiers to the
/// ailment damage of the type the ailment deals.
#[derive(Clone)]
pub struct AilmentDamageIncreaseMore {
    ailment_damage: StatKey,
    entity: Entity,
    ailment: Ailment,
    factory: Weak<StatFactory>,
}

impl AilmentDamageIncreaseMore {
    pub fn new(ailment_damage: StatKey, entity: Entity, ailment: Ailment, factory: Weak<StatFactory>) -> Rc<Self> {
        Rc::new(Self {
            ailment_damage,
            entity,
            ailment,
            factory,
        })
    }
}

impl ValueTransformation for AilmentDamageIncreaseMore {
    fn transform(&self, value: Rc<dyn Value>) -> Rc<dyn Value> {
        Rc::new(AilmentDamageIncreaseMoreValue {
            behavior: self.clone(),
            inner: value,
        })
    }
}

struct AilmentDamageIncreaseMoreValue {
    behavior: AilmentDamageIncreaseMore,
    inner: Rc<dyn Value>,
}

impl Value for AilmentDamageIncreaseMoreValue {
    fn calculate(&self, context: &dyn ValueCalculationContext) -> CalcResult<Option<NodeValue>> {
        let b = &self.behavior;
        let factory = stat_factory(&b.factory)?;
        let dealt = context
            .total(&factory.ailment_dealt_damage_type(b.entity, b.ailment))?
            .and_then(|v| DamageType::from_value(v.single()));
        let Some(dealt) = dealt else {
            return self.inner.calculate(context);
        };
        let dealt_damage = factory.ailment_damage(b.entity, dealt, b.ailment);
        if dealt_damage.key() == &b.ailment_damage {
            return self.inner.calculate(context);
        }

        let decorated = ContextDecorator::new(context).with_values(|inner, form, paths| {
            if !matches!(form, Form::Increase | Form::More) {
                return inner.values(form, paths);
            }
            let mut extended = Vec::with_capacity(paths.len() * 2);
            for (stat, path) in paths {
                extended.push((stat.clone(), path.clone()));
                if stat.key() == &b.ailment_damage {
                    extended.push((dealt_damage.clone(), path.clone()));
                }
            }
            inner.values(form, &extended)
        });
        self.inner.calculate(&decorated)
    }
}
