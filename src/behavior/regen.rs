//! Regeneration routed to the pool it targets.

use super::stat_factory;
use crate::error::CalcResult;
use crate::node_type::NodeType;
use crate::node_value::NodeValue;
use crate::stat::Entity;
use crate::stat_factory::{Pool, StatFactory};
use crate::transformable::ValueTransformation;
use crate::value::{ContextDecorator, Value, ValueCalculationContext};
use std::rc::{Rc, Weak};

/// Collects the regeneration of every pool that targets this pool.
///
/// Each pool's regeneration applies to the pool named by its target pool
/// stat, or to itself when that stat has no value. The regeneration of
/// `pool` then has the union of the contributing pools' paths, each
/// valued at the sum of their path totals.
#[derive(Clone)]
pub struct RegenUncappedSubtotal {
    entity: Entity,
    pool: Pool,
    factory: Weak<StatFactory>,
}

impl RegenUncappedSubtotal {
    pub fn new(entity: Entity, pool: Pool, factory: Weak<StatFactory>) -> Rc<Self> {
        Rc::new(Self {
            entity,
            pool,
            factory,
        })
    }
}

impl ValueTransformation for RegenUncappedSubtotal {
    fn transform(&self, value: Rc<dyn Value>) -> Rc<dyn Value> {
        Rc::new(RegenUncappedSubtotalValue {
            behavior: self.clone(),
            inner: value,
        })
    }
}

struct RegenUncappedSubtotalValue {
    behavior: RegenUncappedSubtotal,
    inner: Rc<dyn Value>,
}

impl Value for RegenUncappedSubtotalValue {
    fn calculate(&self, context: &dyn ValueCalculationContext) -> CalcResult<Option<NodeValue>> {
        let b = &self.behavior;
        let factory = stat_factory(&b.factory)?;
        let regen = factory.regen(b.entity, b.pool);
        let mut contributing = Vec::new();
        for &pool in Pool::ALL {
            let target = context
                .total(&factory.regen_target_pool(b.entity, pool))?
                .and_then(|v| Pool::from_value(v.single()))
                .unwrap_or(pool);
            if target == b.pool {
                contributing.push(factory.regen(b.entity, pool));
            }
        }

        let decorated = ContextDecorator::new(context)
            .with_paths(|inner, stat| {
                if stat.key() != regen.key() {
                    return inner.paths(stat);
                }
                let mut paths = Vec::new();
                for pool_regen in &contributing {
                    for path in inner.paths(pool_regen)? {
                        if !paths.contains(&path) {
                            paths.push(path);
                        }
                    }
                }
                Ok(paths)
            })
            .with_value(|inner, stat, node_type, path| {
                if stat.key() != regen.key() || node_type != NodeType::PathTotal {
                    return inner.value(stat, node_type, path);
                }
                let mut values = Vec::new();
                for pool_regen in &contributing {
                    if inner.paths(pool_regen)?.contains(path) {
                        values.push(inner.value(pool_regen, NodeType::PathTotal, path)?);
                    }
                }
                Ok(NodeValue::sum(values))
            });
        self.inner.calculate(&decorated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::PathDefinition;
    use crate::source::{LocalSource, ModifierSource};
    use crate::testing::MockContext;
    use crate::value::formula;

    fn given() -> PathDefinition {
        PathDefinition::new(ModifierSource::Local(LocalSource::Given))
    }

    fn uncapped_subtotal(factory: &StatFactory, pool: Pool) -> Rc<dyn Value> {
        let regen = factory.regen(Entity::Character, pool);
        formula("uncapped subtotal", move |c| {
            Ok(NodeValue::sum(c.stat_values(&regen, NodeType::PathTotal)?))
        })
    }

    #[test]
    fn test_sums_pools_targeting_this_pool() {
        let factory = StatFactory::new();
        let life = factory.regen(Entity::Character, Pool::Life);
        let mana = factory.regen(Entity::Character, Pool::Mana);
        let es = factory.regen(Entity::Character, Pool::EnergyShield);
        let context = MockContext::new()
            .with_value(
                &factory.regen_target_pool(Entity::Character, Pool::Mana),
                NodeType::Total,
                PathDefinition::main(),
                Pool::Life.value(),
            )
            .with_value(
                &factory.regen_target_pool(Entity::Character, Pool::EnergyShield),
                NodeType::Total,
                PathDefinition::main(),
                Pool::EnergyShield.value(),
            )
            .with_paths(&life, vec![PathDefinition::main()])
            .with_paths(&mana, vec![PathDefinition::main(), given()])
            .with_paths(&es, vec![PathDefinition::main()])
            .with_value(&life, NodeType::PathTotal, PathDefinition::main(), 1.0)
            .with_value(&mana, NodeType::PathTotal, PathDefinition::main(), 2.0)
            .with_value(&mana, NodeType::PathTotal, given(), 3.0)
            .with_value(&es, NodeType::PathTotal, PathDefinition::main(), 100.0);

        let life_regen = RegenUncappedSubtotal::new(Entity::Character, Pool::Life, Rc::downgrade(&factory))
            .transform(uncapped_subtotal(&factory, Pool::Life));
        assert_eq!(life_regen.calculate(&context).unwrap(), Some(NodeValue::from(6.0)));

        let mana_regen = RegenUncappedSubtotal::new(Entity::Character, Pool::Mana, Rc::downgrade(&factory))
            .transform(uncapped_subtotal(&factory, Pool::Mana));
        assert_eq!(mana_regen.calculate(&context).unwrap(), None);
    }

    #[test]
    fn test_leaves_other_node_types_alone() {
        let factory = StatFactory::new();
        let life = factory.regen(Entity::Character, Pool::Life);
        let context = MockContext::new().with_value(&life, NodeType::Base, PathDefinition::main(), 4.0);
        let base = {
            let life = life.clone();
            formula("base", move |c| c.main_value(&life, NodeType::Base))
        };

        let transformed = RegenUncappedSubtotal::new(Entity::Character, Pool::Life, Rc::downgrade(&factory))
            .transform(base);
        assert_eq!(transformed.calculate(&context).unwrap(), Some(NodeValue::from(4.0)));
    }
}
