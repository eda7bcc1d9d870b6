//! Conversion and gain: redirecting part of one stat's value into another.
//!
//! A source stat `S` converted to a target `T` gets a copy of each of its
//! paths on `T`, extended by `S`. On those paths `T`'s Base is `S`'s Base
//! scaled by the ConvertTo and GainAs percentages, while `S`'s own path
//! totals lose the converted share.

use super::stat_factory;
use crate::error::CalcResult;
use crate::node_type::NodeType;
use crate::node_value::NodeValue;
use crate::path::PathDefinition;
use crate::stat::{Stat, StatKey};
use crate::stat_factory::StatFactory;
use crate::transformable::ValueTransformation;
use crate::value::{ContextDecorator, Value, ValueCalculationContext};
use std::rc::{Rc, Weak};

/// Base of the target on paths converted from the source.
#[derive(Clone)]
pub struct ConversionTargetBase {
    source: Stat,
    target: Stat,
    factory: Weak<StatFactory>,
}

impl ConversionTargetBase {
    pub fn new(source: Stat, target: Stat, factory: Weak<StatFactory>) -> Rc<Self> {
        Rc::new(Self {
            source,
            target,
            factory,
        })
    }
}

impl ValueTransformation for ConversionTargetBase {
    fn transform(&self, value: Rc<dyn Value>) -> Rc<dyn Value> {
        Rc::new(ConversionTargetBaseValue {
            behavior: self.clone(),
            inner: value,
        })
    }
}

struct ConversionTargetBaseValue {
    behavior: ConversionTargetBase,
    inner: Rc<dyn Value>,
}

impl Value for ConversionTargetBaseValue {
    fn calculate(&self, context: &dyn ValueCalculationContext) -> CalcResult<Option<NodeValue>> {
        let b = &self.behavior;
        let Some(source_path) = context.current_path().without_last_conversion() else {
            return self.inner.calculate(context);
        };
        let Some(source_base) = context.value(&b.source, NodeType::Base, &source_path)? else {
            return self.inner.calculate(context);
        };
        let factory = stat_factory(&b.factory)?;
        let percent = NodeValue::sum([
            context.total(&factory.convert_to(&b.source, &b.target))?,
            context.total(&factory.gain_as(&b.source, &b.target))?,
        ])
        .unwrap_or(NodeValue::ZERO);
        Ok(Some(source_base * percent / 100.0))
    }
}

/// Adds the source's paths, extended by the source, to the target's paths.
#[derive(Clone)]
pub struct ConversionTargetUncappedSubtotal {
    source: Stat,
    target: StatKey,
}

impl ConversionTargetUncappedSubtotal {
    pub fn new(source: Stat, target: StatKey) -> Rc<Self> {
        Rc::new(Self { source, target })
    }
}

impl ValueTransformation for ConversionTargetUncappedSubtotal {
    fn transform(&self, value: Rc<dyn Value>) -> Rc<dyn Value> {
        Rc::new(ConversionTargetUncappedSubtotalValue {
            behavior: self.clone(),
            inner: value,
        })
    }
}

struct ConversionTargetUncappedSubtotalValue {
    behavior: ConversionTargetUncappedSubtotal,
    inner: Rc<dyn Value>,
}

impl Value for ConversionTargetUncappedSubtotalValue {
    fn calculate(&self, context: &dyn ValueCalculationContext) -> CalcResult<Option<NodeValue>> {
        let b = &self.behavior;
        let decorated = ContextDecorator::new(context).with_paths(|inner, stat| {
            let mut paths = inner.paths(stat)?;
            if stat.key() != &b.target {
                return Ok(paths);
            }
            // The source's conversion paths only exist once its own
            // subtotal was evaluated.
            inner.value(&b.source, NodeType::UncappedSubtotal, &PathDefinition::main())?;
            for path in inner.paths(&b.source)? {
                let converted = path.extended_by(b.source.clone());
                if !paths.contains(&converted) {
                    paths.push(converted);
                }
            }
            Ok(paths)
        });
        self.inner.calculate(&decorated)
    }
}

/// Scales the source's path totals by the share that is not converted.
#[derive(Clone)]
pub struct ConversionSourcePathTotal {
    source: Stat,
    factory: Weak<StatFactory>,
}

impl ConversionSourcePathTotal {
    pub fn new(source: Stat, factory: Weak<StatFactory>) -> Rc<Self> {
        Rc::new(Self { source, factory })
    }
}

impl ValueTransformation for ConversionSourcePathTotal {
    fn transform(&self, value: Rc<dyn Value>) -> Rc<dyn Value> {
        Rc::new(ConversionSourcePathTotalValue {
            behavior: self.clone(),
            inner: value,
        })
    }
}

struct ConversionSourcePathTotalValue {
    behavior: ConversionSourcePathTotal,
    inner: Rc<dyn Value>,
}

impl Value for ConversionSourcePathTotalValue {
    fn calculate(&self, context: &dyn ValueCalculationContext) -> CalcResult<Option<NodeValue>> {
        let Some(value) = self.inner.calculate(context)? else {
            return Ok(None);
        };
        let factory = stat_factory(&self.behavior.factory)?;
        match context.total(&factory.conversion(&self.behavior.source))? {
            Some(conversion) => {
                let remaining = (1.0 - conversion / 100.0).clip(Some(0.0), Some(1.0));
                Ok(Some(value * remaining))
            }
            None => Ok(Some(value)),
        }
    }
}

/// Normalizes a ConvertTo stat when the source converts more than 100% in
/// total.
///
/// Skill conversions are scaled down first until they sum to at most 100%.
/// Other conversions then share whatever the skills left.
#[derive(Clone)]
pub struct ConvertToUncappedSubtotal {
    source: Stat,
    convert_to: StatKey,
    factory: Weak<StatFactory>,
}

impl ConvertToUncappedSubtotal {
    pub fn new(source: Stat, convert_to: StatKey, factory: Weak<StatFactory>) -> Rc<Self> {
        Rc::new(Self {
            source,
            convert_to,
            factory,
        })
    }
}

impl ValueTransformation for ConvertToUncappedSubtotal {
    fn transform(&self, value: Rc<dyn Value>) -> Rc<dyn Value> {
        Rc::new(ConvertToUncappedSubtotalValue {
            behavior: self.clone(),
            inner: value,
        })
    }
}

struct ConvertToUncappedSubtotalValue {
    behavior: ConvertToUncappedSubtotal,
    inner: Rc<dyn Value>,
}

impl Value for ConvertToUncappedSubtotalValue {
    fn calculate(&self, context: &dyn ValueCalculationContext) -> CalcResult<Option<NodeValue>> {
        let b = &self.behavior;
        let factory = stat_factory(&b.factory)?;
        let Some(conversion) = context.total(&factory.conversion(&b.source))? else {
            return self.inner.calculate(context);
        };
        let skill = context
            .total(&factory.skill_conversion(&b.source))?
            .unwrap_or(NodeValue::ZERO);
        let skill_factor = skill.combine(conversion, |s, c| {
            if c > 100.0 && s > 100.0 {
                100.0 / s
            } else {
                1.0
            }
        });
        let other_factor = skill.combine(conversion, |s, c| {
            if c <= 100.0 {
                1.0
            } else if s >= 100.0 {
                0.0
            } else {
                (100.0 - s) / (c - s)
            }
        });

        let decorated = ContextDecorator::new(context).with_value(|inner, stat, node_type, path| {
            let value = inner.value(stat, node_type, path)?;
            if stat.key() != &b.convert_to || node_type != NodeType::PathTotal {
                return Ok(value);
            }
            let factor = if path.source().is_skill() {
                skill_factor
            } else {
                other_factor
            };
            Ok(value.map(|v| v * factor))
        });
        self.inner.calculate(&decorated)
    }
}

/// Restricts a SkillConversion stat to paths with a skill source.
#[derive(Clone)]
pub struct SkillConversionUncappedSubtotal {
    stat: StatKey,
}

impl SkillConversionUncappedSubtotal {
    pub fn new(stat: StatKey) -> Rc<Self> {
        Rc::new(Self { stat })
    }
}

impl ValueTransformation for SkillConversionUncappedSubtotal {
    fn transform(&self, value: Rc<dyn Value>) -> Rc<dyn Value> {
        Rc::new(SkillConversionUncappedSubtotalValue {
            stat: self.stat.clone(),
            inner: value,
        })
    }
}

struct SkillConversionUncappedSubtotalValue {
    stat: StatKey,
    inner: Rc<dyn Value>,
}

impl Value for SkillConversionUncappedSubtotalValue {
    fn calculate(&self, context: &dyn ValueCalculationContext) -> CalcResult<Option<NodeValue>> {
        let decorated = ContextDecorator::new(context).with_paths(|inner, stat| {
            let paths = inner.paths(stat)?;
            if stat.key() != &self.stat {
                return Ok(paths);
            }
            Ok(paths.into_iter().filter(|p| p.source().is_skill()).collect())
        });
        self.inner.calculate(&decorated)
    }
}
