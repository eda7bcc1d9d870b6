//! Behaviors: cross-cutting rewrites of node formulas.
//!
//! A [`Behavior`] names the nodes it affects (stats, node types and a
//! path rule) and a [`ValueTransformation`] applied to their formulas.
//! Behaviors travel with the stat that declares them and are installed
//! by the [`ValueTransformer`] while that stat's subgraph exists.
//! Installation never changes graph topology; most transformations work
//! by decorating the context the wrapped formula sees.

mod affected_by;
mod ailment;
mod conversion;
mod effectiveness;
mod maximum;
mod regen;
mod requirement;
mod rounding;

pub use affected_by::AffectedByModifiersTo;
pub use ailment::{AilmentDamageBase, AilmentDamageIncreaseMore, AilmentDamageUncappedSubtotal};
pub use conversion::{
    ConversionSourcePathTotal, ConversionTargetBase, ConversionTargetUncappedSubtotal,
    ConvertToUncappedSubtotal, SkillConversionUncappedSubtotal,
};
pub use effectiveness::DamageEffectivenessBase;
pub use maximum::MaximumFormAggregating;
pub use regen::RegenUncappedSubtotal;
pub use requirement::RequirementUncappedSubtotal;
pub use rounding::Rounding;

use crate::error::{CalcResult, CalculationError};
use crate::node_type::NodeType;
use crate::path::PathDefinition;
use crate::stat::StatKey;
use crate::stat_factory::StatFactory;
use crate::transformable::{TransformableValue, ValueTransformation};
use indexmap::IndexMap;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::{Rc, Weak};

fn stat_factory(factory: &Weak<StatFactory>) -> CalcResult<Rc<StatFactory>> {
    factory.upgrade().ok_or(CalculationError::StatFactoryReleased)
}

/// Which paths of the affected nodes a behavior applies to.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum BehaviorPathRule {
    All,
    /// Only the main path.
    MainOnly,
    /// Only paths with at least one conversion.
    ConversionOnly,
    /// Only paths without conversions.
    NonConversion,
    /// Only paths whose last conversion is from the given stat.
    ConversionFrom(StatKey),
}

impl BehaviorPathRule {
    pub fn matches(&self, path: &PathDefinition) -> bool {
        match self {
            BehaviorPathRule::All => true,
            BehaviorPathRule::MainOnly => path.is_main(),
            BehaviorPathRule::ConversionOnly => path.is_conversion(),
            BehaviorPathRule::NonConversion => !path.is_conversion(),
            BehaviorPathRule::ConversionFrom(stat) => path
                .conversion_stats()
                .last()
                .is_some_and(|last| last.key() == stat),
        }
    }
}

/// A registered rewrite of specific nodes' formulas.
///
/// Equality compares the affected stats, node types and path rule, and
/// the identity of the transformation.
#[derive(Clone)]
pub struct Behavior {
    affected_stats: Vec<StatKey>,
    affected_node_types: Vec<NodeType>,
    path_rule: BehaviorPathRule,
    transformation: Rc<dyn ValueTransformation>,
}

impl Behavior {
    pub fn new(
        affected_stats: Vec<StatKey>,
        affected_node_types: Vec<NodeType>,
        path_rule: BehaviorPathRule,
        transformation: Rc<dyn ValueTransformation>,
    ) -> Self {
        Self {
            affected_stats,
            affected_node_types,
            path_rule,
            transformation,
        }
    }

    pub fn affected_stats(&self) -> &[StatKey] {
        &self.affected_stats
    }

    pub fn affected_node_types(&self) -> &[NodeType] {
        &self.affected_node_types
    }

    pub fn path_rule(&self) -> &BehaviorPathRule {
        &self.path_rule
    }

    pub fn transformation(&self) -> &Rc<dyn ValueTransformation> {
        &self.transformation
    }

    /// Whether node `(stat, node_type, path)` is affected.
    pub fn affects(&self, stat: &StatKey, node_type: NodeType, path: &PathDefinition) -> bool {
        self.affected_stats.contains(stat)
            && self.affected_node_types.contains(&node_type)
            && self.path_rule.matches(path)
    }

    fn transformation_address(&self) -> *const () {
        Rc::as_ptr(&self.transformation) as *const ()
    }
}

impl PartialEq for Behavior {
    fn eq(&self, other: &Self) -> bool {
        self.affected_stats == other.affected_stats
            && self.affected_node_types == other.affected_node_types
            && self.path_rule == other.path_rule
            && self.transformation_address() == other.transformation_address()
    }
}

impl Eq for Behavior {}

impl Hash for Behavior {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.affected_stats.hash(state);
        self.affected_node_types.hash(state);
        self.path_rule.hash(state);
        self.transformation_address().hash(state);
    }
}

impl fmt::Debug for Behavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Behavior")
            .field("affected_stats", &self.affected_stats)
            .field("affected_node_types", &self.affected_node_types)
            .field("path_rule", &self.path_rule)
            .finish()
    }
}

struct Registration {
    path: PathDefinition,
    value: Weak<TransformableValue>,
}

/// Applies installed behaviors to the transformable formulas of matching
/// nodes.
///
/// Installations are reference counted: a behavior shared by several
/// stats is applied once, and removed once the last stat declaring it
/// is gone. Formulas registered after a behavior was installed get it
/// applied on registration; behaviors always apply in installation
/// order.
#[derive(Default)]
pub struct ValueTransformer {
    installed: RefCell<IndexMap<Behavior, usize>>,
    values: RefCell<HashMap<(StatKey, NodeType), Vec<Registration>>>,
}

impl ValueTransformer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `behaviors`, applying those not installed yet.
    pub fn add_behaviors(&self, behaviors: &[Behavior]) {
        for behavior in behaviors {
            let newly_installed = {
                let mut installed = self.installed.borrow_mut();
                let count = installed.entry(behavior.clone()).or_insert(0);
                *count += 1;
                *count == 1
            };
            if newly_installed {
                let targets = self.affected_values(behavior);
                tracing::debug!(?behavior, nodes = targets.len(), "behavior installed");
                for value in targets {
                    value.add(behavior.transformation.clone());
                }
            }
        }
    }

    /// Release `behaviors`, removing those no longer declared by any stat.
    pub fn remove_behaviors(&self, behaviors: &[Behavior]) {
        for behavior in behaviors {
            let uninstalled = {
                let mut installed = self.installed.borrow_mut();
                match installed.get_mut(behavior) {
                    Some(count) if *count > 1 => {
                        *count -= 1;
                        false
                    }
                    Some(_) => {
                        installed.shift_remove(behavior);
                        true
                    }
                    None => false,
                }
            };
            if uninstalled {
                let targets = self.affected_values(behavior);
                tracing::debug!(?behavior, nodes = targets.len(), "behavior removed");
                for value in targets {
                    value.remove(&behavior.transformation);
                }
            }
        }
    }

    /// Register the formula of node `(stat, node_type, path)` and apply
    /// every installed behavior affecting it.
    pub fn add_value(
        &self,
        stat: &StatKey,
        node_type: NodeType,
        path: &PathDefinition,
        value: &Rc<TransformableValue>,
    ) {
        self.values
            .borrow_mut()
            .entry((stat.clone(), node_type))
            .or_default()
            .push(Registration {
                path: path.clone(),
                value: Rc::downgrade(value),
            });
        let transformations: Vec<Rc<dyn ValueTransformation>> = self
            .installed
            .borrow()
            .keys()
            .filter(|b| b.affects(stat, node_type, path))
            .map(|b| b.transformation.clone())
            .collect();
        for transformation in transformations {
            value.add(transformation);
        }
    }

    /// Forget the formula of node `(stat, node_type, path)`.
    pub fn remove_value(&self, stat: &StatKey, node_type: NodeType, path: &PathDefinition) {
        let mut values = self.values.borrow_mut();
        let key = (stat.clone(), node_type);
        if let Some(registrations) = values.get_mut(&key) {
            registrations.retain(|r| &r.path != path);
            if registrations.is_empty() {
                values.remove(&key);
            }
        }
    }

    /// How many stats currently declare `behavior`.
    pub fn installation_count(&self, behavior: &Behavior) -> usize {
        self.installed.borrow().get(behavior).copied().unwrap_or(0)
    }

    fn affected_values(&self, behavior: &Behavior) -> Vec<Rc<TransformableValue>> {
        let values = self.values.borrow();
        let mut affected = Vec::new();
        for stat in &behavior.affected_stats {
            for node_type in &behavior.affected_node_types {
                let Some(registrations) = values.get(&(stat.clone(), *node_type)) else {
                    continue;
                };
                affected.extend(
                    registrations
                        .iter()
                        .filter(|r| behavior.path_rule.matches(&r.path))
                        .filter_map(|r| r.value.upgrade()),
                );
            }
        }
        affected
    }
}
