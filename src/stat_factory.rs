//! Meta stats and the behaviors they carry.
//!
//! Game mechanics such as conversion or regeneration are modelled as
//! stats derived from other stats (`Bar.ConvertTo(Foo)`, `Life.Regen`).
//! [`StatFactory`] creates them on demand, caches them by identity and
//! attaches the behaviors implementing the mechanic. Behaviors are
//! cached too, so every stat declaring a behavior shares one instance and
//! the transformer applies it once.

use crate::behavior::{
    AffectedByModifiersTo, AilmentDamageBase, AilmentDamageIncreaseMore, AilmentDamageUncappedSubtotal,
    Behavior, BehaviorPathRule, ConversionSourcePathTotal, ConversionTargetBase,
    ConversionTargetUncappedSubtotal, ConvertToUncappedSubtotal, DamageEffectivenessBase,
    MaximumFormAggregating, RegenUncappedSubtotal, RequirementUncappedSubtotal, Rounding,
    SkillConversionUncappedSubtotal,
};
use crate::modifier::Modifier;
use crate::node_type::{Form, NodeType};
use crate::source::{DetailedSource, ItemSlot};
use crate::stat::{Entity, Stat, StatBuilder, StatKey, StatValueType};
use crate::stat_id::StatId;
use crate::transformable::ValueTransformation;
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

macro_rules! indexed_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, Serialize, Deserialize)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// The variant as a stat value.
            pub fn value(self) -> f64 {
                self as usize as f64
            }

            /// The variant a stat value selects, if any.
            pub fn from_value(value: f64) -> Option<Self> {
                if value < 0.0 {
                    return None;
                }
                Self::ALL.get(value.round() as usize).copied()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Debug::fmt(self, f)
            }
        }
    };
}

indexed_enum!(
    /// A resource pool that regenerates.
    Pool { Life, Mana, EnergyShield }
);

indexed_enum!(
    /// A damage type.
    DamageType { Physical, Lightning, Cold, Fire, Chaos }
);

indexed_enum!(
    /// A damaging ailment.
    Ailment { Ignite, Bleed, Poison }
);

/// Creates and caches meta stats.
pub struct StatFactory {
    self_weak: Weak<StatFactory>,
    stats: RefCell<HashMap<StatKey, Stat>>,
    behaviors: RefCell<HashMap<String, Behavior>>,
}

impl StatFactory {
    pub fn new() -> Rc<Self> {
        Rc::new_cyclic(|weak| Self {
            self_weak: weak.clone(),
            stats: RefCell::new(HashMap::new()),
            behaviors: RefCell::new(HashMap::new()),
        })
    }

    /// Number of distinct stats created so far.
    pub fn stat_count(&self) -> usize {
        self.stats.borrow().len()
    }

    fn get_or_create(&self, id: impl Into<StatId>, entity: Entity, create: impl FnOnce(Stat) -> Stat) -> Stat {
        let key = StatKey::new(id, entity);
        if let Some(stat) = self.stats.borrow().get(&key) {
            return stat.clone();
        }
        let stat = create(Stat::builder(key.id.clone()).entity(entity).build());
        self.stats.borrow_mut().entry(key).or_insert(stat).clone()
    }

    fn behavior(
        &self,
        cache_key: String,
        affected_stats: Vec<StatKey>,
        affected_node_types: Vec<NodeType>,
        path_rule: BehaviorPathRule,
        transformation: impl FnOnce() -> Rc<dyn ValueTransformation>,
    ) -> Behavior {
        if let Some(behavior) = self.behaviors.borrow().get(&cache_key) {
            return behavior.clone();
        }
        let behavior = Behavior::new(affected_stats, affected_node_types, path_rule, transformation());
        self.behaviors
            .borrow_mut()
            .entry(cache_key)
            .or_insert(behavior)
            .clone()
    }

    /// The percentage of `source` converted to `target`.
    pub fn convert_to(&self, source: &Stat, target: &Stat) -> Stat {
        let id = format!("{}.ConvertTo({})", source.id(), target.id());
        self.get_or_create(id, source.entity(), |stat| {
            let behaviors = vec![
                self.conversion_target_base(source, target),
                self.conversion_target_uncapped_subtotal(source, target),
                self.conversion_source_path_total(source),
                self.behavior(
                    format!("ConvertToUncappedSubtotal({})", stat.key()),
                    vec![stat.key().clone()],
                    vec![NodeType::UncappedSubtotal],
                    BehaviorPathRule::All,
                    || ConvertToUncappedSubtotal::new(source.clone(), stat.key().clone(), self.self_weak.clone()),
                ),
            ];
            rebuild(&stat).behaviors(behaviors).build()
        })
    }

    /// The percentage of `source` gained additionally as `target`.
    pub fn gain_as(&self, source: &Stat, target: &Stat) -> Stat {
        let id = format!("{}.GainAs({})", source.id(), target.id());
        self.get_or_create(id, source.entity(), |stat| {
            let behaviors = vec![
                self.conversion_target_base(source, target),
                self.conversion_target_uncapped_subtotal(source, target),
            ];
            rebuild(&stat).behaviors(behaviors).build()
        })
    }

    /// The total percentage of `source` converted to any stat.
    pub fn conversion(&self, source: &Stat) -> Stat {
        self.get_or_create(source.id().child("Conversion"), source.entity(), |stat| stat)
    }

    /// The percentage of `source` converted by skills.
    pub fn skill_conversion(&self, source: &Stat) -> Stat {
        let id = source.id().child("SkillConversion");
        self.get_or_create(id, source.entity(), |stat| {
            let behavior = self.behavior(
                format!("SkillConversionUncappedSubtotal({})", stat.key()),
                vec![stat.key().clone()],
                vec![NodeType::UncappedSubtotal],
                BehaviorPathRule::All,
                || SkillConversionUncappedSubtotal::new(stat.key().clone()),
            );
            rebuild(&stat).behaviors(vec![behavior]).build()
        })
    }

    /// Regeneration of `pool`.
    pub fn regen(&self, entity: Entity, pool: Pool) -> Stat {
        self.get_or_create(format!("{}.Regen", pool), entity, |stat| {
            let behavior = self.behavior(
                format!("RegenUncappedSubtotal({})", stat.key()),
                vec![stat.key().clone()],
                vec![NodeType::UncappedSubtotal],
                BehaviorPathRule::All,
                || RegenUncappedSubtotal::new(entity, pool, self.self_weak.clone()),
            );
            rebuild(&stat).behaviors(vec![behavior]).build()
        })
    }

    /// The pool the regeneration of `pool` applies to, as a [`Pool`]
    /// value. Without a value it applies to `pool` itself.
    pub fn regen_target_pool(&self, entity: Entity, pool: Pool) -> Stat {
        self.get_or_create(format!("{}.Regen.TargetPool", pool), entity, |stat| {
            rebuild(&stat).value_type(StatValueType::Integer).build()
        })
    }

    /// The requirement of `stat`, the highest of its sources.
    pub fn requirement(&self, stat: &Stat) -> Stat {
        self.get_or_create(stat.id().child("Required"), stat.entity(), |required| {
            let behavior = self.behavior(
                format!("RequirementUncappedSubtotal({})", required.key()),
                vec![required.key().clone()],
                vec![NodeType::UncappedSubtotal],
                BehaviorPathRule::All,
                || RequirementUncappedSubtotal::new(required.key().clone()),
            );
            rebuild(&required)
                .explicitly_registered(true)
                .behaviors(vec![behavior])
                .build()
        })
    }

    /// A property of the item in `slot`. Totals are rounded to two
    /// decimals, or to integers for non-double stats.
    pub fn item_property(&self, stat: &Stat, slot: ItemSlot) -> Stat {
        let id = format!("{}.{}", stat.id(), slot);
        self.get_or_create(id, stat.entity(), |property| {
            let decimals = match stat.value_type() {
                StatValueType::Double => 2,
                _ => 0,
            };
            let behavior = self.behavior(
                format!("Rounding({})", property.key()),
                vec![property.key().clone()],
                vec![NodeType::Total],
                BehaviorPathRule::All,
                || Rounding::new(decimals),
            );
            rebuild(&property)
                .value_type(stat.value_type())
                .behaviors(vec![behavior])
                .build()
        })
    }

    /// The item slot of the active skill `skill`. Of several BaseSet
    /// modifiers the highest wins.
    pub fn active_skill_item_slot(&self, entity: Entity, skill: &str) -> Stat {
        self.get_or_create(format!("{}.ActiveSkillItemSlot", skill), entity, |stat| {
            let behavior = self.behavior(
                format!("MaximumFormAggregating({})", stat.key()),
                vec![stat.key().clone()],
                vec![NodeType::BaseSet],
                BehaviorPathRule::All,
                || MaximumFormAggregating::new(stat.key().clone(), Form::BaseSet),
            );
            rebuild(&stat)
                .value_type(StatValueType::Integer)
                .behaviors(vec![behavior])
                .build()
        })
    }

    /// Hit damage of one damage type.
    pub fn hit_damage(&self, entity: Entity, damage_type: DamageType) -> Stat {
        self.get_or_create(format!("{}.Damage.Hit", damage_type), entity, |stat| {
            let behavior = self.behavior(
                format!("DamageEffectivenessBase({})", stat.key()),
                vec![stat.key().clone()],
                vec![NodeType::Base],
                BehaviorPathRule::NonConversion,
                || DamageEffectivenessBase::new(stat.key().clone(), entity, self.self_weak.clone()),
            );
            rebuild(&stat).behaviors(vec![behavior]).build()
        })
    }

    /// Damage of `ailment` inflicted with one damage type.
    pub fn ailment_damage(&self, entity: Entity, damage_type: DamageType, ailment: Ailment) -> Stat {
        let id = format!("{}.Damage.{}", damage_type, ailment);
        self.get_or_create(id, entity, |stat| {
            let hit = self.hit_damage(entity, damage_type);
            let key = stat.key().clone();
            let behaviors = vec![
                self.behavior(
                    format!("AilmentDamageUncappedSubtotal({})", key),
                    vec![key.clone()],
                    vec![NodeType::UncappedSubtotal],
                    BehaviorPathRule::All,
                    || AilmentDamageUncappedSubtotal::new(key.clone(), hit.clone()),
                ),
                self.behavior(
                    format!("AilmentDamageBase({})", key),
                    vec![key.clone()],
                    vec![NodeType::Base],
                    BehaviorPathRule::NonConversion,
                    || AilmentDamageBase::new(key.clone(), hit.clone(), self.self_weak.clone()),
                ),
                self.behavior(
                    format!("AilmentDamageIncreaseMore({})", key),
                    vec![key.clone()],
                    vec![NodeType::Increase, NodeType::More],
                    BehaviorPathRule::All,
                    || AilmentDamageIncreaseMore::new(key.clone(), entity, ailment, self.self_weak.clone()),
                ),
            ];
            rebuild(&stat).behaviors(behaviors).build()
        })
    }

    /// The damage type `ailment` deals, as a [`DamageType`] value.
    pub fn ailment_dealt_damage_type(&self, entity: Entity, ailment: Ailment) -> Stat {
        self.get_or_create(format!("{}.DamageType", ailment), entity, |stat| {
            rebuild(&stat).value_type(StatValueType::Integer).build()
        })
    }

    /// Effectiveness of BaseSet damage modifiers.
    pub fn damage_base_set_effectiveness(&self, entity: Entity) -> Stat {
        self.get_or_create("DamageBaseSetEffectiveness", entity, |stat| stat)
    }

    /// Effectiveness of BaseAdd damage modifiers.
    pub fn damage_base_add_effectiveness(&self, entity: Entity) -> Stat {
        self.get_or_create("DamageBaseAddEffectiveness", entity, |stat| stat)
    }

    /// The percentage of modifiers of `form` to `other` that also apply to
    /// `stat`.
    pub fn affected_by_modifiers_to(&self, stat: &Stat, other: &Stat, form: Form) -> Stat {
        let id = format!("{}.AffectedByModifiersTo({}).{}", stat.id(), other.id(), form);
        self.get_or_create(id, stat.entity(), |meta| {
            let behavior = self.behavior(
                format!("AffectedByModifiersTo({},{},{})", stat.key(), other.key(), form),
                vec![stat.key().clone()],
                vec![form.node_type()],
                BehaviorPathRule::All,
                || AffectedByModifiersTo::new(stat.clone(), other.clone(), form, self.self_weak.clone()),
            );
            rebuild(&meta).behaviors(vec![behavior]).build()
        })
    }

    /// A modifier converting `value` percent of `source` to `target`.
    ///
    /// The modifier targets the ConvertTo stat as well as the source's
    /// Conversion and SkillConversion stats, which need to see every
    /// conversion of the source.
    pub fn conversion_modifier(
        &self,
        source: &Stat,
        target: &Stat,
        value: Rc<dyn Value>,
        origin: impl Into<DetailedSource>,
    ) -> Modifier {
        Modifier::new(
            vec![
                self.convert_to(source, target),
                self.conversion(source),
                self.skill_conversion(source),
            ],
            Form::BaseAdd,
            value,
            origin,
        )
    }

    /// A modifier gaining `value` percent of `source` as `target`.
    pub fn gain_as_modifier(
        &self,
        source: &Stat,
        target: &Stat,
        value: Rc<dyn Value>,
        origin: impl Into<DetailedSource>,
    ) -> Modifier {
        Modifier::new(vec![self.gain_as(source, target)], Form::BaseAdd, value, origin)
    }

    fn conversion_target_base(&self, source: &Stat, target: &Stat) -> Behavior {
        self.behavior(
            format!("ConversionTargetBase({},{})", source.key(), target.key()),
            vec![target.key().clone()],
            vec![NodeType::Base],
            BehaviorPathRule::ConversionFrom(source.key().clone()),
            || ConversionTargetBase::new(source.clone(), target.clone(), self.self_weak.clone()),
        )
    }

    fn conversion_target_uncapped_subtotal(&self, source: &Stat, target: &Stat) -> Behavior {
        self.behavior(
            format!("ConversionTargetUncappedSubtotal({},{})", source.key(), target.key()),
            vec![target.key().clone()],
            vec![NodeType::UncappedSubtotal],
            BehaviorPathRule::All,
            || ConversionTargetUncappedSubtotal::new(source.clone(), target.key().clone()),
        )
    }

    fn conversion_source_path_total(&self, source: &Stat) -> Behavior {
        self.behavior(
            format!("ConversionSourcePathTotal({})", source.key()),
            vec![source.key().clone()],
            vec![NodeType::PathTotal],
            BehaviorPathRule::All,
            || ConversionSourcePathTotal::new(source.clone(), self.self_weak.clone()),
        )
    }
}

/// A builder for a stat with the identity of `stat`.
fn rebuild(stat: &Stat) -> StatBuilder {
    Stat::builder(stat.id().clone()).entity(stat.entity())
}
