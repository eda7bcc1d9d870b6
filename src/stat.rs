//! Stats: the identities calculation subgraphs are built for.

use crate::behavior::Behavior;
use crate::stat_id::StatId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

/// The entity a stat belongs to.
#[derive(
    Debug, Clone, Copy, Default, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum Entity {
    #[default]
    Character,
    Enemy,
    Totem,
    Minion,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// The kind of number a stat holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatValueType {
    #[default]
    Double,
    Integer,
    Boolean,
}

/// The identity of a stat: `(id, entity)`.
///
/// This is everything stat equality looks at. Behaviors refer to the
/// stats they affect through keys so stats can name each other without
/// owning each other.
#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StatKey {
    pub id: StatId,
    pub entity: Entity,
}

impl StatKey {
    /// Create a key.
    pub fn new(id: impl Into<StatId>, entity: Entity) -> Self {
        Self {
            id: id.into(),
            entity,
        }
    }
}

impl fmt::Display for StatKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.entity {
            Entity::Character => write!(f, "{}", self.id),
            entity => write!(f, "{}.{}", entity, self.id),
        }
    }
}

struct StatMeta {
    minimum: Option<Stat>,
    maximum: Option<Stat>,
    value_type: StatValueType,
    explicitly_registered: bool,
    behaviors: Vec<Behavior>,
}

/// An identified, per-entity calculation subgraph, e.g. "character Life".
///
/// Besides its identity a stat carries optional bounding stats for its
/// subtotal, its value type, whether hosts want to see it, and the
/// behaviors installed while its subgraph exists. None of these take
/// part in equality.
///
/// # Examples
///
/// ```rust
/// use statgraph::{Entity, Stat};
///
/// let life = Stat::builder("Life")
///     .maximum(Stat::new("Life.Cap"))
///     .explicitly_registered(true)
///     .build();
///
/// assert_eq!(life, Stat::new("Life"));
/// assert_ne!(life, Stat::builder("Life").entity(Entity::Enemy).build());
/// assert!(life.is_explicitly_registered());
/// ```
#[derive(Clone)]
pub struct Stat {
    key: StatKey,
    meta: Rc<StatMeta>,
}

impl Stat {
    /// A character stat without bounds or behaviors.
    pub fn new(id: impl Into<StatId>) -> Self {
        Self::builder(id).build()
    }

    /// Start building a stat.
    pub fn builder(id: impl Into<StatId>) -> StatBuilder {
        StatBuilder {
            key: StatKey::new(id, Entity::Character),
            minimum: None,
            maximum: None,
            value_type: StatValueType::Double,
            explicitly_registered: false,
            behaviors: Vec::new(),
        }
    }

    pub fn id(&self) -> &StatId {
        &self.key.id
    }

    pub fn entity(&self) -> Entity {
        self.key.entity
    }

    pub fn key(&self) -> &StatKey {
        &self.key
    }

    /// The stat whose total's minimum bounds this stat's subtotal.
    pub fn minimum(&self) -> Option<&Stat> {
        self.meta.minimum.as_ref()
    }

    /// The stat whose total's maximum bounds this stat's subtotal.
    pub fn maximum(&self) -> Option<&Stat> {
        self.meta.maximum.as_ref()
    }

    pub fn value_type(&self) -> StatValueType {
        self.meta.value_type
    }

    /// Whether hosts want to display this stat.
    pub fn is_explicitly_registered(&self) -> bool {
        self.meta.explicitly_registered
    }

    /// Behaviors installed while this stat's subgraph exists, in
    /// registration order.
    pub fn behaviors(&self) -> &[Behavior] {
        &self.meta.behaviors
    }
}

impl PartialEq for Stat {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for Stat {}

impl Hash for Stat {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl fmt::Debug for Stat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stat")
            .field("id", &self.key.id)
            .field("entity", &self.key.entity)
            .finish()
    }
}

impl fmt::Display for Stat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key)
    }
}

/// Builder for [`Stat`].
pub struct StatBuilder {
    key: StatKey,
    minimum: Option<Stat>,
    maximum: Option<Stat>,
    value_type: StatValueType,
    explicitly_registered: bool,
    behaviors: Vec<Behavior>,
}

impl StatBuilder {
    pub fn entity(mut self, entity: Entity) -> Self {
        self.key.entity = entity;
        self
    }

    pub fn minimum(mut self, minimum: Stat) -> Self {
        self.minimum = Some(minimum);
        self
    }

    pub fn maximum(mut self, maximum: Stat) -> Self {
        self.maximum = Some(maximum);
        self
    }

    pub fn value_type(mut self, value_type: StatValueType) -> Self {
        self.value_type = value_type;
        self
    }

    pub fn explicitly_registered(mut self, explicitly_registered: bool) -> Self {
        self.explicitly_registered = explicitly_registered;
        self
    }

    pub fn behaviors(mut self, behaviors: Vec<Behavior>) -> Self {
        self.behaviors = behaviors;
        self
    }

    pub fn build(self) -> Stat {
        Stat {
            key: self.key,
            meta: Rc::new(StatMeta {
                minimum: self.minimum,
                maximum: self.maximum,
                value_type: self.value_type,
                explicitly_registered: self.explicitly_registered,
                behaviors: self.behaviors,
            }),
        }
    }
}
