//! Modifier sources.
//!
//! A [`ModifierSource`] says where a modifier comes from. Only the
//! canonical, data-only form takes part in calculations; display
//! information (item names, skill names, ...) travels separately in a
//! [`DetailedSource`] and never influences equality.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Equipment slots items can be worn in.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ItemSlot {
    MainHand,
    OffHand,
    Helm,
    BodyArmour,
    Gloves,
    Boots,
    Amulet,
    Ring,
    Ring2,
    Belt,
}

impl fmt::Display for ItemSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// The differentiated local sources.
#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LocalSource {
    /// Modifiers every character has, e.g. "x per y dexterity".
    Given,
    /// A passive tree node, identified by its node id.
    PassiveNode(u16),
    /// An item worn in the given slot.
    Item(ItemSlot),
    /// A skill, identified by its skill id.
    Skill(String),
    /// A gem socketed into an item.
    Gem { slot: ItemSlot, socket_index: u32 },
    /// Modifiers entered by the user.
    UserSpecified,
}

/// Canonical source of a modifier.
///
/// # Examples
///
/// ```rust
/// use statgraph::{ItemSlot, LocalSource, ModifierSource};
///
/// let helm = ModifierSource::Local(LocalSource::Item(ItemSlot::Helm));
/// assert_eq!(
///     helm.influencing_sources(),
///     vec![helm.clone(), ModifierSource::Global]
/// );
/// assert_eq!(ModifierSource::Global.influencing_sources(), vec![ModifierSource::Global]);
/// ```
#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ModifierSource {
    /// Applies everywhere. Most tree, item and skill modifiers are global.
    Global,
    /// Applies only to values of the same local source.
    Local(LocalSource),
    /// Values originating from an ailment.
    Ailment,
}

impl Default for ModifierSource {
    fn default() -> Self {
        ModifierSource::Global
    }
}

impl ModifierSource {
    /// The canonical sources whose Increase/More modifiers apply to base
    /// values of this source, starting with this source itself.
    pub fn influencing_sources(&self) -> Vec<ModifierSource> {
        match self {
            ModifierSource::Global => vec![ModifierSource::Global],
            other => vec![other.clone(), ModifierSource::Global],
        }
    }

    /// Whether this is a skill's local source.
    pub fn is_skill(&self) -> bool {
        matches!(self, ModifierSource::Local(LocalSource::Skill(_)))
    }

    /// Whether this is the global source.
    pub fn is_global(&self) -> bool {
        matches!(self, ModifierSource::Global)
    }
}

impl fmt::Display for ModifierSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModifierSource::Global => write!(f, "Global"),
            ModifierSource::Ailment => write!(f, "Ailment"),
            ModifierSource::Local(local) => match local {
                LocalSource::Given => write!(f, "Given"),
                LocalSource::PassiveNode(id) => write!(f, "PassiveNode({})", id),
                LocalSource::Item(slot) => write!(f, "{}", slot),
                LocalSource::Skill(id) => write!(f, "Skill({})", id),
                LocalSource::Gem { slot, socket_index } => write!(f, "Gem({}, {})", slot, socket_index),
                LocalSource::UserSpecified => write!(f, "UserSpecified"),
            },
        }
    }
}

/// A canonical source plus a display name, e.g. the item's name.
///
/// Two detailed sources are equal when their canonical sources are.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DetailedSource {
    canonical: ModifierSource,
    name: String,
}

impl DetailedSource {
    /// Attach a display name to a canonical source.
    pub fn new(canonical: ModifierSource, name: impl Into<String>) -> Self {
        Self {
            canonical,
            name: name.into(),
        }
    }

    /// The part of the source relevant for calculations.
    pub fn canonical(&self) -> &ModifierSource {
        &self.canonical
    }

    /// The display name (may be empty).
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl PartialEq for DetailedSource {
    fn eq(&self, other: &Self) -> bool {
        self.canonical == other.canonical
    }
}

impl Eq for DetailedSource {}

impl From<ModifierSource> for DetailedSource {
    fn from(canonical: ModifierSource) -> Self {
        Self::new(canonical, "")
    }
}

impl fmt::Display for DetailedSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.name.is_empty() {
            write!(f, "{}", self.canonical)
        } else {
            write!(f, "{}: {}", self.canonical, self.name)
        }
    }
}
