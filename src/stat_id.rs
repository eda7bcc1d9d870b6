//! Stat identity strings.
//!
//! A `StatId` is the textual half of a stat's identity (the other half is
//! the owning [`Entity`](crate::stat::Entity)). It is shared through an
//! `Arc<str>` so cloning keys for node lookups stays cheap.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::sync::Arc;

/// Interned identity string of a stat, e.g. `"Life"` or `"Fire.Damage"`.
///
/// # Examples
///
/// ```rust
/// use statgraph::StatId;
///
/// let life = StatId::new("Life");
/// let same: StatId = "Life".into();
/// assert_eq!(life, same);
/// assert_eq!(life.as_str(), "Life");
/// ```
#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct StatId(Arc<str>);

impl Serialize for StatId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.as_ref().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for StatId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(StatId::from(s))
    }
}

impl StatId {
    /// Create a new `StatId` from a string slice.
    pub fn new(s: &str) -> Self {
        Self(Arc::from(s))
    }

    /// The identity string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Build the identity of a stat derived from this one, e.g.
    /// `Fire.Damage` + `ConvertTo` → `Fire.Damage.ConvertTo`.
    pub fn child(&self, suffix: &str) -> Self {
        Self(Arc::from(format!("{}.{}", self.0, suffix)))
    }
}

impl From<&str> for StatId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for StatId {
    fn from(s: String) -> Self {
        Self(Arc::from(s))
    }
}

impl std::fmt::Display for StatId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stat_id_equality() {
        let id1 = StatId::new("Life");
        let id2: StatId = String::from("Life").into();
        assert_eq!(id1, id2);
        assert_eq!(id1.as_str(), "Life");
    }

    #[test]
    fn test_stat_id_child() {
        let fire = StatId::new("Fire.Damage");
        assert_eq!(fire.child("Conversion").as_str(), "Fire.Damage.Conversion");
    }

    #[test]
    fn test_stat_id_serde_is_plain_string() {
        let id = StatId::new("Mana");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"Mana\"");
        let back: StatId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
