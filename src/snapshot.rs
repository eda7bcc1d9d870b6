//! Stat snapshots.
//!
//! Contains the `StatSnapshot` type, a read-back of one stat's values with
//! a per-path breakdown for debugging and display.

use crate::node_value::NodeValue;
use crate::stat::StatKey;
use serde::{Deserialize, Serialize};

/// The values of one path of a stat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathSnapshot {
    /// The path, rendered as `source` or `source via A -> B`.
    pub path: String,
    pub path_total: Option<NodeValue>,
    pub base: Option<NodeValue>,
    pub increase: Option<NodeValue>,
    pub more: Option<NodeValue>,
}

/// The values of a stat with a breakdown by path.
///
/// This is read-only and serializable; it does not follow later changes.
///
/// # Examples
///
/// ```rust
/// use statgraph::{Calculator, Form, Modifier, ModifierSource, NodeValue, Stat};
///
/// let calculator = Calculator::new();
/// let life = Stat::new("Life");
/// calculator.add_modifier(Modifier::constant(vec![life.clone()], Form::BaseAdd, 100.0, ModifierSource::Global));
/// calculator.add_modifier(Modifier::constant(vec![life.clone()], Form::Increase, 20.0, ModifierSource::Global));
///
/// let snapshot = calculator.snapshot(&life).unwrap();
/// assert_eq!(snapshot.total, Some(NodeValue::from(120.0)));
/// assert_eq!(snapshot.paths.len(), 1);
/// assert_eq!(snapshot.paths[0].base, Some(NodeValue::from(100.0)));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatSnapshot {
    /// The stat.
    pub stat: StatKey,

    /// The final value.
    pub total: Option<NodeValue>,

    /// The value before overrides, clipped to the stat's bounds.
    pub subtotal: Option<NodeValue>,

    /// The sum of the path totals.
    pub uncapped_subtotal: Option<NodeValue>,

    /// Breakdown of every path, in the order the paths appeared.
    pub paths: Vec<PathSnapshot>,
}

impl StatSnapshot {
    /// Serialize the snapshot to pretty-printed JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// The breakdown of the path rendered as `path`.
    pub fn path(&self, path: &str) -> Option<&PathSnapshot> {
        self.paths.iter().find(|p| p.path == path)
    }
}
