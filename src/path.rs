//! Paths values flow through.

use crate::source::ModifierSource;
use crate::stat::Stat;
use std::fmt;

/// A canonical modifier source plus the chain of stats a value was
/// converted through to reach the current stat.
///
/// # Examples
///
/// ```rust
/// use statgraph::{ModifierSource, PathDefinition, Stat};
///
/// let main = PathDefinition::main();
/// assert!(main.is_main());
///
/// let converted = main.extended_by(Stat::new("Physical.Damage"));
/// assert!(converted.is_conversion());
/// assert_eq!(converted.source(), &ModifierSource::Global);
/// assert_eq!(converted.without_last_conversion(), Some(main));
/// ```
#[derive(Debug, Clone, Default, Hash, PartialEq, Eq)]
pub struct PathDefinition {
    source: ModifierSource,
    conversion_stats: Vec<Stat>,
}

impl PathDefinition {
    /// The global source without conversions.
    pub fn main() -> Self {
        Self::default()
    }

    /// A path of the given source without conversions.
    pub fn new(source: ModifierSource) -> Self {
        Self {
            source,
            conversion_stats: Vec::new(),
        }
    }

    /// A path of the given source converted through `conversion_stats`.
    pub fn with_conversions(source: ModifierSource, conversion_stats: Vec<Stat>) -> Self {
        Self {
            source,
            conversion_stats,
        }
    }

    pub fn source(&self) -> &ModifierSource {
        &self.source
    }

    /// Stats traversed before reaching the current stat, oldest first.
    pub fn conversion_stats(&self) -> &[Stat] {
        &self.conversion_stats
    }

    pub fn is_main(&self) -> bool {
        self.source.is_global() && self.conversion_stats.is_empty()
    }

    pub fn is_conversion(&self) -> bool {
        !self.conversion_stats.is_empty()
    }

    /// This path as seen from a stat `stat` converts into.
    pub fn extended_by(&self, stat: Stat) -> Self {
        let mut conversion_stats = self.conversion_stats.clone();
        conversion_stats.push(stat);
        Self {
            source: self.source.clone(),
            conversion_stats,
        }
    }

    /// The path this one was converted from, if it is a conversion path.
    pub fn without_last_conversion(&self) -> Option<Self> {
        let (_, rest) = self.conversion_stats.split_last()?;
        Some(Self {
            source: self.source.clone(),
            conversion_stats: rest.to_vec(),
        })
    }
}

impl fmt::Display for PathDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.source)?;
        if !self.conversion_stats.is_empty() {
            let chain = self
                .conversion_stats
                .iter()
                .map(|s| s.to_string())
                .collect::<Vec<_>>()
                .join(" -> ");
            write!(f, " via {}", chain)?;
        }
        Ok(())
    }
}
