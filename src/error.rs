//! Error types for stat calculation.
//!
//! Every fatal configuration defect is represented by the
//! `CalculationError` enum. A missing value is not an error: it is
//! `Ok(None)` and flows through the graph like any other result.

use crate::node_type::Form;
use crate::node_value::NodeValue;
use thiserror::Error;

/// Format a cycle path as a readable string.
fn format_cycle_path(path: &[String]) -> String {
    if path.is_empty() {
        return String::from("(empty cycle)");
    }
    path.join(" -> ")
}

fn format_values(values: &[NodeValue]) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result alias used by every fallible calculation.
pub type CalcResult<T> = Result<T, CalculationError>;

/// Errors that can occur while calculating node values.
///
/// All variants describe bad modifier wiring. They are raised at the
/// point of violation and never cached, so fixing the offending
/// modifiers and reading again recovers.
///
/// # Examples
///
/// ```rust
/// use statgraph::CalculationError;
///
/// let err = CalculationError::Cycle {
///     path: vec!["Life Total".into(), "Mana Total".into(), "Life Total".into()],
/// };
/// assert_eq!(
///     err.to_string(),
///     "Cyclic dependency detected: Life Total -> Mana Total -> Life Total"
/// );
/// ```
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CalculationError {
    /// A cached node was re-entered while its value was being computed.
    ///
    /// The path lists the node labels of the cycle, starting and ending
    /// with the re-entered node.
    #[error("Cyclic dependency detected: {}", format_cycle_path(.path))]
    Cycle { path: Vec<String> },

    /// More than one BaseSet contributor is non-zero on the same bound.
    #[error("Only one BaseSet modifier may be non-zero, got: {}", format_values(.values))]
    AmbiguousBaseSet { values: Vec<NodeValue> },

    /// Distinct override values were given and none of them is zero.
    #[error("Override modifiers conflict, got: {}", format_values(.values))]
    ConflictingOverrides { values: Vec<NodeValue> },

    /// A maximum-aggregated form was queried with paths that mix the
    /// affected stat with other stats.
    #[error("{form} values of {stat} were queried together with values of other stats")]
    InconsistentMaximumAggregation { stat: String, form: Form },

    /// A node outlived the graph that created it.
    #[error("The calculation graph owning this node was released")]
    GraphReleased,

    /// A behavior outlived the stat factory it reads meta stats from.
    #[error("The stat factory owning this behavior was released")]
    StatFactoryReleased,
}

impl CalculationError {
    /// Start a cycle error at the re-entered node.
    pub(crate) fn cycle_at(label: &str) -> Self {
        CalculationError::Cycle {
            path: vec![label.to_string()],
        }
    }

    /// Whether this error is a cycle whose path is already closed.
    pub fn is_closed_cycle(&self) -> bool {
        match self {
            CalculationError::Cycle { path } => path.len() > 1 && path.first() == path.last(),
            _ => false,
        }
    }

    /// Add a caching node that the error unwound through to an open cycle
    /// path. Once the re-entered node is reached again the path is closed
    /// and put into evaluation order.
    pub(crate) fn unwind_through(self, label: &str) -> Self {
        match self {
            CalculationError::Cycle { mut path } if path.len() == 1 || path.first() != path.last() => {
                path.push(label.to_string());
                if path.len() > 1 && path.first() == path.last() {
                    path.reverse();
                }
                CalculationError::Cycle { path }
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_error_display() {
        let err = CalculationError::Cycle {
            path: vec!["A".into(), "B".into(), "C".into(), "A".into()],
        };
        let display = err.to_string();
        assert!(display.contains("Cyclic dependency detected"));
        assert!(display.contains("A -> B -> C -> A"));
    }

    #[test]
    fn test_cycle_path_closes_in_evaluation_order() {
        // A reads B, B reads C, C re-enters A.
        let err = CalculationError::cycle_at("A")
            .unwind_through("C")
            .unwind_through("B");
        assert!(!err.is_closed_cycle());

        let err = err.unwind_through("A");
        assert!(err.is_closed_cycle());
        assert_eq!(
            err,
            CalculationError::Cycle {
                path: vec!["A".into(), "B".into(), "C".into(), "A".into()]
            }
        );

        // Frames above the cycle leave the path untouched.
        let err = err.unwind_through("Outer");
        assert_eq!(err.to_string(), "Cyclic dependency detected: A -> B -> C -> A");
    }

    #[test]
    fn test_self_cycle() {
        let err = CalculationError::cycle_at("A").unwind_through("A");
        assert!(err.is_closed_cycle());
        assert_eq!(err.to_string(), "Cyclic dependency detected: A -> A");
    }

    #[test]
    fn test_value_errors_display() {
        let err = CalculationError::AmbiguousBaseSet {
            values: vec![NodeValue::from(5.0), NodeValue::from(3.0)],
        };
        assert!(err.to_string().contains("5, 3"));

        let err = CalculationError::InconsistentMaximumAggregation {
            stat: "Skill.ItemSlot".into(),
            form: Form::BaseSet,
        };
        assert!(err.to_string().contains("BaseSet values of Skill.ItemSlot"));
    }

    #[test]
    fn test_non_cycle_errors_pass_unwinding_unchanged() {
        let err = CalculationError::GraphReleased.unwind_through("A");
        assert_eq!(err, CalculationError::GraphReleased);
    }
}
