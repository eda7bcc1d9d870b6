//! Per-form combination of modifier values.
//!
//! | Form | Aggregation |
//! |---|---|
//! | Increase | Σ(v/100) |
//! | More | Π(1 + v/100) |
//! | BaseAdd | Σ(v) |
//! | BaseSet | the single non-zero contributor of each bound |
//! | BaseOverride, TotalOverride | the single distinct value, or zero if one contributor is zero |
//!
//! Absent contributors are ignored. Without any contributor every form
//! aggregates to `None`.

use crate::error::{CalcResult, CalculationError};
use crate::node_type::Form;
use crate::node_value::NodeValue;

/// Combine the modifier values of one form.
///
/// # Examples
///
/// ```rust
/// use statgraph::aggregation::aggregate;
/// use statgraph::{Form, NodeValue};
///
/// let values = [Some(NodeValue::from(20.0)), Some(NodeValue::from(10.0))];
/// assert_eq!(aggregate(Form::Increase, &values).unwrap(), Some(NodeValue::from(0.3)));
/// assert_eq!(aggregate(Form::More, &values).unwrap(), Some(NodeValue::from(1.2 * 1.1)));
/// assert_eq!(aggregate(Form::BaseAdd, &[]).unwrap(), None);
/// ```
pub fn aggregate(form: Form, values: &[Option<NodeValue>]) -> CalcResult<Option<NodeValue>> {
    let values: Vec<NodeValue> = values.iter().flatten().copied().collect();
    match form {
        Form::Increase => Ok(NodeValue::sum(values.iter().map(|v| Some(*v / 100.0)))),
        Form::More => Ok(NodeValue::product(values.iter().map(|v| Some(1.0 + *v / 100.0)))),
        Form::BaseAdd => Ok(NodeValue::sum(values.iter().map(|v| Some(*v)))),
        Form::BaseSet => base_set(&values),
        Form::BaseOverride | Form::TotalOverride => overriding(&values),
    }
}

fn single_non_zero(bounds: impl Iterator<Item = f64>) -> Option<Vec<f64>> {
    let non_zero: Vec<f64> = bounds
        .filter(|b| !NodeValue::from(*b).is_zero())
        .collect();
    if non_zero.len() > 1 {
        None
    } else {
        Some(non_zero)
    }
}

fn base_set(values: &[NodeValue]) -> CalcResult<Option<NodeValue>> {
    if values.is_empty() {
        return Ok(None);
    }
    let minimum = single_non_zero(values.iter().map(|v| v.minimum()));
    let maximum = single_non_zero(values.iter().map(|v| v.maximum()));
    match (minimum, maximum) {
        (Some(minimum), Some(maximum)) => Ok(Some(NodeValue::new(
            minimum.first().copied().unwrap_or(0.0),
            maximum.first().copied().unwrap_or(0.0),
        ))),
        _ => {
            tracing::warn!(?values, "more than one non-zero BaseSet contributor");
            Err(CalculationError::AmbiguousBaseSet {
                values: values.to_vec(),
            })
        }
    }
}

fn overriding(values: &[NodeValue]) -> CalcResult<Option<NodeValue>> {
    let mut distinct: Vec<NodeValue> = Vec::new();
    for value in values {
        if !distinct.contains(value) {
            distinct.push(*value);
        }
    }
    match distinct.as_slice() {
        [] => Ok(None),
        [single] => Ok(Some(*single)),
        _ if values
            .iter()
            .any(|v| v.minimum() == 0.0 && v.maximum() == 0.0) =>
        {
            Ok(Some(NodeValue::ZERO))
        }
        _ => {
            tracing::warn!(?values, "conflicting override contributors");
            Err(CalculationError::ConflictingOverrides {
                values: values.to_vec(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(vs: &[f64]) -> Vec<Option<NodeValue>> {
        vs.iter().map(|v| Some(NodeValue::from(*v))).collect()
    }

    #[test]
    fn test_increase() {
        let result = aggregate(Form::Increase, &values(&[20.0, 10.0])).unwrap();
        assert_eq!(result, Some(NodeValue::from((20.0 + 10.0) / 100.0)));
    }

    #[test]
    fn test_more() {
        let result = aggregate(Form::More, &values(&[20.0, 10.0])).unwrap();
        assert_eq!(result, Some(NodeValue::from((1.0 + 0.2) * (1.0 + 0.1))));
    }

    #[test]
    fn test_base_add() {
        let result = aggregate(Form::BaseAdd, &values(&[3.0, 4.0])).unwrap();
        assert_eq!(result, Some(NodeValue::from(7.0)));
    }

    #[test]
    fn test_absent_contributors_are_ignored() {
        let mut vs = values(&[3.0]);
        vs.push(None);
        assert_eq!(aggregate(Form::BaseAdd, &vs).unwrap(), Some(NodeValue::from(3.0)));
        assert_eq!(aggregate(Form::Increase, &[None]).unwrap(), None);
    }

    #[test]
    fn test_base_set_ignores_zero_contributors() {
        let result = aggregate(Form::BaseSet, &values(&[5.0, 0.0, 0.0])).unwrap();
        assert_eq!(result, Some(NodeValue::from(5.0)));
    }

    #[test]
    fn test_base_set_all_zero() {
        let result = aggregate(Form::BaseSet, &values(&[0.0, 0.0])).unwrap();
        assert_eq!(result, Some(NodeValue::ZERO));
        assert_eq!(aggregate(Form::BaseSet, &[]).unwrap(), None);
    }

    #[test]
    fn test_base_set_multiple_non_zero_fails() {
        let result = aggregate(Form::BaseSet, &values(&[5.0, 3.0]));
        assert!(matches!(result, Err(CalculationError::AmbiguousBaseSet { .. })));
    }

    #[test]
    fn test_base_set_bounds_are_independent() {
        let vs = vec![
            Some(NodeValue::new(5.0, 0.0)),
            Some(NodeValue::new(0.0, 10.0)),
        ];
        let result = aggregate(Form::BaseSet, &vs).unwrap();
        assert_eq!(result, Some(NodeValue::new(5.0, 10.0)));
    }

    #[test]
    fn test_total_override() {
        assert_eq!(
            aggregate(Form::TotalOverride, &values(&[0.0, 5.0])).unwrap(),
            Some(NodeValue::ZERO)
        );
        assert_eq!(
            aggregate(Form::TotalOverride, &values(&[5.0, 5.0])).unwrap(),
            Some(NodeValue::from(5.0))
        );
        assert_eq!(aggregate(Form::TotalOverride, &[]).unwrap(), None);
        let result = aggregate(Form::TotalOverride, &values(&[5.0, 7.0]));
        assert!(matches!(result, Err(CalculationError::ConflictingOverrides { .. })));
    }

    #[test]
    fn test_base_override_aggregates_like_total_override() {
        assert_eq!(
            aggregate(Form::BaseOverride, &values(&[0.0, 5.0])).unwrap(),
            Some(NodeValue::ZERO)
        );
        assert!(aggregate(Form::BaseOverride, &values(&[1.0, 2.0])).is_err());
    }
}
