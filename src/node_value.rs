//! Numeric values flowing through the calculation graph.
//!
//! A `NodeValue` is a `(minimum, maximum)` pair. Most values are single
//! numbers (both bounds equal); ranges appear when BaseSet/BaseAdd
//! modifiers target only one bound, e.g. "adds 5 to 10 fire damage".

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Sub};

/// Tolerance used for every "is (nearly) equal" comparison.
pub const TOLERANCE: f64 = 1e-10;

fn almost_eq_f64(left: f64, right: f64) -> bool {
    (left - right).abs() <= TOLERANCE
}

/// A `(minimum, maximum)` pair of doubles.
///
/// Arithmetic applies to both bounds independently. Equality uses
/// [`TOLERANCE`].
///
/// # Examples
///
/// ```rust
/// use statgraph::NodeValue;
///
/// let base = NodeValue::from(100.0);
/// let increased = base * (1.0 + 0.2);
/// assert_eq!(increased, NodeValue::from(120.0));
///
/// let range = NodeValue::new(5.0, 10.0);
/// assert_eq!(range + 1.0, NodeValue::new(6.0, 11.0));
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct NodeValue {
    minimum: f64,
    maximum: f64,
}

impl NodeValue {
    /// The single value zero.
    pub const ZERO: NodeValue = NodeValue {
        minimum: 0.0,
        maximum: 0.0,
    };

    /// The single value one.
    pub const ONE: NodeValue = NodeValue {
        minimum: 1.0,
        maximum: 1.0,
    };

    /// Create a range value.
    pub fn new(minimum: f64, maximum: f64) -> Self {
        Self { minimum, maximum }
    }

    /// The lower bound.
    pub fn minimum(self) -> f64 {
        self.minimum
    }

    /// The upper bound.
    pub fn maximum(self) -> f64 {
        self.maximum
    }

    /// The value as a single number (the midpoint of a range).
    pub fn single(self) -> f64 {
        if almost_eq_f64(self.minimum, self.maximum) {
            self.minimum
        } else {
            (self.minimum + self.maximum) / 2.0
        }
    }

    /// Apply `f` to both bounds.
    pub fn select(self, f: impl Fn(f64) -> f64) -> Self {
        Self::new(f(self.minimum), f(self.maximum))
    }

    /// Combine both bounds pairwise with another value.
    pub fn combine(self, other: NodeValue, f: impl Fn(f64, f64) -> f64) -> Self {
        Self::new(f(self.minimum, other.minimum), f(self.maximum, other.maximum))
    }

    /// Clamp both bounds into `[lower, upper]`. A missing bound does not
    /// restrict. If `lower` exceeds `upper`, `lower` wins.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use statgraph::NodeValue;
    ///
    /// let v = NodeValue::from(120.0);
    /// assert_eq!(v.clip(Some(0.0), Some(75.0)), NodeValue::from(75.0));
    /// assert_eq!(v.clip(None, None), v);
    /// ```
    pub fn clip(self, lower: Option<f64>, upper: Option<f64>) -> Self {
        self.select(|v| {
            let v = match upper {
                Some(upper) if v > upper => upper,
                _ => v,
            };
            match lower {
                Some(lower) if v < lower => lower,
                _ => v,
            }
        })
    }

    /// Whether both bounds are within [`TOLERANCE`] of each other's.
    pub fn almost_eq(self, other: NodeValue) -> bool {
        almost_eq_f64(self.minimum, other.minimum) && almost_eq_f64(self.maximum, other.maximum)
    }

    /// Whether both bounds are within [`TOLERANCE`] of `value`.
    pub fn almost_eq_f64(self, value: f64) -> bool {
        almost_eq_f64(self.minimum, value) && almost_eq_f64(self.maximum, value)
    }

    /// Whether both bounds are (nearly) zero.
    pub fn is_zero(self) -> bool {
        self.almost_eq_f64(0.0)
    }

    /// Round both bounds to `decimals` decimal places.
    pub fn round(self, decimals: i32) -> Self {
        let factor = 10_f64.powi(decimals);
        self.select(|v| (v * factor).round() / factor)
    }

    /// Sum of the present values, or `None` if there are none.
    pub fn sum(values: impl IntoIterator<Item = Option<NodeValue>>) -> Option<NodeValue> {
        values
            .into_iter()
            .flatten()
            .fold(None, |acc, v| Some(acc.map_or(v, |acc| acc + v)))
    }

    /// Product of the present values, or `None` if there are none.
    pub fn product(values: impl IntoIterator<Item = Option<NodeValue>>) -> Option<NodeValue> {
        values
            .into_iter()
            .flatten()
            .fold(None, |acc, v| Some(acc.map_or(v, |acc| acc * v)))
    }
}

impl PartialEq for NodeValue {
    fn eq(&self, other: &Self) -> bool {
        self.almost_eq(*other)
    }
}

impl From<f64> for NodeValue {
    fn from(value: f64) -> Self {
        Self::new(value, value)
    }
}

impl fmt::Display for NodeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if almost_eq_f64(self.minimum, self.maximum) {
            write!(f, "{}", self.minimum)
        } else {
            write!(f, "{} to {}", self.minimum, self.maximum)
        }
    }
}

impl Neg for NodeValue {
    type Output = Self;

    fn neg(self) -> Self {
        self.select(|v| -v)
    }
}

macro_rules! node_value_op {
    ($trait:ident, $method:ident, $op:tt) => {
        impl $trait for NodeValue {
            type Output = NodeValue;

            fn $method(self, other: NodeValue) -> NodeValue {
                self.combine(other, |l, r| l $op r)
            }
        }

        impl $trait<f64> for NodeValue {
            type Output = NodeValue;

            fn $method(self, other: f64) -> NodeValue {
                self.select(|v| v $op other)
            }
        }

        impl $trait<NodeValue> for f64 {
            type Output = NodeValue;

            fn $method(self, other: NodeValue) -> NodeValue {
                other.select(|v| self $op v)
            }
        }
    };
}

node_value_op!(Add, add, +);
node_value_op!(Sub, sub, -);
node_value_op!(Mul, mul, *);
node_value_op!(Div, div, /);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arithmetic_applies_to_both_bounds() {
        let a = NodeValue::new(2.0, 4.0);
        let b = NodeValue::new(1.0, 2.0);

        assert_eq!(a + b, NodeValue::new(3.0, 6.0));
        assert_eq!(a - b, NodeValue::new(1.0, 2.0));
        assert_eq!(a * b, NodeValue::new(2.0, 8.0));
        assert_eq!(a / b, NodeValue::new(2.0, 2.0));
        assert_eq!(1.0 - a, NodeValue::new(-1.0, -3.0));
        assert_eq!(-a, NodeValue::new(-2.0, -4.0));
    }

    #[test]
    fn test_equality_uses_tolerance() {
        assert_eq!(NodeValue::from(0.1 + 0.2), NodeValue::from(0.3));
        assert_ne!(NodeValue::from(1.0), NodeValue::from(1.0001));
        assert!(NodeValue::from(1e-12).is_zero());
    }

    #[test]
    fn test_clip() {
        let v = NodeValue::new(-5.0, 120.0);
        assert_eq!(v.clip(Some(0.0), Some(100.0)), NodeValue::new(0.0, 100.0));
        assert_eq!(v.clip(Some(0.0), None), NodeValue::new(0.0, 120.0));
    }

    #[test]
    fn test_clip_lower_bound_wins_over_upper() {
        let v = NodeValue::from(15.0);
        assert_eq!(v.clip(Some(20.0), Some(10.0)), NodeValue::from(20.0));
    }

    #[test]
    fn test_round() {
        assert_eq!(NodeValue::from(1.23456).round(2), NodeValue::from(1.23));
        assert_eq!(NodeValue::from(2.6).round(0), NodeValue::from(3.0));
    }

    #[test]
    fn test_sum_and_product_ignore_absent_values() {
        let values = vec![Some(NodeValue::from(2.0)), None, Some(NodeValue::from(3.0))];
        assert_eq!(NodeValue::sum(values.clone()), Some(NodeValue::from(5.0)));
        assert_eq!(NodeValue::product(values), Some(NodeValue::from(6.0)));
        assert_eq!(NodeValue::sum(vec![None, None]), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(NodeValue::from(5.0).to_string(), "5");
        assert_eq!(NodeValue::new(5.0, 10.0).to_string(), "5 to 10");
    }

    #[test]
    fn test_serializes_both_bounds() {
        let v = NodeValue::new(5.0, 10.0);
        let json = serde_json::to_string(&v).unwrap();
        assert_eq!(json, r#"{"minimum":5.0,"maximum":10.0}"#);
    }
}
