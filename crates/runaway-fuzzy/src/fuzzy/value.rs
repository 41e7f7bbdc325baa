//! Graded truth values.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Degree of truth of a linguistic predicate, always within `[0, 1]`.
///
/// Construction clamps out-of-range input and maps NaN to `FALSE`, so a
/// malformed reading reads as "not true" instead of poisoning later min/max
/// combinations.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FuzzyValue(f64);

impl FuzzyValue {
    /// Completely false.
    pub const FALSE: FuzzyValue = FuzzyValue(0.0);

    /// Completely true.
    pub const TRUE: FuzzyValue = FuzzyValue(1.0);

    /// Create a fuzzy value, clamping into `[0, 1]`.
    pub fn new(value: f64) -> Self {
        if value.is_nan() {
            return Self::FALSE;
        }
        FuzzyValue(value.clamp(0.0, 1.0))
    }

    /// Crisp truth value: `true` maps to 1, `false` to 0.
    pub fn from_bool(value: bool) -> Self {
        if value {
            Self::TRUE
        } else {
            Self::FALSE
        }
    }

    /// The underlying degree.
    pub fn value(self) -> f64 {
        self.0
    }

    /// Fuzzy conjunction (minimum).
    pub fn and(self, other: FuzzyValue) -> FuzzyValue {
        FuzzyValue(self.0.min(other.0))
    }

    /// Fuzzy disjunction (maximum).
    pub fn or(self, other: FuzzyValue) -> FuzzyValue {
        FuzzyValue(self.0.max(other.0))
    }

    /// Fuzzy complement (`1 - v`).
    ///
    /// Involutive up to one rounding step: `1 - (1 - v)` is exact for
    /// `v >= 0.5`, but below 0.5 the inner subtraction rounds and the round
    /// trip can land up to 2^-54 (about 5.6e-17) away from `v`.
    pub fn not(self) -> FuzzyValue {
        FuzzyValue(1.0 - self.0)
    }

    /// Total order; values are never NaN, so this agrees with `partial_cmp`.
    pub fn cmp_total(&self, other: &FuzzyValue) -> std::cmp::Ordering {
        self.0.total_cmp(&other.0)
    }

    /// Whether the degree strictly exceeds `threshold`.
    pub fn exceeds(self, threshold: f64) -> bool {
        self.0 > threshold
    }
}

impl std::ops::Not for FuzzyValue {
    type Output = FuzzyValue;

    fn not(self) -> FuzzyValue {
        FuzzyValue::not(self)
    }
}

impl From<bool> for FuzzyValue {
    fn from(value: bool) -> Self {
        FuzzyValue::from_bool(value)
    }
}

impl From<FuzzyValue> for f64 {
    fn from(value: FuzzyValue) -> Self {
        value.0
    }
}

impl fmt::Display for FuzzyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.5}", self.0)
    }
}
