//! Triangular membership functions.
//!
//! A triangle with half-width `w` centred on `c` is 0 outside `(c - w, c + w)`,
//! exactly 1 at `c`, and linear on both slopes. The boundary cases are decided
//! by comparison before any arithmetic, so `c - w`, `c + w` and `c` hit their
//! exact values regardless of float rounding in the slope formula.

use super::value::FuzzyValue;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Invalid membership parameters.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MembershipError {
    #[error("membership width must be positive and finite, got {0}")]
    InvalidWidth(f64),

    #[error("membership center must be finite, got {0}")]
    InvalidCenter(f64),
}

/// Symmetric triangular membership function.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TriangularMembership {
    width: f64,
    center: f64,
}

impl TriangularMembership {
    /// Build a membership function; `width` must be `> 0`.
    pub fn new(width: f64, center: f64) -> Result<Self, MembershipError> {
        if !(width.is_finite() && width > 0.0) {
            return Err(MembershipError::InvalidWidth(width));
        }
        if !center.is_finite() {
            return Err(MembershipError::InvalidCenter(center));
        }
        Ok(Self { width, center })
    }

    /// Const constructor for parameters known to be valid at compile time.
    ///
    /// Callers are responsible for `width > 0`.
    pub const fn fixed(width: f64, center: f64) -> Self {
        Self { width, center }
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn center(&self) -> f64 {
        self.center
    }

    /// Lower foot of the triangle.
    pub fn lower(&self) -> f64 {
        self.center - self.width
    }

    /// Upper foot of the triangle.
    pub fn upper(&self) -> f64 {
        self.center + self.width
    }

    /// Degree to which `value` belongs to this set.
    pub fn grade(&self, value: f64) -> FuzzyValue {
        if value.is_nan() || !(self.width > 0.0) {
            return FuzzyValue::FALSE;
        }
        if value == self.center {
            return FuzzyValue::TRUE;
        }
        if value <= self.lower() || value >= self.upper() {
            return FuzzyValue::FALSE;
        }
        FuzzyValue::new(1.0 - (self.center - value).abs() / self.width)
    }
}

/// Evaluate the triangular membership `(width, center)` at `value`.
///
/// Non-positive or NaN widths violate the precondition and grade everything
/// as `FALSE`.
pub fn membership(width: f64, center: f64, value: f64) -> FuzzyValue {
    TriangularMembership::fixed(width, center).grade(value)
}
