//! Fuzzy logic primitives for runaway detection.

pub mod fuzzy;

pub use fuzzy::algebra::{and, not, or};
pub use fuzzy::membership::{membership, MembershipError, TriangularMembership};
pub use fuzzy::value::FuzzyValue;
