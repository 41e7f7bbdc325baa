//! Min/max fuzzy algebra over any number of operands.
//!
//! Conjunction and disjunction of zero operands have no defined value, so the
//! variadic forms return `None` for empty input instead of picking an identity.

use super::value::FuzzyValue;

/// Fuzzy AND: the minimum of the operands.
pub fn and<I>(values: I) -> Option<FuzzyValue>
where
    I: IntoIterator<Item = FuzzyValue>,
{
    values.into_iter().reduce(FuzzyValue::and)
}

/// Fuzzy OR: the maximum of the operands.
pub fn or<I>(values: I) -> Option<FuzzyValue>
where
    I: IntoIterator<Item = FuzzyValue>,
{
    values.into_iter().reduce(FuzzyValue::or)
}

/// Fuzzy NOT: `1 - v`. See [`FuzzyValue::not`] for its rounding.
pub fn not(value: FuzzyValue) -> FuzzyValue {
    value.not()
}
