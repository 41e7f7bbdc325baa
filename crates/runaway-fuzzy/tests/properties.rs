//! Property-based tests for the fuzzy primitives.
//!
//! Uses proptest to verify the lattice laws and membership shape hold across
//! many random inputs.

use proptest::prelude::*;
use runaway_fuzzy::{and, membership, not, or, FuzzyValue};

/// Tolerance for complement round trips: `1 - (1 - v)` is off by at most
/// 2^-54 when `v < 0.5`.
const TOL: f64 = f64::EPSILON;

fn unit() -> impl Strategy<Value = FuzzyValue> {
    (0.0..=1.0f64).prop_map(FuzzyValue::new)
}

// ============================================================================
// Lattice laws
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(1000))]

    #[test]
    fn and_commutative(a in unit(), b in unit()) {
        prop_assert_eq!(and([a, b]), and([b, a]));
    }

    #[test]
    fn or_commutative(a in unit(), b in unit()) {
        prop_assert_eq!(or([a, b]), or([b, a]));
    }

    #[test]
    fn and_associative(a in unit(), b in unit(), c in unit()) {
        let left = and([and([a, b]).unwrap(), c]);
        let right = and([a, and([b, c]).unwrap()]);
        prop_assert_eq!(left, right);
        prop_assert_eq!(left, and([a, b, c]));
    }

    #[test]
    fn or_associative(a in unit(), b in unit(), c in unit()) {
        let left = or([or([a, b]).unwrap(), c]);
        let right = or([a, or([b, c]).unwrap()]);
        prop_assert_eq!(left, right);
        prop_assert_eq!(left, or([a, b, c]));
    }

    #[test]
    fn idempotent(a in unit()) {
        prop_assert_eq!(and([a, a]), Some(a));
        prop_assert_eq!(or([a, a]), Some(a));
    }

    #[test]
    fn absorption(a in unit(), b in unit()) {
        prop_assert_eq!(and([a, or([a, b]).unwrap()]), Some(a));
        prop_assert_eq!(or([a, and([a, b]).unwrap()]), Some(a));
    }

    #[test]
    fn and_below_or(a in unit(), b in unit()) {
        prop_assert!(and([a, b]).unwrap() <= or([a, b]).unwrap());
    }

    #[test]
    fn results_stay_in_unit_interval(a in unit(), b in unit(), c in unit()) {
        for v in [and([a, b, c]).unwrap(), or([a, b, c]).unwrap(), not(a)] {
            prop_assert!((0.0..=1.0).contains(&v.value()));
        }
    }

    #[test]
    fn not_is_involution(a in unit()) {
        let back = not(not(a)).value();
        prop_assert!((back - a.value()).abs() <= TOL, "not(not({})) = {}", a, back);
    }

    #[test]
    fn not_is_exact_involution_from_half_up(v in 0.5..=1.0f64) {
        let a = FuzzyValue::new(v);
        prop_assert_eq!(not(not(a)), a);
    }

    #[test]
    fn bounds_are_identities(a in unit()) {
        prop_assert_eq!(and([a, FuzzyValue::TRUE]), Some(a));
        prop_assert_eq!(or([a, FuzzyValue::FALSE]), Some(a));
        prop_assert_eq!(and([a, FuzzyValue::FALSE]), Some(FuzzyValue::FALSE));
        prop_assert_eq!(or([a, FuzzyValue::TRUE]), Some(FuzzyValue::TRUE));
    }
}

// ============================================================================
// Triangular membership
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(1000))]

    #[test]
    fn peak_and_feet_are_exact(width in 0.001..10.0f64, center in -10.0..10.0f64) {
        prop_assert_eq!(membership(width, center, center), FuzzyValue::TRUE);
        prop_assert_eq!(membership(width, center, center - width), FuzzyValue::FALSE);
        prop_assert_eq!(membership(width, center, center + width), FuzzyValue::FALSE);
    }

    #[test]
    fn strictly_increasing_on_left_slope(
        width in 0.01..10.0f64,
        center in -10.0..10.0f64,
        t1 in 0.0..1.0f64,
        gap in 0.001..0.5f64,
    ) {
        let t2 = (t1 + gap).min(1.0);
        prop_assume!(t2 > t1 + 1e-6);
        let lo = center - width;
        let x1 = lo + t1 * width;
        let x2 = lo + t2 * width;
        prop_assert!(membership(width, center, x1) < membership(width, center, x2));
    }

    #[test]
    fn strictly_decreasing_on_right_slope(
        width in 0.01..10.0f64,
        center in -10.0..10.0f64,
        t1 in 0.0..1.0f64,
        gap in 0.001..0.5f64,
    ) {
        let t2 = (t1 + gap).min(1.0);
        prop_assume!(t2 > t1 + 1e-6);
        let x1 = center + t1 * width;
        let x2 = center + t2 * width;
        prop_assert!(membership(width, center, x1) > membership(width, center, x2));
    }

    #[test]
    fn zero_outside_support(width in 0.001..10.0f64, center in -10.0..10.0f64, d in 0.0..100.0f64) {
        prop_assert_eq!(membership(width, center, center + width + d), FuzzyValue::FALSE);
        prop_assert_eq!(membership(width, center, center - width - d), FuzzyValue::FALSE);
    }

    #[test]
    fn grade_in_unit_interval(width in 0.001..10.0f64, center in -10.0..10.0f64, x in -50.0..50.0f64) {
        let v = membership(width, center, x).value();
        prop_assert!((0.0..=1.0).contains(&v));
    }
}
