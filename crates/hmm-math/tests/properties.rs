//! Property-based tests for hmm-math numerical functions.

use hmm_math::{
    linear_to_log, log_to_linear, probability_in_range, sums_to_one, DEFAULT_TOLERANCE,
};
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(1000))]

    /// Any value strictly inside [0, 1] is in range regardless of delta.
    #[test]
    fn probability_in_range_interior_always_holds(p in 0.0..1.0f64, delta in 0.0..1.0f64) {
        prop_assert!(probability_in_range(p, delta));
    }

    /// Widening delta never turns an in-range value out of range.
    #[test]
    fn probability_in_range_monotone_in_delta(p in -2.0..2.0f64, d1 in 0.0..1.0f64, d2 in 0.0..1.0f64) {
        let (small, big) = if d1 <= d2 { (d1, d2) } else { (d2, d1) };
        if probability_in_range(p, small) {
            prop_assert!(probability_in_range(p, big));
        }
    }

    /// A vector scaled to sum to exactly 1 always passes sums_to_one.
    #[test]
    fn sums_to_one_holds_after_normalization(
        values in proptest::collection::vec(0.01..100.0f64, 1..8)
    ) {
        let total: f64 = values.iter().sum();
        let normalized: Vec<f64> = values.iter().map(|v| v / total).collect();
        prop_assert!(sums_to_one(&normalized, DEFAULT_TOLERANCE));
    }

    /// log_to_linear then linear_to_log returns to the original values
    /// (for finite, non-zero inputs where the round trip is well-defined).
    #[test]
    fn log_linear_round_trip(logs in proptest::collection::vec(-50.0..50.0f64, 1..8)) {
        let pairs: Vec<(usize, f64)> = logs.into_iter().enumerate().collect();
        let linear = log_to_linear(&pairs);
        let back = linear_to_log(&linear);
        prop_assert_eq!(back.len(), pairs.len());
        for ((_, original), (_, round_tripped)) in pairs.iter().zip(back.iter()) {
            prop_assert!((original - round_tripped).abs() < 1e-9);
        }
    }

    /// log_to_linear never reorders its input.
    #[test]
    fn log_to_linear_preserves_order(logs in proptest::collection::vec(-10.0..10.0f64, 0..12)) {
        let pairs: Vec<(usize, f64)> = logs.into_iter().enumerate().collect();
        let linear = log_to_linear(&pairs);
        let keys: Vec<usize> = linear.iter().map(|(k, _)| *k).collect();
        let expected: Vec<usize> = pairs.iter().map(|(k, _)| *k).collect();
        prop_assert_eq!(keys, expected);
    }
}
