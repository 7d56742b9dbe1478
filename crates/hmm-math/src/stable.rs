//! Probability range checks and log/linear conversion.

/// Default tolerance used for sum-to-one and range checks throughout the
/// HMM engines.
pub const DEFAULT_TOLERANCE: f64 = 1e-8;

/// Returns true iff `p` lies in `[-delta, 1 + delta]`.
///
/// Reserved for *probabilities* — probability densities may legitimately
/// exceed 1 and should not be checked with this function.
pub fn probability_in_range(p: f64, delta: f64) -> bool {
    p >= -delta && p <= 1.0 + delta
}

/// [`probability_in_range`] at [`DEFAULT_TOLERANCE`].
pub fn probability_in_range_default(p: f64) -> bool {
    probability_in_range(p, DEFAULT_TOLERANCE)
}

/// Returns true iff `values` sums to 1.0 within `delta`.
pub fn sums_to_one(values: &[f64], delta: f64) -> bool {
    let sum: f64 = values.iter().sum();
    (sum - 1.0).abs() <= delta
}

/// [`sums_to_one`] at [`DEFAULT_TOLERANCE`].
pub fn sums_to_one_default(values: &[f64]) -> bool {
    sums_to_one(values, DEFAULT_TOLERANCE)
}

/// Elementwise `exp`, preserving the order of the input pairs.
pub fn log_to_linear<K: Clone>(pairs: &[(K, f64)]) -> Vec<(K, f64)> {
    pairs.iter().map(|(k, v)| (k.clone(), v.exp())).collect()
}

/// Elementwise `ln`, preserving the order of the input pairs. Inverse of
/// [`log_to_linear`].
pub fn linear_to_log<K: Clone>(pairs: &[(K, f64)]) -> Vec<(K, f64)> {
    pairs.iter().map(|(k, v)| (k.clone(), v.ln())).collect()
}
