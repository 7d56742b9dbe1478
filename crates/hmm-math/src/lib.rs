//! Numerical primitives shared by the HMM inference engines.
//!
//! This crate has no knowledge of states, observations, or transitions — it
//! only knows about probabilities and the tolerances they must respect. It is
//! deliberately kept separate from `hmm-core` so the numerical contracts
//! (tolerance, range, log/linear conversion) can be tested in isolation.

mod stable;

pub use stable::{
    linear_to_log, log_to_linear, probability_in_range, probability_in_range_default,
    sums_to_one, sums_to_one_default, DEFAULT_TOLERANCE,
};
