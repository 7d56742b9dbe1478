//! Error taxonomy for the HMM inference engines.

use thiserror::Error;

/// Result type alias used throughout `hmm-core`.
pub type Result<T> = std::result::Result<T, HmmError>;

/// Errors raised by [`crate::viterbi::ViterbiEngine`] and
/// [`crate::forward_backward::ForwardBackwardEngine`].
///
/// All variants are immediate and fatal to the call that raised them; no
/// engine state is mutated on an error path. The one sticky condition, an
/// HMM break, is *not* an error — see
/// [`ViterbiEngine::is_broken`](crate::viterbi::ViterbiEngine::is_broken).
#[derive(Debug, Error, PartialEq)]
pub enum HmmError {
    /// `next_step` or a retrieval operation was called before initialization.
    #[error("engine has not been started")]
    NotStarted,

    /// A second initialization call was attempted on an already-started engine.
    #[error("engine has already been started")]
    AlreadyStarted,

    /// `next_step` was called on a Viterbi engine after an HMM break latched.
    #[error("engine is broken: an HMM break was latched at a previous step")]
    EngineBroken,

    /// Forward-backward initial-state probabilities did not sum to 1 within
    /// tolerance.
    #[error("initial probabilities must sum to 1.0 within {tolerance}, got {sum}")]
    InvalidProbabilities { sum: f64, tolerance: f64 },

    /// A candidate present in the step's candidate list had no entry in the
    /// supplied emission table. Missing *transition* entries are not an
    /// error — they denote zero probability.
    #[error("missing emission probability for a candidate state")]
    MissingProbability,

    /// `forward_probability(t, _)` was called with `t` outside
    /// `[0, steps_so_far)`.
    #[error("step index {index} out of range [0, {len})")]
    IndexOutOfRange { index: usize, len: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_are_stable_and_non_empty() {
        let variants = [
            HmmError::NotStarted,
            HmmError::AlreadyStarted,
            HmmError::EngineBroken,
            HmmError::InvalidProbabilities { sum: 0.9, tolerance: 1e-8 },
            HmmError::MissingProbability,
            HmmError::IndexOutOfRange { index: 3, len: 2 },
        ];
        for e in variants {
            assert!(!e.to_string().is_empty());
        }
    }
}
