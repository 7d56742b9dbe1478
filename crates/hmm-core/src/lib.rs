//! Streaming inference over time-inhomogeneous Hidden Markov Models.
//!
//! This crate implements two independent engines that share the same
//! vocabulary of states, observations, and transitions:
//!
//! - [`viterbi`] — the maximum a posteriori state sequence, computed
//!   incrementally in log space with memory-efficient back-pointer
//!   chaining.
//! - [`forward_backward`] — per-step smoothing posteriors, computed with a
//!   scaled linear-space forward pass and an on-demand backward pass.
//!
//! "Time-inhomogeneous" means the admissible candidate states, and the
//! emission/transition probabilities between them, may change at every
//! step — the caller supplies fresh tables on every call rather than the
//! engine holding a fixed model. Neither engine estimates model parameters,
//! assumes stationarity, manages persistence, or parallelizes within a
//! step; they consume already-evaluated probability tables and are
//! otherwise domain-agnostic (map matching against a road network is the
//! motivating use case, but nothing here is map-matching-specific).
//!
//! # Example
//!
//! ```rust
//! use hmm_core::viterbi::{ViterbiConfig, ViterbiEngine};
//! use std::collections::HashMap;
//!
//! let mut engine: ViterbiEngine<&str, &str, ()> = ViterbiEngine::new(ViterbiConfig::default());
//!
//! let initial: HashMap<&str, f64> = [("Rain", 0.5f64.ln()), ("Sun", 0.5f64.ln())].into_iter().collect();
//! engine.start_with_initial_state_probabilities(vec!["Rain", "Sun"], initial).unwrap();
//!
//! let emission: HashMap<&str, f64> = [("Rain", 0.9f64.ln()), ("Sun", 0.2f64.ln())].into_iter().collect();
//! let transition: HashMap<(&str, &str), f64> = [
//!     (("Rain", "Rain"), 0.7f64.ln()),
//!     (("Rain", "Sun"), 0.3f64.ln()),
//!     (("Sun", "Rain"), 0.3f64.ln()),
//!     (("Sun", "Sun"), 0.7f64.ln()),
//! ]
//! .into_iter()
//! .collect();
//! engine.next_step("Umbrella", vec!["Rain", "Sun"], emission, transition, None).unwrap();
//!
//! let sequence = engine.compute_most_likely_sequence();
//! assert_eq!(sequence.len(), 2);
//! assert!(!engine.is_broken());
//! ```

pub mod common;
pub mod error;
pub mod forward_backward;
pub mod viterbi;

pub use common::TransitionKey;
pub use error::{HmmError, Result};
pub use forward_backward::ForwardBackwardEngine;
pub use viterbi::{SequenceElement, ViterbiConfig, ViterbiEngine};
