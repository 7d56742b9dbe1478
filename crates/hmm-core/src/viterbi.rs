//! Streaming Viterbi forward pass over a time-inhomogeneous HMM.
//!
//! All probabilities exchanged with this engine are **log** probabilities.
//! See [`crate::forward_backward`] for the linear-space smoothing engine.
//!
//! # Example
//!
//! ```rust
//! use hmm_core::viterbi::ViterbiEngine;
//! use std::collections::HashMap;
//!
//! let mut engine: ViterbiEngine<&str, &str, ()> = ViterbiEngine::new(Default::default());
//! let initial: HashMap<&str, f64> = [("A", 0.6f64.ln()), ("B", 0.4f64.ln())].into_iter().collect();
//! engine.start_with_initial_state_probabilities(vec!["A", "B"], initial).unwrap();
//!
//! let sequence = engine.compute_most_likely_sequence();
//! assert_eq!(sequence.len(), 1);
//! assert_eq!(sequence[0].state, "A");
//! ```

use std::collections::HashMap;
use std::hash::Hash;
use std::rc::Rc;

use hmm_math::log_to_linear;

use crate::common::TransitionKey;
use crate::error::{HmmError, Result};
use crate::forward_backward::ForwardBackwardEngine;

/// Configuration toggling the two optional Viterbi features.
///
/// ```rust
/// use hmm_core::viterbi::ViterbiConfig;
/// let config = ViterbiConfig::default()
///     .with_message_history(true)
///     .with_smoothing_probabilities(true);
/// assert!(config.keep_message_history);
/// assert!(config.compute_smoothing_probabilities);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ViterbiConfig {
    /// Store a per-step snapshot of the message vector for debugging.
    pub keep_message_history: bool,
    /// Run a parallel forward-backward instance and attach smoothing
    /// posteriors to the retrieved sequence. Roughly doubles memory and
    /// time.
    pub compute_smoothing_probabilities: bool,
}

impl ViterbiConfig {
    pub fn with_message_history(mut self, yes: bool) -> Self {
        self.keep_message_history = yes;
        self
    }

    pub fn with_smoothing_probabilities(mut self, yes: bool) -> Self {
        self.compute_smoothing_probabilities = yes;
        self
    }
}

/// A single element of a retrieved most-likely sequence.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(bound(serialize = "S: serde::Serialize, O: serde::Serialize, D: serde::Serialize")))]
pub struct SequenceElement<S, O, D> {
    pub state: S,
    /// `None` only for the very first element when the engine was started
    /// from initial state probabilities rather than an initial observation.
    pub observation: Option<O>,
    /// The descriptor attached to the winning incoming transition, or
    /// `None` at the first element or when no descriptor table was supplied.
    pub incoming_descriptor: Option<D>,
    /// `p(state_t | o_1..o_T)`, present only when
    /// [`ViterbiConfig::compute_smoothing_probabilities`] was enabled.
    pub smoothing_probability: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Empty,
    Running,
    Broken,
}

/// A node in the back-pointer chain. Nodes are shared via [`Rc`] so that an
/// old "last extended states" map can be dropped wholesale: any node
/// reachable only from it has its reference count fall to zero and is
/// reclaimed automatically. The chain is time-ordered and therefore
/// acyclic, so plain reference counting (no [`std::rc::Weak`]) is safe.
struct ExtendedState<S, O, D> {
    state: S,
    observation: Option<O>,
    incoming_descriptor: Option<D>,
    back_pointer: Option<Rc<ExtendedState<S, O, D>>>,
}

/// Streaming Viterbi engine over a time-inhomogeneous HMM.
///
/// `S` is the state type, `O` the observation type, `D` an optional
/// transition-descriptor type attached to winning transitions. `S` must be
/// usable as a map key (`Clone + Eq + Hash`); `O` and `D` only need `Clone`.
pub struct ViterbiEngine<S, O, D> {
    config: ViterbiConfig,
    phase: Phase,
    message: HashMap<S, f64>,
    prev_candidates: Vec<S>,
    last_extended_states: HashMap<S, Rc<ExtendedState<S, O, D>>>,
    message_history: Vec<Vec<(S, f64)>>,
    step_count: usize,
    smoothing: Option<ForwardBackwardEngine<S, O>>,
}

impl<S, O, D> ViterbiEngine<S, O, D>
where
    S: Clone + Eq + Hash,
    O: Clone,
    D: Clone,
{
    /// Creates an engine in the `Empty` state with the given configuration.
    pub fn new(config: ViterbiConfig) -> Self {
        let smoothing = config.compute_smoothing_probabilities.then(ForwardBackwardEngine::new);
        Self {
            config,
            phase: Phase::Empty,
            message: HashMap::new(),
            prev_candidates: Vec::new(),
            last_extended_states: HashMap::new(),
            message_history: Vec::new(),
            step_count: 0,
            smoothing,
        }
    }

    /// Starts the engine from initial state log-probabilities. If every
    /// value is `-inf`, the engine latches `Broken` immediately and no
    /// extended-state nodes are created.
    pub fn start_with_initial_state_probabilities(
        &mut self,
        initial_states: Vec<S>,
        initial_log_probs: HashMap<S, f64>,
    ) -> Result<()> {
        self.require_empty()?;

        let message: Result<Vec<(S, f64)>> = initial_states
            .iter()
            .map(|s| {
                initial_log_probs
                    .get(s)
                    .copied()
                    .map(|v| (s.clone(), v))
                    .ok_or(HmmError::MissingProbability)
            })
            .collect();
        let message = message?;

        if message.iter().all(|(_, v)| *v == f64::NEG_INFINITY) {
            self.phase = Phase::Broken;
            tracing::warn!(step = 0, "hmm viterbi: broken at initialization, all candidates have -inf log-probability");
            return Ok(());
        }

        if let Some(fb) = self.smoothing.as_mut() {
            let linear = log_to_linear(&message);
            let total: f64 = linear.iter().map(|(_, v)| v).sum();
            let normalized: HashMap<S, f64> = linear.into_iter().map(|(s, v)| (s, v / total)).collect();
            fb.start_with_initial_state_probabilities(initial_states.clone(), normalized)?;
        }

        for (state, _) in &message {
            self.last_extended_states.insert(
                state.clone(),
                Rc::new(ExtendedState { state: state.clone(), observation: None, incoming_descriptor: None, back_pointer: None }),
            );
        }
        self.commit(initial_states, message);
        Ok(())
    }

    /// Starts the engine from an initial observation and its emission
    /// log-probabilities. Identical to
    /// [`start_with_initial_state_probabilities`](Self::start_with_initial_state_probabilities)
    /// except every initial node's observation slot is set to `observation`.
    pub fn start_with_initial_observation(
        &mut self,
        observation: O,
        candidates: Vec<S>,
        emission_log_probs: HashMap<S, f64>,
    ) -> Result<()> {
        self.require_empty()?;

        let message: Result<Vec<(S, f64)>> = candidates
            .iter()
            .map(|s| {
                emission_log_probs
                    .get(s)
                    .copied()
                    .map(|v| (s.clone(), v))
                    .ok_or(HmmError::MissingProbability)
            })
            .collect();
        let message = message?;

        if message.iter().all(|(_, v)| *v == f64::NEG_INFINITY) {
            self.phase = Phase::Broken;
            tracing::warn!(step = 0, "hmm viterbi: broken at initialization, all candidates have -inf log-probability");
            return Ok(());
        }

        if let Some(fb) = self.smoothing.as_mut() {
            fb.start_with_initial_observation(observation.clone(), candidates.clone(), emission_log_probs.iter().map(|(s, v)| (s.clone(), v.exp())).collect())?;
        }

        for (state, _) in &message {
            self.last_extended_states.insert(
                state.clone(),
                Rc::new(ExtendedState {
                    state: state.clone(),
                    observation: Some(observation.clone()),
                    incoming_descriptor: None,
                    back_pointer: None,
                }),
            );
        }
        self.commit(candidates, message);
        Ok(())
    }

    /// Advances the engine by one observation.
    pub fn next_step(
        &mut self,
        observation: O,
        candidates: Vec<S>,
        emission_log_probs: HashMap<S, f64>,
        transition_log_probs: HashMap<TransitionKey<S>, f64>,
        transition_descriptors: Option<HashMap<TransitionKey<S>, D>>,
    ) -> Result<()> {
        match self.phase {
            Phase::Empty => return Err(HmmError::NotStarted),
            Phase::Broken => return Err(HmmError::EngineBroken),
            Phase::Running => {}
        }

        let mut new_message: Vec<(S, f64)> = Vec::with_capacity(candidates.len());
        let mut new_last_extended_states: HashMap<S, Rc<ExtendedState<S, O, D>>> = HashMap::new();

        for cur in &candidates {
            let mut best = f64::NEG_INFINITY;
            let mut argmax_prev: Option<&S> = None;
            for prev in &self.prev_candidates {
                let msg = self.message.get(prev).copied().unwrap_or(f64::NEG_INFINITY);
                let trans = transition_log_probs.get(&(prev.clone(), cur.clone())).copied().unwrap_or(f64::NEG_INFINITY);
                let val = msg + trans;
                if val > best {
                    best = val;
                    argmax_prev = Some(prev);
                }
            }

            let emission = emission_log_probs.get(cur).copied().ok_or(HmmError::MissingProbability)?;
            new_message.push((cur.clone(), best + emission));

            if let Some(prev) = argmax_prev {
                let descriptor = transition_descriptors
                    .as_ref()
                    .and_then(|d| d.get(&(prev.clone(), cur.clone())))
                    .cloned();
                let back_pointer = self.last_extended_states.get(prev).cloned();
                new_last_extended_states.insert(
                    cur.clone(),
                    Rc::new(ExtendedState {
                        state: cur.clone(),
                        observation: Some(observation.clone()),
                        incoming_descriptor: descriptor,
                        back_pointer,
                    }),
                );
            }
        }

        let broken = new_message.iter().all(|(_, v)| *v == f64::NEG_INFINITY);
        if broken {
            self.phase = Phase::Broken;
            tracing::warn!(step = self.step_count + 1, "hmm viterbi: broken, all candidates have -inf log-probability");
            return Ok(());
        }

        if let Some(fb) = self.smoothing.as_mut() {
            let linear_emission: HashMap<S, f64> = emission_log_probs.iter().map(|(s, v)| (s.clone(), v.exp())).collect();
            let linear_transition: HashMap<TransitionKey<S>, f64> =
                transition_log_probs.iter().map(|(k, v)| (k.clone(), v.exp())).collect();
            fb.next_step(observation.clone(), candidates.clone(), linear_emission, linear_transition)?;
        }

        self.last_extended_states = new_last_extended_states;
        self.commit(candidates, new_message);
        Ok(())
    }

    /// `true` once an HMM break has latched the engine.
    pub fn is_broken(&self) -> bool {
        self.phase == Phase::Broken
    }

    /// Retrieves the most likely state sequence given observations so far.
    ///
    /// In the `Empty` state this returns an empty sequence. In the `Broken`
    /// state it returns the best sequence through the last non-broken step
    /// (the break itself does not overwrite the prior message).
    pub fn compute_most_likely_sequence(&self) -> Vec<SequenceElement<S, O, D>> {
        if self.prev_candidates.is_empty() {
            return Vec::new();
        }

        let mut best_state: Option<&S> = None;
        let mut best_value = f64::NEG_INFINITY;
        for state in &self.prev_candidates {
            let value = self.message.get(state).copied().unwrap_or(f64::NEG_INFINITY);
            if value > best_value {
                best_value = value;
                best_state = Some(state);
            }
        }
        let Some(best_state) = best_state else { return Vec::new() };

        let mut chain = Vec::new();
        let mut node = self.last_extended_states.get(best_state).cloned();
        while let Some(n) = node {
            chain.push(SequenceElement {
                state: n.state.clone(),
                observation: n.observation.clone(),
                incoming_descriptor: n.incoming_descriptor.clone(),
                smoothing_probability: None,
            });
            node = n.back_pointer.clone();
        }
        chain.reverse();

        if let Some(fb) = self.smoothing.as_ref() {
            if let Ok(smoothing) = fb.compute_smoothing_probabilities() {
                for (element, step_posteriors) in chain.iter_mut().zip(smoothing.iter()) {
                    element.smoothing_probability =
                        step_posteriors.iter().find(|(s, _)| *s == element.state).map(|(_, p)| *p);
                }
            }
        }

        chain
    }

    /// Per-step message snapshots, oldest first, in caller-supplied
    /// candidate order. Only populated when
    /// [`ViterbiConfig::keep_message_history`] was enabled.
    pub fn message_history(&self) -> &[Vec<(S, f64)>] {
        &self.message_history
    }

    /// The current back-pointer state: for every state in the most recent
    /// committed step, the predecessor state that won its Viterbi
    /// recurrence (`None` for step 0 or for a state with no winning
    /// predecessor).
    pub fn back_pointers(&self) -> HashMap<S, Option<S>> {
        self.last_extended_states
            .iter()
            .map(|(state, node)| (state.clone(), node.back_pointer.as_ref().map(|p| p.state.clone())))
            .collect()
    }

    fn commit(&mut self, candidates: Vec<S>, message: Vec<(S, f64)>) {
        if self.config.keep_message_history {
            self.message_history.push(message.clone());
        }
        self.message = message.into_iter().collect();
        self.prev_candidates = candidates;
        self.phase = Phase::Running;
        self.step_count += 1;
    }

    fn require_empty(&self) -> Result<()> {
        match self.phase {
            Phase::Empty => Ok(()),
            Phase::Running | Phase::Broken => Err(HmmError::AlreadyStarted),
        }
    }
}
