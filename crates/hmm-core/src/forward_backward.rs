//! Streaming scaled forward pass with an on-demand backward pass for
//! per-step smoothing posteriors.
//!
//! All probabilities exchanged with this engine are **linear**, not log.
//! See [`crate::viterbi`] for the log-space maximum a posteriori engine.

use std::collections::HashMap;
use std::hash::Hash;

use hmm_math::{sums_to_one, DEFAULT_TOLERANCE};

use crate::common::TransitionKey;
use crate::error::{HmmError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Empty,
    Running,
}

struct StepRecord<S, O> {
    observation: Option<O>,
    candidates: Vec<S>,
    emission: HashMap<S, f64>,
    /// `None` for the first step; every subsequent step carries the
    /// transition table that produced it.
    transition: Option<HashMap<TransitionKey<S>, f64>>,
    forward: HashMap<S, f64>,
    scaling_divisor: f64,
}

/// Streaming forward-backward engine over a time-inhomogeneous HMM.
///
/// `S` is the state type, `O` the observation type. Both must be usable as
/// map keys (`Clone + Eq + Hash`); `O` only needs `Clone`, since observations
/// are stored but never compared.
pub struct ForwardBackwardEngine<S, O> {
    phase: Phase,
    steps: Vec<StepRecord<S, O>>,
}

impl<S, O> Default for ForwardBackwardEngine<S, O>
where
    S: Clone + Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<S, O> ForwardBackwardEngine<S, O>
where
    S: Clone + Eq + Hash,
{
    /// Creates an engine in the `Empty` state.
    pub fn new() -> Self {
        Self { phase: Phase::Empty, steps: Vec::new() }
    }

    /// Starts the engine from an already-normalized initial state
    /// distribution. `initial_states` gives the caller's iteration order;
    /// `initial_probs` must contain every state in `initial_states` and the
    /// values must sum to 1.0 within `1e-8`.
    pub fn start_with_initial_state_probabilities(
        &mut self,
        initial_states: Vec<S>,
        initial_probs: HashMap<S, f64>,
    ) -> Result<()> {
        self.require_empty()?;

        let values: Result<Vec<f64>> = initial_states
            .iter()
            .map(|s| initial_probs.get(s).copied().ok_or(HmmError::MissingProbability))
            .collect();
        let values = values?;
        if !sums_to_one(&values, DEFAULT_TOLERANCE) {
            return Err(HmmError::InvalidProbabilities {
                sum: values.iter().sum(),
                tolerance: DEFAULT_TOLERANCE,
            });
        }

        let forward: HashMap<S, f64> =
            initial_states.iter().cloned().zip(values.iter().copied()).collect();
        self.steps.push(StepRecord {
            observation: None,
            candidates: initial_states,
            emission: HashMap::new(),
            transition: None,
            forward,
            scaling_divisor: 1.0,
        });
        self.phase = Phase::Running;
        tracing::trace!(step = 0, candidates = self.steps[0].candidates.len(), "hmm fb: started from initial probabilities");
        Ok(())
    }

    /// Starts the engine from an initial observation. The emission vector is
    /// treated as *unnormalized*: it is scaled to sum to 1 and the
    /// unnormalized sum is recorded as `c_0`. No sum-to-one check is applied
    /// here — only the state-probability entry point checks normalization,
    /// preserving the asymmetry of the original two start paths.
    pub fn start_with_initial_observation(
        &mut self,
        observation: O,
        candidates: Vec<S>,
        emission_probs: HashMap<S, f64>,
    ) -> Result<()> {
        self.require_empty()?;

        let unnorm: Result<Vec<f64>> = candidates
            .iter()
            .map(|s| emission_probs.get(s).copied().ok_or(HmmError::MissingProbability))
            .collect();
        let unnorm = unnorm?;
        let c0: f64 = unnorm.iter().sum();

        let forward: HashMap<S, f64> =
            candidates.iter().cloned().zip(unnorm.iter().map(|v| v / c0)).collect();
        self.steps.push(StepRecord {
            observation: Some(observation),
            candidates,
            emission: emission_probs,
            transition: None,
            forward,
            scaling_divisor: c0,
        });
        self.phase = Phase::Running;
        tracing::trace!(step = 0, candidates = self.steps[0].candidates.len(), "hmm fb: started from initial observation");
        Ok(())
    }

    /// Advances the engine by one observation.
    pub fn next_step(
        &mut self,
        observation: O,
        candidates: Vec<S>,
        emission_probs: HashMap<S, f64>,
        transition_probs: HashMap<TransitionKey<S>, f64>,
    ) -> Result<()> {
        self.require_running()?;
        let prev = self.steps.last().expect("running engine has at least one step");
        let prev_candidates = &prev.candidates;
        let prev_forward = &prev.forward;

        let mut unnorm: Vec<f64> = Vec::with_capacity(candidates.len());
        for cur in &candidates {
            let mut sum = 0.0;
            for p in prev_candidates {
                let f_prev = prev_forward.get(p).copied().unwrap_or(0.0);
                let t = transition_probs.get(&(p.clone(), cur.clone())).copied().unwrap_or(0.0);
                sum += f_prev * t;
            }
            let emission = emission_probs.get(cur).copied().ok_or(HmmError::MissingProbability)?;
            unnorm.push(emission * sum);
        }

        let c_t: f64 = unnorm.iter().sum();
        let forward: HashMap<S, f64> =
            candidates.iter().cloned().zip(unnorm.iter().map(|v| v / c_t)).collect();

        let step_index = self.steps.len();
        self.steps.push(StepRecord {
            observation: Some(observation),
            candidates,
            emission: emission_probs,
            transition: Some(transition_probs),
            forward,
            scaling_divisor: c_t,
        });
        tracing::trace!(step = step_index, scaling_divisor = c_t, "hmm fb: committed step");
        Ok(())
    }

    /// `p(state | o_1..o_t)`, i.e. the normalized forward value recorded at
    /// step `t`.
    pub fn forward_probability(&self, t: usize, state: &S) -> Result<f64> {
        let step = self.steps.get(t).ok_or(HmmError::IndexOutOfRange { index: t, len: self.steps.len() })?;
        Ok(step.forward.get(state).copied().unwrap_or(0.0))
    }

    /// `forward_probability` at the most recently committed step.
    pub fn current_forward_probability(&self, state: &S) -> Result<f64> {
        if self.phase == Phase::Empty {
            return Err(HmmError::NotStarted);
        }
        let last = self.steps.len() - 1;
        self.forward_probability(last, state)
    }

    /// `Σ_t log(c_t)`, the log-probability of the observation sequence so far.
    pub fn observation_log_probability(&self) -> Result<f64> {
        if self.phase == Phase::Empty {
            return Err(HmmError::NotStarted);
        }
        Ok(self.steps.iter().map(|s| s.scaling_divisor.ln()).sum())
    }

    /// The scaling divisor `c_t` recorded at each committed step, in order.
    /// Debug accessor: a zero divisor signals the numerical degeneracy noted
    /// in the forward-backward engine's specification (no `Broken` latch
    /// exists for this engine, unlike [`crate::viterbi::ViterbiEngine`]).
    pub fn scaling_divisors(&self) -> Vec<f64> {
        self.steps.iter().map(|s| s.scaling_divisor).collect()
    }

    /// Number of steps committed so far (including the initial step).
    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    /// Computes `p(s_t | o_1..o_T)` for every step `t` and every candidate
    /// state at that step, using the stored step records for an on-demand
    /// backward pass. Returns one ordered `(state, posterior)` vector per
    /// step, in caller-supplied candidate order.
    pub fn compute_smoothing_probabilities(&self) -> Result<Vec<Vec<(S, f64)>>> {
        if self.phase == Phase::Empty {
            return Err(HmmError::NotStarted);
        }
        let t_last = self.steps.len() - 1;

        let mut beta: HashMap<S, f64> =
            self.steps[t_last].candidates.iter().map(|s| (s.clone(), 1.0)).collect();
        let mut betas_by_step: Vec<HashMap<S, f64>> = vec![HashMap::new(); self.steps.len()];
        betas_by_step[t_last] = beta.clone();

        for t in (0..t_last).rev() {
            let next = &self.steps[t + 1];
            let next_transition = next.transition.as_ref().expect("non-initial step has a transition table");
            let mut beta_t = HashMap::with_capacity(self.steps[t].candidates.len());
            for cur in &self.steps[t].candidates {
                let mut sum = 0.0;
                for nxt in &next.candidates {
                    let e = next.emission.get(nxt).copied().unwrap_or(0.0);
                    let b = beta.get(nxt).copied().unwrap_or(0.0);
                    let tr = next_transition.get(&(cur.clone(), nxt.clone())).copied().unwrap_or(0.0);
                    sum += e * b * tr;
                }
                beta_t.insert(cur.clone(), sum / next.scaling_divisor);
            }
            beta = beta_t;
            betas_by_step[t] = beta.clone();
        }

        Ok(self
            .steps
            .iter()
            .enumerate()
            .map(|(t, step)| {
                step.candidates
                    .iter()
                    .map(|s| {
                        let f = step.forward.get(s).copied().unwrap_or(0.0);
                        let b = betas_by_step[t].get(s).copied().unwrap_or(0.0);
                        (s.clone(), f * b)
                    })
                    .collect()
            })
            .collect())
    }

    fn require_empty(&self) -> Result<()> {
        match self.phase {
            Phase::Empty => Ok(()),
            Phase::Running => Err(HmmError::AlreadyStarted),
        }
    }

    fn require_running(&self) -> Result<()> {
        match self.phase {
            Phase::Running => Ok(()),
            Phase::Empty => Err(HmmError::NotStarted),
        }
    }
}
