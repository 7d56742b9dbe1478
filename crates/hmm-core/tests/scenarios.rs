//! End-to-end tests for the concrete scenarios enumerated in the HMM
//! inference specification: the Wikipedia umbrella example, a trivial
//! single-step Viterbi run, an HMM break, transition-descriptor retrieval,
//! a tie-break case, and log-evidence sanity.

use std::collections::HashMap;

use hmm_core::forward_backward::ForwardBackwardEngine;
use hmm_core::viterbi::{ViterbiConfig, ViterbiEngine};
use hmm_core::HmmError;

type Key = (&'static str, &'static str);

fn umbrella_transition() -> HashMap<Key, f64> {
    [
        (("Rain", "Rain"), 0.7),
        (("Rain", "Sun"), 0.3),
        (("Sun", "Rain"), 0.3),
        (("Sun", "Sun"), 0.7),
    ]
    .into_iter()
    .collect()
}

fn umbrella_emission(umbrella: bool) -> HashMap<&'static str, f64> {
    if umbrella {
        [("Rain", 0.9), ("Sun", 0.2)].into_iter().collect()
    } else {
        [("Rain", 0.1), ("Sun", 0.8)].into_iter().collect()
    }
}

/// Scenario (a): the Wikipedia umbrella example.
#[test]
fn umbrella_example_smoothing_posteriors() {
    let mut engine: ForwardBackwardEngine<&str, &str> = ForwardBackwardEngine::new();
    let initial: HashMap<&str, f64> = [("Rain", 0.5), ("Sun", 0.5)].into_iter().collect();
    engine.start_with_initial_state_probabilities(vec!["Rain", "Sun"], initial).unwrap();

    for observed_umbrella in [true, true, false, true, true] {
        engine
            .next_step(
                if observed_umbrella { "U" } else { "N" },
                vec!["Rain", "Sun"],
                umbrella_emission(observed_umbrella),
                umbrella_transition(),
            )
            .unwrap();
    }

    let smoothing = engine.compute_smoothing_probabilities().unwrap();
    let expected_rain = [0.6469, 0.8673, 0.8204, 0.3075, 0.8204, 0.8673];
    assert_eq!(smoothing.len(), 6);
    for (step, expected) in smoothing.iter().zip(expected_rain.iter()) {
        let rain = step.iter().find(|(s, _)| *s == "Rain").unwrap().1;
        let sun = step.iter().find(|(s, _)| *s == "Sun").unwrap().1;
        assert!((rain - expected).abs() < 1e-4, "rain={rain} expected={expected}");
        assert!((sun - (1.0 - expected)).abs() < 1e-4, "sun should be the complement of rain");
    }
}

/// Scenario (b): the trivial single-step Viterbi run.
#[test]
fn trivial_viterbi_single_step() {
    let mut engine: ViterbiEngine<&str, (), ()> = ViterbiEngine::new(ViterbiConfig::default());
    let initial: HashMap<&str, f64> = [("A", 0.6f64.ln()), ("B", 0.4f64.ln())].into_iter().collect();
    engine.start_with_initial_state_probabilities(vec!["A", "B"], initial).unwrap();

    let sequence = engine.compute_most_likely_sequence();
    assert_eq!(sequence.len(), 1);
    assert_eq!(sequence[0].state, "A");
}

/// Scenario (c): an HMM break at step 2 (empty transition table), and
/// retrieval of the best sequence through the last non-broken step.
#[test]
fn hmm_break_truncates_the_sequence() {
    let mut engine: ViterbiEngine<&str, (), ()> = ViterbiEngine::new(ViterbiConfig::default());
    let initial: HashMap<&str, f64> = [("A", 0.5f64.ln()), ("B", 0.5f64.ln())].into_iter().collect();
    engine.start_with_initial_state_probabilities(vec!["A", "B"], initial).unwrap();

    let emission: HashMap<&str, f64> = [("A", 0.5f64.ln()), ("B", 0.5f64.ln())].into_iter().collect();
    let transition: HashMap<Key, f64> = [
        (("A", "A"), 0.6f64.ln()),
        (("A", "B"), 0.4f64.ln()),
        (("B", "A"), 0.4f64.ln()),
        (("B", "B"), 0.6f64.ln()),
    ]
    .into_iter()
    .collect();
    engine.next_step((), vec!["A", "B"], emission.clone(), transition, None).unwrap();
    assert!(!engine.is_broken());

    // Step 2: finite emissions, but an empty transition table, so every
    // candidate's incoming log-probability is -inf.
    engine.next_step((), vec!["A", "B"], emission, HashMap::new(), None).unwrap();
    assert!(engine.is_broken());

    match engine.next_step((), vec!["A", "B"], HashMap::new(), HashMap::new(), None) {
        Err(HmmError::EngineBroken) => {}
        other => panic!("expected EngineBroken, got {other:?}"),
    }

    let sequence = engine.compute_most_likely_sequence();
    assert_eq!(sequence.len(), 2, "only the pre-break steps should be retrievable");
}

/// Scenario (d): transition-descriptor retrieval.
#[test]
fn transition_descriptor_is_attached_to_the_winning_transition() {
    let mut engine: ViterbiEngine<&str, (), &str> = ViterbiEngine::new(ViterbiConfig::default());
    let initial: HashMap<&str, f64> = [("A", 0.5f64.ln()), ("B", 0.5f64.ln())].into_iter().collect();
    engine.start_with_initial_state_probabilities(vec!["A", "B"], initial).unwrap();

    let emission: HashMap<&str, f64> = [("A", 0.9f64.ln()), ("B", 0.1f64.ln())].into_iter().collect();
    let transition: HashMap<Key, f64> = [
        (("A", "A"), 0.9f64.ln()),
        (("A", "B"), 0.1f64.ln()),
        (("B", "A"), 0.1f64.ln()),
        (("B", "B"), 0.9f64.ln()),
    ]
    .into_iter()
    .collect();
    let descriptors: HashMap<Key, &str> = [
        (("A", "A"), "AA"),
        (("A", "B"), "AB"),
        (("B", "A"), "BA"),
        (("B", "B"), "BB"),
    ]
    .into_iter()
    .collect();
    engine.next_step((), vec!["A", "B"], emission, transition, Some(descriptors)).unwrap();

    let sequence = engine.compute_most_likely_sequence();
    assert_eq!(sequence[0].incoming_descriptor, None);
    assert_eq!(sequence[1].incoming_descriptor, Some("AA"));
}

/// Scenario (e): tie-breaking picks the first-seen predecessor.
#[test]
fn tie_break_prefers_the_first_seen_predecessor() {
    let mut engine: ViterbiEngine<&str, (), ()> = ViterbiEngine::new(ViterbiConfig::default());
    let initial: HashMap<&str, f64> = [("A", 0.5f64.ln()), ("B", 0.5f64.ln())].into_iter().collect();
    engine.start_with_initial_state_probabilities(vec!["A", "B"], initial).unwrap();

    let emission: HashMap<&str, f64> = [("X", 0.5f64.ln())].into_iter().collect();
    let transition: HashMap<Key, f64> = [(("A", "X"), 0.5f64.ln()), (("B", "X"), 0.5f64.ln())].into_iter().collect();
    engine.next_step((), vec!["X"], emission, transition, None).unwrap();

    let back_pointers = engine.back_pointers();
    assert_eq!(back_pointers.get(&"X").copied().flatten(), Some("A"));
}

/// Scenario (f): log-evidence sanity for the umbrella example.
#[test]
fn log_evidence_is_finite_negative_and_matches_sum_of_logs() {
    let mut engine: ForwardBackwardEngine<&str, &str> = ForwardBackwardEngine::new();
    let initial: HashMap<&str, f64> = [("Rain", 0.5), ("Sun", 0.5)].into_iter().collect();
    engine.start_with_initial_state_probabilities(vec!["Rain", "Sun"], initial).unwrap();

    for observed_umbrella in [true, true, false, true, true] {
        engine
            .next_step(
                if observed_umbrella { "U" } else { "N" },
                vec!["Rain", "Sun"],
                umbrella_emission(observed_umbrella),
                umbrella_transition(),
            )
            .unwrap();
    }

    let evidence = engine.observation_log_probability().unwrap();
    let direct: f64 = engine.scaling_divisors().iter().map(|c| c.ln()).sum();
    assert!((evidence - direct).abs() < 1e-12);
    assert!(evidence.is_finite());
    assert!(evidence < 0.0);
}

#[test]
fn missing_emission_entry_for_a_candidate_is_an_error() {
    let mut engine: ViterbiEngine<&str, (), ()> = ViterbiEngine::new(ViterbiConfig::default());
    let initial: HashMap<&str, f64> = [("A", 0.5f64.ln())].into_iter().collect();
    // "B" has no entry in `initial`, but is listed as a candidate.
    let err = engine.start_with_initial_state_probabilities(vec!["A", "B"], initial).unwrap_err();
    assert_eq!(err, HmmError::MissingProbability);
}

#[test]
fn forward_backward_rejects_unnormalized_initial_probabilities() {
    let mut engine: ForwardBackwardEngine<&str, &str> = ForwardBackwardEngine::new();
    let initial: HashMap<&str, f64> = [("Rain", 0.5), ("Sun", 0.6)].into_iter().collect();
    let err = engine.start_with_initial_state_probabilities(vec!["Rain", "Sun"], initial).unwrap_err();
    assert!(matches!(err, HmmError::InvalidProbabilities { .. }));
}
