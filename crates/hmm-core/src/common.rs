//! Vocabulary shared by the Viterbi and forward-backward engines.

/// An ordered pair identifying a directed transition between two states.
///
/// Equality and hashing combine both components; `(a, b)` and `(b, a)` are
/// distinct keys. This is a plain tuple alias rather than a newtype because
/// `(S, S)` already has the right `Eq`/`Hash`/`PartialEq` behavior whenever
/// `S` does.
pub type TransitionKey<S> = (S, S);
