//! Hidden Markov models over pluggable state and emission distributions.
//!
//! A model with N states holds an initial state distribution, N transition
//! distributions (one for each source state), and N emission distributions.
//! Every state distribution is a distribution over `0..N` which may depend on
//! the observation at the time of the move, so input/output models can be
//! written with the same code as plain ones.
//! The algorithms, [ForwardBackwardProbabilityCalculator], [StateSequenceCalculator],
//! and [HiddenMarkovModelReestimator], only talk to the model through
//! [StateDistribution] and [Distribution].
use crate::dist::Distribution;
use crate::error::{HmmError, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};
pub mod forward_backward;
pub mod reestimator;
pub mod state;
pub mod viterbi;
pub use forward_backward::ForwardBackwardProbabilityCalculator;
pub use reestimator::{Expectations, HiddenMarkovModelReestimator, Trainer};
pub use state::{
    ConditionalStateDistribution, ConditionalTransitionDistribution, SimpleStateDistribution,
    SimpleStateDistributionTable, TransitionDistribution, Unconditioned,
};
pub use viterbi::StateSequenceCalculator;

/// Something defined over the states `0..state_count()`.
pub trait StateSpace {
    fn state_count(&self) -> usize;
}

/// A distribution over the next state, given the observation made on arrival.
pub trait StateDistribution<O>: StateSpace {
    /// Pr{next|observation}.
    fn probability(&self, next: usize, observation: &O) -> f64;
    fn sample_state<R: Rng + ?Sized>(&self, context: Option<&O>, rng: &mut R) -> Result<usize>;
    fn most_likely_state(&self, context: Option<&O>) -> Result<usize>;
    /// Refit to `expectations[t][j]`, the expected count of moving into j at `observations[t]`.
    fn estimate(&mut self, expectations: &[Vec<f64>], observations: &[O]) -> Result<()>;
}

/// A hidden Markov model. `S` is the type of the initial and transition
/// distributions, `D` is the type of the emission distributions.
/// The parameters only change through the `estimate_*` methods.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawHiddenMarkovModel<S, D>")]
#[serde(bound(deserialize = "S: StateSpace + Deserialize<'de>, D: Deserialize<'de>"))]
pub struct HiddenMarkovModel<S, D> {
    initial: S,
    transitions: Vec<S>,
    emissions: Vec<D>,
}

#[derive(Deserialize)]
struct RawHiddenMarkovModel<S, D> {
    initial: S,
    transitions: Vec<S>,
    emissions: Vec<D>,
}

impl<S: StateSpace, D> TryFrom<RawHiddenMarkovModel<S, D>> for HiddenMarkovModel<S, D> {
    type Error = HmmError;
    fn try_from(raw: RawHiddenMarkovModel<S, D>) -> Result<Self> {
        Self::new(raw.initial, raw.transitions, raw.emissions)
    }
}

/// Shorthand for HiddenMarkovModel.
#[allow(clippy::upper_case_acronyms)]
pub type HMM<S, D> = HiddenMarkovModel<S, D>;

impl<S: StateSpace, D> HiddenMarkovModel<S, D> {
    pub fn new(initial: S, transitions: Vec<S>, emissions: Vec<D>) -> Result<Self> {
        let states = emissions.len();
        if states == 0 {
            return Err(HmmError::invalid("a model needs at least one state"));
        }
        if transitions.len() != states {
            return Err(HmmError::invalid(format!(
                "{} transition distributions for {} emission distributions",
                transitions.len(),
                states
            )));
        }
        let counts = std::iter::once(&initial).chain(transitions.iter());
        if let Some(count) = counts.map(|s| s.state_count()).find(|&c| c != states) {
            return Err(HmmError::invalid(format!(
                "a state distribution over {} states in a model of {} states",
                count, states
            )));
        }
        Ok(Self {
            initial,
            transitions,
            emissions,
        })
    }
}

impl<S, D> HiddenMarkovModel<S, D> {
    pub fn state_count(&self) -> usize {
        self.emissions.len()
    }
    pub fn initial(&self) -> &S {
        &self.initial
    }
    pub fn transitions(&self) -> &[S] {
        &self.transitions
    }
    pub fn emissions(&self) -> &[D] {
        &self.emissions
    }
    fn check_state(&self, state: usize) -> Result<usize> {
        if state < self.state_count() {
            Ok(state)
        } else {
            Err(HmmError::invalid(format!(
                "state {} is out of the range 0..{}",
                state,
                self.state_count()
            )))
        }
    }
    /// Pr{the first state is `state`|observation}.
    pub fn initial_probability<O>(&self, state: usize, observation: &O) -> f64
    where
        S: StateDistribution<O>,
    {
        self.initial.probability(state, observation)
    }
    /// Pr{from -> to|observation}. Panics if `from` is not a state.
    pub fn transition_probability<O>(&self, from: usize, to: usize, observation: &O) -> f64
    where
        S: StateDistribution<O>,
    {
        self.transitions[from].probability(to, observation)
    }
    /// Pr{observation|state}. Panics if `state` is not a state.
    pub fn emission_probability<O>(&self, state: usize, observation: &O) -> f64
    where
        D: Distribution<O>,
    {
        self.emissions[state].probability(observation)
    }
    pub fn sample_initial_state<O, R: Rng + ?Sized>(
        &self,
        context: Option<&O>,
        rng: &mut R,
    ) -> Result<usize>
    where
        S: StateDistribution<O>,
    {
        self.initial.sample_state(context, rng)
    }
    pub fn sample_state<O, R: Rng + ?Sized>(
        &self,
        from: usize,
        context: Option<&O>,
        rng: &mut R,
    ) -> Result<usize>
    where
        S: StateDistribution<O>,
    {
        let from = self.check_state(from)?;
        self.transitions[from].sample_state(context, rng)
    }
    pub fn sample_observation<O, R: Rng + ?Sized>(
        &self,
        state: usize,
        context: Option<&O>,
        rng: &mut R,
    ) -> Result<O>
    where
        D: Distribution<O>,
    {
        let state = self.check_state(state)?;
        self.emissions[state].sample(context, rng)
    }
    pub fn estimate_initial<O>(&mut self, expectations: &[Vec<f64>], observations: &[O]) -> Result<()>
    where
        S: StateDistribution<O>,
    {
        self.initial.estimate(expectations, observations)
    }
    pub fn estimate_transition<O>(
        &mut self,
        from: usize,
        expectations: &[Vec<f64>],
        observations: &[O],
    ) -> Result<()>
    where
        S: StateDistribution<O>,
    {
        let from = self.check_state(from)?;
        self.transitions[from].estimate(expectations, observations)
    }
    pub fn estimate_emission<O>(
        &mut self,
        state: usize,
        observations: &[O],
        weights: &[f64],
    ) -> Result<()>
    where
        D: Distribution<O>,
    {
        let state = self.check_state(state)?;
        self.emissions[state].estimate(observations, weights)
    }
}

impl<D> HiddenMarkovModel<SimpleStateDistribution, D> {
    /// A model whose initial and transition probabilities do not depend on the observation.
    pub fn simple(initial: &[f64], transitions: &[Vec<f64>], emissions: Vec<D>) -> Result<Self> {
        let initial = SimpleStateDistribution::new(initial.to_vec())?;
        let transitions = transitions
            .iter()
            .map(|row| SimpleStateDistribution::new(row.clone()))
            .collect::<Result<Vec<_>>>()?;
        Self::new(initial, transitions, emissions)
    }
    /// Random initial and transition probabilities around the given emissions.
    pub fn random_simple<R: Rng + ?Sized>(emissions: Vec<D>, rng: &mut R) -> Result<Self> {
        let states = emissions.len();
        let initial = SimpleStateDistribution::random(states, rng)?;
        let transitions = (0..states)
            .map(|_| SimpleStateDistribution::random(states, rng))
            .collect::<Result<Vec<_>>>()?;
        Self::new(initial, transitions, emissions)
    }
    pub fn initial_probabilities(&self) -> &[f64] {
        self.initial.probabilities()
    }
    /// `matrix[from][to]`.
    pub fn transition_matrix(&self) -> Vec<Vec<f64>> {
        self.transitions
            .iter()
            .map(|row| row.probabilities().to_vec())
            .collect()
    }
}

impl<S: std::fmt::Display, D: std::fmt::Display> std::fmt::Display for HiddenMarkovModel<S, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        writeln!(f, "States:{}", self.state_count())?;
        writeln!(f, "Transition:")?;
        for (from, dist) in self.transitions.iter().enumerate() {
            writeln!(f, "{}:{}", from, dist)?;
        }
        writeln!(f, "Emission:")?;
        for (state, dist) in self.emissions.iter().enumerate() {
            writeln!(f, "{}:{}", state, dist)?;
        }
        write!(f, "Initial:{}", self.initial)
    }
}
