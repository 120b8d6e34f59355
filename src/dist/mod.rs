//! Probability distributions over observations.
//! A hidden Markov model holds one of these per state as its emission distribution.
use crate::error::{HmmError, Result};
use rand::Rng;
pub mod discrete;
pub mod fixed;
pub mod mixture;
pub mod table;
pub use discrete::DiscreteDistribution;
pub use fixed::FixedDistribution;
pub use mixture::MixtureDistribution;
pub use table::DiscreteDistributionTable;

/// The capability emission distributions provide.
pub trait Distribution<O> {
    /// Pr{observation}, in [0,1].
    fn probability(&self, observation: &O) -> f64;
    fn log_probability(&self, observation: &O) -> f64 {
        self.probability(observation).ln()
    }
    /// Draw an observation. `context` carries whatever a conditional
    /// distribution conditions on and is ignored by the others.
    fn sample<R: Rng + ?Sized>(&self, context: Option<&O>, rng: &mut R) -> Result<O>;
    /// The most probable observation.
    fn mode(&self, context: Option<&O>) -> Result<O>;
    /// Refit the parameters to the weighted observations.
    /// `weights[k]` is the (possibly fractional) count of `observations[k]`.
    fn estimate(&mut self, observations: &[O], weights: &[f64]) -> Result<()>;
}

pub(crate) fn check_weights<O>(observations: &[O], weights: &[f64]) -> Result<()> {
    if observations.len() != weights.len() {
        return Err(HmmError::invalid(format!(
            "{} observations but {} weights",
            observations.len(),
            weights.len()
        )));
    }
    match weights.iter().position(|w| !w.is_finite() || *w < 0f64) {
        Some(k) => Err(HmmError::invalid(format!(
            "weight {} of observation {} is not a soft count",
            weights[k], k
        ))),
        None => Ok(()),
    }
}

/// Check that `probabilities` is a probability vector.
pub(crate) fn check_probabilities(probabilities: &[f64]) -> Result<()> {
    if probabilities.is_empty() {
        return Err(HmmError::invalid("empty probability vector"));
    }
    if let Some(p) = probabilities.iter().find(|p| !p.is_finite() || **p < 0f64) {
        return Err(HmmError::invalid(format!("{} is not a probability", p)));
    }
    let sum: f64 = probabilities.iter().sum();
    if (sum - 1f64).abs() > PROB_TOLERANCE {
        return Err(HmmError::invalid(format!(
            "probabilities sum to {}, not 1",
            sum
        )));
    }
    Ok(())
}

const PROB_TOLERANCE: f64 = 1e-6;

/// Index of the first maximum. Later entries must be strictly larger to win.
pub(crate) fn first_argmax<I: IntoIterator<Item = f64>>(xs: I) -> (usize, f64) {
    xs.into_iter()
        .enumerate()
        .fold((0, f64::NEG_INFINITY), |(argmax, max), (i, x)| {
            if max < x {
                (i, x)
            } else {
                (argmax, max)
            }
        })
}
