use super::{check_probabilities, check_weights, first_argmax, Distribution};
use crate::error::{HmmError, Result};
use crate::sequence::Symbol;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// A distribution over the symbols `0..range`.
/// Reestimation is an m-estimate: `p_j = (c_j + m * prior_j) / (sum_c + m)`,
/// where `c_j` is the weighted count of symbol j. In other words,
/// `m * prior` is a Dirichlet pseudo-count. By default `m = 0`, the maximum likelihood estimate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawDiscreteDistribution")]
pub struct DiscreteDistribution {
    probabilities: Vec<f64>,
    prior: Vec<f64>,
    m: f64,
}

#[derive(Deserialize)]
struct RawDiscreteDistribution {
    probabilities: Vec<f64>,
    prior: Vec<f64>,
    m: f64,
}

impl TryFrom<RawDiscreteDistribution> for DiscreteDistribution {
    type Error = HmmError;
    fn try_from(raw: RawDiscreteDistribution) -> Result<Self> {
        Self::new(raw.probabilities)?.with_prior(raw.m, raw.prior)
    }
}

impl DiscreteDistribution {
    pub fn new(probabilities: Vec<f64>) -> Result<Self> {
        check_probabilities(&probabilities)?;
        let prior = vec![1f64 / probabilities.len() as f64; probabilities.len()];
        Ok(Self {
            probabilities,
            prior,
            m: 0f64,
        })
    }
    pub fn uniform(range: usize) -> Result<Self> {
        if range == 0 {
            return Err(HmmError::invalid("a distribution needs a positive range"));
        }
        Self::new(vec![1f64 / range as f64; range])
    }
    /// Random probabilities, normalized uniform draws.
    pub fn random<R: Rng + ?Sized>(range: usize, rng: &mut R) -> Result<Self> {
        if range == 0 {
            return Err(HmmError::invalid("a distribution needs a positive range"));
        }
        let draws: Vec<f64> = (0..range).map(|_| rng.gen_range(0.01..1f64)).collect();
        let sum: f64 = draws.iter().sum();
        Self::new(draws.iter().map(|x| x / sum).collect())
    }
    /// All the mass on `value`.
    pub fn point(range: usize, value: usize) -> Result<Self> {
        if range <= value {
            return Err(HmmError::invalid(format!(
                "{} is out of the range 0..{}",
                value, range
            )));
        }
        let mut probabilities = vec![0f64; range];
        probabilities[value] = 1f64;
        Self::new(probabilities)
    }
    /// Set the pseudo-count `m` and the prior it is spread over.
    pub fn with_prior(mut self, m: f64, prior: Vec<f64>) -> Result<Self> {
        if !m.is_finite() || m < 0f64 {
            return Err(HmmError::invalid(format!("{} is not a pseudo-count", m)));
        }
        if prior.len() != self.probabilities.len() {
            return Err(HmmError::Mismatch {
                what: "prior",
                expected: self.probabilities.len(),
                found: prior.len(),
            });
        }
        check_probabilities(&prior)?;
        self.m = m;
        self.prior = prior;
        Ok(self)
    }
    /// Set the pseudo-count `m`, spread uniformly.
    pub fn with_pseudo_count(self, m: f64) -> Result<Self> {
        let prior = vec![1f64 / self.range() as f64; self.range()];
        self.with_prior(m, prior)
    }
    pub fn probabilities(&self) -> &[f64] {
        &self.probabilities
    }
    pub fn prior(&self) -> &[f64] {
        &self.prior
    }
    pub fn m(&self) -> f64 {
        self.m
    }
    pub fn range(&self) -> usize {
        self.probabilities.len()
    }
    /// Pr{value}. Zero outside of the range.
    pub fn p(&self, value: usize) -> f64 {
        self.probabilities.get(value).copied().unwrap_or(0f64)
    }
    pub fn sample_index<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<usize> {
        let indices: Vec<usize> = (0..self.range()).collect();
        indices
            .choose_weighted(rng, |&i| self.probabilities[i])
            .copied()
            .map_err(|why| HmmError::invalid(format!("cannot sample: {}", why)))
    }
    /// The first most probable value.
    pub fn mode_index(&self) -> usize {
        first_argmax(self.probabilities.iter().copied()).0
    }
    /// Refit from weighted counts, one per value.
    /// If there is no mass at all, neither observed nor pseudo, nothing changes.
    pub(crate) fn reestimate(&mut self, counts: &[f64]) {
        let total = counts.iter().sum::<f64>() + self.m;
        if total <= 0f64 {
            trace!("No mass to reestimate from. Keep {}", self);
            return;
        }
        let m = self.m;
        self.probabilities
            .iter_mut()
            .zip(counts.iter().zip(self.prior.iter()))
            .for_each(|(p, (c, prior))| *p = (c + m * prior) / total);
    }
}

impl<O: Symbol> Distribution<O> for DiscreteDistribution {
    fn probability(&self, observation: &O) -> f64 {
        self.p(observation.symbol())
    }
    fn sample<R: Rng + ?Sized>(&self, _context: Option<&O>, rng: &mut R) -> Result<O> {
        self.sample_index(rng).and_then(O::from_symbol)
    }
    fn mode(&self, _context: Option<&O>) -> Result<O> {
        O::from_symbol(self.mode_index())
    }
    fn estimate(&mut self, observations: &[O], weights: &[f64]) -> Result<()> {
        check_weights(observations, weights)?;
        let mut counts = vec![0f64; self.range()];
        for (obs, w) in observations.iter().zip(weights.iter()) {
            match counts.get_mut(obs.symbol()) {
                Some(count) => *count += w,
                None => {
                    return Err(HmmError::invalid(format!(
                        "symbol {} is out of the range 0..{}",
                        obs.symbol(),
                        self.range()
                    )))
                }
            }
        }
        self.reestimate(&counts);
        Ok(())
    }
}

impl std::fmt::Display for DiscreteDistribution {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let probs: Vec<_> = self
            .probabilities
            .iter()
            .map(|x| format!("{:.3}", x))
            .collect();
        write!(f, "[{}]", probs.join("\t"))
    }
}
