use super::{check_weights, DiscreteDistribution, Distribution};
use crate::error::{HmmError, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// A finite mixture: `Pr{o} = sum_k w_k Pr_k{o}`.
/// The weights are themselves a `DiscreteDistribution` over the components,
/// so they can carry a prior as well.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawMixtureDistribution<C>")]
#[serde(bound(deserialize = "C: Deserialize<'de>"))]
pub struct MixtureDistribution<C> {
    components: Vec<C>,
    weights: DiscreteDistribution,
}

#[derive(Deserialize)]
struct RawMixtureDistribution<C> {
    components: Vec<C>,
    weights: DiscreteDistribution,
}

impl<C> TryFrom<RawMixtureDistribution<C>> for MixtureDistribution<C> {
    type Error = HmmError;
    fn try_from(raw: RawMixtureDistribution<C>) -> Result<Self> {
        Self::new(raw.components, raw.weights)
    }
}

impl<C> MixtureDistribution<C> {
    pub fn new(components: Vec<C>, weights: DiscreteDistribution) -> Result<Self> {
        if components.len() != weights.range() {
            return Err(HmmError::Mismatch {
                what: "mixture weights",
                expected: components.len(),
                found: weights.range(),
            });
        }
        Ok(Self {
            components,
            weights,
        })
    }
    /// Equally weighted components.
    pub fn uniform(components: Vec<C>) -> Result<Self> {
        let weights = DiscreteDistribution::uniform(components.len())?;
        Self::new(components, weights)
    }
    pub fn components(&self) -> &[C] {
        &self.components
    }
    pub fn weights(&self) -> &DiscreteDistribution {
        &self.weights
    }
}

impl<O, C: Distribution<O>> Distribution<O> for MixtureDistribution<C> {
    fn probability(&self, observation: &O) -> f64 {
        self.components
            .iter()
            .zip(self.weights.probabilities())
            .map(|(c, w)| w * c.probability(observation))
            .sum()
    }
    fn sample<R: Rng + ?Sized>(&self, context: Option<&O>, rng: &mut R) -> Result<O> {
        let k = self.weights.sample_index(rng)?;
        self.components[k].sample(context, rng)
    }
    /// The mode of the heaviest component. Not the mode of the mixture in general.
    fn mode(&self, context: Option<&O>) -> Result<O> {
        self.components[self.weights.mode_index()].mode(context)
    }
    fn estimate(&mut self, observations: &[O], weights: &[f64]) -> Result<()> {
        check_weights(observations, weights)?;
        let mixing = self.weights.probabilities();
        // responsibilities[k][t]: the share of observation t explained by component k.
        let mut responsibilities = vec![vec![0f64; observations.len()]; self.components.len()];
        for (t, (obs, w)) in observations.iter().zip(weights.iter()).enumerate() {
            let joint: Vec<f64> = self
                .components
                .iter()
                .zip(mixing.iter())
                .map(|(c, m)| m * c.probability(obs))
                .collect();
            let sum: f64 = joint.iter().sum();
            for (k, resp) in responsibilities.iter_mut().enumerate() {
                resp[t] = if 0f64 < sum {
                    w * joint[k] / sum
                } else {
                    w * mixing[k]
                };
            }
        }
        for (component, resp) in self.components.iter_mut().zip(responsibilities.iter()) {
            component.estimate(observations, resp)?;
        }
        let masses: Vec<f64> = responsibilities
            .iter()
            .map(|resp| resp.iter().sum())
            .collect();
        trace!("Mixture masses:{:?}", masses);
        self.weights.reestimate(&masses);
        Ok(())
    }
}

impl<C: std::fmt::Display> std::fmt::Display for MixtureDistribution<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        writeln!(f, "Mixture {}", self.weights)?;
        let components: Vec<_> = self
            .components
            .iter()
            .map(|c| format!("{}", c))
            .collect();
        write!(f, "{}", components.join("\n"))
    }
}
