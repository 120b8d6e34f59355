use super::Distribution;
use crate::error::Result;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Wraps a distribution and freezes its parameters:
/// `estimate` accepts any input and changes nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixedDistribution<D> {
    inner: D,
}

impl<D> FixedDistribution<D> {
    pub fn new(inner: D) -> Self {
        Self { inner }
    }
    pub fn inner(&self) -> &D {
        &self.inner
    }
    pub fn into_inner(self) -> D {
        self.inner
    }
}

impl<O, D: Distribution<O>> Distribution<O> for FixedDistribution<D> {
    fn probability(&self, observation: &O) -> f64 {
        self.inner.probability(observation)
    }
    fn log_probability(&self, observation: &O) -> f64 {
        self.inner.log_probability(observation)
    }
    fn sample<R: Rng + ?Sized>(&self, context: Option<&O>, rng: &mut R) -> Result<O> {
        self.inner.sample(context, rng)
    }
    fn mode(&self, context: Option<&O>) -> Result<O> {
        self.inner.mode(context)
    }
    fn estimate(&mut self, _observations: &[O], _weights: &[f64]) -> Result<()> {
        Ok(())
    }
}

impl<D: std::fmt::Display> std::fmt::Display for FixedDistribution<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "Fixed {}", self.inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dist::DiscreteDistribution;
    #[test]
    fn estimate_is_a_no_op() {
        let inner = DiscreteDistribution::new(vec![0.3, 0.7]).unwrap();
        let mut fixed = FixedDistribution::new(inner.clone());
        fixed.estimate(&[0usize, 0, 0], &[1.0, 1.0, 1.0]).unwrap();
        assert_eq!(fixed.inner(), &inner);
        assert_eq!(fixed.probability(&1usize), 0.7);
        assert_eq!(Distribution::<usize>::mode(&fixed, None).unwrap(), 1);
    }
}
