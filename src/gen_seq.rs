//! This module is to generate some random sequence from a model to assess training and decoding.
//! Usually, it would not be used in the real-applications.
use crate::dist::Distribution;
use crate::error::{HmmError, Result};
use crate::hmm::{HiddenMarkovModel, StateDistribution};
use crate::sequence::Sequence;
use rand::Rng;

/// Sample a state path and the observations of length `len`.
/// No context is given to the state and emission distributions, so this works
/// for models that do not condition on the observation.
pub fn sample_sequence<S, D, O, R>(
    model: &HiddenMarkovModel<S, D>,
    len: usize,
    rng: &mut R,
) -> Result<(Vec<usize>, Sequence<O>)>
where
    S: StateDistribution<O>,
    D: Distribution<O>,
    R: Rng + ?Sized,
{
    if len == 0 {
        return Err(HmmError::invalid("cannot sample an empty sequence"));
    }
    let mut state = model.sample_initial_state::<O, R>(None, rng)?;
    let mut path = Vec::with_capacity(len);
    let mut observations = Vec::with_capacity(len);
    for t in 0..len {
        if 0 < t {
            state = model.sample_state::<O, R>(state, None, rng)?;
        }
        path.push(state);
        observations.push(model.sample_observation::<O, R>(state, None, rng)?);
    }
    Ok((path, Sequence::new(observations)?))
}

/// Sample a state path and the observations, giving each step its context.
/// For input/output models, the context carries the input of the step and
/// the sampled observation keeps it.
pub fn sample_sequence_with<S, D, O, R>(
    model: &HiddenMarkovModel<S, D>,
    contexts: &[O],
    rng: &mut R,
) -> Result<(Vec<usize>, Sequence<O>)>
where
    S: StateDistribution<O>,
    D: Distribution<O>,
    R: Rng + ?Sized,
{
    let first = contexts
        .first()
        .ok_or_else(|| HmmError::invalid("cannot sample an empty sequence"))?;
    let mut state = model.sample_initial_state(Some(first), rng)?;
    let mut path = Vec::with_capacity(contexts.len());
    let mut observations = Vec::with_capacity(contexts.len());
    for (t, context) in contexts.iter().enumerate() {
        if 0 < t {
            state = model.sample_state(state, Some(context), rng)?;
        }
        path.push(state);
        observations.push(model.sample_observation(state, Some(context), rng)?);
    }
    Ok((path, Sequence::new(observations)?))
}

/// `len` i.i.d. draws from {0,1}, where 1 has probability `p`.
pub fn bernoulli<R: Rng + ?Sized>(len: usize, p: f64, rng: &mut R) -> Vec<usize> {
    (0..len).map(|_| (rng.gen::<f64>() < p) as usize).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dist::DiscreteDistributionTable;
    use crate::hmm::tests::coin;
    use crate::hmm::SimpleStateDistributionTable;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256StarStar;
    #[test]
    fn sample_from_coin() {
        let mut rng: Xoshiro256StarStar = SeedableRng::seed_from_u64(0);
        let model = coin([1.0, 0.0], [[0.0, 1.0], [1.0, 0.0]], [[1.0, 0.0], [0.0, 1.0]]);
        let (path, seq) = sample_sequence::<_, _, usize, _>(&model, 6, &mut rng).unwrap();
        assert_eq!(path, vec![0, 1, 0, 1, 0, 1]);
        assert_eq!(seq.as_slice(), &[0, 1, 0, 1, 0, 1]);
        let empty = sample_sequence::<_, _, usize, _>(&model, 0, &mut rng);
        assert!(empty.is_err());
    }
    #[test]
    fn sample_with_inputs() {
        let mut rng: Xoshiro256StarStar = SeedableRng::seed_from_u64(1);
        let initial = SimpleStateDistributionTable::random(3, 2, &mut rng).unwrap();
        let transitions = (0..2)
            .map(|_| SimpleStateDistributionTable::random(3, 2, &mut rng))
            .collect::<Result<Vec<_>>>()
            .unwrap();
        let emissions = (0..2)
            .map(|_| DiscreteDistributionTable::random(3, 4, &mut rng))
            .collect::<Result<Vec<_>>>()
            .unwrap();
        let model = HiddenMarkovModel::new(initial, transitions, emissions).unwrap();
        let contexts: Vec<(usize, usize)> = (0..30).map(|t| (t % 3, 0)).collect();
        let (path, seq) = sample_sequence_with(&model, &contexts, &mut rng).unwrap();
        assert_eq!(path.len(), 30);
        for (obs, context) in seq.iter().zip(contexts.iter()) {
            assert_eq!(obs.0, context.0);
            assert!(obs.1 < 4);
        }
        let no_context = sample_sequence::<_, _, (usize, usize), _>(&model, 3, &mut rng);
        assert!(no_context.is_err());
    }
    #[test]
    fn bernoulli_frequency() {
        let mut rng: Xoshiro256StarStar = SeedableRng::seed_from_u64(2);
        let coins = bernoulli(10_000, 0.3, &mut rng);
        let ones = coins.iter().sum::<usize>() as f64 / 10_000f64;
        assert!((ones - 0.3).abs() < 0.02, "{}", ones);
        assert!(coins.iter().all(|&x| x < 2));
    }
}
