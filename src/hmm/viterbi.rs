//! Viterbi decoding in the log domain.
use super::{HiddenMarkovModel, StateDistribution};
use crate::dist::{first_argmax, Distribution};
use crate::dptable::DPTable;
use crate::sequence::Sequence;

#[derive(Debug, Clone)]
struct Viterbi {
    probabilities: DPTable<f64>,
    path: Vec<usize>,
    log_probability: f64,
}

/// The most likely state sequence of one sequence under one model.
/// Ties go to the smallest state index, both in the recursion and at the last step.
/// Impossible sequences are not an error: every path scores -inf and the decoded path is all zeros.
#[derive(Debug, Clone)]
pub struct StateSequenceCalculator<'a, S, D, O> {
    model: &'a HiddenMarkovModel<S, D>,
    sequence: &'a Sequence<O>,
    viterbi: Option<Viterbi>,
}

impl<'a, S, D, O> StateSequenceCalculator<'a, S, D, O>
where
    S: StateDistribution<O>,
    D: Distribution<O>,
{
    pub fn new(model: &'a HiddenMarkovModel<S, D>, sequence: &'a Sequence<O>) -> Self {
        Self {
            model,
            sequence,
            viterbi: None,
        }
    }
    /// The most likely state path. Its length is the length of the sequence.
    pub fn state_sequence(&mut self) -> &[usize] {
        &self.cache().path
    }
    /// ln Pr{sequence, best path|model}.
    pub fn log_probability(&mut self) -> f64 {
        self.cache().log_probability
    }
    /// `V[t][i]`, the log probability of the best path ending at state i at time t.
    pub fn probabilities(&mut self) -> &DPTable<f64> {
        &self.cache().probabilities
    }
    fn cache(&mut self) -> &Viterbi {
        let viterbi = match self.viterbi.take() {
            Some(viterbi) => viterbi,
            None => self.compute(),
        };
        let viterbi: &Viterbi = self.viterbi.insert(viterbi);
        viterbi
    }
    fn compute(&self) -> Viterbi {
        let model = self.model;
        let (states, len) = (model.state_count(), self.sequence.len());
        let mut probabilities = DPTable::new(len, states, f64::NEG_INFINITY);
        let mut chain = DPTable::new(len, states, 0usize);
        let first = self.sequence.first();
        for (i, v) in probabilities.row_mut(0).iter_mut().enumerate() {
            *v = model.initial_probability(i, first).ln() + model.emission_probability(i, first).ln();
        }
        for t in 1..len {
            let obs = &self.sequence[t];
            for i in 0..states {
                let (from, max) = first_argmax(
                    (0..states)
                        .map(|j| probabilities.get(t - 1, j) + model.transition_probability(j, i, obs).ln()),
                );
                probabilities[(t, i)] = max + model.emission_probability(i, obs).ln();
                chain[(t, i)] = from;
            }
        }
        let (mut state, log_probability) = first_argmax(probabilities.row(len - 1).iter().copied());
        let mut path = vec![0; len];
        for t in (0..len).rev() {
            path[t] = state;
            state = chain.get(t, state);
        }
        trace!("Viterbi:{:.3}", log_probability);
        Viterbi {
            probabilities,
            path,
            log_probability,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dist::DiscreteDistribution;
    use crate::gen_seq;
    use crate::hmm::tests::coin;
    use crate::hmm::SimpleStateDistribution;
    use rand::{Rng, SeedableRng};
    use rand_xoshiro::Xoshiro256StarStar;
    type Model = HiddenMarkovModel<SimpleStateDistribution, DiscreteDistribution>;
    fn best_path_by_enumeration(model: &Model, seq: &[usize]) -> f64 {
        let states = model.state_count();
        (0..states.pow(seq.len() as u32))
            .map(|mut code| {
                let path: Vec<usize> = (0..seq.len())
                    .map(|_| {
                        let s = code % states;
                        code /= states;
                        s
                    })
                    .collect();
                let mut lk = model.initial_probability(path[0], &seq[0]).ln()
                    + model.emission_probability(path[0], &seq[0]).ln();
                for t in 1..seq.len() {
                    lk += model.transition_probability(path[t - 1], path[t], &seq[t]).ln()
                        + model.emission_probability(path[t], &seq[t]).ln();
                }
                lk
            })
            .fold(f64::NEG_INFINITY, f64::max)
    }
    #[test]
    fn single_state() {
        let emissions = vec![DiscreteDistribution::new(vec![0.3, 0.7]).unwrap()];
        let model = HiddenMarkovModel::simple(&[1.0], &[vec![1.0]], emissions).unwrap();
        let seq = Sequence::new(vec![0usize, 1, 1, 0, 1]).unwrap();
        let mut calc = StateSequenceCalculator::new(&model, &seq);
        assert_eq!(calc.state_sequence(), &[0, 0, 0, 0, 0]);
        let expected = 2.0 * 0.3f64.ln() + 3.0 * 0.7f64.ln();
        assert!((calc.log_probability() - expected).abs() < 1e-9);
    }
    #[test]
    fn ties_go_to_first_state() {
        let model = coin([0.5, 0.5], [[0.5, 0.5], [0.5, 0.5]], [[0.9, 0.1], [0.9, 0.1]]);
        let seq = Sequence::new(vec![1usize, 0, 0, 1, 0, 1, 1]).unwrap();
        let mut calc = StateSequenceCalculator::new(&model, &seq);
        assert_eq!(calc.state_sequence(), &[0; 7]);
    }
    #[test]
    fn impossible_sequence_is_all_zeros() {
        let point = DiscreteDistribution::point(2, 0).unwrap();
        let model = HiddenMarkovModel::simple(
            &[0.5, 0.5],
            &[vec![0.5, 0.5], vec![0.5, 0.5]],
            vec![point.clone(), point],
        )
        .unwrap();
        let seq = Sequence::new(vec![0usize, 1, 0]).unwrap();
        let mut calc = StateSequenceCalculator::new(&model, &seq);
        assert_eq!(calc.state_sequence(), &[0, 0, 0]);
        assert_eq!(calc.log_probability(), f64::NEG_INFINITY);
    }
    #[test]
    fn decodes_obvious_states() {
        let model = coin([0.5, 0.5], [[0.9, 0.1], [0.1, 0.9]], [[0.95, 0.05], [0.05, 0.95]]);
        let seq = Sequence::new(vec![0usize, 0, 0, 1, 1, 1, 1, 0, 0]).unwrap();
        let mut calc = StateSequenceCalculator::new(&model, &seq);
        assert_eq!(calc.state_sequence(), &[0, 0, 0, 1, 1, 1, 1, 0, 0]);
        assert_eq!(calc.probabilities().rows(), seq.len());
    }
    #[test]
    fn agrees_with_enumeration() {
        let mut rng: Xoshiro256StarStar = SeedableRng::seed_from_u64(31);
        for _ in 0..10 {
            let emissions = (0..3)
                .map(|_| DiscreteDistribution::random(3, &mut rng))
                .collect::<crate::error::Result<Vec<_>>>()
                .unwrap();
            let model = HiddenMarkovModel::random_simple(emissions, &mut rng).unwrap();
            let seq: Vec<usize> = (0..5).map(|_| rng.gen_range(0..3)).collect();
            let expected = best_path_by_enumeration(&model, &seq);
            let seq = Sequence::new(seq).unwrap();
            let mut calc = StateSequenceCalculator::new(&model, &seq);
            let lk = calc.log_probability();
            assert!((lk - expected).abs() < 1e-9, "{}\t{}", lk, expected);
            assert_eq!(calc.state_sequence().len(), 5);
        }
    }
    #[test]
    fn one_hot_round_trip() {
        let mut rng: Xoshiro256StarStar = SeedableRng::seed_from_u64(7);
        let emissions = (0..4)
            .map(|i| DiscreteDistribution::point(4, i))
            .collect::<crate::error::Result<Vec<_>>>()
            .unwrap();
        let model = HiddenMarkovModel::random_simple(emissions, &mut rng).unwrap();
        for _ in 0..20 {
            let (path, seq) = gen_seq::sample_sequence::<_, _, usize, _>(&model, 50, &mut rng).unwrap();
            let mut calc = StateSequenceCalculator::new(&model, &seq);
            assert_eq!(calc.state_sequence(), path.as_slice());
        }
    }
}
