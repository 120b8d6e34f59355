//! Baum-Welch reestimation.
use super::forward_backward::rescale;
use super::{ForwardBackwardProbabilityCalculator, HiddenMarkovModel, StateDistribution};
use crate::dist::Distribution;
use crate::dptable::DPTable;
use crate::error::{HmmError, Result};
use crate::sequence::Sequence;
use rayon::prelude::*;

/// Something improved one step at a time.
/// A convergence loop calls `train` until the returned score stops moving.
pub trait Trainer {
    /// One training step. Returns the score of the model before the step.
    fn train(&mut self) -> Result<f64>;
}

/// The posterior expectations of one sequence.
#[derive(Debug, Clone)]
pub struct Expectations {
    log_probability: f64,
    states: DPTable<f64>,
    transitions: Vec<DPTable<f64>>,
}

impl Expectations {
    pub fn new<S, D, O>(model: &HiddenMarkovModel<S, D>, sequence: &Sequence<O>) -> Result<Self>
    where
        S: StateDistribution<O>,
        D: Distribution<O>,
    {
        let mut calc = ForwardBackwardProbabilityCalculator::new(model, sequence);
        let log_probability = calc.log_probability()?;
        let (alpha, beta) = calc.tables()?;
        let (states, len) = (model.state_count(), sequence.len());
        let mut gamma = DPTable::new(len, states, 0f64);
        for t in 0..len {
            let row = gamma.row_mut(t);
            row.iter_mut()
                .zip(alpha.row(t).iter().zip(beta.row(t)))
                .for_each(|(g, (a, b))| *g = a * b);
            rescale(row, t)?;
        }
        let mut transitions = Vec::with_capacity(len - 1);
        for t in 0..len - 1 {
            let obs = &sequence[t + 1];
            let arrival: Vec<f64> = (0..states)
                .map(|j| model.emission_probability(j, obs) * beta.get(t + 1, j))
                .collect();
            let mut table = DPTable::new(states, states, 0f64);
            for i in 0..states {
                let a = alpha.get(t, i);
                for (j, x) in table.row_mut(i).iter_mut().enumerate() {
                    *x = a * model.transition_probability(i, j, obs) * arrival[j];
                }
            }
            rescale(table.as_mut_slice(), t + 1)?;
            transitions.push(table);
        }
        Ok(Self {
            log_probability,
            states: gamma,
            transitions,
        })
    }
    pub fn log_probability(&self) -> f64 {
        self.log_probability
    }
    /// γ. `states()[(t, i)]` is Pr{state i at t|sequence}.
    pub fn states(&self) -> &DPTable<f64> {
        &self.states
    }
    /// γ2. `transitions()[t][(i, j)]` is Pr{state i at t and j at t+1|sequence}.
    pub fn transitions(&self) -> &[DPTable<f64>] {
        &self.transitions
    }
}

/// Baum-Welch training over a batch of sequences.
/// The E-step runs on every sequence in parallel, then the M-step refits the initial,
/// the transition, and the emission distributions in this order.
#[derive(Debug, Clone)]
pub struct HiddenMarkovModelReestimator<S, D, O> {
    model: HiddenMarkovModel<S, D>,
    sequences: Vec<Sequence<O>>,
    emission_observations: Vec<O>,
    transition_observations: Vec<O>,
    initial_observations: Vec<O>,
}

impl<S, D, O> HiddenMarkovModelReestimator<S, D, O>
where
    S: StateDistribution<O> + Sync,
    D: Distribution<O> + Sync,
    O: Clone + Sync,
{
    pub fn new(model: HiddenMarkovModel<S, D>, sequences: Vec<Sequence<O>>) -> Result<Self> {
        if sequences.is_empty() {
            return Err(HmmError::invalid("no sequence to train on"));
        }
        let emission_observations: Vec<O> = sequences
            .iter()
            .flat_map(|seq| seq.iter().cloned())
            .collect();
        let transition_observations: Vec<O> = sequences
            .iter()
            .flat_map(|seq| seq.iter().skip(1).cloned())
            .collect();
        let initial_observations: Vec<O> =
            sequences.iter().map(|seq| seq.first().clone()).collect();
        Ok(Self {
            model,
            sequences,
            emission_observations,
            transition_observations,
            initial_observations,
        })
    }
    pub fn model(&self) -> &HiddenMarkovModel<S, D> {
        &self.model
    }
    pub fn into_model(self) -> HiddenMarkovModel<S, D> {
        self.model
    }
    pub fn sequences(&self) -> &[Sequence<O>] {
        &self.sequences
    }
    /// All the observations, sequence by sequence.
    pub fn emission_observations(&self) -> &[O] {
        &self.emission_observations
    }
    /// All the observations but the first of each sequence.
    pub fn transition_observations(&self) -> &[O] {
        &self.transition_observations
    }
    /// The first observation of each sequence.
    pub fn initial_observations(&self) -> &[O] {
        &self.initial_observations
    }
    /// E-step under the current model.
    pub fn expectations(&self) -> Result<Vec<Expectations>> {
        let model = &self.model;
        self.sequences
            .par_iter()
            .map(|seq| Expectations::new(model, seq))
            .collect()
    }
    fn maximize(&mut self, expectations: &[Expectations]) -> Result<()> {
        let initial: Vec<Vec<f64>> = expectations
            .iter()
            .map(|e| e.states().row(0).to_vec())
            .collect();
        self.model
            .estimate_initial(&initial, &self.initial_observations)?;
        for from in 0..self.model.state_count() {
            let moves: Vec<Vec<f64>> = expectations
                .iter()
                .flat_map(|e| e.transitions().iter().map(move |pair| pair.row(from).to_vec()))
                .collect();
            self.model
                .estimate_transition(from, &moves, &self.transition_observations)?;
        }
        for state in 0..self.model.state_count() {
            let weights: Vec<f64> = expectations
                .iter()
                .flat_map(|e| e.states().iter_rows().map(move |row| row[state]))
                .collect();
            self.model
                .estimate_emission(state, &self.emission_observations, &weights)?;
        }
        Ok(())
    }
}

impl<S, D, O> Trainer for HiddenMarkovModelReestimator<S, D, O>
where
    S: StateDistribution<O> + Sync,
    D: Distribution<O> + Sync,
    O: Clone + Sync,
{
    /// One EM step. Returns the average log-likelihood of the sequences under the model before the step.
    fn train(&mut self) -> Result<f64> {
        let expectations = self.expectations()?;
        let total: f64 = expectations.iter().map(|e| e.log_probability()).sum();
        let average = total / expectations.len() as f64;
        debug!("LK\t{:.4}\t{}", average, expectations.len());
        self.maximize(&expectations)?;
        Ok(average)
    }
}
