//! Scaled forward-backward algorithm.
//!
//! The forward table is normalized at each step: every row of α sums to one,
//! and `scales()[t]` is the reciprocal of the row sum before normalization.
//! Then the log-likelihood of the whole sequence is `-sum_t ln(scales[t])`,
//! which does not underflow however long the sequence is.
//! The backward table β is scaled by the same factors, so that
//! `sum_i α[t][i] * β[t][i] = scales[t]` for all t.
use super::{HiddenMarkovModel, StateDistribution};
use crate::dist::Distribution;
use crate::dptable::DPTable;
use crate::error::{HmmError, Result};
use crate::sequence::Sequence;

#[derive(Debug, Clone)]
struct Forward {
    alpha: DPTable<f64>,
    scales: Vec<f64>,
}

/// Forward and backward tables of one sequence under one model.
/// Tables are computed at the first access and kept; use a new calculator for a new sequence.
#[derive(Debug, Clone)]
pub struct ForwardBackwardProbabilityCalculator<'a, S, D, O> {
    model: &'a HiddenMarkovModel<S, D>,
    sequence: &'a Sequence<O>,
    forward: Option<Forward>,
    backward: Option<DPTable<f64>>,
}

impl<'a, S, D, O> ForwardBackwardProbabilityCalculator<'a, S, D, O>
where
    S: StateDistribution<O>,
    D: Distribution<O>,
{
    pub fn new(model: &'a HiddenMarkovModel<S, D>, sequence: &'a Sequence<O>) -> Self {
        Self {
            model,
            sequence,
            forward: None,
            backward: None,
        }
    }
    pub fn model(&self) -> &'a HiddenMarkovModel<S, D> {
        self.model
    }
    pub fn sequence(&self) -> &'a Sequence<O> {
        self.sequence
    }
    /// The normalized forward table, α.
    pub fn forward(&mut self) -> Result<&DPTable<f64>> {
        self.forward_cache().map(|forward| &forward.alpha)
    }
    /// `scales[t] = 1 / (sum_i raw α[t][i])`.
    pub fn scales(&mut self) -> Result<&[f64]> {
        self.forward_cache().map(|forward| forward.scales.as_slice())
    }
    /// The backward table, β. Computes α first if needed.
    pub fn backward(&mut self) -> Result<&DPTable<f64>> {
        self.tables().map(|(_, beta)| beta)
    }
    /// ln Pr{sequence|model}.
    pub fn log_probability(&mut self) -> Result<f64> {
        let scales = self.scales()?;
        Ok(-scales.iter().map(|c| c.ln()).sum::<f64>())
    }
    /// Pr{sequence|model}. Underflows on long sequences: prefer `log_probability`.
    pub fn probability(&mut self) -> Result<f64> {
        let scales = self.scales()?;
        Ok(scales.iter().map(|c| c.recip()).product())
    }
    /// (α, β).
    pub(crate) fn tables(&mut self) -> Result<(&DPTable<f64>, &DPTable<f64>)> {
        let forward = match self.forward.take() {
            Some(forward) => forward,
            None => self.compute_forward()?,
        };
        let backward = match self.backward.take() {
            Some(backward) => backward,
            None => self.compute_backward(&forward.scales),
        };
        let forward: &Forward = self.forward.insert(forward);
        let backward: &DPTable<f64> = self.backward.insert(backward);
        Ok((&forward.alpha, backward))
    }
    fn forward_cache(&mut self) -> Result<&Forward> {
        let forward = match self.forward.take() {
            Some(forward) => forward,
            None => self.compute_forward()?,
        };
        let forward: &Forward = self.forward.insert(forward);
        Ok(forward)
    }
    fn compute_forward(&self) -> Result<Forward> {
        let model = self.model;
        let (states, len) = (model.state_count(), self.sequence.len());
        let mut alpha = DPTable::new(len, states, 0f64);
        let mut scales = Vec::with_capacity(len);
        let first = self.sequence.first();
        for (i, a) in alpha.row_mut(0).iter_mut().enumerate() {
            *a = model.initial_probability(i, first) * model.emission_probability(i, first);
        }
        scales.push(rescale(alpha.row_mut(0), 0)?);
        for t in 1..len {
            let obs = &self.sequence[t];
            for j in 0..states {
                let incoming: f64 = (0..states)
                    .map(|i| alpha.get(t - 1, i) * model.transition_probability(i, j, obs))
                    .sum();
                alpha[(t, j)] = incoming * model.emission_probability(j, obs);
            }
            scales.push(rescale(alpha.row_mut(t), t)?);
        }
        Ok(Forward { alpha, scales })
    }
    fn compute_backward(&self, scales: &[f64]) -> DPTable<f64> {
        let model = self.model;
        let (states, len) = (model.state_count(), self.sequence.len());
        let mut beta = DPTable::new(len, states, 0f64);
        beta.row_mut(len - 1)
            .iter_mut()
            .for_each(|b| *b = scales[len - 1]);
        for t in (0..len - 1).rev() {
            let obs = &self.sequence[t + 1];
            let emissions: Vec<f64> = (0..states)
                .map(|j| model.emission_probability(j, obs) * beta.get(t + 1, j))
                .collect();
            for i in 0..states {
                let outgoing: f64 = emissions
                    .iter()
                    .enumerate()
                    .map(|(j, e)| model.transition_probability(i, j, obs) * e)
                    .sum();
                beta[(t, i)] = scales[t] * outgoing;
            }
        }
        beta
    }
}

/// Normalize `xs` to sum to one and return the scale factor.
/// Fails when there is no mass to normalize.
pub(crate) fn rescale(xs: &mut [f64], time: usize) -> Result<f64> {
    let sum: f64 = xs.iter().sum();
    let scale = sum.recip();
    if sum == 0f64 || sum.is_nan() || !scale.is_finite() {
        debug!("No mass at {}:{}", time, sum);
        return Err(HmmError::Degenerate { time });
    }
    xs.iter_mut().for_each(|x| *x *= scale);
    Ok(scale)
}
