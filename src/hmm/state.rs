//! Distributions over the next hidden state.
use super::{StateDistribution, StateSpace};
use crate::dist::{DiscreteDistribution, DiscreteDistributionTable, Distribution};
use crate::error::{HmmError, Result};
use crate::sequence::{Conditioned, Symbol};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Check the shape of an expectation matrix: `expectations[t][j]` is the
/// weight of moving into state j at the t-th observation.
/// `observations` is the number of rows required, if any.
pub(crate) fn check_expectations(
    expectations: &[Vec<f64>],
    states: usize,
    observations: Option<usize>,
) -> Result<()> {
    if let Some(first) = expectations.first() {
        if expectations.iter().any(|row| row.len() != first.len()) {
            return Err(HmmError::invalid("ragged expectation rows"));
        }
        if first.len() != states {
            return Err(HmmError::Mismatch {
                what: "expectation width",
                expected: states,
                found: first.len(),
            });
        }
    }
    if let Some(observations) = observations {
        if expectations.len() != observations {
            return Err(HmmError::Mismatch {
                what: "expectation rows",
                expected: observations,
                found: expectations.len(),
            });
        }
    }
    match expectations
        .iter()
        .flatten()
        .find(|x| !x.is_finite() || **x < 0f64)
    {
        Some(x) => Err(HmmError::invalid(format!("{} is not an expectation", x))),
        None => Ok(()),
    }
}

/// The next state does not depend on the observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimpleStateDistribution {
    dist: DiscreteDistribution,
}

impl SimpleStateDistribution {
    pub fn new(probabilities: Vec<f64>) -> Result<Self> {
        DiscreteDistribution::new(probabilities).map(Self::from_distribution)
    }
    pub fn from_distribution(dist: DiscreteDistribution) -> Self {
        Self { dist }
    }
    pub fn uniform(states: usize) -> Result<Self> {
        DiscreteDistribution::uniform(states).map(Self::from_distribution)
    }
    pub fn random<R: Rng + ?Sized>(states: usize, rng: &mut R) -> Result<Self> {
        DiscreteDistribution::random(states, rng).map(Self::from_distribution)
    }
    pub fn with_pseudo_count(self, m: f64) -> Result<Self> {
        self.dist.with_pseudo_count(m).map(Self::from_distribution)
    }
    pub fn probabilities(&self) -> &[f64] {
        self.dist.probabilities()
    }
    pub fn distribution(&self) -> &DiscreteDistribution {
        &self.dist
    }
}

impl StateSpace for SimpleStateDistribution {
    fn state_count(&self) -> usize {
        self.dist.range()
    }
}

impl<O> StateDistribution<O> for SimpleStateDistribution {
    fn probability(&self, next: usize, _observation: &O) -> f64 {
        self.dist.p(next)
    }
    fn sample_state<R: Rng + ?Sized>(&self, _context: Option<&O>, rng: &mut R) -> Result<usize> {
        self.dist.sample_index(rng)
    }
    fn most_likely_state(&self, _context: Option<&O>) -> Result<usize> {
        Ok(self.dist.mode_index())
    }
    fn estimate(&mut self, expectations: &[Vec<f64>], _observations: &[O]) -> Result<()> {
        let states = self.dist.range();
        check_expectations(expectations, states, None)?;
        let mut counts = vec![0f64; states];
        for row in expectations.iter() {
            counts.iter_mut().zip(row).for_each(|(c, e)| *c += e);
        }
        self.dist.reestimate(&counts);
        Ok(())
    }
}

impl std::fmt::Display for SimpleStateDistribution {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.dist)
    }
}

/// The next state is looked up by the symbol of the observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimpleStateDistributionTable {
    table: DiscreteDistributionTable,
}

impl SimpleStateDistributionTable {
    /// `probabilities[symbol][next state]`.
    pub fn new(probabilities: Vec<Vec<f64>>) -> Result<Self> {
        DiscreteDistributionTable::new(probabilities).map(Self::from_table)
    }
    pub fn from_table(table: DiscreteDistributionTable) -> Self {
        Self { table }
    }
    pub fn random<R: Rng + ?Sized>(symbols: usize, states: usize, rng: &mut R) -> Result<Self> {
        DiscreteDistributionTable::random(symbols, states, rng).map(Self::from_table)
    }
    pub fn table(&self) -> &DiscreteDistributionTable {
        &self.table
    }
    fn row_for(&self, symbol: usize) -> Result<&DiscreteDistribution> {
        self.table.distribution_for(symbol).ok_or_else(|| {
            HmmError::invalid(format!(
                "symbol {} is out of the range 0..{}",
                symbol,
                self.table.input_range()
            ))
        })
    }
}

impl StateSpace for SimpleStateDistributionTable {
    fn state_count(&self) -> usize {
        self.table.output_range()
    }
}

impl<O: Symbol> StateDistribution<O> for SimpleStateDistributionTable {
    fn probability(&self, next: usize, observation: &O) -> f64 {
        self.table.p(observation.symbol(), next)
    }
    fn sample_state<R: Rng + ?Sized>(&self, context: Option<&O>, rng: &mut R) -> Result<usize> {
        let context = context.ok_or_else(|| HmmError::invalid("a state table needs a context"))?;
        self.row_for(context.symbol())?.sample_index(rng)
    }
    fn most_likely_state(&self, context: Option<&O>) -> Result<usize> {
        let context = context.ok_or_else(|| HmmError::invalid("a state table needs a context"))?;
        Ok(self.row_for(context.symbol())?.mode_index())
    }
    fn estimate(&mut self, expectations: &[Vec<f64>], observations: &[O]) -> Result<()> {
        check_expectations(expectations, self.state_count(), Some(observations.len()))?;
        let mut counts = self.table.zero_counts();
        for (row, obs) in expectations.iter().zip(observations.iter()) {
            let symbol = obs.symbol();
            let sums = match counts.get_mut(symbol) {
                Some(sums) => sums,
                None => {
                    return Err(HmmError::invalid(format!(
                        "symbol {} is out of the range 0..{}",
                        symbol,
                        self.table.input_range()
                    )))
                }
            };
            sums.iter_mut().zip(row).for_each(|(c, e)| *c += e);
        }
        self.table.reestimate(&counts);
        Ok(())
    }
}

impl std::fmt::Display for SimpleStateDistributionTable {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.table)
    }
}

/// Reads any distribution over conditioned observations as a distribution
/// over the next state: the output symbol of the observation is the state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawConditionalStateDistribution<C>")]
#[serde(bound(deserialize = "C: Deserialize<'de>"))]
pub struct ConditionalStateDistribution<C> {
    inner: C,
    states: usize,
}

#[derive(Deserialize)]
struct RawConditionalStateDistribution<C> {
    inner: C,
    states: usize,
}

impl<C> TryFrom<RawConditionalStateDistribution<C>> for ConditionalStateDistribution<C> {
    type Error = HmmError;
    fn try_from(raw: RawConditionalStateDistribution<C>) -> Result<Self> {
        Self::new(raw.inner, raw.states)
    }
}

impl<C> ConditionalStateDistribution<C> {
    pub fn new(inner: C, states: usize) -> Result<Self> {
        if states == 0 {
            return Err(HmmError::invalid("a state distribution needs a state"));
        }
        Ok(Self { inner, states })
    }
    pub fn inner(&self) -> &C {
        &self.inner
    }
    fn check_state(&self, state: usize) -> Result<usize> {
        if state < self.states {
            Ok(state)
        } else {
            Err(HmmError::invalid(format!(
                "state {} is out of the range 0..{}",
                state, self.states
            )))
        }
    }
}

impl<C> StateSpace for ConditionalStateDistribution<C> {
    fn state_count(&self) -> usize {
        self.states
    }
}

impl<O: Conditioned, C: Distribution<O>> StateDistribution<O> for ConditionalStateDistribution<C> {
    fn probability(&self, next: usize, observation: &O) -> f64 {
        self.inner.probability(&observation.with_output(next))
    }
    fn sample_state<R: Rng + ?Sized>(&self, context: Option<&O>, rng: &mut R) -> Result<usize> {
        let sampled = self.inner.sample(context, rng)?;
        self.check_state(sampled.output())
    }
    fn most_likely_state(&self, context: Option<&O>) -> Result<usize> {
        let mode = self.inner.mode(context)?;
        self.check_state(mode.output())
    }
    fn estimate(&mut self, expectations: &[Vec<f64>], observations: &[O]) -> Result<()> {
        check_expectations(expectations, self.states, Some(observations.len()))?;
        let (expanded, weights): (Vec<_>, Vec<_>) = observations
            .iter()
            .zip(expectations.iter())
            .flat_map(|(obs, row)| {
                row.iter()
                    .enumerate()
                    .map(move |(next, &w)| (obs.with_output(next), w))
            })
            .unzip();
        self.inner.estimate(&expanded, &weights)
    }
}

impl<C: std::fmt::Display> std::fmt::Display for ConditionalStateDistribution<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.inner)
    }
}

/// No conditional transitions. A placeholder for the `Conditional` variant of
/// [TransitionDistribution] when only the other two variants are used, so the
/// enum works with any observation type. It has no values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Unconditioned {}

impl StateSpace for Unconditioned {
    fn state_count(&self) -> usize {
        match *self {}
    }
}

impl<O> StateDistribution<O> for Unconditioned {
    fn probability(&self, _next: usize, _observation: &O) -> f64 {
        match *self {}
    }
    fn sample_state<R: Rng + ?Sized>(&self, _context: Option<&O>, _rng: &mut R) -> Result<usize> {
        match *self {}
    }
    fn most_likely_state(&self, _context: Option<&O>) -> Result<usize> {
        match *self {}
    }
    fn estimate(&mut self, _expectations: &[Vec<f64>], _observations: &[O]) -> Result<()> {
        match *self {}
    }
}

impl std::fmt::Display for Unconditioned {
    fn fmt(&self, _f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match *self {}
    }
}

/// The transition distributions a model can be built from.
/// `C` is the conditional variant, usually a [ConditionalStateDistribution].
/// With the default, the enum is usable with plain symbols such as `usize`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TransitionDistribution<C = Unconditioned> {
    Simple(SimpleStateDistribution),
    Table(SimpleStateDistributionTable),
    Conditional(C),
}

/// Transitions which may read the output of a conditioned observation.
pub type ConditionalTransitionDistribution<C = DiscreteDistributionTable> =
    TransitionDistribution<ConditionalStateDistribution<C>>;

impl<C: StateSpace> StateSpace for TransitionDistribution<C> {
    fn state_count(&self) -> usize {
        match self {
            Self::Simple(dist) => dist.state_count(),
            Self::Table(dist) => dist.state_count(),
            Self::Conditional(dist) => dist.state_count(),
        }
    }
}

impl<O, C> StateDistribution<O> for TransitionDistribution<C>
where
    O: Symbol,
    C: StateDistribution<O>,
{
    fn probability(&self, next: usize, observation: &O) -> f64 {
        match self {
            Self::Simple(dist) => StateDistribution::<O>::probability(dist, next, observation),
            Self::Table(dist) => dist.probability(next, observation),
            Self::Conditional(dist) => dist.probability(next, observation),
        }
    }
    fn sample_state<R: Rng + ?Sized>(&self, context: Option<&O>, rng: &mut R) -> Result<usize> {
        match self {
            Self::Simple(dist) => dist.sample_state(context, rng),
            Self::Table(dist) => dist.sample_state(context, rng),
            Self::Conditional(dist) => dist.sample_state(context, rng),
        }
    }
    fn most_likely_state(&self, context: Option<&O>) -> Result<usize> {
        match self {
            Self::Simple(dist) => dist.most_likely_state(context),
            Self::Table(dist) => dist.most_likely_state(context),
            Self::Conditional(dist) => dist.most_likely_state(context),
        }
    }
    fn estimate(&mut self, expectations: &[Vec<f64>], observations: &[O]) -> Result<()> {
        match self {
            Self::Simple(dist) => dist.estimate(expectations, observations),
            Self::Table(dist) => dist.estimate(expectations, observations),
            Self::Conditional(dist) => dist.estimate(expectations, observations),
        }
    }
}

impl<C> From<SimpleStateDistribution> for TransitionDistribution<C> {
    fn from(dist: SimpleStateDistribution) -> Self {
        Self::Simple(dist)
    }
}

impl<C> From<SimpleStateDistributionTable> for TransitionDistribution<C> {
    fn from(dist: SimpleStateDistributionTable) -> Self {
        Self::Table(dist)
    }
}

impl<C> From<ConditionalStateDistribution<C>> for ConditionalTransitionDistribution<C> {
    fn from(dist: ConditionalStateDistribution<C>) -> Self {
        Self::Conditional(dist)
    }
}

impl<C: std::fmt::Display> std::fmt::Display for TransitionDistribution<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Simple(dist) => write!(f, "{}", dist),
            Self::Table(dist) => write!(f, "{}", dist),
            Self::Conditional(dist) => write!(f, "{}", dist),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256StarStar;
    #[test]
    fn simple_estimate_sums_columns() {
        let mut dist = SimpleStateDistribution::uniform(2).unwrap();
        let expectations = vec![vec![0.5, 0.5], vec![1.0, 0.0], vec![0.5, 0.5]];
        StateDistribution::<usize>::estimate(&mut dist, &expectations, &[]).unwrap();
        assert!((dist.probabilities()[0] - 2.0 / 3.0).abs() < 1e-12);
    }
    #[test]
    fn shape_errors() {
        let mut dist = SimpleStateDistribution::uniform(2).unwrap();
        let ragged = vec![vec![0.5, 0.5], vec![1.0]];
        let result = StateDistribution::<usize>::estimate(&mut dist, &ragged, &[]);
        assert!(matches!(result, Err(HmmError::InvalidArgument(_))));
        let wide = vec![vec![0.2, 0.3, 0.5]];
        let result = StateDistribution::<usize>::estimate(&mut dist, &wide, &[]);
        assert!(matches!(result, Err(HmmError::Mismatch { .. })));
        let mut table = SimpleStateDistributionTable::new(vec![vec![0.5, 0.5]; 3]).unwrap();
        let result = table.estimate(&[vec![0.5, 0.5]], &[0usize, 1]);
        assert!(matches!(result, Err(HmmError::Mismatch { .. })));
        let result = table.estimate(&[vec![0.5, 0.5]], &[7usize]);
        assert!(matches!(result, Err(HmmError::InvalidArgument(_))));
    }
    #[test]
    fn table_reads_symbol() {
        let table = SimpleStateDistributionTable::new(vec![vec![0.9, 0.1], vec![0.3, 0.7]]).unwrap();
        assert_eq!(table.probability(1, &(0usize, 3usize)), 0.1);
        assert_eq!(table.probability(1, &1usize), 0.7);
        assert_eq!(table.most_likely_state(Some(&1usize)).unwrap(), 1);
        let mut rng: Xoshiro256StarStar = SeedableRng::seed_from_u64(8);
        assert!(table.sample_state(None::<&usize>, &mut rng).is_err());
    }
    #[test]
    fn table_estimate_by_symbol() {
        let mut table = SimpleStateDistributionTable::new(vec![vec![0.5, 0.5]; 2]).unwrap();
        let expectations = vec![vec![1.0, 0.0], vec![0.25, 0.75], vec![0.75, 0.25]];
        table.estimate(&expectations, &[0usize, 1, 1]).unwrap();
        assert_eq!(table.table().p(0, 0), 1.0);
        assert!((table.table().p(1, 0) - 0.5).abs() < 1e-12);
    }
    #[test]
    fn conditional_matches_table() {
        let probs = vec![vec![0.9, 0.1], vec![0.3, 0.7]];
        let table = SimpleStateDistributionTable::new(probs.clone()).unwrap();
        let inner = DiscreteDistributionTable::new(probs).unwrap();
        let cond = ConditionalStateDistribution::new(inner, 2).unwrap();
        for input in 0..2 {
            for next in 0..2 {
                let obs = (input, 1usize);
                assert_eq!(table.probability(next, &obs), cond.probability(next, &obs));
            }
        }
        let mut table: ConditionalTransitionDistribution = table.into();
        let mut cond: ConditionalTransitionDistribution = cond.into();
        let expectations = vec![vec![0.2, 0.8], vec![0.6, 0.4], vec![0.1, 0.9]];
        let obs = vec![(0usize, 0usize), (1, 1), (0, 1)];
        table.estimate(&expectations, &obs).unwrap();
        cond.estimate(&expectations, &obs).unwrap();
        for input in 0..2 {
            for next in 0..2 {
                let obs = (input, 0usize);
                let (p, q) = (table.probability(next, &obs), cond.probability(next, &obs));
                assert!((p - q).abs() < 1e-12, "{}\t{}", p, q);
            }
        }
    }
    #[test]
    fn rows_sum_to_one() {
        let mut rng: Xoshiro256StarStar = SeedableRng::seed_from_u64(9);
        let table = SimpleStateDistributionTable::random(4, 3, &mut rng).unwrap();
        let simple = SimpleStateDistribution::random(3, &mut rng).unwrap();
        for symbol in 0..4usize {
            let sum: f64 = (0..3).map(|j| table.probability(j, &symbol)).sum();
            assert!((sum - 1f64).abs() < 1e-9);
            let sum: f64 = (0..3).map(|j| simple.probability(j, &symbol)).sum();
            assert!((sum - 1f64).abs() < 1e-9);
        }
    }
    #[test]
    fn deserialize_checks_states() {
        let inner = DiscreteDistributionTable::uniform(2, 2).unwrap();
        let cond = ConditionalStateDistribution::new(inner, 2).unwrap();
        let json = serde_json::to_string(&cond).unwrap();
        let restored: ConditionalStateDistribution<DiscreteDistributionTable> =
            serde_json::from_str(&json).unwrap();
        assert_eq!(restored, cond);
        let json = json.replace(r#""states":2"#, r#""states":0"#);
        let result =
            serde_json::from_str::<ConditionalStateDistribution<DiscreteDistributionTable>>(&json);
        assert!(result.is_err());
    }
    #[test]
    fn plain_symbols_with_default_variants() {
        let simple: TransitionDistribution = SimpleStateDistribution::uniform(2).unwrap().into();
        assert_eq!(StateDistribution::<usize>::probability(&simple, 0, &0usize), 0.5);
        let mut table: TransitionDistribution =
            SimpleStateDistributionTable::new(vec![vec![0.9, 0.1], vec![0.3, 0.7]])
                .unwrap()
                .into();
        assert_eq!(table.probability(1, &1usize), 0.7);
        assert_eq!(table.most_likely_state(Some(&0u8)).unwrap(), 0);
        table
            .estimate(&[vec![0.0, 1.0], vec![1.0, 0.0]], &[0usize, 1])
            .unwrap();
        assert_eq!(table.probability(1, &0usize), 1.0);
        assert_eq!(table.state_count(), 2);
    }
}
