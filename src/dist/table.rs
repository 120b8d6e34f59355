use super::{check_weights, DiscreteDistribution, Distribution};
use crate::error::{HmmError, Result};
use crate::sequence::Conditioned;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// A look-up table of conditional probabilities Pr{output|input}
/// for a single discrete input and a single discrete output.
/// Each row is a `DiscreteDistribution` with its own prior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawDiscreteDistributionTable")]
pub struct DiscreteDistributionTable {
    rows: Vec<DiscreteDistribution>,
}

#[derive(Deserialize)]
struct RawDiscreteDistributionTable {
    rows: Vec<DiscreteDistribution>,
}

impl TryFrom<RawDiscreteDistributionTable> for DiscreteDistributionTable {
    type Error = HmmError;
    fn try_from(raw: RawDiscreteDistributionTable) -> Result<Self> {
        Self::from_distributions(raw.rows)
    }
}

impl DiscreteDistributionTable {
    /// `probabilities[input][output]`.
    pub fn new(probabilities: Vec<Vec<f64>>) -> Result<Self> {
        let rows = probabilities
            .into_iter()
            .map(DiscreteDistribution::new)
            .collect::<Result<Vec<_>>>()?;
        Self::from_distributions(rows)
    }
    pub fn from_distributions(rows: Vec<DiscreteDistribution>) -> Result<Self> {
        let output_range = match rows.first() {
            Some(row) => row.range(),
            None => return Err(HmmError::invalid("a table needs at least one input")),
        };
        if let Some(row) = rows.iter().find(|row| row.range() != output_range) {
            return Err(HmmError::invalid(format!(
                "ragged table: rows of {} and {} outputs",
                output_range,
                row.range()
            )));
        }
        Ok(Self { rows })
    }
    pub fn uniform(input_range: usize, output_range: usize) -> Result<Self> {
        let rows = (0..input_range)
            .map(|_| DiscreteDistribution::uniform(output_range))
            .collect::<Result<Vec<_>>>()?;
        Self::from_distributions(rows)
    }
    pub fn random<R: Rng + ?Sized>(
        input_range: usize,
        output_range: usize,
        rng: &mut R,
    ) -> Result<Self> {
        let rows = (0..input_range)
            .map(|_| DiscreteDistribution::random(output_range, rng))
            .collect::<Result<Vec<_>>>()?;
        Self::from_distributions(rows)
    }
    /// Set the same pseudo-count on every row.
    pub fn with_pseudo_count(self, m: f64) -> Result<Self> {
        let rows = self
            .rows
            .into_iter()
            .map(|row| row.with_pseudo_count(m))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { rows })
    }
    pub fn input_range(&self) -> usize {
        self.rows.len()
    }
    pub fn output_range(&self) -> usize {
        self.rows[0].range()
    }
    pub fn distributions(&self) -> &[DiscreteDistribution] {
        &self.rows
    }
    pub fn distribution_for(&self, input: usize) -> Option<&DiscreteDistribution> {
        self.rows.get(input)
    }
    /// Pr{output|input}, zero when either is out of range.
    pub fn p(&self, input: usize, output: usize) -> f64 {
        self.rows.get(input).map(|row| row.p(output)).unwrap_or(0f64)
    }
    pub fn probability_matrix(&self) -> Vec<Vec<f64>> {
        self.rows
            .iter()
            .map(|row| row.probabilities().to_vec())
            .collect()
    }
    fn row_for(&self, input: usize) -> Result<&DiscreteDistribution> {
        self.rows.get(input).ok_or_else(|| {
            HmmError::invalid(format!(
                "input {} is out of the range 0..{}",
                input,
                self.input_range()
            ))
        })
    }
    /// Refit every row from `counts[input][output]`.
    pub(crate) fn reestimate(&mut self, counts: &[Vec<f64>]) {
        self.rows
            .iter_mut()
            .zip(counts.iter())
            .for_each(|(row, counts)| row.reestimate(counts));
    }
    /// Empty count matrix shaped like this table.
    pub(crate) fn zero_counts(&self) -> Vec<Vec<f64>> {
        vec![vec![0f64; self.output_range()]; self.input_range()]
    }
}

impl<O: Conditioned> Distribution<O> for DiscreteDistributionTable {
    fn probability(&self, observation: &O) -> f64 {
        self.p(observation.symbol(), observation.output())
    }
    fn sample<R: Rng + ?Sized>(&self, context: Option<&O>, rng: &mut R) -> Result<O> {
        let context =
            context.ok_or_else(|| HmmError::invalid("a conditional table needs its input"))?;
        let output = self.row_for(context.symbol())?.sample_index(rng)?;
        Ok(context.with_output(output))
    }
    fn mode(&self, context: Option<&O>) -> Result<O> {
        let context =
            context.ok_or_else(|| HmmError::invalid("a conditional table needs its input"))?;
        let output = self.row_for(context.symbol())?.mode_index();
        Ok(context.with_output(output))
    }
    fn estimate(&mut self, observations: &[O], weights: &[f64]) -> Result<()> {
        check_weights(observations, weights)?;
        let mut counts = self.zero_counts();
        for (obs, w) in observations.iter().zip(weights.iter()) {
            let (input, output) = (obs.symbol(), obs.output());
            match counts.get_mut(input).and_then(|row| row.get_mut(output)) {
                Some(count) => *count += w,
                None => {
                    return Err(HmmError::invalid(format!(
                        "({}, {}) is out of the {}x{} table",
                        input,
                        output,
                        self.input_range(),
                        self.output_range()
                    )))
                }
            }
        }
        self.reestimate(&counts);
        Ok(())
    }
}

impl std::fmt::Display for DiscreteDistributionTable {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let rows: Vec<_> = self.rows.iter().map(|row| format!("{}", row)).collect();
        write!(f, "{}", rows.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256StarStar;
    fn table() -> DiscreteDistributionTable {
        DiscreteDistributionTable::new(vec![vec![0.9, 0.1], vec![0.25, 0.75]]).unwrap()
    }
    #[test]
    fn lookup() {
        let table = table();
        assert_eq!(table.p(1, 1), 0.75);
        assert_eq!(table.probability(&(0usize, 1usize)), 0.1);
        assert_eq!(table.p(2, 0), 0.0);
        assert_eq!((table.input_range(), table.output_range()), (2, 2));
    }
    #[test]
    fn ragged_table_is_rejected() {
        let ragged = DiscreteDistributionTable::new(vec![vec![1.0], vec![0.5, 0.5]]);
        assert!(matches!(ragged, Err(HmmError::InvalidArgument(_))));
        assert!(DiscreteDistributionTable::new(vec![]).is_err());
    }
    #[test]
    fn sample_needs_context() {
        let mut rng: Xoshiro256StarStar = SeedableRng::seed_from_u64(1);
        let table = table();
        let draw: Result<(usize, usize)> = table.sample(None, &mut rng);
        assert!(draw.is_err());
        let draw = table.sample(Some(&(1usize, 0usize)), &mut rng).unwrap();
        assert_eq!(draw.0, 1);
        assert_eq!(table.mode(Some(&(1usize, 0usize))).unwrap(), (1, 1));
    }
    #[test]
    fn estimate_row_wise() {
        let mut table = DiscreteDistributionTable::uniform(2, 3).unwrap();
        let obs = vec![(0usize, 2usize), (0, 2), (0, 1), (1, 0)];
        table.estimate(&obs, &[1.0, 1.0, 2.0, 0.5]).unwrap();
        assert_eq!(table.probability_matrix()[0], vec![0.0, 0.5, 0.5]);
        assert_eq!(table.probability_matrix()[1], vec![1.0, 0.0, 0.0]);
        assert!(table.estimate(&[(2usize, 0usize)], &[1.0]).is_err());
    }
    #[test]
    fn estimate_uses_each_rows_prior() {
        let mut table = DiscreteDistributionTable::uniform(2, 2)
            .unwrap()
            .with_pseudo_count(2.0)
            .unwrap();
        table.estimate(&[(0usize, 0usize)], &[2.0]).unwrap();
        assert!((table.p(0, 0) - 0.75).abs() < 1e-12);
        // No data on input 1: only the prior is left.
        assert!((table.p(1, 0) - 0.5).abs() < 1e-12);
    }
    #[test]
    fn deserialize_checks_rows() {
        let table = table();
        let json = serde_json::to_string(&table).unwrap();
        let restored: DiscreteDistributionTable = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, table);
        let empty = serde_json::from_str::<DiscreteDistributionTable>(r#"{"rows":[]}"#);
        assert!(empty.is_err());
        let a = serde_json::to_string(&DiscreteDistribution::uniform(2).unwrap()).unwrap();
        let b = serde_json::to_string(&DiscreteDistribution::uniform(3).unwrap()).unwrap();
        let ragged = format!(r#"{{"rows":[{},{}]}}"#, a, b);
        assert!(serde_json::from_str::<DiscreteDistributionTable>(&ragged).is_err());
    }
}
