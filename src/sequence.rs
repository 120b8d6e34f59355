//! Observation sequences and the small traits concrete distributions use
//! to read observations. The algorithms themselves never look inside an observation.
use crate::error::{HmmError, Result};
use serde::{Deserialize, Serialize};

/// An observation that can be read as a single discrete symbol.
pub trait Symbol: Clone {
    fn symbol(&self) -> usize;
    /// Fails when the symbol does not fit in the observation type.
    fn from_symbol(symbol: usize) -> Result<Self>;
}

impl Symbol for usize {
    fn symbol(&self) -> usize {
        *self
    }
    fn from_symbol(symbol: usize) -> Result<Self> {
        Ok(symbol)
    }
}

impl Symbol for u8 {
    fn symbol(&self) -> usize {
        *self as usize
    }
    fn from_symbol(symbol: usize) -> Result<Self> {
        u8::try_from(symbol)
            .map_err(|_| HmmError::invalid(format!("symbol {} does not fit in a byte", symbol)))
    }
}

/// (input, output). The input is the symbol.
impl Symbol for (usize, usize) {
    fn symbol(&self) -> usize {
        self.0
    }
    fn from_symbol(symbol: usize) -> Result<Self> {
        Ok((symbol, 0))
    }
}

/// An observation made of an input symbol, `symbol()`, and an output symbol.
/// Conditional tables model Pr{output|input}.
pub trait Conditioned: Symbol {
    fn output(&self) -> usize;
    /// The same input, with the output replaced.
    fn with_output(&self, output: usize) -> Self;
}

impl Conditioned for (usize, usize) {
    fn output(&self) -> usize {
        self.1
    }
    fn with_output(&self, output: usize) -> Self {
        (self.0, output)
    }
}

/// A fixed, non-empty sequence of observations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawSequence<O>")]
#[serde(bound(deserialize = "O: Deserialize<'de>"))]
pub struct Sequence<O> {
    observations: Vec<O>,
}

// Deserialized first, then checked by `Sequence::new`.
#[derive(Deserialize)]
struct RawSequence<O> {
    observations: Vec<O>,
}

impl<O> TryFrom<RawSequence<O>> for Sequence<O> {
    type Error = HmmError;
    fn try_from(raw: RawSequence<O>) -> Result<Self> {
        Self::new(raw.observations)
    }
}

#[allow(clippy::len_without_is_empty)]
impl<O> Sequence<O> {
    pub fn new(observations: Vec<O>) -> Result<Self> {
        if observations.is_empty() {
            return Err(HmmError::invalid("a sequence needs at least one observation"));
        }
        Ok(Self { observations })
    }
    /// Length of the sequence. Always at least one.
    pub fn len(&self) -> usize {
        self.observations.len()
    }
    pub fn get(&self, t: usize) -> Option<&O> {
        self.observations.get(t)
    }
    pub fn first(&self) -> &O {
        &self.observations[0]
    }
    pub fn as_slice(&self) -> &[O] {
        &self.observations
    }
    pub fn iter(&self) -> std::slice::Iter<'_, O> {
        self.observations.iter()
    }
    pub fn into_inner(self) -> Vec<O> {
        self.observations
    }
}

impl<O> std::ops::Index<usize> for Sequence<O> {
    type Output = O;
    fn index(&self, t: usize) -> &O {
        &self.observations[t]
    }
}

impl<O> TryFrom<Vec<O>> for Sequence<O> {
    type Error = HmmError;
    fn try_from(observations: Vec<O>) -> Result<Self> {
        Self::new(observations)
    }
}

impl<'a, O> IntoIterator for &'a Sequence<O> {
    type Item = &'a O;
    type IntoIter = std::slice::Iter<'a, O>;
    fn into_iter(self) -> Self::IntoIter {
        self.observations.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn empty_sequence_is_rejected() {
        let empty: Vec<usize> = vec![];
        assert!(matches!(
            Sequence::new(empty),
            Err(HmmError::InvalidArgument(_))
        ));
    }
    #[test]
    fn indexing() {
        let seq = Sequence::new(vec![3usize, 1, 4]).unwrap();
        assert_eq!(seq.len(), 3);
        assert_eq!(seq[1], 1);
        assert_eq!(*seq.first(), 3);
        assert_eq!(seq.get(3), None);
        assert_eq!(seq.iter().sum::<usize>(), 8);
    }
    #[test]
    fn conditioned_pairs() {
        let obs = (2usize, 3usize);
        assert_eq!(obs.symbol(), 2);
        assert_eq!(obs.output(), 3);
        assert_eq!(obs.with_output(1), (2, 1));
        assert_eq!(<(usize, usize)>::from_symbol(4).unwrap(), (4, 0));
    }
    #[test]
    fn byte_symbols() {
        assert_eq!(u8::from_symbol(255).unwrap(), 255);
        assert!(matches!(
            u8::from_symbol(256),
            Err(HmmError::InvalidArgument(_))
        ));
    }
    #[test]
    fn deserialize_checks_length() {
        let seq = Sequence::new(vec![0usize, 2, 1]).unwrap();
        let json = serde_json::to_string(&seq).unwrap();
        let restored: Sequence<usize> = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, seq);
        let empty = serde_json::from_str::<Sequence<usize>>(r#"{"observations":[]}"#);
        assert!(empty.is_err());
    }
}
