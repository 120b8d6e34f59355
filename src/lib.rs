//! Hidden Markov models with pluggable state and emission distributions.
//!
//! - [hmm::ForwardBackwardProbabilityCalculator]: scaled forward-backward, the likelihood of a sequence.
//! - [hmm::StateSequenceCalculator]: Viterbi decoding.
//! - [hmm::HiddenMarkovModelReestimator]: Baum-Welch training over a batch of sequences.
//!
//! ```
//! use hmmkit::dist::DiscreteDistribution;
//! use hmmkit::hmm::{ForwardBackwardProbabilityCalculator, HiddenMarkovModel};
//! use hmmkit::Sequence;
//! let emissions = vec![
//!     DiscreteDistribution::new(vec![0.2, 0.8]).unwrap(),
//!     DiscreteDistribution::new(vec![0.2, 0.8]).unwrap(),
//! ];
//! let transitions = vec![vec![0.2, 0.8], vec![0.9, 0.1]];
//! let model = HiddenMarkovModel::simple(&[0.1, 0.9], &transitions, emissions).unwrap();
//! let seq = Sequence::new(vec![1usize, 0]).unwrap();
//! let mut calc = ForwardBackwardProbabilityCalculator::new(&model, &seq);
//! assert!((calc.probability().unwrap() - 0.16).abs() < 1e-9);
//! ```
#[macro_use]
extern crate log;
pub mod dist;
pub mod dptable;
pub mod error;
pub mod gen_seq;
pub mod hmm;
pub mod sequence;
pub use error::{HmmError, Result};
pub use hmm::{HiddenMarkovModel, HiddenMarkovModelReestimator, Trainer};
pub use sequence::Sequence;
