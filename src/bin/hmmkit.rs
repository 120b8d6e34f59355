use clap::{App, Arg, ArgMatches, SubCommand};
use hmmkit::dist::{
    DiscreteDistribution, DiscreteDistributionTable, FixedDistribution, MixtureDistribution,
};
use hmmkit::hmm::{
    ForwardBackwardProbabilityCalculator, HiddenMarkovModel, HiddenMarkovModelReestimator,
    SimpleStateDistributionTable, StateSequenceCalculator, Trainer,
};
use hmmkit::{gen_seq, Sequence};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256StarStar;
#[macro_use]
extern crate log;

type BoxResult<T> = std::result::Result<T, Box<dyn std::error::Error>>;

fn with_common_args(app: App<'static, 'static>) -> App<'static, 'static> {
    app.version("0.1")
        .arg(
            Arg::with_name("verbose")
                .short("v")
                .multiple(true)
                .help("Debug mode"),
        )
        .arg(
            Arg::with_name("seed")
                .long("seed")
                .takes_value(true)
                .default_value("32389")
                .help("Seed"),
        )
        .arg(
            Arg::with_name("iterations")
                .long("iterations")
                .takes_value(true)
                .default_value("200")
                .help("Maximum number of EM steps."),
        )
        .arg(
            Arg::with_name("threshold")
                .long("threshold")
                .takes_value(true)
                .default_value("0.00001")
                .help("Stop when the log-likelihood moves less than this."),
        )
        .arg(
            Arg::with_name("length")
                .long("length")
                .short("l")
                .takes_value(true)
                .default_value("1000")
                .help("Length of the sampled sequences."),
        )
        .arg(
            Arg::with_name("threads")
                .long("threads")
                .short("t")
                .takes_value(true)
                .default_value("1")
                .help("Number of threads"),
        )
}

fn subcommand_coin() -> App<'static, 'static> {
    let app = SubCommand::with_name("coin")
        .about("Sample from a two-state coin model, then learn it back from a random model.")
        .arg(
            Arg::with_name("sequences")
                .long("sequences")
                .takes_value(true)
                .default_value("5")
                .help("Number of sampled sequences."),
        );
    with_common_args(app)
}

fn subcommand_random_coin() -> App<'static, 'static> {
    let app = SubCommand::with_name("random-coin")
        .about("Fit a random two-state model to i.i.d. coin flips.")
        .arg(
            Arg::with_name("probability")
                .long("probability")
                .short("p")
                .takes_value(true)
                .default_value("0.3")
                .help("Probability of heads."),
        );
    with_common_args(app)
}

fn subcommand_wumpus() -> App<'static, 'static> {
    let app = SubCommand::with_name("wumpus")
        .about("Input/output model: smells in, moves out.");
    with_common_args(app)
}

fn subcommand_monster() -> App<'static, 'static> {
    let app = SubCommand::with_name("monster")
        .about("Mixture of fixed behaviours with long term dependencies.")
        .arg(
            Arg::with_name("sequences")
                .long("sequences")
                .takes_value(true)
                .default_value("5")
                .help("Number of sampled sequences."),
        );
    with_common_args(app)
}

#[derive(Debug, Clone, Copy)]
struct Config {
    seed: u64,
    iterations: usize,
    threshold: f64,
    length: usize,
}

impl Config {
    fn new(matches: &ArgMatches) -> BoxResult<Self> {
        let seed = value_of(matches, "seed")?;
        let iterations = value_of(matches, "iterations")?;
        let threshold = value_of(matches, "threshold")?;
        let length = value_of(matches, "length")?;
        Ok(Self {
            seed,
            iterations,
            threshold,
            length,
        })
    }
}

fn value_of<T>(matches: &ArgMatches, name: &str) -> BoxResult<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + 'static,
{
    let value = matches
        .value_of(name)
        .ok_or_else(|| format!("--{} is missing", name))?;
    Ok(value.parse()?)
}

/// The number of sequences to sample. At least one.
fn sequence_count(matches: &ArgMatches) -> BoxResult<usize> {
    let count = sequence_count(matches)?;
    if count == 0 {
        return Err("--sequences should be at least 1".into());
    }
    Ok(count)
}

/// Call `train` until the log-likelihood settles. Returns the last one.
fn converge<T: Trainer>(trainer: &mut T, config: &Config) -> BoxResult<f64> {
    let mut last = trainer.train()?;
    for i in 1..config.iterations {
        let lk = trainer.train()?;
        info!("EM\t{}\t{:.6}", i, lk);
        if (lk - last).abs() < config.threshold {
            debug!("Converged at {}", i);
            return Ok(lk);
        }
        last = lk;
    }
    Ok(last)
}

fn coin(matches: &ArgMatches) -> BoxResult<()> {
    let config = Config::new(matches)?;
    let count = sequence_count(matches)?;
    let mut rng: Xoshiro256StarStar = SeedableRng::seed_from_u64(config.seed);
    let emissions = vec![
        DiscreteDistribution::new(vec![0.9, 0.1])?,
        DiscreteDistribution::new(vec![0.2, 0.8])?,
    ];
    let transitions = vec![vec![0.95, 0.05], vec![0.1, 0.9]];
    let truth = HiddenMarkovModel::simple(&[0.5, 0.5], &transitions, emissions)?;
    println!("{}\n", truth);
    let mut sequences = vec![];
    for _ in 0..count {
        let (_, seq) = gen_seq::sample_sequence::<_, _, usize, _>(&truth, config.length, &mut rng)?;
        sequences.push(seq);
    }
    let first = sequences.first().ok_or("no sequence was sampled")?;
    let lk = ForwardBackwardProbabilityCalculator::new(&truth, first).log_probability()?;
    println!("Log probability of first sequence:\n{}\n", lk);
    let emissions = vec![
        DiscreteDistribution::random(2, &mut rng)?,
        DiscreteDistribution::random(2, &mut rng)?,
    ];
    let model = HiddenMarkovModel::random_simple(emissions, &mut rng)?;
    let mut bw = HiddenMarkovModelReestimator::new(model, sequences)?;
    let lk = converge(&mut bw, &config)?;
    println!("{}\n", bw.model());
    println!("Average log probability:\n{}", lk);
    Ok(())
}

fn random_coin(matches: &ArgMatches) -> BoxResult<()> {
    let config = Config::new(matches)?;
    let p: f64 = value_of(matches, "probability")?;
    if !(0f64..=1f64).contains(&p) {
        return Err(format!("{} is not a probability", p).into());
    }
    let mut rng: Xoshiro256StarStar = SeedableRng::seed_from_u64(config.seed);
    let coins = gen_seq::bernoulli(config.length, p, &mut rng);
    let heads = coins.iter().sum::<usize>() as f64 / coins.len().max(1) as f64;
    println!("Frequency of heads:\n{:.4}\n", heads);
    let emissions = vec![
        DiscreteDistribution::random(2, &mut rng)?,
        DiscreteDistribution::random(2, &mut rng)?,
    ];
    let model = HiddenMarkovModel::random_simple(emissions, &mut rng)?;
    println!("{}\n", model);
    let mut bw = HiddenMarkovModelReestimator::new(model, vec![Sequence::new(coins)?])?;
    let lk = converge(&mut bw, &config)?;
    println!("{}\n", bw.model());
    println!("Log probability:\n{}", lk);
    Ok(())
}

// Inputs.
const SMELL_LEFT: usize = 0;
const SMELL_RIGHT: usize = 1;
const SMELL_UP: usize = 2;
const SMELL_DOWN: usize = 3;
const NO_SMELL: usize = 4;
// Outputs.
const MOVE_LEFT: usize = 0;
const MOVE_RIGHT: usize = 1;
const MOVE_UP: usize = 2;
const MOVE_DOWN: usize = 3;

fn wumpus(matches: &ArgMatches) -> BoxResult<()> {
    let config = Config::new(matches)?;
    let (states, inputs, outputs) = (2, 5, 4);
    let mut rng: Xoshiro256StarStar = SeedableRng::seed_from_u64(config.seed);
    let emissions = (0..states)
        .map(|_| DiscreteDistributionTable::random(inputs, outputs, &mut rng))
        .collect::<hmmkit::Result<Vec<_>>>()?;
    let transitions = (0..states)
        .map(|_| SimpleStateDistributionTable::random(inputs, states, &mut rng))
        .collect::<hmmkit::Result<Vec<_>>>()?;
    let initial = SimpleStateDistributionTable::random(inputs, states, &mut rng)?;
    let model = HiddenMarkovModel::new(initial, transitions, emissions)?;
    println!("{}\n", model);
    let seq = Sequence::new(vec![
        (NO_SMELL, MOVE_UP),
        (SMELL_LEFT, MOVE_RIGHT),
        (SMELL_RIGHT, MOVE_LEFT),
        (SMELL_UP, MOVE_DOWN),
        (SMELL_DOWN, MOVE_UP),
    ])?;
    println!("Observation Sequence:\n{:?}\n", seq.as_slice());
    let lk = ForwardBackwardProbabilityCalculator::new(&model, &seq).log_probability()?;
    println!("Log probability:\n{}\n", lk);
    let path = StateSequenceCalculator::new(&model, &seq)
        .state_sequence()
        .to_vec();
    println!("Most likely state sequence:\n{:?}\n", path);
    let mut bw = HiddenMarkovModelReestimator::new(model, vec![seq])?;
    converge(&mut bw, &config)?;
    let model = bw.into_model();
    println!("{}\n", model);
    let seq = Sequence::new(vec![
        (NO_SMELL, MOVE_UP),
        (SMELL_LEFT, MOVE_RIGHT),
        (SMELL_RIGHT, MOVE_LEFT),
        (SMELL_UP, MOVE_DOWN),
        (SMELL_DOWN, MOVE_UP),
    ])?;
    let lk = ForwardBackwardProbabilityCalculator::new(&model, &seq).log_probability()?;
    println!("Log probability:\n{}", lk);
    Ok(())
}

// Inputs.
const SMELL_DAY: usize = 0;
const NO_SMELL_DAY: usize = 1;
const SMELL_NIGHT: usize = 2;
const NO_SMELL_NIGHT: usize = 3;
// Outputs.
const RUN_AWAY: usize = 0;
const RUN_TOWARDS: usize = 1;
const STAY_STILL: usize = 2;
const SLEEP: usize = 3;

/// A monster runs towards what it smells when it is hungry, and away from it otherwise.
/// It eats whenever the smell goes away. Without smell, it stays still by day and sleeps by night.
fn monster_sequence<R: Rng>(len: usize, rng: &mut R) -> Vec<(usize, usize)> {
    let mut smell = rng.gen_bool(0.5);
    let mut day = rng.gen_bool(0.5);
    let mut hungry = true;
    let mut smell_change: f64 = rng.gen();
    let mut day_change: f64 = rng.gen();
    let mut sequence = Vec::with_capacity(len);
    for _ in 0..len {
        let obs = match (smell, day) {
            (true, true) => (SMELL_DAY, if hungry { RUN_TOWARDS } else { RUN_AWAY }),
            (true, false) => (SMELL_NIGHT, if hungry { RUN_TOWARDS } else { RUN_AWAY }),
            (false, true) => (NO_SMELL_DAY, STAY_STILL),
            (false, false) => (NO_SMELL_NIGHT, SLEEP),
        };
        sequence.push(obs);
        if rng.gen::<f64>() < smell_change {
            smell_change = rng.gen();
            if smell {
                hungry = !hungry;
            }
            smell = !smell;
        }
        if rng.gen::<f64>() < day_change {
            day_change = rng.gen();
            day = !day;
        }
    }
    sequence
}

fn monster(matches: &ArgMatches) -> BoxResult<()> {
    let config = Config::new(matches)?;
    let count = sequence_count(matches)?;
    let (states, inputs) = (4, 4);
    let mut rng: Xoshiro256StarStar = SeedableRng::seed_from_u64(config.seed);
    let run_away = vec![vec![1.0, 0.0, 0.0, 0.0]; inputs];
    let run_towards = vec![vec![0.0, 1.0, 0.0, 0.0]; inputs];
    let mut sedentary = vec![vec![0.0, 0.0, 1.0, 0.0]; 2];
    sedentary.extend(vec![vec![0.0, 0.0, 0.0, 1.0]; 2]);
    let knowledge = vec![run_away, run_towards, sedentary]
        .into_iter()
        .map(|table| DiscreteDistributionTable::new(table).map(FixedDistribution::new))
        .collect::<hmmkit::Result<Vec<_>>>()?;
    let emissions = (0..states)
        .map(|_| {
            let weights = DiscreteDistribution::random(knowledge.len(), &mut rng)?;
            MixtureDistribution::new(knowledge.clone(), weights)
        })
        .collect::<hmmkit::Result<Vec<_>>>()?;
    let transitions = (0..states)
        .map(|_| SimpleStateDistributionTable::random(inputs, states, &mut rng))
        .collect::<hmmkit::Result<Vec<_>>>()?;
    let initial = SimpleStateDistributionTable::random(inputs, states, &mut rng)?;
    let model = HiddenMarkovModel::new(initial, transitions, emissions)?;
    let sequences = (0..count)
        .map(|_| Sequence::new(monster_sequence(config.length, &mut rng)))
        .collect::<hmmkit::Result<Vec<_>>>()?;
    let mut bw = HiddenMarkovModelReestimator::new(model, sequences)?;
    converge(&mut bw, &config)?;
    println!("{}\n", bw.model());
    println!("Log probabilities of sequences:");
    let mut explained = 0;
    for seq in bw.sequences() {
        let lk = ForwardBackwardProbabilityCalculator::new(bw.model(), seq).log_probability()?;
        println!("{}", lk);
        if -0.01 <= lk {
            explained += 1;
        }
    }
    println!("{} / {} sequences fully explained", explained, bw.sequences().len());
    Ok(())
}

fn main() -> BoxResult<()> {
    let matches = App::new("hmmkit")
        .version("0.1")
        .about("Hidden Markov model demos: sampling, decoding, and Baum-Welch training.")
        .setting(clap::AppSettings::ArgRequiredElseHelp)
        .subcommand(subcommand_coin())
        .subcommand(subcommand_random_coin())
        .subcommand(subcommand_wumpus())
        .subcommand(subcommand_monster())
        .get_matches();
    if let Some(sub_m) = matches.subcommand().1 {
        let level = match sub_m.occurrences_of("verbose") {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        };
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
        let threads: usize = value_of(sub_m, "threads")?;
        if let Err(why) = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
        {
            debug!("{:?} The global pool is already set.", why);
        }
    }
    debug!("Start");
    match matches.subcommand() {
        ("coin", Some(sub_m)) => coin(sub_m),
        ("random-coin", Some(sub_m)) => random_coin(sub_m),
        ("wumpus", Some(sub_m)) => wumpus(sub_m),
        ("monster", Some(sub_m)) => monster(sub_m),
        _ => unreachable!(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn sequence_count_is_positive() {
        let app = App::new("test").subcommand(subcommand_coin());
        let matches = app.get_matches_from(vec!["test", "coin", "--sequences", "0"]);
        let coin_matches = matches.subcommand_matches("coin").unwrap();
        assert!(sequence_count(coin_matches).is_err());
        assert!(coin(coin_matches).is_err());
        let app = App::new("test").subcommand(subcommand_monster());
        let matches = app.get_matches_from(vec!["test", "monster", "--sequences", "3"]);
        let monster_matches = matches.subcommand_matches("monster").unwrap();
        assert_eq!(sequence_count(monster_matches).unwrap(), 3);
    }
}
