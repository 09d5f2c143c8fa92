#[macro_use]
extern crate failure;

use std::process;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use failure::{err_msg, Error};
use tracing_subscriber::EnvFilter;

use cracker::config::{self, CrackConfig};
use cracker::errors::run_scenario;
use cracker::pipeline::{run_game, Cracker, GameSession, PredictionSink};
use cracker::PredictionResult;
use cracker::{Observation, ObservationSet, SearchRange, Strategy, TwistModel};
use oracle::{Challenge, GameClient, LineStream};

#[derive(Parser, Debug)]
#[command(version, about = "Recover an MT19937 seed and predict its future draws", long_about = None)]
struct Args {
    #[arg(short, long, value_enum, default_value_t = StrategyArg::BruteForce, global = true)]
    strategy: StrategyArg,
    /// How the constraint strategy models the first twist.
    #[arg(short, long, value_enum, default_value_t = ModelArg::FirstTwist, global = true)]
    model: ModelArg,
    /// Seed range `lo..hi` to search, in order. Repeat for a schedule.
    #[arg(short, long = "range", value_parser = parse_range, global = true)]
    ranges: Vec<SearchRange>,
    /// Also search seeds taken from the Unix time of the last SECS seconds, first.
    #[arg(long, value_name = "SECS", global = true)]
    recent: Option<u64>,
    #[arg(short, long, global = true)]
    workers: Option<usize>,
    #[arg(long, global = true)]
    chunk_size: Option<u64>,
    /// Give up searching after this many seconds.
    #[arg(short, long, value_name = "SECS", global = true)]
    timeout: Option<u64>,
    /// Draw index to predict.
    #[arg(long, default_value_t = oracle::TARGET_INDEX, global = true)]
    target: u32,
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Play the game against a remote server.
    Remote {
        host: String,
        port: u16,
        #[arg(long, num_args = 2, default_values_t = [0, 1])]
        indices: Vec<u32>,
    },
    /// Play the game against a local server with a hidden seed.
    Local {
        /// Fix the hidden seed instead of drawing one.
        #[arg(long)]
        seed: Option<u32>,
        #[arg(long, default_value_t = 1 << 20, value_parser = clap::value_parser!(u32).range(1..))]
        seed_bound: u32,
        #[arg(long, num_args = 2, default_values_t = [0, 1])]
        indices: Vec<u32>,
    },
    /// Crack observations given as `index:value`.
    Manual {
        #[arg(required = true, value_parser = parse_observation)]
        observations: Vec<Observation>,
    },
    /// Run the built-in scenarios, all of them or the given numbers.
    Selfcheck { scenarios: Vec<usize> },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum StrategyArg {
    BruteForce,
    Parallel,
    Constraint,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum ModelArg {
    FirstTwist,
    PreTwist,
}

fn parse_range(s: &str) -> Result<SearchRange, String> {
    s.parse::<SearchRange>().map_err(|e| e.to_string())
}

fn parse_observation(s: &str) -> Result<Observation, String> {
    let (index, value) = s
        .split_once(':')
        .ok_or_else(|| format!("expected index:value, got {:?}", s))?;
    let index = index.trim().parse::<u32>().map_err(|e| format!("bad index: {}", e))?;
    let value = value.trim().parse::<u32>().map_err(|e| format!("bad value: {}", e))?;
    Ok(Observation::new(index, value))
}

impl Args {
    fn config(&self) -> Result<CrackConfig, Error> {
        let model = match self.model {
            ModelArg::FirstTwist => TwistModel::FirstTwist,
            ModelArg::PreTwist => TwistModel::PreTwist,
        };
        let strategy = match self.strategy {
            StrategyArg::BruteForce => Strategy::BruteForce,
            StrategyArg::Parallel => config::parallel(self.workers, self.chunk_size),
            StrategyArg::Constraint => Strategy::Constraint(model),
        };
        let mut config = CrackConfig::default()
            .with_strategy(strategy)
            .with_timeout(self.timeout.map(Duration::from_secs))
            .with_target_index(self.target);
        if !self.ranges.is_empty() {
            config = config.with_ranges(self.ranges.clone());
        }
        if let Some(secs) = self.recent {
            let now = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs();
            config.prepend_range(SearchRange::around(now, secs, 0)?);
        }
        Ok(config)
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Prints the prediction instead of sending it anywhere.
struct Stdout;

impl PredictionSink for Stdout {
    fn submit(&mut self, prediction: &PredictionResult) -> Result<String, Error> {
        print_prediction(prediction);
        Ok(String::new())
    }
}

fn print_prediction(prediction: &PredictionResult) {
    println!("seed: {}", prediction.seed);
    println!("draw {}: {}", prediction.target_index, prediction.value);
}

fn play<T: oracle::Communicate>(cracker: &Cracker, client: GameClient<T>, indices: &[u32]) -> Result<(), Error> {
    let mut session = GameSession::new(client, [indices[0], indices[1]]);
    let (prediction, response) = run_game(cracker, &mut session)?;
    print_prediction(&prediction);
    println!("{}", response);
    Ok(())
}

fn selfcheck(requested: &[usize]) -> Result<(), Error> {
    let mut scenarios = Vec::<fn() -> Result<(), Error>>::new();
    cracker::scenarios::add_scenarios(&mut scenarios);
    let count = scenarios.len();
    assert!(count <= std::u8::MAX as usize);

    let indices: Vec<usize> = if requested.is_empty() {
        (1..=count).collect()
    } else {
        requested.to_vec()
    };
    let mut failed = 0;
    for i in indices {
        if i < 1 || i > count {
            bail!("scenario {} does not exist, expected a number between 1 and {}", i, count);
        }
        if !run_scenario(scenarios[i - 1], i as u8) {
            failed += 1;
        }
    }
    ensure!(failed == 0, "{} scenario(s) failed", failed);
    Ok(())
}

fn run(args: Args) -> Result<(), Error> {
    if let Command::Selfcheck { ref scenarios } = args.command {
        return selfcheck(scenarios);
    }

    let cracker = Cracker::new(args.config()?)?;
    match args.command {
        Command::Remote {
            ref host,
            port,
            ref indices,
        } => {
            let client = GameClient::new(LineStream::connect((host.as_str(), port))?)?;
            println!("{}", client.greeting());
            play(&cracker, client, indices)
        }
        Command::Local {
            seed,
            seed_bound,
            ref indices,
        } => {
            let challenge = match seed {
                Some(seed) => Challenge::new(seed, "flag{local}"),
                None => Challenge::with_random_seed(seed_bound, "flag{local}")?,
            };
            tracing::debug!(seed = challenge.seed(), "hidden seed");
            let (addr, server) = oracle::server::spawn_local(challenge)?;
            let client = GameClient::new(LineStream::connect(addr)?)?;
            play(&cracker, client, indices)?;
            let verdict = server
                .join()
                .map_err(|_| err_msg("game server panicked"))??;
            tracing::info!(?verdict, "local game finished");
            Ok(())
        }
        Command::Manual { ref observations } => {
            let mut observations = ObservationSet::new(observations.iter().cloned())?;
            cracker.run(&mut observations, &mut Stdout)?;
            Ok(())
        }
        Command::Selfcheck { .. } => Ok(()),
    }
}

fn main() {
    let args = Args::parse();
    init_logging(args.verbose);
    if let Err(e) = run(args) {
        eprintln!("error: {}", e);
        for cause in e.iter_causes() {
            eprintln!("{: <4}caused by: {}", "", cause);
        }
        process::exit(1);
    }
}
