use clap::Parser;
use crossterm::tty::IsTty;
use mathquiz::{
    config::{DEFAULT_QUESTION_FILE, DEFAULT_TIME_LIMIT_SECS},
    error::EXIT_OK,
    quiz::LineSource,
    Config, InvalidAnswerPolicy, QuizError, QuizRunner, TimeLimit,
};
use rand::{rngs::StdRng, SeedableRng};
use std::{io, path::PathBuf, process::ExitCode};
use tracing_subscriber::EnvFilter;

/// timed arithmetic quiz for the terminal
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Asks the questions from a csv file (question,answer per row) one at a time, checks each typed answer and reports the final score. An optional time limit covers the whole quiz."
)]
pub struct Cli {
    /// csv file with `question,answer` rows
    #[clap(short = 'f', long = "file", default_value = DEFAULT_QUESTION_FILE)]
    file: PathBuf,

    /// ask the questions in random order
    #[clap(short = 's', long)]
    shuffle: bool,

    /// time limit for the whole quiz in seconds, 0 for no limit
    #[clap(short = 't', long = "time", default_value_t = DEFAULT_TIME_LIMIT_SECS)]
    time_limit_secs: u64,

    /// what to do when an answer is not a whole number
    #[clap(long, value_enum, default_value_t = InvalidAnswerPolicy::Abort)]
    on_invalid: InvalidAnswerPolicy,

    /// seed for --shuffle, for a reproducible order
    #[clap(long)]
    seed: Option<u64>,
}

impl Cli {
    fn to_config(&self) -> Config {
        Config {
            file_path: self.file.clone(),
            shuffle: self.shuffle,
            time_limit: TimeLimit::from_secs(self.time_limit_secs),
            on_invalid: self.on_invalid,
            seed: self.seed,
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("mathquiz=warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let code = match run(&cli) {
        Ok(()) => EXIT_OK,
        Err(err) => {
            eprintln!("Error: {err}");
            err.exit_code()
        }
    };
    ExitCode::from(code as u8)
}

fn run(cli: &Cli) -> Result<(), QuizError> {
    let config = cli.to_config();

    println!("Welcome to Math Quiz!");
    println!("Loading questions from: {}", config.file_path.display());
    let problems = load_problems(&config)?;

    if let Some(limit) = config.time_limit.duration() {
        println!(
            "You have {} seconds to finish the whole quiz.",
            limit.as_secs()
        );
    }

    let stdout = io::stdout();
    let styled = stdout.is_tty();
    let runner = QuizRunner::new(LineSource::stdin(), stdout)
        .with_policy(config.on_invalid)
        .styled(styled);

    let outcome = mathquiz::run_quiz(runner, problems, config.time_limit)?;
    println!("{outcome}");
    Ok(())
}

fn load_problems(config: &Config) -> Result<mathquiz::ProblemSet, QuizError> {
    match config.seed {
        Some(seed) => mathquiz::load(config, &mut StdRng::seed_from_u64(seed)),
        None => mathquiz::load(config, &mut rand::thread_rng()),
    }
}
