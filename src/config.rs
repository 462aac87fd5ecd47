use crate::quiz::InvalidAnswerPolicy;
use crate::runtime::TimeLimit;
use std::path::PathBuf;

pub const DEFAULT_QUESTION_FILE: &str = "./assets/default-questions.csv";
pub const DEFAULT_TIME_LIMIT_SECS: u64 = 30;

/// Settings for one run, built once from the command line.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub file_path: PathBuf,
    pub shuffle: bool,
    pub time_limit: TimeLimit,
    pub on_invalid: InvalidAnswerPolicy,
    /// Seed for the shuffle; `None` draws from OS entropy.
    pub seed: Option<u64>,
}

impl Config {
    pub fn new<P: Into<PathBuf>>(file_path: P) -> Self {
        Self {
            file_path: file_path.into(),
            ..Self::default()
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            file_path: PathBuf::from(DEFAULT_QUESTION_FILE),
            shuffle: false,
            time_limit: TimeLimit::from_secs(DEFAULT_TIME_LIMIT_SECS),
            on_invalid: InvalidAnswerPolicy::Abort,
            seed: None,
        }
    }
}
