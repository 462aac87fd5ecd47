// Library surface for the binary and for headless tests.
pub mod config;
pub mod error;
pub mod problem;
pub mod quiz;
pub mod runtime;

pub use config::Config;
pub use error::{QuizError, Result};
pub use problem::{load, Problem, ProblemSet};
pub use quiz::{InvalidAnswerPolicy, QuizResult, QuizRunner};
pub use runtime::{run_quiz, RunOutcome, TimeLimit};
