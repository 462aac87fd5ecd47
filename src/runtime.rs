use std::fmt;
use std::io::Write;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use tracing::{info, warn};

use crate::error::{QuizError, Result};
use crate::problem::ProblemSet;
use crate::quiz::{AnswerSource, QuizResult, QuizRunner, Scoreboard};

/// Time allowed for the whole quiz, not for each question.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TimeLimit {
    limit: Option<Duration>,
}

impl TimeLimit {
    pub fn unlimited() -> Self {
        Self { limit: None }
    }

    pub fn new(limit: Duration) -> Self {
        if limit.is_zero() {
            Self::unlimited()
        } else {
            Self { limit: Some(limit) }
        }
    }

    /// Zero seconds means no limit.
    pub fn from_secs(secs: u64) -> Self {
        Self::new(Duration::from_secs(secs))
    }

    pub fn duration(&self) -> Option<Duration> {
        self.limit
    }

    pub fn is_unlimited(&self) -> bool {
        self.limit.is_none()
    }

    pub fn as_secs(&self) -> u64 {
        self.limit.map_or(0, |d| d.as_secs())
    }
}

/// How a run ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunOutcome {
    Completed(QuizResult),
    /// The deadline fired first; carries the score at that instant.
    Expired(QuizResult),
}

impl RunOutcome {
    pub fn result(&self) -> QuizResult {
        match self {
            RunOutcome::Completed(r) | RunOutcome::Expired(r) => *r,
        }
    }

    pub fn is_expired(&self) -> bool {
        matches!(self, RunOutcome::Expired(_))
    }
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunOutcome::Completed(r) => write!(
                f,
                "Quiz complete! You answered {} out of {} questions correctly.",
                r.correct, r.total
            ),
            RunOutcome::Expired(r) => write!(
                f,
                "Time's up! You answered {} out of {} questions correctly.\nExiting the quiz.",
                r.correct, r.total
            ),
        }
    }
}

/// Runs the quiz against `limit`.
///
/// Without a limit the quiz runs on the calling thread. With one, it moves to
/// a worker thread and the caller waits for whichever comes first. On expiry
/// the worker is left blocked on input; its scoreboard is closed so nothing
/// it reads later is counted.
pub fn run_quiz<S, W>(
    mut runner: QuizRunner<S, W>,
    problems: ProblemSet,
    limit: TimeLimit,
) -> Result<RunOutcome>
where
    S: AnswerSource + Send + 'static,
    W: Write + Send + 'static,
{
    let board = Scoreboard::new(problems.len());

    let Some(deadline) = limit.duration() else {
        return runner.run_with(&problems, &board).map(RunOutcome::Completed);
    };

    let (tx, rx) = mpsc::channel();
    let worker_board = board.clone();
    thread::spawn(move || {
        let result = runner.run_with(&problems, &worker_board);
        // the receiver is gone once the deadline has fired
        let _ = tx.send(result);
    });

    match rx.recv_timeout(deadline) {
        Ok(result) => result.map(RunOutcome::Completed),
        Err(RecvTimeoutError::Timeout) => {
            let score = board.close();
            info!(
                secs = deadline.as_secs_f64(),
                correct = score.correct,
                answered = score.answered,
                "time limit reached"
            );
            Ok(RunOutcome::Expired(score))
        }
        Err(RecvTimeoutError::Disconnected) => {
            warn!("quiz worker exited without a result");
            Err(QuizError::WorkerLost)
        }
    }
}
