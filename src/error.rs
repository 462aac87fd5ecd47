//! Error type shared by the loader, the runner and the binary.
//!
//! Every variant is fatal to the run it occurs in. The binary turns them into
//! distinct process exit codes via [`QuizError::exit_code`].

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Exit code for a run that finished, whether by completion or by the time limit.
pub const EXIT_OK: i32 = 0;
/// Run aborted while answering.
pub const EXIT_ABORTED: i32 = 1;
/// Question bank is malformed (sysexits `EX_DATAERR`).
pub const EXIT_DATA: i32 = 65;
/// Question bank could not be opened (sysexits `EX_NOINPUT`).
pub const EXIT_NO_INPUT: i32 = 66;
/// Terminal read or write failed (sysexits `EX_IOERR`).
pub const EXIT_IO: i32 = 74;

#[derive(Debug, Error)]
pub enum QuizError {
    /// The question file could not be opened or read.
    #[error("failed to open question file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The file is not well-formed comma-separated text.
    #[error("failed to parse question file: {0}")]
    Parse(#[from] csv::Error),

    /// A row does not describe a usable problem.
    #[error("malformed problem on line {line}: {reason}")]
    Format { line: u64, reason: String },

    /// Either the typed answer or the stored answer is not an integer.
    #[error("answer {input:?} is not a whole number")]
    InvalidAnswerFormat { input: String },

    #[error("input closed before the quiz finished")]
    InputClosed,

    #[error("terminal I/O failed: {0}")]
    Terminal(#[source] io::Error),

    #[error("quiz worker stopped without reporting a result")]
    WorkerLost,
}

impl QuizError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            QuizError::Io { .. } => EXIT_NO_INPUT,
            QuizError::Parse(_) | QuizError::Format { .. } => EXIT_DATA,
            QuizError::Terminal(_) => EXIT_IO,
            QuizError::InvalidAnswerFormat { .. }
            | QuizError::InputClosed
            | QuizError::WorkerLost => EXIT_ABORTED,
        }
    }
}

pub type Result<T> = std::result::Result<T, QuizError>;
