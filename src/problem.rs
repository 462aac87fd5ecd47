use crate::config::Config;
use crate::error::{QuizError, Result};
use csv::{ReaderBuilder, Trim};
use rand::seq::SliceRandom;
use rand::Rng;
use std::fs::File;
use std::io::Read;
use std::ops::Index;
use tracing::{debug, info};

/// A single question and the whole number expected as its answer.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Problem {
    pub question: String,
    pub answer: String,
}

impl Problem {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into().trim().to_string(),
            answer: answer.into().trim().to_string(),
        }
    }

    /// The stored answer as an integer.
    pub fn expected(&self) -> Result<i64> {
        parse_answer(&self.answer)
    }
}

/// Parses a whole-number answer, ignoring surrounding whitespace.
pub fn parse_answer(text: &str) -> Result<i64> {
    let trimmed = text.trim();
    trimmed
        .parse::<i64>()
        .map_err(|_| QuizError::InvalidAnswerFormat {
            input: trimmed.to_string(),
        })
}

/// Ordered problems for one run. Shuffled at most once, right after loading.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProblemSet {
    problems: Vec<Problem>,
}

impl ProblemSet {
    pub fn new(problems: Vec<Problem>) -> Self {
        Self { problems }
    }

    pub fn len(&self) -> usize {
        self.problems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.problems.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Problem> {
        self.problems.iter()
    }

    pub fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.problems.shuffle(rng);
    }

    pub fn into_inner(self) -> Vec<Problem> {
        self.problems
    }
}

impl Index<usize> for ProblemSet {
    type Output = Problem;

    fn index(&self, idx: usize) -> &Problem {
        &self.problems[idx]
    }
}

impl<'a> IntoIterator for &'a ProblemSet {
    type Item = &'a Problem;
    type IntoIter = std::slice::Iter<'a, Problem>;

    fn into_iter(self) -> Self::IntoIter {
        self.problems.iter()
    }
}

/// Loads the question bank named by `config`, shuffling it with `rng` when asked to.
///
/// Any bad row fails the whole load; nothing is returned partially.
pub fn load<R: Rng + ?Sized>(config: &Config, rng: &mut R) -> Result<ProblemSet> {
    info!(path = %config.file_path.display(), "loading questions");

    let file = File::open(&config.file_path).map_err(|source| QuizError::Io {
        path: config.file_path.clone(),
        source,
    })?;

    let mut problems = load_from_reader(file)?;
    if config.shuffle {
        problems.shuffle(rng);
        debug!("shuffled {} problems", problems.len());
    }

    info!(count = problems.len(), "questions loaded");
    Ok(problems)
}

/// Parses `question,answer` rows without a header. Extra fields are ignored.
/// Answers are kept as text; they are parsed when their question is asked.
pub fn load_from_reader<R: Read>(reader: R) -> Result<ProblemSet> {
    let mut csv_reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);

    let mut problems = Vec::new();
    for (idx, record) in csv_reader.records().enumerate() {
        let record = record?;
        let line = record
            .position()
            .map(|p| p.line())
            .unwrap_or(idx as u64 + 1);

        if record.len() < 2 {
            return Err(QuizError::Format {
                line,
                reason: format!("expected 2 fields, found {}", record.len()),
            });
        }

        problems.push(Problem::new(&record[0], &record[1]));
    }

    Ok(ProblemSet::new(problems))
}
