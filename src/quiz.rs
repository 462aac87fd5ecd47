use crate::error::{QuizError, Result};
use crate::problem::{parse_answer, Problem, ProblemSet};
use clap::ValueEnum;
use crossterm::style::{style, Color, Stylize};
use std::io::{self, BufRead, BufReader, Stdin, Write};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};

#[derive(Clone, Debug, Copy, PartialEq, Eq)]
pub enum Outcome {
    Correct,
    Incorrect,
    /// Typed answer was not a number and the policy let the quiz carry on.
    Invalid,
}

/// What to do when the typed answer is not a whole number.
#[derive(
    Debug,
    Default,
    Copy,
    Clone,
    PartialEq,
    Eq,
    ValueEnum,
    strum_macros::Display,
)]
#[strum(serialize_all = "lowercase")]
pub enum InvalidAnswerPolicy {
    /// stop the whole quiz
    #[default]
    Abort,
    /// count the question as wrong and move on
    Skip,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QuizResult {
    pub correct: usize,
    pub answered: usize,
    pub total: usize,
}

#[derive(Debug, Default)]
struct Tally {
    result: QuizResult,
    closed: bool,
}

/// Running score shared between the quiz loop and whoever is waiting on it.
///
/// Once closed, further answers are refused, so a snapshot taken by
/// [`Scoreboard::close`] is final.
#[derive(Debug, Clone, Default)]
pub struct Scoreboard {
    inner: Arc<Mutex<Tally>>,
}

impl Scoreboard {
    pub fn new(total: usize) -> Self {
        let tally = Tally {
            result: QuizResult {
                total,
                ..QuizResult::default()
            },
            closed: false,
        };
        Self {
            inner: Arc::new(Mutex::new(tally)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Tally> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Counts one answer. Returns false, counting nothing, once closed.
    pub fn record(&self, outcome: Outcome) -> bool {
        self.record_then(outcome, || ()).is_some()
    }

    /// Counts one answer and runs `then` before the lock is released, so a
    /// concurrent [`Scoreboard::close`] waits for it. Returns `None` without
    /// calling `then` once closed.
    pub fn record_then<T>(&self, outcome: Outcome, then: impl FnOnce() -> T) -> Option<T> {
        let mut tally = self.lock();
        if tally.closed {
            return None;
        }
        tally.result.answered += 1;
        if outcome == Outcome::Correct {
            tally.result.correct += 1;
        }
        Some(then())
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Stops accepting answers and returns the final score.
    pub fn close(&self) -> QuizResult {
        let mut tally = self.lock();
        tally.closed = true;
        tally.result
    }

    pub fn snapshot(&self) -> QuizResult {
        self.lock().result
    }
}

/// Source of typed answers, one per prompt.
pub trait AnswerSource {
    /// Blocks for the next answer line. `Ok(None)` means input has ended.
    fn read_answer(&mut self) -> io::Result<Option<String>>;
}

/// Line-oriented answers from any buffered reader.
pub struct LineSource<R: BufRead> {
    reader: R,
}

impl<R: BufRead> LineSource<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
}

impl LineSource<BufReader<Stdin>> {
    /// Production source. Owns the handle so it can move to a worker thread.
    pub fn stdin() -> Self {
        Self::new(BufReader::new(io::stdin()))
    }
}

impl<R: BufRead> AnswerSource for LineSource<R> {
    fn read_answer(&mut self) -> io::Result<Option<String>> {
        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }
}

/// Asks each problem in order and keeps score.
pub struct QuizRunner<S: AnswerSource, W: Write> {
    source: S,
    out: W,
    policy: InvalidAnswerPolicy,
    styled: bool,
}

impl<S: AnswerSource, W: Write> QuizRunner<S, W> {
    pub fn new(source: S, out: W) -> Self {
        Self {
            source,
            out,
            policy: InvalidAnswerPolicy::default(),
            styled: false,
        }
    }

    pub fn with_policy(mut self, policy: InvalidAnswerPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Colour the feedback lines. Only useful when writing to a terminal.
    pub fn styled(mut self, styled: bool) -> Self {
        self.styled = styled;
        self
    }

    pub fn into_inner(self) -> (S, W) {
        (self.source, self.out)
    }

    /// Runs every problem to the end on a private scoreboard.
    pub fn run(&mut self, problems: &ProblemSet) -> Result<QuizResult> {
        let board = Scoreboard::new(problems.len());
        self.run_with(problems, &board)
    }

    /// Runs the quiz, publishing progress to `board`. Stops early, without
    /// error, if the board is closed from elsewhere.
    pub fn run_with(&mut self, problems: &ProblemSet, board: &Scoreboard) -> Result<QuizResult> {
        let total = problems.len();
        info!(total, policy = %self.policy, "quiz started");

        for (idx, problem) in problems.iter().enumerate() {
            if board.is_closed() {
                debug!(question = idx + 1, "scoreboard closed, stopping");
                break;
            }

            let outcome = self.ask(idx + 1, total, problem)?;
            match board.record_then(outcome, || self.report(outcome, problem)) {
                Some(reported) => reported?,
                None => {
                    debug!(question = idx + 1, "answer arrived after close, not counted");
                    break;
                }
            }
        }

        let result = board.snapshot();
        info!(correct = result.correct, answered = result.answered, "quiz finished");
        Ok(result)
    }

    /// Prompts for one problem and grades the reply.
    pub fn ask(&mut self, number: usize, total: usize, problem: &Problem) -> Result<Outcome> {
        writeln!(self.out, "Question {number} of {total}: {}", problem.question)
            .and_then(|_| self.out.flush())
            .map_err(QuizError::Terminal)?;

        let line = self
            .source
            .read_answer()
            .map_err(QuizError::Terminal)?
            .ok_or(QuizError::InputClosed)?;

        let given = match parse_answer(&line) {
            Ok(value) => Some(value),
            Err(err) if self.policy == InvalidAnswerPolicy::Abort => return Err(err),
            Err(_) => None,
        };
        let expected = problem.expected()?;

        let outcome = match given {
            Some(value) if value == expected => Outcome::Correct,
            Some(_) => Outcome::Incorrect,
            None => Outcome::Invalid,
        };
        debug!(number, input = %line.trim(), ?outcome, "graded answer");
        Ok(outcome)
    }

    fn report(&mut self, outcome: Outcome, problem: &Problem) -> Result<()> {
        let message = match outcome {
            Outcome::Correct => self.paint("Correct!".to_string(), Color::Green),
            Outcome::Incorrect => self.paint(
                format!("Incorrect! The correct answer is: {}", problem.answer),
                Color::Red,
            ),
            Outcome::Invalid => self.paint(
                format!("Not a number, skipping. The correct answer is: {}", problem.answer),
                Color::Yellow,
            ),
        };
        writeln!(self.out, "{message}").map_err(QuizError::Terminal)
    }

    fn paint(&self, text: String, color: Color) -> String {
        if self.styled {
            style(text).with(color).to_string()
        } else {
            text
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::io::Cursor;

    fn runner(input: &str) -> QuizRunner<LineSource<Cursor<Vec<u8>>>, Vec<u8>> {
        QuizRunner::new(LineSource::new(Cursor::new(input.as_bytes().to_vec())), Vec::new())
    }

    fn output(r: QuizRunner<LineSource<Cursor<Vec<u8>>>, Vec<u8>>) -> String {
        String::from_utf8(r.into_inner().1).unwrap()
    }

    fn set(rows: &[(&str, &str)]) -> ProblemSet {
        ProblemSet::new(rows.iter().map(|(q, a)| Problem::new(*q, *a)).collect())
    }

    #[test]
    fn correct_answer_counts() {
        let mut r = runner("4\n");
        let result = r.run(&set(&[("2+2", "4")])).unwrap();

        assert_eq!(
            result,
            QuizResult {
                correct: 1,
                answered: 1,
                total: 1
            }
        );
        let out = output(r);
        assert!(out.contains("Question 1 of 1: 2+2"));
        assert!(out.contains("Correct!"));
    }

    #[test]
    fn wrong_answer_names_the_expected_one() {
        let mut r = runner("5\n");
        let result = r.run(&set(&[("2+2", "4")])).unwrap();

        assert_eq!(result.correct, 0);
        assert_eq!(result.answered, 1);
        assert!(output(r).contains("Incorrect! The correct answer is: 4"));
    }

    #[test]
    fn non_numeric_input_aborts_before_later_questions() {
        let mut r = runner("four\n2\n");
        let err = r.run(&set(&[("2+2", "4"), ("1+1", "2")])).unwrap_err();

        assert_matches!(err, QuizError::InvalidAnswerFormat { ref input } if input == "four");
        let out = output(r);
        assert!(out.contains("Question 1 of 2"));
        assert!(!out.contains("Question 2 of 2"));
    }

    #[test]
    fn skip_policy_counts_invalid_input_as_wrong() {
        let mut r = runner("four\n2\n").with_policy(InvalidAnswerPolicy::Skip);
        let result = r.run(&set(&[("2+2", "4"), ("1+1", "2")])).unwrap();

        assert_eq!(
            result,
            QuizResult {
                correct: 1,
                answered: 2,
                total: 2
            }
        );
        let out = output(r);
        assert!(out.contains("Not a number, skipping. The correct answer is: 4"));
        assert!(out.contains("Question 2 of 2"));
    }

    #[test]
    fn non_numeric_stored_answer_is_fatal_even_when_skipping() {
        let mut r = runner("4\n").with_policy(InvalidAnswerPolicy::Skip);
        let err = r.run(&set(&[("2+2", "four")])).unwrap_err();
        assert_matches!(err, QuizError::InvalidAnswerFormat { ref input } if input == "four");
    }

    #[test]
    fn bad_stored_answer_aborts_at_its_own_question() {
        let problems = set(&[("1+1", "2"), ("2+2", "four"), ("3+3", "6")]);
        let board = Scoreboard::new(problems.len());

        let mut r = runner("2\n4\n6\n");
        let err = r.run_with(&problems, &board).unwrap_err();

        assert_matches!(err, QuizError::InvalidAnswerFormat { ref input } if input == "four");
        assert_eq!(board.snapshot().correct, 1);
        assert_eq!(board.snapshot().answered, 1);
        let out = output(r);
        assert!(out.contains("Question 1 of 3: 1+1"));
        assert!(out.contains("Correct!"));
        assert!(out.contains("Question 2 of 3: 2+2"));
        assert!(!out.contains("Question 3 of 3"));
    }

    #[test]
    fn answers_are_trimmed_and_may_be_negative() {
        let mut r = runner("  -3 \r\n");
        let result = r.run(&set(&[("1-4", "-3")])).unwrap();
        assert_eq!(result.correct, 1);
    }

    #[test]
    fn all_correct_run_scores_everything() {
        let problems = set(&[
            ("1+1", "2"),
            ("2+2", "4"),
            ("3+3", "6"),
            ("4+4", "8"),
            ("5+5", "10"),
        ]);
        let mut r = runner("2\n4\n6\n8\n10\n");
        let result = r.run(&problems).unwrap();

        assert_eq!(result.correct, 5);
        assert_eq!(result.total, 5);
    }

    #[test]
    fn closed_input_is_an_error() {
        let mut r = runner("2\n");
        let err = r.run(&set(&[("1+1", "2"), ("2+2", "4")])).unwrap_err();
        assert_matches!(err, QuizError::InputClosed);
    }

    #[test]
    fn closed_scoreboard_stops_before_prompting() {
        let problems = set(&[("1+1", "2")]);
        let board = Scoreboard::new(problems.len());
        board.close();

        let mut r = runner("2\n");
        let result = r.run_with(&problems, &board).unwrap();

        assert_eq!(result.answered, 0);
        assert!(!output(r).contains("Question"));
    }

    #[test]
    fn scoreboard_refuses_answers_after_close() {
        let board = Scoreboard::new(3);
        assert!(board.record(Outcome::Correct));
        assert!(board.record(Outcome::Incorrect));

        let final_score = board.close();
        assert!(!board.record(Outcome::Correct));

        assert_eq!(final_score.correct, 1);
        assert_eq!(final_score.answered, 2);
        assert_eq!(board.snapshot(), final_score);
    }

    #[test]
    fn close_waits_for_feedback_of_a_counted_answer() {
        use std::sync::mpsc;
        use std::thread;
        use std::time::Duration;

        let board = Scoreboard::new(2);
        let events = Arc::new(Mutex::new(Vec::new()));
        let (started_tx, started_rx) = mpsc::channel();

        let worker = {
            let board = board.clone();
            let events = Arc::clone(&events);
            thread::spawn(move || {
                board.record_then(Outcome::Correct, || {
                    started_tx.send(()).unwrap();
                    thread::sleep(Duration::from_millis(100));
                    events.lock().unwrap().push("feedback");
                })
            })
        };

        started_rx.recv().unwrap();
        let score = board.close();
        events.lock().unwrap().push("closed");
        assert!(worker.join().unwrap().is_some());

        assert_eq!(*events.lock().unwrap(), vec!["feedback", "closed"]);
        assert_eq!(score.correct, 1);
        assert_eq!(board.record_then(Outcome::Correct, || "late"), None);
    }

    #[test]
    fn styled_feedback_wraps_message_in_escape_codes() {
        let mut r = runner("4\n").styled(true);
        r.run(&set(&[("2+2", "4")])).unwrap();
        let out = output(r);
        assert!(out.contains("Correct!"));
        assert!(out.contains('\u{1b}'));
    }

    #[test]
    fn policy_names_match_cli_values() {
        assert_eq!(InvalidAnswerPolicy::Abort.to_string(), "abort");
        assert_eq!(InvalidAnswerPolicy::Skip.to_string(), "skip");
    }
}
