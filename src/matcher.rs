//! Matching of the logical record stream against an expected record sequence.

use crate::err::{DecodeError, ExecutorError};
use crate::expectation::{ExpectedRecord, effective_len};
use crate::record_stream::{DecodeProblem, LogicalRecord, RecordVisitor, VisitFlow};
use crate::record_types::RecordType;

use log::{debug, trace};
use serde::Serialize;
use thiserror::Error;

/// A single reason why a run did not match its expectations.
///
/// `position` is the 0-based index of the logical record (across all depths) the discrepancy
/// was found at.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind")]
pub enum Discrepancy {
    #[error("record {position}: expected {expected}, got {actual}")]
    RecordMismatch {
        position: usize,
        depth: usize,
        offset: usize,
        expected: RecordType,
        actual: RecordType,
    },

    #[error("record {position}: unexpected {actual}, no more records were expected")]
    UnexpectedRecord {
        position: usize,
        depth: usize,
        offset: usize,
        actual: RecordType,
    },

    #[error("got {position} records, expected {missing} more starting with {first}")]
    MissingRecord {
        position: usize,
        first: RecordType,
        missing: usize,
    },

    #[error("record {position}: {error} (depth {depth}, record at offset {record_offset})")]
    Decode {
        position: usize,
        depth: usize,
        record_offset: usize,
        error: DecodeError,
    },

    #[error("record {position}: {error}")]
    ExecutorFailure {
        position: usize,
        error: ExecutorError,
    },
}

/// Outcome of a verification or playback run.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct MatchState {
    /// Number of logical records consumed.
    pub position: usize,
    /// Number of expectation entries consumed (matched, mismatched or skipped).
    pub expected_position: usize,
    /// Whether playback was halted before the stream was exhausted.
    pub halted: bool,
    pub discrepancies: Vec<Discrepancy>,
}

impl MatchState {
    pub fn is_ok(&self) -> bool {
        self.discrepancies.is_empty()
    }
}

/// Result of matching one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// The record matched the entry at this index of the expectation list.
    Matched(usize),
    Mismatched,
    /// The expectation list was already exhausted.
    Unexpected,
}

/// The matching state machine. Also usable directly as a [`RecordVisitor`].
#[derive(Debug)]
pub struct Matcher<'e> {
    expected: &'e [ExpectedRecord],
    next: usize,
    state: MatchState,
}

impl<'e> Matcher<'e> {
    pub fn new(expected: &'e [ExpectedRecord]) -> Self {
        Matcher {
            expected: &expected[..effective_len(expected)],
            next: 0,
            state: MatchState::default(),
        }
    }

    pub fn state(&self) -> &MatchState {
        &self.state
    }

    /// Index of the next logical record.
    pub fn position(&self) -> usize {
        self.state.position
    }

    /// Matches the next record of the stream.
    ///
    /// Lenient entries that do not match are skipped and the record is tried against the
    /// following entry. A strict mismatch is reported once and consumes both the record and the
    /// entry.
    pub fn step(&mut self, record_type: u32, depth: usize, offset: usize) -> Step {
        let position = self.state.position;
        self.state.position += 1;
        let actual = RecordType(record_type);

        loop {
            let Some(entry) = self.expected.get(self.next) else {
                debug!("record {}: unexpected {}", position, actual);
                self.state.discrepancies.push(Discrepancy::UnexpectedRecord {
                    position,
                    depth,
                    offset,
                    actual,
                });
                return Step::Unexpected;
            };

            let index = self.next;
            self.next += 1;

            if entry.record_type == actual {
                trace!("record {}: {} matches entry {}", position, actual, index);
                return Step::Matched(index);
            }

            if entry.is_lenient() {
                trace!(
                    "record {}: skipping optional {} for {}",
                    position, entry.record_type, actual
                );
                continue;
            }

            debug!(
                "record {}: expected {}, got {}",
                position, entry.record_type, actual
            );
            self.state.discrepancies.push(Discrepancy::RecordMismatch {
                position,
                depth,
                offset,
                expected: entry.record_type,
                actual,
            });
            return Step::Mismatched;
        }
    }

    /// Logs a decode problem at the current position.
    pub fn problem(&mut self, problem: &DecodeProblem) {
        self.state.discrepancies.push(Discrepancy::Decode {
            position: self.state.position,
            depth: problem.depth,
            record_offset: problem.record_offset,
            error: problem.error.clone(),
        });
    }

    pub fn executor_failure(&mut self, position: usize, error: ExecutorError) {
        self.state
            .discrepancies
            .push(Discrepancy::ExecutorFailure { position, error });
    }

    /// Marks the run as stopped early; [`Matcher::finish`] then skips the missing-record check.
    pub fn halt(&mut self) {
        self.state.halted = true;
    }

    /// Completes the run. Unconsumed strict entries are reported as one `MissingRecord`.
    pub fn finish(mut self) -> MatchState {
        self.state.expected_position = self.next;

        if !self.state.halted {
            let rest = self.expected.get(self.next..).unwrap_or_default();
            let mut missing = rest.iter().filter(|e| !e.is_lenient());

            if let Some(first) = missing.next() {
                let discrepancy = Discrepancy::MissingRecord {
                    position: self.state.position,
                    first: first.record_type,
                    missing: 1 + missing.count(),
                };
                debug!("{}", discrepancy);
                self.state.discrepancies.push(discrepancy);
            }
        }

        self.state
    }
}

impl<'a, 'e> RecordVisitor<'a> for Matcher<'e> {
    fn visit_record(&mut self, record: &LogicalRecord<'a>) -> VisitFlow {
        self.step(record.record_type, record.depth, record.offset);
        VisitFlow::Continue
    }

    fn visit_problem(&mut self, problem: &DecodeProblem) -> VisitFlow {
        self.problem(problem);
        VisitFlow::Continue
    }
}
