//! Replaying a logical record stream through a [`RecordExecutor`], with per-record-type overrides.
//!
//! Playback matches the stream against its expectations as it goes. Unlike verification it stops
//! at the first unexpected record or executor failure, since everything after that point would
//! run operations nobody asked for against the target.

use crate::err::ExecutorError;
use crate::matcher::{Matcher, Step};
use crate::record_stream::{DecodeProblem, LogicalRecord, RecordVisitor, VisitFlow};
use crate::record_types::RecordType;

use hashbrown::HashMap;
use log::{debug, warn};

use std::fmt;

/// Performs the default effect of one record on the rendering target.
pub trait RecordExecutor {
    fn execute_record(
        &mut self,
        record_type: u32,
        flags: u16,
        data: &[u8],
    ) -> Result<(), ExecutorError>;
}

impl<T: RecordExecutor + ?Sized> RecordExecutor for &mut T {
    fn execute_record(
        &mut self,
        record_type: u32,
        flags: u16,
        data: &[u8],
    ) -> Result<(), ExecutorError> {
        (**self).execute_record(record_type, flags, data)
    }
}

/// Replaces the default execution of a record type.
pub trait PlaybackOverride {
    fn play(
        &mut self,
        record: &LogicalRecord<'_>,
        ctx: &mut PlaybackContext<'_, '_>,
    ) -> Result<(), ExecutorError>;
}

struct FnOverride<F>(F);

impl<F> PlaybackOverride for FnOverride<F>
where
    F: FnMut(&LogicalRecord<'_>, &mut PlaybackContext<'_, '_>) -> Result<(), ExecutorError>,
{
    fn play(
        &mut self,
        record: &LogicalRecord<'_>,
        ctx: &mut PlaybackContext<'_, '_>,
    ) -> Result<(), ExecutorError> {
        (self.0)(record, ctx)
    }
}

/// Overrides by record type.
#[derive(Default)]
pub struct Overrides<'o> {
    handlers: HashMap<u32, Box<dyn PlaybackOverride + 'o>>,
}

impl fmt::Debug for Overrides<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut types: Vec<RecordType> = self.handlers.keys().copied().map(RecordType).collect();
        types.sort();
        f.debug_struct("Overrides").field("types", &types).finish()
    }
}

impl<'o> Overrides<'o> {
    pub fn new() -> Self {
        Overrides::default()
    }

    /// Registers `handler` for `record_type`, returning the previous handler if there was one.
    pub fn insert(
        &mut self,
        record_type: u32,
        handler: impl PlaybackOverride + 'o,
    ) -> Option<Box<dyn PlaybackOverride + 'o>> {
        self.handlers.insert(record_type, Box::new(handler))
    }

    pub fn insert_fn<F>(&mut self, record_type: u32, f: F) -> &mut Self
    where
        F: FnMut(&LogicalRecord<'_>, &mut PlaybackContext<'_, '_>) -> Result<(), ExecutorError>
            + 'o,
    {
        self.handlers.insert(record_type, Box::new(FnOverride(f)));
        self
    }

    pub fn contains(&self, record_type: u32) -> bool {
        self.handlers.contains_key(&record_type)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    fn get_mut(&mut self, record_type: u32) -> Option<&mut (dyn PlaybackOverride + 'o)> {
        self.handlers.get_mut(&record_type).map(|h| h.as_mut())
    }
}

/// What an override can do besides its own side effects.
pub struct PlaybackContext<'p, 'e> {
    matcher: &'p mut Matcher<'e>,
    executor: &'p mut dyn RecordExecutor,
    /// Stream position of the overridden record.
    position: usize,
    depth: usize,
    offset: usize,
    halted: bool,
}

impl<'p, 'e> PlaybackContext<'p, 'e> {
    /// Plays a substitute record: it is matched against the next expectation entries and then
    /// executed, exactly like a decoded record (overrides are not consulted again).
    ///
    /// Once playback has halted, this does nothing.
    pub fn play_record(
        &mut self,
        record_type: u32,
        flags: u16,
        data: &[u8],
    ) -> Result<(), ExecutorError> {
        if self.halted {
            return Ok(());
        }

        let position = self.matcher.position();
        if self.matcher.step(record_type, self.depth, self.offset) == Step::Unexpected {
            warn!(
                "halting playback at substitute record {}",
                RecordType(record_type)
            );
            self.halt();
            return Ok(());
        }

        self.execute(position, record_type, flags, data)
    }

    /// Executes the overridden record itself, as if no override had been registered.
    pub fn forward(&mut self, record: &LogicalRecord<'_>) -> Result<(), ExecutorError> {
        if self.halted {
            return Ok(());
        }
        self.execute(self.position, record.record_type, record.flags, record.data)
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    fn execute(
        &mut self,
        position: usize,
        record_type: u32,
        flags: u16,
        data: &[u8],
    ) -> Result<(), ExecutorError> {
        match self.executor.execute_record(record_type, flags, data) {
            Ok(()) => Ok(()),
            Err(e) => {
                warn!("record {}: {}", position, e);
                self.matcher.executor_failure(position, e.clone());
                self.halt();
                Err(e)
            }
        }
    }

    fn halt(&mut self) {
        self.halted = true;
        self.matcher.halt();
    }
}

/// Drives playback from the record walker.
pub(crate) struct Player<'p, 'e, 'o> {
    matcher: Matcher<'e>,
    executor: &'p mut dyn RecordExecutor,
    overrides: &'p mut Overrides<'o>,
}

impl<'p, 'e, 'o> Player<'p, 'e, 'o> {
    pub(crate) fn new(
        matcher: Matcher<'e>,
        executor: &'p mut dyn RecordExecutor,
        overrides: &'p mut Overrides<'o>,
    ) -> Self {
        Player {
            matcher,
            executor,
            overrides,
        }
    }

    pub(crate) fn into_matcher(self) -> Matcher<'e> {
        self.matcher
    }
}

impl<'a, 'p, 'e, 'o> RecordVisitor<'a> for Player<'p, 'e, 'o> {
    fn visit_record(&mut self, record: &LogicalRecord<'a>) -> VisitFlow {
        let position = self.matcher.position();

        let result = match self.matcher.step(record.record_type, record.depth, record.offset) {
            Step::Unexpected => {
                warn!(
                    "halting playback at unexpected record {} (record {})",
                    record.record_type(),
                    position
                );
                self.matcher.halt();
                return VisitFlow::Stop;
            }
            Step::Matched(_) if self.overrides.contains(record.record_type) => {
                debug!("record {}: playing override for {}", position, record.record_type());

                let mut ctx = PlaybackContext {
                    matcher: &mut self.matcher,
                    executor: &mut *self.executor,
                    position,
                    depth: record.depth,
                    offset: record.offset,
                    halted: false,
                };

                let result = match self.overrides.get_mut(record.record_type) {
                    Some(handler) => handler.play(record, &mut ctx),
                    None => Ok(()),
                };

                if ctx.is_halted() {
                    return VisitFlow::Stop;
                }
                result
            }
            Step::Matched(_) | Step::Mismatched => {
                self.executor
                    .execute_record(record.record_type, record.flags, record.data)
            }
        };

        match result {
            Ok(()) => VisitFlow::Continue,
            Err(e) => {
                warn!("record {}: {}", position, e);
                self.matcher.executor_failure(position, e);
                self.matcher.halt();
                VisitFlow::Stop
            }
        }
    }

    fn visit_problem(&mut self, problem: &DecodeProblem) -> VisitFlow {
        self.matcher.problem(problem);
        VisitFlow::Continue
    }
}
