use serde::Serialize;
use thiserror::Error;

use std::io;
use std::path::PathBuf;

pub type DecodeResult<T> = std::result::Result<T, DecodeError>;

/// Structural problems found while walking an EMF container or an EMF+ comment payload.
///
/// Offsets are relative to the start of the container (for EMF records) or to the start of the
/// comment data, `EMF+` marker included (for EMF+ records).
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind")]
pub enum DecodeError {
    #[error("buffer too small for {what} at offset {offset} (need {need} bytes, have {have})")]
    Truncated {
        what: &'static str,
        offset: u64,
        need: usize,
        have: usize,
    },

    #[error("{what} at offset {offset}: declared size {declared} disagrees with accounted size {accounted}")]
    SizeMismatch {
        what: &'static str,
        offset: u64,
        declared: u64,
        accounted: u64,
    },

    #[error("{what}: {remaining} trailing bytes at offset {offset} do not form a complete record")]
    TrailingData {
        what: &'static str,
        offset: u64,
        remaining: usize,
    },

    #[error("invalid record size {size} for {what} at offset {offset}")]
    InvalidRecordSize {
        what: &'static str,
        offset: u64,
        size: u32,
    },

    #[error("expected `EMR_HEADER` as the first record, found record type 0x{found:x}")]
    MissingHeader { found: u32 },

    #[error("invalid EMF header signature, expected `0x464d4520`, found `0x{found:08x}`")]
    InvalidSignature { found: u32 },

    #[error("EMR_HEADER.{field} is {declared}, but the container has {actual}")]
    HeaderMismatch {
        field: &'static str,
        declared: u64,
        actual: u64,
    },

    #[error("embedded metafile at depth {depth} is nested deeper than the limit of {limit}")]
    NestingTooDeep { depth: usize, limit: usize },
}

impl DecodeError {
    /// Whether decoding of the current container stops after this error.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            DecodeError::Truncated { .. }
                | DecodeError::InvalidRecordSize { .. }
                | DecodeError::TrailingData { .. }
        )
    }
}

/// Failure reported by a [`crate::RecordExecutor`] for a single record.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("failed to execute record 0x{record_type:x}: {message}")]
pub struct ExecutorError {
    pub record_type: u32,
    pub message: String,
}

impl ExecutorError {
    pub fn new(record_type: u32, message: impl Into<String>) -> Self {
        ExecutorError {
            record_type,
            message: message.into(),
        }
    }
}

/// Failure of a [`crate::MetafileHandle`] / [`crate::MetafileFactory`] collaborator.
#[derive(Debug, Error)]
pub enum HandleError {
    #[error("metafile handle has no serialized bytes available: {reason}")]
    Unavailable { reason: String },

    #[error("buffer is not an enhanced metafile: {source}")]
    NotAMetafile {
        #[source]
        source: DecodeError,
    },
}

#[derive(Debug, Error)]
pub enum GoldenError {
    #[error("golden mode is enabled, but no golden directory was configured")]
    NoDirectory,

    #[error("golden mode is enabled, but the check has no name to file its golden metafile under")]
    MissingName,

    #[error("failed to {action} golden metafile `{}`: {source}", path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Handle(#[from] HandleError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExpectationParseError {
    #[error("line {line}: unknown record type `{token}`")]
    UnknownRecordType { line: usize, token: String },

    #[error("line {line}: record type 0 is reserved for the end of the list")]
    ReservedTag { line: usize },
}
