#![deny(unused_must_use)]
#![forbid(unsafe_code)]
// Don't allow dbg! prints in release.
#![cfg_attr(not(debug_assertions), deny(clippy::dbg_macro))]

//! Structural verification and replay of EMF / EMF+ metafiles.
//!
//! A metafile is walked as a single logical record stream: EMF records, with the EMF+ records of
//! `EMR_GDICOMMENT` carriers in place of those comments, and the records of metafiles embedded as
//! EMF+ image objects right after the object record that carries them. That stream is matched
//! against an expected sequence of record types ([`verify`]) or played through a
//! [`RecordExecutor`] with per-record overrides ([`replay`]).

pub use emf_header::{EmfHeader, EmfPlusFlags, EmfPlusHeader, EmfPlusHeaderFlags, RectL, SizeL};
pub use emf_record::{EmfRecord, EmfRecordCursor};
pub use emf_writer::EmfWriter;
pub use emfplus_object::{EmbeddedMetafile, ImageDataType, MetafileType};
pub use emfplus_record::{EmfPlusRecord, EmfPlusRecords, ObjectType, emfplus_comment};
pub use expectation::{ExpectedRecord, Tolerance, parse_expectations};
pub use golden::{GoldenHandle, GoldenMode, sync_golden};
pub use matcher::{Discrepancy, MatchState, Matcher, Step};
pub use metafile::{EmfBuffer, EmfBufferFactory, MetafileFactory, MetafileHandle};
pub use playback::{Overrides, PlaybackContext, PlaybackOverride, RecordExecutor};
pub use record_stream::{
    DecodeProblem, LogicalRecord, RecordOrigin, RecordVisitor, StreamItem, VisitFlow,
    collect_stream, walk,
};
pub use record_types::RecordType;
pub use settings::CheckSettings;
pub use verify::{replay, verify, verify_bytes, verify_golden};

pub mod emf_header;
pub mod emf_record;
pub mod emf_writer;
pub mod emfplus_object;
pub mod emfplus_record;
pub mod err;
pub mod expectation;
pub mod golden;
pub mod matcher;
pub mod metafile;
pub mod playback;
pub mod record_stream;
pub mod record_types;
pub mod settings;
mod utils;
mod verify;

pub use utils::hexdump;

// For tests, we only initialize logging once.
#[cfg(test)]
use std::sync::Once;

#[cfg(test)]
static LOGGER_INIT: Once = Once::new();

// Rust runs the tests concurrently, so unless we synchronize logging access
// it will crash when attempting to run `cargo test` with some logging facilities.
#[cfg(test)]
pub fn ensure_env_logger_initialized() {
    LOGGER_INIT.call_once(env_logger::init);
}
