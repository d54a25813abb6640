//! The logical record stream: EMF records, with EMF+ carrier comments replaced by the records they
//! carry and embedded metafiles expanded depth-first right after the object record holding them.

use crate::emf_header::{EMR_HEADER_MIN_SIZE, EmfHeader};
use crate::emf_record::{EMR_RECORD_HEADER_SIZE, EmfRecord, EmfRecordCursor};
use crate::emfplus_object::EmbeddedMetafile;
use crate::emfplus_record::{EmfPlusRecords, emfplus_comment};
use crate::err::DecodeError;
use crate::record_types::RecordType;
use crate::settings::CheckSettings;
use crate::utils::{bytes, hexdump};

use log::{Level, debug, log_enabled, warn};
use serde::Serialize;

use std::marker::PhantomData;

/// Bytes of context dumped around a decode problem.
const PROBLEM_DUMP_LIMIT: usize = 64;

/// `cbData` precedes the comment data.
const COMMENT_DATA_OFFSET: usize = EMR_RECORD_HEADER_SIZE + 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RecordOrigin {
    Emf,
    EmfPlus,
}

/// One entry of the logical stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogicalRecord<'a> {
    /// 0 for the outer container, +1 for every embedded metafile.
    pub depth: usize,
    pub origin: RecordOrigin,
    pub record_type: u32,
    /// Always 0 for EMF records.
    pub flags: u16,
    /// Offset of the record header within the container it belongs to.
    pub offset: usize,
    /// The record payload (EMF) or data (EMF+), header excluded.
    pub data: &'a [u8],
}

impl<'a> LogicalRecord<'a> {
    fn from_emf(record: &EmfRecord<'a>, depth: usize) -> Self {
        LogicalRecord {
            depth,
            origin: RecordOrigin::Emf,
            record_type: record.record_type,
            flags: 0,
            offset: record.offset,
            data: record.payload,
        }
    }

    pub fn record_type(&self) -> RecordType {
        RecordType(self.record_type)
    }
}

/// A decode error, with where it happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecodeProblem {
    pub depth: usize,
    /// Offset of the EMF record being decoded when the problem was found, within its container.
    pub record_offset: usize,
    pub error: DecodeError,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisitFlow {
    Continue,
    Stop,
}

impl VisitFlow {
    pub fn is_stop(self) -> bool {
        self == VisitFlow::Stop
    }
}

/// Receives the logical stream of a metafile, in order.
pub trait RecordVisitor<'a> {
    fn visit_record(&mut self, record: &LogicalRecord<'a>) -> VisitFlow;

    fn visit_problem(&mut self, _problem: &DecodeProblem) -> VisitFlow {
        VisitFlow::Continue
    }

    /// Called before the records of an embedded metafile, at the depth of those records.
    fn enter_embedded(&mut self, _metafile: &EmbeddedMetafile<'a>, _depth: usize) -> VisitFlow {
        VisitFlow::Continue
    }

    fn leave_embedded(&mut self, _depth: usize) {}
}

/// Walks `data` depth-first, feeding `visitor`.
///
/// Decode problems are handed to the visitor and only ever stop the container (or comment) they
/// were found in. Returns [`VisitFlow::Stop`] if the visitor asked to stop.
pub fn walk<'a, V>(data: &'a [u8], settings: &CheckSettings, visitor: &mut V) -> VisitFlow
where
    V: RecordVisitor<'a> + ?Sized,
{
    Walker {
        settings,
        visitor,
        data: PhantomData,
    }
    .container(data, 0)
}

struct Walker<'s, 'a, V: ?Sized> {
    settings: &'s CheckSettings,
    visitor: &'s mut V,
    data: PhantomData<&'a [u8]>,
}

macro_rules! propagate_stop {
    ($flow:expr) => {
        if $flow.is_stop() {
            return VisitFlow::Stop;
        }
    };
}

impl<'s, 'a, V> Walker<'s, 'a, V>
where
    V: RecordVisitor<'a> + ?Sized,
{
    fn problem(
        &mut self,
        data: &[u8],
        depth: usize,
        record_offset: usize,
        error: DecodeError,
    ) -> VisitFlow {
        warn!(
            "{}: {} (depth {}, record at offset {})",
            self.settings.get_description(),
            error,
            depth,
            record_offset
        );

        if log_enabled!(Level::Debug) {
            if let Some(bad) = data.get(record_offset..) {
                debug!("{}", hexdump(bad, record_offset, PROBLEM_DUMP_LIMIT));
            }
        }

        self.visitor.visit_problem(&DecodeProblem {
            depth,
            record_offset,
            error,
        })
    }

    fn container(&mut self, data: &'a [u8], depth: usize) -> VisitFlow {
        debug!("walking container of {} bytes at depth {}", data.len(), depth);

        if data.is_empty() {
            let error = bytes::truncated("EMR_HEADER", 0, EMR_HEADER_MIN_SIZE, 0);
            return self.problem(data, depth, 0, error);
        }

        let mut cursor = EmfRecordCursor::new(data);
        let mut header: Option<EmfHeader> = None;
        let mut complete = true;

        while let Some(item) = cursor.next() {
            let record = match item {
                Ok(record) => record,
                Err(e) => {
                    complete = false;
                    let at = cursor.offset();
                    propagate_stop!(self.problem(data, depth, at, e));
                    break;
                }
            };

            if record.offset == 0 && self.settings.should_validate_header() {
                match EmfHeader::from_record(&record) {
                    Ok(h) => {
                        if let Err(e) = h.validate_size(data.len()) {
                            propagate_stop!(self.problem(data, depth, 0, e));
                        }
                        header = Some(h);
                    }
                    Err(e) => propagate_stop!(self.problem(data, depth, 0, e)),
                }
            }

            propagate_stop!(self.record(data, &record, depth));
        }

        if let (Some(header), true) = (header, complete) {
            if let Err(e) = header.validate_record_count(cursor.records_read()) {
                propagate_stop!(self.problem(data, depth, 0, e));
            }
        }

        debug!(
            "done with container at depth {} ({} records)",
            depth,
            cursor.records_read()
        );
        VisitFlow::Continue
    }

    fn record(&mut self, container: &'a [u8], record: &EmfRecord<'a>, depth: usize) -> VisitFlow {
        let comment = match record.comment_data() {
            Ok(comment) => comment,
            Err(e) => {
                propagate_stop!(self.problem(container, depth, record.offset, e));
                None
            }
        };

        match comment.and_then(emfplus_comment) {
            Some(carrier) => self.emfplus_comment(container, record, carrier, depth),
            None => self
                .visitor
                .visit_record(&LogicalRecord::from_emf(record, depth)),
        }
    }

    fn emfplus_comment(
        &mut self,
        container: &'a [u8],
        carrier: &EmfRecord<'a>,
        comment: &'a [u8],
        depth: usize,
    ) -> VisitFlow {
        let base = carrier.offset + COMMENT_DATA_OFFSET;

        for item in EmfPlusRecords::new(comment) {
            let record = match item {
                Ok(record) => record,
                Err(e) => {
                    propagate_stop!(self.problem(container, depth, carrier.offset, e));
                    continue;
                }
            };

            let logical = LogicalRecord {
                depth,
                origin: RecordOrigin::EmfPlus,
                record_type: u32::from(record.record_type),
                flags: record.flags,
                offset: base + record.offset,
                data: record.data,
            };
            propagate_stop!(self.visitor.visit_record(&logical));

            if !record.is_object() || !self.settings.should_descend_embedded() {
                continue;
            }

            match EmbeddedMetafile::from_record(&record) {
                Ok(Some(embedded)) => propagate_stop!(self.embedded(
                    container,
                    carrier.offset,
                    &embedded,
                    depth + 1
                )),
                Ok(None) => {}
                Err(e) => propagate_stop!(self.problem(container, depth, carrier.offset, e)),
            }
        }

        VisitFlow::Continue
    }

    fn embedded(
        &mut self,
        container: &'a [u8],
        carrier_offset: usize,
        embedded: &EmbeddedMetafile<'a>,
        depth: usize,
    ) -> VisitFlow {
        match embedded.metafile_type {
            Some(t) if t.is_enhanced() => {}
            _ => {
                debug!(
                    "not descending into object {} (metafile type {})",
                    embedded.object_id, embedded.raw_metafile_type
                );
                return VisitFlow::Continue;
            }
        }

        let limit = self.settings.get_max_embedding_depth();
        if depth > limit {
            let error = DecodeError::NestingTooDeep { depth, limit };
            return self.problem(container, depth - 1, carrier_offset, error);
        }

        propagate_stop!(self.visitor.enter_embedded(embedded, depth));
        let flow = self.container(embedded.data, depth);
        self.visitor.leave_embedded(depth);
        flow
    }
}

/// An owned-index view of one walk event, as produced by [`collect_stream`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamItem<'a> {
    Record(LogicalRecord<'a>),
    Problem(DecodeProblem),
    EnterEmbedded { depth: usize, object_id: u8 },
    LeaveEmbedded { depth: usize },
}

#[derive(Debug, Default)]
struct Collector<'a> {
    items: Vec<StreamItem<'a>>,
}

impl<'a> RecordVisitor<'a> for Collector<'a> {
    fn visit_record(&mut self, record: &LogicalRecord<'a>) -> VisitFlow {
        self.items.push(StreamItem::Record(*record));
        VisitFlow::Continue
    }

    fn visit_problem(&mut self, problem: &DecodeProblem) -> VisitFlow {
        self.items.push(StreamItem::Problem(problem.clone()));
        VisitFlow::Continue
    }

    fn enter_embedded(&mut self, metafile: &EmbeddedMetafile<'a>, depth: usize) -> VisitFlow {
        self.items.push(StreamItem::EnterEmbedded {
            depth,
            object_id: metafile.object_id,
        });
        VisitFlow::Continue
    }

    fn leave_embedded(&mut self, depth: usize) {
        self.items.push(StreamItem::LeaveEmbedded { depth });
    }
}

/// Materializes the walk of `data`.
pub fn collect_stream<'a>(data: &'a [u8], settings: &CheckSettings) -> Vec<StreamItem<'a>> {
    let mut collector = Collector::default();
    walk(data, settings, &mut collector);
    collector.items
}
