
use fixtures::*;

use emfplus::err::DecodeError;
use emfplus::record_types::*;
use emfplus::settings::DEFAULT_MAX_EMBEDDING_DEPTH;
use emfplus::{
    CheckSettings, Discrepancy, EmbeddedMetafile, EmfBuffer, EmfBufferFactory, EmfPlusRecords,
    EmfRecordCursor, ExpectedRecord, LogicalRecord, RecordType, RecordVisitor, VisitFlow,
    emfplus_comment, verify, verify_bytes, walk,
};
use pretty_assertions::assert_eq;

const EMPTY_RECORDS: &[ExpectedRecord] = &[
    ExpectedRecord::strict(EMR_HEADER),
    ExpectedRecord::strict(EMFPLUS_HEADER),
    ExpectedRecord::strict(EMFPLUS_END_OF_FILE),
    ExpectedRecord::strict(EMR_EOF),
    ExpectedRecord::END,
];

fn missing_records(discrepancies: &[Discrepancy]) -> usize {
    discrepancies
        .iter()
        .filter(|d| matches!(d, Discrepancy::MissingRecord { .. }))
        .count()
}

#[test]
fn test_empty_recording_matches() {
    ensure_env_logger_initialized();

    let handle = EmfBuffer::new(empty_recording());
    let state = verify(&handle, EMPTY_RECORDS, &CheckSettings::new()).unwrap();

    assert!(state.is_ok(), "{:#?}", state.discrepancies);
    assert_eq!(state.position, 4);
    assert_eq!(state.expected_position, 4);
}

#[test]
fn test_missing_emfplus_eof_is_reported_once() {
    ensure_env_logger_initialized();

    let state = verify_bytes(
        &recording_without_emfplus_eof(),
        EMPTY_RECORDS,
        &CheckSettings::new(),
    );

    assert_eq!(missing_records(&state.discrepancies), 1);
    assert_eq!(
        state.discrepancies,
        vec![
            Discrepancy::RecordMismatch {
                position: 2,
                depth: 0,
                offset: 88 + 12 + 4 + 28,
                expected: RecordType(EMFPLUS_END_OF_FILE),
                actual: RecordType(EMR_EOF),
            },
            Discrepancy::MissingRecord {
                position: 3,
                first: RecordType(EMR_EOF),
                missing: 1,
            },
        ]
    );
}

#[test]
fn test_stream_ending_early_is_one_missing_record() {
    ensure_env_logger_initialized();

    // Header only, without any EMF+ records or EMR_EOF.
    let data = emfplus::EmfWriter::new().finish_without_eof();
    let state = verify_bytes(&data, EMPTY_RECORDS, &CheckSettings::new());

    assert_eq!(
        state.discrepancies,
        vec![Discrepancy::MissingRecord {
            position: 1,
            first: RecordType(EMFPLUS_HEADER),
            missing: 3,
        }]
    );
}

#[test]
fn test_overstated_emfplus_record_is_one_size_mismatch() {
    ensure_env_logger_initialized();

    let expected = [
        ExpectedRecord::strict(EMR_HEADER),
        ExpectedRecord::strict(EMFPLUS_HEADER),
        ExpectedRecord::strict(EMFPLUS_FILL_RECTS),
        ExpectedRecord::strict(EMFPLUS_END_OF_FILE),
        ExpectedRecord::strict(EMR_EOF),
    ];

    let state = verify_bytes(
        &recording_with_overstated_record(),
        &expected,
        &CheckSettings::new(),
    );

    assert_eq!(state.position, 5);
    assert_eq!(state.discrepancies.len(), 1);
    assert!(matches!(
        &state.discrepancies[0],
        Discrepancy::Decode {
            depth: 0,
            error: DecodeError::SizeMismatch {
                declared: 36,
                accounted: 32,
                ..
            },
            ..
        }
    ));
}

#[test]
fn test_lenient_entries() {
    ensure_env_logger_initialized();

    let expected = [
        ExpectedRecord::strict(EMR_HEADER),
        ExpectedRecord::lenient(EMR_SAVEDC),
        ExpectedRecord::strict(EMR_EOF),
    ];
    let settings = CheckSettings::new();

    assert!(verify_bytes(&recording_with_savedc(0), &expected, &settings).is_ok());
    assert!(verify_bytes(&recording_with_savedc(1), &expected, &settings).is_ok());

    let twice = verify_bytes(&recording_with_savedc(2), &expected, &settings);
    assert!(!twice.is_ok());
    assert!(matches!(
        twice.discrepancies[0],
        Discrepancy::RecordMismatch {
            position: 2,
            expected: RecordType(EMR_EOF),
            actual: RecordType(EMR_SAVEDC),
            ..
        }
    ));

    let repeated = [
        ExpectedRecord::strict(EMR_HEADER),
        ExpectedRecord::lenient(EMR_SAVEDC),
        ExpectedRecord::lenient(EMR_SAVEDC),
        ExpectedRecord::strict(EMR_EOF),
    ];
    assert!(verify_bytes(&recording_with_savedc(2), &repeated, &settings).is_ok());
}

#[test]
fn test_embedded_metafile_is_matched_in_place() {
    ensure_env_logger_initialized();

    let data = recording_drawing_metafile(&rectangle_recording());
    let expected = [
        ExpectedRecord::strict(EMR_HEADER),
        ExpectedRecord::strict(EMFPLUS_HEADER),
        ExpectedRecord::strict(EMFPLUS_OBJECT),
        ExpectedRecord::strict(EMR_HEADER),
        ExpectedRecord::strict(EMR_RECTANGLE),
        ExpectedRecord::strict(EMR_EOF),
        ExpectedRecord::strict(EMFPLUS_DRAW_IMAGE_POINTS),
        ExpectedRecord::strict(EMFPLUS_END_OF_FILE),
        ExpectedRecord::strict(EMR_EOF),
    ];

    let state = verify_bytes(&data, &expected, &CheckSettings::new());
    assert!(state.is_ok(), "{:#?}", state.discrepancies);

    let flat = [
        ExpectedRecord::strict(EMR_HEADER),
        ExpectedRecord::strict(EMFPLUS_HEADER),
        ExpectedRecord::strict(EMFPLUS_OBJECT),
        ExpectedRecord::strict(EMFPLUS_DRAW_IMAGE_POINTS),
        ExpectedRecord::strict(EMFPLUS_END_OF_FILE),
        ExpectedRecord::strict(EMR_EOF),
    ];
    let state = verify_bytes(&data, &flat, &CheckSettings::new().descend_embedded(false));
    assert!(state.is_ok(), "{:#?}", state.discrepancies);
}

#[test]
fn test_embedded_metafile_is_visited_after_a_mismatched_object() {
    ensure_env_logger_initialized();

    let data = recording_drawing_metafile(&rectangle_recording());
    let expected = [
        ExpectedRecord::strict(EMR_HEADER),
        ExpectedRecord::strict(EMFPLUS_HEADER),
        ExpectedRecord::END,
    ];

    let state = verify_bytes(&data, &expected, &CheckSettings::new());
    let unexpected: Vec<(usize, RecordType)> = state
        .discrepancies
        .iter()
        .filter_map(|d| match d {
            Discrepancy::UnexpectedRecord { depth, actual, .. } => Some((*depth, *actual)),
            _ => None,
        })
        .collect();

    assert_eq!(
        unexpected,
        vec![
            (0, RecordType(EMFPLUS_OBJECT)),
            (1, RecordType(EMR_HEADER)),
            (1, RecordType(EMR_RECTANGLE)),
            (1, RecordType(EMR_EOF)),
            (0, RecordType(EMFPLUS_DRAW_IMAGE_POINTS)),
            (0, RecordType(EMFPLUS_END_OF_FILE)),
            (0, RecordType(EMR_EOF)),
        ]
    );
}

#[test]
fn test_truncated_embedded_metafile_does_not_abort_the_parent() {
    ensure_env_logger_initialized();

    let mut inner = rectangle_recording();
    inner.truncate(inner.len() - 4);
    let data = recording_drawing_metafile(&inner);

    let expected = [
        ExpectedRecord::strict(EMR_HEADER),
        ExpectedRecord::strict(EMFPLUS_HEADER),
        ExpectedRecord::strict(EMFPLUS_OBJECT),
        ExpectedRecord::strict(EMR_HEADER),
        ExpectedRecord::strict(EMR_RECTANGLE),
        ExpectedRecord::strict(EMFPLUS_DRAW_IMAGE_POINTS),
        ExpectedRecord::strict(EMFPLUS_END_OF_FILE),
        ExpectedRecord::strict(EMR_EOF),
    ];

    let state = verify_bytes(&data, &expected, &CheckSettings::new());

    let errors: Vec<&DecodeError> = state
        .discrepancies
        .iter()
        .map(|d| match d {
            Discrepancy::Decode {
                depth: 1, error, ..
            } => error,
            other => panic!("unexpected discrepancy {:?}", other),
        })
        .collect();

    assert_eq!(
        errors,
        vec![
            &DecodeError::HeaderMismatch {
                field: "nBytes",
                declared: 132,
                actual: 128,
            },
            &DecodeError::Truncated {
                what: "EMF record",
                offset: 112,
                need: 20,
                have: 16,
            },
        ]
    );
    assert_eq!(state.position, 8);
}

#[test]
fn test_verification_is_idempotent() {
    ensure_env_logger_initialized();

    let handle = EmfBuffer::new(recording_with_overstated_record());
    let settings = CheckSettings::new();

    let first = verify(&handle, EMPTY_RECORDS, &settings).unwrap();
    let second = verify(&handle, EMPTY_RECORDS, &settings).unwrap();

    assert!(!first.is_ok());
    assert_eq!(first, second);
}

#[test]
fn test_record_sizes_cover_the_container() {
    for data in [
        empty_recording(),
        gdi_comment_recording(),
        recording_with_overstated_record(),
        recording_drawing_metafile(&rectangle_recording()),
    ] {
        let records: Vec<_> = EmfRecordCursor::new(&data)
            .collect::<Result<_, _>>()
            .unwrap();

        let total: usize = records.iter().map(|r| r.size as usize).sum();
        assert_eq!(total, data.len());

        for record in records {
            let Some(comment) = record.comment_data().unwrap().and_then(emfplus_comment) else {
                continue;
            };

            let declared: usize = EmfPlusRecords::new(comment)
                .filter_map(Result::ok)
                .map(|r| r.size as usize)
                .sum();
            assert_eq!(declared, comment.len() - 4);
        }
    }
}

#[test]
fn test_deeply_nested_metafiles_stop_at_the_depth_limit() {
    ensure_env_logger_initialized();

    let data = nested_recording(3000);
    let state = verify_bytes(&data, &[], &CheckSettings::new());

    let problems: Vec<(usize, &DecodeError)> = state
        .discrepancies
        .iter()
        .filter_map(|d| match d {
            Discrepancy::Decode { depth, error, .. } => Some((*depth, error)),
            _ => None,
        })
        .collect();
    assert_eq!(
        problems,
        vec![(
            DEFAULT_MAX_EMBEDDING_DEPTH,
            &DecodeError::NestingTooDeep {
                depth: DEFAULT_MAX_EMBEDDING_DEPTH + 1,
                limit: DEFAULT_MAX_EMBEDDING_DEPTH,
            }
        )]
    );

    // EMR_HEADER, EMFPLUS_OBJECT and EMR_EOF of every level that was walked.
    assert_eq!(state.position, 3 * (DEFAULT_MAX_EMBEDDING_DEPTH + 1));
}

/// Wraps every embedded metafile into a handle of its own.
struct EmbeddedHandles(Vec<EmfBuffer>);

impl<'a> RecordVisitor<'a> for EmbeddedHandles {
    fn visit_record(&mut self, _record: &LogicalRecord<'a>) -> VisitFlow {
        VisitFlow::Continue
    }

    fn enter_embedded(&mut self, metafile: &EmbeddedMetafile<'a>, _depth: usize) -> VisitFlow {
        self.0.push(metafile.to_handle(&EmfBufferFactory).unwrap());
        VisitFlow::Continue
    }
}

#[test]
fn test_embedded_metafile_can_be_verified_through_its_own_handle() {
    ensure_env_logger_initialized();

    let data = recording_drawing_metafile(&rectangle_recording());
    let mut handles = EmbeddedHandles(vec![]);
    walk(&data, &CheckSettings::new(), &mut handles);

    assert_eq!(handles.0.len(), 1);
    assert_eq!(handles.0[0].as_bytes(), rectangle_recording().as_slice());

    let expected = [
        ExpectedRecord::strict(EMR_HEADER),
        ExpectedRecord::strict(EMR_RECTANGLE),
        ExpectedRecord::strict(EMR_EOF),
    ];
    let state = verify(&handles.0[0], &expected, &CheckSettings::new()).unwrap();
    assert!(state.is_ok(), "{:#?}", state.discrepancies);
}
