use crate::err::{DecodeError, DecodeResult};
use crate::record_types::{EMFPLUS_OBJECT, RecordType};
use crate::utils::{ByteCursor, bytes};

use log::trace;

/// Marker at the start of an `EMR_GDICOMMENT` carrying EMF+ records.
pub const EMFPLUS_SIGNATURE: [u8; 4] = *b"EMF+";

/// `Type` + `Flags` + `Size` + `DataSize`.
pub const EMFPLUS_RECORD_HEADER_SIZE: usize = 12;

/// Object type stored in bits 8..15 of an `EMFPLUS_OBJECT` record's flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectType {
    Invalid,
    Brush,
    Pen,
    Path,
    Region,
    Image,
    Font,
    StringFormat,
    ImageAttributes,
    CustomLineCap,
}

impl ObjectType {
    pub fn from_u8(value: u8) -> Option<ObjectType> {
        Some(match value {
            0 => ObjectType::Invalid,
            1 => ObjectType::Brush,
            2 => ObjectType::Pen,
            3 => ObjectType::Path,
            4 => ObjectType::Region,
            5 => ObjectType::Image,
            6 => ObjectType::Font,
            7 => ObjectType::StringFormat,
            8 => ObjectType::ImageAttributes,
            9 => ObjectType::CustomLineCap,
            _ => return None,
        })
    }
}

/// A single EMF+ record, borrowed from the comment data that carries it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmfPlusRecord<'a> {
    /// Offset of the record header, relative to the comment data (the `EMF+` marker is at 0).
    pub offset: usize,
    pub record_type: u16,
    pub flags: u16,
    /// Declared total size, header included.
    pub size: u32,
    pub data_size: u32,
    /// Exactly `data_size` bytes.
    pub data: &'a [u8],
}

impl<'a> EmfPlusRecord<'a> {
    pub fn record_type(&self) -> RecordType {
        RecordType(u32::from(self.record_type))
    }

    pub fn is_object(&self) -> bool {
        u32::from(self.record_type) == EMFPLUS_OBJECT
    }

    /// Object type of an `EMFPLUS_OBJECT` record; `None` for any other record.
    pub fn object_type(&self) -> Option<ObjectType> {
        if !self.is_object() {
            return None;
        }
        ObjectType::from_u8(((self.flags >> 8) & 0x7f) as u8)
    }

    pub fn object_id(&self) -> u8 {
        (self.flags & 0xff) as u8
    }

    /// Set when an object is split across several `EMFPLUS_OBJECT` records.
    pub fn is_continued_object(&self) -> bool {
        self.is_object() && self.flags & 0x8000 != 0
    }
}

/// Returns the EMF+ record area of a comment, if the comment carries EMF+ records.
///
/// The returned slice still starts with the marker, so record offsets match the comment data.
pub fn emfplus_comment(comment_data: &[u8]) -> Option<&[u8]> {
    match bytes::read_sig(comment_data, 0) {
        Some(sig) if sig == EMFPLUS_SIGNATURE => Some(comment_data),
        _ => None,
    }
}

/// Lazily decodes the EMF+ records of one comment.
///
/// Validation failures are yielded as `Err` items:
/// - `SizeMismatch` when `Size != DataSize + 12`. The record itself is yielded right after the
///   error and decoding continues at `offset + Size`.
/// - `Truncated` when a record overruns the comment. Nothing more is decoded.
/// - `TrailingData` when fewer than 12 bytes are left over after the last record.
///
/// When the iterator returns `None` without having yielded one of the last two errors, the
/// records filled the comment data exactly.
#[derive(Debug, Clone)]
pub struct EmfPlusRecords<'a> {
    data: &'a [u8],
    offset: usize,
    pending: Option<EmfPlusRecord<'a>>,
    finished: bool,
}

impl<'a> EmfPlusRecords<'a> {
    /// `comment_data` must start with [`EMFPLUS_SIGNATURE`] (see [`emfplus_comment`]).
    pub fn new(comment_data: &'a [u8]) -> Self {
        EmfPlusRecords {
            data: comment_data,
            offset: EMFPLUS_SIGNATURE.len().min(comment_data.len()),
            pending: None,
            finished: false,
        }
    }

    /// Offset of the next record header within the comment data.
    pub fn offset(&self) -> usize {
        self.offset
    }

    fn fail(&mut self, err: DecodeError) -> Option<DecodeResult<EmfPlusRecord<'a>>> {
        self.finished = true;
        Some(Err(err))
    }

    fn read_record(&self) -> DecodeResult<EmfPlusRecord<'a>> {
        let mut cursor = ByteCursor::with_pos(self.data, self.offset)?;

        let record_type = cursor.u16("EMF+ record type")?;
        let flags = cursor.u16("EMF+ record flags")?;
        let size = cursor.u32("EMF+ record size")?;
        let data_size = cursor.u32("EMF+ record data size")?;

        let data = cursor.bytes(data_size as usize, "EMF+ record data")?;

        Ok(EmfPlusRecord {
            offset: self.offset,
            record_type,
            flags,
            size,
            data_size,
            data,
        })
    }
}

impl<'a> Iterator for EmfPlusRecords<'a> {
    type Item = DecodeResult<EmfPlusRecord<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(record) = self.pending.take() {
            return Some(Ok(record));
        }

        if self.finished {
            return None;
        }

        let remaining = self.data.len().saturating_sub(self.offset);
        if remaining == 0 {
            self.finished = true;
            return None;
        }

        if remaining < EMFPLUS_RECORD_HEADER_SIZE {
            return self.fail(DecodeError::TrailingData {
                what: "EMF+ comment",
                offset: self.offset as u64,
                remaining,
            });
        }

        let record = match self.read_record() {
            Ok(record) => record,
            Err(e) => return self.fail(e),
        };

        let declared = record.size as usize;
        if declared < EMFPLUS_RECORD_HEADER_SIZE {
            return self.fail(DecodeError::InvalidRecordSize {
                what: "EMF+ record",
                offset: record.offset as u64,
                size: record.size,
            });
        }

        if declared > remaining {
            return self.fail(bytes::truncated(
                "EMF+ record",
                record.offset,
                declared,
                self.data.len(),
            ));
        }

        trace!(
            "EMF+ record {} at offset {} (flags 0x{:04x}, {} bytes)",
            record.record_type(),
            record.offset,
            record.flags,
            record.size
        );

        // Continue at the declared size so a padded record does not desynchronize its siblings.
        self.offset += declared;

        let accounted = u64::from(record.data_size) + EMFPLUS_RECORD_HEADER_SIZE as u64;
        if u64::from(record.size) != accounted {
            self.pending = Some(record);
            return Some(Err(DecodeError::SizeMismatch {
                what: "EMF+ record",
                offset: record.offset as u64,
                declared: u64::from(record.size),
                accounted,
            }));
        }

        Some(Ok(record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record_types::*;

    fn raw_plus(record_type: u32, flags: u16, data: &[u8]) -> Vec<u8> {
        raw_plus_sized(record_type, flags, data, data.len() as u32 + 12)
    }

    fn raw_plus_sized(record_type: u32, flags: u16, data: &[u8], size: u32) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&(record_type as u16).to_le_bytes());
        out.extend_from_slice(&flags.to_le_bytes());
        out.extend_from_slice(&size.to_le_bytes());
        out.extend_from_slice(&(data.len() as u32).to_le_bytes());
        out.extend_from_slice(data);
        out
    }

    fn comment(records: &[Vec<u8>]) -> Vec<u8> {
        let mut out = EMFPLUS_SIGNATURE.to_vec();
        for r in records {
            out.extend_from_slice(r);
        }
        out
    }

    #[test]
    fn test_decodes_records_filling_the_comment() {
        let data = comment(&[
            raw_plus(EMFPLUS_HEADER, 1, &[0; 16]),
            raw_plus(EMFPLUS_FILL_RECTS, 0, &[0; 8]),
            raw_plus(EMFPLUS_END_OF_FILE, 0, &[]),
        ]);

        let records: Vec<_> = EmfPlusRecords::new(&data)
            .collect::<Result<_, _>>()
            .unwrap();

        let types: Vec<u32> = records.iter().map(|r| r.record_type().0).collect();
        assert_eq!(
            types,
            vec![EMFPLUS_HEADER, EMFPLUS_FILL_RECTS, EMFPLUS_END_OF_FILE]
        );
        assert_eq!(records[1].offset, 4 + 28);

        let declared: u32 = records.iter().map(|r| r.size).sum();
        assert_eq!(declared as usize, data.len() - 4);
    }

    #[test]
    fn test_size_mismatch_is_reported_once_and_decoding_resynchronizes() {
        // Size overstates DataSize by 4; the padding is present so the next record is aligned.
        let mut padded = raw_plus_sized(EMFPLUS_FILL_RECTS, 0, &[0; 8], 24);
        padded.extend_from_slice(&[0; 4]);

        let data = comment(&[
            raw_plus(EMFPLUS_HEADER, 0, &[0; 16]),
            padded,
            raw_plus(EMFPLUS_END_OF_FILE, 0, &[]),
        ]);

        let items: Vec<_> = EmfPlusRecords::new(&data).collect();
        assert_eq!(items.len(), 4);

        let errors: Vec<_> = items.iter().filter_map(|i| i.as_ref().err()).collect();
        assert_eq!(
            errors,
            vec![&DecodeError::SizeMismatch {
                what: "EMF+ record",
                offset: 32,
                declared: 24,
                accounted: 20,
            }]
        );

        let types: Vec<u32> = items
            .iter()
            .filter_map(|i| i.as_ref().ok())
            .map(|r| r.record_type().0)
            .collect();
        assert_eq!(
            types,
            vec![EMFPLUS_HEADER, EMFPLUS_FILL_RECTS, EMFPLUS_END_OF_FILE]
        );
    }

    #[test]
    fn test_overrun_is_truncation() {
        let mut data = comment(&[raw_plus(EMFPLUS_HEADER, 0, &[0; 16])]);
        let mut tail = raw_plus(EMFPLUS_FILL_RECTS, 0, &[0; 8]);
        tail.truncate(16);
        data.extend(tail);

        let items: Vec<_> = EmfPlusRecords::new(&data).collect();
        assert_eq!(items.len(), 2);
        assert!(items[0].is_ok());
        assert!(matches!(
            items[1],
            Err(DecodeError::Truncated {
                what: "EMF+ record data",
                ..
            })
        ));
    }

    #[test]
    fn test_size_below_the_header_size_stops_the_comment() {
        let data = comment(&[
            raw_plus(EMFPLUS_HEADER, 0, &[0; 16]),
            raw_plus_sized(EMFPLUS_SAVE, 0, &[], 8),
            raw_plus(EMFPLUS_END_OF_FILE, 0, &[]),
        ]);

        let items: Vec<_> = EmfPlusRecords::new(&data).collect();
        assert_eq!(items.len(), 2);
        assert!(items[0].is_ok());
        assert_eq!(
            items[1],
            Err(DecodeError::InvalidRecordSize {
                what: "EMF+ record",
                offset: 32,
                size: 8,
            })
        );
        assert!(items[1].as_ref().unwrap_err().is_fatal());
    }

    #[test]
    fn test_trailing_bytes() {
        let mut data = comment(&[raw_plus(EMFPLUS_END_OF_FILE, 0, &[])]);
        data.extend_from_slice(&[0; 6]);

        let items: Vec<_> = EmfPlusRecords::new(&data).collect();
        assert_eq!(
            items[1],
            Err(DecodeError::TrailingData {
                what: "EMF+ comment",
                offset: 16,
                remaining: 6,
            })
        );
    }

    #[test]
    fn test_object_flags() {
        let data = comment(&[raw_plus(EMFPLUS_OBJECT, 0x8503, &[])]);
        let record = EmfPlusRecords::new(&data).next().unwrap().unwrap();

        assert_eq!(record.object_type(), Some(ObjectType::Image));
        assert_eq!(record.object_id(), 3);
        assert!(record.is_continued_object());
    }

    #[test]
    fn test_recognizes_emfplus_comments() {
        assert!(emfplus_comment(b"EMF+\x02\x40").is_some());
        assert!(emfplus_comment(b"winetest").is_none());
        assert!(emfplus_comment(b"EMF").is_none());
    }
}
