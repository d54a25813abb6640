use crate::err::{DecodeError, DecodeResult};
use crate::record_types::{EMR_GDICOMMENT, RecordType};
use crate::utils::{ByteCursor, bytes};

use log::trace;

/// `iType` + `nSize`.
pub const EMR_RECORD_HEADER_SIZE: usize = 8;

/// A single record of the outer (EMF) container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmfRecord<'a> {
    /// Offset of the record header, relative to the start of the container.
    pub offset: usize,
    pub record_type: u32,
    /// Declared record size, header included.
    pub size: u32,
    /// Everything following the 8-byte header (`size - 8` bytes).
    pub payload: &'a [u8],
}

impl<'a> EmfRecord<'a> {
    pub fn record_type(&self) -> RecordType {
        RecordType(self.record_type)
    }

    pub fn is_comment(&self) -> bool {
        self.record_type == EMR_GDICOMMENT
    }

    /// The `cbData`-sized data of an `EMR_GDICOMMENT` record.
    ///
    /// Returns `Ok(None)` for any other record type.
    pub fn comment_data(&self) -> DecodeResult<Option<&'a [u8]>> {
        if !self.is_comment() {
            return Ok(None);
        }

        // Offsets in errors are reported relative to the container.
        let base = self.offset + EMR_RECORD_HEADER_SIZE;
        let cb_data = bytes::read_u32_le(self.payload, 0).ok_or(DecodeError::Truncated {
            what: "EMR_GDICOMMENT.cbData",
            offset: base as u64,
            need: 4,
            have: self.payload.len(),
        })? as usize;

        let data = self
            .payload
            .get(4..)
            .and_then(|rest| rest.get(..cb_data))
            .ok_or(DecodeError::Truncated {
                what: "EMR_GDICOMMENT data",
                offset: (base + 4) as u64,
                need: cb_data,
                have: self.payload.len().saturating_sub(4),
            })?;

        Ok(Some(data))
    }
}

/// Walks the records of an EMF container strictly forward.
///
/// Every record is bounds-checked against the buffer before it is handed out. The first
/// structural error is yielded once and the cursor is exhausted afterwards: a record whose size
/// cannot be trusted leaves no way to find the next record boundary.
#[derive(Debug, Clone)]
pub struct EmfRecordCursor<'a> {
    data: &'a [u8],
    offset: usize,
    records_read: usize,
    exhausted: bool,
}

impl<'a> EmfRecordCursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        EmfRecordCursor {
            data,
            offset: 0,
            records_read: 0,
            exhausted: false,
        }
    }

    /// Offset of the next record. After a truncation, this is the offset of the offending record.
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn records_read(&self) -> usize {
        self.records_read
    }

    pub fn exhausted(&self) -> bool {
        self.exhausted
    }

    fn read_record(&self) -> DecodeResult<EmfRecord<'a>> {
        let mut cursor = ByteCursor::with_pos(self.data, self.offset)?;

        if cursor.remaining() < EMR_RECORD_HEADER_SIZE {
            return Err(bytes::truncated(
                "EMF record header",
                self.offset,
                EMR_RECORD_HEADER_SIZE,
                self.data.len(),
            ));
        }

        let record_type = cursor.u32("EMF record type")?;
        let size = cursor.u32("EMF record size")?;

        if (size as usize) < EMR_RECORD_HEADER_SIZE || size % 4 != 0 {
            return Err(DecodeError::InvalidRecordSize {
                what: "EMF record",
                offset: self.offset as u64,
                size,
            });
        }

        let payload = cursor
            .bytes(size as usize - EMR_RECORD_HEADER_SIZE, "EMF record payload")
            .map_err(|_| {
                bytes::truncated("EMF record", self.offset, size as usize, self.data.len())
            })?;

        Ok(EmfRecord {
            offset: self.offset,
            record_type,
            size,
            payload,
        })
    }
}

impl<'a> Iterator for EmfRecordCursor<'a> {
    type Item = DecodeResult<EmfRecord<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.exhausted || self.offset >= self.data.len() {
            self.exhausted = true;
            return None;
        }

        match self.read_record() {
            Ok(record) => {
                trace!(
                    "EMF record {} at offset {} ({} bytes)",
                    record.record_type(),
                    record.offset,
                    record.size
                );
                self.offset += record.size as usize;
                self.records_read += 1;
                Some(Ok(record))
            }
            Err(e) => {
                self.exhausted = true;
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record_types::*;

    fn raw_record(record_type: u32, payload: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&record_type.to_le_bytes());
        out.extend_from_slice(&((payload.len() + 8) as u32).to_le_bytes());
        out.extend_from_slice(payload);
        out
    }

    #[test]
    fn test_walks_records_in_order() {
        let mut data = raw_record(EMR_HEADER, &[0; 8]);
        data.extend(raw_record(EMR_SAVEDC, &[]));
        data.extend(raw_record(EMR_EOF, &[1, 2, 3, 4]));

        let records: Vec<_> = EmfRecordCursor::new(&data)
            .collect::<Result<_, _>>()
            .unwrap();

        assert_eq!(records.len(), 3);
        assert_eq!(records[0].record_type, EMR_HEADER);
        assert_eq!(records[1].offset, 16);
        assert_eq!(records[1].payload, &[] as &[u8]);
        assert_eq!(records[2].payload, &[1, 2, 3, 4]);

        let total: u32 = records.iter().map(|r| r.size).sum();
        assert_eq!(total as usize, data.len());
    }

    #[test]
    fn test_truncated_record_stops_the_cursor() {
        let mut data = raw_record(EMR_HEADER, &[0; 8]);
        let mut tail = raw_record(EMR_RECTANGLE, &[0; 16]);
        tail.truncate(12);
        data.extend(tail);

        let mut cursor = EmfRecordCursor::new(&data);
        assert!(cursor.next().unwrap().is_ok());

        let err = cursor.next().unwrap().unwrap_err();
        assert_eq!(
            err,
            DecodeError::Truncated {
                what: "EMF record",
                offset: 16,
                need: 24,
                have: 12,
            }
        );
        assert!(cursor.next().is_none());
        assert_eq!(cursor.offset(), 16);
        assert_eq!(cursor.records_read(), 1);
    }

    #[test]
    fn test_rejects_unaligned_sizes() {
        let mut data = raw_record(EMR_HEADER, &[0; 8]);
        data[4] = 15;
        let err = EmfRecordCursor::new(&data).next().unwrap().unwrap_err();
        assert!(matches!(err, DecodeError::InvalidRecordSize { size: 15, .. }));
    }

    #[test]
    fn test_comment_data() {
        let mut payload = Vec::new();
        payload.extend_from_slice(&8u32.to_le_bytes());
        payload.extend_from_slice(b"winetest");
        let data = raw_record(EMR_GDICOMMENT, &payload);

        let record = EmfRecordCursor::new(&data).next().unwrap().unwrap();
        assert_eq!(record.comment_data().unwrap(), Some(&b"winetest"[..]));

        let mut short = payload.clone();
        short[0] = 12;
        let data = raw_record(EMR_GDICOMMENT, &short);
        let record = EmfRecordCursor::new(&data).next().unwrap().unwrap();
        assert!(matches!(
            record.comment_data(),
            Err(DecodeError::Truncated { need: 12, have: 8, .. })
        ));
    }
}
