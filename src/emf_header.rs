use crate::emf_record::{EMR_RECORD_HEADER_SIZE, EmfRecord};
use crate::emfplus_record::EmfPlusRecord;
use crate::err::{DecodeError, DecodeResult};
use crate::record_types::{EMFPLUS_HEADER, EMR_HEADER};
use crate::utils::{ByteCursor, bytes};

use bitflags::bitflags;
use serde::Serialize;

/// `" EMF"` as a little-endian `u32`.
pub const ENHMETA_SIGNATURE: u32 = 0x464D_4520;

/// Size of the fixed part of `ENHMETAHEADER`, record header included.
pub const EMR_HEADER_MIN_SIZE: usize = 88;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct RectL {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SizeL {
    pub cx: i32,
    pub cy: i32,
}

/// The fixed part of an `EMR_HEADER` record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmfHeader {
    pub bounds: RectL,
    /// In .01 millimeter units.
    pub frame: RectL,
    pub signature: u32,
    pub version: u32,
    /// Declared size of the whole container, in bytes.
    pub bytes: u32,
    /// Declared number of records in the container.
    pub records: u32,
    pub handles: u16,
    pub description_len: u32,
    pub description_offset: u32,
    pub palette_entries: u32,
    pub device: SizeL,
    pub millimeters: SizeL,
}

fn read_rect(cursor: &mut ByteCursor<'_>, what: &'static str) -> DecodeResult<RectL> {
    Ok(RectL {
        left: cursor.i32(what)?,
        top: cursor.i32(what)?,
        right: cursor.i32(what)?,
        bottom: cursor.i32(what)?,
    })
}

fn read_size(cursor: &mut ByteCursor<'_>, what: &'static str) -> DecodeResult<SizeL> {
    Ok(SizeL {
        cx: cursor.i32(what)?,
        cy: cursor.i32(what)?,
    })
}

impl EmfHeader {
    /// Parses the header out of the first record of a container.
    pub fn from_record(record: &EmfRecord<'_>) -> DecodeResult<EmfHeader> {
        if record.record_type != EMR_HEADER {
            return Err(DecodeError::MissingHeader {
                found: record.record_type,
            });
        }

        let _ = bytes::slice_r(
            record.payload,
            0,
            EMR_HEADER_MIN_SIZE - EMR_RECORD_HEADER_SIZE,
            "EMR_HEADER",
        )?;

        let mut cursor = ByteCursor::new(record.payload);
        let bounds = read_rect(&mut cursor, "EMR_HEADER.rclBounds")?;
        let frame = read_rect(&mut cursor, "EMR_HEADER.rclFrame")?;
        let signature = cursor.u32("EMR_HEADER.dSignature")?;

        if signature != ENHMETA_SIGNATURE {
            return Err(DecodeError::InvalidSignature { found: signature });
        }

        let version = cursor.u32("EMR_HEADER.nVersion")?;
        let bytes = cursor.u32("EMR_HEADER.nBytes")?;
        let records = cursor.u32("EMR_HEADER.nRecords")?;
        let handles = cursor.u16("EMR_HEADER.nHandles")?;
        cursor.bytes(2, "EMR_HEADER.sReserved")?;
        let description_len = cursor.u32("EMR_HEADER.nDescription")?;
        let description_offset = cursor.u32("EMR_HEADER.offDescription")?;
        let palette_entries = cursor.u32("EMR_HEADER.nPalEntries")?;
        let device = read_size(&mut cursor, "EMR_HEADER.szlDevice")?;
        let millimeters = read_size(&mut cursor, "EMR_HEADER.szlMillimeters")?;

        Ok(EmfHeader {
            bounds,
            frame,
            signature,
            version,
            bytes,
            records,
            handles,
            description_len,
            description_offset,
            palette_entries,
            device,
            millimeters,
        })
    }

    /// Checks `nBytes` against the container length.
    pub fn validate_size(&self, container_len: usize) -> DecodeResult<()> {
        if self.bytes as usize != container_len {
            return Err(DecodeError::HeaderMismatch {
                field: "nBytes",
                declared: u64::from(self.bytes),
                actual: container_len as u64,
            });
        }
        Ok(())
    }

    /// Checks `nRecords` against the number of records that were decoded.
    pub fn validate_record_count(&self, records: usize) -> DecodeResult<()> {
        if self.records as usize != records {
            return Err(DecodeError::HeaderMismatch {
                field: "nRecords",
                declared: u64::from(self.records),
                actual: records as u64,
            });
        }
        Ok(())
    }
}

bitflags! {
    /// Flags of the `EMFPLUS_HEADER` record itself.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct EmfPlusHeaderFlags: u16 {
        /// The metafile also carries an equivalent EMF-only rendering ("EMF+ dual").
        const DUAL = 0x0001;
    }
}

bitflags! {
    /// `EmfPlusFlags` field of the `EMFPLUS_HEADER` record data.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct EmfPlusFlags: u32 {
        /// The reference device was a video display (as opposed to a printer).
        const VIDEO_DISPLAY = 0x0000_0001;
    }
}

/// Graphics version `0xdbc01001` or `0xdbc01002` as written by GDI+.
pub const EMFPLUS_GRAPHICS_VERSION_MASK: u32 = 0xffff_f000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmfPlusHeader {
    pub version: u32,
    #[serde(serialize_with = "serialize_bits_u16")]
    pub header_flags: EmfPlusHeaderFlags,
    #[serde(serialize_with = "serialize_bits_u32")]
    pub emfplus_flags: EmfPlusFlags,
    pub logical_dpi_x: u32,
    pub logical_dpi_y: u32,
}

fn serialize_bits_u16<S: serde::Serializer>(
    flags: &EmfPlusHeaderFlags,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_u16(flags.bits())
}

fn serialize_bits_u32<S: serde::Serializer>(
    flags: &EmfPlusFlags,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_u32(flags.bits())
}

impl EmfPlusHeader {
    pub fn from_record(record: &EmfPlusRecord<'_>) -> DecodeResult<Option<EmfPlusHeader>> {
        if u32::from(record.record_type) != EMFPLUS_HEADER {
            return Ok(None);
        }
        EmfPlusHeader::from_data(record.flags, record.data).map(Some)
    }

    /// Decodes the data of an `EMFPLUS_HEADER` record carrying `flags`.
    pub fn from_data(flags: u16, data: &[u8]) -> DecodeResult<EmfPlusHeader> {
        let mut cursor = ByteCursor::new(data);
        let version = cursor.u32("EMFPLUS_HEADER.Version")?;
        let emfplus_flags = cursor.u32("EMFPLUS_HEADER.EmfPlusFlags")?;
        let logical_dpi_x = cursor.u32("EMFPLUS_HEADER.LogicalDpiX")?;
        let logical_dpi_y = cursor.u32("EMFPLUS_HEADER.LogicalDpiY")?;

        Ok(EmfPlusHeader {
            version,
            header_flags: EmfPlusHeaderFlags::from_bits_retain(flags),
            emfplus_flags: EmfPlusFlags::from_bits_retain(emfplus_flags),
            logical_dpi_x,
            logical_dpi_y,
        })
    }

    pub fn is_dual(&self) -> bool {
        self.header_flags.contains(EmfPlusHeaderFlags::DUAL)
    }

    pub fn is_video_display(&self) -> bool {
        self.emfplus_flags.contains(EmfPlusFlags::VIDEO_DISPLAY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emf_record::EmfRecordCursor;
    use crate::emf_writer::EmfWriter;

    #[test]
    fn test_parses_written_header() {
        let data = EmfWriter::new()
            .bounds(RectL {
                left: 0,
                top: 0,
                right: 99,
                bottom: 99,
            })
            .finish();

        let record = EmfRecordCursor::new(&data).next().unwrap().unwrap();
        let header = EmfHeader::from_record(&record).unwrap();

        assert_eq!(header.signature, ENHMETA_SIGNATURE);
        assert_eq!(header.bounds.right, 99);
        assert_eq!(header.records, 2);
        assert!(header.validate_size(data.len()).is_ok());
        assert!(header.validate_record_count(2).is_ok());
        assert_eq!(
            header.validate_record_count(3),
            Err(DecodeError::HeaderMismatch {
                field: "nRecords",
                declared: 2,
                actual: 3,
            })
        );
    }

    #[test]
    fn test_rejects_bad_signature() {
        let mut data = EmfWriter::new().finish();
        data[40] = b'X';

        let record = EmfRecordCursor::new(&data).next().unwrap().unwrap();
        assert!(matches!(
            EmfHeader::from_record(&record),
            Err(DecodeError::InvalidSignature { .. })
        ));
    }

    #[test]
    fn test_parses_emfplus_header() {
        let mut data = Vec::new();
        data.extend_from_slice(&0xdbc0_1002u32.to_le_bytes());
        data.extend_from_slice(&1u32.to_le_bytes());
        data.extend_from_slice(&96u32.to_le_bytes());
        data.extend_from_slice(&96u32.to_le_bytes());

        let record = EmfPlusRecord {
            offset: 4,
            record_type: EMFPLUS_HEADER as u16,
            flags: 1,
            size: 28,
            data_size: 16,
            data: &data,
        };

        let header = EmfPlusHeader::from_record(&record).unwrap().unwrap();
        assert!(header.is_dual());
        assert!(header.is_video_display());
        assert_eq!(header.logical_dpi_x, 96);
        assert_eq!(header.version & EMFPLUS_GRAPHICS_VERSION_MASK, 0xdbc0_1000);

        assert!(matches!(
            EmfPlusHeader::from_data(0, &data[..12]),
            Err(DecodeError::Truncated {
                what: "EMFPLUS_HEADER.LogicalDpiY",
                ..
            })
        ));
    }
}
