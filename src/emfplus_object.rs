use crate::emfplus_record::{EMFPLUS_RECORD_HEADER_SIZE, EmfPlusRecord, ObjectType};
use crate::err::{DecodeError, DecodeResult};
use crate::utils::ByteCursor;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ImageDataType {
    Unknown,
    Bitmap,
    Metafile,
}

impl ImageDataType {
    pub fn from_u32(value: u32) -> Option<ImageDataType> {
        Some(match value {
            0 => ImageDataType::Unknown,
            1 => ImageDataType::Bitmap,
            2 => ImageDataType::Metafile,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MetafileType {
    Wmf,
    WmfPlaceable,
    Emf,
    EmfPlusOnly,
    EmfPlusDual,
}

impl MetafileType {
    pub fn from_u32(value: u32) -> Option<MetafileType> {
        Some(match value {
            1 => MetafileType::Wmf,
            2 => MetafileType::WmfPlaceable,
            3 => MetafileType::Emf,
            4 => MetafileType::EmfPlusOnly,
            5 => MetafileType::EmfPlusDual,
            _ => return None,
        })
    }

    pub fn as_u32(self) -> u32 {
        match self {
            MetafileType::Wmf => 1,
            MetafileType::WmfPlaceable => 2,
            MetafileType::Emf => 3,
            MetafileType::EmfPlusOnly => 4,
            MetafileType::EmfPlusDual => 5,
        }
    }

    /// Whether the payload is an enhanced metafile that can be walked like the outer container.
    pub fn is_enhanced(self) -> bool {
        matches!(
            self,
            MetafileType::Emf | MetafileType::EmfPlusOnly | MetafileType::EmfPlusDual
        )
    }
}

/// A metafile serialized inside an `EMFPLUS_OBJECT` image record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmbeddedMetafile<'a> {
    pub object_id: u8,
    pub image_version: u32,
    pub metafile_type: Option<MetafileType>,
    pub raw_metafile_type: u32,
    /// Offset of `data` relative to the comment data that carries the object record.
    pub data_offset: usize,
    pub data: &'a [u8],
}

impl<'a> EmbeddedMetafile<'a> {
    /// Extracts the embedded metafile of an image object record.
    ///
    /// Returns `Ok(None)` for every record that is not an image object holding a metafile,
    /// including continued objects, whose data is only a fragment of the image.
    pub fn from_record(record: &EmfPlusRecord<'a>) -> DecodeResult<Option<EmbeddedMetafile<'a>>> {
        if record.object_type() != Some(ObjectType::Image) || record.is_continued_object() {
            return Ok(None);
        }

        let mut cursor = ByteCursor::new(record.data);
        let image_version = cursor.u32("EmfPlusImage.Version")?;
        let image_type = cursor.u32("EmfPlusImage.Type")?;

        if ImageDataType::from_u32(image_type) != Some(ImageDataType::Metafile) {
            return Ok(None);
        }

        let raw_metafile_type = cursor.u32("EmfPlusMetafile.Type")?;
        let data_size = cursor.u32("EmfPlusMetafile.MetafileDataSize")? as usize;

        let data_offset = record.offset + EMFPLUS_RECORD_HEADER_SIZE + cursor.pos();
        let data = cursor
            .bytes(data_size, "EmfPlusMetafile.MetafileData")
            .map_err(|_| DecodeError::Truncated {
                what: "EmfPlusMetafile.MetafileData",
                offset: data_offset as u64,
                need: data_size,
                have: cursor.remaining(),
            })?;

        Ok(Some(EmbeddedMetafile {
            object_id: record.object_id(),
            image_version,
            metafile_type: MetafileType::from_u32(raw_metafile_type),
            raw_metafile_type,
            data_offset,
            data,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record_types::EMFPLUS_OBJECT;

    fn image_object(image_type: u32, metafile: &[u8], declared_len: u32) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(&0xdbc0_1002u32.to_le_bytes());
        data.extend_from_slice(&image_type.to_le_bytes());
        data.extend_from_slice(&3u32.to_le_bytes());
        data.extend_from_slice(&declared_len.to_le_bytes());
        data.extend_from_slice(metafile);
        data
    }

    fn record<'a>(flags: u16, data: &'a [u8]) -> EmfPlusRecord<'a> {
        EmfPlusRecord {
            offset: 4,
            record_type: EMFPLUS_OBJECT as u16,
            flags,
            size: data.len() as u32 + 12,
            data_size: data.len() as u32,
            data,
        }
    }

    #[test]
    fn test_extracts_embedded_metafile() {
        let data = image_object(2, &[0xaa; 8], 8);
        let embedded = EmbeddedMetafile::from_record(&record(0x0501, &data))
            .unwrap()
            .unwrap();

        assert_eq!(embedded.object_id, 1);
        assert_eq!(embedded.metafile_type, Some(MetafileType::Emf));
        assert_eq!(embedded.data, &[0xaa; 8]);
        assert_eq!(embedded.data_offset, 4 + 12 + 16);
    }

    #[test]
    fn test_ignores_other_objects() {
        let data = image_object(1, &[0xaa; 8], 8);
        assert_eq!(
            EmbeddedMetafile::from_record(&record(0x0500, &data)).unwrap(),
            None
        );

        let data = image_object(2, &[0xaa; 8], 8);
        assert_eq!(
            EmbeddedMetafile::from_record(&record(0x0200, &data)).unwrap(),
            None
        );
        assert_eq!(
            EmbeddedMetafile::from_record(&record(0x8500, &data)).unwrap(),
            None
        );
    }

    #[test]
    fn test_overstated_metafile_size_is_truncation() {
        let data = image_object(2, &[0xaa; 8], 64);
        let err = EmbeddedMetafile::from_record(&record(0x0500, &data)).unwrap_err();

        assert_eq!(
            err,
            DecodeError::Truncated {
                what: "EmfPlusMetafile.MetafileData",
                offset: 32,
                need: 64,
                have: 8,
            }
        );
    }
}
