//! Adapters to the graphics library that owns metafile handles.
//!
//! The engine only ever needs the serialized bytes of a handle, and occasionally a new handle for
//! bytes it obtained elsewhere (a golden file, an embedded metafile).

use crate::emf_header::EmfHeader;
use crate::emf_record::EmfRecordCursor;
use crate::emfplus_object::EmbeddedMetafile;
use crate::err::{DecodeError, HandleError};

use std::borrow::Cow;

/// A metafile owned by the graphics library.
pub trait MetafileHandle {
    /// The serialized container. The bytes must not change while a check is running.
    fn raw_bytes(&self) -> Result<Cow<'_, [u8]>, HandleError>;
}

/// Builds metafile handles out of serialized containers.
pub trait MetafileFactory {
    type Handle: MetafileHandle;

    fn wrap_raw_bytes(&self, bytes: &[u8]) -> Result<Self::Handle, HandleError>;
}

impl<T: MetafileHandle + ?Sized> MetafileHandle for &T {
    fn raw_bytes(&self) -> Result<Cow<'_, [u8]>, HandleError> {
        (**self).raw_bytes()
    }
}

/// An in-memory metafile.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EmfBuffer {
    bytes: Vec<u8>,
}

impl EmfBuffer {
    pub fn new(bytes: Vec<u8>) -> Self {
        EmfBuffer { bytes }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

impl From<Vec<u8>> for EmfBuffer {
    fn from(bytes: Vec<u8>) -> Self {
        EmfBuffer::new(bytes)
    }
}

impl MetafileHandle for EmfBuffer {
    fn raw_bytes(&self) -> Result<Cow<'_, [u8]>, HandleError> {
        Ok(Cow::Borrowed(&self.bytes))
    }
}

/// Wraps buffers into [`EmfBuffer`]s, after checking that they start with a valid `EMR_HEADER`.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmfBufferFactory;

impl MetafileFactory for EmfBufferFactory {
    type Handle = EmfBuffer;

    fn wrap_raw_bytes(&self, bytes: &[u8]) -> Result<EmfBuffer, HandleError> {
        let first = EmfRecordCursor::new(bytes)
            .next()
            .unwrap_or(Err(DecodeError::Truncated {
                what: "EMR_HEADER",
                offset: 0,
                need: 8,
                have: 0,
            }))
            .map_err(|source| HandleError::NotAMetafile { source })?;

        EmfHeader::from_record(&first).map_err(|source| HandleError::NotAMetafile { source })?;

        Ok(EmfBuffer::new(bytes.to_vec()))
    }
}

impl<'a> EmbeddedMetafile<'a> {
    /// Hands the embedded container back to the graphics library as a handle of its own.
    pub fn to_handle<F: MetafileFactory>(&self, factory: &F) -> Result<F::Handle, HandleError> {
        factory.wrap_raw_bytes(self.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emf_writer::EmfWriter;

    #[test]
    fn test_factory_wraps_valid_containers() {
        let data = EmfWriter::new().finish();
        let handle = EmfBufferFactory.wrap_raw_bytes(&data).unwrap();

        assert_eq!(handle.raw_bytes().unwrap().as_ref(), data.as_slice());
    }

    #[test]
    fn test_factory_rejects_other_buffers() {
        assert!(matches!(
            EmfBufferFactory.wrap_raw_bytes(&[]),
            Err(HandleError::NotAMetafile {
                source: DecodeError::Truncated { .. }
            })
        ));

        let mut data = EmfWriter::new().finish();
        data[0] = 2;
        assert!(matches!(
            EmfBufferFactory.wrap_raw_bytes(&data),
            Err(HandleError::NotAMetafile {
                source: DecodeError::MissingHeader { found: 2 }
            })
        ));
    }
}
