use crate::err::DecodeResult;
use crate::utils::bytes;

/// Sequential reader over a record's bytes. Every read names the field it decodes, so a
/// truncation error says what was being read and where.
///
/// A failed read leaves the position untouched.
#[derive(Clone, Copy, Debug)]
pub(crate) struct ByteCursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    pub(crate) fn new(buf: &'a [u8]) -> Self {
        ByteCursor { buf, pos: 0 }
    }

    /// A cursor starting at `pos`, which may be the end of `buf` but not past it.
    pub(crate) fn with_pos(buf: &'a [u8], pos: usize) -> DecodeResult<Self> {
        bytes::slice_r(buf, pos, 0, "cursor position")?;
        Ok(ByteCursor { buf, pos })
    }

    pub(crate) fn pos(&self) -> usize {
        self.pos
    }

    pub(crate) fn remaining(&self) -> usize {
        self.buf.len().saturating_sub(self.pos)
    }

    pub(crate) fn bytes(&mut self, len: usize, what: &'static str) -> DecodeResult<&'a [u8]> {
        let out = bytes::slice_r(self.buf, self.pos, len, what)?;
        self.pos += len;
        Ok(out)
    }

    pub(crate) fn u16(&mut self, what: &'static str) -> DecodeResult<u16> {
        let v = bytes::u16_at(self.buf, self.pos, what)?;
        self.pos += 2;
        Ok(v)
    }

    pub(crate) fn u32(&mut self, what: &'static str) -> DecodeResult<u32> {
        let v = bytes::u32_at(self.buf, self.pos, what)?;
        self.pos += 4;
        Ok(v)
    }

    pub(crate) fn i32(&mut self, what: &'static str) -> DecodeResult<i32> {
        let v = bytes::i32_at(self.buf, self.pos, what)?;
        self.pos += 4;
        Ok(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_reads_and_advances() {
        let buf = [0x08, 0x40, 0x00, 0x05, 0x10, 0, 0, 0, 0xaa, 0xbb];
        let mut cursor = ByteCursor::new(&buf);

        assert_eq!(cursor.u16("type").unwrap(), 0x4008);
        assert_eq!(cursor.u16("flags").unwrap(), 0x0500);
        assert_eq!(cursor.u32("size").unwrap(), 16);
        assert_eq!(cursor.remaining(), 2);
        assert_eq!(cursor.bytes(2, "data").unwrap(), &[0xaa, 0xbb]);
        assert_eq!(cursor.remaining(), 0);
    }

    #[test]
    fn test_failed_read_keeps_position() {
        let buf = [1u8, 2, 3];
        let mut cursor = ByteCursor::with_pos(&buf, 1).unwrap();

        assert!(cursor.u32("value").is_err());
        assert_eq!(cursor.pos(), 1);
        assert!(cursor.bytes(3, "rest").is_err());
        assert_eq!(cursor.pos(), 1);
        assert!(ByteCursor::with_pos(&buf, 4).is_err());
    }
}
