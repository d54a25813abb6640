//! A record-level assembler for EMF/EMF+ containers.
//!
//! This writes records exactly as it is told to; it does not translate drawing calls. It is used
//! to build fixtures and by tooling that needs to re-frame records.

use crate::emf_header::{ENHMETA_SIGNATURE, EMR_HEADER_MIN_SIZE, RectL, SizeL};
use crate::emfplus_object::MetafileType;
use crate::emfplus_record::{EMFPLUS_RECORD_HEADER_SIZE, EMFPLUS_SIGNATURE};
use crate::record_types::{EMFPLUS_OBJECT, EMR_EOF, EMR_GDICOMMENT, EMR_HEADER};

use byteorder::{ByteOrder, LittleEndian};

/// `EmfPlusGraphicsVersion` written into object records.
pub const EMFPLUS_WRITER_VERSION: u32 = 0xdbc0_1002;

const NBYTES_OFFSET: usize = 48;
const NRECORDS_OFFSET: usize = 52;

fn put_u16(out: &mut Vec<u8>, v: u16) {
    let at = out.len();
    out.resize(at + 2, 0);
    LittleEndian::write_u16(&mut out[at..], v);
}

fn put_u32(out: &mut Vec<u8>, v: u32) {
    let at = out.len();
    out.resize(at + 4, 0);
    LittleEndian::write_u32(&mut out[at..], v);
}

fn put_i32(out: &mut Vec<u8>, v: i32) {
    let at = out.len();
    out.resize(at + 4, 0);
    LittleEndian::write_i32(&mut out[at..], v);
}

fn pad4(out: &mut Vec<u8>) {
    while out.len() % 4 != 0 {
        out.push(0);
    }
}

/// Builds one EMF+ record with a consistent `Size`/`DataSize` pair.
pub fn emfplus_record_bytes(record_type: u32, flags: u16, data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(EMFPLUS_RECORD_HEADER_SIZE + data.len());
    put_u16(&mut out, record_type as u16);
    put_u16(&mut out, flags);
    put_u32(&mut out, (EMFPLUS_RECORD_HEADER_SIZE + data.len()) as u32);
    put_u32(&mut out, data.len() as u32);
    out.extend_from_slice(data);
    out
}

/// The data of an `EMFPLUS_OBJECT` image record holding a serialized metafile.
pub fn metafile_image_data(metafile_type: MetafileType, metafile: &[u8]) -> Vec<u8> {
    let mut data = Vec::with_capacity(16 + metafile.len());
    put_u32(&mut data, EMFPLUS_WRITER_VERSION);
    // ImageDataTypeMetafile
    put_u32(&mut data, 2);
    put_u32(&mut data, metafile_type.as_u32());
    put_u32(&mut data, metafile.len() as u32);
    data.extend_from_slice(metafile);
    pad4(&mut data);
    data
}

#[derive(Debug, Clone)]
pub struct EmfWriter {
    bounds: RectL,
    frame: RectL,
    device: SizeL,
    millimeters: SizeL,
    body: Vec<u8>,
    records: u32,
    pending_emfplus: Vec<u8>,
}

impl Default for EmfWriter {
    fn default() -> Self {
        EmfWriter::new()
    }
}

impl EmfWriter {
    pub fn new() -> Self {
        EmfWriter {
            bounds: RectL::default(),
            frame: RectL::default(),
            device: SizeL { cx: 1024, cy: 768 },
            millimeters: SizeL { cx: 320, cy: 240 },
            body: Vec::new(),
            records: 0,
            pending_emfplus: Vec::new(),
        }
    }

    pub fn bounds(&mut self, bounds: RectL) -> &mut Self {
        self.bounds = bounds;
        self
    }

    pub fn frame(&mut self, frame: RectL) -> &mut Self {
        self.frame = frame;
        self
    }

    /// Appends an EMF record. The payload is padded to a multiple of 4 bytes.
    pub fn record(&mut self, record_type: u32, payload: &[u8]) -> &mut Self {
        self.flush_emfplus();
        self.push_record(record_type, payload);
        self
    }

    /// Appends an `EMR_GDICOMMENT` record carrying `data` verbatim.
    pub fn comment(&mut self, data: &[u8]) -> &mut Self {
        self.flush_emfplus();
        self.push_comment(data);
        self
    }

    /// Queues an EMF+ record. Consecutive EMF+ records share one comment record.
    pub fn emfplus(&mut self, record_type: u32, flags: u16, data: &[u8]) -> &mut Self {
        let bytes = emfplus_record_bytes(record_type, flags, data);
        self.emfplus_raw(&bytes)
    }

    /// Queues raw bytes into the pending EMF+ comment, without any framing checks.
    pub fn emfplus_raw(&mut self, bytes: &[u8]) -> &mut Self {
        self.pending_emfplus.extend_from_slice(bytes);
        self
    }

    /// Queues an image object record that embeds `metafile`.
    pub fn embedded_metafile(
        &mut self,
        object_id: u8,
        metafile_type: MetafileType,
        metafile: &[u8],
    ) -> &mut Self {
        // ObjectTypeImage
        let flags = (5u16 << 8) | u16::from(object_id);
        let data = metafile_image_data(metafile_type, metafile);
        self.emfplus(EMFPLUS_OBJECT, flags, &data)
    }

    /// Closes the pending EMF+ comment, so that following EMF+ records start a new one.
    pub fn flush_emfplus(&mut self) -> &mut Self {
        if !self.pending_emfplus.is_empty() {
            let mut data = EMFPLUS_SIGNATURE.to_vec();
            data.append(&mut self.pending_emfplus);
            self.push_comment(&data);
        }
        self
    }

    /// Appends `EMR_EOF` and returns the container with `nBytes`/`nRecords` filled in.
    pub fn finish(&mut self) -> Vec<u8> {
        self.flush_emfplus();

        let mut eof = Vec::with_capacity(12);
        // nPalEntries, offPalEntries, nSizeLast
        put_u32(&mut eof, 0);
        put_u32(&mut eof, 16);
        put_u32(&mut eof, 20);
        self.push_record(EMR_EOF, &eof);

        self.assemble()
    }

    /// Like [`EmfWriter::finish`], without appending `EMR_EOF`.
    pub fn finish_without_eof(&mut self) -> Vec<u8> {
        self.flush_emfplus();
        self.assemble()
    }

    fn assemble(&self) -> Vec<u8> {
        let mut out = self.header_record();
        out.extend_from_slice(&self.body);

        let total = out.len() as u32;
        LittleEndian::write_u32(&mut out[NBYTES_OFFSET..], total);
        LittleEndian::write_u32(&mut out[NRECORDS_OFFSET..], self.records + 1);
        out
    }

    fn push_record(&mut self, record_type: u32, payload: &[u8]) {
        let padded = (payload.len() + 3) & !3;
        put_u32(&mut self.body, record_type);
        put_u32(&mut self.body, (8 + padded) as u32);
        self.body.extend_from_slice(payload);
        pad4(&mut self.body);
        self.records += 1;
    }

    fn push_comment(&mut self, data: &[u8]) {
        let mut payload = Vec::with_capacity(4 + data.len());
        put_u32(&mut payload, data.len() as u32);
        payload.extend_from_slice(data);
        self.push_record(EMR_GDICOMMENT, &payload);
    }

    fn header_record(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(EMR_HEADER_MIN_SIZE);
        put_u32(&mut out, EMR_HEADER);
        put_u32(&mut out, EMR_HEADER_MIN_SIZE as u32);
        for rect in [self.bounds, self.frame] {
            put_i32(&mut out, rect.left);
            put_i32(&mut out, rect.top);
            put_i32(&mut out, rect.right);
            put_i32(&mut out, rect.bottom);
        }
        put_u32(&mut out, ENHMETA_SIGNATURE);
        // nVersion
        put_u32(&mut out, 0x10000);
        // nBytes, nRecords: patched in `assemble`
        put_u32(&mut out, 0);
        put_u32(&mut out, 0);
        // nHandles, sReserved
        put_u16(&mut out, 1);
        put_u16(&mut out, 0);
        // nDescription, offDescription, nPalEntries
        put_u32(&mut out, 0);
        put_u32(&mut out, 0);
        put_u32(&mut out, 0);
        for size in [self.device, self.millimeters] {
            put_i32(&mut out, size.cx);
            put_i32(&mut out, size.cy);
        }
        out
    }
}
