//! Record type identifiers for EMF (`EMR_*`) and EMF+ (`EMFPLUS_*`) records.
//!
//! Both families share a single `u32` namespace in the logical record stream: EMF record types
//! are small integers (1..=122), EMF+ record types start at `0x4000`.

use serde::{Serialize, Serializer};
use std::fmt;

macro_rules! record_types {
    ($table:ident; $( $name:ident = $value:expr ),* $(,)?) => {
        $( pub const $name: u32 = $value; )*

        const $table: &[(u32, &str)] = &[ $( ($value, stringify!($name)) ),* ];
    };
}

record_types! { EMF_RECORD_NAMES;
    EMR_HEADER = 1,
    EMR_POLYBEZIER = 2,
    EMR_POLYGON = 3,
    EMR_POLYLINE = 4,
    EMR_POLYBEZIERTO = 5,
    EMR_POLYLINETO = 6,
    EMR_POLYPOLYLINE = 7,
    EMR_POLYPOLYGON = 8,
    EMR_SETWINDOWEXTEX = 9,
    EMR_SETWINDOWORGEX = 10,
    EMR_SETVIEWPORTEXTEX = 11,
    EMR_SETVIEWPORTORGEX = 12,
    EMR_SETBRUSHORGEX = 13,
    EMR_EOF = 14,
    EMR_SETPIXELV = 15,
    EMR_SETMAPPERFLAGS = 16,
    EMR_SETMAPMODE = 17,
    EMR_SETBKMODE = 18,
    EMR_SETPOLYFILLMODE = 19,
    EMR_SETROP2 = 20,
    EMR_SETSTRETCHBLTMODE = 21,
    EMR_SETTEXTALIGN = 22,
    EMR_SETCOLORADJUSTMENT = 23,
    EMR_SETTEXTCOLOR = 24,
    EMR_SETBKCOLOR = 25,
    EMR_OFFSETCLIPRGN = 26,
    EMR_MOVETOEX = 27,
    EMR_SETMETARGN = 28,
    EMR_EXCLUDECLIPRECT = 29,
    EMR_INTERSECTCLIPRECT = 30,
    EMR_SCALEVIEWPORTEXTEX = 31,
    EMR_SCALEWINDOWEXTEX = 32,
    EMR_SAVEDC = 33,
    EMR_RESTOREDC = 34,
    EMR_SETWORLDTRANSFORM = 35,
    EMR_MODIFYWORLDTRANSFORM = 36,
    EMR_SELECTOBJECT = 37,
    EMR_CREATEPEN = 38,
    EMR_CREATEBRUSHINDIRECT = 39,
    EMR_DELETEOBJECT = 40,
    EMR_ANGLEARC = 41,
    EMR_ELLIPSE = 42,
    EMR_RECTANGLE = 43,
    EMR_ROUNDRECT = 44,
    EMR_ARC = 45,
    EMR_CHORD = 46,
    EMR_PIE = 47,
    EMR_SELECTPALETTE = 48,
    EMR_CREATEPALETTE = 49,
    EMR_SETPALETTEENTRIES = 50,
    EMR_RESIZEPALETTE = 51,
    EMR_REALIZEPALETTE = 52,
    EMR_EXTFLOODFILL = 53,
    EMR_LINETO = 54,
    EMR_ARCTO = 55,
    EMR_POLYDRAW = 56,
    EMR_SETARCDIRECTION = 57,
    EMR_SETMITERLIMIT = 58,
    EMR_BEGINPATH = 59,
    EMR_ENDPATH = 60,
    EMR_CLOSEFIGURE = 61,
    EMR_FILLPATH = 62,
    EMR_STROKEANDFILLPATH = 63,
    EMR_STROKEPATH = 64,
    EMR_FLATTENPATH = 65,
    EMR_WIDENPATH = 66,
    EMR_SELECTCLIPPATH = 67,
    EMR_ABORTPATH = 68,
    EMR_GDICOMMENT = 70,
    EMR_FILLRGN = 71,
    EMR_FRAMERGN = 72,
    EMR_INVERTRGN = 73,
    EMR_PAINTRGN = 74,
    EMR_EXTSELECTCLIPRGN = 75,
    EMR_BITBLT = 76,
    EMR_STRETCHBLT = 77,
    EMR_MASKBLT = 78,
    EMR_PLGBLT = 79,
    EMR_SETDIBITSTODEVICE = 80,
    EMR_STRETCHDIBITS = 81,
    EMR_EXTCREATEFONTINDIRECTW = 82,
    EMR_EXTTEXTOUTA = 83,
    EMR_EXTTEXTOUTW = 84,
    EMR_POLYBEZIER16 = 85,
    EMR_POLYGON16 = 86,
    EMR_POLYLINE16 = 87,
    EMR_POLYBEZIERTO16 = 88,
    EMR_POLYLINETO16 = 89,
    EMR_POLYPOLYLINE16 = 90,
    EMR_POLYPOLYGON16 = 91,
    EMR_POLYDRAW16 = 92,
    EMR_CREATEMONOBRUSH = 93,
    EMR_CREATEDIBPATTERNBRUSHPT = 94,
    EMR_EXTCREATEPEN = 95,
    EMR_POLYTEXTOUTA = 96,
    EMR_POLYTEXTOUTW = 97,
    EMR_SETICMMODE = 98,
    EMR_CREATECOLORSPACE = 99,
    EMR_SETCOLORSPACE = 100,
    EMR_DELETECOLORSPACE = 101,
    EMR_GLSRECORD = 102,
    EMR_GLSBOUNDEDRECORD = 103,
    EMR_PIXELFORMAT = 104,
    EMR_DRAWESCAPE = 105,
    EMR_EXTESCAPE = 106,
    EMR_STARTDOC = 107,
    EMR_SMALLTEXTOUT = 108,
    EMR_FORCEUFIMAPPING = 109,
    EMR_NAMEDESCAPE = 110,
    EMR_COLORCORRECTPALETTE = 111,
    EMR_SETICMPROFILEA = 112,
    EMR_SETICMPROFILEW = 113,
    EMR_ALPHABLEND = 114,
    EMR_SETLAYOUT = 115,
    EMR_TRANSPARENTBLT = 116,
    EMR_RESERVED_117 = 117,
    EMR_GRADIENTFILL = 118,
    EMR_SETLINKEDUFI = 119,
    EMR_SETTEXTJUSTIFICATION = 120,
    EMR_COLORMATCHTOTARGETW = 121,
    EMR_CREATECOLORSPACEW = 122,
}

record_types! { EMFPLUS_RECORD_NAMES;
    EMFPLUS_INVALID = 0x4000,
    EMFPLUS_HEADER = 0x4001,
    EMFPLUS_END_OF_FILE = 0x4002,
    EMFPLUS_COMMENT = 0x4003,
    EMFPLUS_GET_DC = 0x4004,
    EMFPLUS_MULTI_FORMAT_START = 0x4005,
    EMFPLUS_MULTI_FORMAT_SECTION = 0x4006,
    EMFPLUS_MULTI_FORMAT_END = 0x4007,
    EMFPLUS_OBJECT = 0x4008,
    EMFPLUS_CLEAR = 0x4009,
    EMFPLUS_FILL_RECTS = 0x400A,
    EMFPLUS_DRAW_RECTS = 0x400B,
    EMFPLUS_FILL_POLYGON = 0x400C,
    EMFPLUS_DRAW_LINES = 0x400D,
    EMFPLUS_FILL_ELLIPSE = 0x400E,
    EMFPLUS_DRAW_ELLIPSE = 0x400F,
    EMFPLUS_FILL_PIE = 0x4010,
    EMFPLUS_DRAW_PIE = 0x4011,
    EMFPLUS_DRAW_ARC = 0x4012,
    EMFPLUS_FILL_REGION = 0x4013,
    EMFPLUS_FILL_PATH = 0x4014,
    EMFPLUS_DRAW_PATH = 0x4015,
    EMFPLUS_FILL_CLOSED_CURVE = 0x4016,
    EMFPLUS_DRAW_CLOSED_CURVE = 0x4017,
    EMFPLUS_DRAW_CURVE = 0x4018,
    EMFPLUS_DRAW_BEZIERS = 0x4019,
    EMFPLUS_DRAW_IMAGE = 0x401A,
    EMFPLUS_DRAW_IMAGE_POINTS = 0x401B,
    EMFPLUS_DRAW_STRING = 0x401C,
    EMFPLUS_SET_RENDERING_ORIGIN = 0x401D,
    EMFPLUS_SET_ANTI_ALIAS_MODE = 0x401E,
    EMFPLUS_SET_TEXT_RENDERING_HINT = 0x401F,
    EMFPLUS_SET_TEXT_CONTRAST = 0x4020,
    EMFPLUS_SET_INTERPOLATION_MODE = 0x4021,
    EMFPLUS_SET_PIXEL_OFFSET_MODE = 0x4022,
    EMFPLUS_SET_COMPOSITING_MODE = 0x4023,
    EMFPLUS_SET_COMPOSITING_QUALITY = 0x4024,
    EMFPLUS_SAVE = 0x4025,
    EMFPLUS_RESTORE = 0x4026,
    EMFPLUS_BEGIN_CONTAINER = 0x4027,
    EMFPLUS_BEGIN_CONTAINER_NO_PARAMS = 0x4028,
    EMFPLUS_END_CONTAINER = 0x4029,
    EMFPLUS_SET_WORLD_TRANSFORM = 0x402A,
    EMFPLUS_RESET_WORLD_TRANSFORM = 0x402B,
    EMFPLUS_MULTIPLY_WORLD_TRANSFORM = 0x402C,
    EMFPLUS_TRANSLATE_WORLD_TRANSFORM = 0x402D,
    EMFPLUS_SCALE_WORLD_TRANSFORM = 0x402E,
    EMFPLUS_ROTATE_WORLD_TRANSFORM = 0x402F,
    EMFPLUS_SET_PAGE_TRANSFORM = 0x4030,
    EMFPLUS_RESET_CLIP = 0x4031,
    EMFPLUS_SET_CLIP_RECT = 0x4032,
    EMFPLUS_SET_CLIP_PATH = 0x4033,
    EMFPLUS_SET_CLIP_REGION = 0x4034,
    EMFPLUS_OFFSET_CLIP = 0x4035,
    EMFPLUS_DRAW_DRIVER_STRING = 0x4036,
    EMFPLUS_STROKE_FILL_PATH = 0x4037,
    EMFPLUS_SERIALIZABLE_OBJECT = 0x4038,
    EMFPLUS_SET_TS_GRAPHICS = 0x4039,
    EMFPLUS_SET_TS_CLIP = 0x403A,
}

/// First record type of the EMF+ range.
pub const EMFPLUS_RECORD_BASE: u32 = 0x4000;

/// A record type as it appears in the logical record stream.
///
/// Displays as its symbolic name followed by the raw value, e.g. `EMFPLUS_HEADER (0x4001)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordType(pub u32);

impl RecordType {
    pub fn name(self) -> Option<&'static str> {
        record_type_name(self.0)
    }

    pub fn is_emfplus(self) -> bool {
        self.0 >= EMFPLUS_RECORD_BASE
    }
}

impl From<u32> for RecordType {
    fn from(value: u32) -> Self {
        RecordType(value)
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{} (0x{:x})", name, self.0),
            None => write!(f, "0x{:x}", self.0),
        }
    }
}

impl Serialize for RecordType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Symbolic name of a record type, if it is a known EMF or EMF+ record.
pub fn record_type_name(record_type: u32) -> Option<&'static str> {
    let table = if record_type >= EMFPLUS_RECORD_BASE {
        EMFPLUS_RECORD_NAMES
    } else {
        EMF_RECORD_NAMES
    };

    table
        .iter()
        .find(|(value, _)| *value == record_type)
        .map(|(_, name)| *name)
}

/// Resolves a symbolic record name (case-insensitive).
pub fn record_type_from_name(name: &str) -> Option<u32> {
    EMF_RECORD_NAMES
        .iter()
        .chain(EMFPLUS_RECORD_NAMES)
        .find(|(_, known)| known.eq_ignore_ascii_case(name))
        .map(|(value, _)| *value)
}
