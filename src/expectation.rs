use crate::err::ExpectationParseError;
use crate::record_types::{RecordType, record_type_from_name};

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Tolerance {
    /// The record must be present.
    Strict,
    /// The record may be absent; it is consumed only when it is the next record.
    Lenient,
}

/// One entry of an expected record sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ExpectedRecord {
    pub record_type: RecordType,
    pub tolerance: Tolerance,
}

impl ExpectedRecord {
    /// Terminates a list early. Entries after it are ignored.
    pub const END: ExpectedRecord = ExpectedRecord::strict(0);

    pub const fn strict(record_type: u32) -> Self {
        ExpectedRecord {
            record_type: RecordType(record_type),
            tolerance: Tolerance::Strict,
        }
    }

    pub const fn lenient(record_type: u32) -> Self {
        ExpectedRecord {
            record_type: RecordType(record_type),
            tolerance: Tolerance::Lenient,
        }
    }

    pub fn is_end(&self) -> bool {
        self.record_type.0 == 0
    }

    pub fn is_lenient(&self) -> bool {
        self.tolerance == Tolerance::Lenient
    }
}

/// The entries of `expected` that take part in matching.
pub(crate) fn effective_len(expected: &[ExpectedRecord]) -> usize {
    expected
        .iter()
        .position(ExpectedRecord::is_end)
        .unwrap_or(expected.len())
}

fn parse_record_type(token: &str, line: usize) -> Result<u32, ExpectationParseError> {
    let parsed = if let Some(hex) = token
        .strip_prefix("0x")
        .or_else(|| token.strip_prefix("0X"))
    {
        u32::from_str_radix(hex, 16).ok()
    } else if token.bytes().all(|b| b.is_ascii_digit()) {
        token.parse().ok()
    } else {
        record_type_from_name(token)
    };

    match parsed {
        Some(0) => Err(ExpectationParseError::ReservedTag { line }),
        Some(t) => Ok(t),
        None => Err(ExpectationParseError::UnknownRecordType {
            line,
            token: token.to_string(),
        }),
    }
}

/// Parses an expectation list written one record per line.
///
/// ```text
/// # an empty recording
/// EMR_HEADER
/// EMFPLUS_HEADER
/// ?EMR_SAVEDC
/// 0x4002
/// 14
/// ```
///
/// A leading `?` marks the entry lenient. Line numbers in errors are 1-based.
pub fn parse_expectations(text: &str) -> Result<Vec<ExpectedRecord>, ExpectationParseError> {
    let mut expected = Vec::new();

    for (idx, raw) in text.lines().enumerate() {
        let line = raw.split('#').next().unwrap_or_default().trim();
        if line.is_empty() {
            continue;
        }

        let (tolerance, token) = match line.strip_prefix('?') {
            Some(rest) => (Tolerance::Lenient, rest.trim()),
            None => (Tolerance::Strict, line),
        };

        expected.push(ExpectedRecord {
            record_type: RecordType(parse_record_type(token, idx + 1)?),
            tolerance,
        });
    }

    Ok(expected)
}
