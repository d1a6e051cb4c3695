//! Utility functions for XLS parsing

use crate::ole::binary;
use crate::ole::codepage;
use crate::ole::xls::error::{XlsError, XlsResult};
use chrono::{NaiveDate, NaiveDateTime, TimeDelta};

/// Cached result of a FORMULA record
#[derive(Debug, Clone, PartialEq)]
pub enum FormulaValue {
    Number(f64),
    /// Text result; the string itself follows in a STRING record
    PendingString,
    /// Zero-length text result
    EmptyString,
    Bool(bool),
    Error(u8),
}

/// Parse a BIFF8 unicode string (XLUnicodeString and friends).
///
/// `wide_len` selects a 16-bit character count (cell labels, SST) over an
/// 8-bit one (sheet names). Rich-text runs and phonetic blocks are skipped.
/// Returns the string and the number of bytes consumed.
pub fn parse_unicode_string(data: &[u8], wide_len: bool) -> XlsResult<(String, usize)> {
    let (cch, mut offset) = if wide_len {
        (binary::read_u16_le(data, 0)? as usize, 2)
    } else {
        (*data.first().ok_or(XlsError::InvalidLength { expected: 1, found: 0 })? as usize, 1)
    };

    let flags = *data.get(offset).ok_or(XlsError::InvalidLength {
        expected: offset + 1,
        found: data.len(),
    })?;
    offset += 1;

    let mut trailing = 0usize;
    if flags & 0x08 != 0 {
        let runs = binary::read_u16_le(data, offset)? as usize;
        trailing += runs * 4;
        offset += 2;
    }
    if flags & 0x04 != 0 {
        trailing += binary::read_u32_le(data, offset)? as usize;
        offset += 4;
    }

    let byte_len = if flags & 0x01 != 0 { cch * 2 } else { cch };
    let chars = data.get(offset..offset + byte_len).ok_or(XlsError::InvalidLength {
        expected: offset + byte_len,
        found: data.len(),
    })?;

    let string = if flags & 0x01 != 0 {
        codepage::decode_utf16le(chars)
    } else {
        codepage::decode_latin1(chars)
    };

    Ok((string, offset + byte_len + trailing))
}

/// Parse a BIFF5 byte string with an 8- or 16-bit length prefix, decoded
/// with the workbook codepage.
pub fn parse_byte_string(data: &[u8], wide_len: bool, codepage: u16) -> XlsResult<(String, usize)> {
    let (len, offset) = if wide_len {
        (binary::read_u16_le(data, 0)? as usize, 2)
    } else {
        (*data.first().ok_or(XlsError::InvalidLength { expected: 1, found: 0 })? as usize, 1)
    };

    let bytes = data.get(offset..offset + len).ok_or(XlsError::InvalidLength {
        expected: offset + len,
        found: data.len(),
    })?;

    Ok((codepage::decode_bytes(bytes, codepage), offset + len))
}

/// Convert RK value to f64
///
/// Bit 0 selects a 30-bit signed integer over the top 30 bits of an IEEE
/// double; bit 1 means the value was multiplied by 100.
pub fn rk_to_f64(rk: u32) -> f64 {
    let value = if rk & 0x01 != 0 {
        ((rk as i32) >> 2) as f64
    } else {
        f64::from_bits(((rk & 0xFFFF_FFFC) as u64) << 32)
    };

    if rk & 0x02 != 0 { value / 100.0 } else { value }
}

/// Parse the 8-byte cached result of a FORMULA record.
///
/// A value whose top two bytes are `0xFFFF` is a tagged non-numeric result,
/// anything else is an IEEE double.
pub fn parse_formula_value(data: &[u8]) -> XlsResult<FormulaValue> {
    if data.len() < 8 {
        return Err(XlsError::InvalidLength {
            expected: 8,
            found: data.len(),
        });
    }

    if data[6] != 0xFF || data[7] != 0xFF {
        return Ok(FormulaValue::Number(binary::read_f64_le(data, 0)?));
    }

    match data[0] {
        0x00 => Ok(FormulaValue::PendingString),
        0x01 => Ok(FormulaValue::Bool(data[2] != 0)),
        0x02 => Ok(FormulaValue::Error(data[2])),
        0x03 => Ok(FormulaValue::EmptyString),
        other => Err(XlsError::InvalidData(format!(
            "Unknown formula result type {}",
            other
        ))),
    }
}

/// Whether a number format displays its value as a date or time.
///
/// Built-in formats 14-22 and 45-47 are dates. For custom formats the
/// format string is scanned for date/time tokens outside quoted literals,
/// escapes and bracketed sections; elapsed-time brackets (`[h]`, `[mm]`,
/// `[ss]`) count as date tokens.
pub fn is_date_format(format_index: u16, format_string: Option<&str>) -> bool {
    if matches!(format_index, 14..=22 | 45..=47) {
        return true;
    }
    format_string.is_some_and(is_date_format_string)
}

fn is_date_format_string(format: &str) -> bool {
    let mut chars = format.chars();

    while let Some(ch) = chars.next() {
        match ch {
            '"' => {
                for inner in chars.by_ref() {
                    if inner == '"' {
                        break;
                    }
                }
            },
            // Escaped literal, padding width and fill character
            '\\' | '_' | '*' => {
                chars.next();
            },
            '[' => {
                let section: String = chars.by_ref().take_while(|&c| c != ']').collect();
                let section = section.to_ascii_lowercase();
                if !section.is_empty() && section.chars().all(|c| matches!(c, 'h' | 'm' | 's')) {
                    return true;
                }
            },
            ';' => break,
            c if matches!(c.to_ascii_lowercase(), 'y' | 'm' | 'd' | 'h' | 's') => return true,
            _ => {},
        }
    }

    false
}

/// Convert serial date to datetime
///
/// The 1900 system keeps Excel's phantom 1900-02-29 (serial 60): serials
/// below it are shifted by one day so that serial 1 is 1900-01-01.
pub fn excel_date_to_datetime(serial: f64, is_1904: bool) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }

    let base = if is_1904 {
        NaiveDate::from_ymd_opt(1904, 1, 1)?
    } else if serial < 60.0 {
        NaiveDate::from_ymd_opt(1899, 12, 31)?
    } else {
        NaiveDate::from_ymd_opt(1899, 12, 30)?
    };

    let millis = (serial * 86_400_000.0).round() as i64;
    base.and_hms_opt(0, 0, 0)?
        .checked_add_signed(TimeDelta::try_milliseconds(millis)?)
}

/// Convert a zero-based column index to its Excel name (0 = A, 26 = AA)
pub fn column_index_to_name(col: u32) -> String {
    let mut name = Vec::new();
    let mut col = col as u64 + 1;

    while col > 0 {
        col -= 1;
        name.push(b'A' + (col % 26) as u8);
        col /= 26;
    }

    name.reverse();
    String::from_utf8_lossy(&name).into_owned()
}

/// Convert zero-based row and column to an A1-style reference
pub fn cell_reference(row: u32, col: u32) -> String {
    format!("{}{}", column_index_to_name(col), row as u64 + 1)
}
