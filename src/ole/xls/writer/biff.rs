//! BIFF record writer for XLS files
//!
//! This module provides functions to generate BIFF8 (Binary Interchange File Format)
//! records for writing XLS files. BIFF8 is the format used by Excel 97-2003.
//!
//! # BIFF Record Structure
//!
//! Each BIFF record consists of:
//! - Record type (2 bytes) - identifies the record
//! - Record length (2 bytes) - length of data in bytes
//! - Record data (variable length, at most 8224 bytes)
//!
//! # References
//!
//! Based on Microsoft's "[MS-XLS]: Excel Binary File Format (.xls) Structure" specification.

use super::super::XlsResult;
use std::io::Write;

mod cells;
mod sst;
mod workbook;
mod worksheet;

/// Largest payload a single BIFF8 record may carry
pub(crate) const MAX_RECORD_DATA: usize = 8224;

/// Write a BIFF record header
///
/// # Arguments
///
/// * `writer` - Output writer
/// * `record_type` - BIFF record type (e.g., 0x0809 for BOF)
/// * `data_len` - Length of record data in bytes
#[inline]
pub(crate) fn write_record_header<W: Write>(
    writer: &mut W,
    record_type: u16,
    data_len: u16,
) -> XlsResult<()> {
    writer.write_all(&record_type.to_le_bytes())?;
    writer.write_all(&data_len.to_le_bytes())?;
    Ok(())
}

/// Character data of a BIFF8 string in its on-disk form.
///
/// Strings whose characters all fit in Latin-1 are stored compressed, one
/// byte per character; anything else is stored as UTF-16LE.
#[derive(Debug, Clone)]
pub(crate) struct Biff8Chars {
    /// Character count in UTF-16 code units
    pub cch: usize,
    /// True for UTF-16LE data (option flag 0x01)
    pub wide: bool,
    pub bytes: Vec<u8>,
}

impl Biff8Chars {
    pub(crate) fn encode(value: &str) -> Self {
        let units: Vec<u16> = value.encode_utf16().collect();
        let wide = units.iter().any(|&unit| unit > 0xFF);

        let bytes = if wide {
            units.iter().flat_map(|unit| unit.to_le_bytes()).collect()
        } else {
            units.iter().map(|&unit| unit as u8).collect()
        };

        Self {
            cch: units.len(),
            wide,
            bytes,
        }
    }

    pub(crate) fn flags(&self) -> u8 {
        if self.wide { 0x01 } else { 0x00 }
    }
}

/// Size of an XLUnicodeString (16-bit count) holding `value`
pub(crate) fn unicode_string_size(value: &str) -> usize {
    let chars = Biff8Chars::encode(value);
    2 + 1 + chars.bytes.len()
}

/// Write an XLUnicodeString: 16-bit count, option flags, characters
pub(crate) fn write_unicode_string_biff8<W: Write>(writer: &mut W, value: &str) -> XlsResult<()> {
    let chars = Biff8Chars::encode(value);
    writer.write_all(&(chars.cch as u16).to_le_bytes())?;
    writer.write_all(&[chars.flags()])?;
    writer.write_all(&chars.bytes)?;
    Ok(())
}

/// Write FORMAT record (number format string)
///
/// Record type: 0x041E
pub fn write_format_record<W: Write>(
    writer: &mut W,
    index_code: u16,
    format_str: &str,
) -> XlsResult<()> {
    workbook::write_format_record(writer, index_code, format_str)
}

/// Write the minimal built-in STYLE records.
///
/// The XF indices assume the following XF table:
///
/// - 0..14: style XFs
/// - 15:    default cell XF
/// - 16..20: additional style XFs for comma / currency / percent styles
pub fn write_builtin_styles<W: Write>(writer: &mut W) -> XlsResult<()> {
    workbook::write_builtin_styles(writer)
}

/// Write UseSelFS (Use Natural Language Formulas) record.
///
/// Record type: 0x0160, Length: 2
pub fn write_usesel_fs<W: Write>(writer: &mut W) -> XlsResult<()> {
    workbook::write_usesel_fs(writer)
}

/// Write WSBOOL record (Additional Workspace Information)
///
/// Record type: 0x0081, Length: 2
pub fn write_wsbool<W: Write>(writer: &mut W) -> XlsResult<()> {
    worksheet::write_wsbool(writer)
}

/// Write WINDOW2 record (Worksheet view settings)
///
/// Record type: 0x023E, Length: 18
pub fn write_window2<W: Write>(writer: &mut W, selected: bool) -> XlsResult<()> {
    worksheet::write_window2(writer, selected)
}

/// Write BOF (Beginning of File) record
///
/// Record type: 0x0809
///
/// # Arguments
///
/// * `writer` - Output writer
/// * `substream_type` - Type of substream (0x0005 = Workbook, 0x0010 = Worksheet)
pub fn write_bof<W: Write>(writer: &mut W, substream_type: u16) -> XlsResult<()> {
    workbook::write_bof(writer, substream_type)
}

/// Write EOF (End of File) record
///
/// Record type: 0x000A
pub fn write_eof<W: Write>(writer: &mut W) -> XlsResult<()> {
    workbook::write_eof(writer)
}

/// Write CODEPAGE record
///
/// Record type: 0x0042
pub fn write_codepage<W: Write>(writer: &mut W, codepage: u16) -> XlsResult<()> {
    workbook::write_codepage(writer, codepage)
}

/// Write DATE1904 record
///
/// Record type: 0x0022
pub fn write_date1904<W: Write>(writer: &mut W, is_1904: bool) -> XlsResult<()> {
    workbook::write_date1904(writer, is_1904)
}

/// Write WINDOW1 record (workbook window properties)
///
/// Record type: 0x003D
pub fn write_window1<W: Write>(writer: &mut W) -> XlsResult<()> {
    workbook::write_window1(writer)
}

/// Write BOUNDSHEET8 record (worksheet metadata)
///
/// Record type: 0x0085
///
/// `position` is the absolute stream offset of the sheet's BOF record; it
/// is usually written as 0 and patched once the layout is known.
/// Returns the offset of the position field within `stream`.
pub fn write_boundsheet(stream: &mut Vec<u8>, position: u32, name: &str) -> XlsResult<usize> {
    let field = stream.len() + 4;
    workbook::write_boundsheet(stream, position, name)?;
    Ok(field)
}

/// Write DIMENSIONS record (worksheet dimensions)
///
/// Record type: 0x0200
///
/// `last_row` and `last_col` are one past the last used index.
pub fn write_dimensions<W: Write>(
    writer: &mut W,
    first_row: u32,
    last_row: u32,
    first_col: u16,
    last_col: u16,
) -> XlsResult<()> {
    worksheet::write_dimensions(writer, first_row, last_row, first_col, last_col)
}

/// Write NUMBER record (floating point cell)
///
/// Record type: 0x0203
pub fn write_number<W: Write>(
    writer: &mut W,
    row: u32,
    col: u16,
    xf_index: u16,
    value: f64,
) -> XlsResult<()> {
    cells::write_number(writer, row, col, xf_index, value)
}

/// Write LABELSST record (string cell with reference to SST)
///
/// Record type: 0x00FD
pub fn write_labelsst<W: Write>(
    writer: &mut W,
    row: u32,
    col: u16,
    xf_index: u16,
    sst_index: u32,
) -> XlsResult<()> {
    cells::write_labelsst(writer, row, col, xf_index, sst_index)
}

/// Write BOOLERR record holding a boolean
///
/// Record type: 0x0205
pub fn write_boolerr<W: Write>(
    writer: &mut W,
    row: u32,
    col: u16,
    xf_index: u16,
    value: bool,
) -> XlsResult<()> {
    cells::write_boolerr(writer, row, col, xf_index, value as u8, false)
}

/// Write BOOLERR record holding an error code
///
/// Record type: 0x0205
pub fn write_error<W: Write>(
    writer: &mut W,
    row: u32,
    col: u16,
    xf_index: u16,
    code: u8,
) -> XlsResult<()> {
    cells::write_boolerr(writer, row, col, xf_index, code, true)
}

/// Write SST (Shared String Table) record with CONTINUE support
///
/// Record type: 0x00FC
///
/// The SST record holds at most 8224 bytes; the remainder goes into
/// CONTINUE records (0x003C). A string whose characters straddle a record
/// boundary resumes after a fresh option byte.
pub fn write_sst<W: Write>(writer: &mut W, strings: &[String], cst_total: u32) -> XlsResult<()> {
    sst::write_sst(writer, strings, cst_total)
}
