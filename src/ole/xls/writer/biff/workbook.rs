//! Workbook-level BIFF8 record writers.

use crate::ole::xls::{XlsError, XlsResult};
use std::io::Write;

use super::{Biff8Chars, unicode_string_size, write_record_header, write_unicode_string_biff8};

/// BIFF8 version stamp carried by every BOF record
const BIFF8_VERSION: u16 = 0x0600;

/// Write FORMAT record: format index plus an XLUnicodeString pattern
///
/// Record type: 0x041E
pub fn write_format_record<W: Write>(
    writer: &mut W,
    index_code: u16,
    format_str: &str,
) -> XlsResult<()> {
    let size = 2 + unicode_string_size(format_str);
    let data_len = u16::try_from(size).map_err(|_| {
        XlsError::InvalidData(format!("Number format of {} bytes is too long", size))
    })?;

    write_record_header(writer, 0x041E, data_len)?;
    writer.write_all(&index_code.to_le_bytes())?;
    write_unicode_string_biff8(writer, format_str)?;
    Ok(())
}

/// Write one built-in STYLE record
///
/// Record type: 0x0293
///
/// Payload: XF index in the low 12 bits with the built-in flag in bit 15,
/// the built-in style id, then an outline level of 0xFF.
fn write_style_builtin<W: Write>(
    writer: &mut W,
    xf_index: u16,
    builtin_style_id: u8,
) -> XlsResult<()> {
    let xf_field: u16 = (xf_index & 0x0FFF) | 0x8000;

    write_record_header(writer, 0x0293, 4)?;
    writer.write_all(&xf_field.to_le_bytes())?;
    writer.write_all(&[builtin_style_id, 0xFF])?;
    Ok(())
}

/// Write the built-in STYLE records for the fixed XF table.
///
/// Mapping (xf_index, builtin_style_id):
/// - (16, 3) Comma
/// - (17, 6) Comma [0]
/// - (18, 4) Currency
/// - (19, 7) Currency [0]
/// - (0, 0) Normal
/// - (20, 5) Percent
pub fn write_builtin_styles<W: Write>(writer: &mut W) -> XlsResult<()> {
    const MAPPINGS: &[(u16, u8)] = &[
        (0x0010, 3),
        (0x0011, 6),
        (0x0012, 4),
        (0x0013, 7),
        (0x0000, 0),
        (0x0014, 5),
    ];

    for &(xf_index, builtin_id) in MAPPINGS {
        write_style_builtin(writer, xf_index, builtin_id)?;
    }

    Ok(())
}

/// Write USESELFS record with natural language formulas disabled
///
/// Record type: 0x0160
pub fn write_usesel_fs<W: Write>(writer: &mut W) -> XlsResult<()> {
    write_record_header(writer, 0x0160, 2)?;
    writer.write_all(&0u16.to_le_bytes())?;
    Ok(())
}

/// Write BOF record opening a substream
///
/// Record type: 0x0809
///
/// `substream_type` is 0x0005 for the workbook globals and 0x0010 for a
/// worksheet.
pub fn write_bof<W: Write>(writer: &mut W, substream_type: u16) -> XlsResult<()> {
    write_record_header(writer, 0x0809, 16)?;
    writer.write_all(&BIFF8_VERSION.to_le_bytes())?;
    writer.write_all(&substream_type.to_le_bytes())?;
    writer.write_all(&0x0DBBu16.to_le_bytes())?; // rupBuild
    writer.write_all(&0x07CCu16.to_le_bytes())?; // rupYear
    writer.write_all(&0u32.to_le_bytes())?; // file history flags
    writer.write_all(&0x0000_0006u32.to_le_bytes())?; // lowest BIFF version
    Ok(())
}

/// Write EOF record closing a substream
///
/// Record type: 0x000A
pub fn write_eof<W: Write>(writer: &mut W) -> XlsResult<()> {
    write_record_header(writer, 0x000A, 0)
}

/// Write CODEPAGE record
///
/// Record type: 0x0042
pub fn write_codepage<W: Write>(writer: &mut W, codepage: u16) -> XlsResult<()> {
    write_record_header(writer, 0x0042, 2)?;
    writer.write_all(&codepage.to_le_bytes())?;
    Ok(())
}

/// Write DATE1904 record
///
/// Record type: 0x0022
pub fn write_date1904<W: Write>(writer: &mut W, is_1904: bool) -> XlsResult<()> {
    write_record_header(writer, 0x0022, 2)?;
    writer.write_all(&u16::from(is_1904).to_le_bytes())?;
    Ok(())
}

/// Write WINDOW1 record with a default window geometry and the first tab
/// active
///
/// Record type: 0x003D
pub fn write_window1<W: Write>(writer: &mut W) -> XlsResult<()> {
    const FIELDS: [u16; 9] = [
        0x0000, // xWn
        0x0000, // yWn
        0x3000, // dxWn
        0x1E00, // dyWn
        0x0038, // grbit
        0x0000, // itabCur
        0x0000, // itabFirst
        0x0001, // ctabSel
        0x0258, // wTabRatio
    ];

    write_record_header(writer, 0x003D, 18)?;
    for field in FIELDS {
        writer.write_all(&field.to_le_bytes())?;
    }
    Ok(())
}

/// Write BOUNDSHEET8 record for a visible worksheet
///
/// Record type: 0x0085
///
/// The name is a ShortXLUnicodeString: 8-bit count, option flags, then
/// compressed or UTF-16LE characters.
pub fn write_boundsheet<W: Write>(writer: &mut W, position: u32, name: &str) -> XlsResult<()> {
    let chars = Biff8Chars::encode(name);
    let cch = u8::try_from(chars.cch)
        .map_err(|_| XlsError::InvalidData(format!("Sheet name '{}' is too long", name)))?;

    // position(4) + state/type(2) + cch(1) + flags(1) + name bytes
    let data_len = 8 + chars.bytes.len() as u16;
    write_record_header(writer, 0x0085, data_len)?;
    writer.write_all(&position.to_le_bytes())?;
    writer.write_all(&0x0000u16.to_le_bytes())?;
    writer.write_all(&[cch, chars.flags()])?;
    writer.write_all(&chars.bytes)?;

    Ok(())
}
