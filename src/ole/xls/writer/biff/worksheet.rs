//! Worksheet-level BIFF8 record writers.

use crate::ole::xls::XlsResult;
use std::io::Write;

use super::write_record_header;

/// Write WSBOOL record for a normal worksheet
///
/// Record type: 0x0081, Length: 2
pub fn write_wsbool<W: Write>(writer: &mut W) -> XlsResult<()> {
    write_record_header(writer, 0x0081, 2)?;
    // fShowAutoBreaks, fApplyStyles, outline symbols below/right
    writer.write_all(&0x04C1u16.to_le_bytes())?;
    Ok(())
}

/// Write WINDOW2 record
///
/// Record type: 0x023E, Length: 18
///
/// Gridlines, headings, zeros and outline symbols are shown; `selected`
/// marks the sheet tab as selected and active.
pub fn write_window2<W: Write>(writer: &mut W, selected: bool) -> XlsResult<()> {
    const BASE_OPTIONS: u16 = 0x00B6;
    const SELECTED: u16 = 0x0600;

    let options = if selected {
        BASE_OPTIONS | SELECTED
    } else {
        BASE_OPTIONS
    };

    write_record_header(writer, 0x023E, 18)?;
    writer.write_all(&options.to_le_bytes())?;
    writer.write_all(&0u16.to_le_bytes())?; // rwTop
    writer.write_all(&0u16.to_le_bytes())?; // colLeft
    writer.write_all(&0x0040u32.to_le_bytes())?; // icvHdr
    writer.write_all(&0u16.to_le_bytes())?; // wScaleSLV
    writer.write_all(&0u16.to_le_bytes())?; // wScaleNormal
    writer.write_all(&0u32.to_le_bytes())?; // reserved
    Ok(())
}

/// Write DIMENSIONS record
///
/// Record type: 0x0200, Length: 14
pub fn write_dimensions<W: Write>(
    writer: &mut W,
    first_row: u32,
    last_row: u32,
    first_col: u16,
    last_col: u16,
) -> XlsResult<()> {
    write_record_header(writer, 0x0200, 14)?;

    writer.write_all(&first_row.to_le_bytes())?;
    writer.write_all(&last_row.to_le_bytes())?;
    writer.write_all(&first_col.to_le_bytes())?;
    writer.write_all(&last_col.to_le_bytes())?;
    writer.write_all(&0u16.to_le_bytes())?;

    Ok(())
}
