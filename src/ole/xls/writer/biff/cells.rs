//! Cell record BIFF8 writers.

use crate::ole::xls::{XlsError, XlsResult};
use std::io::Write;

use super::write_record_header;

/// BIFF8 stores the row as a 16-bit index
fn biff8_row(row: u32, record: &str) -> XlsResult<u16> {
    u16::try_from(row).map_err(|_| {
        XlsError::InvalidData(format!(
            "Row index {} exceeds BIFF8 limit 65535 for {} record",
            row, record
        ))
    })
}

/// Common cell prefix: row, column, XF index
fn write_cell_header<W: Write>(writer: &mut W, row: u16, col: u16, xf_index: u16) -> XlsResult<()> {
    writer.write_all(&row.to_le_bytes())?;
    writer.write_all(&col.to_le_bytes())?;
    writer.write_all(&xf_index.to_le_bytes())?;
    Ok(())
}

/// Write NUMBER record
///
/// Record type: 0x0203, Length: 14
pub fn write_number<W: Write>(
    writer: &mut W,
    row: u32,
    col: u16,
    xf_index: u16,
    value: f64,
) -> XlsResult<()> {
    let row = biff8_row(row, "NUMBER")?;

    write_record_header(writer, 0x0203, 14)?;
    write_cell_header(writer, row, col, xf_index)?;
    writer.write_all(&value.to_le_bytes())?;

    Ok(())
}

/// Write LABELSST record
///
/// Record type: 0x00FD, Length: 10
pub fn write_labelsst<W: Write>(
    writer: &mut W,
    row: u32,
    col: u16,
    xf_index: u16,
    sst_index: u32,
) -> XlsResult<()> {
    let row = biff8_row(row, "LABELSST")?;

    write_record_header(writer, 0x00FD, 10)?;
    write_cell_header(writer, row, col, xf_index)?;
    writer.write_all(&sst_index.to_le_bytes())?;

    Ok(())
}

/// Write BOOLERR record
///
/// Record type: 0x0205, Length: 8
///
/// `value` is 0/1 for a boolean or the error code when `is_error` is set.
pub fn write_boolerr<W: Write>(
    writer: &mut W,
    row: u32,
    col: u16,
    xf_index: u16,
    value: u8,
    is_error: bool,
) -> XlsResult<()> {
    let row = biff8_row(row, "BOOLERR")?;

    write_record_header(writer, 0x0205, 8)?;
    write_cell_header(writer, row, col, xf_index)?;
    writer.write_all(&[value, u8::from(is_error)])?;

    Ok(())
}
