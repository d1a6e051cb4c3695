//! Tab-separated listing of the first sheet.
use std::io::Write;
use std::path::Path;

use tracing::{error, info};

use crate::compact::load_first_sheet;
use crate::error::{CompactError, Result};
use crate::ole::xls::utils::excel_date_to_datetime;
use crate::sheet::CellValue;

/// Print every row of the first sheet of `input` to `out`, one line per
/// row with tab-separated cells, and return the number of rows printed.
///
/// Each line spans the full column count of the sheet; empty cells print as
/// nothing. Failures are classified like [`crate::compact`].
pub fn dump<W: Write>(input: &Path, out: &mut W) -> Result<usize> {
    match dump_rows(input, out) {
        Ok(rows) => {
            info!(input = %input.display(), rows, "dumped first sheet");
            Ok(rows)
        },
        Err(err) => {
            error!(
                path = %err.path().display(),
                kind = ?err.kind(),
                message = %err.message(),
                "dump failed"
            );
            Err(err)
        },
    }
}

fn dump_rows<W: Write>(input: &Path, out: &mut W) -> Result<usize> {
    let source = load_first_sheet(input)?;
    let sheet = &source.sheet;
    let columns = sheet.column_count();
    let fail = |e: std::io::Error| CompactError::unknown(input, format!("output: {}", e));

    let mut line = String::new();
    for row in 0..sheet.row_count() {
        line.clear();
        for col in 0..columns {
            if col > 0 {
                line.push('\t');
            }
            render_cell(&mut line, sheet.cell(row, col), source.is_1904);
        }
        writeln!(out, "{}", line).map_err(fail)?;
    }
    out.flush().map_err(fail)?;

    Ok(sheet.row_count())
}

/// Append the display form of `value` to `line`.
fn render_cell(line: &mut String, value: &CellValue, is_1904: bool) {
    match value {
        CellValue::Empty => {},
        CellValue::Number(n) => line.push_str(&n.to_string()),
        CellValue::Text(s) => push_escaped(line, s),
        CellValue::Bool(true) => line.push_str("TRUE"),
        CellValue::Bool(false) => line.push_str("FALSE"),
        CellValue::DateTime(serial) => match excel_date_to_datetime(*serial, is_1904) {
            Some(dt) if serial.fract() == 0.0 => line.push_str(&dt.format("%Y-%m-%d").to_string()),
            Some(dt) => line.push_str(&dt.format("%Y-%m-%dT%H:%M:%S").to_string()),
            // Out of range serials print as the raw number
            None => line.push_str(&serial.to_string()),
        },
        CellValue::Error(e) => line.push_str(&e.to_string()),
    }
}

/// Escape characters that would break the one-line-per-row layout.
fn push_escaped(line: &mut String, text: &str) {
    for c in text.chars() {
        match c {
            '\\' => line.push_str("\\\\"),
            '\t' => line.push_str("\\t"),
            '\n' => line.push_str("\\n"),
            '\r' => line.push_str("\\r"),
            c => line.push(c),
        }
    }
}
