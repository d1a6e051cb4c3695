//! XLS file writer implementation
//!
//! The writer generates BIFF8 records and uses the OLE writer to wrap them
//! in a compound document. It supports:
//! - Creating workbooks with multiple worksheets
//! - Writing numbers, strings, booleans, error codes and dates
//! - Shared string table management with CONTINUE splitting
//!
//! # Example
//!
//! ```rust
//! use xlscompact::ole::xls::XlsWriter;
//!
//! let mut writer = XlsWriter::new();
//! let sheet = writer.add_worksheet("Sheet1")?;
//!
//! writer.write_string(sheet, 0, 0, "Hello")?;
//! writer.write_number(sheet, 0, 1, 42.0)?;
//!
//! let bytes = writer.to_bytes()?;
//! assert!(!bytes.is_empty());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use super::super::error::{XlsError, XlsResult};
use super::biff;
use super::formatting::{DATE_CELL_XF, DEFAULT_CELL_XF, FormattingManager};
use crate::ole::consts::MINI_STREAM_CUTOFF;
use crate::ole::writer::OleWriter;
use crate::sheet::CellError;
use std::collections::HashMap;
use std::io::{Cursor, Seek, Write};
use tracing::debug;

mod worksheet;

use self::worksheet::{WritableCell, WritableWorksheet};

/// Highest row index a BIFF8 worksheet can address
pub const MAX_ROW: u32 = 65_535;
/// Highest column index a BIFF8 worksheet can address
pub const MAX_COL: u16 = 255;
/// Longest cell text Excel accepts, in UTF-16 code units
pub const MAX_STRING_LEN: usize = 32_767;

/// Characters Excel forbids in sheet names
const INVALID_SHEET_NAME_CHARS: [char; 7] = ['[', ']', ':', '*', '?', '/', '\\'];

/// Cell value type for writing
#[derive(Debug, Clone, PartialEq)]
pub enum XlsCellValue {
    /// String value, stored in the shared string table
    String(String),
    /// Number value (f64)
    Number(f64),
    /// Boolean value
    Boolean(bool),
    /// Excel error value
    Error(CellError),
    /// Serial date, written as a number with the date XF
    Date(f64),
}

/// Shared string table built from the cells at write time
#[derive(Debug, Default)]
struct SharedStrings {
    strings: Vec<String>,
    index: HashMap<String, u32>,
    /// Total number of string cells, duplicates included
    total: u32,
}

impl SharedStrings {
    fn collect(worksheets: &[WritableWorksheet]) -> Self {
        let mut sst = SharedStrings::default();

        for worksheet in worksheets {
            for cell in worksheet.cells.values() {
                if let XlsCellValue::String(ref s) = cell.value {
                    sst.total = sst.total.saturating_add(1);
                    if !sst.index.contains_key(s) {
                        sst.index.insert(s.clone(), sst.strings.len() as u32);
                        sst.strings.push(s.clone());
                    }
                }
            }
        }

        sst
    }

    fn index_of(&self, value: &str) -> XlsResult<u32> {
        self.index.get(value).copied().ok_or_else(|| {
            XlsError::InvalidData(format!("String '{}' missing from shared string table", value))
        })
    }
}

/// XLS file writer
///
/// Collects cell values per worksheet and encodes them as a BIFF8
/// workbook inside an OLE compound document.
#[derive(Debug)]
pub struct XlsWriter {
    /// Worksheets to write
    worksheets: Vec<WritableWorksheet>,
    /// Use 1904 date system (Mac) instead of 1900 (Windows)
    use_1904_dates: bool,
    fmt: FormattingManager,
}

impl XlsWriter {
    /// Create a new XLS writer
    pub fn new() -> Self {
        Self {
            worksheets: Vec::new(),
            use_1904_dates: false,
            fmt: FormattingManager::new(),
        }
    }

    /// Add a new worksheet and return its index.
    ///
    /// Names must be 1-31 characters, must not contain any of `[]:*?/\`
    /// and must be unique within the workbook (case-insensitively).
    pub fn add_worksheet(&mut self, name: &str) -> XlsResult<usize> {
        let len = name.encode_utf16().count();
        if len == 0 || len > 31 {
            return Err(XlsError::InvalidData(format!(
                "Worksheet name '{}' must be 1-31 characters",
                name
            )));
        }

        if let Some(c) = name.chars().find(|c| INVALID_SHEET_NAME_CHARS.contains(c)) {
            return Err(XlsError::InvalidData(format!(
                "Worksheet name '{}' contains invalid character '{}'",
                name, c
            )));
        }

        let lower = name.to_lowercase();
        if self.worksheets.iter().any(|ws| ws.name.to_lowercase() == lower) {
            return Err(XlsError::InvalidData(format!(
                "Worksheet '{}' already exists",
                name
            )));
        }

        let index = self.worksheets.len();
        self.worksheets
            .push(WritableWorksheet::new(name.to_string()));
        Ok(index)
    }

    /// Write a string value to a cell
    pub fn write_string(&mut self, sheet: usize, row: u32, col: u16, value: &str) -> XlsResult<()> {
        let len = value.encode_utf16().count();
        if len > MAX_STRING_LEN {
            return Err(XlsError::InvalidData(format!(
                "Text of {} characters at {} exceeds the cell limit of {}",
                len,
                crate::ole::xls::utils::cell_reference(row, col as u32),
                MAX_STRING_LEN
            )));
        }
        self.write_cell(sheet, row, col, XlsCellValue::String(value.to_string()))
    }

    /// Write a number value to a cell
    pub fn write_number(&mut self, sheet: usize, row: u32, col: u16, value: f64) -> XlsResult<()> {
        self.write_cell(sheet, row, col, XlsCellValue::Number(value))
    }

    /// Write a boolean value to a cell
    pub fn write_boolean(
        &mut self,
        sheet: usize,
        row: u32,
        col: u16,
        value: bool,
    ) -> XlsResult<()> {
        self.write_cell(sheet, row, col, XlsCellValue::Boolean(value))
    }

    /// Write an error value (`#DIV/0!`, `#N/A`, ...) to a cell
    pub fn write_error(
        &mut self,
        sheet: usize,
        row: u32,
        col: u16,
        error: CellError,
    ) -> XlsResult<()> {
        self.write_cell(sheet, row, col, XlsCellValue::Error(error))
    }

    /// Write a serial date to a cell.
    ///
    /// The serial is interpreted in the workbook's date system, see
    /// [`XlsWriter::set_1904_dates`].
    pub fn write_date(&mut self, sheet: usize, row: u32, col: u16, serial: f64) -> XlsResult<()> {
        self.write_cell(sheet, row, col, XlsCellValue::Date(serial))
    }

    fn write_cell(&mut self, sheet: usize, row: u32, col: u16, value: XlsCellValue) -> XlsResult<()> {
        if row > MAX_ROW {
            return Err(XlsError::InvalidData(format!(
                "Row index {} exceeds BIFF8 limit {}",
                row, MAX_ROW
            )));
        }
        if col > MAX_COL {
            return Err(XlsError::InvalidData(format!(
                "Column index {} exceeds BIFF8 limit {}",
                col, MAX_COL
            )));
        }

        let worksheet = self
            .worksheets
            .get_mut(sheet)
            .ok_or_else(|| XlsError::WorksheetNotFound(format!("Sheet {}", sheet)))?;

        worksheet.add_cell(WritableCell { row, col, value });

        Ok(())
    }

    /// Set the date system (1900 vs 1904)
    pub fn set_1904_dates(&mut self, use_1904: bool) {
        self.use_1904_dates = use_1904;
    }

    /// Write the compound document to `writer`
    pub fn write_to<W: Write + Seek>(&self, writer: &mut W) -> XlsResult<()> {
        let workbook_stream = self.generate_workbook_stream()?;

        let mut ole_writer = OleWriter::new();
        ole_writer.create_stream("Workbook", &workbook_stream)?;
        ole_writer.write_to(writer)?;

        Ok(())
    }

    /// Encode the compound document in memory
    pub fn to_bytes(&self) -> XlsResult<Vec<u8>> {
        let mut cursor = Cursor::new(Vec::new());
        self.write_to(&mut cursor)?;
        Ok(cursor.into_inner())
    }

    /// Generate the complete Workbook stream with all BIFF records
    fn generate_workbook_stream(&self) -> XlsResult<Vec<u8>> {
        if self.worksheets.is_empty() {
            return Err(XlsError::NoWorksheets);
        }

        let sst = SharedStrings::collect(&self.worksheets);
        let mut stream = Vec::new();

        // === Workbook Globals ===
        biff::write_bof(&mut stream, 0x0005)?;
        // BIFF8 strings are unicode; 1200 is the UTF-16 codepage
        biff::write_codepage(&mut stream, 0x04B0)?;
        biff::write_date1904(&mut stream, self.use_1904_dates)?;
        biff::write_window1(&mut stream)?;

        // FONT, FORMAT and XF tables, then the built-in STYLEs over them
        self.fmt.write_fonts(&mut stream)?;
        self.fmt.write_number_formats(&mut stream)?;
        self.fmt.write_formats(&mut stream)?;
        biff::write_builtin_styles(&mut stream)?;
        biff::write_usesel_fs(&mut stream)?;

        // Sheet offsets are patched once the globals are complete
        let mut position_fields = Vec::with_capacity(self.worksheets.len());
        for worksheet in &self.worksheets {
            position_fields.push(biff::write_boundsheet(&mut stream, 0, &worksheet.name)?);
        }

        if !sst.strings.is_empty() {
            biff::write_sst(&mut stream, &sst.strings, sst.total)?;
        }

        biff::write_eof(&mut stream)?;

        // === Worksheets ===
        for (index, (worksheet, field)) in self.worksheets.iter().zip(position_fields).enumerate() {
            let position = u32::try_from(stream.len()).map_err(|_| {
                XlsError::InvalidData("Workbook stream exceeds 4 GiB".to_string())
            })?;
            stream[field..field + 4].copy_from_slice(&position.to_le_bytes());

            biff::write_bof(&mut stream, 0x0010)?;
            biff::write_dimensions(
                &mut stream,
                worksheet.first_row,
                worksheet.last_row,
                worksheet.first_col,
                worksheet.last_col,
            )?;
            biff::write_wsbool(&mut stream)?;
            biff::write_window2(&mut stream, index == 0)?;

            // BTreeMap order is row-major
            for ((row, col), cell) in &worksheet.cells {
                match &cell.value {
                    XlsCellValue::Number(value) => {
                        biff::write_number(&mut stream, *row, *col, DEFAULT_CELL_XF, *value)?;
                    },
                    XlsCellValue::Date(serial) => {
                        biff::write_number(&mut stream, *row, *col, DATE_CELL_XF, *serial)?;
                    },
                    XlsCellValue::String(s) => {
                        let sst_index = sst.index_of(s)?;
                        biff::write_labelsst(&mut stream, *row, *col, DEFAULT_CELL_XF, sst_index)?;
                    },
                    XlsCellValue::Boolean(value) => {
                        biff::write_boolerr(&mut stream, *row, *col, DEFAULT_CELL_XF, *value)?;
                    },
                    XlsCellValue::Error(error) => {
                        biff::write_error(&mut stream, *row, *col, DEFAULT_CELL_XF, error.code())?;
                    },
                }
            }

            biff::write_eof(&mut stream)?;
        }

        // Excel expects the Workbook stream in regular sectors
        let min_len = MINI_STREAM_CUTOFF as usize;
        if stream.len() < min_len {
            stream.resize(min_len, 0);
        }

        debug!(
            bytes = stream.len(),
            sheets = self.worksheets.len(),
            strings = sst.strings.len(),
            "encoded workbook stream"
        );

        Ok(stream)
    }
}

impl Default for XlsWriter {
    fn default() -> Self {
        Self::new()
    }
}
