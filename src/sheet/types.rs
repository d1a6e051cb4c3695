//! Common types for spreadsheet cells.

use std::fmt;

/// Types of data that can be stored in a cell.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    /// Empty cell, or a position with no cell record
    #[default]
    Empty,
    /// 64-bit floating point number
    Number(f64),
    /// String value; an empty string is still text
    Text(String),
    /// Boolean value
    Bool(bool),
    /// Date/time value (stored as serial number)
    DateTime(f64),
    /// Error value
    Error(CellError),
}

/// Tag of a [`CellValue`] without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellType {
    Empty,
    Number,
    Text,
    Bool,
    Date,
    Error,
}

impl CellValue {
    pub fn cell_type(&self) -> CellType {
        match self {
            CellValue::Empty => CellType::Empty,
            CellValue::Number(_) => CellType::Number,
            CellValue::Text(_) => CellType::Text,
            CellValue::Bool(_) => CellType::Bool,
            CellValue::DateTime(_) => CellType::Date,
            CellValue::Error(_) => CellType::Error,
        }
    }

    /// True only for the empty tag; `Text("")` and `Number(0.0)` are values.
    #[inline]
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }
}

/// Excel error codes as stored in BOOLERR records and formula results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellError {
    Null,
    Div0,
    Value,
    Ref,
    Name,
    Num,
    NA,
    GettingData,
    /// A code outside the documented set
    Unknown(u8),
}

impl CellError {
    pub fn from_code(code: u8) -> Self {
        match code {
            0x00 => CellError::Null,
            0x07 => CellError::Div0,
            0x0F => CellError::Value,
            0x17 => CellError::Ref,
            0x1D => CellError::Name,
            0x24 => CellError::Num,
            0x2A => CellError::NA,
            0x2B => CellError::GettingData,
            other => CellError::Unknown(other),
        }
    }

    pub fn code(self) -> u8 {
        match self {
            CellError::Null => 0x00,
            CellError::Div0 => 0x07,
            CellError::Value => 0x0F,
            CellError::Ref => 0x17,
            CellError::Name => 0x1D,
            CellError::Num => 0x24,
            CellError::NA => 0x2A,
            CellError::GettingData => 0x2B,
            CellError::Unknown(code) => code,
        }
    }
}

impl fmt::Display for CellError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellError::Null => f.write_str("#NULL!"),
            CellError::Div0 => f.write_str("#DIV/0!"),
            CellError::Value => f.write_str("#VALUE!"),
            CellError::Ref => f.write_str("#REF!"),
            CellError::Name => f.write_str("#NAME?"),
            CellError::Num => f.write_str("#NUM!"),
            CellError::NA => f.write_str("#N/A"),
            CellError::GettingData => f.write_str("#GETTING_DATA"),
            CellError::Unknown(code) => write!(f, "#ERR{}!", code),
        }
    }
}
