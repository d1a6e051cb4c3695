//! Error types for XLS file parsing and writing

use crate::ole::OleError;
use std::fmt;

/// Result type alias for XLS operations
pub type XlsResult<T> = Result<T, XlsError>;

/// Errors that can occur while reading or writing BIFF workbooks
#[derive(Debug)]
pub enum XlsError {
    /// I/O error
    Io(std::io::Error),
    /// CFB (Compound File Binary) error
    Cfb(OleError),
    /// Invalid BIFF record
    InvalidRecord {
        /// Record type
        record_type: u16,
        /// Error description
        message: String,
    },
    /// Workbook stream is older than BIFF5 or otherwise unrecognised
    UnsupportedBiffVersion(u16),
    /// Workbook is encrypted (FILEPASS record present)
    PasswordProtected,
    /// Invalid data length
    InvalidLength {
        /// Expected length
        expected: usize,
        /// Found length
        found: usize,
    },
    /// Worksheet not found
    WorksheetNotFound(String),
    /// Workbook declares no worksheets
    NoWorksheets,
    /// Invalid data
    InvalidData(String),
}

impl fmt::Display for XlsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            XlsError::Io(e) => write!(f, "I/O error: {}", e),
            XlsError::Cfb(e) => write!(f, "CFB error: {}", e),
            XlsError::InvalidRecord {
                record_type,
                message,
            } => {
                write!(f, "Invalid record 0x{:04X}: {}", record_type, message)
            },
            XlsError::UnsupportedBiffVersion(version) => {
                write!(f, "Unsupported BIFF version: 0x{:04X}", version)
            },
            XlsError::PasswordProtected => {
                write!(f, "Workbook is password protected")
            },
            XlsError::InvalidLength { expected, found } => {
                write!(f, "Invalid length: expected {}, found {}", expected, found)
            },
            XlsError::WorksheetNotFound(name) => {
                write!(f, "Worksheet '{}' not found", name)
            },
            XlsError::NoWorksheets => write!(f, "Workbook contains no worksheets"),
            XlsError::InvalidData(msg) => {
                write!(f, "Invalid data: {}", msg)
            },
        }
    }
}

impl std::error::Error for XlsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            XlsError::Io(e) => Some(e),
            XlsError::Cfb(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for XlsError {
    fn from(err: std::io::Error) -> Self {
        XlsError::Io(err)
    }
}

impl From<OleError> for XlsError {
    fn from(err: OleError) -> Self {
        match err {
            // Field readers report short records this way
            OleError::InvalidData(msg) => XlsError::InvalidData(msg),
            other => XlsError::Cfb(other),
        }
    }
}
