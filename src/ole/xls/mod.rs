//! Legacy Excel (.xls) file format reader and writer
//!
//! Reads BIFF5/BIFF7 (`Book` stream) and BIFF8 (`Workbook` stream)
//! workbooks into the [`crate::sheet`] model, and writes BIFF8 workbooks
//! holding plain cell values.

/// Error types for XLS parsing and writing
mod error;

/// BIFF record parsing
pub mod records;

/// Shared parsing utilities
pub mod utils;

/// Workbook parsing implementation
mod workbook;

/// BIFF8 writer
pub mod writer;

pub use error::{XlsError, XlsResult};
pub use records::BiffVersion;
pub use workbook::XlsWorkbook;
pub use writer::{XlsCellValue, XlsWriter};
