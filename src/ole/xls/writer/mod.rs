//! XLS file writing module
//!
//! Creates Microsoft Excel files in the legacy binary format (.xls, BIFF8)
//! holding plain cell values.

/// BIFF8 record generation
pub(crate) mod biff;

/// Core XLS writer implementation
mod core;

/// Font and XF tables
pub mod formatting;

#[cfg(test)]
mod tests;

pub use self::core::{MAX_COL, MAX_ROW, MAX_STRING_LEN, XlsCellValue, XlsWriter};
pub use formatting::{DATE_CELL_XF, DEFAULT_CELL_XF};
