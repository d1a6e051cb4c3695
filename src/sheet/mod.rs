//! Typed spreadsheet model shared by the reader, the writer and the
//! compactor.
//!
//! A [`Workbook`] is an ordered list of [`Sheet`]s; a sheet is a grid of
//! [`CellValue`]s addressed by zero-based row and column.
//!
//! ```rust
//! use xlscompact::sheet::{CellType, CellValue, Sheet};
//!
//! let mut sheet = Sheet::new("Data");
//! sheet.set_cell(1, 2, CellValue::Text("x".into()));
//!
//! assert_eq!(sheet.row_count(), 2);
//! assert_eq!(sheet.cell(1, 2).cell_type(), CellType::Text);
//! assert!(sheet.cell(0, 0).is_empty());
//! ```

pub mod types;
mod workbook;

pub use types::{CellError, CellType, CellValue};
pub use workbook::{Sheet, Workbook};
