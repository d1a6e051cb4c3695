//! xlscompact - drop blank rows from legacy Excel workbooks
//!
//! This library reads the first sheet of a legacy Excel workbook (.xls,
//! BIFF5 or BIFF8 inside an OLE2 compound file), removes every row whose
//! cells are all empty, and writes the result as a BIFF8 workbook next to
//! the input.
//!
//! # Features
//!
//! - **OLE2 reader and writer**: compound files with FAT, DIFAT and MiniFAT
//! - **BIFF reader**: BIFF5/BIFF8 workbooks into a typed sheet model,
//!   including shared strings, formula results and date detection
//! - **BIFF8 writer**: plain cell values with a shared string table
//! - **Compaction**: blank-row removal with atomic output
//!
//! # Example - Compacting a workbook
//!
//! ```no_run
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Writes report_corrected.xls beside the input
//! let output = xlscompact::compact(Path::new("report.xls"))?;
//! println!("Wrote {}", output.display());
//! # Ok(())
//! # }
//! ```
//!
//! # Example - Reading a workbook
//!
//! ```no_run
//! use xlscompact::ole::xls::XlsWorkbook;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let workbook = XlsWorkbook::open("report.xls")?;
//! let sheet = workbook.first_sheet()?;
//!
//! for row in sheet.rows() {
//!     println!("{:?}", row);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Example - Low-level OLE access
//!
//! ```no_run
//! use std::fs::File;
//! use xlscompact::ole::OleFile;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let file = File::open("report.xls")?;
//! let mut ole = OleFile::open(file)?;
//!
//! for stream in ole.list_streams() {
//!     println!("Stream: {:?}", stream);
//! }
//!
//! let data = ole.open_stream(&["Workbook"])?;
//! println!("Stream size: {} bytes", data.len());
//! # Ok(())
//! # }
//! ```

/// OLE2 (Object Linking and Embedding) compound files
///
/// Holds the compound file reader and writer, and the `xls` submodule for
/// the BIFF workbook stream stored inside.
pub mod ole;

/// Typed spreadsheet model
pub mod sheet;

/// Blank-row compaction
mod compact;

/// Console listing of the first sheet
mod dump;

/// Conversion error taxonomy
mod error;

pub use compact::{
    CompactOptions, DEFAULT_SUFFIX, compact, compact_sheet, compact_with, corrected_path,
    is_blank_row,
};
pub use dump::dump;
pub use error::{CompactError, ErrorKind, Result};
