/// Constants for OLE file format
pub mod consts;

/// Bounds-checked little-endian field readers
pub mod binary;

/// Windows codepage decoding for byte strings
pub mod codepage;

/// Main OLE file parsing implementation
mod file;

/// OLE2 compound file writer
pub mod writer;

/// Legacy Excel workbook (.xls) reader and writer
///
/// This module parses and produces BIFF workbooks stored in the
/// `Workbook` (BIFF8) or `Book` (BIFF5) stream of an OLE2 container.
pub mod xls;

// Re-export public types for convenient access
pub use file::{DirectoryEntry, OleError, OleFile};
