//! OLE2 file writing module
//!
//! Produces compound documents whose streams all live under the root
//! storage, which is the layout Excel uses for `.xls` workbooks.

/// FAT (File Allocation Table) generation
mod fat;

/// MiniFAT (Mini File Allocation Table) generation
mod minifat;

/// DIFAT (Double Indirect FAT) generation
mod difat;

/// Directory generation
mod directory;

/// OLE2 header generation
mod header;

/// Core OLE writer implementation
mod core;

/// Round-trip tests against the OLE reader
#[cfg(test)]
mod tests;

pub use self::core::OleWriter;
