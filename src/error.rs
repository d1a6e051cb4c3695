//! Conversion failure taxonomy.
//!
//! Every failure of [`crate::compact`] or [`crate::dump`] ends up in one of
//! four kinds, each carrying the path involved and a diagnostic message.
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::ole::OleError;
use crate::ole::xls::XlsError;

/// Error type returned by the compactor.
#[derive(Error, Debug)]
pub enum CompactError {
    /// The input path does not exist or is not a regular file
    #[error("File not found: {}", path.display())]
    NotFound { path: PathBuf, message: String },

    /// The file exists but is not a readable workbook
    #[error("Malformed workbook {}: {message}", path.display())]
    MalformedWorkbook { path: PathBuf, message: String },

    /// The output could not be encoded or written
    #[error("Failed to write {}: {message}", path.display())]
    WriteFailure { path: PathBuf, message: String },

    /// Anything else
    #[error("Unexpected failure on {}: {message}", path.display())]
    UnknownFailure { path: PathBuf, message: String },
}

/// Discriminant of [`CompactError`] for callers that only branch on kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    MalformedWorkbook,
    WriteFailure,
    UnknownFailure,
}

/// Result type for compactor operations.
pub type Result<T> = std::result::Result<T, CompactError>;

impl CompactError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CompactError::NotFound { .. } => ErrorKind::NotFound,
            CompactError::MalformedWorkbook { .. } => ErrorKind::MalformedWorkbook,
            CompactError::WriteFailure { .. } => ErrorKind::WriteFailure,
            CompactError::UnknownFailure { .. } => ErrorKind::UnknownFailure,
        }
    }

    /// Path the failure refers to: the input for read failures, the output
    /// for write failures.
    pub fn path(&self) -> &Path {
        match self {
            CompactError::NotFound { path, .. }
            | CompactError::MalformedWorkbook { path, .. }
            | CompactError::WriteFailure { path, .. }
            | CompactError::UnknownFailure { path, .. } => path,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            CompactError::NotFound { message, .. }
            | CompactError::MalformedWorkbook { message, .. }
            | CompactError::WriteFailure { message, .. }
            | CompactError::UnknownFailure { message, .. } => message,
        }
    }

    pub(crate) fn not_found(path: &Path, message: impl Into<String>) -> Self {
        CompactError::NotFound {
            path: path.to_path_buf(),
            message: message.into(),
        }
    }

    pub(crate) fn malformed(path: &Path, message: impl Into<String>) -> Self {
        CompactError::MalformedWorkbook {
            path: path.to_path_buf(),
            message: message.into(),
        }
    }

    pub(crate) fn write_failure(path: &Path, message: impl Into<String>) -> Self {
        CompactError::WriteFailure {
            path: path.to_path_buf(),
            message: message.into(),
        }
    }

    pub(crate) fn unknown(path: &Path, message: impl Into<String>) -> Self {
        CompactError::UnknownFailure {
            path: path.to_path_buf(),
            message: message.into(),
        }
    }

    /// Classify a failure to read the workbook at `path`.
    ///
    /// Opening a missing file is `NotFound`; other I/O failures on the
    /// input are `UnknownFailure`; everything the parsers reject is
    /// `MalformedWorkbook`.
    pub(crate) fn from_read(path: &Path, err: XlsError) -> Self {
        match err {
            XlsError::Io(e) => Self::from_input_io(path, e),
            XlsError::Cfb(OleError::Io(e)) if e.kind() != io::ErrorKind::UnexpectedEof => {
                Self::from_input_io(path, e)
            },
            other => Self::malformed(path, other.to_string()),
        }
    }

    fn from_input_io(path: &Path, err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => Self::not_found(path, err.to_string()),
            // A short read means the file is truncated, not unreadable
            io::ErrorKind::UnexpectedEof => Self::malformed(path, err.to_string()),
            _ => Self::unknown(path, err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_and_accessors() {
        let err = CompactError::malformed(Path::new("a.xls"), "bad magic");
        assert_eq!(err.kind(), ErrorKind::MalformedWorkbook);
        assert_eq!(err.path(), Path::new("a.xls"));
        assert_eq!(err.message(), "bad magic");
        assert_eq!(err.to_string(), "Malformed workbook a.xls: bad magic");
    }

    #[test]
    fn test_read_classification() {
        let path = Path::new("in.xls");

        let missing = io::Error::new(io::ErrorKind::NotFound, "gone");
        assert_eq!(
            CompactError::from_read(path, XlsError::Io(missing)).kind(),
            ErrorKind::NotFound
        );

        let denied = io::Error::new(io::ErrorKind::PermissionDenied, "denied");
        assert_eq!(
            CompactError::from_read(path, XlsError::Io(denied)).kind(),
            ErrorKind::UnknownFailure
        );

        let short = io::Error::new(io::ErrorKind::UnexpectedEof, "short");
        assert_eq!(
            CompactError::from_read(path, XlsError::Cfb(OleError::Io(short))).kind(),
            ErrorKind::MalformedWorkbook
        );

        assert_eq!(
            CompactError::from_read(path, XlsError::Cfb(OleError::NotOleFile)).kind(),
            ErrorKind::MalformedWorkbook
        );
        assert_eq!(
            CompactError::from_read(path, XlsError::NoWorksheets).kind(),
            ErrorKind::MalformedWorkbook
        );
    }
}
