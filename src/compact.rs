//! Blank-row compaction of the first sheet of a workbook.
//!
//! [`compact`] loads the workbook, keeps every row of the first sheet that
//! holds at least one non-empty cell, and writes the result next to the
//! input as `{stem}_corrected{ext}`.
use std::ffi::OsString;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, error, info};

use crate::error::{CompactError, Result};
use crate::ole::xls::{XlsError, XlsWorkbook, XlsWriter};
use crate::sheet::{CellValue, Sheet};

/// Suffix appended to the output file stem by default.
pub const DEFAULT_SUFFIX: &str = "_corrected";

/// Options for [`compact_with`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompactOptions {
    /// Inserted between the input stem and its extension
    pub suffix: String,
}

impl Default for CompactOptions {
    fn default() -> Self {
        Self {
            suffix: DEFAULT_SUFFIX.to_string(),
        }
    }
}

impl CompactOptions {
    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = suffix.into();
        self
    }
}

/// Drop the blank rows of the first sheet of `input` and write the result to
/// `{dir}/{stem}_corrected{ext}`.
///
/// Returns the output path. On failure nothing is written and the error is
/// logged once.
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
///
/// let output = xlscompact::compact(Path::new("report.xls"))?;
/// assert_eq!(output, Path::new("report_corrected.xls"));
/// # Ok::<(), xlscompact::CompactError>(())
/// ```
pub fn compact(input: &Path) -> Result<PathBuf> {
    compact_with(input, &CompactOptions::default())
}

/// [`compact`] with explicit options.
pub fn compact_with(input: &Path, options: &CompactOptions) -> Result<PathBuf> {
    match run(input, options) {
        Ok(output) => {
            info!(input = %input.display(), output = %output.display(), "compacted workbook");
            Ok(output)
        },
        Err(err) => {
            error!(
                path = %err.path().display(),
                kind = ?err.kind(),
                message = %err.message(),
                "compaction failed"
            );
            Err(err)
        },
    }
}

fn run(input: &Path, options: &CompactOptions) -> Result<PathBuf> {
    if options.suffix.is_empty() {
        return Err(CompactError::unknown(
            input,
            "empty suffix would overwrite the input file",
        ));
    }

    let source = load_first_sheet(input)?;
    let compacted = compact_sheet(&source.sheet);
    debug!(
        sheet = %compacted.name,
        rows_in = source.sheet.row_count(),
        rows_out = compacted.row_count(),
        "dropped blank rows"
    );

    let output = corrected_path(input, &options.suffix);
    let bytes = encode_sheet(&compacted, source.is_1904)
        .map_err(|e| CompactError::write_failure(&output, e.to_string()))?;
    persist(&output, &bytes)?;
    Ok(output)
}

/// First sheet of a workbook together with its date system.
pub(crate) struct SourceSheet {
    pub sheet: Sheet,
    pub is_1904: bool,
}

/// Open `input` and take its first sheet, classifying failures.
pub(crate) fn load_first_sheet(input: &Path) -> Result<SourceSheet> {
    match fs::metadata(input) {
        Ok(meta) if meta.is_file() => {},
        Ok(_) => return Err(CompactError::not_found(input, "not a regular file")),
        Err(e) => return Err(CompactError::from_read(input, XlsError::Io(e))),
    }

    let workbook = XlsWorkbook::open(input)
        .map_err(|e| CompactError::from_read(input, e))?
        .into_workbook();
    let is_1904 = workbook.is_1904;
    let sheet = workbook
        .sheets
        .into_iter()
        .next()
        .ok_or_else(|| CompactError::malformed(input, XlsError::NoWorksheets.to_string()))?;

    Ok(SourceSheet { sheet, is_1904 })
}

/// True when every cell of the row is empty. A row with no cells is blank.
pub fn is_blank_row(row: &[CellValue]) -> bool {
    row.iter().all(CellValue::is_empty)
}

/// Copy of `sheet` without its blank rows, keeping row order, column
/// positions and the sheet name.
pub fn compact_sheet(sheet: &Sheet) -> Sheet {
    let rows = sheet
        .rows()
        .filter(|row| !is_blank_row(row))
        .map(<[CellValue]>::to_vec)
        .collect();
    Sheet::from_rows(sheet.name.clone(), rows)
}

/// Output path for `input`: same directory and extension, `suffix` appended
/// to the stem.
///
/// A leading dot does not start an extension, so `.xls` gets the suffix
/// after it. A name without an extension stays without one.
pub fn corrected_path(input: &Path, suffix: &str) -> PathBuf {
    let Some(file_name) = input.file_name() else {
        let mut name = input.as_os_str().to_os_string();
        name.push(suffix);
        return PathBuf::from(name);
    };

    // Path::file_stem/extension already treat a leading dot as part of the stem
    let stem = Path::new(file_name).file_stem().unwrap_or(file_name);
    let mut name = OsString::from(stem);
    name.push(suffix);
    if let Some(ext) = Path::new(file_name).extension() {
        name.push(".");
        name.push(ext);
    }
    input.with_file_name(name)
}

/// Encode a single sheet as a BIFF8 workbook, values only.
fn encode_sheet(sheet: &Sheet, is_1904: bool) -> std::result::Result<Vec<u8>, XlsError> {
    let mut writer = XlsWriter::new();
    writer.set_1904_dates(is_1904);
    let index = writer.add_worksheet(&sheet.name)?;

    for (row_index, row) in sheet.rows().enumerate() {
        let row_num = u32::try_from(row_index)
            .map_err(|_| XlsError::InvalidData(format!("row {} out of range", row_index)))?;
        for (col_index, value) in row.iter().enumerate() {
            let col = u16::try_from(col_index)
                .map_err(|_| XlsError::InvalidData(format!("column {} out of range", col_index)))?;
            match value {
                CellValue::Empty => {},
                CellValue::Number(n) => writer.write_number(index, row_num, col, *n)?,
                CellValue::Text(s) => writer.write_string(index, row_num, col, s)?,
                CellValue::Bool(b) => writer.write_boolean(index, row_num, col, *b)?,
                CellValue::DateTime(serial) => writer.write_date(index, row_num, col, *serial)?,
                CellValue::Error(e) => writer.write_error(index, row_num, col, *e)?,
            }
        }
    }

    writer.to_bytes()
}

/// Write `bytes` to a temporary file beside `output` and rename it into
/// place. The temporary file is removed on every error path.
fn persist(output: &Path, bytes: &[u8]) -> Result<()> {
    let dir = match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let fail = |e: std::io::Error| CompactError::write_failure(output, e.to_string());

    let mut file = NamedTempFile::new_in(dir).map_err(fail)?;
    file.write_all(bytes).map_err(fail)?;
    file.flush().map_err(fail)?;
    file.as_file().sync_all().map_err(fail)?;
    file.persist(output).map_err(|e| fail(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::sheet::CellError;
    use proptest::prelude::*;
    use tempfile::tempdir;

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.to_string())
    }

    fn write_input(path: &Path, name: &str, rows: &[Vec<CellValue>]) {
        let mut writer = XlsWriter::new();
        let sheet = writer.add_worksheet(name).unwrap();
        for (r, row) in rows.iter().enumerate() {
            for (c, value) in row.iter().enumerate() {
                let (r, c) = (r as u32, c as u16);
                match value {
                    CellValue::Empty => {},
                    CellValue::Number(n) => writer.write_number(sheet, r, c, *n).unwrap(),
                    CellValue::Text(s) => writer.write_string(sheet, r, c, s).unwrap(),
                    CellValue::Bool(b) => writer.write_boolean(sheet, r, c, *b).unwrap(),
                    CellValue::DateTime(d) => writer.write_date(sheet, r, c, *d).unwrap(),
                    CellValue::Error(e) => writer.write_error(sheet, r, c, *e).unwrap(),
                }
            }
        }
        fs::write(path, writer.to_bytes().unwrap()).unwrap();
    }

    fn read_sheet(path: &Path) -> Sheet {
        XlsWorkbook::open(path)
            .unwrap()
            .into_workbook()
            .sheets
            .remove(0)
    }

    #[test]
    fn test_blank_row_dropped() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("data.xls");
        write_input(
            &input,
            "Sheet1",
            &[
                vec![text("a"), CellValue::Number(1.0)],
                vec![],
                vec![text("b"), CellValue::Number(2.0)],
            ],
        );

        let output = compact(&input).unwrap();
        assert_eq!(output, dir.path().join("data_corrected.xls"));

        let sheet = read_sheet(&output);
        assert_eq!(sheet.name, "Sheet1");
        assert_eq!(sheet.row_count(), 2);
        assert_eq!(sheet.row(0), &[text("a"), CellValue::Number(1.0)]);
        assert_eq!(sheet.row(1), &[text("b"), CellValue::Number(2.0)]);
    }

    #[test]
    fn test_no_blank_rows_copies_values() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("full.xls");
        let rows = vec![
            vec![text("id"), text("when"), text("ok"), text("err")],
            vec![
                CellValue::Number(7.5),
                CellValue::DateTime(44197.5),
                CellValue::Bool(true),
                CellValue::Error(CellError::NA),
            ],
            vec![text("ünïcödé"), CellValue::Empty, text("")],
        ];
        write_input(&input, "Report", &rows);

        let sheet = read_sheet(&compact(&input).unwrap());
        assert_eq!(sheet.name, "Report");
        assert_eq!(sheet.row_count(), 3);
        assert_eq!(sheet.row(0), rows[0].as_slice());
        assert_eq!(sheet.row(1), rows[1].as_slice());
        assert_eq!(sheet.row(2), &[text("ünïcödé"), CellValue::Empty, text("")]);
    }

    #[test]
    fn test_empty_string_row_is_kept() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("strings.xls");
        write_input(&input, "S", &[vec![text("")], vec![], vec![text("x")]]);

        let sheet = read_sheet(&compact(&input).unwrap());
        assert_eq!(sheet.row_count(), 2);
        assert_eq!(sheet.cell(0, 0), &text(""));
        assert_eq!(sheet.cell(1, 0), &text("x"));
    }

    #[test]
    fn test_compaction_is_idempotent() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("twice.xls");
        write_input(
            &input,
            "T",
            &[vec![], vec![CellValue::Empty, text("a")], vec![], vec![CellValue::Number(3.0)]],
        );

        let first = compact(&input).unwrap();
        let second = compact(&first).unwrap();
        assert_eq!(second, dir.path().join("twice_corrected_corrected.xls"));

        let once = read_sheet(&first);
        let again = read_sheet(&second);
        assert_eq!(once.row_count(), 2);
        assert_eq!(once.rows().collect::<Vec<_>>(), again.rows().collect::<Vec<_>>());
    }

    #[test]
    fn test_1904_dates_preserved() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("mac.xls");
        let mut writer = XlsWriter::new();
        writer.set_1904_dates(true);
        let sheet = writer.add_worksheet("Mac").unwrap();
        writer.write_date(sheet, 2, 0, 1000.0).unwrap();
        fs::write(&input, writer.to_bytes().unwrap()).unwrap();

        let output = compact(&input).unwrap();
        let workbook = XlsWorkbook::open(&output).unwrap();
        assert!(workbook.is_1904());
        assert_eq!(workbook.first_sheet().unwrap().row(0), &[CellValue::DateTime(1000.0)]);
    }

    #[test]
    fn test_only_first_sheet_written() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("multi.xls");
        let mut writer = XlsWriter::new();
        let first = writer.add_worksheet("First").unwrap();
        let second = writer.add_worksheet("Second").unwrap();
        writer.write_string(first, 0, 0, "keep").unwrap();
        writer.write_string(second, 0, 0, "ignored").unwrap();
        fs::write(&input, writer.to_bytes().unwrap()).unwrap();

        let workbook = XlsWorkbook::open(compact(&input).unwrap()).unwrap();
        assert_eq!(workbook.sheet_names(), vec!["First"]);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("absent.xls");

        let err = compact(&input).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.path(), input.as_path());
        assert!(!dir.path().join("absent_corrected.xls").exists());
    }

    #[test]
    fn test_directory_is_not_found() {
        let dir = tempdir().unwrap();
        let err = compact(dir.path()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_corrupted_file() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("broken.xls");
        fs::write(&input, b"this is plain text, not a compound file".repeat(40)).unwrap();

        let err = compact(&input).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedWorkbook);
        assert!(!dir.path().join("broken_corrected.xls").exists());
        // Only the input remains
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_empty_file() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("empty.xls");
        fs::write(&input, b"").unwrap();

        assert_eq!(compact(&input).unwrap_err().kind(), ErrorKind::MalformedWorkbook);
    }

    #[test]
    fn test_custom_and_empty_suffix() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("in.xls");
        write_input(&input, "S", &[vec![CellValue::Number(1.0)]]);

        let options = CompactOptions::default().with_suffix("_clean");
        assert_eq!(compact_with(&input, &options).unwrap(), dir.path().join("in_clean.xls"));

        let options = CompactOptions::default().with_suffix("");
        let err = compact_with(&input, &options).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownFailure);
    }

    #[test]
    fn test_existing_output_replaced() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("r.xls");
        let output = dir.path().join("r_corrected.xls");
        fs::write(&output, b"stale").unwrap();
        write_input(&input, "S", &[vec![text("fresh")]]);

        compact(&input).unwrap();
        assert_eq!(read_sheet(&output).cell(0, 0), &text("fresh"));
    }

    #[test]
    fn test_write_failure_when_directory_missing() {
        let dir = tempdir().unwrap();
        let output = dir.path().join("missing").join("out.xls");
        let err = persist(&output, b"data").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::WriteFailure);
        assert_eq!(err.path(), output.as_path());
    }

    #[test]
    fn test_corrected_path() {
        assert_eq!(
            corrected_path(Path::new("/data/report.xls"), "_corrected"),
            PathBuf::from("/data/report_corrected.xls")
        );
        assert_eq!(
            corrected_path(Path::new("report.xls"), "_corrected"),
            PathBuf::from("report_corrected.xls")
        );
        assert_eq!(
            corrected_path(Path::new("dir/archive.tar.xls"), "_x"),
            PathBuf::from("dir/archive.tar_x.xls")
        );
        assert_eq!(
            corrected_path(Path::new("dir/README"), "_corrected"),
            PathBuf::from("dir/README_corrected")
        );
        assert_eq!(
            corrected_path(Path::new("dir/.xls"), "_corrected"),
            PathBuf::from("dir/.xls_corrected")
        );
    }

    #[test]
    fn test_is_blank_row() {
        assert!(is_blank_row(&[]));
        assert!(is_blank_row(&[CellValue::Empty, CellValue::Empty]));
        assert!(!is_blank_row(&[CellValue::Empty, text("")]));
        assert!(!is_blank_row(&[CellValue::Number(0.0)]));
        assert!(!is_blank_row(&[CellValue::Bool(false)]));
    }

    #[test]
    fn test_compact_sheet_keeps_columns() {
        let sheet = Sheet::from_rows(
            "Grid",
            vec![
                vec![CellValue::Empty, CellValue::Empty],
                vec![CellValue::Empty, CellValue::Empty, text("c")],
                vec![],
                vec![CellValue::Number(1.0)],
            ],
        );
        let compacted = compact_sheet(&sheet);
        assert_eq!(compacted.name, "Grid");
        assert_eq!(compacted.row_count(), 2);
        assert_eq!(compacted.cell(0, 2), &text("c"));
        assert!(compacted.cell(0, 0).is_empty());
        assert_eq!(compacted.cell(1, 0), &CellValue::Number(1.0));
    }

    fn cell_strategy() -> impl Strategy<Value = CellValue> {
        prop_oneof![
            4 => Just(CellValue::Empty),
            1 => (-1e6f64..1e6).prop_map(CellValue::Number),
            1 => "[a-z]{0,4}".prop_map(CellValue::Text),
            1 => any::<bool>().prop_map(CellValue::Bool),
        ]
    }

    proptest! {
        #[test]
        fn prop_compact_sheet_filters_blank_rows(
            rows in prop::collection::vec(prop::collection::vec(cell_strategy(), 0..5), 0..20)
        ) {
            let sheet = Sheet::from_rows("P", rows.clone());
            let compacted = compact_sheet(&sheet);

            let expected: Vec<&[CellValue]> = sheet.rows().filter(|r| !is_blank_row(r)).collect();
            let actual: Vec<&[CellValue]> = compacted.rows().collect();
            prop_assert_eq!(&actual, &expected);
            prop_assert!(compacted.rows().all(|r| !is_blank_row(r)));

            let again = compact_sheet(&compacted);
            prop_assert_eq!(again.rows().collect::<Vec<_>>(), actual);
        }
    }
}
