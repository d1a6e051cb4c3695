//! Workbook implementation for XLS files

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek};
use std::path::Path;

use tracing::debug;

use crate::ole::OleFile;
use crate::ole::binary;
use crate::ole::xls::error::{XlsError, XlsResult};
use crate::ole::xls::records::{
    self, BiffVersion, BofRecord, BoolErrValue, BoundSheetRecord, CellRecord, ExtendedFormat,
    FormatRecord, Record, RecordIter, SharedStringTable, SheetType, XlsEncoding,
};
use crate::ole::xls::utils::{self, FormulaValue};
use crate::sheet::{CellError, CellValue, Sheet, Workbook};

/// BOF substream type of the workbook globals
const SUBSTREAM_GLOBALS: u16 = 0x0005;

/// A parsed XLS workbook.
///
/// Parsing happens eagerly in [`XlsWorkbook::from_reader`]; every worksheet
/// (chart and macro sheets are skipped) is materialized as a [`Sheet`].
#[derive(Debug, Clone)]
pub struct XlsWorkbook {
    workbook: Workbook,
    biff_version: BiffVersion,
    codepage: u16,
}

impl XlsWorkbook {
    /// Open and parse an XLS file from disk
    pub fn open<P: AsRef<Path>>(path: P) -> XlsResult<Self> {
        let file = File::open(path.as_ref())?;
        Self::from_reader(BufReader::new(file))
    }

    /// Parse an XLS workbook from any seekable reader
    pub fn from_reader<R: Read + Seek>(reader: R) -> XlsResult<Self> {
        let mut ole_file = OleFile::open(reader)?;

        // BIFF8 calls the stream "Workbook", BIFF5 calls it "Book"
        let stream_name = if ole_file.exists(&["Workbook"]) { "Workbook" } else { "Book" };
        let stream = ole_file.open_stream(&[stream_name])?;

        let mut parser = StreamParser::new(RecordIter::new(Cursor::new(stream))?);
        let globals = parser.parse_globals()?;

        let mut sheets = Vec::new();
        for bound_sheet in &globals.bound_sheets {
            if bound_sheet.sheet_type != SheetType::WorkSheet {
                debug!(sheet = %bound_sheet.name, kind = ?bound_sheet.sheet_type, "skipping non-worksheet");
                continue;
            }
            sheets.push(parser.parse_worksheet(bound_sheet, &globals)?);
        }

        if sheets.is_empty() {
            return Err(XlsError::NoWorksheets);
        }

        debug!(
            sheets = sheets.len(),
            strings = globals.sst.strings.len(),
            version = ?globals.encoding.version,
            "parsed xls workbook"
        );

        Ok(XlsWorkbook {
            workbook: Workbook {
                sheets,
                is_1904: globals.is_1904,
            },
            biff_version: globals.encoding.version,
            codepage: globals.encoding.codepage,
        })
    }

    pub fn biff_version(&self) -> BiffVersion {
        self.biff_version
    }

    /// Codepage declared by the CODEPAGE record (1252 when absent)
    pub fn codepage(&self) -> u16 {
        self.codepage
    }

    pub fn is_1904(&self) -> bool {
        self.workbook.is_1904
    }

    pub fn sheets(&self) -> &[Sheet] {
        &self.workbook.sheets
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.workbook
            .sheets
            .iter()
            .map(|sheet| sheet.name.as_str())
            .collect()
    }

    /// The first worksheet in workbook order
    pub fn first_sheet(&self) -> XlsResult<&Sheet> {
        self.workbook.first_sheet().ok_or(XlsError::NoWorksheets)
    }

    pub fn sheet_by_name(&self, name: &str) -> XlsResult<&Sheet> {
        self.workbook
            .sheet_by_name(name)
            .ok_or_else(|| XlsError::WorksheetNotFound(name.to_string()))
    }

    pub fn into_workbook(self) -> Workbook {
        self.workbook
    }
}

/// Everything the worksheet substreams need from the globals substream
struct Globals {
    encoding: XlsEncoding,
    is_1904: bool,
    bound_sheets: Vec<BoundSheetRecord>,
    sst: SharedStringTable,
    /// Per XF index: whether its number format renders a date
    date_xfs: Vec<bool>,
}

impl Globals {
    fn is_date_xf(&self, xf_index: u16) -> bool {
        self.date_xfs
            .get(xf_index as usize)
            .copied()
            .unwrap_or(false)
    }

    fn number(&self, xf_index: u16, value: f64) -> CellValue {
        if self.is_date_xf(xf_index) {
            CellValue::DateTime(value)
        } else {
            CellValue::Number(value)
        }
    }
}

struct StreamParser<R> {
    records: RecordIter<R>,
}

impl<R: Read + Seek> StreamParser<R> {
    fn new(records: RecordIter<R>) -> Self {
        Self { records }
    }

    fn next_record(&mut self) -> XlsResult<Option<Record>> {
        self.records.next().transpose()
    }

    fn expect_bof(&mut self) -> XlsResult<BofRecord> {
        match self.next_record()? {
            Some(record) => BofRecord::parse(&record),
            None => Err(XlsError::InvalidData(
                "Stream ends before its BOF record".to_string(),
            )),
        }
    }

    fn parse_globals(&mut self) -> XlsResult<Globals> {
        let bof = self.expect_bof()?;
        if bof.substream != SUBSTREAM_GLOBALS {
            return Err(XlsError::InvalidData(format!(
                "Workbook stream starts with substream type 0x{:04X}",
                bof.substream
            )));
        }

        let mut encoding = XlsEncoding::new(bof.version);
        let mut is_1904 = false;
        let mut bound_sheets = Vec::new();
        let mut formats: HashMap<u16, String> = HashMap::new();
        let mut xf_formats: Vec<u16> = Vec::new();
        let mut sst_records: Option<(Vec<u8>, Vec<Vec<u8>>)> = None;
        let mut in_sst = false;

        while let Some(record) = self.next_record()? {
            let record_type = record.header.record_type;
            if record_type == records::CONTINUE && in_sst {
                if let Some((_, continues)) = sst_records.as_mut() {
                    continues.push(record.data);
                }
                continue;
            }
            in_sst = false;

            match record_type {
                records::EOF => break,
                records::FILEPASS => return Err(XlsError::PasswordProtected),
                records::CODEPAGE => {
                    encoding.codepage = binary::read_u16_le(&record.data, 0)?;
                },
                records::DATE1904 => {
                    is_1904 = binary::read_u16_le(&record.data, 0)? == 1;
                },
                records::FORMAT => {
                    let format = FormatRecord::parse(&record.data, &encoding)?;
                    formats.insert(format.index, format.format_string);
                },
                records::XF => {
                    xf_formats.push(ExtendedFormat::parse(&record.data)?.format_index);
                },
                records::BOUNDSHEET => {
                    bound_sheets.push(BoundSheetRecord::parse(&record.data, &encoding)?);
                },
                records::SST => {
                    sst_records = Some((record.data, Vec::new()));
                    in_sst = true;
                },
                _ => {},
            }
        }

        let sst = match &sst_records {
            Some((data, continues)) => {
                let continues: Vec<&[u8]> = continues.iter().map(Vec::as_slice).collect();
                SharedStringTable::parse(data, &continues)?
            },
            None => SharedStringTable::default(),
        };

        let date_xfs = xf_formats
            .iter()
            .map(|&index| utils::is_date_format(index, formats.get(&index).map(String::as_str)))
            .collect();

        debug!(
            codepage = encoding.codepage,
            is_1904,
            bound_sheets = bound_sheets.len(),
            xfs = xf_formats.len(),
            "parsed workbook globals"
        );

        Ok(Globals {
            encoding,
            is_1904,
            bound_sheets,
            sst,
            date_xfs,
        })
    }

    fn parse_worksheet(&mut self, bound_sheet: &BoundSheetRecord, globals: &Globals) -> XlsResult<Sheet> {
        self.records.seek(bound_sheet.position as u64)?;
        self.expect_bof()?;

        let mut sheet = Sheet::new(bound_sheet.name.clone());
        // Cell waiting for the STRING record that carries its formula text
        let mut pending_string: Option<(usize, usize)> = None;

        while let Some(record) = self.next_record()? {
            let record_type = record.header.record_type;
            match record_type {
                records::EOF => break,
                records::STRING => {
                    if let Some((row, col)) = pending_string.take() {
                        let (text, _) = globals.encoding.long_string(&record.data)?;
                        sheet.set_cell(row, col, CellValue::Text(text));
                    }
                },
                t if CellRecord::is_cell_record(t) => {
                    let cell = CellRecord::parse(t, &record.data, &globals.encoding)?;
                    pending_string = place_cell(&mut sheet, cell, globals)?;
                },
                _ => {},
            }
        }

        debug!(
            sheet = %sheet.name,
            rows = sheet.row_count(),
            columns = sheet.column_count(),
            "parsed worksheet"
        );
        Ok(sheet)
    }
}

/// Store a cell record's values in the grid.
///
/// Returns the position of a formula whose text result follows in a
/// STRING record.
fn place_cell(sheet: &mut Sheet, cell: CellRecord, globals: &Globals) -> XlsResult<Option<(usize, usize)>> {
    match cell {
        CellRecord::Blank { row, col, .. } => {
            sheet.set_cell(row as usize, col as usize, CellValue::Empty);
        },
        CellRecord::MulBlank {
            row,
            first_col,
            xf_indexes,
        } => {
            for offset in 0..xf_indexes.len() {
                sheet.set_cell(row as usize, first_col as usize + offset, CellValue::Empty);
            }
        },
        CellRecord::Number {
            row,
            col,
            xf_index,
            value,
        }
        | CellRecord::Rk {
            row,
            col,
            xf_index,
            value,
        } => {
            sheet.set_cell(row as usize, col as usize, globals.number(xf_index, value));
        },
        CellRecord::MulRk {
            row,
            first_col,
            values,
        } => {
            for (offset, (xf_index, value)) in values.into_iter().enumerate() {
                sheet.set_cell(
                    row as usize,
                    first_col as usize + offset,
                    globals.number(xf_index, value),
                );
            }
        },
        CellRecord::Label { row, col, value, .. } => {
            sheet.set_cell(row as usize, col as usize, CellValue::Text(value));
        },
        CellRecord::LabelSst {
            row,
            col,
            sst_index,
            ..
        } => {
            let text = globals.sst.get(sst_index).ok_or_else(|| {
                XlsError::InvalidData(format!(
                    "Shared string {} out of range at {}",
                    sst_index,
                    utils::cell_reference(row as u32, col as u32)
                ))
            })?;
            sheet.set_cell(row as usize, col as usize, CellValue::Text(text.to_string()));
        },
        CellRecord::BoolErr { row, col, value, .. } => {
            let value = match value {
                BoolErrValue::Bool(b) => CellValue::Bool(b),
                BoolErrValue::Error(code) => CellValue::Error(CellError::from_code(code)),
            };
            sheet.set_cell(row as usize, col as usize, value);
        },
        CellRecord::Formula {
            row,
            col,
            xf_index,
            value,
        } => {
            let (row, col) = (row as usize, col as usize);
            let value = match value {
                FormulaValue::Number(n) => globals.number(xf_index, n),
                FormulaValue::PendingString => {
                    sheet.set_cell(row, col, CellValue::Text(String::new()));
                    return Ok(Some((row, col)));
                },
                FormulaValue::EmptyString => CellValue::Text(String::new()),
                FormulaValue::Bool(b) => CellValue::Bool(b),
                FormulaValue::Error(code) => CellValue::Error(CellError::from_code(code)),
            };
            sheet.set_cell(row, col, value);
        },
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ole::writer::OleWriter;

    fn record(record_type: u16, data: &[u8]) -> Vec<u8> {
        let mut out = record_type.to_le_bytes().to_vec();
        out.extend_from_slice(&(data.len() as u16).to_le_bytes());
        out.extend_from_slice(data);
        out
    }

    fn bof(version: u16, substream: u16) -> Vec<u8> {
        let mut data = version.to_le_bytes().to_vec();
        data.extend(substream.to_le_bytes());
        data.extend([0u8; 12]);
        record(records::BOF, &data)
    }

    fn cell_header(row: u16, col: u16) -> Vec<u8> {
        [row.to_le_bytes(), col.to_le_bytes(), 15u16.to_le_bytes()].concat()
    }

    fn compound(stream_name: &str, stream: &[u8]) -> Cursor<Vec<u8>> {
        let mut writer = OleWriter::new();
        writer.create_stream(stream_name, stream).unwrap();
        let mut out = Cursor::new(Vec::new());
        writer.write_to(&mut out).unwrap();
        out.set_position(0);
        out
    }

    /// Globals with the given extra records and one BIFF5 worksheet per
    /// `(name, sheet type, body)`.
    fn biff5_stream(extra: &[Vec<u8>], sheets: &[(&str, u8, Vec<u8>)]) -> Vec<u8> {
        let boundsheet = |pos: u32, name: &str, kind: u8| {
            let mut data = pos.to_le_bytes().to_vec();
            data.extend([0, kind, name.len() as u8]);
            data.extend(name.as_bytes());
            record(records::BOUNDSHEET, &data)
        };

        let mut globals_len = bof(0x0500, 0x0005).len() + record(records::EOF, &[]).len();
        globals_len += extra.iter().map(Vec::len).sum::<usize>();
        globals_len += sheets
            .iter()
            .map(|(name, kind, _)| boundsheet(0, name, *kind).len())
            .sum::<usize>();

        let mut bodies = Vec::new();
        let mut positions = Vec::new();
        for (_, _, body) in sheets {
            positions.push((globals_len + bodies.len()) as u32);
            bodies.extend(bof(0x0500, 0x0010));
            bodies.extend(body);
            bodies.extend(record(records::EOF, &[]));
        }

        let mut stream = bof(0x0500, 0x0005);
        for rec in extra {
            stream.extend(rec);
        }
        for ((name, kind, _), pos) in sheets.iter().zip(positions) {
            stream.extend(boundsheet(pos, name, *kind));
        }
        stream.extend(record(records::EOF, &[]));
        stream.extend(bodies);
        stream
    }

    #[test]
    fn test_biff5_book_with_codepage() {
        let mut label = cell_header(0, 0);
        label.extend(4u16.to_le_bytes());
        label.extend([0xCF, 0xF0, 0xE8, 0xE2]); // "Прив" in windows-1251
        let mut number = cell_header(2, 1);
        number.extend(3.25f64.to_le_bytes());
        let body = [record(records::LABEL, &label), record(records::NUMBER, &number)].concat();

        let stream = biff5_stream(
            &[record(records::CODEPAGE, &1251u16.to_le_bytes())],
            &[("Data", 0, body)],
        );
        let workbook = XlsWorkbook::from_reader(compound("Book", &stream)).unwrap();

        assert_eq!(workbook.biff_version(), BiffVersion::Biff5);
        assert_eq!(workbook.codepage(), 1251);
        let sheet = workbook.first_sheet().unwrap();
        assert_eq!(sheet.name, "Data");
        assert_eq!(sheet.cell(0, 0), &CellValue::Text("Прив".to_string()));
        assert_eq!(sheet.cell(2, 1), &CellValue::Number(3.25));
        assert_eq!(sheet.row_count(), 3);
        assert!(sheet.cell(1, 0).is_empty());
    }

    #[test]
    fn test_formula_results_and_blanks() {
        let formula = |row: u16, result: [u8; 8]| {
            let mut data = cell_header(row, 0);
            data.extend(result);
            data.extend([0u8; 6]);
            record(records::FORMULA, &data)
        };
        let mut string = 5u16.to_le_bytes().to_vec();
        string.extend(b"total");
        let mut mulblank = cell_header(4, 0);
        mulblank.extend(15u16.to_le_bytes());
        mulblank.extend(2u16.to_le_bytes());

        let body = [
            formula(0, [0x00, 0, 0, 0, 0, 0, 0xFF, 0xFF]),
            record(records::STRING, &string),
            formula(1, [0x03, 0, 0, 0, 0, 0, 0xFF, 0xFF]),
            formula(2, [0x01, 0, 0x01, 0, 0, 0, 0xFF, 0xFF]),
            formula(3, [0x02, 0, 0x2A, 0, 0, 0, 0xFF, 0xFF]),
            record(records::MULBLANK, &mulblank),
        ]
        .concat();

        let stream = biff5_stream(&[], &[("F", 0, body)]);
        let workbook = XlsWorkbook::from_reader(compound("Book", &stream)).unwrap();
        let sheet = workbook.first_sheet().unwrap();

        assert_eq!(sheet.cell(0, 0), &CellValue::Text("total".to_string()));
        assert_eq!(sheet.cell(1, 0), &CellValue::Text(String::new()));
        assert_eq!(sheet.cell(2, 0), &CellValue::Bool(true));
        assert_eq!(sheet.cell(3, 0), &CellValue::Error(CellError::NA));
        assert_eq!(sheet.row_count(), 5);
        assert_eq!(sheet.row(4), &[CellValue::Empty, CellValue::Empty]);
    }

    #[test]
    fn test_date_format_from_custom_format_record() {
        let mut format = 164u16.to_le_bytes().to_vec();
        format.extend([10]);
        format.extend(b"yyyy-mm-dd");
        let xf = |ifmt: u16| {
            let mut data = 0u16.to_le_bytes().to_vec();
            data.extend(ifmt.to_le_bytes());
            data.extend([0u8; 12]);
            record(records::XF, &data)
        };
        let mut extra = vec![record(records::FORMAT, &format)];
        extra.extend((0..16).map(|_| xf(0)));
        extra.push(xf(164)); // XF 16

        let mut number = 0u16.to_le_bytes().to_vec();
        number.extend(0u16.to_le_bytes());
        number.extend(16u16.to_le_bytes());
        number.extend(43831.0f64.to_le_bytes());
        let mut plain = cell_header(0, 1);
        plain.extend(43831.0f64.to_le_bytes());
        let body = [record(records::NUMBER, &number), record(records::NUMBER, &plain)].concat();

        let stream = biff5_stream(&extra, &[("D", 0, body)]);
        let workbook = XlsWorkbook::from_reader(compound("Book", &stream)).unwrap();
        let sheet = workbook.first_sheet().unwrap();

        assert_eq!(sheet.cell(0, 0), &CellValue::DateTime(43831.0));
        assert_eq!(sheet.cell(0, 1), &CellValue::Number(43831.0));
    }

    #[test]
    fn test_chart_sheets_are_skipped() {
        let mut number = cell_header(0, 0);
        number.extend(1.0f64.to_le_bytes());
        let stream = biff5_stream(
            &[],
            &[("Chart", 2, Vec::new()), ("Values", 0, record(records::NUMBER, &number))],
        );
        let workbook = XlsWorkbook::from_reader(compound("Book", &stream)).unwrap();

        assert_eq!(workbook.sheet_names(), vec!["Values"]);
        assert!(workbook.sheet_by_name("Chart").is_err());
    }

    #[test]
    fn test_no_worksheets() {
        let stream = biff5_stream(&[], &[("Chart", 2, Vec::new())]);
        assert!(matches!(
            XlsWorkbook::from_reader(compound("Book", &stream)),
            Err(XlsError::NoWorksheets)
        ));
    }

    #[test]
    fn test_password_protected() {
        let stream = biff5_stream(&[record(records::FILEPASS, &[0, 0])], &[("S", 0, Vec::new())]);
        assert!(matches!(
            XlsWorkbook::from_reader(compound("Book", &stream)),
            Err(XlsError::PasswordProtected)
        ));
    }

    #[test]
    fn test_biff4_rejected() {
        let mut stream = record(0x0409, &[0, 0, 0x10, 0, 0, 0]);
        stream.extend(record(records::EOF, &[]));
        assert!(matches!(
            XlsWorkbook::from_reader(compound("Book", &stream)),
            Err(XlsError::UnsupportedBiffVersion(0x0409))
        ));
    }

    #[test]
    fn test_missing_workbook_stream() {
        let result = XlsWorkbook::from_reader(compound("Other", b"data"));
        assert!(matches!(result, Err(XlsError::Cfb(_))));
    }

    #[test]
    fn test_workbook_stream_preferred_over_book() {
        let mut number = cell_header(0, 0);
        number.extend(1.5f64.to_le_bytes());
        let newer = biff5_stream(&[], &[("New", 0, record(records::NUMBER, &number))]);
        let older = biff5_stream(&[], &[("Old", 0, Vec::new())]);

        let mut writer = OleWriter::new();
        writer.create_stream("Book", &older).unwrap();
        writer.create_stream("Workbook", &newer).unwrap();
        let mut out = Cursor::new(Vec::new());
        writer.write_to(&mut out).unwrap();
        out.set_position(0);

        let workbook = XlsWorkbook::from_reader(out).unwrap();
        assert_eq!(workbook.sheet_names(), vec!["New"]);
        assert_eq!(workbook.first_sheet().unwrap().cell(0, 0), &CellValue::Number(1.5));
    }

    #[test]
    fn test_not_an_ole_file() {
        let result = XlsWorkbook::from_reader(Cursor::new(vec![0u8; 2048]));
        assert!(matches!(result, Err(XlsError::Cfb(_))));
    }

    #[test]
    fn test_open_missing_path() {
        let dir = tempfile::tempdir().unwrap();
        match XlsWorkbook::open(dir.path().join("absent.xls")) {
            Err(XlsError::Io(e)) => assert_eq!(e.kind(), std::io::ErrorKind::NotFound),
            other => panic!("unexpected {:?}", other.map(|_| ())),
        }
    }
}
