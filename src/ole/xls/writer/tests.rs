//! Round trips through `XlsWriter` and `XlsWorkbook`

use std::io::Cursor;

use super::XlsWriter;
use crate::ole::OleFile;
use crate::ole::xls::{BiffVersion, XlsWorkbook};
use crate::sheet::{CellError, CellType, CellValue};

fn read_back(writer: &XlsWriter) -> XlsWorkbook {
    let bytes = writer.to_bytes().unwrap();
    XlsWorkbook::from_reader(Cursor::new(bytes)).unwrap()
}

#[test]
fn test_values_and_types_round_trip() {
    let mut writer = XlsWriter::new();
    let sheet = writer.add_worksheet("Values").unwrap();
    writer.write_string(sheet, 0, 0, "name").unwrap();
    writer.write_number(sheet, 0, 1, -12.75).unwrap();
    writer.write_boolean(sheet, 0, 2, false).unwrap();
    writer.write_error(sheet, 0, 3, CellError::Div0).unwrap();
    writer.write_date(sheet, 0, 4, 43831.25).unwrap();
    writer.write_string(sheet, 2, 1, "").unwrap();

    let workbook = read_back(&writer);
    assert_eq!(workbook.biff_version(), BiffVersion::Biff8);
    assert!(!workbook.is_1904());

    let sheet = workbook.first_sheet().unwrap();
    assert_eq!(sheet.name, "Values");
    assert_eq!(
        sheet.row(0),
        &[
            CellValue::Text("name".to_string()),
            CellValue::Number(-12.75),
            CellValue::Bool(false),
            CellValue::Error(CellError::Div0),
            CellValue::DateTime(43831.25),
        ]
    );
    assert_eq!(sheet.cell(0, 4).cell_type(), CellType::Date);
    assert!(sheet.row(1).is_empty());
    assert_eq!(sheet.cell(2, 1), &CellValue::Text(String::new()));
    assert!(sheet.cell(2, 0).is_empty());
    assert_eq!(sheet.row_count(), 3);
}

#[test]
fn test_non_ascii_text_and_names() {
    let mut writer = XlsWriter::new();
    let first = writer.add_worksheet("Données").unwrap();
    let second = writer.add_worksheet("Лист2").unwrap();
    writer.write_string(first, 0, 0, "café").unwrap();
    writer.write_string(first, 0, 1, "€ 10").unwrap();
    writer.write_string(second, 0, 0, "日本語 🎉").unwrap();

    let workbook = read_back(&writer);
    assert_eq!(workbook.sheet_names(), vec!["Données", "Лист2"]);
    assert_eq!(
        workbook.sheets()[0].row(0),
        &[
            CellValue::Text("café".to_string()),
            CellValue::Text("€ 10".to_string()),
        ]
    );
    assert_eq!(
        workbook.sheet_by_name("Лист2").unwrap().cell(0, 0),
        &CellValue::Text("日本語 🎉".to_string())
    );
}

#[test]
fn test_1904_date_system() {
    let mut writer = XlsWriter::new();
    writer.set_1904_dates(true);
    let sheet = writer.add_worksheet("S").unwrap();
    writer.write_date(sheet, 0, 0, 100.0).unwrap();

    let workbook = read_back(&writer);
    assert!(workbook.is_1904());
    assert_eq!(workbook.first_sheet().unwrap().cell(0, 0), &CellValue::DateTime(100.0));
}

#[test]
fn test_sst_spanning_continue_records() {
    let mut writer = XlsWriter::new();
    let sheet = writer.add_worksheet("Strings").unwrap();

    let mut expected = Vec::new();
    for i in 0..1500u32 {
        let value = if i % 3 == 0 {
            format!("строка номер {}", i)
        } else {
            format!("row number {}", i)
        };
        writer.write_string(sheet, i, 0, &value).unwrap();
        expected.push(value);
    }
    // One string longer than a whole record
    let long = "Ж".repeat(6000);
    writer.write_string(sheet, 1500, 0, &long).unwrap();
    expected.push(long);

    let workbook = read_back(&writer);
    let sheet = workbook.first_sheet().unwrap();
    assert_eq!(sheet.row_count(), expected.len());
    for (row, value) in expected.iter().enumerate() {
        assert_eq!(sheet.cell(row, 0), &CellValue::Text(value.clone()), "row {}", row);
    }
}

#[test]
fn test_workbook_stream_in_regular_sectors() {
    let mut writer = XlsWriter::new();
    writer.add_worksheet("Empty").unwrap();
    let bytes = writer.to_bytes().unwrap();

    let mut ole = OleFile::open(Cursor::new(bytes.clone())).unwrap();
    let stream = ole.open_stream(&["Workbook"]).unwrap();
    assert!(stream.len() >= 4096);

    let workbook = XlsWorkbook::from_reader(Cursor::new(bytes)).unwrap();
    assert_eq!(workbook.first_sheet().unwrap().row_count(), 0);
}

#[test]
fn test_sparse_grid_keeps_positions() {
    let mut writer = XlsWriter::new();
    let sheet = writer.add_worksheet("Sparse").unwrap();
    writer.write_number(sheet, 4000, 200, 1.0).unwrap();
    writer.write_number(sheet, 0, 0, 2.0).unwrap();

    let workbook = read_back(&writer);
    let sheet = workbook.first_sheet().unwrap();
    assert_eq!(sheet.row_count(), 4001);
    assert_eq!(sheet.column_count(), 201);
    assert_eq!(sheet.cell(4000, 200), &CellValue::Number(1.0));
    assert_eq!(sheet.cell(0, 0), &CellValue::Number(2.0));
}
