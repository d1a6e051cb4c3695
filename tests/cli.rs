use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::tempdir;
use xlscompact::ole::xls::{XlsWorkbook, XlsWriter};
use xlscompact::sheet::CellValue;

fn xlscompact(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_xlscompact"))
        .args(args)
        .env("XLSCOMPACT_LOG", "off")
        .output()
        .expect("run xlscompact")
}

fn write_sample(path: &Path) {
    let mut writer = XlsWriter::new();
    let sheet = writer.add_worksheet("Sheet1").expect("add sheet");
    writer.write_string(sheet, 0, 0, "a").expect("write a");
    writer.write_number(sheet, 0, 1, 1.0).expect("write 1");
    writer.write_string(sheet, 2, 0, "b").expect("write b");
    writer.write_number(sheet, 2, 1, 2.0).expect("write 2");
    fs::write(path, writer.to_bytes().expect("encode sample")).expect("write sample");
}

fn stdout_path(output: &Output) -> PathBuf {
    PathBuf::from(String::from_utf8_lossy(&output.stdout).trim_end())
}

#[test]
fn compact_prints_output_path() {
    let dir = tempdir().expect("create temp dir");
    let input = dir.path().join("sample.xls");
    write_sample(&input);

    let output = xlscompact(&["compact", input.to_str().expect("utf-8 path")]);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let expected = dir.path().join("sample_corrected.xls");
    assert_eq!(stdout_path(&output), expected);

    let workbook = XlsWorkbook::open(&expected).expect("open output");
    let sheet = workbook.first_sheet().expect("first sheet");
    assert_eq!(sheet.row_count(), 2);
    assert_eq!(sheet.cell(1, 0), &CellValue::Text("b".to_string()));
}

#[test]
fn compact_honours_suffix() {
    let dir = tempdir().expect("create temp dir");
    let input = dir.path().join("sample.xls");
    write_sample(&input);

    let output = xlscompact(&[
        "compact",
        input.to_str().expect("utf-8 path"),
        "--suffix",
        "_clean",
    ]);
    assert!(output.status.success());
    assert_eq!(stdout_path(&output), dir.path().join("sample_clean.xls"));
    assert!(dir.path().join("sample_clean.xls").is_file());
    assert!(!dir.path().join("sample_corrected.xls").exists());
}

#[test]
fn compact_missing_file_exits_with_one() {
    let dir = tempdir().expect("create temp dir");
    let input = dir.path().join("absent.xls");

    let output = xlscompact(&["compact", input.to_str().expect("utf-8 path")]);
    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
    assert!(!dir.path().join("absent_corrected.xls").exists());
}

#[test]
fn compact_malformed_file_exits_with_one() {
    let dir = tempdir().expect("create temp dir");
    let input = dir.path().join("junk.xls");
    fs::write(&input, vec![0x20u8; 4096]).expect("write junk");

    let output = xlscompact(&["compact", input.to_str().expect("utf-8 path")]);
    assert_eq!(output.status.code(), Some(1));
    assert!(!dir.path().join("junk_corrected.xls").exists());
}

#[test]
fn compact_empty_suffix_exits_with_one() {
    let dir = tempdir().expect("create temp dir");
    let input = dir.path().join("sample.xls");
    write_sample(&input);
    let before = fs::read(&input).expect("read input");

    let output = xlscompact(&["compact", input.to_str().expect("utf-8 path"), "--suffix", ""]);
    assert_eq!(output.status.code(), Some(1));
    assert_eq!(fs::read(&input).expect("read input"), before);
}

#[test]
fn dump_prints_rows() {
    let dir = tempdir().expect("create temp dir");
    let input = dir.path().join("sample.xls");
    write_sample(&input);

    let output = xlscompact(&["dump", input.to_str().expect("utf-8 path")]);
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout), "a\t1\n\t\nb\t2\n");
}

#[test]
fn missing_arguments_are_usage_errors() {
    let output = xlscompact(&["compact"]);
    assert_eq!(output.status.code(), Some(2));
}
