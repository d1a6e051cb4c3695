//! Round-trip tests for the OLE writer
//!
//! Every file produced by [`OleWriter`] must open with [`OleFile`] and
//! return the exact bytes that were written.

use super::super::consts::*;
use super::super::file::OleFile;
use super::core::OleWriter;
use crate::ole::binary::read_u32_le;
use proptest::prelude::*;
use std::io::Cursor;

fn write(writer: &OleWriter) -> Vec<u8> {
    let mut buffer = Cursor::new(Vec::new());
    writer.write_to(&mut buffer).unwrap();
    buffer.into_inner()
}

#[test]
fn test_write_simple_ole_file() {
    let mut writer = OleWriter::new();
    writer.create_stream("TestStream", b"Hello, World!").unwrap();

    let data = write(&writer);
    assert!(data.len() >= MINIMAL_OLEFILE_SIZE);
    assert_eq!(&data[0..8], MAGIC);
    assert_eq!(data.len() % 512, 0);

    let mut ole = OleFile::open(Cursor::new(data)).unwrap();
    assert_eq!(ole.open_stream(&["TestStream"]).unwrap(), b"Hello, World!");
}

#[test]
fn test_write_multiple_streams() {
    let mut writer = OleWriter::new();
    writer.create_stream("Small1", b"Small").unwrap();
    writer.create_stream("Small2", b"Data").unwrap();
    writer.create_stream("Large1", &vec![0xAAu8; 5000]).unwrap();
    writer.create_stream("Large2", &vec![0xBBu8; 10000]).unwrap();

    let mut ole = OleFile::open(Cursor::new(write(&writer))).unwrap();

    assert_eq!(ole.open_stream(&["Small1"]).unwrap(), b"Small");
    assert_eq!(ole.open_stream(&["small2"]).unwrap(), b"Data");

    let large1 = ole.open_stream(&["Large1"]).unwrap();
    assert_eq!(large1.len(), 5000);
    assert!(large1.iter().all(|&b| b == 0xAA));

    let large2 = ole.open_stream(&["Large2"]).unwrap();
    assert_eq!(large2.len(), 10000);
    assert!(large2.iter().all(|&b| b == 0xBB));

    let mut names: Vec<String> = ole.list_streams().into_iter().flatten().collect();
    names.sort();
    assert_eq!(names, ["Large1", "Large2", "Small1", "Small2"]);
}

#[test]
fn test_first_large_stream_starts_at_sector_zero() {
    let mut writer = OleWriter::new();
    writer.create_stream("Workbook", &vec![0x11u8; 8192]).unwrap();

    let data = write(&writer);
    // Sector 0 begins right after the 512-byte header
    assert!(data[512..512 + 8192].iter().all(|&b| b == 0x11));
}

#[test]
fn test_write_empty_stream() {
    let mut writer = OleWriter::new();
    writer.create_stream("Empty", b"").unwrap();

    let mut ole = OleFile::open(Cursor::new(write(&writer))).unwrap();
    assert!(ole.open_stream(&["Empty"]).unwrap().is_empty());
}

#[test]
fn test_write_with_minifat() {
    let mut writer = OleWriter::new();
    for i in 0..10 {
        writer
            .create_stream(&format!("Stream{}", i), &vec![i as u8; 100 + i * 50])
            .unwrap();
    }

    let mut ole = OleFile::open(Cursor::new(write(&writer))).unwrap();
    for i in 0..10 {
        let stream = ole.open_stream(&[&format!("Stream{}", i)]).unwrap();
        assert_eq!(stream.len(), 100 + i * 50);
        assert!(stream.iter().all(|&b| b == i as u8));
    }
}

#[test]
fn test_stream_at_cutoff_uses_fat() {
    let mut writer = OleWriter::new();
    writer.create_stream("Below", &vec![1u8; 4095]).unwrap();
    writer.create_stream("AtCutoff", &vec![2u8; 4096]).unwrap();

    let data = write(&writer);
    // Only the 4095-byte stream goes through the MiniFAT
    assert_eq!(read_u32_le(&data, 0x40).unwrap(), 1);

    let mut ole = OleFile::open(Cursor::new(data)).unwrap();
    assert_eq!(ole.open_stream(&["Below"]).unwrap(), vec![1u8; 4095]);
    assert_eq!(ole.open_stream(&["AtCutoff"]).unwrap(), vec![2u8; 4096]);
}

#[test]
fn test_write_large_stream() {
    let mut writer = OleWriter::new();
    writer.create_stream("LargeStream", &vec![0x42u8; 100_000]).unwrap();

    let mut ole = OleFile::open(Cursor::new(write(&writer))).unwrap();
    let stream = ole.open_stream(&["LargeStream"]).unwrap();
    assert_eq!(stream.len(), 100_000);
    assert!(stream.iter().all(|&b| b == 0x42));
}

#[test]
fn test_write_stream_needing_difat() {
    // 110 FAT sectors at 128 entries each cover ~7 MB of 512-byte sectors
    let size = 110 * 128 * 512;
    let payload: Vec<u8> = (0..size).map(|i| (i % 251) as u8).collect();

    let mut writer = OleWriter::new();
    writer.create_stream("Workbook", &payload).unwrap();

    let data = write(&writer);
    assert!(read_u32_le(&data, 0x2C).unwrap() > HEADER_DIFAT_SLOTS as u32);
    assert_eq!(read_u32_le(&data, 0x48).unwrap(), 1);

    let mut ole = OleFile::open(Cursor::new(data)).unwrap();
    assert_eq!(ole.open_stream(&["Workbook"]).unwrap(), payload);
}

#[test]
fn test_write_4096_byte_sectors() {
    let mut writer = OleWriter::with_sector_size(4096).unwrap();
    writer.create_stream("Small", b"tiny").unwrap();
    writer.create_stream("Large", &vec![7u8; 20_000]).unwrap();

    let data = write(&writer);
    assert_eq!(data.len() % 4096, 0);

    let mut ole = OleFile::open(Cursor::new(data)).unwrap();
    assert_eq!(ole.open_stream(&["Small"]).unwrap(), b"tiny");
    assert_eq!(ole.open_stream(&["Large"]).unwrap(), vec![7u8; 20_000]);
}

#[test]
fn test_missing_stream() {
    let mut writer = OleWriter::new();
    writer.create_stream("Workbook", b"data").unwrap();

    let mut ole = OleFile::open(Cursor::new(write(&writer))).unwrap();
    assert!(ole.exists(&["Workbook"]));
    assert!(!ole.exists(&["Book"]));
    assert!(ole.open_stream(&["Book"]).is_err());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_streams_survive_round_trip(
        sizes in prop::collection::vec(0usize..12_000, 1..6),
        seed in any::<u8>(),
    ) {
        let mut writer = OleWriter::new();
        let streams: Vec<(String, Vec<u8>)> = sizes
            .iter()
            .enumerate()
            .map(|(i, &size)| {
                let data = (0..size).map(|j| (j as u8).wrapping_add(seed).wrapping_add(i as u8)).collect();
                (format!("S{}", i), data)
            })
            .collect();
        for (name, data) in &streams {
            writer.create_stream(name, data).unwrap();
        }

        let mut ole = OleFile::open(Cursor::new(write(&writer))).unwrap();
        for (name, data) in &streams {
            prop_assert_eq!(&ole.open_stream(&[name.as_str()]).unwrap(), data);
        }
    }
}
