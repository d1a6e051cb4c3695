//! Shared String Table (SST) BIFF8 writer.

use crate::ole::xls::{XlsError, XlsResult};
use std::io::Write;

use super::{Biff8Chars, MAX_RECORD_DATA, write_record_header};

/// Accumulates SST payload and emits it as one SST record followed by as
/// many CONTINUE records as needed.
struct SstRecords<'w, W: Write> {
    writer: &'w mut W,
    buffer: Vec<u8>,
    first: bool,
}

impl<'w, W: Write> SstRecords<'w, W> {
    fn new(writer: &'w mut W) -> Self {
        Self {
            writer,
            buffer: Vec::with_capacity(MAX_RECORD_DATA),
            first: true,
        }
    }

    fn available(&self) -> usize {
        MAX_RECORD_DATA - self.buffer.len()
    }

    fn flush(&mut self) -> XlsResult<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        let record_type = if self.first { 0x00FC } else { 0x003C };
        write_record_header(self.writer, record_type, self.buffer.len() as u16)?;
        self.writer.write_all(&self.buffer)?;
        self.buffer.clear();
        self.first = false;
        Ok(())
    }
}

/// Write SST and CONTINUE records for `strings`.
///
/// A string header (count + option byte) is never split and always travels
/// with at least its first character. Character data that does not fit
/// continues in the next record behind a repeated option byte; UTF-16 data
/// is only split between characters.
pub fn write_sst<W: Write>(writer: &mut W, strings: &[String], cst_total: u32) -> XlsResult<()> {
    let mut records = SstRecords::new(writer);

    records.buffer.extend_from_slice(&cst_total.to_le_bytes());
    records
        .buffer
        .extend_from_slice(&(strings.len() as u32).to_le_bytes());

    for s in strings {
        let chars = Biff8Chars::encode(s);
        let cch = u16::try_from(chars.cch).map_err(|_| {
            XlsError::InvalidData(format!(
                "String of {} characters exceeds the BIFF8 limit",
                chars.cch
            ))
        })?;
        let width = if chars.wide { 2 } else { 1 };

        let header_needs = 3 + if cch == 0 { 0 } else { width };
        if records.available() < header_needs {
            records.flush()?;
        }
        records.buffer.extend_from_slice(&cch.to_le_bytes());
        records.buffer.push(chars.flags());

        let mut written = 0;
        while written < chars.bytes.len() {
            let mut take = records.available().min(chars.bytes.len() - written);
            take -= take % width;
            if take == 0 {
                records.flush()?;
                records.buffer.push(chars.flags());
                continue;
            }
            records
                .buffer
                .extend_from_slice(&chars.bytes[written..written + take]);
            written += take;
        }
    }

    records.flush()
}
