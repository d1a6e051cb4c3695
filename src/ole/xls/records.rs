//! BIFF record parsing for XLS files
//!
//! A workbook stream is a flat sequence of records, each a 4-byte header
//! (type, length) followed by at most 8224 bytes of data. This module
//! iterates those records and decodes the ones the reader cares about.

use std::io::{Read, Seek, SeekFrom};

use crate::ole::binary;
use crate::ole::codepage::DEFAULT_CODEPAGE;
use crate::ole::xls::error::{XlsError, XlsResult};
use crate::ole::xls::utils::{self, FormulaValue};

pub const FORMULA: u16 = 0x0006;
pub const EOF: u16 = 0x000A;
pub const DATE1904: u16 = 0x0022;
pub const FILEPASS: u16 = 0x002F;
pub const CONTINUE: u16 = 0x003C;
pub const CODEPAGE: u16 = 0x0042;
pub const BOUNDSHEET: u16 = 0x0085;
pub const MULRK: u16 = 0x00BD;
pub const MULBLANK: u16 = 0x00BE;
pub const RSTRING: u16 = 0x00D6;
pub const SST: u16 = 0x00FC;
pub const LABELSST: u16 = 0x00FD;
pub const BLANK: u16 = 0x0201;
pub const NUMBER: u16 = 0x0203;
pub const LABEL: u16 = 0x0204;
pub const BOOLERR: u16 = 0x0205;
pub const STRING: u16 = 0x0207;
pub const RK: u16 = 0x027E;
pub const FORMULA_BIFF4: u16 = 0x0406;
pub const FORMAT: u16 = 0x041E;
pub const XF: u16 = 0x00E0;
pub const BOF: u16 = 0x0809;

/// BOF record types used by BIFF2, BIFF3 and BIFF4 streams
const LEGACY_BOFS: [u16; 3] = [0x0009, 0x0209, 0x0409];

/// BIFF record header (4 bytes: type + length)
#[derive(Debug, Clone)]
pub struct RecordHeader {
    pub record_type: u16,
    pub data_len: u16,
}

/// Iterator over BIFF records in a stream
pub struct RecordIter<R> {
    reader: R,
    stream_len: u64,
    current_pos: u64,
}

impl<R: Read + Seek> RecordIter<R> {
    pub fn new(mut reader: R) -> XlsResult<Self> {
        let stream_len = reader.seek(SeekFrom::End(0))?;
        reader.seek(SeekFrom::Start(0))?;

        Ok(RecordIter {
            reader,
            stream_len,
            current_pos: 0,
        })
    }

    /// Seek to a specific position in the stream
    pub fn seek(&mut self, pos: u64) -> XlsResult<()> {
        if pos >= self.stream_len {
            return Err(XlsError::InvalidData(format!(
                "Offset {} lies beyond the workbook stream ({} bytes)",
                pos, self.stream_len
            )));
        }
        self.reader.seek(SeekFrom::Start(pos))?;
        self.current_pos = pos;
        Ok(())
    }
}

impl<R: Read + Seek> Iterator for RecordIter<R> {
    type Item = XlsResult<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        // A partial header is stream padding, not a record
        if self.current_pos + 4 > self.stream_len {
            return None;
        }

        match Record::read(&mut self.reader) {
            Ok(record) => {
                self.current_pos += 4 + record.header.data_len as u64;
                Some(Ok(record))
            },
            Err(e) => {
                self.current_pos = self.stream_len;
                Some(Err(e))
            },
        }
    }
}

/// A BIFF record with header and data
#[derive(Debug, Clone)]
pub struct Record {
    pub header: RecordHeader,
    pub data: Vec<u8>,
}

impl Record {
    /// Read a complete record from the stream
    pub fn read<R: Read>(reader: &mut R) -> XlsResult<Self> {
        let mut buf = [0u8; 4];
        reader.read_exact(&mut buf)?;
        let header = RecordHeader {
            record_type: u16::from_le_bytes([buf[0], buf[1]]),
            data_len: u16::from_le_bytes([buf[2], buf[3]]),
        };

        let mut data = vec![0u8; header.data_len as usize];
        reader
            .read_exact(&mut data)
            .map_err(|_| XlsError::InvalidRecord {
                record_type: header.record_type,
                message: format!("truncated, expected {} bytes", header.data_len),
            })?;

        Ok(Record { header, data })
    }
}

/// BIFF versions supported
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BiffVersion {
    /// Excel 5.0/95, byte strings in the workbook codepage
    Biff5 = 0x0500,
    /// Excel 97-2003, unicode strings and a shared string table
    Biff8 = 0x0600,
}

/// BOF (Beginning of File) record
#[derive(Debug, Clone)]
pub struct BofRecord {
    pub version: BiffVersion,
    /// 0x0005 workbook globals, 0x0010 worksheet, 0x0020 chart, 0x0040 macro sheet
    pub substream: u16,
}

impl BofRecord {
    pub fn parse(record: &Record) -> XlsResult<Self> {
        let record_type = record.header.record_type;
        if LEGACY_BOFS.contains(&record_type) {
            return Err(XlsError::UnsupportedBiffVersion(record_type));
        }
        if record_type != BOF {
            return Err(XlsError::InvalidRecord {
                record_type,
                message: "expected a BOF record".to_string(),
            });
        }

        let data = &record.data;
        if data.len() < 4 {
            return Err(XlsError::InvalidLength {
                expected: 4,
                found: data.len(),
            });
        }

        let version = match binary::read_u16_le(data, 0)? {
            0x0500 => BiffVersion::Biff5,
            0x0600 => BiffVersion::Biff8,
            other => return Err(XlsError::UnsupportedBiffVersion(other)),
        };

        Ok(BofRecord {
            version,
            substream: binary::read_u16_le(data, 2)?,
        })
    }
}

/// String decoding rules of one workbook
#[derive(Debug, Clone, Copy)]
pub struct XlsEncoding {
    pub version: BiffVersion,
    /// Codepage for BIFF5 byte strings
    pub codepage: u16,
}

impl XlsEncoding {
    pub fn new(version: BiffVersion) -> Self {
        Self {
            version,
            codepage: DEFAULT_CODEPAGE,
        }
    }

    /// Decode a string with a 16-bit length prefix (cell labels, formats)
    pub fn long_string(&self, data: &[u8]) -> XlsResult<(String, usize)> {
        match self.version {
            BiffVersion::Biff8 => utils::parse_unicode_string(data, true),
            BiffVersion::Biff5 => utils::parse_byte_string(data, true, self.codepage),
        }
    }

    /// Decode a string with an 8-bit length prefix (sheet names)
    pub fn short_string(&self, data: &[u8]) -> XlsResult<(String, usize)> {
        match self.version {
            BiffVersion::Biff8 => utils::parse_unicode_string(data, false),
            BiffVersion::Biff5 => utils::parse_byte_string(data, false, self.codepage),
        }
    }
}

/// Sheet types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetType {
    WorkSheet,
    MacroSheet,
    ChartSheet,
    VBModule,
}

impl SheetType {
    pub fn from_u8(value: u8) -> XlsResult<Self> {
        match value {
            0x00 => Ok(SheetType::WorkSheet),
            0x01 => Ok(SheetType::MacroSheet),
            0x02 => Ok(SheetType::ChartSheet),
            0x06 => Ok(SheetType::VBModule),
            v => Err(XlsError::InvalidRecord {
                record_type: BOUNDSHEET,
                message: format!("Invalid sheet type: {}", v),
            }),
        }
    }
}

/// BoundSheet8 record (worksheet metadata)
#[derive(Debug, Clone)]
pub struct BoundSheetRecord {
    /// Stream offset of the sheet's BOF record
    pub position: u32,
    pub sheet_type: SheetType,
    pub name: String,
}

impl BoundSheetRecord {
    pub fn parse(data: &[u8], encoding: &XlsEncoding) -> XlsResult<Self> {
        if data.len() < 8 {
            return Err(XlsError::InvalidLength {
                expected: 8,
                found: data.len(),
            });
        }

        let position = binary::read_u32_le(data, 0)?;
        let sheet_type = SheetType::from_u8(data[5])?;
        let (name, _) = encoding.short_string(&data[6..])?;

        Ok(BoundSheetRecord {
            position,
            sheet_type,
            name,
        })
    }
}

/// FORMAT record: a number format string and the index XFs refer to it by
#[derive(Debug, Clone)]
pub struct FormatRecord {
    pub index: u16,
    pub format_string: String,
}

impl FormatRecord {
    pub fn parse(data: &[u8], encoding: &XlsEncoding) -> XlsResult<Self> {
        let index = binary::read_u16_le(data, 0)?;
        let rest = data.get(2..).unwrap_or_default();
        let (format_string, _) = match encoding.version {
            BiffVersion::Biff8 => encoding.long_string(rest)?,
            BiffVersion::Biff5 => encoding.short_string(rest)?,
        };

        Ok(FormatRecord {
            index,
            format_string,
        })
    }
}

/// XF (Extended Format) record - cell formatting
#[derive(Debug, Clone)]
pub struct ExtendedFormat {
    pub font_index: u16,
    pub format_index: u16,
}

impl ExtendedFormat {
    pub fn parse(data: &[u8]) -> XlsResult<Self> {
        if data.len() < 4 {
            return Err(XlsError::InvalidLength {
                expected: 4,
                found: data.len(),
            });
        }

        Ok(ExtendedFormat {
            font_index: binary::read_u16_le(data, 0)?,
            format_index: binary::read_u16_le(data, 2)?,
        })
    }
}

/// SST (Shared String Table) record
#[derive(Debug, Clone, Default)]
pub struct SharedStringTable {
    pub strings: Vec<String>,
}

impl SharedStringTable {
    /// Parse the SST from its own record data and the CONTINUE records
    /// that immediately follow it.
    ///
    /// A string's character data may break at a record boundary; the
    /// continuation then starts with a fresh option byte whose low bit
    /// selects compressed or UTF-16 characters for the remainder.
    pub fn parse(sst: &[u8], continues: &[&[u8]]) -> XlsResult<Self> {
        if sst.len() < 8 {
            return Err(XlsError::InvalidLength {
                expected: 8,
                found: sst.len(),
            });
        }

        let unique = binary::read_u32_le(sst, 4)? as usize;

        let mut fragments = Vec::with_capacity(continues.len() + 1);
        fragments.push(&sst[8..]);
        fragments.extend_from_slice(continues);

        let total_bytes: usize = fragments.iter().map(|f| f.len()).sum();
        let mut reader = FragmentReader::new(fragments);
        let mut strings = Vec::with_capacity(unique.min(total_bytes / 3 + 1));

        for _ in 0..unique {
            if reader.is_exhausted() {
                break;
            }

            let cch = reader.read_u16()? as usize;
            let flags = reader.read_u8()?;
            let runs = if flags & 0x08 != 0 {
                reader.read_u16()? as usize
            } else {
                0
            };
            let ext_len = if flags & 0x04 != 0 {
                reader.read_u32()? as usize
            } else {
                0
            };

            strings.push(reader.read_chars(cch, flags & 0x01 != 0)?);
            reader.skip(runs * 4 + ext_len)?;
        }

        Ok(SharedStringTable { strings })
    }

    pub fn get(&self, index: u32) -> Option<&str> {
        self.strings.get(index as usize).map(String::as_str)
    }
}

/// Cursor over record data split across SST/CONTINUE boundaries
struct FragmentReader<'a> {
    fragments: Vec<&'a [u8]>,
    index: usize,
    pos: usize,
}

impl<'a> FragmentReader<'a> {
    fn new(fragments: Vec<&'a [u8]>) -> Self {
        Self {
            fragments,
            index: 0,
            pos: 0,
        }
    }

    fn current(&self) -> &'a [u8] {
        self.fragments.get(self.index).copied().unwrap_or_default()
    }

    fn remaining(&self) -> usize {
        self.current().len() - self.pos
    }

    fn is_exhausted(&self) -> bool {
        self.remaining() == 0
            && self.fragments[self.index.saturating_add(1).min(self.fragments.len())..]
                .iter()
                .all(|f| f.is_empty())
    }

    fn advance(&mut self) -> XlsResult<()> {
        if self.index + 1 >= self.fragments.len() {
            return Err(XlsError::InvalidRecord {
                record_type: SST,
                message: "shared string table ends mid-string".to_string(),
            });
        }
        self.index += 1;
        self.pos = 0;
        Ok(())
    }

    fn read_u8(&mut self) -> XlsResult<u8> {
        while self.remaining() == 0 {
            self.advance()?;
        }
        let byte = self.current()[self.pos];
        self.pos += 1;
        Ok(byte)
    }

    fn read_u16(&mut self) -> XlsResult<u16> {
        Ok(u16::from_le_bytes([self.read_u8()?, self.read_u8()?]))
    }

    fn read_u32(&mut self) -> XlsResult<u32> {
        Ok(u32::from_le_bytes([
            self.read_u8()?,
            self.read_u8()?,
            self.read_u8()?,
            self.read_u8()?,
        ]))
    }

    fn skip(&mut self, mut count: usize) -> XlsResult<()> {
        while count > 0 {
            if self.remaining() == 0 {
                self.advance()?;
                continue;
            }
            let step = count.min(self.remaining());
            self.pos += step;
            count -= step;
        }
        Ok(())
    }

    fn read_chars(&mut self, cch: usize, mut wide: bool) -> XlsResult<String> {
        let mut units: Vec<u16> = Vec::with_capacity(cch);

        while units.len() < cch {
            if self.remaining() == 0 {
                self.advance()?;
                wide = self.read_u8()? & 0x01 != 0;
                continue;
            }

            let width = if wide { 2 } else { 1 };
            let available = self.remaining() / width;
            if available == 0 {
                return Err(XlsError::InvalidRecord {
                    record_type: SST,
                    message: "character split across records".to_string(),
                });
            }

            let take = available.min(cch - units.len());
            let bytes = &self.current()[self.pos..self.pos + take * width];
            if wide {
                units.extend(
                    bytes
                        .chunks_exact(2)
                        .map(|pair| u16::from_le_bytes([pair[0], pair[1]])),
                );
            } else {
                units.extend(bytes.iter().map(|&b| b as u16));
            }
            self.pos += take * width;
        }

        Ok(String::from_utf16_lossy(&units))
    }
}

/// Cell records
#[derive(Debug, Clone)]
pub enum CellRecord {
    Blank {
        row: u16,
        col: u16,
        xf_index: u16,
    },
    MulBlank {
        row: u16,
        first_col: u16,
        xf_indexes: Vec<u16>,
    },
    Number {
        row: u16,
        col: u16,
        xf_index: u16,
        value: f64,
    },
    Label {
        row: u16,
        col: u16,
        xf_index: u16,
        value: String,
    },
    BoolErr {
        row: u16,
        col: u16,
        xf_index: u16,
        value: BoolErrValue,
    },
    Rk {
        row: u16,
        col: u16,
        xf_index: u16,
        value: f64,
    },
    MulRk {
        row: u16,
        first_col: u16,
        /// (xf_index, value) per column
        values: Vec<(u16, f64)>,
    },
    LabelSst {
        row: u16,
        col: u16,
        xf_index: u16,
        sst_index: u32,
    },
    Formula {
        row: u16,
        col: u16,
        xf_index: u16,
        value: FormulaValue,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum BoolErrValue {
    Bool(bool),
    Error(u8),
}

impl CellRecord {
    /// Whether `record_type` is a cell record understood by [`CellRecord::parse`]
    pub fn is_cell_record(record_type: u16) -> bool {
        matches!(
            record_type,
            BLANK
                | MULBLANK
                | NUMBER
                | LABEL
                | RSTRING
                | BOOLERR
                | RK
                | MULRK
                | LABELSST
                | FORMULA
                | FORMULA_BIFF4
        )
    }

    pub fn parse(record_type: u16, data: &[u8], encoding: &XlsEncoding) -> XlsResult<Self> {
        let short = |expected: usize| XlsError::InvalidRecord {
            record_type,
            message: format!("expected at least {} bytes, found {}", expected, data.len()),
        };
        let need = |expected: usize| {
            if data.len() < expected {
                Err(short(expected))
            } else {
                Ok(())
            }
        };

        match record_type {
            BLANK => {
                need(6)?;
                Ok(CellRecord::Blank {
                    row: binary::read_u16_le(data, 0)?,
                    col: binary::read_u16_le(data, 2)?,
                    xf_index: binary::read_u16_le(data, 4)?,
                })
            },
            MULBLANK => {
                // row, first col, n xf indexes, last col
                need(6)?;
                let row = binary::read_u16_le(data, 0)?;
                let first_col = binary::read_u16_le(data, 2)?;
                let xf_indexes = data[4..data.len() - 2]
                    .chunks_exact(2)
                    .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
                    .collect();
                Ok(CellRecord::MulBlank {
                    row,
                    first_col,
                    xf_indexes,
                })
            },
            NUMBER => {
                need(14)?;
                Ok(CellRecord::Number {
                    row: binary::read_u16_le(data, 0)?,
                    col: binary::read_u16_le(data, 2)?,
                    xf_index: binary::read_u16_le(data, 4)?,
                    value: binary::read_f64_le(data, 6)?,
                })
            },
            LABEL | RSTRING => {
                need(8)?;
                let (value, _) = encoding.long_string(&data[6..])?;
                Ok(CellRecord::Label {
                    row: binary::read_u16_le(data, 0)?,
                    col: binary::read_u16_le(data, 2)?,
                    xf_index: binary::read_u16_le(data, 4)?,
                    value,
                })
            },
            BOOLERR => {
                need(8)?;
                let value = if data[7] == 0 {
                    BoolErrValue::Bool(data[6] != 0)
                } else {
                    BoolErrValue::Error(data[6])
                };
                Ok(CellRecord::BoolErr {
                    row: binary::read_u16_le(data, 0)?,
                    col: binary::read_u16_le(data, 2)?,
                    xf_index: binary::read_u16_le(data, 4)?,
                    value,
                })
            },
            RK => {
                need(10)?;
                Ok(CellRecord::Rk {
                    row: binary::read_u16_le(data, 0)?,
                    col: binary::read_u16_le(data, 2)?,
                    xf_index: binary::read_u16_le(data, 4)?,
                    value: utils::rk_to_f64(binary::read_u32_le(data, 6)?),
                })
            },
            MULRK => {
                // row, first col, n * (xf, rk), last col
                need(12)?;
                let row = binary::read_u16_le(data, 0)?;
                let first_col = binary::read_u16_le(data, 2)?;
                let mut values = Vec::new();
                for chunk in data[4..data.len() - 2].chunks_exact(6) {
                    let xf_index = binary::read_u16_le(chunk, 0)?;
                    let rk = binary::read_u32_le(chunk, 2)?;
                    values.push((xf_index, utils::rk_to_f64(rk)));
                }
                Ok(CellRecord::MulRk {
                    row,
                    first_col,
                    values,
                })
            },
            LABELSST => {
                need(10)?;
                Ok(CellRecord::LabelSst {
                    row: binary::read_u16_le(data, 0)?,
                    col: binary::read_u16_le(data, 2)?,
                    xf_index: binary::read_u16_le(data, 4)?,
                    sst_index: binary::read_u32_le(data, 6)?,
                })
            },
            FORMULA | FORMULA_BIFF4 => {
                need(20)?;
                Ok(CellRecord::Formula {
                    row: binary::read_u16_le(data, 0)?,
                    col: binary::read_u16_le(data, 2)?,
                    xf_index: binary::read_u16_le(data, 4)?,
                    value: utils::parse_formula_value(&data[6..14])?,
                })
            },
            _ => Err(XlsError::InvalidRecord {
                record_type,
                message: "Unknown cell record type".to_string(),
            }),
        }
    }
}
