//! Little-endian field readers shared by the OLE and BIFF parsers.
//!
//! Every reader is bounds-checked and reports a short buffer as
//! [`OleError::InvalidData`] instead of panicking, so truncated records in a
//! damaged file surface as ordinary parse errors.

use crate::ole::OleError;
use zerocopy::{F64, FromBytes, LE, U16, U32};

#[inline]
fn field<'a>(data: &'a [u8], offset: usize, len: usize, what: &str) -> Result<&'a [u8], OleError> {
    offset
        .checked_add(len)
        .and_then(|end| data.get(offset..end))
        .ok_or_else(|| OleError::InvalidData(format!("Not enough data for {}", what)))
}

/// Read a little-endian u16 from a byte slice at the given offset.
#[inline]
pub fn read_u16_le(data: &[u8], offset: usize) -> Result<u16, OleError> {
    let bytes = field(data, offset, 2, "u16")?;
    U16::<LE>::read_from_bytes(bytes)
        .map(|v| v.get())
        .map_err(|_| OleError::InvalidData("Failed to read u16".to_string()))
}

/// Read a little-endian u32 from a byte slice at the given offset.
#[inline]
pub fn read_u32_le(data: &[u8], offset: usize) -> Result<u32, OleError> {
    let bytes = field(data, offset, 4, "u32")?;
    U32::<LE>::read_from_bytes(bytes)
        .map(|v| v.get())
        .map_err(|_| OleError::InvalidData("Failed to read u32".to_string()))
}

/// Read a little-endian f64 from a byte slice at the given offset.
#[inline]
pub fn read_f64_le(data: &[u8], offset: usize) -> Result<f64, OleError> {
    let bytes = field(data, offset, 8, "f64")?;
    F64::<LE>::read_from_bytes(bytes)
        .map(|v| v.get())
        .map_err(|_| OleError::InvalidData("Failed to read f64".to_string()))
}

/// Decode a run of u32 little-endian values, as found in FAT and MiniFAT sectors.
pub fn read_u32_array(data: &[u8]) -> Vec<u32> {
    data.chunks_exact(4)
        .filter_map(|chunk| U32::<LE>::read_from_bytes(chunk).ok())
        .map(|v| v.get())
        .collect()
}
