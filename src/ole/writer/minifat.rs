//! MiniFAT generation for OLE2 files
//!
//! Streams below the mini stream cutoff are packed into 64-byte mini sectors
//! inside the ministream, which is itself a regular FAT chain owned by the
//! root entry. The MiniFAT links the mini sectors of each small stream.

use super::super::consts::*;
use super::fat::pack_sector_table;

#[derive(Debug)]
pub struct MiniFatBuilder {
    /// Maps mini sector id to the next mini sector in its chain
    minifat: Vec<u32>,
    mini_sector_size: usize,
    /// Concatenated small streams, each padded to a mini sector boundary
    ministream: Vec<u8>,
}

impl MiniFatBuilder {
    pub fn new(mini_sector_size: usize) -> Self {
        Self {
            minifat: Vec::new(),
            mini_sector_size,
            ministream: Vec::new(),
        }
    }

    /// Append `data` to the ministream and link its mini sectors.
    ///
    /// Returns the first mini sector, or `ENDOFCHAIN` for empty data.
    pub fn allocate_mini_chain(&mut self, data: &[u8]) -> u32 {
        if data.is_empty() {
            return ENDOFCHAIN;
        }

        let count = data.len().div_ceil(self.mini_sector_size) as u32;
        let start = self.minifat.len() as u32;
        let end = start + count;
        self.minifat
            .extend((start + 1..end).chain(std::iter::once(ENDOFCHAIN)));

        let offset = self.ministream.len();
        self.ministream
            .resize(offset + count as usize * self.mini_sector_size, 0);
        self.ministream[offset..offset + data.len()].copy_from_slice(data);

        start
    }

    pub fn ministream_data(&self) -> &[u8] {
        &self.ministream
    }

    pub fn ministream_size(&self) -> u64 {
        self.ministream.len() as u64
    }

    pub fn mini_sector_count(&self) -> u32 {
        self.minifat.len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.minifat.is_empty()
    }

    /// Serialize the MiniFAT into regular sectors
    pub fn generate_minifat_sectors(&self, sector_size: usize) -> Vec<Vec<u8>> {
        pack_sector_table(&self.minifat, sector_size)
    }
}
