//! DIFAT (Double Indirect FAT) generation for OLE2 files
//!
//! The header stores the ids of the first 109 FAT sectors. Any further FAT
//! sector ids go into a chain of DIFAT sectors, each holding
//! `sector_size / 4 - 1` ids followed by the id of the next DIFAT sector.

use super::super::consts::*;

#[derive(Debug)]
pub struct DifatBuilder {
    /// FAT sector ids that did not fit in the header
    overflow_ids: Vec<u32>,
    sector_size: usize,
}

impl DifatBuilder {
    pub fn new(sector_size: usize) -> Self {
        Self {
            overflow_ids: Vec::new(),
            sector_size,
        }
    }

    /// Record the full list of FAT sector ids; the first 109 stay in the header.
    pub fn set_fat_sectors(&mut self, fat_sectors: &[u32]) {
        self.overflow_ids = fat_sectors
            .get(HEADER_DIFAT_SLOTS..)
            .map(<[u32]>::to_vec)
            .unwrap_or_default();
    }

    fn ids_per_sector(&self) -> usize {
        self.sector_size / 4 - 1
    }

    pub fn calculate_difat_sector_count(&self) -> u32 {
        self.overflow_ids.len().div_ceil(self.ids_per_sector()) as u32
    }

    /// Serialize the DIFAT chain, assuming its sectors are contiguous from
    /// `first_difat_sector`.
    pub fn generate_difat_sectors(&self, first_difat_sector: u32) -> Vec<Vec<u8>> {
        let chunks: Vec<&[u32]> = self.overflow_ids.chunks(self.ids_per_sector()).collect();
        let last = chunks.len().saturating_sub(1);

        chunks
            .iter()
            .enumerate()
            .map(|(index, ids)| {
                let mut sector = vec![0xFFu8; self.sector_size];
                for (slot, id) in sector.chunks_exact_mut(4).zip(ids.iter()) {
                    slot.copy_from_slice(&id.to_le_bytes());
                }

                let next = if index < last {
                    first_difat_sector + index as u32 + 1
                } else {
                    ENDOFCHAIN
                };
                let tail = self.sector_size - 4;
                sector[tail..].copy_from_slice(&next.to_le_bytes());
                sector
            })
            .collect()
    }

    pub fn is_needed(&self) -> bool {
        !self.overflow_ids.is_empty()
    }
}
