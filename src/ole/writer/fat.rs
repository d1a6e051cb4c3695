//! FAT (File Allocation Table) generation for OLE2 files
//!
//! The FAT maps sector numbers to the next sector in a chain. Regular
//! sectors hold the next sector id, FAT and DIFAT sectors are marked with
//! `FATSECT`/`DIFSECT`, the last sector of a chain holds `ENDOFCHAIN`, and
//! unused slots hold `FREESECT`.

use super::super::consts::*;
use std::collections::HashSet;

/// Sequential sector allocator that records chains in a FAT.
#[derive(Debug)]
pub struct FatBuilder {
    /// Maps sector id to the next sector in its chain
    fat: Vec<u32>,
    next_sector: u32,
    sector_size: usize,
}

impl FatBuilder {
    pub fn new(sector_size: usize) -> Self {
        Self {
            fat: Vec::new(),
            next_sector: 0,
            sector_size,
        }
    }

    /// Allocate a contiguous chain large enough for `size` bytes.
    ///
    /// Returns the first sector of the chain, or `ENDOFCHAIN` for an empty
    /// stream.
    pub fn allocate_chain(&mut self, size: usize) -> u32 {
        if size == 0 {
            return ENDOFCHAIN;
        }

        let count = size.div_ceil(self.sector_size) as u32;
        let start = self.next_sector;
        let end = start + count;
        self.fat.resize(end as usize, FREESECT);

        for sector in start..end {
            self.fat[sector as usize] = if sector + 1 < end {
                sector + 1
            } else {
                ENDOFCHAIN
            };
        }

        self.next_sector = end;
        start
    }

    /// Reserve `count` contiguous sectors tagged with `marker`
    /// (`FATSECT` or `DIFSECT`).
    pub fn allocate_special(&mut self, count: u32, marker: u32) -> u32 {
        if count == 0 {
            return ENDOFCHAIN;
        }

        let start = self.next_sector;
        let end = start + count;
        self.fat.resize(end as usize, FREESECT);
        self.fat[start as usize..end as usize].fill(marker);
        self.next_sector = end;
        start
    }

    /// Number of sectors handed out so far
    pub fn total_sectors(&self) -> u32 {
        self.next_sector
    }

    /// Serialize the FAT into sector-sized blocks padded with `FREESECT`.
    pub fn generate_fat_sectors(&self) -> Vec<Vec<u8>> {
        pack_sector_table(&self.fat, self.sector_size)
    }

    /// Check every chain for dangling references and loops.
    pub fn validate(&self) -> Result<(), String> {
        let mut visited = HashSet::new();
        let len = self.fat.len() as u32;

        let mut has_predecessor = vec![false; self.fat.len()];
        for &next in &self.fat {
            if next < len {
                has_predecessor[next as usize] = true;
            }
        }

        for start in 0..len {
            // Chain heads are sectors that nothing points to
            if has_predecessor[start as usize] || self.fat[start as usize] > MAXREGSECT {
                continue;
            }

            visited.clear();
            let mut current = start;
            loop {
                if !visited.insert(current) {
                    return Err(format!("Circular reference detected at sector {}", current));
                }
                match self.fat[current as usize] {
                    ENDOFCHAIN => break,
                    FREESECT | FATSECT | DIFSECT => {
                        return Err(format!("Chain broken at sector {}", current));
                    },
                    next if next >= len => {
                        return Err(format!(
                            "Invalid next sector {} at sector {}",
                            next, current
                        ));
                    },
                    next => current = next,
                }
            }
        }

        Ok(())
    }
}

/// Lay out a table of u32 entries as little-endian sectors, filling the
/// unused tail of the last sector with `FREESECT`.
pub(super) fn pack_sector_table(entries: &[u32], sector_size: usize) -> Vec<Vec<u8>> {
    entries
        .chunks(sector_size / 4)
        .map(|chunk| {
            let mut sector = vec![0xFFu8; sector_size];
            for (slot, value) in sector.chunks_exact_mut(4).zip(chunk) {
                slot.copy_from_slice(&value.to_le_bytes());
            }
            sector
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocate_chain() {
        let mut fat = FatBuilder::new(512);

        // 1024 bytes with 512-byte sectors is two sectors
        let start = fat.allocate_chain(1024);
        assert_eq!(start, 0);
        assert_eq!(fat.total_sectors(), 2);
        assert_eq!(fat.fat[0], 1);
        assert_eq!(fat.fat[1], ENDOFCHAIN);

        // A partial sector still occupies a whole one
        let next = fat.allocate_chain(1);
        assert_eq!(next, 2);
        assert_eq!(fat.fat[2], ENDOFCHAIN);
    }

    #[test]
    fn test_empty_chain() {
        let mut fat = FatBuilder::new(512);
        assert_eq!(fat.allocate_chain(0), ENDOFCHAIN);
        assert_eq!(fat.total_sectors(), 0);
    }

    #[test]
    fn test_allocate_special() {
        let mut fat = FatBuilder::new(512);
        fat.allocate_chain(512);
        let start = fat.allocate_special(2, FATSECT);

        assert_eq!(start, 1);
        assert_eq!(fat.fat[1], FATSECT);
        assert_eq!(fat.fat[2], FATSECT);
        assert!(fat.validate().is_ok());
    }

    #[test]
    fn test_generate_fat_sectors_pads_with_freesect() {
        let mut fat = FatBuilder::new(512);
        fat.allocate_chain(512 * 3);

        let sectors = fat.generate_fat_sectors();
        assert_eq!(sectors.len(), 1);
        assert_eq!(&sectors[0][0..4], &1u32.to_le_bytes());
        assert_eq!(&sectors[0][8..12], &ENDOFCHAIN.to_le_bytes());
        assert_eq!(&sectors[0][12..16], &FREESECT.to_le_bytes());
    }

    #[test]
    fn test_validate_detects_loop() {
        let mut fat = FatBuilder::new(512);
        fat.allocate_chain(1024);
        fat.fat[1] = 0;
        fat.fat.push(0);
        assert!(fat.validate().is_err());
    }
}
