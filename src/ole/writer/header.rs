//! OLE2 header generation
//!
//! Produces the fixed header block: signature, version fields, the
//! locations of the directory, MiniFAT and DIFAT chains, and the first
//! 109 FAT sector ids.

use super::super::consts::*;

pub struct HeaderBuilder {
    sector_size: usize,
    first_dir_sector: u32,
    num_dir_sectors: u32,
    first_minifat_sector: u32,
    num_minifat_sectors: u32,
    first_difat_sector: u32,
    num_difat_sectors: u32,
    fat_sectors: Vec<u32>,
}

impl HeaderBuilder {
    pub fn new(sector_size: usize) -> Self {
        Self {
            sector_size,
            first_dir_sector: ENDOFCHAIN,
            num_dir_sectors: 0,
            first_minifat_sector: ENDOFCHAIN,
            num_minifat_sectors: 0,
            first_difat_sector: ENDOFCHAIN,
            num_difat_sectors: 0,
            fat_sectors: Vec::new(),
        }
    }

    pub fn set_directory(&mut self, first_sector: u32, num_sectors: u32) {
        self.first_dir_sector = first_sector;
        // csectDir must be zero in version 3 files
        self.num_dir_sectors = if self.sector_size == SECTOR_SIZE_V3 {
            0
        } else {
            num_sectors
        };
    }

    pub fn set_minifat(&mut self, first_sector: u32, num_sectors: u32) {
        self.first_minifat_sector = first_sector;
        self.num_minifat_sectors = num_sectors;
    }

    pub fn set_difat(&mut self, first_sector: u32, num_sectors: u32) {
        self.first_difat_sector = first_sector;
        self.num_difat_sectors = num_sectors;
    }

    /// Total FAT sector count, written to the header along with the first
    /// 109 ids.
    pub fn set_fat_sectors(&mut self, sectors: &[u32]) {
        self.fat_sectors = sectors.to_vec();
    }

    /// Build the header block.
    ///
    /// The block spans a whole sector: 4096-byte sector files pad the
    /// 512-byte header with zeros up to the first sector boundary.
    pub fn generate(&self) -> Vec<u8> {
        let mut header = vec![0u8; self.sector_size];
        let mut put = |offset: usize, bytes: &[u8]| {
            header[offset..offset + bytes.len()].copy_from_slice(bytes);
        };

        let (dll_version, sector_shift) = if self.sector_size == SECTOR_SIZE_V3 {
            (3u16, 9u16)
        } else {
            (4u16, 12u16)
        };

        put(0x00, MAGIC);
        // 0x08..0x18 CLSID stays zero
        put(0x18, &0x003Eu16.to_le_bytes());
        put(0x1A, &dll_version.to_le_bytes());
        put(0x1C, &0xFFFEu16.to_le_bytes());
        put(0x1E, &sector_shift.to_le_bytes());
        put(0x20, &6u16.to_le_bytes());
        put(0x28, &self.num_dir_sectors.to_le_bytes());
        put(0x2C, &(self.fat_sectors.len() as u32).to_le_bytes());
        put(0x30, &self.first_dir_sector.to_le_bytes());
        put(0x38, &MINI_STREAM_CUTOFF.to_le_bytes());
        put(0x3C, &self.first_minifat_sector.to_le_bytes());
        put(0x40, &self.num_minifat_sectors.to_le_bytes());
        put(0x44, &self.first_difat_sector.to_le_bytes());
        put(0x48, &self.num_difat_sectors.to_le_bytes());

        for slot in 0..HEADER_DIFAT_SLOTS {
            let id = self.fat_sectors.get(slot).copied().unwrap_or(FREESECT);
            put(0x4C + slot * 4, &id.to_le_bytes());
        }

        header
    }
}
