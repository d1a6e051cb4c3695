/// OLE file writer implementation
///
/// Streams are buffered in memory and the whole compound file is laid out
/// in one pass by [`OleWriter::write_to`]:
///
/// 1. Streams of at least 4096 bytes get regular FAT chains, in the order
///    they were added, so the first large stream starts at sector 0.
/// 2. Smaller streams are packed into the ministream, which is allocated
///    after the large streams, followed by the directory and the MiniFAT.
/// 3. FAT (and, past 109 FAT sectors, DIFAT) sectors are reserved last and
///    mark themselves in the table they describe.
///
/// # Example
///
/// ```rust
/// use std::io::Cursor;
/// use xlscompact::ole::OleFile;
/// use xlscompact::ole::writer::OleWriter;
///
/// let mut writer = OleWriter::new();
/// writer.create_stream("Workbook", b"Hello, World!")?;
///
/// let mut buffer = Cursor::new(Vec::new());
/// writer.write_to(&mut buffer)?;
///
/// let mut ole = OleFile::open(Cursor::new(buffer.into_inner()))?;
/// assert_eq!(ole.open_stream(&["Workbook"])?, b"Hello, World!");
/// # Ok::<(), xlscompact::ole::OleError>(())
/// ```
use super::super::consts::*;
use super::super::file::OleError;
use super::difat::DifatBuilder;
use super::directory::DirectoryBuilder;
use super::fat::FatBuilder;
use super::header::HeaderBuilder;
use super::minifat::MiniFatBuilder;
use std::io::{Seek, SeekFrom, Write};
use tracing::debug;

/// OLE compound file writer holding streams directly under the root storage.
#[derive(Debug)]
pub struct OleWriter {
    sector_size: usize,
    mini_sector_size: usize,
    mini_stream_cutoff: u32,
    /// Stream name and contents, in insertion order
    streams: Vec<(String, Vec<u8>)>,
}

impl OleWriter {
    /// Create a writer producing version 3 files (512-byte sectors)
    pub fn new() -> Self {
        Self {
            sector_size: SECTOR_SIZE_V3,
            mini_sector_size: MINI_SECTOR_SIZE,
            mini_stream_cutoff: MINI_STREAM_CUTOFF,
            streams: Vec::new(),
        }
    }

    /// Create a writer with the given sector size (512 or 4096)
    pub fn with_sector_size(sector_size: usize) -> Result<Self, OleError> {
        if sector_size != SECTOR_SIZE_V3 && sector_size != SECTOR_SIZE_V4 {
            return Err(OleError::InvalidData(format!(
                "Sector size must be 512 or 4096, got {}",
                sector_size
            )));
        }

        Ok(Self {
            sector_size,
            ..Self::new()
        })
    }

    /// Add a stream under the root storage, replacing any stream of the
    /// same name (compared case-insensitively, as readers look names up).
    pub fn create_stream(&mut self, name: &str, data: &[u8]) -> Result<(), OleError> {
        if name.is_empty() || name.encode_utf16().count() > 31 {
            return Err(OleError::InvalidData(format!(
                "Stream name must be 1 to 31 characters: {:?}",
                name
            )));
        }
        if name.contains(['/', '\\', ':', '!']) {
            return Err(OleError::InvalidData(format!(
                "Stream name contains a reserved character: {:?}",
                name
            )));
        }

        match self
            .streams
            .iter_mut()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
        {
            Some((_, contents)) => *contents = data.to_vec(),
            None => self.streams.push((name.to_string(), data.to_vec())),
        }

        Ok(())
    }

    /// Write the compound file to `writer`.
    pub fn write_to<W: Write + Seek>(&self, writer: &mut W) -> Result<(), OleError> {
        let mut fat = FatBuilder::new(self.sector_size);
        let mut minifat = MiniFatBuilder::new(self.mini_sector_size);

        let (large, small): (Vec<_>, Vec<_>) = self
            .streams
            .iter()
            .partition(|(_, data)| data.len() >= self.mini_stream_cutoff as usize);

        // Large streams first, in insertion order
        let large_starts: Vec<u32> = large
            .iter()
            .map(|(_, data)| fat.allocate_chain(data.len()))
            .collect();

        let small_starts: Vec<u32> = small
            .iter()
            .map(|(_, data)| minifat.allocate_mini_chain(data))
            .collect();

        let (ministream_start, ministream_size) = if minifat.is_empty() {
            (ENDOFCHAIN, 0)
        } else {
            (
                fat.allocate_chain(minifat.ministream_data().len()),
                minifat.ministream_size(),
            )
        };

        let mut directory = DirectoryBuilder::new(ministream_start, ministream_size);
        for ((name, data), &start) in large.iter().zip(&large_starts) {
            directory.add_stream(name, start, data.len() as u64);
        }
        for ((name, data), &start) in small.iter().zip(&small_starts) {
            directory.add_stream(name, start, data.len() as u64);
        }

        let dir_stream = directory.generate_directory_stream();
        let dir_sector_count = dir_stream.len().div_ceil(self.sector_size) as u32;
        let dir_start = fat.allocate_chain(dir_stream.len());

        let minifat_sectors = minifat.generate_minifat_sectors(self.sector_size);
        let minifat_start = fat.allocate_chain(minifat_sectors.len() * self.sector_size);

        // The FAT has to describe its own sectors and the DIFAT's, so
        // iterate until the counts settle
        let entries_per_fat_sector = self.sector_size as u32 / 4;
        let ids_per_difat_sector = entries_per_fat_sector - 1;
        let used = fat.total_sectors();
        let mut n_fat = 0u32;
        let mut n_difat = 0u32;
        loop {
            let next_fat = (used + n_fat + n_difat).div_ceil(entries_per_fat_sector);
            let next_difat = next_fat
                .saturating_sub(HEADER_DIFAT_SLOTS as u32)
                .div_ceil(ids_per_difat_sector);
            if next_fat == n_fat && next_difat == n_difat {
                break;
            }
            n_fat = next_fat;
            n_difat = next_difat;
        }

        let difat_start = fat.allocate_special(n_difat, DIFSECT);
        let fat_start = fat.allocate_special(n_fat, FATSECT);
        let fat_sector_ids: Vec<u32> = (fat_start..fat_start + n_fat).collect();

        fat.validate()
            .map_err(|e| OleError::InvalidData(format!("FAT validation failed: {}", e)))?;

        let mut difat = DifatBuilder::new(self.sector_size);
        difat.set_fat_sectors(&fat_sector_ids);
        if difat.calculate_difat_sector_count() != n_difat {
            return Err(OleError::InvalidData(format!(
                "DIFAT needs {} sectors, {} reserved",
                difat.calculate_difat_sector_count(),
                n_difat
            )));
        }
        let difat_sectors = difat.generate_difat_sectors(difat_start);

        let mut header = HeaderBuilder::new(self.sector_size);
        header.set_directory(dir_start, dir_sector_count);
        header.set_minifat(minifat_start, minifat_sectors.len() as u32);
        header.set_fat_sectors(&fat_sector_ids);
        if difat.is_needed() {
            header.set_difat(difat_start, n_difat);
        }

        debug!(
            entries = directory.entry_count(),
            mini_sectors = minifat.mini_sector_count(),
            fat_sectors = n_fat,
            difat_sectors = n_difat,
            "laid out compound file"
        );

        writer.seek(SeekFrom::Start(0))?;
        writer.write_all(&header.generate())?;

        for ((_, data), &start) in large.iter().zip(&large_starts) {
            self.write_run(writer, start, data)?;
        }
        self.write_run(writer, ministream_start, minifat.ministream_data())?;
        self.write_run(writer, dir_start, &dir_stream)?;
        self.write_run(writer, minifat_start, &minifat_sectors.concat())?;
        self.write_run(writer, difat_start, &difat_sectors.concat())?;
        self.write_run(writer, fat_start, &fat.generate_fat_sectors().concat())?;

        writer.flush()?;
        Ok(())
    }

    /// Write `data` to the contiguous sectors starting at `start`, padding
    /// the last sector with zeros.
    fn write_run<W: Write + Seek>(
        &self,
        writer: &mut W,
        start: u32,
        data: &[u8],
    ) -> Result<(), OleError> {
        if start == ENDOFCHAIN || data.is_empty() {
            return Ok(());
        }

        let position = (start as u64 + 1) * self.sector_size as u64;
        writer.seek(SeekFrom::Start(position))?;
        writer.write_all(data)?;

        let padding = data.len().next_multiple_of(self.sector_size) - data.len();
        if padding > 0 {
            writer.write_all(&vec![0u8; padding])?;
        }
        Ok(())
    }
}

impl Default for OleWriter {
    fn default() -> Self {
        Self::new()
    }
}
