use super::binary::{read_u16_le, read_u32_array, read_u32_le};
use super::consts::*;
use std::collections::HashSet;
use std::io::{self, Read, Seek, SeekFrom};
use thiserror::Error;
use zerocopy::{FromBytes, LE, U16, U32, U64};
use zerocopy_derive::FromBytes as DeriveFromBytes;

/// Raw OLE directory entry structure (128 bytes)
///
/// This represents the on-disk format of a directory entry.
#[derive(Debug, Clone, DeriveFromBytes)]
#[repr(C)]
struct RawDirectoryEntry {
    /// Entry name in UTF-16LE (64 bytes, null-padded)
    name: [u8; 64],
    /// Length of name in bytes (including null terminator)
    name_len: U16<LE>,
    /// Entry type (1 = storage, 2 = stream, 5 = root)
    entry_type: u8,
    /// Node color (0 = red, 1 = black)
    node_color: u8,
    sid_left: U32<LE>,
    sid_right: U32<LE>,
    sid_child: U32<LE>,
    clsid: [u8; 16],
    state_bits: U32<LE>,
    creation_time: U64<LE>,
    modified_time: U64<LE>,
    start_sector: U32<LE>,
    stream_size: U64<LE>,
}

/// Error types for OLE file parsing
#[derive(Error, Debug)]
pub enum OleError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Invalid format: {0}")]
    InvalidFormat(String),
    #[error("Invalid data: {0}")]
    InvalidData(String),
    #[error("Not an OLE file")]
    NotOleFile,
    #[error("Corrupted file: {0}")]
    CorruptedFile(String),
    #[error("Stream not found")]
    StreamNotFound,
}

/// Represents an OLE directory entry (stream or storage)
#[derive(Debug, Clone)]
pub struct DirectoryEntry {
    /// Storage ID (index in directory)
    pub sid: u32,
    /// Entry name (UTF-16 decoded to UTF-8)
    pub name: String,
    /// Entry type (stream, storage, root)
    pub entry_type: u8,
    pub sid_left: u32,
    pub sid_right: u32,
    pub sid_child: u32,
    /// First sector of the stream
    pub start_sector: u32,
    /// Size of the stream in bytes
    pub size: u64,
    /// Whether this stream is stored in the mini stream
    pub is_minifat: bool,
}

/// Reader for OLE2 structured storage (compound file) containers.
///
/// Only the metadata (FAT, MiniFAT, directory) is loaded eagerly; stream
/// contents are read on demand by [`OleFile::open_stream`].
#[derive(Debug)]
pub struct OleFile<R: Read + Seek> {
    reader: R,
    file_size: u64,
    sector_size: usize,
    mini_sector_size: usize,
    mini_stream_cutoff: u32,
    /// File Allocation Table - maps sector to next sector in chain
    fat: Vec<u32>,
    /// Mini FAT - for streams smaller than cutoff size
    minifat: Vec<u32>,
    first_dir_sector: u32,
    root: Option<DirectoryEntry>,
    /// All directory entries indexed by SID
    dir_entries: Vec<Option<DirectoryEntry>>,
    /// Mini stream data (loaded on demand)
    ministream: Option<Vec<u8>>,
}

impl<R: Read + Seek> OleFile<R> {
    /// Open and parse an OLE file from a reader
    ///
    /// Fails with [`OleError::NotOleFile`] when the signature is missing or
    /// the input is shorter than the smallest valid container.
    pub fn open(mut reader: R) -> Result<Self, OleError> {
        let file_size = reader.seek(SeekFrom::End(0))?;
        reader.seek(SeekFrom::Start(0))?;

        if file_size < MINIMAL_OLEFILE_SIZE as u64 {
            return Err(OleError::NotOleFile);
        }

        let mut header = [0u8; HEADER_SIZE];
        reader.read_exact(&mut header)?;

        if &header[0..8] != MAGIC {
            return Err(OleError::NotOleFile);
        }

        let dll_version = read_u16_le(&header, 0x1A)?;
        let byte_order = read_u16_le(&header, 0x1C)?;
        let sector_shift = read_u16_le(&header, 0x1E)?;
        let mini_sector_shift = read_u16_le(&header, 0x20)?;
        let first_dir_sector = read_u32_le(&header, 0x30)?;
        let mini_stream_cutoff = read_u32_le(&header, 0x38)?;
        let first_minifat_sector = read_u32_le(&header, 0x3C)?;
        let num_minifat_sectors = read_u32_le(&header, 0x40)?;
        let first_difat_sector = read_u32_le(&header, 0x44)?;
        let num_difat_sectors = read_u32_le(&header, 0x48)?;

        if byte_order != 0xFFFE {
            return Err(OleError::InvalidFormat("Invalid byte order".to_string()));
        }

        if sector_shift != 9 && sector_shift != 12 {
            return Err(OleError::InvalidFormat(format!(
                "Unsupported sector shift {}",
                sector_shift
            )));
        }
        if mini_sector_shift != 6 {
            return Err(OleError::InvalidFormat(format!(
                "Unsupported mini sector shift {}",
                mini_sector_shift
            )));
        }

        let sector_size = 1usize << sector_shift;
        let mini_sector_size = 1usize << mini_sector_shift;

        // Sector size must agree with the DLL version
        if (dll_version == 3 && sector_size != SECTOR_SIZE_V3)
            || (dll_version == 4 && sector_size != SECTOR_SIZE_V4)
        {
            return Err(OleError::InvalidFormat("Sector size mismatch".to_string()));
        }

        let mut ole = OleFile {
            reader,
            file_size,
            sector_size,
            mini_sector_size,
            mini_stream_cutoff,
            fat: Vec::new(),
            minifat: Vec::new(),
            first_dir_sector,
            root: None,
            dir_entries: Vec::new(),
            ministream: None,
        };

        ole.load_fat(&header, first_difat_sector, num_difat_sectors)?;
        ole.load_directory()?;

        if num_minifat_sectors > 0 && first_minifat_sector != ENDOFCHAIN {
            ole.load_minifat(first_minifat_sector)?;
        }

        Ok(ole)
    }

    /// Total size of the underlying container in bytes
    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    /// Load the File Allocation Table (FAT)
    ///
    /// The first 109 FAT sector indexes are stored in the header, additional
    /// indexes are stored in a chain of DIFAT sectors.
    fn load_fat(
        &mut self,
        header: &[u8; HEADER_SIZE],
        first_difat_sector: u32,
        num_difat_sectors: u32,
    ) -> Result<(), OleError> {
        let mut fat_sectors: Vec<u32> = read_u32_array(&header[0x4C..])
            .into_iter()
            .take(HEADER_DIFAT_SLOTS)
            .take_while(|&sector| sector <= MAXREGSECT)
            .collect();

        if num_difat_sectors > 0 {
            let mut difat_sector = first_difat_sector;
            let ids_per_sector = (self.sector_size / 4) - 1; // last slot links the chain
            let mut seen = HashSet::new();

            for _ in 0..num_difat_sectors {
                if difat_sector > MAXREGSECT {
                    break;
                }
                if !seen.insert(difat_sector) {
                    return Err(OleError::CorruptedFile("DIFAT chain loops".to_string()));
                }

                let ids = read_u32_array(&self.read_sector(difat_sector)?);
                fat_sectors.extend(
                    ids[..ids_per_sector]
                        .iter()
                        .copied()
                        .take_while(|&sector| sector <= MAXREGSECT),
                );
                difat_sector = ids[ids_per_sector];
            }
        }

        if fat_sectors.is_empty() {
            return Err(OleError::CorruptedFile("No FAT sectors".to_string()));
        }

        let entries_per_sector = self.sector_size / 4;
        self.fat.reserve(fat_sectors.len() * entries_per_sector);

        for &sector_id in &fat_sectors {
            let sector_data = self.read_sector(sector_id)?;
            self.fat.extend(read_u32_array(&sector_data));
        }

        Ok(())
    }

    /// Load the Mini FAT (for small streams)
    fn load_minifat(&mut self, first_minifat_sector: u32) -> Result<(), OleError> {
        let minifat_data = self.read_stream_from_fat(first_minifat_sector)?;
        self.minifat = read_u32_array(&minifat_data);
        Ok(())
    }

    /// Load directory entries
    fn load_directory(&mut self) -> Result<(), OleError> {
        let dir_data = self.read_stream_from_fat(self.first_dir_sector)?;

        let num_entries = dir_data.len() / DIRENTRY_SIZE;
        if num_entries == 0 {
            return Err(OleError::CorruptedFile("Empty directory".to_string()));
        }
        self.dir_entries = vec![None; num_entries];

        // Root entry is always SID 0
        let root = self.parse_directory_entry(&dir_data[0..DIRENTRY_SIZE], 0)?;
        if root.entry_type != STGTY_ROOT {
            return Err(OleError::CorruptedFile(
                "First directory entry is not the root".to_string(),
            ));
        }
        let root_child_sid = root.sid_child;
        self.dir_entries[0] = Some(root.clone());
        self.root = Some(root);

        self.build_storage_tree(root_child_sid, &dir_data)
    }

    /// Parse a single directory entry from 128 bytes
    fn parse_directory_entry(&self, data: &[u8], sid: u32) -> Result<DirectoryEntry, OleError> {
        let raw = RawDirectoryEntry::read_from_bytes(data)
            .map_err(|_| OleError::InvalidFormat("Failed to parse directory entry".to_string()))?;

        let name_len = raw.name_len.get() as usize;
        let name_bytes = &raw.name[0..name_len.saturating_sub(2).min(64)];
        let name = decode_entry_name(name_bytes);

        // 512-byte sector files only use the low 32 bits of the size
        let size = if self.sector_size == SECTOR_SIZE_V3 {
            raw.stream_size.get() & 0xFFFF_FFFF
        } else {
            raw.stream_size.get()
        };

        let is_minifat = size < self.mini_stream_cutoff as u64 && raw.entry_type == STGTY_STREAM;

        Ok(DirectoryEntry {
            sid,
            name,
            entry_type: raw.entry_type,
            sid_left: raw.sid_left.get(),
            sid_right: raw.sid_right.get(),
            sid_child: raw.sid_child.get(),
            start_sector: raw.start_sector.get(),
            size,
            is_minifat,
        })
    }

    /// Walk the sibling/child tree rooted at `child_sid`, parsing every
    /// reachable entry exactly once.
    fn build_storage_tree(&mut self, child_sid: u32, dir_data: &[u8]) -> Result<(), OleError> {
        let mut pending = vec![child_sid];

        while let Some(sid) = pending.pop() {
            if sid == NOSTREAM {
                continue;
            }

            let index = sid as usize;
            if index >= self.dir_entries.len() {
                return Err(OleError::CorruptedFile(
                    "Invalid directory entry index".to_string(),
                ));
            }

            // Already visited: a well-formed tree never revisits a node
            if self.dir_entries[index].is_some() {
                continue;
            }

            let offset = index * DIRENTRY_SIZE;
            let entry =
                self.parse_directory_entry(&dir_data[offset..offset + DIRENTRY_SIZE], sid)?;
            pending.push(entry.sid_left);
            pending.push(entry.sid_right);
            if entry.entry_type == STGTY_STORAGE {
                pending.push(entry.sid_child);
            }
            self.dir_entries[index] = Some(entry);
        }

        Ok(())
    }

    /// Read a single sector from the file
    fn read_sector(&mut self, sector_id: u32) -> Result<Vec<u8>, OleError> {
        // Sector position in file: (sector_id + 1) * sector_size
        let position = ((sector_id as u64) + 1) * (self.sector_size as u64);
        if position + self.sector_size as u64 > self.file_size {
            return Err(OleError::CorruptedFile(format!(
                "Sector {} lies beyond the end of the file",
                sector_id
            )));
        }
        self.reader.seek(SeekFrom::Start(position))?;

        let mut buffer = vec![0u8; self.sector_size];
        self.reader.read_exact(&mut buffer)?;
        Ok(buffer)
    }

    /// Read a stream by following the FAT chain
    fn read_stream_from_fat(&mut self, start_sector: u32) -> Result<Vec<u8>, OleError> {
        let mut data = Vec::new();
        let mut sector = start_sector;
        let mut steps = 0usize;

        while sector != ENDOFCHAIN {
            if sector as usize >= self.fat.len() {
                return Err(OleError::CorruptedFile(
                    "Invalid sector index in FAT".to_string(),
                ));
            }

            // A chain can never be longer than the FAT itself
            steps += 1;
            if steps > self.fat.len() {
                return Err(OleError::CorruptedFile("FAT chain loops".to_string()));
            }

            let sector_data = self.read_sector(sector)?;
            data.extend_from_slice(&sector_data);

            sector = self.fat[sector as usize];
        }

        Ok(data)
    }

    /// Read a stream by following the MiniFAT chain
    fn read_stream_from_minifat(
        &mut self,
        start_sector: u32,
        size: u64,
    ) -> Result<Vec<u8>, OleError> {
        if self.ministream.is_none() {
            let root_start = self
                .root
                .as_ref()
                .map(|root| root.start_sector)
                .ok_or_else(|| OleError::CorruptedFile("No root entry".to_string()))?;
            let ministream_data = self.read_stream_from_fat(root_start)?;
            self.ministream = Some(ministream_data);
        }

        let ministream = self.ministream.as_deref().unwrap_or_default();
        let mut data = Vec::with_capacity(size as usize);
        let mut sector = start_sector;
        let mut steps = 0usize;

        while sector != ENDOFCHAIN {
            if sector as usize >= self.minifat.len() {
                return Err(OleError::CorruptedFile(
                    "Invalid sector index in MiniFAT".to_string(),
                ));
            }

            steps += 1;
            if steps > self.minifat.len() {
                return Err(OleError::CorruptedFile("MiniFAT chain loops".to_string()));
            }

            let position = (sector as usize) * self.mini_sector_size;
            let chunk = ministream
                .get(position..position + self.mini_sector_size)
                .ok_or_else(|| OleError::CorruptedFile("Mini sector out of bounds".to_string()))?;
            data.extend_from_slice(chunk);

            sector = self.minifat[sector as usize];
        }

        if (data.len() as u64) < size {
            return Err(OleError::CorruptedFile(
                "Stream shorter than its directory size".to_string(),
            ));
        }
        data.truncate(size as usize);
        Ok(data)
    }

    /// List all streams in the OLE file as paths of storage/stream names
    pub fn list_streams(&self) -> Vec<Vec<String>> {
        let mut streams = Vec::new();
        if let Some(root) = &self.root {
            self.collect_streams(root.sid_child, &mut Vec::new(), &mut streams);
        }
        streams
    }

    fn collect_streams(&self, sid: u32, path: &mut Vec<String>, streams: &mut Vec<Vec<String>>) {
        let Some(Some(entry)) = self.dir_entries.get(sid as usize) else {
            return;
        };

        self.collect_streams(entry.sid_left, path, streams);

        path.push(entry.name.clone());
        match entry.entry_type {
            STGTY_STREAM => streams.push(path.clone()),
            STGTY_STORAGE => self.collect_streams(entry.sid_child, path, streams),
            _ => {},
        }
        path.pop();

        self.collect_streams(entry.sid_right, path, streams);
    }

    /// Open a stream by path and return its contents
    ///
    /// Path components are matched case-insensitively, as Office does.
    pub fn open_stream(&mut self, path: &[&str]) -> Result<Vec<u8>, OleError> {
        let entry = self.find_entry(path)?;

        if entry.entry_type != STGTY_STREAM {
            return Err(OleError::InvalidFormat("Not a stream".to_string()));
        }

        if entry.is_minifat {
            self.read_stream_from_minifat(entry.start_sector, entry.size)
        } else {
            let mut data = self.read_stream_from_fat(entry.start_sector)?;
            if (data.len() as u64) < entry.size {
                return Err(OleError::CorruptedFile(
                    "Stream shorter than its directory size".to_string(),
                ));
            }
            data.truncate(entry.size as usize);
            Ok(data)
        }
    }

    /// Find a directory entry by path
    fn find_entry(&self, path: &[&str]) -> Result<DirectoryEntry, OleError> {
        let root = self.root.as_ref().ok_or(OleError::StreamNotFound)?;
        if path.is_empty() {
            return Ok(root.clone());
        }

        let mut current_sid = root.sid_child;
        let mut found = None;

        for &name in path {
            let entry = self
                .find_child_by_name(current_sid, name)
                .ok_or(OleError::StreamNotFound)?;
            current_sid = entry.sid_child;
            found = Some(entry);
        }

        found.cloned().ok_or(OleError::StreamNotFound)
    }

    /// Find a child entry by name among the siblings reachable from `sid`
    fn find_child_by_name(&self, sid: u32, name: &str) -> Option<&DirectoryEntry> {
        let mut pending = vec![sid];
        let mut visited = HashSet::new();

        while let Some(sid) = pending.pop() {
            if sid == NOSTREAM || !visited.insert(sid) {
                continue;
            }
            let Some(Some(entry)) = self.dir_entries.get(sid as usize) else {
                continue;
            };
            if entry.name.eq_ignore_ascii_case(name)
                || entry.name.to_lowercase() == name.to_lowercase()
            {
                return Some(entry);
            }
            pending.push(entry.sid_left);
            pending.push(entry.sid_right);
        }

        None
    }

    /// Check if a stream or storage exists
    pub fn exists(&self, path: &[&str]) -> bool {
        self.find_entry(path).is_ok()
    }
}

/// Decode a UTF-16LE directory entry name
fn decode_entry_name(bytes: &[u8]) -> String {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|chunk| u16::from_le_bytes([chunk[0], chunk[1]]))
        .take_while(|&unit| unit != 0)
        .collect();
    String::from_utf16_lossy(&units)
}
