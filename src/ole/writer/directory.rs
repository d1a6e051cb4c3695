//! Directory generation for OLE2 files
//!
//! Every stream written here lives directly under the root storage. The
//! children of the root are ordered the way Office readers expect (shorter
//! names first, then case-insensitive by name) and linked as a tree whose
//! root is the middle child: entries before it form a chain through their
//! left links, entries after it a chain through their right links.
//!
//! ```text
//! Sorted order: ["Book", "Workbook", "SummaryInformation"]
//!        Root Entry
//!             |
//!         Workbook (midpoint)
//!          /       \
//!       Book    SummaryInformation
//! ```

use super::super::consts::*;
use std::cmp::Ordering;

/// One 128-byte directory record awaiting serialization
#[derive(Debug, Clone)]
pub struct DirectoryEntryBuilder {
    pub name: String,
    pub entry_type: u8,
    pub start_sector: u32,
    pub size: u64,
    pub sid_left: u32,
    pub sid_right: u32,
    pub sid_child: u32,
}

impl DirectoryEntryBuilder {
    /// Root entry; its stream is the ministream
    pub fn root(start_sector: u32, size: u64) -> Self {
        Self::new("Root Entry".to_string(), STGTY_ROOT, start_sector, size)
    }

    pub fn stream(name: String, start_sector: u32, size: u64) -> Self {
        Self::new(name, STGTY_STREAM, start_sector, size)
    }

    fn new(name: String, entry_type: u8, start_sector: u32, size: u64) -> Self {
        Self {
            name,
            entry_type,
            start_sector,
            size,
            sid_left: NOSTREAM,
            sid_right: NOSTREAM,
            sid_child: NOSTREAM,
        }
    }

    pub fn to_bytes(&self) -> [u8; DIRENTRY_SIZE] {
        let mut data = [0u8; DIRENTRY_SIZE];

        // Name in UTF-16LE, at most 31 units plus the terminator
        let units: Vec<u16> = self.name.encode_utf16().take(31).collect();
        for (slot, unit) in data[..62].chunks_exact_mut(2).zip(&units) {
            slot.copy_from_slice(&unit.to_le_bytes());
        }
        let name_len = ((units.len() + 1) * 2) as u16;
        data[64..66].copy_from_slice(&name_len.to_le_bytes());

        data[66] = self.entry_type;
        data[67] = 1; // black
        data[68..72].copy_from_slice(&self.sid_left.to_le_bytes());
        data[72..76].copy_from_slice(&self.sid_right.to_le_bytes());
        data[76..80].copy_from_slice(&self.sid_child.to_le_bytes());
        // CLSID, state bits and timestamps stay zero
        data[116..120].copy_from_slice(&self.start_sector.to_le_bytes());
        data[120..128].copy_from_slice(&self.size.to_le_bytes());

        data
    }
}

pub struct DirectoryBuilder {
    entries: Vec<DirectoryEntryBuilder>,
}

impl DirectoryBuilder {
    pub fn new(ministream_start: u32, ministream_size: u64) -> Self {
        Self {
            entries: vec![DirectoryEntryBuilder::root(ministream_start, ministream_size)],
        }
    }

    /// Add a stream under the root and return its SID
    pub fn add_stream(&mut self, name: &str, start_sector: u32, size: u64) -> u32 {
        let sid = self.entries.len() as u32;
        self.entries
            .push(DirectoryEntryBuilder::stream(name.to_string(), start_sector, size));
        sid
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Link the root's children and serialize all entries in SID order.
    pub fn generate_directory_stream(&mut self) -> Vec<u8> {
        self.link_root_children();

        let mut data = Vec::with_capacity(self.entries.len() * DIRENTRY_SIZE);
        for entry in &self.entries {
            data.extend_from_slice(&entry.to_bytes());
        }
        data
    }

    fn link_root_children(&mut self) {
        let mut sorted: Vec<u32> = (1..self.entries.len() as u32).collect();
        if sorted.is_empty() {
            self.entries[0].sid_child = NOSTREAM;
            return;
        }
        sorted.sort_by(|&a, &b| {
            compare_names(&self.entries[a as usize].name, &self.entries[b as usize].name)
        });

        let midpoint = sorted.len() / 2;
        self.entries[0].sid_child = sorted[midpoint];

        for (index, &sid) in sorted.iter().enumerate() {
            let entry = &mut self.entries[sid as usize];
            entry.sid_left = NOSTREAM;
            entry.sid_right = NOSTREAM;
            if index <= midpoint && index > 0 {
                entry.sid_left = sorted[index - 1];
            }
            if index >= midpoint && index + 1 < sorted.len() {
                entry.sid_right = sorted[index + 1];
            }
        }
    }
}

/// Directory ordering: by UTF-16 length, then by upper-cased name.
fn compare_names(a: &str, b: &str) -> Ordering {
    a.encode_utf16()
        .count()
        .cmp(&b.encode_utf16().count())
        .then_with(|| a.to_uppercase().cmp(&b.to_uppercase()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_entry() {
        let root = DirectoryEntryBuilder::root(ENDOFCHAIN, 0);
        assert_eq!(root.name, "Root Entry");

        let bytes = root.to_bytes();
        assert_eq!(bytes[66], STGTY_ROOT);
        // "Root Entry" is 10 units plus the terminator
        assert_eq!(u16::from_le_bytes([bytes[64], bytes[65]]), 22);
        assert_eq!(&bytes[0..4], &[b'R', 0, b'o', 0]);
    }

    #[test]
    fn test_compare_names() {
        assert_eq!(compare_names("Book", "Workbook"), Ordering::Less);
        assert_eq!(compare_names("abc", "ABD"), Ordering::Less);
        assert_eq!(compare_names("Data", "DATA"), Ordering::Equal);
    }

    #[test]
    fn test_single_stream_links_root() {
        let mut dir = DirectoryBuilder::new(ENDOFCHAIN, 0);
        let sid = dir.add_stream("Workbook", 0, 4096);
        assert_eq!(sid, 1);

        let data = dir.generate_directory_stream();
        assert_eq!(data.len(), 2 * DIRENTRY_SIZE);
        assert_eq!(dir.entries[0].sid_child, 1);
        assert_eq!(dir.entries[1].sid_left, NOSTREAM);
        assert_eq!(dir.entries[1].sid_right, NOSTREAM);
    }

    #[test]
    fn test_midpoint_linking() {
        let mut dir = DirectoryBuilder::new(ENDOFCHAIN, 0);
        let long = dir.add_stream("SummaryInformation", 0, 10);
        let short = dir.add_stream("Book", 0, 10);
        let mid = dir.add_stream("Workbook", 0, 10);
        dir.generate_directory_stream();

        assert_eq!(dir.entry_count(), 4);
        assert_eq!(dir.entries[0].sid_child, mid);
        assert_eq!(dir.entries[mid as usize].sid_left, short);
        assert_eq!(dir.entries[mid as usize].sid_right, long);
        assert_eq!(dir.entries[short as usize].sid_left, NOSTREAM);
        assert_eq!(dir.entries[long as usize].sid_right, NOSTREAM);
    }
}
