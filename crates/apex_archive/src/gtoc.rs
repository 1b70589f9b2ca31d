//! Types for reading GTOC global lookup tables
//!
//! A GTOC file starts with `GT0C` and the number of archives it describes. The
//! rest of the file is one buffer. Archive entries are packed back to back at
//! its start, each a 12 byte header followed by `num_files` 8 byte slots. Every
//! slot holds a relative offset (from the slot itself) to a file record
//! elsewhere in the buffer, plus the offset of the member inside its archive.
//!
//! | Offset (bytes) | Field        | Description                                   |
//! |----------------|--------------|-----------------------------------------------|
//! | 0x0000         | Hash 1       | 4 bytes                                       |
//! | 0x0004         | Hash 2       | 4 bytes: first 4 bytes of the archive file    |
//! | 0x0008         | File Count   | 4 bytes                                       |
//! | 0x000C         | Slots        | File Count × (record offset, data offset)     |
//!
//! File records are `hash1`, `hash2`, `size` and a null terminated name.
//!
//! There is no per entry length, the next entry is found by stepping over the
//! current one. A damaged file count therefore shifts every entry after it.

use std::fs;
use std::io::{Cursor, Read};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt};
use tracing::{debug, instrument, warn};

use crate::sarc::member_path;

use crate::error::{Error, Result};

const ENTRY_HEADER_SIZE: usize = 12;
const FILE_SLOT_SIZE: usize = 8;
const FILE_RECORD_SIZE: usize = 12;

/// A member of an archive described by the table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TocFile {
    /// First hash of the file record
    pub hash1: u32,
    /// Second hash of the file record
    pub hash2: u32,
    /// Size of the member in bytes
    pub size: i32,
    /// Path of the member relative to the archive
    pub name: String,
    /// Offset of the member data from the start of the archive
    pub entry_offset: i32,
}

/// An archive described by the table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TocEntry {
    /// First hash of the archive
    pub hash1: u32,
    /// Second hash of the archive, matched against an archive's first four bytes
    pub hash2: u32,
    /// Members of the archive
    pub files: Vec<TocFile>,
}

/// A fully parsed GTOC table
///
/// Read only once built, so it can be shared between threads by reference.
///
/// ```no_run
/// fn list_archives(data: Vec<u8>) -> apex_archive::error::Result<()> {
///     let toc = apex_archive::ArchiveToc::from_bytes(&data)?;
///
///     for entry in toc.entries() {
///         println!("{:08x}: {} files", entry.hash2, entry.files.len());
///     }
///
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct ArchiveToc {
    entries: Vec<TocEntry>,
}

impl ArchiveToc {
    /// File signature
    pub const MAGIC: [u8; 4] = *b"GT0C";

    /// Read a whole table from `reader`.
    pub fn new<R: Read>(mut reader: R) -> Result<Self> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        Self::from_bytes(&data)
    }

    /// Parse a table held in memory.
    #[instrument(skip(data), fields(size = data.len()), err)]
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < 8 {
            return Err(Error::Truncated);
        }

        if data[..4] != Self::MAGIC {
            return Err(Error::BadMagic);
        }

        let count = Cursor::new(&data[4..8]).read_u32::<LittleEndian>()?;
        let arena = &data[8..];

        let mut entries = Vec::with_capacity(count.min(0x10000) as usize);
        let mut cursor = 0usize;

        for _ in 0..count {
            let header = slice(arena, cursor, ENTRY_HEADER_SIZE)?;
            let mut header = Cursor::new(header);
            let hash1 = header.read_u32::<LittleEndian>()?;
            let hash2 = header.read_u32::<LittleEndian>()?;
            let num_files = header.read_i32::<LittleEndian>()?;

            let num_files = usize::try_from(num_files).map_err(|_| Error::Truncated)?;
            let slots_start = cursor + ENTRY_HEADER_SIZE;
            let entry_end = num_files
                .checked_mul(FILE_SLOT_SIZE)
                .and_then(|s| s.checked_add(slots_start))
                .ok_or(Error::Truncated)?;

            if entry_end > arena.len() {
                return Err(Error::Truncated);
            }

            let files = (0..num_files)
                .map(|i| read_file(arena, slots_start + i * FILE_SLOT_SIZE))
                .collect::<Result<Vec<_>>>()?;

            entries.push(TocEntry {
                hash1,
                hash2,
                files,
            });
            cursor = entry_end;
        }

        debug!("loaded {} archive entries", entries.len());

        Ok(Self { entries })
    }

    /// Number of archives described by this table
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether this table describes no archives
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All archive entries in table order
    pub fn entries(&self) -> &[TocEntry] {
        &self.entries
    }

    /// Find the archive whose second hash matches `hash`.
    pub fn find_entry(&self, hash: u32) -> Option<&TocEntry> {
        self.entries.iter().find(|e| e.hash2 == hash)
    }
}

impl TocEntry {
    /// Write every member found in the archive `data` below `output_dir`.
    /// Returns the number of members written.
    ///
    /// Members without data, or whose offset points into the archive header,
    /// are skipped.
    #[instrument(skip(self, data), fields(hash = self.hash2), err)]
    pub fn extract_files(&self, data: &[u8], output_dir: &Path) -> Result<usize> {
        let mut extracted = 0;

        for file in &self.files {
            if file.size < 1 || file.entry_offset < 4 {
                continue;
            }

            let Some(path) = member_path(output_dir, &file.name) else {
                warn!("skipping {}, it escapes the output directory", file.name);
                continue;
            };

            let member = slice(data, file.entry_offset as usize, file.size as usize)?;

            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }

            fs::write(&path, member)?;
            debug!("extracted {}", file.name);
            extracted += 1;
        }

        Ok(extracted)
    }
}

/// Look `hash` up in each table in turn.
pub fn find_in<'a>(tables: &'a [ArchiveToc], hash: u32) -> Result<&'a TocEntry> {
    tables
        .iter()
        .find_map(|t| t.find_entry(hash))
        .ok_or(Error::EntryNotFound(hash))
}

fn slice(arena: &[u8], start: usize, len: usize) -> Result<&[u8]> {
    start
        .checked_add(len)
        .and_then(|end| arena.get(start..end))
        .ok_or(Error::Truncated)
}

fn read_file(arena: &[u8], slot: usize) -> Result<TocFile> {
    let mut slot_reader = Cursor::new(slice(arena, slot, FILE_SLOT_SIZE)?);
    let record_offset = slot_reader.read_i32::<LittleEndian>()?;
    let entry_offset = slot_reader.read_i32::<LittleEndian>()?;

    let record = i64::try_from(slot)
        .ok()
        .map(|s| s + i64::from(record_offset))
        .and_then(|r| usize::try_from(r).ok())
        .ok_or(Error::Truncated)?;

    let mut record_reader = Cursor::new(slice(arena, record, FILE_RECORD_SIZE)?);
    let hash1 = record_reader.read_u32::<LittleEndian>()?;
    let hash2 = record_reader.read_u32::<LittleEndian>()?;
    let size = record_reader.read_i32::<LittleEndian>()?;

    let name_start = record + FILE_RECORD_SIZE;
    let name_len = arena[name_start..]
        .iter()
        .position(|&c| c == 0)
        .ok_or(Error::Truncated)?;
    let name = String::from_utf8_lossy(&arena[name_start..name_start + name_len]).into_owned();

    Ok(TocFile {
        hash1,
        hash2,
        size,
        name,
        entry_offset,
    })
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use crate::error::{Error, Result};
    use crate::gtoc::{find_in, ArchiveToc, TocEntry, TocFile};

    #[rustfmt::skip]
    fn single_entry_table() -> Vec<u8> {
        vec![
            // Header
            0x47, 0x54, 0x30, 0x43,
            0x01, 0x00, 0x00, 0x00,
            // Entry
            0x11, 0x11, 0x11, 0x11,
            0xEF, 0xBE, 0xAD, 0xDE,
            0x01, 0x00, 0x00, 0x00,
            // Slot, record is 8 bytes further on
            0x08, 0x00, 0x00, 0x00,
            0x20, 0x00, 0x00, 0x00,
            // Record
            0x01, 0x00, 0x00, 0x00,
            0x02, 0x00, 0x00, 0x00,
            0x0B, 0x00, 0x00, 0x00,
            0x61, 0x2F, 0x62, 0x2E, 0x74, 0x78, 0x74, 0x00,
        ]
    }

    #[test]
    fn read_single_entry() -> Result<()> {
        let toc = ArchiveToc::from_bytes(&single_entry_table())?;
        assert_eq!(toc.len(), 1);

        let entry = toc.find_entry(0xDEADBEEF).ok_or(Error::EntryNotFound(0))?;
        assert_eq!(entry.hash1, 0x11111111);
        assert_eq!(
            entry.files,
            vec![TocFile {
                hash1: 1,
                hash2: 2,
                size: 11,
                name: "a/b.txt".into(),
                entry_offset: 32,
            }]
        );

        Ok(())
    }

    #[test]
    fn read_empty_table() -> Result<()> {
        let toc = ArchiveToc::from_bytes(b"GT0C\0\0\0\0")?;
        assert!(toc.is_empty());
        assert!(toc.find_entry(0).is_none());

        Ok(())
    }

    #[test]
    fn read_invalid_magic() {
        let result = ArchiveToc::from_bytes(b"GTOC\0\0\0\0");
        assert!(matches!(result, Err(Error::BadMagic)));
    }

    #[test]
    fn oversized_file_count_is_truncated() {
        let mut data = single_entry_table();
        data[16] = 0x40;

        let result = ArchiveToc::from_bytes(&data);
        assert!(matches!(result, Err(Error::Truncated)));
    }

    #[test]
    fn entry_count_beyond_buffer_is_truncated() {
        let mut data = single_entry_table();
        data[4] = 0x02;

        let result = ArchiveToc::from_bytes(&data);
        assert!(matches!(result, Err(Error::Truncated)));
    }

    #[test]
    fn record_offset_outside_buffer_is_truncated() {
        let mut data = single_entry_table();
        data[20] = 0xF0;

        let result = ArchiveToc::from_bytes(&data);
        assert!(matches!(result, Err(Error::Truncated)));
    }

    #[test]
    fn lookup_falls_through_tables() -> Result<()> {
        let empty = ArchiveToc::from_bytes(b"GT0C\0\0\0\0")?;
        let full = ArchiveToc::from_bytes(&single_entry_table())?;
        let tables = [empty, full];

        assert_eq!(find_in(&tables, 0xDEADBEEF)?.files.len(), 1);
        assert!(matches!(
            find_in(&tables, 0x12345678),
            Err(Error::EntryNotFound(0x12345678))
        ));

        Ok(())
    }

    #[test]
    fn extract_skips_empty_and_header_members() -> Result<()> {
        let entry = TocEntry {
            hash1: 0,
            hash2: 0,
            files: vec![
                TocFile {
                    name: "dir/kept.bin".into(),
                    size: 3,
                    entry_offset: 4,
                    ..Default::default()
                },
                TocFile {
                    name: "empty.bin".into(),
                    size: 0,
                    entry_offset: 4,
                    ..Default::default()
                },
                TocFile {
                    name: "header.bin".into(),
                    size: 2,
                    entry_offset: 0,
                    ..Default::default()
                },
            ],
        };

        let dir = tempfile::tempdir()?;
        let count = entry.extract_files(b"\x04\0\0\0abc", dir.path())?;

        assert_eq!(count, 1);
        assert_eq!(std::fs::read(dir.path().join("dir/kept.bin"))?, b"abc");
        assert!(!dir.path().join("empty.bin").exists());
        assert!(!dir.path().join("header.bin").exists());

        Ok(())
    }

    #[test]
    fn extract_out_of_bounds_member() -> Result<()> {
        let entry = TocEntry {
            hash1: 0,
            hash2: 0,
            files: vec![TocFile {
                name: "big.bin".into(),
                size: 100,
                entry_offset: 4,
                ..Default::default()
            }],
        };

        let dir = tempfile::tempdir()?;
        let result = entry.extract_files(b"\x04\0\0\0abc", dir.path());
        assert!(matches!(result, Err(Error::Truncated)));

        Ok(())
    }
}
