//! Types for reading, writing and extracting SARC archives
//!
//! Two revisions of the format exist. Both start with the little endian value
//! `4` followed by `SARC` and a version, and both store member data after the
//! table of contents, every member padded to a 16 byte boundary. They differ in
//! how names are stored: v2 writes them inline in the table, v3 keeps them in a
//! separate name pool and references them by offset.
//!
//! A member with a data offset of `0` is external. Its data lives in another
//! archive and only its name and size are recorded.

use std::fs;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use binrw::{BinRead, BinWrite};
use bon::Builder;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use tracing::{debug, info, instrument, warn};

use crate::compression::CompressionMethod;
use crate::error::{Error, Result};
use crate::hash::name_hash;
use crate::manifest::Manifest;
use crate::types::{padding_for, SarcV2Header, SarcV3Header, SarcV3Record};

const DATA_ALIGNMENT: u64 = 16;
const ZEROES: [u8; 16] = [0; 16];

/// A member of a SARC archive
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileEntry {
    /// Path of the member inside the archive
    pub name: String,

    /// Offset of the member data from the start of the archive, `0` when external
    pub offset: u32,

    /// Size of the member data
    pub length: u32,

    /// Member data is stored in another archive
    pub external: bool,
}

impl FileEntry {
    fn loaded(name: String, offset: u32, length: u32) -> Self {
        Self {
            name,
            offset,
            length,
            external: offset == 0,
        }
    }
}

/// Options for extracting members to disk
#[derive(Debug, Clone, Builder)]
pub struct ExtractOptions {
    /// Directory member paths are resolved against
    #[builder(into)]
    pub output_dir: PathBuf,

    /// Where to write the `.toc` manifest describing the archive
    #[builder(into)]
    pub manifest_path: Option<PathBuf>,

    /// Compression token recorded in the manifest
    #[builder(default)]
    pub compression: CompressionMethod,
}

/// Operations shared by every SARC revision
pub trait SarcFormat: Sized {
    /// Revision written to the header
    fn version(&self) -> u32;

    /// Members in table order
    fn files(&self) -> &[FileEntry];

    /// Read the header and table of contents, leaving member data in place.
    ///
    /// Returns [`Error::UnsupportedVersion`] when the signature matches but the
    /// revision belongs to another layout.
    fn read<R: Read + Seek>(reader: &mut R) -> Result<Self>;

    /// Append a member to the table.
    fn add_file_entry(&mut self, name: &str, length: u32, external: bool);

    /// Write the archive, asking `payloads` for each embedded member's data in
    /// table order.
    fn write<W, F>(&self, writer: &mut W, payloads: F) -> Result<()>
    where
        W: Write,
        F: FnMut(&FileEntry) -> Result<Vec<u8>>;

    /// Smallest data offset considered valid when extracting
    fn min_data_offset(&self) -> u32 {
        1
    }

    /// Write every embedded member below `options.output_dir`, given the whole
    /// archive in `data`. Returns the number of members written.
    #[instrument(skip_all, fields(version = self.version()), err)]
    fn extract_files(&self, data: &[u8], options: &ExtractOptions) -> Result<usize> {
        if let Some(manifest_path) = &options.manifest_path {
            let manifest = Manifest::from_files(self.version(), options.compression, self.files());
            if let Err(err) = fs::write(manifest_path, manifest.to_string()) {
                warn!("cannot create {}: {err}", manifest_path.display());
            }
        }

        let mut extracted = 0;
        for file in self.files() {
            if file.length == 0 || file.offset < self.min_data_offset() {
                continue;
            }

            let Some(path) = member_path(&options.output_dir, &file.name) else {
                warn!("skipping {}, it escapes the output directory", file.name);
                continue;
            };

            let start = file.offset as usize;
            let member = data
                .get(start..start + file.length as usize)
                .ok_or(Error::Truncated)?;

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

/// SARC v2 archive, names stored inline in the table of contents
#[derive(Debug, Clone, PartialEq)]
pub struct SarcV2 {
    /// Header revision, at most 2
    pub version: u32,

    /// Members in table order
    pub files: Vec<FileEntry>,
}

impl Default for SarcV2 {
    fn default() -> Self {
        Self {
            version: 2,
            files: Vec::new(),
        }
    }
}

impl SarcV2 {
    fn name_alignment(name: &str) -> usize {
        padding_for(name.len() as u64, 4) as usize
    }

    fn toc_size(&self) -> u64 {
        let entries: u64 = self
            .files
            .iter()
            .map(|f| 12 + (f.name.len() + Self::name_alignment(&f.name)) as u64)
            .sum();

        entries + padding_for(entries, DATA_ALIGNMENT)
    }
}

impl SarcFormat for SarcV2 {
    fn version(&self) -> u32 {
        self.version
    }

    fn files(&self) -> &[FileEntry] {
        &self.files
    }

    fn min_data_offset(&self) -> u32 {
        4
    }

    #[instrument(skip(reader), err)]
    fn read<R: Read + Seek>(reader: &mut R) -> Result<Self> {
        let start = reader.stream_position()?;
        let header = SarcV2Header::read(reader)?;

        if header.version > 2 {
            return Err(Error::UnsupportedVersion(header.version));
        }

        let toc_end = start + u64::from(SarcV2Header::SIZE) + u64::from(header.toc_size);
        let mut files = Vec::new();

        while reader.stream_position()? < toc_end {
            let name_length = reader.read_u32::<LittleEndian>()?;
            if name_length == 0 {
                break;
            }

            if u64::from(name_length) > toc_end.saturating_sub(reader.stream_position()?) {
                return Err(Error::Truncated);
            }

            let mut name = vec![0; name_length as usize];
            reader.read_exact(&mut name)?;
            while name.last() == Some(&0) {
                name.pop();
            }

            let offset = reader.read_u32::<LittleEndian>()?;
            let length = reader.read_u32::<LittleEndian>()?;

            files.push(FileEntry::loaded(
                String::from_utf8_lossy(&name).into_owned(),
                offset,
                length,
            ));
        }

        debug!("read {} entries", files.len());

        Ok(Self {
            version: header.version,
            files,
        })
    }

    fn add_file_entry(&mut self, name: &str, length: u32, external: bool) {
        self.files.push(FileEntry {
            name: name.to_owned(),
            offset: 0,
            length,
            external,
        });
    }

    #[instrument(skip_all, fields(files = self.files.len()), err)]
    fn write<W, F>(&self, writer: &mut W, payloads: F) -> Result<()>
    where
        W: Write,
        F: FnMut(&FileEntry) -> Result<Vec<u8>>,
    {
        let toc_size = self.toc_size();
        let offsets = data_offsets(&self.files, u64::from(SarcV2Header::SIZE) + toc_size)?;

        let header = SarcV2Header {
            version: self.version,
            toc_size: to_u32(toc_size)?,
        };

        let mut head = std::io::Cursor::new(Vec::new());
        header.write(&mut head)?;
        let mut head = head.into_inner();

        for (file, offset) in self.files.iter().zip(&offsets) {
            let alignment = Self::name_alignment(&file.name);
            head.write_u32::<LittleEndian>(to_u32(file.name.len() + alignment)?)?;
            head.write_all(file.name.as_bytes())?;
            head.write_all(&ZEROES[..alignment])?;
            head.write_u32::<LittleEndian>(*offset)?;
            head.write_u32::<LittleEndian>(file.length)?;
        }

        let padding = padding_for(head.len() as u64, DATA_ALIGNMENT) as usize;
        head.extend_from_slice(&ZEROES[..padding]);

        writer.write_all(&head)?;
        write_payloads(writer, &self.files, payloads)
    }
}

/// SARC v3 archive, names stored in a pool ahead of the table of contents
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SarcV3 {
    /// Members in table order
    pub files: Vec<FileEntry>,
}

impl SarcV3 {
    /// Name pool as written, every name null terminated, padded to 4 bytes.
    /// Also returns the offset of each name inside the pool.
    fn name_pool(&self) -> (Vec<u8>, Vec<u32>) {
        let mut pool = Vec::new();
        let mut offsets = Vec::with_capacity(self.files.len());

        for file in &self.files {
            offsets.push(pool.len() as u32);
            pool.extend_from_slice(file.name.as_bytes());
            pool.push(0);
        }

        let padding = padding_for(pool.len() as u64, 4) as usize;
        pool.extend_from_slice(&ZEROES[..padding]);

        (pool, offsets)
    }
}

impl SarcFormat for SarcV3 {
    fn version(&self) -> u32 {
        3
    }

    fn files(&self) -> &[FileEntry] {
        &self.files
    }

    #[instrument(skip(reader), err)]
    fn read<R: Read + Seek>(reader: &mut R) -> Result<Self> {
        let start = reader.stream_position()?;
        let header = SarcV3Header::read(reader)?;

        if header.version != 3 {
            return Err(Error::UnsupportedVersion(header.version));
        }

        let mut pool = vec![0; header.name_buffer_length as usize];
        reader.read_exact(&mut pool)?;

        let data_offset = start + u64::from(header.data_offset);
        let mut files = Vec::new();

        while reader.stream_position()? + u64::from(SarcV3Record::SIZE) <= data_offset {
            let record = SarcV3Record::read(reader)?;

            let name = pool
                .get(record.name_offset as usize..)
                .and_then(|rest| rest.iter().position(|&c| c == 0).map(|end| &rest[..end]))
                .ok_or(Error::Truncated)?;

            files.push(FileEntry::loaded(
                String::from_utf8_lossy(name).into_owned(),
                record.data_offset,
                record.length,
            ));
        }

        debug!("read {} entries", files.len());

        Ok(Self { files })
    }

    fn add_file_entry(&mut self, name: &str, length: u32, external: bool) {
        self.files.push(FileEntry {
            name: name.to_owned(),
            offset: 0,
            length,
            external,
        });
    }

    #[instrument(skip_all, fields(files = self.files.len()), err)]
    fn write<W, F>(&self, writer: &mut W, payloads: F) -> Result<()>
    where
        W: Write,
        F: FnMut(&FileEntry) -> Result<Vec<u8>>,
    {
        let (pool, name_offsets) = self.name_pool();

        let toc_end = u64::from(SarcV3Header::SIZE)
            + pool.len() as u64
            + u64::from(SarcV3Record::SIZE) * self.files.len() as u64;
        let data_offset = toc_end + padding_for(toc_end, DATA_ALIGNMENT);
        let offsets = data_offsets(&self.files, data_offset)?;

        let mut head = std::io::Cursor::new(Vec::new());
        SarcV3Header {
            version: 3,
            data_offset: to_u32(data_offset)?,
            name_buffer_length: to_u32(pool.len())?,
        }
        .write(&mut head)?;
        head.write_all(&pool)?;

        for ((file, offset), name_offset) in self.files.iter().zip(&offsets).zip(&name_offsets) {
            SarcV3Record {
                name_offset: *name_offset,
                data_offset: *offset,
                length: file.length,
                name_hash: name_hash(&file.name),
                reserved: 0,
            }
            .write(&mut head)?;
        }

        let mut head = head.into_inner();
        head.resize(data_offset as usize, 0);

        writer.write_all(&head)?;
        write_payloads(writer, &self.files, payloads)
    }
}

/// A SARC archive of either revision
#[derive(Debug, Clone, PartialEq)]
pub enum SmallArchive {
    /// Inline names
    V2(SarcV2),
    /// Pooled names
    V3(SarcV3),
}

impl SmallArchive {
    /// Create an empty archive of the given revision.
    pub fn new(version: u32) -> Result<Self> {
        match version {
            2 => Ok(SmallArchive::V2(SarcV2::default())),
            3 => Ok(SmallArchive::V3(SarcV3::default())),
            other => Err(Error::UnsupportedVersion(other)),
        }
    }

    /// Read an archive held in memory.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Self::read(&mut std::io::Cursor::new(data))
    }

    /// Serialize the archive with `payloads` supplying member data.
    pub fn to_bytes<F>(&self, payloads: F) -> Result<Vec<u8>>
    where
        F: FnMut(&FileEntry) -> Result<Vec<u8>>,
    {
        let mut output = Vec::new();
        self.write(&mut output, payloads)?;
        Ok(output)
    }
}

impl SarcFormat for SmallArchive {
    fn version(&self) -> u32 {
        match self {
            SmallArchive::V2(archive) => archive.version(),
            SmallArchive::V3(archive) => archive.version(),
        }
    }

    fn files(&self) -> &[FileEntry] {
        match self {
            SmallArchive::V2(archive) => archive.files(),
            SmallArchive::V3(archive) => archive.files(),
        }
    }

    fn min_data_offset(&self) -> u32 {
        match self {
            SmallArchive::V2(archive) => archive.min_data_offset(),
            SmallArchive::V3(archive) => archive.min_data_offset(),
        }
    }

    /// Try the v2 layout first and fall back to v3 when the revision says so.
    fn read<R: Read + Seek>(reader: &mut R) -> Result<Self> {
        let start = reader.stream_position()?;

        let archive = match SarcV2::read(reader) {
            Ok(archive) => SmallArchive::V2(archive),
            Err(Error::UnsupportedVersion(_)) => {
                reader.seek(SeekFrom::Start(start))?;
                SmallArchive::V3(SarcV3::read(reader)?)
            }
            Err(err) => return Err(err),
        };

        info!("SARC v{} detected", archive.version());

        Ok(archive)
    }

    fn add_file_entry(&mut self, name: &str, length: u32, external: bool) {
        match self {
            SmallArchive::V2(archive) => archive.add_file_entry(name, length, external),
            SmallArchive::V3(archive) => archive.add_file_entry(name, length, external),
        }
    }

    fn write<W, F>(&self, writer: &mut W, payloads: F) -> Result<()>
    where
        W: Write,
        F: FnMut(&FileEntry) -> Result<Vec<u8>>,
    {
        match self {
            SmallArchive::V2(archive) => archive.write(writer, payloads),
            SmallArchive::V3(archive) => archive.write(writer, payloads),
        }
    }
}

/// Offsets of every member once laid out from `start`, `0` for external ones.
fn data_offsets(files: &[FileEntry], start: u64) -> Result<Vec<u32>> {
    let mut cursor = start;

    files
        .iter()
        .map(|file| {
            if file.external {
                return Ok(0);
            }

            let offset = to_u32(cursor)?;
            let length = u64::from(file.length);
            cursor += length + padding_for(length, DATA_ALIGNMENT);

            Ok(offset)
        })
        .collect()
}

fn write_payloads<W, F>(writer: &mut W, files: &[FileEntry], mut payloads: F) -> Result<()>
where
    W: Write,
    F: FnMut(&FileEntry) -> Result<Vec<u8>>,
{
    for file in files.iter().filter(|f| !f.external) {
        let data = payloads(file)?;

        if data.len() != file.length as usize {
            return Err(Error::PayloadSizeMismatch {
                name: file.name.clone(),
                expected: file.length,
                actual: data.len(),
            });
        }

        writer.write_all(&data)?;
        let padding = padding_for(data.len() as u64, DATA_ALIGNMENT) as usize;
        writer.write_all(&ZEROES[..padding])?;
    }

    Ok(())
}

/// Resolve a member name against `root`, accepting either separator.
///
/// Returns [`None`] for names that would climb out of `root`.
pub fn member_path(root: &Path, name: &str) -> Option<PathBuf> {
    let mut path = root.to_path_buf();

    for part in name.split(['/', '\\']) {
        match part {
            "" | "." => continue,
            ".." => return None,
            part => path.push(part),
        }
    }

    Some(path)
}

fn to_u32<T: TryInto<u32>>(value: T) -> Result<u32> {
    value.try_into().map_err(|_| Error::Truncated)
}
