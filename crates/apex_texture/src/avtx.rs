//! Types for reading and writing AVTX textures (`.ddsc`)
//!
//! | Offset (bytes) | Field                  | Description                                                |
//! |----------------|------------------------|------------------------------------------------------------|
//! | 0x0000         | Magic number           | 4 bytes: "AVTX"                                            |
//! | 0x0004         | Version                | 2 bytes: 1                                                 |
//! | 0x0006         | Unknown                | 1 byte                                                     |
//! | 0x0007         | Dimension              | 1 byte: 2                                                  |
//! | 0x0008         | Format                 | 4 bytes: DXGI format                                       |
//! | 0x000C         | Width                  | 2 bytes                                                    |
//! | 0x000E         | Height                 | 2 bytes                                                    |
//! | 0x0010         | Array size             | 2 bytes: array elements, whole cubes for cubemaps          |
//! | 0x0012         | Flags                  | 2 bytes: see [`flags`]                                     |
//! | 0x0014         | Mip count              | 1 byte                                                     |
//! | 0x0015         | Header mip count       | 1 byte: mips stored in this file                           |
//! | 0x0016         | Reserved               | 10 bytes                                                   |
//! | 0x0020         | Entries                | 8 × 12 bytes: offset, size, level, flags, reserved         |
//!
//! The first entry describes the data stored in this file, always at offset
//! 128: the smallest `header mip count` mips of every element, largest first.
//!
//! When external buffers are used, the larger mips live in sidecar files
//! (`.atx1`, `.atx2`, ... or a single `.hmddsc`). Entry `n` for `n > 0`
//! describes one such mip, from the smallest streamed mip upwards. Its offset
//! is relative to the start of the sidecar file named by its level, which
//! stores its mips from smallest to largest.
//!
//! Cubemaps and texture arrays are always stored whole in the `.ddsc` file.
//! Cubemaps are laid out mip by mip, each mip holding all six faces.

use std::collections::HashMap;
use std::ffi::OsString;
use std::fmt;
use std::fs;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use binrw::{BinRead, BinWrite};
use tracing::{debug, instrument};

use crate::error::{Error, Result};
use crate::format::DxgiFormat;

/// Header flags
pub mod flags {
    /// Larger mips are stored in sidecar files
    pub const EXTERNAL_BUFFERS: u16 = 0x1;
    /// Texture should not tile
    pub const NO_TILING: u16 = 0x8;
    /// Texture is a cubemap
    pub const CUBEMAP: u16 = 0x40;
}

/// Number of entries in the header
pub const ENTRY_COUNT: usize = 8;

/// An entry of the AVTX header
#[derive(BinRead, BinWrite, Debug, Default, Copy, Clone, PartialEq, Eq)]
#[brw(little)]
pub struct AvtxEntry {
    /// Offset within the file holding the data
    pub offset: u32,

    /// Size of the data in bytes
    pub size: u32,

    /// Streaming level, `0` for data inside the `.ddsc` file
    pub level: u16,

    /// Bit 0 marks the entry as used
    pub flags: u8,

    reserved: u8,
}

impl AvtxEntry {
    const USED: u8 = 0x1;

    /// Create a used entry
    pub fn new(offset: u32, size: u32, level: u16) -> Self {
        Self {
            offset,
            size,
            level,
            flags: Self::USED,
            reserved: 0,
        }
    }

    /// Whether the entry describes any data
    pub fn is_used(&self) -> bool {
        self.flags & Self::USED != 0
    }
}

/// AVTX header
#[derive(BinRead, BinWrite, Debug, Clone, PartialEq, Eq)]
#[brw(little, magic = b"AVTX")]
pub struct AvtxHeader {
    /// Always `1`
    pub version: u16,
    pub unknown: u8,
    /// Texture dimension, `2` for every texture this crate writes
    pub dimension: u8,
    /// DXGI format, see [`AvtxHeader::dxgi_format`]
    pub format: u32,
    /// Width of the largest mip
    pub width: u16,
    /// Height of the largest mip
    pub height: u16,
    /// Array elements, whole cubes for cubemaps
    pub array_size: u16,
    /// See [`flags`]
    pub flags: u16,
    /// Mips per element
    pub mip_count: u8,
    /// Mips stored inline in the `.ddsc`
    pub header_mip_count: u8,
    pub reserved: [u8; 10],
    /// Inline data first, then streamed mips from the smallest up
    pub entries: [AvtxEntry; ENTRY_COUNT],
}

impl Default for AvtxHeader {
    fn default() -> Self {
        Self {
            version: 1,
            unknown: 0,
            dimension: 2,
            format: 0,
            width: 0,
            height: 0,
            array_size: 1,
            flags: 0,
            mip_count: 0,
            header_mip_count: 0,
            reserved: [0; 10],
            entries: [AvtxEntry::default(); ENTRY_COUNT],
        }
    }
}

impl AvtxHeader {
    /// Size of the header on disk, also where inline data starts
    pub const SIZE: u32 = 128;

    /// Pixel format of the texture
    pub fn dxgi_format(&self) -> DxgiFormat {
        DxgiFormat(self.format)
    }

    /// Whether `flag` from [`flags`] is set
    pub fn has_flag(&self, flag: u16) -> bool {
        self.flags & flag != 0
    }

    /// Set or clear `flag` from [`flags`]
    pub fn set_flag(&mut self, flag: u16, value: bool) {
        if value {
            self.flags |= flag;
        } else {
            self.flags &= !flag;
        }
    }

    /// Whether the texture is a cubemap
    pub fn is_cubemap(&self) -> bool {
        self.has_flag(flags::CUBEMAP)
    }

    /// Entries describing streamed mips, smallest first
    pub fn streamed_entries(&self) -> impl Iterator<Item = &AvtxEntry> {
        self.entries[1..]
            .iter()
            .take_while(|e| e.is_used() && e.level > 0)
    }
}

/// A file holding streamed mips next to a `.ddsc`
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Sidecar {
    /// `.atxN` for level `N`
    Atx(u16),
    /// `.hmddsc`, the single sidecar of older titles
    Hmddsc,
}

impl Sidecar {
    /// File extension, without the leading dot
    pub fn extension(&self) -> String {
        match self {
            Sidecar::Atx(level) => format!("atx{level}"),
            Sidecar::Hmddsc => "hmddsc".to_string(),
        }
    }

    /// Path of the sidecar for a texture whose path without extension is `stem`
    pub fn path_for(&self, stem: &Path) -> PathBuf {
        let mut path = OsString::from(stem.as_os_str());
        path.push(".");
        path.push(self.extension());
        PathBuf::from(path)
    }
}

impl fmt::Display for Sidecar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, ".{}", self.extension())
    }
}

/// Source of sidecar file contents
pub trait SidecarStore {
    /// Contents of `sidecar`, [`None`] when it does not exist
    fn load(&self, sidecar: Sidecar) -> Result<Option<Vec<u8>>>;

    /// Contents of the sidecar holding `level`
    ///
    /// Level 1 falls back to `.hmddsc` when there is no `.atx1`.
    fn load_level(&self, level: u16) -> Result<Vec<u8>> {
        if let Some(data) = self.load(Sidecar::Atx(level))? {
            return Ok(data);
        }

        if level == 1 {
            if let Some(data) = self.load(Sidecar::Hmddsc)? {
                return Ok(data);
            }
        }

        Err(Error::SidecarNotFound(level))
    }
}

/// Sidecars stored on disk next to the texture
#[derive(Debug, Clone)]
pub struct FsSidecars {
    stem: PathBuf,
}

impl FsSidecars {
    /// Sidecars of the texture at `path`
    pub fn for_texture(path: &Path) -> Self {
        Self {
            stem: path.with_extension(""),
        }
    }

    /// Write every sidecar in `sidecars` next to the texture.
    pub fn write_all(&self, sidecars: &[(Sidecar, Vec<u8>)]) -> Result<Vec<PathBuf>> {
        sidecars
            .iter()
            .map(|(sidecar, data)| {
                let path = sidecar.path_for(&self.stem);
                fs::write(&path, data)?;
                Ok(path)
            })
            .collect()
    }
}

impl SidecarStore for FsSidecars {
    fn load(&self, sidecar: Sidecar) -> Result<Option<Vec<u8>>> {
        match fs::read(sidecar.path_for(&self.stem)) {
            Ok(data) => Ok(Some(data)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }
}

/// Sidecars held in memory
#[derive(Debug, Clone, Default)]
pub struct MemorySidecars(pub HashMap<Sidecar, Vec<u8>>);

impl FromIterator<(Sidecar, Vec<u8>)> for MemorySidecars {
    fn from_iter<T: IntoIterator<Item = (Sidecar, Vec<u8>)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl SidecarStore for MemorySidecars {
    fn load(&self, sidecar: Sidecar) -> Result<Option<Vec<u8>>> {
        Ok(self.0.get(&sidecar).cloned())
    }
}

/// An AVTX texture with all of its mips in memory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvtxTexture {
    /// Header as read
    pub header: AvtxHeader,

    /// Every mip of every element, in the order the `.ddsc` stores them,
    /// streamed mips first
    pub data: Vec<u8>,
}

impl AvtxTexture {
    /// Read a texture, pulling streamed mips from `sidecars`.
    #[instrument(skip_all, err)]
    pub fn read<R: Read + Seek, S: SidecarStore>(reader: &mut R, sidecars: &S) -> Result<Self> {
        let start = reader.stream_position()?;
        let header = AvtxHeader::read(reader)?;

        if header.version != 1 {
            return Err(Error::UnsupportedVersion(u32::from(header.version)));
        }

        let inline = header.entries[0];
        reader.seek(SeekFrom::Start(start + u64::from(inline.offset)))?;

        let mut inline_data = Vec::new();
        if inline.size > 0 {
            reader
                .by_ref()
                .take(u64::from(inline.size))
                .read_to_end(&mut inline_data)?;
            if inline_data.len() != inline.size as usize {
                return Err(Error::Truncated);
            }
        } else {
            reader.read_to_end(&mut inline_data)?;
        }

        let mut data = Vec::new();
        if header.has_flag(flags::EXTERNAL_BUFFERS) {
            let streamed = header.streamed_entries().collect::<Vec<_>>();
            let mut levels = HashMap::new();

            for entry in streamed.iter().rev() {
                if !levels.contains_key(&entry.level) {
                    levels.insert(entry.level, sidecars.load_level(entry.level)?);
                }

                let level = &levels[&entry.level];
                let start = entry.offset as usize;
                let end = start
                    .checked_add(entry.size as usize)
                    .ok_or(Error::Truncated)?;
                let mip = level.get(start..end).ok_or(Error::Truncated)?;
                data.extend_from_slice(mip);
            }

            debug!("loaded {} streamed mips", streamed.len());
        }

        data.extend_from_slice(&inline_data);

        Ok(Self { header, data })
    }

    /// Write the header and inline data. Sidecars are written separately.
    pub fn write_header<W: Write + Seek>(
        header: &AvtxHeader,
        inline: &[u8],
        writer: &mut W,
    ) -> Result<()> {
        header.write(writer)?;
        writer.write_all(inline)?;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use std::io::Cursor;

    use binrw::{BinRead, BinWrite};
    use pretty_assertions::assert_eq;

    use crate::avtx::{
        flags, AvtxEntry, AvtxHeader, AvtxTexture, MemorySidecars, Sidecar, SidecarStore,
    };
    use crate::error::{Error, Result};

    #[test]
    fn header_layout() -> Result<()> {
        let mut header = AvtxHeader {
            format: 71,
            width: 512,
            height: 256,
            mip_count: 10,
            header_mip_count: 6,
            ..Default::default()
        };
        header.set_flag(flags::EXTERNAL_BUFFERS, true);
        header.set_flag(flags::NO_TILING, true);
        header.entries[0] = AvtxEntry::new(128, 100, 0);
        header.entries[1] = AvtxEntry::new(0, 2048, 1);

        let mut actual = Cursor::new(Vec::new());
        header.write(&mut actual)?;
        let actual = actual.into_inner();

        #[rustfmt::skip]
        let expected_start = vec![
            0x41, 0x56, 0x54, 0x58,
            0x01, 0x00, 0x00, 0x02,
            0x47, 0x00, 0x00, 0x00,
            0x00, 0x02, 0x00, 0x01,
            0x01, 0x00, 0x09, 0x00,
            0x0A, 0x06,
        ];

        assert_eq!(actual.len(), AvtxHeader::SIZE as usize);
        assert_eq!(&actual[..22], expected_start.as_slice());
        assert_eq!(&actual[32..44], &[128, 0, 0, 0, 100, 0, 0, 0, 0, 0, 1, 0]);
        assert_eq!(&actual[44..56], &[0, 0, 0, 0, 0, 8, 0, 0, 1, 0, 1, 0]);

        assert_eq!(AvtxHeader::read(&mut Cursor::new(actual))?, header);

        Ok(())
    }

    #[test]
    fn sidecar_names() {
        let stem = std::path::Path::new("textures/rock");
        assert_eq!(
            Sidecar::Atx(2).path_for(stem),
            std::path::Path::new("textures/rock.atx2")
        );
        assert_eq!(
            Sidecar::Hmddsc.path_for(stem),
            std::path::Path::new("textures/rock.hmddsc")
        );
    }

    #[test]
    fn level_one_falls_back_to_hmddsc() -> Result<()> {
        let store = [(Sidecar::Hmddsc, vec![1, 2, 3])]
            .into_iter()
            .collect::<MemorySidecars>();

        assert_eq!(store.load_level(1)?, vec![1, 2, 3]);
        assert!(matches!(store.load_level(2), Err(Error::SidecarNotFound(2))));

        Ok(())
    }

    #[test]
    fn read_rebuilds_mip_order() -> Result<()> {
        let mut header = AvtxHeader {
            mip_count: 4,
            header_mip_count: 2,
            ..Default::default()
        };
        header.set_flag(flags::EXTERNAL_BUFFERS, true);
        header.entries[0] = AvtxEntry::new(128, 2, 0);
        header.entries[1] = AvtxEntry::new(0, 3, 1);
        header.entries[2] = AvtxEntry::new(3, 4, 1);

        let mut file = Cursor::new(Vec::new());
        AvtxTexture::write_header(&header, &[0xC, 0xD], &mut file)?;
        file.set_position(0);

        let sidecars = [(Sidecar::Atx(1), vec![0xB, 0xB, 0xB, 0xA, 0xA, 0xA, 0xA])]
            .into_iter()
            .collect::<MemorySidecars>();

        let texture = AvtxTexture::read(&mut file, &sidecars)?;
        assert_eq!(
            texture.data,
            vec![0xA, 0xA, 0xA, 0xA, 0xB, 0xB, 0xB, 0xC, 0xD]
        );

        Ok(())
    }

    #[test]
    fn inline_size_past_end_is_truncated() -> Result<()> {
        let mut header = AvtxHeader::default();
        header.entries[0] = AvtxEntry::new(128, u32::MAX, 0);

        let mut file = Cursor::new(Vec::new());
        AvtxTexture::write_header(&header, &[1, 2, 3], &mut file)?;
        file.set_position(0);

        let result = AvtxTexture::read(&mut file, &MemorySidecars::default());
        assert!(matches!(result, Err(Error::Truncated)));

        Ok(())
    }

    #[test]
    fn missing_sidecar() -> Result<()> {
        let mut header = AvtxHeader::default();
        header.set_flag(flags::EXTERNAL_BUFFERS, true);
        header.entries[0] = AvtxEntry::new(128, 0, 0);
        header.entries[1] = AvtxEntry::new(0, 16, 1);

        let mut file = Cursor::new(Vec::new());
        AvtxTexture::write_header(&header, &[], &mut file)?;
        file.set_position(0);

        let result = AvtxTexture::read(&mut file, &MemorySidecars::default());
        assert!(matches!(result, Err(Error::SidecarNotFound(1))));

        Ok(())
    }
}
