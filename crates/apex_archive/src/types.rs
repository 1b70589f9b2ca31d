//! Base types for the fixed size structures of SARC and AAF files.

use binrw::{BinRead, BinWrite};

/// Value every SARC header starts with, the length of the magic that follows
pub const SARC_HEADER_LENGTH: u32 = 4;

/// SARC v2 header
///
/// The table of contents follows directly and is `toc_size` bytes long,
/// including the padding up to the first 16 byte boundary.
#[derive(BinRead, BinWrite, Debug, Copy, Clone, PartialEq)]
#[brw(little, magic = b"\x04\x00\x00\x00SARC")]
pub struct SarcV2Header {
    /// Revision of the format, at most 2 for this layout
    pub version: u32,

    /// Length of the table of contents in bytes
    pub toc_size: u32,
}

impl SarcV2Header {
    /// Size of the header on disk
    pub const SIZE: u32 = 16;
}

impl Default for SarcV2Header {
    fn default() -> Self {
        Self {
            version: 2,
            toc_size: 0,
        }
    }
}

/// SARC v3 header
///
/// The name pool follows directly, then the table of contents which runs up to
/// `data_offset`.
#[derive(BinRead, BinWrite, Debug, Copy, Clone, PartialEq)]
#[brw(little, magic = b"\x04\x00\x00\x00SARC")]
pub struct SarcV3Header {
    /// Revision of the format, always 3 for this layout
    pub version: u32,

    /// Offset from the start of the file where member data begins
    pub data_offset: u32,

    /// Length of the name pool in bytes, including padding to 4 bytes
    pub name_buffer_length: u32,
}

impl SarcV3Header {
    /// Size of the header on disk
    pub const SIZE: u32 = 20;
}

impl Default for SarcV3Header {
    fn default() -> Self {
        Self {
            version: 3,
            data_offset: 0,
            name_buffer_length: 0,
        }
    }
}

/// SARC v3 table of contents record
#[derive(BinRead, BinWrite, Debug, Default, Copy, Clone, PartialEq)]
#[brw(little)]
pub struct SarcV3Record {
    /// Offset of the null terminated name within the name pool
    pub name_offset: u32,

    /// Offset of the member data from the start of the file, 0 when external
    pub data_offset: u32,

    /// Size of the member data
    pub length: u32,

    /// Jenkins lookup3 hash of the name
    pub name_hash: u32,

    /// Always zero in files we produce, kept for bit compatibility
    pub reserved: u32,
}

impl SarcV3Record {
    /// Size of a record on disk
    pub const SIZE: u32 = 20;
}

/// AAF container header
///
/// `AAF\0`, a version and the seven tags spelling `AVALANCHEARCHIVEFORMATISCOOL`.
#[derive(BinRead, BinWrite, Debug, Copy, Clone, PartialEq)]
#[brw(little, magic = b"AAF\0")]
pub struct AafHeader {
    /// Container revision, always 1
    pub version: u32,

    /// Fixed sub tags, see [`AafHeader::SUB_MAGICS`]
    pub sub_magics: [[u8; 4]; 7],

    /// Size of the complete stream once every block has been inflated
    pub uncompressed_size: u32,

    /// Uncompressed size ceiling of every block but the last
    pub block_size: u32,

    /// Number of blocks following the header
    pub block_count: u32,
}

impl AafHeader {
    /// Size of the header on disk
    pub const SIZE: u32 = 48;

    /// Sub tags that must follow the version
    pub const SUB_MAGICS: [[u8; 4]; 7] = [
        *b"AVAL", *b"ANCH", *b"EARC", *b"HIVE", *b"FORM", *b"ATIS", *b"COOL",
    ];
}

impl Default for AafHeader {
    fn default() -> Self {
        Self {
            version: 1,
            sub_magics: Self::SUB_MAGICS,
            uncompressed_size: 0,
            block_size: 0,
            block_count: 0,
        }
    }
}

/// EWAM block header
///
/// Unlike the other headers the tag comes last.
#[derive(BinRead, BinWrite, Debug, Default, Copy, Clone, PartialEq)]
#[brw(little)]
pub struct EwamHeader {
    /// Size of the raw deflate stream following the header
    pub compressed_size: u32,

    /// Size of the block once inflated
    pub uncompressed_size: u32,

    /// Distance from the start of this header to the start of the next one
    pub next_block: u32,

    #[brw(magic = b"EWAM")]
    _tag: (),
}

impl EwamHeader {
    /// Size of the header on disk
    pub const SIZE: u32 = 16;

    /// Create a header for a block of the given sizes
    pub fn new(compressed_size: u32, uncompressed_size: u32, next_block: u32) -> Self {
        Self {
            compressed_size,
            uncompressed_size,
            next_block,
            _tag: (),
        }
    }
}

/// Number of bytes needed to pad `length` up to a multiple of `alignment`
pub(crate) fn padding_for(length: u64, alignment: u64) -> u64 {
    (alignment - length % alignment) % alignment
}

#[cfg(test)]
mod test {
    use std::io::Cursor;

    use binrw::BinRead;
    use binrw::BinWrite;
    use pretty_assertions::assert_eq;

    use crate::error::{Error, Result};
    use crate::types::{padding_for, AafHeader, EwamHeader, SarcV2Header, SarcV3Record};

    #[test]
    fn read_v2_header() -> Result<()> {
        #[rustfmt::skip]
        let mut input = Cursor::new(vec![
            0x04, 0x00, 0x00, 0x00,
            0x53, 0x41, 0x52, 0x43,
            0x02, 0x00, 0x00, 0x00,
            0x20, 0x00, 0x00, 0x00,
        ]);

        let expected = SarcV2Header {
            version: 2,
            toc_size: 32,
        };

        assert_eq!(SarcV2Header::read(&mut input)?, expected);

        Ok(())
    }

    #[test]
    fn read_v2_header_bad_magic() {
        #[rustfmt::skip]
        let mut input = Cursor::new(vec![
            0x04, 0x00, 0x00, 0x00,
            0x53, 0x41, 0x52, 0x44,
            0x02, 0x00, 0x00, 0x00,
            0x20, 0x00, 0x00, 0x00,
        ]);

        let result = SarcV2Header::read(&mut input).map_err(Error::from);
        assert!(matches!(result, Err(Error::BadMagic)));
    }

    #[test]
    fn write_v3_record() -> Result<()> {
        #[rustfmt::skip]
        let expected = vec![
            0x0A, 0x00, 0x00, 0x00,
            0x40, 0x00, 0x00, 0x00,
            0x0B, 0x00, 0x00, 0x00,
            0x78, 0x56, 0x34, 0x12,
            0x00, 0x00, 0x00, 0x00,
        ];

        let record = SarcV3Record {
            name_offset: 10,
            data_offset: 64,
            length: 11,
            name_hash: 0x12345678,
            reserved: 0,
        };

        let mut actual = Vec::new();
        record.write(&mut Cursor::new(&mut actual))?;

        assert_eq!(actual, expected);

        Ok(())
    }

    #[test]
    fn write_aaf_header() -> Result<()> {
        let header = AafHeader {
            uncompressed_size: 11,
            block_size: 11,
            block_count: 1,
            ..Default::default()
        };

        let mut actual = Vec::new();
        header.write(&mut Cursor::new(&mut actual))?;

        assert_eq!(actual.len(), AafHeader::SIZE as usize);
        assert_eq!(&actual[..8], b"AAF\0\x01\0\0\0");
        assert_eq!(&actual[8..36], b"AVALANCHEARCHIVEFORMATISCOOL");
        assert_eq!(&actual[36..], &[11, 0, 0, 0, 11, 0, 0, 0, 1, 0, 0, 0]);

        Ok(())
    }

    #[test]
    fn ewam_tag_comes_last() -> Result<()> {
        #[rustfmt::skip]
        let expected = vec![
            0x13, 0x00, 0x00, 0x00,
            0x0B, 0x00, 0x00, 0x00,
            0x24, 0x00, 0x00, 0x00,
            0x45, 0x57, 0x41, 0x4D,
        ];

        let mut actual = Vec::new();
        EwamHeader::new(19, 11, 36).write(&mut Cursor::new(&mut actual))?;
        assert_eq!(actual, expected);

        let header = EwamHeader::read(&mut Cursor::new(expected))?;
        assert_eq!(header, EwamHeader::new(19, 11, 36));

        Ok(())
    }

    #[test]
    fn padding() {
        assert_eq!(padding_for(0, 16), 0);
        assert_eq!(padding_for(1, 16), 15);
        assert_eq!(padding_for(16, 16), 0);
        assert_eq!(padding_for(17, 4), 3);
    }
}
