//! Types for reading and writing AAF containers
//!
//! An AAF container is a 48 byte header followed by `block_count` EWAM blocks.
//! Each block holds a raw deflate stream of at most `block_size` uncompressed
//! bytes. Inflating every block in order and concatenating the results yields
//! the wrapped file, usually a SARC archive.

use std::io::{Read, Seek, SeekFrom, Write};

use binrw::{BinRead, BinWrite};
use bon::Builder;
use tracing::{debug, instrument};

use crate::compression::{deflate_raw, inflate_raw};
use crate::error::{Error, Result};
use crate::types::{padding_for, AafHeader, EwamHeader};

/// Block size ceiling used when none is configured, 32 MiB
pub const DEFAULT_BLOCK_SIZE: u32 = 0x2000000;

/// Options for how an AAF container should be written
#[derive(Debug, Clone, Copy, Builder)]
pub struct AafWriterOptions {
    /// Uncompressed size of every block but the last, at most
    /// [`DEFAULT_BLOCK_SIZE`]
    #[builder(default = DEFAULT_BLOCK_SIZE)]
    pub block_size: u32,
}

impl Default for AafWriterOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// One compressed block of an AAF container
#[derive(Debug, Clone, PartialEq)]
pub struct EwamBlock {
    /// Block header as found on disk
    pub header: EwamHeader,

    /// Raw deflate stream, without the alignment padding
    pub payload: Vec<u8>,
}

impl EwamBlock {
    /// Compress `data` into a new block.
    pub fn compress(data: &[u8]) -> Result<Self> {
        let payload = deflate_raw(data)?;
        let length = EwamHeader::SIZE as u64 + payload.len() as u64;
        let next_block = length + padding_for(length, 4);

        Ok(Self {
            header: EwamHeader::new(
                to_u32(payload.len())?,
                to_u32(data.len())?,
                u32::try_from(next_block).map_err(|_| Error::Truncated)?,
            ),
            payload,
        })
    }

    /// Read one block, leaving `reader` at the start of the next one.
    ///
    /// Blocks claiming more than [`DEFAULT_BLOCK_SIZE`] uncompressed bytes are
    /// [`Error::StreamCorrupt`].
    pub fn read<R: Read + Seek>(reader: &mut R) -> Result<Self> {
        let start = reader.stream_position()?;
        let header = EwamHeader::read(reader)?;

        if header.uncompressed_size > DEFAULT_BLOCK_SIZE {
            return Err(Error::StreamCorrupt);
        }

        let mut payload = Vec::new();
        reader
            .by_ref()
            .take(u64::from(header.compressed_size))
            .read_to_end(&mut payload)?;
        if payload.len() != header.compressed_size as usize {
            return Err(Error::Truncated);
        }

        reader.seek(SeekFrom::Start(start + u64::from(header.next_block)))?;

        Ok(Self { header, payload })
    }

    /// Inflate the block.
    pub fn decompress(&self) -> Result<Vec<u8>> {
        inflate_raw(&self.payload, self.header.uncompressed_size as usize)
    }

    /// Write the header, payload and alignment padding.
    pub fn write<W: Write + Seek>(&self, writer: &mut W) -> Result<()> {
        self.header.write(writer)?;
        writer.write_all(&self.payload)?;

        let written = EwamHeader::SIZE as usize + self.payload.len();
        let padding = (self.header.next_block as usize).saturating_sub(written);
        writer.write_all(&vec![0; padding])?;

        Ok(())
    }
}

/// An AAF container held in memory
#[derive(Debug, Clone, PartialEq)]
pub struct AafContainer {
    /// Container header
    pub header: AafHeader,

    /// Compressed blocks in stream order
    pub blocks: Vec<EwamBlock>,
}

impl AafContainer {
    /// Split `data` into blocks of at most `options.block_size` bytes and
    /// compress each of them.
    #[instrument(skip(data), fields(size = data.len()), err)]
    pub fn compress(data: &[u8], options: &AafWriterOptions) -> Result<Self> {
        let ceiling = options.block_size.clamp(1, DEFAULT_BLOCK_SIZE) as usize;

        let blocks = data
            .chunks(ceiling)
            .map(EwamBlock::compress)
            .collect::<Result<Vec<_>>>()?;

        let block_size = if blocks.len() > 1 {
            ceiling
        } else {
            data.len()
        };

        debug!("compressed into {} blocks", blocks.len());

        Ok(Self {
            header: AafHeader {
                uncompressed_size: to_u32(data.len())?,
                block_size: to_u32(block_size)?,
                block_count: to_u32(blocks.len())?,
                ..Default::default()
            },
            blocks,
        })
    }

    /// Read a container and all of its blocks.
    #[instrument(skip(reader), err)]
    pub fn read<R: Read + Seek>(reader: &mut R) -> Result<Self> {
        let header = AafHeader::read(reader)?;

        if header.sub_magics != AafHeader::SUB_MAGICS {
            return Err(Error::BadMagic);
        }

        if header.version != 1 {
            return Err(Error::UnsupportedVersion(header.version));
        }

        let blocks = (0..header.block_count)
            .map(|_| EwamBlock::read(reader))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { header, blocks })
    }

    /// Inflate every block and join them back into the wrapped stream.
    #[instrument(skip(self), err)]
    pub fn decompress(&self) -> Result<Vec<u8>> {
        let declared: u64 = self
            .blocks
            .iter()
            .map(|block| u64::from(block.header.uncompressed_size))
            .sum();
        if declared != u64::from(self.header.uncompressed_size) {
            return Err(Error::StreamCorrupt);
        }

        let mut output = Vec::with_capacity(self.header.uncompressed_size as usize);
        for block in &self.blocks {
            output.extend_from_slice(&block.decompress()?);
        }

        if output.len() != self.header.uncompressed_size as usize {
            return Err(Error::StreamCorrupt);
        }

        Ok(output)
    }

    /// Write the container header followed by every block.
    #[instrument(skip(self, writer), err)]
    pub fn write<W: Write + Seek>(&self, writer: &mut W) -> Result<()> {
        self.header.write(writer)?;
        for block in &self.blocks {
            block.write(writer)?;
        }

        Ok(())
    }
}

/// Read an AAF container from `reader` and return the wrapped stream.
pub fn unwrap_aaf<R: Read + Seek>(reader: &mut R) -> Result<Vec<u8>> {
    AafContainer::read(reader)?.decompress()
}

/// Wrap `data` in an AAF container and write it to `writer`.
pub fn wrap_aaf<W: Write + Seek>(
    writer: &mut W,
    data: &[u8],
    options: &AafWriterOptions,
) -> Result<()> {
    AafContainer::compress(data, options)?.write(writer)
}

fn to_u32(value: usize) -> Result<u32> {
    u32::try_from(value).map_err(|_| Error::Truncated)
}
