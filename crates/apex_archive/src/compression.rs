//! Block compression and decompression handling.
//!
//! AAF blocks carry raw deflate streams (no zlib header or trailer). Whole
//! archives compressed with the older `C` scheme use a regular zlib stream.

use std::io::{Read, Write};

use flate2::{
    read::ZlibDecoder, write::DeflateEncoder, write::ZlibEncoder, Compression, Decompress,
    FlushDecompress, Status,
};
use tracing::instrument;

use crate::error::{Error, Result};

/// Identifies how a SARC archive is wrapped on disk
///
/// The single character token is what the `.toc` manifest records.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum CompressionMethod {
    /// Stores the archive as it is
    #[default]
    None,

    /// Whole archive inside a single zlib stream
    Zlib,

    /// Archive split into raw deflate blocks inside an AAF container
    Aaf,
}

impl CompressionMethod {
    /// Token used by the `.toc` manifest
    pub fn token(&self) -> char {
        match self {
            CompressionMethod::None => 'U',
            CompressionMethod::Zlib => 'C',
            CompressionMethod::Aaf => 'A',
        }
    }

    /// Parse a manifest token, returning [`None`] for anything unknown
    pub fn from_token(token: char) -> Option<Self> {
        match token {
            'U' => Some(CompressionMethod::None),
            'C' => Some(CompressionMethod::Zlib),
            'A' => Some(CompressionMethod::Aaf),
            _ => None,
        }
    }
}

/// Deflate cannot expand data by more than this factor
const MAX_DEFLATE_RATIO: usize = 1032;

/// Inflate a raw deflate stream into a buffer of exactly `uncompressed_size` bytes.
///
/// The stream must end exactly where `input` ends and must produce exactly
/// `uncompressed_size` bytes, anything else is [`Error::StreamCorrupt`].
#[instrument(skip(input), fields(compressed = input.len()), err)]
pub fn inflate_raw(input: &[u8], uncompressed_size: usize) -> Result<Vec<u8>> {
    if uncompressed_size > input.len().saturating_mul(MAX_DEFLATE_RATIO) {
        return Err(Error::StreamCorrupt);
    }

    // one spare byte so an overlong stream shows up as a size mismatch
    let mut output = Vec::with_capacity(uncompressed_size + 1);
    let mut inflater = Decompress::new(false);

    let status = inflater
        .decompress_vec(input, &mut output, FlushDecompress::Finish)
        .map_err(|_| Error::StreamCorrupt)?;

    if status != Status::StreamEnd
        || inflater.total_in() as usize != input.len()
        || output.len() != uncompressed_size
    {
        return Err(Error::StreamCorrupt);
    }

    Ok(output)
}

/// Deflate `input` as a raw stream at the best compression level.
#[instrument(skip(input), fields(uncompressed = input.len()), err)]
pub fn deflate_raw(input: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::best());
    encoder.write_all(input)?;
    Ok(encoder.finish()?)
}

/// Inflate a complete zlib stream.
#[instrument(skip(input), fields(compressed = input.len()), err)]
pub fn inflate_zlib(input: &[u8]) -> Result<Vec<u8>> {
    let mut output = Vec::new();
    ZlibDecoder::new(input)
        .read_to_end(&mut output)
        .map_err(|_| Error::StreamCorrupt)?;
    Ok(output)
}

/// Deflate `input` as a zlib stream at the best compression level.
#[instrument(skip(input), fields(uncompressed = input.len()), err)]
pub fn deflate_zlib(input: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::best());
    encoder.write_all(input)?;
    Ok(encoder.finish()?)
}
