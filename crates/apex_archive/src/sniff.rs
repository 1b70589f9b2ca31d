//! Identify inputs by their leading bytes.

use crate::error::{Error, Result};

/// Kind of file recognized from its signature
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FileKind {
    /// SARC archive wrapped in an AAF container
    Aaf,
    /// Plain SARC archive
    Sarc,
    /// `.toc` manifest describing an archive to build
    Manifest,
    /// SARC archive wrapped in a single zlib stream
    ZlibSarc,
    /// AVTX texture container
    Avtx,
    /// DDS texture
    Dds,
}

impl FileKind {
    /// Identify `data` from its first bytes.
    pub fn sniff(data: &[u8]) -> Result<Self> {
        if data.first() == Some(&0x78) {
            return Ok(FileKind::ZlibSarc);
        }

        let magic: [u8; 4] = data
            .get(..4)
            .and_then(|m| m.try_into().ok())
            .ok_or(Error::Truncated)?;

        match &magic {
            b"AAF\0" => Ok(FileKind::Aaf),
            b"\x04\0\0\0" => Ok(FileKind::Sarc),
            b"TOCL" => Ok(FileKind::Manifest),
            b"AVTX" => Ok(FileKind::Avtx),
            b"DDS " => Ok(FileKind::Dds),
            _ => Err(Error::BadMagic),
        }
    }
}
