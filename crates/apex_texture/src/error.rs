//! Error types that can be emitted from this library

use std::io::ErrorKind;

use miette::Diagnostic;
use thiserror::Error;

use crate::format::DxgiFormat;

/// Error type for library
#[derive(Error, Diagnostic, Debug)]
pub enum Error {
    /// Transparent warpper for [`std::io::Error`]
    #[error(transparent)]
    IOError(std::io::Error),

    /// Transparent warpper for [`binrw::Error`]
    #[error(transparent)]
    BinRWError(binrw::Error),

    /// file signature does not match the expected format
    #[error("file signature does not match the expected format")]
    BadMagic,

    /// recognized format with an unhandled revision
    #[error("unsupported format version {0}")]
    UnsupportedVersion(u32),

    /// data ended before the structure it describes
    #[error("data ended before the structure it describes")]
    Truncated,

    /// pixel format or texture kind without a computable layout
    #[error("unsupported texture format: {0}")]
    UnsupportedFormat(String),

    /// cubemap that does not define all six faces
    #[error("cubemap textures must define all six faces")]
    IncompleteCubemap,

    /// texture without a generated mip chain
    #[error("texture must have generated mipmaps")]
    #[diagnostic(help("regenerate the DDS with a full mip chain before converting"))]
    MissingMipmaps,

    /// more streamed mips than the header has entries for
    #[error("{0} streamed mips do not fit in the AVTX entry table")]
    #[diagnostic(help("lower the level resolutions or the number of levels"))]
    TooManyStreamedMips(usize),

    /// streamed level file could not be found
    #[error("missing sidecar file for level {0}")]
    SidecarNotFound(u16),
}

impl Error {
    pub(crate) fn unsupported_format(format: DxgiFormat) -> Self {
        Error::UnsupportedFormat(format!("{format}"))
    }
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        match value.kind() {
            ErrorKind::UnexpectedEof => Error::Truncated,
            _ => Error::IOError(value),
        }
    }
}

impl From<binrw::Error> for Error {
    fn from(value: binrw::Error) -> Self {
        match value {
            binrw::Error::BadMagic { .. } => Error::BadMagic,
            binrw::Error::Io(e) => Error::from(e),
            binrw::Error::Backtrace(bt) => Error::from(*bt.error),
            other => Error::BinRWError(other),
        }
    }
}

/// Generic result type with crate's Error as its error variant
pub type Result<T> = core::result::Result<T, Error>;
