//! Error types that can be emitted from this library

use std::io::ErrorKind;

use miette::Diagnostic;
use thiserror::Error;

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

    /// compressed stream did not decode cleanly
    #[error("compressed stream is corrupt")]
    StreamCorrupt,

    /// payload supplied for an entry differs from its recorded length
    #[error("payload for {name} is {actual} bytes, expected {expected}")]
    PayloadSizeMismatch {
        /// name of the archive member
        name: String,
        /// length recorded in the table of contents
        expected: u32,
        /// length of the supplied payload
        actual: usize,
    },

    /// manifest text could not be interpreted
    #[error("invalid manifest: {0}")]
    #[diagnostic(help("the first line must look like `TOCL2U`, `TOCL3C` or `TOCL3A`"))]
    InvalidManifest(String),

    /// unable to find requested entry
    #[error("unable to find entry for hash {0:#010x}")]
    EntryNotFound(u32),
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
